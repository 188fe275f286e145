/// Root signature - descriptor-set layouts and pipeline layout
///
/// Register space N maps to descriptor set N. Spaces without bindings below
/// the highest used space get an empty set layout. The root-constant space
/// becomes a single push-constant range covering every packed block, and
/// static samplers become immutable samplers of their space's set.

use ash::vk;
use dz_rhi::dz::binding::{BindingPlacement, RootSignature, RootSignatureDesc, RootSignatureLayout};
use dz_rhi::dz::shader::shifted_binding;
use dz_rhi::dz::{Engine, ResourceBindingType, Result};
use dz_rhi::{engine_bail, engine_debug, engine_err};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{descriptor_type, stages_to_vk};
use crate::vulkan_sampler::create_vk_sampler;

/// One binding of a set layout before it is handed to Vulkan
#[derive(Debug, Clone, Copy)]
struct SetBinding {
    binding: u32,
    descriptor_type: vk::DescriptorType,
    count: u32,
    stages: vk::ShaderStageFlags,
    /// Index into the immutable sampler list
    immutable_sampler: Option<usize>,
}

pub struct VulkanRootSignature {
    ctx: Arc<GpuContext>,
    layout: RootSignatureLayout,
    /// Indexed by register space
    set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Spaces whose set layout has at least one binding
    populated_sets: Vec<u32>,
    immutable_samplers: Vec<vk::Sampler>,
    push_constant_stages: vk::ShaderStageFlags,
    pipeline_layout: vk::PipelineLayout,
}

impl VulkanRootSignature {
    pub fn new(ctx: Arc<GpuContext>, desc: &RootSignatureDesc) -> Result<Self> {
        let layout = RootSignatureLayout::build(desc, &Engine::configuration())?;

        let mut this = Self {
            ctx,
            layout,
            set_layouts: Vec::new(),
            populated_sets: Vec::new(),
            immutable_samplers: Vec::new(),
            push_constant_stages: vk::ShaderStageFlags::empty(),
            pipeline_layout: vk::PipelineLayout::null(),
        };
        // Partially built objects are released by Drop on error
        this.create_layouts()?;
        Ok(this)
    }

    fn create_layouts(&mut self) -> Result<()> {
        let constant_space = self.layout.root_constant_register_space();
        let mut sets: BTreeMap<u32, FxHashMap<u32, SetBinding>> = BTreeMap::new();

        for space in self.layout.spaces() {
            let register_space = space.register_space;
            if register_space == constant_space {
                continue;
            }
            let entries = sets.entry(register_space).or_default();
            for entry in self.layout.bindings_in_space(register_space) {
                if matches!(entry.placement, BindingPlacement::RootConstant { .. } | BindingPlacement::StaticSampler) {
                    continue;
                }
                let reflected = &entry.binding;
                let binding = shifted_binding(reflected.binding_type, reflected.binding);
                entries.insert(binding, SetBinding {
                    binding,
                    descriptor_type: descriptor_type(reflected.binding_type, reflected.descriptor),
                    count: reflected.descriptor_count(),
                    stages: stages_or_all(stages_to_vk(reflected.stages)),
                    immutable_sampler: None,
                });
            }
        }

        for sampler in self.layout.static_samplers() {
            let vk_sampler = create_vk_sampler(&self.ctx, &sampler.sampler)?;
            self.immutable_samplers.push(vk_sampler);
            let binding = shifted_binding(ResourceBindingType::Sampler, sampler.binding);
            sets.entry(sampler.register_space).or_default().insert(binding, SetBinding {
                binding,
                descriptor_type: vk::DescriptorType::SAMPLER,
                count: 1,
                stages: stages_or_all(stages_to_vk(sampler.stages)),
                immutable_sampler: Some(self.immutable_samplers.len() - 1),
            });
        }

        let set_count = sets.keys().next_back().map_or(0, |last| last + 1);
        let mut empty_layout = None;
        for register_space in 0..set_count {
            let set_layout = match sets.get(&register_space) {
                Some(entries) if !entries.is_empty() => {
                    self.populated_sets.push(register_space);
                    let mut ordered: Vec<SetBinding> = entries.values().copied().collect();
                    ordered.sort_by_key(|b| b.binding);
                    self.create_set_layout(&ordered)?
                }
                _ => match empty_layout {
                    Some(layout) => layout,
                    None => {
                        let layout = self.create_set_layout(&[])?;
                        empty_layout = Some(layout);
                        layout
                    }
                },
            };
            self.set_layouts.push(set_layout);
        }

        let mut push_constant_ranges = Vec::new();
        let push_constant_bytes = self.layout.root_constants_num_bytes();
        if push_constant_bytes > 0 {
            let max_bytes = self.ctx.limits.max_push_constants_size;
            if push_constant_bytes > max_bytes {
                engine_bail!("dz::vulkan::RootSignature", Configuration =>
                    "Root constants use {} bytes but the device allows {} push-constant bytes",
                    push_constant_bytes, max_bytes);
            }
            self.push_constant_stages = self.layout.root_constants().iter()
                .fold(vk::ShaderStageFlags::empty(), |acc, c| acc | stages_to_vk(c.stages));
            self.push_constant_stages = stages_or_all(self.push_constant_stages);
            push_constant_ranges.push(vk::PushConstantRange {
                stage_flags: self.push_constant_stages,
                offset: 0,
                size: push_constant_bytes,
            });
        }

        let layout_create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&self.set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        self.pipeline_layout = unsafe {
            self.ctx.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("dz::vulkan::RootSignature", "Failed to create pipeline layout: {:?}", e))?
        };

        engine_debug!("dz::vulkan::RootSignature",
            "Created pipeline layout: {} set(s), {} populated, {} push-constant bytes",
            self.set_layouts.len(), self.populated_sets.len(), push_constant_bytes);
        Ok(())
    }

    fn create_set_layout(&self, bindings: &[SetBinding]) -> Result<vk::DescriptorSetLayout> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings.iter()
            .map(|b| {
                let binding = vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .descriptor_count(b.count)
                    .stage_flags(b.stages);
                match b.immutable_sampler {
                    Some(index) => binding.immutable_samplers(std::slice::from_ref(&self.immutable_samplers[index])),
                    None => binding,
                }
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
        unsafe {
            self.ctx.device.create_descriptor_set_layout(&create_info, None)
                .map_err(|e| engine_err!("dz::vulkan::RootSignature",
                    "Failed to create descriptor set layout: {:?}", e))
        }
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    /// Set layout of `register_space`, if the space has a set
    pub fn set_layout(&self, register_space: u32) -> Option<vk::DescriptorSetLayout> {
        self.set_layouts.get(register_space as usize).copied()
    }

    /// Whether `register_space` owns a set with bindings
    pub fn has_populated_set(&self, register_space: u32) -> bool {
        self.populated_sets.contains(&register_space)
    }

    /// Stages of the merged push-constant range (empty without root constants)
    pub fn push_constant_stages(&self) -> vk::ShaderStageFlags {
        self.push_constant_stages
    }
}

fn stages_or_all(stages: vk::ShaderStageFlags) -> vk::ShaderStageFlags {
    if stages.is_empty() { vk::ShaderStageFlags::ALL } else { stages }
}

impl RootSignature for VulkanRootSignature {
    fn layout(&self) -> &RootSignatureLayout {
        &self.layout
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanRootSignature {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            // The empty layout may appear several times
            let mut destroyed: Vec<vk::DescriptorSetLayout> = Vec::with_capacity(self.set_layouts.len());
            for &set_layout in &self.set_layouts {
                if !destroyed.contains(&set_layout) {
                    self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
                    destroyed.push(set_layout);
                }
            }
            for &sampler in &self.immutable_samplers {
                self.ctx.device.destroy_sampler(sampler, None);
            }
        }
    }
}
