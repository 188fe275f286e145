/// Bind group - descriptor set of one register space
///
/// Descriptor sets come from a growing list of pools shared by the device.
/// A group for the root-constant space owns no set; it keeps the packed
/// push-constant bytes instead.

use ash::vk;
use dz_rhi::dz::binding::{BindingWrite, BoundResource, NativeBindGroup, RootSignatureLayout};
use dz_rhi::dz::shader::shifted_binding;
use dz_rhi::dz::Result;
use dz_rhi::{engine_bail, engine_err, engine_info};
use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::descriptor_type;
use crate::vulkan_root_signature::VulkanRootSignature;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_texture::VulkanTexture;

const SETS_PER_POOL: u32 = 1024;

/// Descriptor pools of a device; a new pool is added when the last one is exhausted
pub struct DescriptorPools {
    ctx: Arc<GpuContext>,
    pools: Mutex<Vec<vk::DescriptorPool>>,
    ray_tracing: bool,
}

impl DescriptorPools {
    pub fn new(ctx: Arc<GpuContext>, ray_tracing: bool) -> Result<Self> {
        let pool = Self::create_pool(&ctx, ray_tracing)?;
        Ok(Self { ctx, pools: Mutex::new(vec![pool]), ray_tracing })
    }

    fn create_pool(ctx: &GpuContext, ray_tracing: bool) -> Result<vk::DescriptorPool> {
        let mut pool_sizes = vec![
            vk::DescriptorPoolSize { ty: vk::DescriptorType::UNIFORM_BUFFER, descriptor_count: 2 * SETS_PER_POOL },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_BUFFER, descriptor_count: 4 * SETS_PER_POOL },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::SAMPLED_IMAGE, descriptor_count: 4 * SETS_PER_POOL },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_IMAGE, descriptor_count: 2 * SETS_PER_POOL },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::SAMPLER, descriptor_count: 2 * SETS_PER_POOL },
        ];
        if ray_tracing {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
                descriptor_count: SETS_PER_POOL,
            });
        }
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(SETS_PER_POOL);

        unsafe {
            ctx.device.create_descriptor_pool(&info, None)
                .map_err(|e| engine_err!("dz::vulkan", InitializationFailed =>
                    "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Allocate one set, growing the pool list if needed
    fn allocate(&self, set_layout: vk::DescriptorSetLayout) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let layouts = [set_layout];
        let mut pools = self.pools.lock()
            .map_err(|_| engine_err!("dz::vulkan", "Descriptor pool lock poisoned"))?;
        let Some(&current_pool) = pools.last() else {
            engine_bail!("dz::vulkan", "No descriptor pool available");
        };

        unsafe {
            let allocate_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(current_pool)
                .set_layouts(&layouts);
            match self.ctx.device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) => Ok((current_pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let new_pool = Self::create_pool(&self.ctx, self.ray_tracing)?;
                    pools.push(new_pool);
                    engine_info!("dz::vulkan",
                        "Descriptor pool exhausted, created new pool (total: {})", pools.len());
                    let retry_info = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(new_pool)
                        .set_layouts(&layouts);
                    let sets = self.ctx.device.allocate_descriptor_sets(&retry_info)
                        .map_err(|e| engine_err!("dz::vulkan",
                            "Failed to allocate descriptor set after pool growth: {:?}", e))?;
                    Ok((new_pool, sets[0]))
                }
                Err(e) => Err(engine_err!("dz::vulkan", "Failed to allocate descriptor set: {:?}", e)),
            }
        }
    }

    fn free(&self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        if let Ok(_pools) = self.pools.lock() {
            unsafe {
                self.ctx.device.free_descriptor_sets(pool, &[set]).ok();
            }
        }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl Drop for DescriptorPools {
    fn drop(&mut self) {
        if let Ok(pools) = self.pools.get_mut() {
            for &pool in pools.iter() {
                unsafe { self.ctx.device.destroy_descriptor_pool(pool, None); }
            }
        }
    }
}

/// Descriptor info of one write, resolved before the write structs borrow it
enum ResolvedWrite {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
    AccelerationStructure(vk::AccelerationStructureKHR),
}

pub struct VulkanBindGroup {
    ctx: Arc<GpuContext>,
    pools: Arc<DescriptorPools>,
    register_space: u32,
    /// Pool and set; None for the root-constant space or an empty space
    descriptor_set: Option<(vk::DescriptorPool, vk::DescriptorSet)>,
    /// Packed push-constant bytes (root-constant space only)
    push_constants: Vec<u8>,
    /// Root constant binding to byte offset in `push_constants`
    constant_offsets: Vec<(u32, u32)>,
}

impl VulkanBindGroup {
    pub fn new(
        ctx: Arc<GpuContext>,
        pools: Arc<DescriptorPools>,
        root_signature: &VulkanRootSignature,
        layout: &RootSignatureLayout,
        register_space: u32,
    ) -> Result<Self> {
        let mut push_constants = Vec::new();
        let mut constant_offsets = Vec::new();
        let mut descriptor_set = None;

        if register_space == layout.root_constant_register_space() {
            push_constants = vec![0; layout.root_constants_num_bytes() as usize];
            constant_offsets = layout.root_constants().iter().map(|c| (c.binding, c.offset)).collect();
        } else if root_signature.has_populated_set(register_space) {
            let Some(set_layout) = root_signature.set_layout(register_space) else {
                engine_bail!("dz::vulkan", Binding =>
                    "Register space {} has no descriptor set layout", register_space);
            };
            descriptor_set = Some(pools.allocate(set_layout)?);
        }

        Ok(Self { ctx, pools, register_space, descriptor_set, push_constants, constant_offsets })
    }

    pub fn register_space(&self) -> u32 {
        self.register_space
    }

    pub fn descriptor_set(&self) -> Option<vk::DescriptorSet> {
        self.descriptor_set.map(|(_, set)| set)
    }

    pub fn push_constants(&self) -> &[u8] {
        &self.push_constants
    }

    fn resolve(write: &BindingWrite, ty: vk::DescriptorType) -> Result<ResolvedWrite> {
        match &write.resource {
            BoundResource::Buffer(buffer) => {
                let Some(buffer) = buffer.as_any().downcast_ref::<VulkanBuffer>() else {
                    engine_bail!("dz::vulkan", InvalidResource => "{} is not a Vulkan buffer", write.slot);
                };
                if ty == vk::DescriptorType::ACCELERATION_STRUCTURE_KHR {
                    let Some(structure) = buffer.acceleration_structure else {
                        engine_bail!("dz::vulkan", InvalidResource =>
                            "{} expects an acceleration structure buffer", write.slot);
                    };
                    return Ok(ResolvedWrite::AccelerationStructure(structure));
                }
                Ok(ResolvedWrite::Buffer(vk::DescriptorBufferInfo {
                    buffer: buffer.buffer,
                    offset: 0,
                    range: vk::WHOLE_SIZE,
                }))
            }
            BoundResource::Texture(texture) => {
                let Some(texture) = texture.as_any().downcast_ref::<VulkanTexture>() else {
                    engine_bail!("dz::vulkan", InvalidResource => "{} is not a Vulkan texture", write.slot);
                };
                let image_layout = if ty == vk::DescriptorType::STORAGE_IMAGE {
                    vk::ImageLayout::GENERAL
                } else {
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                };
                Ok(ResolvedWrite::Image(vk::DescriptorImageInfo {
                    sampler: vk::Sampler::null(),
                    image_view: texture.view,
                    image_layout,
                }))
            }
            BoundResource::Sampler(sampler) => {
                let Some(sampler) = sampler.as_any().downcast_ref::<VulkanSampler>() else {
                    engine_bail!("dz::vulkan", InvalidResource => "{} is not a Vulkan sampler", write.slot);
                };
                Ok(ResolvedWrite::Image(vk::DescriptorImageInfo {
                    sampler: sampler.sampler,
                    image_view: vk::ImageView::null(),
                    image_layout: vk::ImageLayout::UNDEFINED,
                }))
            }
        }
    }
}

impl NativeBindGroup for VulkanBindGroup {
    fn apply(&mut self, layout: &RootSignatureLayout, writes: &[BindingWrite]) -> Result<()> {
        let Some((_, set)) = self.descriptor_set else {
            engine_bail!("dz::vulkan", Binding =>
                "Register space {} has no descriptor set to write", self.register_space);
        };

        let mut resolved = Vec::with_capacity(writes.len());
        for write in writes {
            let Some(entry) = layout.binding(&write.slot) else {
                engine_bail!("dz::vulkan", Binding => "Binding slot does not exist in root signature: {}", write.slot);
            };
            let ty = descriptor_type(entry.binding.binding_type, entry.binding.descriptor);
            let binding = shifted_binding(write.slot.binding_type, write.slot.binding);
            resolved.push((binding, ty, Self::resolve(write, ty)?));
        }

        let structures: Vec<vk::AccelerationStructureKHR> = resolved.iter()
            .filter_map(|(_, _, r)| match r {
                ResolvedWrite::AccelerationStructure(s) => Some(*s),
                _ => None,
            })
            .collect();
        let mut structure_writes: Vec<vk::WriteDescriptorSetAccelerationStructureKHR> = structures.iter()
            .map(|s| vk::WriteDescriptorSetAccelerationStructureKHR::default()
                .acceleration_structures(std::slice::from_ref(s)))
            .collect();
        let mut structure_writes = structure_writes.iter_mut();

        let mut vk_writes = Vec::with_capacity(resolved.len());
        for (binding, ty, info) in &resolved {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(*binding)
                .dst_array_element(0)
                .descriptor_type(*ty);
            let write = match info {
                ResolvedWrite::Buffer(buffer_info) => write.buffer_info(std::slice::from_ref(buffer_info)),
                ResolvedWrite::Image(image_info) => write.image_info(std::slice::from_ref(image_info)),
                ResolvedWrite::AccelerationStructure(_) => {
                    let Some(next) = structure_writes.next() else {
                        engine_bail!("dz::vulkan", "Acceleration structure write list out of sync");
                    };
                    write.descriptor_count(1).push_next(next)
                }
            };
            vk_writes.push(write);
        }

        unsafe {
            self.ctx.device.update_descriptor_sets(&vk_writes, &[]);
        }
        Ok(())
    }

    fn set_root_constants(&mut self, binding: u32, data: &[u8]) -> Result<()> {
        let Some(&(_, offset)) = self.constant_offsets.iter().find(|(b, _)| *b == binding) else {
            engine_bail!("dz::vulkan", Binding => "Root constant b{} is not a push constant of this group", binding);
        };
        let start = offset as usize;
        let Some(target) = self.push_constants.get_mut(start..start + data.len()) else {
            engine_bail!("dz::vulkan", Binding =>
                "Root constant b{} ({} bytes at {}) overflows the push-constant block", binding, data.len(), offset);
        };
        target.copy_from_slice(data);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBindGroup {
    fn drop(&mut self) {
        if let Some((pool, set)) = self.descriptor_set.take() {
            self.pools.free(pool, set);
        }
    }
}
