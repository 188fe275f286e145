/// Root signature layout
///
/// `RootSignatureLayout` is the backend-neutral partition of a program's
/// reflected bindings into root constants, root descriptors and descriptor
/// table ranges. Every backend realizes the same layout, and bind groups and
/// command lists address slots through the offsets computed here.

use std::any::Any;
use std::collections::BTreeMap;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::config::RhiConfiguration;
use crate::device::SamplerDesc;
use crate::error::Result;
use crate::shader::reflection::{ReflectionBinding, ResourceSlot};
use crate::types::{ResourceBindingType, ShaderStages};

// ============================================================================
// Description
// ============================================================================

/// Pipeline kind a root signature serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RootSignatureType {
    #[default]
    Graphics,
    Compute,
}

/// Inline 32-bit constants bound in the root-constant register space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConstantResourceBinding {
    pub name: String,
    pub binding: u32,
    pub num_bytes: u32,
    pub stages: ShaderStages,
}

/// Sampler baked into the root signature
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSamplerDesc {
    pub sampler: SamplerDesc,
    pub binding: u32,
    pub register_space: u32,
    pub stages: ShaderStages,
}

impl StaticSamplerDesc {
    pub fn slot(&self) -> ResourceSlot {
        ResourceSlot {
            register_space: self.register_space,
            binding: self.binding,
            binding_type: ResourceBindingType::Sampler,
        }
    }
}

/// Input of root signature creation, usually produced by
/// [`ShaderProgram::reflect`](crate::shader::ShaderProgram::reflect)
#[derive(Debug, Clone, Default)]
pub struct RootSignatureDesc {
    pub root_type: RootSignatureType,
    pub resource_bindings: Vec<ReflectionBinding>,
    pub root_constants: Vec<RootConstantResourceBinding>,
    pub static_samplers: Vec<StaticSamplerDesc>,
}

// ============================================================================
// Layout
// ============================================================================

/// The two descriptor heap kinds; they never share a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    CbvSrvUav,
    Sampler,
}

impl TableKind {
    pub fn of(binding_type: ResourceBindingType) -> TableKind {
        match binding_type {
            ResourceBindingType::Sampler => TableKind::Sampler,
            _ => TableKind::CbvSrvUav,
        }
    }
}

/// One range of a descriptor table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRange {
    pub binding_type: ResourceBindingType,
    pub base_register: u32,
    pub register_space: u32,
    pub num_descriptors: u32,
    /// Position of the first descriptor within the table
    pub offset_in_table: u32,
    pub stages: ShaderStages,
}

/// Root parameter in native order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootParameter {
    Constants {
        binding: u32,
        register_space: u32,
        num_32bit_values: u32,
        stages: ShaderStages,
    },
    Descriptor {
        binding_type: ResourceBindingType,
        binding: u32,
        register_space: u32,
        stages: ShaderStages,
    },
    Table {
        kind: TableKind,
        register_space: u32,
        ranges: Vec<DescriptorRange>,
        stages: ShaderStages,
    },
}

impl RootParameter {
    pub fn stages(&self) -> ShaderStages {
        match self {
            RootParameter::Constants { stages, .. }
            | RootParameter::Descriptor { stages, .. }
            | RootParameter::Table { stages, .. } => *stages,
        }
    }
}

/// Where a reflected binding ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPlacement {
    /// Descriptor `offset` of the space's table of `kind`
    Table { kind: TableKind, offset: u32 },
    /// Unindirected root descriptor; `index` counts root descriptors of the space
    RootDescriptor { parameter_index: u32, index: u32 },
    RootConstant { parameter_index: u32 },
    StaticSampler,
}

/// Laid-out root constant block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConstantLayout {
    pub name: String,
    pub binding: u32,
    pub num_bytes: u32,
    pub stages: ShaderStages,
    pub parameter_index: u32,
    /// Byte offset when all blocks are packed back to back (push constants)
    pub offset: u32,
}

impl RootConstantLayout {
    pub fn num_32bit_values(&self) -> u32 {
        self.num_bytes.div_ceil(4)
    }
}

/// Per-register-space summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSpaceLayout {
    pub register_space: u32,
    /// Root parameter index of the space's first parameter
    pub parameter_offset: u32,
    pub cbv_srv_uav_table: Option<u32>,
    pub sampler_table: Option<u32>,
    pub cbv_srv_uav_count: u32,
    pub sampler_count: u32,
    pub root_descriptor_count: u32,
    pub cbv_srv_uav_stages: ShaderStages,
    pub sampler_stages: ShaderStages,
}

/// How many input bindings landed in each partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub root_constants: usize,
    pub root_descriptors: usize,
    pub table_ranges: usize,
    pub static_samplers: usize,
}

impl PartitionCounts {
    pub fn total(&self) -> usize {
        self.root_constants + self.root_descriptors + self.table_ranges + self.static_samplers
    }
}

/// A binding of the layout and its placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutBinding {
    pub binding: ReflectionBinding,
    pub placement: BindingPlacement,
}

/// Deterministic partition of a [`RootSignatureDesc`]
#[derive(Debug, Clone, PartialEq)]
pub struct RootSignatureLayout {
    root_type: RootSignatureType,
    parameters: Vec<RootParameter>,
    spaces: BTreeMap<u32, RegisterSpaceLayout>,
    bindings: FxHashMap<ResourceSlot, LayoutBinding>,
    root_constants: Vec<RootConstantLayout>,
    static_samplers: Vec<StaticSamplerDesc>,
    used_stages: ShaderStages,
    partition: PartitionCounts,
    root_constant_register_space: u32,
    root_level_buffer_register_space: u32,
}

#[derive(Default)]
struct SpaceBuilder {
    cbv_srv_uav: Vec<ReflectionBinding>,
    samplers: Vec<ReflectionBinding>,
    root_descriptors: Vec<ReflectionBinding>,
}

impl RootSignatureLayout {
    /// Partition `desc` with the reserved spaces of `config`
    ///
    /// # Errors
    ///
    /// `Configuration` when a root-constant-space binding is not a constant
    /// buffer, a root-level-buffer-space binding is a sampler, or a slot is
    /// declared twice.
    pub fn build(desc: &RootSignatureDesc, config: &RhiConfiguration) -> Result<Self> {
        let constant_space = config.root_constant_register_space;
        let root_level_space = config.root_level_buffer_register_space;

        let mut partition = PartitionCounts::default();
        let mut used_stages = ShaderStages::empty();
        let mut constants: BTreeMap<u32, RootConstantResourceBinding> = BTreeMap::new();
        let mut spaces: BTreeMap<u32, SpaceBuilder> = BTreeMap::new();
        let mut seen: FxHashSet<ResourceSlot> = FxHashSet::default();
        let static_slots: Vec<ResourceSlot> = desc.static_samplers.iter().map(|s| s.slot()).collect();
        let mut static_bindings = Vec::new();

        for constant in &desc.root_constants {
            merge_root_constant(&mut constants, constant.clone());
        }

        for binding in &desc.resource_bindings {
            let slot = binding.slot();
            if !seen.insert(slot) {
                crate::engine_bail!("dz::RootSignature", Configuration =>
                    "Binding {} ('{}') is declared twice", slot, binding.name);
            }
            used_stages |= binding.stages;

            if binding.register_space == constant_space {
                if binding.binding_type != ResourceBindingType::ConstantBuffer {
                    crate::engine_bail!("dz::RootSignature", Configuration =>
                        "'{}' at {} is in the root constant space but is not a constant buffer",
                        binding.name, slot);
                }
                merge_root_constant(&mut constants, RootConstantResourceBinding {
                    name: binding.name.clone(),
                    binding: binding.binding,
                    num_bytes: binding.num_bytes,
                    stages: binding.stages,
                });
                partition.root_constants += 1;
                continue;
            }

            if static_slots.contains(&slot) {
                static_bindings.push(binding.clone());
                partition.static_samplers += 1;
                continue;
            }

            let space = spaces.entry(binding.register_space).or_default();
            if binding.register_space == root_level_space {
                if binding.binding_type == ResourceBindingType::Sampler {
                    crate::engine_bail!("dz::RootSignature", Configuration =>
                        "'{}' at {} is a sampler in the root level buffer space",
                        binding.name, slot);
                }
                if is_buffer_binding(binding) {
                    space.root_descriptors.push(binding.clone());
                    partition.root_descriptors += 1;
                    continue;
                }
                crate::engine_warn!("dz::RootSignature",
                    "'{}' at {} is not a buffer, placing it in a descriptor table", binding.name, slot);
            }

            match TableKind::of(binding.binding_type) {
                TableKind::Sampler => space.samplers.push(binding.clone()),
                TableKind::CbvSrvUav => space.cbv_srv_uav.push(binding.clone()),
            }
            partition.table_ranges += 1;
        }

        let mut parameters = Vec::new();
        let mut bindings = FxHashMap::default();
        let mut root_constants = Vec::new();

        let mut packed_offset = 0u32;
        for constant in constants.into_values() {
            let parameter_index = parameters.len() as u32;
            used_stages |= constant.stages;
            let layout = RootConstantLayout {
                name: constant.name,
                binding: constant.binding,
                num_bytes: constant.num_bytes,
                stages: constant.stages,
                parameter_index,
                offset: packed_offset,
            };
            packed_offset += layout.num_32bit_values() * 4;
            parameters.push(RootParameter::Constants {
                binding: layout.binding,
                register_space: constant_space,
                num_32bit_values: layout.num_32bit_values(),
                stages: layout.stages,
            });
            root_constants.push(layout);
        }
        for binding in desc.resource_bindings.iter().filter(|b| b.register_space == constant_space) {
            if let Some(layout) = root_constants.iter().find(|c| c.binding == binding.binding) {
                bindings.insert(binding.slot(), LayoutBinding {
                    binding: binding.clone(),
                    placement: BindingPlacement::RootConstant { parameter_index: layout.parameter_index },
                });
            }
        }
        for binding in static_bindings {
            bindings.insert(binding.slot(), LayoutBinding {
                binding,
                placement: BindingPlacement::StaticSampler,
            });
        }

        let mut space_layouts = BTreeMap::new();
        for (register_space, mut builder) in spaces {
            let mut space = RegisterSpaceLayout {
                register_space,
                parameter_offset: parameters.len() as u32,
                ..Default::default()
            };

            for (kind, entries) in [
                (TableKind::CbvSrvUav, &mut builder.cbv_srv_uav),
                (TableKind::Sampler, &mut builder.samplers),
            ] {
                if entries.is_empty() {
                    continue;
                }
                entries.sort_by_key(|b| (b.binding, b.binding_type));

                let parameter_index = parameters.len() as u32;
                let mut ranges = Vec::with_capacity(entries.len());
                let mut stages = ShaderStages::empty();
                let mut offset = 0u32;
                for binding in entries.iter() {
                    ranges.push(DescriptorRange {
                        binding_type: binding.binding_type,
                        base_register: binding.binding,
                        register_space,
                        num_descriptors: binding.descriptor_count(),
                        offset_in_table: offset,
                        stages: binding.stages,
                    });
                    bindings.insert(binding.slot(), LayoutBinding {
                        binding: binding.clone(),
                        placement: BindingPlacement::Table { kind, offset },
                    });
                    stages |= binding.stages;
                    offset += binding.descriptor_count();
                }

                match kind {
                    TableKind::CbvSrvUav => {
                        space.cbv_srv_uav_table = Some(parameter_index);
                        space.cbv_srv_uav_count = offset;
                        space.cbv_srv_uav_stages = stages;
                    }
                    TableKind::Sampler => {
                        space.sampler_table = Some(parameter_index);
                        space.sampler_count = offset;
                        space.sampler_stages = stages;
                    }
                }
                parameters.push(RootParameter::Table { kind, register_space, ranges, stages });
            }

            builder.root_descriptors.sort_by_key(|b| (b.binding, b.binding_type));
            for (index, binding) in builder.root_descriptors.into_iter().enumerate() {
                let parameter_index = parameters.len() as u32;
                parameters.push(RootParameter::Descriptor {
                    binding_type: binding.binding_type,
                    binding: binding.binding,
                    register_space,
                    stages: binding.stages,
                });
                bindings.insert(binding.slot(), LayoutBinding {
                    binding,
                    placement: BindingPlacement::RootDescriptor { parameter_index, index: index as u32 },
                });
                space.root_descriptor_count += 1;
            }

            space_layouts.insert(register_space, space);
        }

        crate::engine_debug!("dz::RootSignature",
            "Layout: {} parameters, {} spaces, {} root constants",
            parameters.len(), space_layouts.len(), root_constants.len());

        Ok(Self {
            root_type: desc.root_type,
            parameters,
            spaces: space_layouts,
            bindings,
            root_constants,
            static_samplers: desc.static_samplers.clone(),
            used_stages,
            partition,
            root_constant_register_space: constant_space,
            root_level_buffer_register_space: root_level_space,
        })
    }

    pub fn root_type(&self) -> RootSignatureType {
        self.root_type
    }

    /// Root parameters in native order
    pub fn parameters(&self) -> &[RootParameter] {
        &self.parameters
    }

    pub fn spaces(&self) -> impl Iterator<Item = &RegisterSpaceLayout> {
        self.spaces.values()
    }

    pub fn space(&self, register_space: u32) -> Option<&RegisterSpaceLayout> {
        self.spaces.get(&register_space)
    }

    pub fn binding(&self, slot: &ResourceSlot) -> Option<&LayoutBinding> {
        self.bindings.get(slot)
    }

    /// Bindings of one register space, ordered by slot
    pub fn bindings_in_space(&self, register_space: u32) -> Vec<&LayoutBinding> {
        let mut found: Vec<&LayoutBinding> = self.bindings.values()
            .filter(|b| b.binding.register_space == register_space)
            .collect();
        found.sort_by_key(|b| b.binding.slot());
        found
    }

    pub fn root_constants(&self) -> &[RootConstantLayout] {
        &self.root_constants
    }

    pub fn root_constant(&self, binding: u32) -> Option<&RootConstantLayout> {
        self.root_constants.iter().find(|c| c.binding == binding)
    }

    pub fn static_samplers(&self) -> &[StaticSamplerDesc] {
        &self.static_samplers
    }

    pub fn used_stages(&self) -> ShaderStages {
        self.used_stages
    }

    pub fn partition_counts(&self) -> PartitionCounts {
        self.partition
    }

    pub fn root_constant_register_space(&self) -> u32 {
        self.root_constant_register_space
    }

    pub fn root_level_buffer_register_space(&self) -> u32 {
        self.root_level_buffer_register_space
    }

    /// Offset of `slot` within its table, or its index among the space's
    /// root descriptors
    pub fn resource_offset(&self, slot: &ResourceSlot) -> Result<u32> {
        match self.bindings.get(slot).map(|b| b.placement) {
            Some(BindingPlacement::Table { offset, .. }) => Ok(offset),
            Some(BindingPlacement::RootDescriptor { index, .. }) => Ok(index),
            Some(_) => crate::engine_bail!("dz::RootSignature", Binding =>
                "Binding {} has no table or root descriptor offset", slot),
            None => crate::engine_bail!("dz::RootSignature", Binding =>
                "Binding slot does not exist in root signature: {}", slot),
        }
    }

    /// Root parameter index of the first parameter of `register_space`
    pub fn register_space_offset(&self, register_space: u32) -> Result<u32> {
        match self.spaces.get(&register_space) {
            Some(space) => Ok(space.parameter_offset),
            None => crate::engine_bail!("dz::RootSignature", Binding =>
                "Register space {} does not exist in any binding", register_space),
        }
    }

    /// Total size of all root constants when packed back to back
    pub fn root_constants_num_bytes(&self) -> u32 {
        self.root_constants.last()
            .map(|c| c.offset + c.num_32bit_values() * 4)
            .unwrap_or(0)
    }
}

fn merge_root_constant(
    constants: &mut BTreeMap<u32, RootConstantResourceBinding>,
    constant: RootConstantResourceBinding,
) {
    match constants.get_mut(&constant.binding) {
        Some(existing) => {
            existing.stages |= constant.stages;
            existing.num_bytes = existing.num_bytes.max(constant.num_bytes);
        }
        None => {
            constants.insert(constant.binding, constant);
        }
    }
}

fn is_buffer_binding(binding: &ReflectionBinding) -> bool {
    use crate::types::ResourceDescriptor;
    binding.descriptor.intersects(
        ResourceDescriptor::UNIFORM_BUFFER
            | ResourceDescriptor::BUFFER
            | ResourceDescriptor::RW_BUFFER
            | ResourceDescriptor::STRUCTURED_BUFFER,
    ) && !binding.descriptor.intersects(ResourceDescriptor::TEXTURE | ResourceDescriptor::RW_TEXTURE)
}

// ============================================================================
// Backend object
// ============================================================================

/// Backend realization of a [`RootSignatureLayout`]
///
/// Shared read-only by every bind group and pipeline built against it.
pub trait RootSignature: Send + Sync {
    fn layout(&self) -> &RootSignatureLayout;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "root_signature_tests.rs"]
mod tests;
