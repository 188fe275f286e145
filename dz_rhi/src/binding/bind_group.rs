/// Resource bind groups
///
/// A bind group fills the slots of one register space of a root signature.
/// Updates are staged between `begin_update` and `end_update`; every staged
/// write is validated against the reflected slot before anything is stored,
/// so a rejected bind never changes what the group currently holds.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::binding::root_signature::{BindingPlacement, RootSignature, RootSignatureLayout, TableKind};
use crate::device::{BufferResource, Sampler, TextureResource};
use crate::error::Result;
use crate::shader::reflection::ResourceSlot;
use crate::types::{ResourceBindingType, ResourceDescriptor};

// ============================================================================
// Description
// ============================================================================

#[derive(Clone)]
pub struct ResourceBindGroupDesc {
    pub root_signature: Arc<dyn RootSignature>,
    pub register_space: u32,
}

impl ResourceBindGroupDesc {
    pub fn new(root_signature: Arc<dyn RootSignature>, register_space: u32) -> Self {
        Self { root_signature, register_space }
    }

    /// Bind group holding the root constants of `root_signature`
    pub fn root_constants(root_signature: Arc<dyn RootSignature>) -> Self {
        let register_space = root_signature.layout().root_constant_register_space();
        Self { root_signature, register_space }
    }
}

// ============================================================================
// Writes
// ============================================================================

/// A resource bound into a slot
#[derive(Clone)]
pub enum BoundResource {
    Buffer(Arc<dyn BufferResource>),
    Texture(Arc<dyn TextureResource>),
    Sampler(Arc<dyn Sampler>),
}

impl BoundResource {
    pub fn descriptor(&self) -> ResourceDescriptor {
        match self {
            BoundResource::Buffer(buffer) => buffer.desc().descriptor,
            BoundResource::Texture(texture) => texture.desc().descriptor,
            BoundResource::Sampler(_) => ResourceDescriptor::SAMPLER,
        }
    }

    pub fn native_handle(&self) -> u64 {
        match self {
            BoundResource::Buffer(buffer) => buffer.native_handle(),
            BoundResource::Texture(texture) => texture.native_handle(),
            BoundResource::Sampler(sampler) => sampler.native_handle(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BoundResource::Buffer(_) => "buffer",
            BoundResource::Texture(_) => "texture",
            BoundResource::Sampler(_) => "sampler",
        }
    }
}

impl std::fmt::Debug for BoundResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x})", self.kind(), self.native_handle())
    }
}

/// Native destination of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    Table { kind: TableKind, offset: u32 },
    RootDescriptor { parameter_index: u32, index: u32 },
}

/// One validated write handed to the backend at `end_update`
#[derive(Debug, Clone)]
pub struct BindingWrite {
    pub slot: ResourceSlot,
    pub target: BindingTarget,
    pub resource: BoundResource,
}

/// Backend half of a bind group (descriptor set, heap range, argument buffer)
pub trait NativeBindGroup: Send {
    /// Write validated bindings into native descriptors
    fn apply(&mut self, layout: &RootSignatureLayout, writes: &[BindingWrite]) -> Result<()>;

    /// Store root constant bytes for the next flush
    fn set_root_constants(&mut self, binding: u32, data: &[u8]) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Table
// ============================================================================

/// Live slot-to-resource table, sized once from the layout
#[derive(Debug, Clone, Default)]
pub struct BindGroupTable {
    cbv_srv_uav: Vec<Option<BoundResource>>,
    samplers: Vec<Option<BoundResource>>,
    root_descriptors: Vec<Option<BoundResource>>,
    root_constants: FxHashMap<u32, Vec<u8>>,
}

impl BindGroupTable {
    pub fn for_space(layout: &RootSignatureLayout, register_space: u32) -> Self {
        let space = layout.space(register_space);
        let count = |n: Option<u32>| vec![None; n.unwrap_or(0) as usize];
        Self {
            cbv_srv_uav: count(space.map(|s| s.cbv_srv_uav_count)),
            samplers: count(space.map(|s| s.sampler_count)),
            root_descriptors: count(space.map(|s| s.root_descriptor_count)),
            root_constants: FxHashMap::default(),
        }
    }

    pub fn cbv_srv_uav_count(&self) -> u32 {
        self.cbv_srv_uav.len() as u32
    }

    pub fn sampler_count(&self) -> u32 {
        self.samplers.len() as u32
    }

    pub fn root_descriptor_count(&self) -> u32 {
        self.root_descriptors.len() as u32
    }

    pub fn get(&self, target: BindingTarget) -> Option<&BoundResource> {
        match target {
            BindingTarget::Table { kind: TableKind::CbvSrvUav, offset } => self.cbv_srv_uav.get(offset as usize)?.as_ref(),
            BindingTarget::Table { kind: TableKind::Sampler, offset } => self.samplers.get(offset as usize)?.as_ref(),
            BindingTarget::RootDescriptor { index, .. } => self.root_descriptors.get(index as usize)?.as_ref(),
        }
    }

    pub fn root_constant_data(&self, binding: u32) -> Option<&[u8]> {
        self.root_constants.get(&binding).map(Vec::as_slice)
    }

    /// Number of filled slots across all tables
    pub fn bound_count(&self) -> usize {
        self.cbv_srv_uav.iter()
            .chain(self.samplers.iter())
            .chain(self.root_descriptors.iter())
            .filter(|r| r.is_some())
            .count()
    }

    fn store(&mut self, write: &BindingWrite) {
        let entry = match write.target {
            BindingTarget::Table { kind: TableKind::CbvSrvUav, offset } => self.cbv_srv_uav.get_mut(offset as usize),
            BindingTarget::Table { kind: TableKind::Sampler, offset } => self.samplers.get_mut(offset as usize),
            BindingTarget::RootDescriptor { index, .. } => self.root_descriptors.get_mut(index as usize),
        };
        if let Some(entry) = entry {
            *entry = Some(write.resource.clone());
        }
    }
}

// ============================================================================
// Bind group
// ============================================================================

struct BindGroupState {
    table: BindGroupTable,
    pending: Vec<BindingWrite>,
    updating: bool,
    native: Box<dyn NativeBindGroup>,
}

/// Slots of one register space, bound as a unit by
/// [`CommandList::bind_resource_group`](crate::command_list::CommandList::bind_resource_group)
pub struct ResourceBindGroup {
    root_signature: Arc<dyn RootSignature>,
    register_space: u32,
    state: Mutex<BindGroupState>,
}

impl ResourceBindGroup {
    /// Wrap the backend half created by a device
    pub fn new(desc: &ResourceBindGroupDesc, native: Box<dyn NativeBindGroup>) -> Result<Self> {
        let layout = desc.root_signature.layout();
        let is_constants = desc.register_space == layout.root_constant_register_space();
        if layout.space(desc.register_space).is_none() && !is_constants {
            crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                "Register space {} is not bound by the root signature", desc.register_space);
        }

        Ok(Self {
            root_signature: Arc::clone(&desc.root_signature),
            register_space: desc.register_space,
            state: Mutex::new(BindGroupState {
                table: BindGroupTable::for_space(layout, desc.register_space),
                pending: Vec::new(),
                updating: false,
                native,
            }),
        })
    }

    pub fn root_signature(&self) -> &Arc<dyn RootSignature> {
        &self.root_signature
    }

    pub fn register_space(&self) -> u32 {
        self.register_space
    }

    fn state(&self) -> Result<MutexGuard<'_, BindGroupState>> {
        self.state.lock()
            .map_err(|_| crate::engine_err!("dz::ResourceBindGroup", "Bind group state poisoned"))
    }

    pub fn begin_update(&self) -> Result<()> {
        let mut state = self.state()?;
        if state.updating {
            crate::engine_bail_warn!("dz::ResourceBindGroup", ContractViolation =>
                "begin_update called twice on space {}", self.register_space);
        }
        state.updating = true;
        state.pending.clear();
        Ok(())
    }

    pub fn cbv(&self, binding: u32, buffer: &Arc<dyn BufferResource>) -> Result<()> {
        self.stage(binding, ResourceBindingType::ConstantBuffer, BoundResource::Buffer(Arc::clone(buffer)))
    }

    pub fn srv_buffer(&self, binding: u32, buffer: &Arc<dyn BufferResource>) -> Result<()> {
        self.stage(binding, ResourceBindingType::ShaderResource, BoundResource::Buffer(Arc::clone(buffer)))
    }

    pub fn srv_texture(&self, binding: u32, texture: &Arc<dyn TextureResource>) -> Result<()> {
        self.stage(binding, ResourceBindingType::ShaderResource, BoundResource::Texture(Arc::clone(texture)))
    }

    pub fn uav_buffer(&self, binding: u32, buffer: &Arc<dyn BufferResource>) -> Result<()> {
        self.stage(binding, ResourceBindingType::UnorderedAccess, BoundResource::Buffer(Arc::clone(buffer)))
    }

    pub fn uav_texture(&self, binding: u32, texture: &Arc<dyn TextureResource>) -> Result<()> {
        self.stage(binding, ResourceBindingType::UnorderedAccess, BoundResource::Texture(Arc::clone(texture)))
    }

    pub fn sampler(&self, binding: u32, sampler: &Arc<dyn Sampler>) -> Result<()> {
        self.stage(binding, ResourceBindingType::Sampler, BoundResource::Sampler(Arc::clone(sampler)))
    }

    fn stage(&self, binding: u32, binding_type: ResourceBindingType, resource: BoundResource) -> Result<()> {
        let slot = ResourceSlot { register_space: self.register_space, binding, binding_type };
        let layout = self.root_signature.layout();

        let Some(entry) = layout.binding(&slot) else {
            crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                "Binding slot does not exist in root signature: {}", slot);
        };
        let target = match entry.placement {
            BindingPlacement::Table { kind, offset } => BindingTarget::Table { kind, offset },
            BindingPlacement::RootDescriptor { parameter_index, index } => {
                if !matches!(resource, BoundResource::Buffer(_)) {
                    crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                        "{} is a root descriptor and only accepts buffers", slot);
                }
                BindingTarget::RootDescriptor { parameter_index, index }
            }
            BindingPlacement::RootConstant { .. } => {
                crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                    "{} holds root constants, use set_root_constants", slot);
            }
            BindingPlacement::StaticSampler => {
                crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                    "{} is a static sampler and cannot be rebound", slot);
            }
        };
        if !resource.descriptor().satisfies(entry.binding.descriptor) {
            crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                "'{}' at {} expects {:?} but the {} was created as {:?}",
                entry.binding.name, slot, entry.binding.descriptor, resource.kind(), resource.descriptor());
        }

        let mut state = self.state()?;
        if !state.updating {
            crate::engine_bail_warn!("dz::ResourceBindGroup", ContractViolation =>
                "Binding {} outside begin_update/end_update", slot);
        }
        state.pending.retain(|w| w.slot != slot);
        state.pending.push(BindingWrite { slot, target, resource });
        Ok(())
    }

    /// Hand the staged writes to the backend and commit them
    pub fn end_update(&self) -> Result<()> {
        let mut guard = self.state()?;
        let state = &mut *guard;
        if !state.updating {
            crate::engine_bail_warn!("dz::ResourceBindGroup", ContractViolation =>
                "end_update without begin_update on space {}", self.register_space);
        }
        state.updating = false;
        let writes = std::mem::take(&mut state.pending);
        if writes.is_empty() {
            return Ok(());
        }

        state.native.apply(self.root_signature.layout(), &writes)?;
        for write in &writes {
            state.table.store(write);
        }
        crate::engine_trace!("dz::ResourceBindGroup",
            "Space {}: {} bindings written", self.register_space, writes.len());
        Ok(())
    }

    /// Replace the bytes of root constant block `binding`
    pub fn set_root_constants(&self, binding: u32, data: &[u8]) -> Result<()> {
        let layout = self.root_signature.layout();
        let Some(constant) = layout.root_constant(binding) else {
            crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                "Root constant b{} does not exist in root signature", binding);
        };
        if data.len() as u32 != constant.num_bytes {
            crate::engine_bail!("dz::ResourceBindGroup", Binding =>
                "Root constant '{}' is {} bytes, got {}", constant.name, constant.num_bytes, data.len());
        }

        let mut state = self.state()?;
        state.native.set_root_constants(binding, data)?;
        state.table.root_constants.insert(binding, data.to_vec());
        Ok(())
    }

    /// Snapshot of the committed table
    pub fn table(&self) -> Result<BindGroupTable> {
        Ok(self.state()?.table.clone())
    }

    pub fn is_updating(&self) -> bool {
        self.state().map(|s| s.updating).unwrap_or(false)
    }

    /// Run `f` with the backend half (used by command lists at bind time)
    pub fn with_native<R>(&self, f: impl FnOnce(&dyn NativeBindGroup, &BindGroupTable) -> R) -> Result<R> {
        let state = self.state()?;
        Ok(f(state.native.as_ref(), &state.table))
    }
}

impl std::fmt::Debug for ResourceBindGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBindGroup")
            .field("register_space", &self.register_space)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "bind_group_tests.rs"]
mod tests;
