/// Logical device collaborator
///
/// The device is the factory for every GPU object the core consumes. Backends
/// implement it once; the core never sees native types.

use std::sync::Arc;
use crate::binding::{ResourceBindGroup, ResourceBindGroupDesc, RootSignature, RootSignatureDesc};
use crate::command_list::{CommandList, CommandListDesc, CommandListPool, CommandListPoolDesc};
use crate::device::{
    BufferDesc, BufferResource, Fence, Pipeline, PipelineDesc, Sampler, SamplerDesc,
    Semaphore, TextureDesc, TextureResource,
};
use crate::error::Result;
use crate::shader::TargetIL;

/// Feature set detected at device creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Separately-synchronized barriers (DX12 enhanced barriers, Vulkan synchronization2)
    pub enhanced_barriers: bool,
    /// Per-subresource transition barriers
    pub subresource_barriers: bool,
    pub ray_tracing: bool,
    pub mesh_shaders: bool,
    pub dedicated_compute_queue: bool,
    pub dedicated_copy_queue: bool,
    /// Bytecode pipelines of this device consume
    pub native_target_il: TargetIL,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            enhanced_barriers: false,
            subresource_barriers: true,
            ray_tracing: false,
            mesh_shaders: false,
            dedicated_compute_queue: false,
            dedicated_copy_queue: false,
            native_target_il: TargetIL::Spirv,
        }
    }
}

pub trait LogicalDevice: Send + Sync {
    fn capabilities(&self) -> DeviceCapabilities;

    fn create_buffer_resource(&self, desc: &BufferDesc) -> Result<Arc<dyn BufferResource>>;

    fn create_texture_resource(&self, desc: &TextureDesc) -> Result<Arc<dyn TextureResource>>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<Arc<dyn RootSignature>>;

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_resource_bind_group(&self, desc: &ResourceBindGroupDesc) -> Result<Arc<ResourceBindGroup>>;

    fn create_command_list(&self, desc: &CommandListDesc) -> Result<CommandList>;

    /// Several lists for one queue, each recordable from its own thread
    fn create_command_list_pool(&self, desc: &CommandListPoolDesc) -> Result<CommandListPool>;

    fn create_fence(&self) -> Result<Arc<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    /// Boolean poll; a lost device requires rebuilding every GPU object
    fn is_device_lost(&self) -> bool;

    fn wait_idle(&self) -> Result<()>;
}
