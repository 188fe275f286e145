/// Native half of a command list
///
/// Backends implement `CommandListBackend`; [`CommandList`](crate::command_list::CommandList)
/// owns one and performs every state, legality and binding check before a
/// call reaches it. Implementations can assume arguments are valid for the
/// queue they were created on.

use std::sync::Arc;
use crate::barrier::BarrierPlan;
use crate::binding::{ResourceBindGroup, RootSignature};
use crate::command_list::descs::*;
use crate::device::{BindPoint, BufferResource, Fence, Pipeline, PresentDesc, Semaphore};
use crate::error::Result;

pub trait CommandListBackend: Send {
    /// Whether the device's barrier strategy can scope a barrier to one subresource
    fn supports_subresource_barriers(&self) -> bool;

    /// Reset the allocator and open the list for recording
    fn begin(&mut self) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()>;

    fn end_rendering(&mut self) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    fn set_root_signature(&mut self, root_signature: &Arc<dyn RootSignature>, bind_point: BindPoint) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64, index_type: IndexType) -> Result<()>;

    fn bind_viewport(&mut self, viewport: &Viewport) -> Result<()>;

    fn bind_scissor_rect(&mut self, rect: &ScissorRect) -> Result<()>;

    fn bind_resource_group(&mut self, group: &ResourceBindGroup, bind_point: BindPoint) -> Result<()>;

    fn pipeline_barrier(&mut self, plan: &BarrierPlan) -> Result<()>;

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()>;

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32) -> Result<()>;

    fn dispatch_rays(&mut self, desc: &DispatchRaysDesc) -> Result<()>;

    fn copy_buffer_region(&mut self, desc: &CopyBufferRegionDesc) -> Result<()>;

    fn copy_texture_region(&mut self, desc: &CopyTextureRegionDesc) -> Result<()>;

    fn copy_buffer_to_texture(&mut self, desc: &CopyBufferToTextureDesc) -> Result<()>;

    fn copy_texture_to_buffer(&mut self, desc: &CopyTextureToBufferDesc) -> Result<()>;

    fn build_top_level_as(&mut self, desc: &BuildTopLevelASDesc) -> Result<()>;

    fn build_bottom_level_as(&mut self, desc: &BuildBottomLevelASDesc) -> Result<()>;

    /// Make the queue wait on `semaphore` before work submitted after this call
    fn queue_wait(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()>;

    /// Submit the recorded list
    fn queue_submit(&mut self) -> Result<()>;

    /// Signal `semaphore` after everything submitted so far
    fn queue_signal(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()>;

    fn queue_signal_fence(&mut self, fence: &Arc<dyn Fence>) -> Result<()>;

    fn present(&mut self, desc: &PresentDesc) -> Result<()>;
}
