/// Queue-aware command recording
///
/// `CommandList` wraps a backend and enforces what the native APIs leave to
/// the caller: the Initial → Recording → Executable → Submitted lifecycle,
/// which operations each queue type may record, and root-signature
/// consistency between pipelines and bind groups.

use std::sync::Arc;
use crate::barrier::{BarrierTranslator, PipelineBarrierDesc};
use crate::binding::{ResourceBindGroup, RootSignature};
use crate::command_list::backend::CommandListBackend;
use crate::command_list::descs::*;
use crate::device::{BindPoint, BufferResource, Pipeline, PresentDesc};
use crate::error::Result;
use crate::types::QueueType;

const SOURCE: &str = "dz::CommandList";

/// Lifecycle of a command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    Initial,
    Recording,
    /// Recording with a pipeline bound; draws and dispatches are legal
    PipelineBound,
    Executable,
    Submitted,
}

impl CommandListState {
    pub fn is_recording(self) -> bool {
        matches!(self, CommandListState::Recording | CommandListState::PipelineBound)
    }
}

pub struct CommandList {
    backend: Box<dyn CommandListBackend>,
    queue_type: QueueType,
    state: CommandListState,
    bind_point: BindPoint,
    current_root_signature: Option<Arc<dyn RootSignature>>,
    current_pipeline: Option<Arc<dyn Pipeline>>,
    queued_bind_groups: Vec<Arc<ResourceBindGroup>>,
    rendering: bool,
}

/// Identity comparison that ignores vtable pointers
fn same_root_signature(a: &Arc<dyn RootSignature>, b: &Arc<dyn RootSignature>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn default_bind_point(queue_type: QueueType) -> BindPoint {
    match queue_type {
        QueueType::Compute => BindPoint::Compute,
        QueueType::RayTracing => BindPoint::RayTracing,
        QueueType::Graphics | QueueType::Copy => BindPoint::Graphics,
    }
}

impl CommandList {
    pub fn new(desc: &CommandListDesc, backend: Box<dyn CommandListBackend>) -> Self {
        Self {
            backend,
            queue_type: desc.queue_type,
            state: CommandListState::Initial,
            bind_point: default_bind_point(desc.queue_type),
            current_root_signature: None,
            current_pipeline: None,
            queued_bind_groups: Vec::new(),
            rendering: false,
        }
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    /// Root signature the native list currently has set
    pub fn current_root_signature(&self) -> Option<&Arc<dyn RootSignature>> {
        self.current_root_signature.as_ref()
    }

    pub fn backend(&self) -> &dyn CommandListBackend {
        self.backend.as_ref()
    }

    // ===== LEGALITY =====

    fn require_queue(&self, operation: &str, allowed: &[QueueType]) -> Result<()> {
        if !allowed.contains(&self.queue_type) {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "{} is not legal on a {} queue", operation, self.queue_type);
        }
        Ok(())
    }

    fn require_recording(&self, operation: &str) -> Result<()> {
        if !self.state.is_recording() {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "{} called while the list is {:?}", operation, self.state);
        }
        Ok(())
    }

    fn require_pipeline(&self, operation: &str) -> Result<()> {
        if self.state != CommandListState::PipelineBound {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "{} called without a bound pipeline ({:?})", operation, self.state);
        }
        Ok(())
    }

    // ===== LIFECYCLE =====

    /// Reset the list and start recording
    pub fn begin(&mut self) -> Result<()> {
        if self.state.is_recording() {
            crate::engine_bail!(SOURCE, ContractViolation => "begin called on a list that is already recording");
        }
        self.backend.begin()?;
        self.current_root_signature = None;
        self.current_pipeline = None;
        self.queued_bind_groups.clear();
        self.rendering = false;
        self.bind_point = default_bind_point(self.queue_type);
        self.state = CommandListState::Recording;
        Ok(())
    }

    /// Close recording; `execute` calls this when still recording
    pub fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.rendering {
            crate::engine_bail!(SOURCE, ContractViolation => "end called inside a rendering scope");
        }
        if !self.queued_bind_groups.is_empty() {
            crate::engine_warn!(SOURCE, "{} bind group(s) queued but never used by a draw or dispatch",
                self.queued_bind_groups.len());
            self.queued_bind_groups.clear();
        }
        self.backend.end()?;
        self.state = CommandListState::Executable;
        Ok(())
    }

    /// Submit the list: wait on every semaphore, submit, signal every
    /// semaphore, then the fence
    pub fn execute(&mut self, desc: &ExecuteDesc) -> Result<()> {
        if self.state.is_recording() {
            self.end()?;
        }
        if self.state != CommandListState::Executable {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "execute called while the list is {:?}", self.state);
        }

        for semaphore in &desc.wait_on_semaphores {
            self.backend.queue_wait(semaphore)?;
        }
        self.backend.queue_submit()?;
        for semaphore in &desc.notify_semaphores {
            self.backend.queue_signal(semaphore)?;
        }
        if let Some(fence) = &desc.notify {
            self.backend.queue_signal_fence(fence)?;
        }

        self.state = CommandListState::Submitted;
        Ok(())
    }

    pub fn present(&mut self, desc: &PresentDesc) -> Result<()> {
        self.require_queue("present", &[QueueType::Graphics])?;
        if self.state.is_recording() {
            crate::engine_bail!(SOURCE, ContractViolation => "present called while the list is recording");
        }
        if desc.image_index >= desc.swap_chain.image_count() {
            crate::engine_bail!(SOURCE, InvalidResource =>
                "Swap chain image {} out of range ({} images)", desc.image_index, desc.swap_chain.image_count());
        }
        self.backend.present(desc)
    }

    // ===== RENDERING =====

    pub fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.require_recording("begin_rendering")?;
        self.require_queue("begin_rendering", &[QueueType::Graphics])?;
        if self.rendering {
            crate::engine_bail!(SOURCE, ContractViolation => "begin_rendering called inside a rendering scope");
        }
        if desc.render_targets.is_empty() && desc.depth_attachment.is_none() {
            crate::engine_bail!(SOURCE, ContractViolation => "begin_rendering requires at least one attachment");
        }
        self.backend.begin_rendering(desc)?;
        self.rendering = true;
        Ok(())
    }

    pub fn end_rendering(&mut self) -> Result<()> {
        self.require_recording("end_rendering")?;
        if !self.rendering {
            crate::engine_bail!(SOURCE, ContractViolation => "end_rendering called without begin_rendering");
        }
        self.backend.end_rendering()?;
        self.rendering = false;
        Ok(())
    }

    // ===== STATE BINDING =====

    /// Bind a pipeline, setting its root signature when it differs from the
    /// one currently set
    pub fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.require_recording("bind_pipeline")?;
        let allowed: &[QueueType] = match pipeline.bind_point() {
            BindPoint::Graphics => &[QueueType::Graphics],
            BindPoint::Compute => &[QueueType::Graphics, QueueType::Compute],
            BindPoint::RayTracing => &[QueueType::RayTracing],
        };
        self.require_queue("bind_pipeline", allowed)?;

        self.backend.bind_pipeline(pipeline)?;
        self.bind_point = pipeline.bind_point();

        let root_signature = pipeline.root_signature();
        let unchanged = self.current_root_signature.as_ref()
            .is_some_and(|current| same_root_signature(current, root_signature));
        if !unchanged {
            self.backend.set_root_signature(root_signature, self.bind_point)?;
            self.current_root_signature = Some(Arc::clone(root_signature));
        }

        self.current_pipeline = Some(Arc::clone(pipeline));
        self.state = CommandListState::PipelineBound;
        Ok(())
    }

    /// Explicitly set a root signature
    ///
    /// Setting the current signature again is a no-op. Replacing a different
    /// one is legal but logged, since it invalidates every bound table.
    pub fn set_root_signature(&mut self, root_signature: &Arc<dyn RootSignature>) -> Result<()> {
        self.require_recording("set_root_signature")?;
        self.require_queue("set_root_signature",
            &[QueueType::Graphics, QueueType::Compute, QueueType::RayTracing])?;

        if let Some(current) = &self.current_root_signature {
            if same_root_signature(current, root_signature) {
                return Ok(());
            }
            crate::engine_warn!(SOURCE, "Replacing the bound root signature; bound tables are invalidated");
        }
        self.backend.set_root_signature(root_signature, self.bind_point)?;
        self.current_root_signature = Some(Arc::clone(root_signature));
        Ok(())
    }

    /// Queue a bind group; it is applied right before the next draw, dispatch or trace
    pub fn bind_resource_group(&mut self, group: &Arc<ResourceBindGroup>) -> Result<()> {
        self.require_recording("bind_resource_group")?;
        self.require_queue("bind_resource_group",
            &[QueueType::Graphics, QueueType::Compute, QueueType::RayTracing])?;
        if group.is_updating() {
            crate::engine_warn!(SOURCE, "Bind group for space {} queued while an update is open",
                group.register_space());
        }
        self.queued_bind_groups.retain(|queued| queued.register_space() != group.register_space());
        self.queued_bind_groups.push(Arc::clone(group));
        Ok(())
    }

    fn flush_bind_groups(&mut self) -> Result<()> {
        for group in std::mem::take(&mut self.queued_bind_groups) {
            match &self.current_root_signature {
                Some(current) if !same_root_signature(current, group.root_signature()) => {
                    crate::engine_warn!(SOURCE,
                        "Bind group for space {} was created against a different root signature",
                        group.register_space());
                }
                None => {
                    crate::engine_warn!(SOURCE, "Bind group for space {} applied with no root signature set",
                        group.register_space());
                }
                _ => {}
            }
            self.backend.bind_resource_group(&group, self.bind_point)?;
        }
        Ok(())
    }

    pub fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64) -> Result<()> {
        self.require_recording("bind_vertex_buffer")?;
        self.require_queue("bind_vertex_buffer", &[QueueType::Graphics])?;
        self.backend.bind_vertex_buffer(buffer, offset)
    }

    pub fn bind_index_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_recording("bind_index_buffer")?;
        self.require_queue("bind_index_buffer", &[QueueType::Graphics])?;
        self.backend.bind_index_buffer(buffer, offset, index_type)
    }

    pub fn bind_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.require_recording("bind_viewport")?;
        self.require_queue("bind_viewport", &[QueueType::Graphics])?;
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "Viewport extent must be positive, got {}x{}", viewport.width, viewport.height);
        }
        self.backend.bind_viewport(viewport)
    }

    pub fn bind_scissor_rect(&mut self, rect: &ScissorRect) -> Result<()> {
        self.require_recording("bind_scissor_rect")?;
        self.require_queue("bind_scissor_rect", &[QueueType::Graphics])?;
        if rect.width() <= 0 || rect.height() <= 0 {
            crate::engine_bail!(SOURCE, ContractViolation =>
                "Scissor extent must be positive, got {}x{}", rect.width(), rect.height());
        }
        self.backend.bind_scissor_rect(rect)
    }

    // ===== BARRIERS =====

    pub fn pipeline_barrier(&mut self, desc: &PipelineBarrierDesc) -> Result<()> {
        self.require_recording("pipeline_barrier")?;
        let plan = BarrierTranslator::plan(desc, self.queue_type, self.backend.supports_subresource_barriers())?;
        if plan.is_empty() {
            return Ok(());
        }
        self.backend.pipeline_barrier(&plan)
    }

    // ===== WORK =====

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.require_recording("draw")?;
        self.require_queue("draw", &[QueueType::Graphics])?;
        self.require_pipeline("draw")?;
        if vertex_count == 0 || instance_count == 0 {
            crate::engine_warn!(SOURCE, "draw with {} vertices and {} instances records no work",
                vertex_count, instance_count);
        }
        self.flush_bind_groups()?;
        self.backend.draw(vertex_count, instance_count, first_vertex, first_instance)
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.require_recording("draw_indexed")?;
        self.require_queue("draw_indexed", &[QueueType::Graphics])?;
        self.require_pipeline("draw_indexed")?;
        if index_count == 0 || instance_count == 0 {
            crate::engine_warn!(SOURCE, "draw_indexed with {} indices and {} instances records no work",
                index_count, instance_count);
        }
        self.flush_bind_groups()?;
        self.backend.draw_indexed(index_count, instance_count, first_index, vertex_offset, first_instance)
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.require_recording("dispatch")?;
        self.require_queue("dispatch", &[QueueType::Compute])?;
        self.require_pipeline("dispatch")?;
        if x == 0 || y == 0 || z == 0 {
            crate::engine_warn!(SOURCE, "dispatch of {}x{}x{} groups records no work", x, y, z);
        }
        self.flush_bind_groups()?;
        self.backend.dispatch(x, y, z)
    }

    pub fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.require_recording("dispatch_mesh")?;
        self.require_queue("dispatch_mesh", &[QueueType::Graphics])?;
        self.require_pipeline("dispatch_mesh")?;
        if x == 0 || y == 0 || z == 0 {
            crate::engine_warn!(SOURCE, "dispatch_mesh of {}x{}x{} groups records no work", x, y, z);
        }
        self.flush_bind_groups()?;
        self.backend.dispatch_mesh(x, y, z)
    }

    pub fn dispatch_rays(&mut self, desc: &DispatchRaysDesc) -> Result<()> {
        self.require_recording("dispatch_rays")?;
        self.require_queue("dispatch_rays", &[QueueType::RayTracing])?;
        self.require_pipeline("dispatch_rays")?;
        if desc.width == 0 || desc.height == 0 || desc.depth == 0 {
            crate::engine_warn!(SOURCE, "dispatch_rays of {}x{}x{} rays records no work",
                desc.width, desc.height, desc.depth);
        }
        self.flush_bind_groups()?;
        self.backend.dispatch_rays(desc)
    }

    // ===== COPIES =====

    pub fn copy_buffer_region(&mut self, desc: &CopyBufferRegionDesc) -> Result<()> {
        self.require_recording("copy_buffer_region")?;
        let src_size = desc.src_buffer.desc().num_bytes;
        let dst_size = desc.dst_buffer.desc().num_bytes;
        let fits = |offset: u64, size: u64| offset.checked_add(desc.num_bytes).is_some_and(|end| end <= size);
        if !fits(desc.src_offset, src_size) || !fits(desc.dst_offset, dst_size) {
            crate::engine_bail!(SOURCE, InvalidResource =>
                "Copy of {} bytes ({} -> {}) exceeds buffer sizes {} / {}",
                desc.num_bytes, desc.src_offset, desc.dst_offset, src_size, dst_size);
        }
        self.backend.copy_buffer_region(desc)
    }

    pub fn copy_texture_region(&mut self, desc: &CopyTextureRegionDesc) -> Result<()> {
        self.require_recording("copy_texture_region")?;
        self.backend.copy_texture_region(desc)
    }

    pub fn copy_buffer_to_texture(&mut self, desc: &CopyBufferToTextureDesc) -> Result<()> {
        self.require_recording("copy_buffer_to_texture")?;
        if desc.mip_level >= desc.dst_texture.desc().mip_levels {
            crate::engine_bail!(SOURCE, InvalidResource =>
                "Mip {} out of range for '{}'", desc.mip_level, desc.dst_texture.desc().debug_name);
        }
        self.backend.copy_buffer_to_texture(desc)
    }

    pub fn copy_texture_to_buffer(&mut self, desc: &CopyTextureToBufferDesc) -> Result<()> {
        self.require_recording("copy_texture_to_buffer")?;
        if desc.mip_level >= desc.src_texture.desc().mip_levels {
            crate::engine_bail!(SOURCE, InvalidResource =>
                "Mip {} out of range for '{}'", desc.mip_level, desc.src_texture.desc().debug_name);
        }
        self.backend.copy_texture_to_buffer(desc)
    }

    // ===== ACCELERATION STRUCTURES =====

    pub fn build_top_level_as(&mut self, desc: &BuildTopLevelASDesc) -> Result<()> {
        self.require_recording("build_top_level_as")?;
        self.require_queue("build_top_level_as", &[QueueType::Compute, QueueType::RayTracing])?;
        self.backend.build_top_level_as(desc)
    }

    pub fn build_bottom_level_as(&mut self, desc: &BuildBottomLevelASDesc) -> Result<()> {
        self.require_recording("build_bottom_level_as")?;
        self.require_queue("build_bottom_level_as", &[QueueType::Compute, QueueType::RayTracing])?;
        if desc.geometries.is_empty() {
            crate::engine_warn!(SOURCE, "Bottom-level build with no geometry");
        }
        self.backend.build_bottom_level_as(desc)
    }
}

#[cfg(test)]
#[path = "command_list_tests.rs"]
mod tests;
