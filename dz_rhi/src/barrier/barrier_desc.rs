/// Barrier requests
///
/// A `PipelineBarrierDesc` is built fresh at every barrier point and consumed
/// immediately by [`CommandList::pipeline_barrier`](crate::command_list::CommandList::pipeline_barrier).
/// Nothing here tracks the current state of a resource; the caller supplies
/// the prior usage.

use std::sync::Arc;
use crate::device::{BufferResource, TextureResource};
use crate::types::{QueueType, ResourceUsage};

#[derive(Clone)]
pub struct TextureBarrierDesc {
    pub resource: Arc<dyn TextureResource>,
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
    /// Ownership transfer between `source_queue` and `destination_queue`
    pub enable_queue_barrier: bool,
    pub source_queue: QueueType,
    pub destination_queue: QueueType,
    /// Limit the barrier to one mip of one array layer
    pub enable_subresource_barrier: bool,
    pub mip_level: u32,
    pub array_layer: u32,
}

impl TextureBarrierDesc {
    pub fn new(resource: &Arc<dyn TextureResource>, old_state: ResourceUsage, new_state: ResourceUsage) -> Self {
        Self {
            resource: Arc::clone(resource),
            old_state,
            new_state,
            enable_queue_barrier: false,
            source_queue: QueueType::Graphics,
            destination_queue: QueueType::Graphics,
            enable_subresource_barrier: false,
            mip_level: 0,
            array_layer: 0,
        }
    }

    pub fn with_queue_transfer(mut self, source_queue: QueueType, destination_queue: QueueType) -> Self {
        self.enable_queue_barrier = true;
        self.source_queue = source_queue;
        self.destination_queue = destination_queue;
        self
    }

    pub fn with_subresource(mut self, mip_level: u32, array_layer: u32) -> Self {
        self.enable_subresource_barrier = true;
        self.mip_level = mip_level;
        self.array_layer = array_layer;
        self
    }

    /// A queue barrier between two different queues
    pub fn is_cross_queue(&self) -> bool {
        self.enable_queue_barrier && self.source_queue != self.destination_queue
    }
}

#[derive(Clone)]
pub struct BufferBarrierDesc {
    pub resource: Arc<dyn BufferResource>,
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
}

impl BufferBarrierDesc {
    pub fn new(resource: &Arc<dyn BufferResource>, old_state: ResourceUsage, new_state: ResourceUsage) -> Self {
        Self { resource: Arc::clone(resource), old_state, new_state }
    }
}

/// Global memory dependency, not tied to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBarrierDesc {
    pub old_state: ResourceUsage,
    pub new_state: ResourceUsage,
}

#[derive(Clone, Default)]
pub struct PipelineBarrierDesc {
    pub texture_barriers: Vec<TextureBarrierDesc>,
    pub buffer_barriers: Vec<BufferBarrierDesc>,
    pub memory_barriers: Vec<MemoryBarrierDesc>,
}

impl PipelineBarrierDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_barrier(mut self, barrier: TextureBarrierDesc) -> Self {
        self.texture_barriers.push(barrier);
        self
    }

    pub fn buffer_barrier(mut self, barrier: BufferBarrierDesc) -> Self {
        self.buffer_barriers.push(barrier);
        self
    }

    pub fn memory_barrier(mut self, barrier: MemoryBarrierDesc) -> Self {
        self.memory_barriers.push(barrier);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.texture_barriers.is_empty() && self.buffer_barriers.is_empty() && self.memory_barriers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.texture_barriers.len() + self.buffer_barriers.len() + self.memory_barriers.len()
    }

    // ===== Common transitions =====

    pub fn undefined_to_render_target(texture: &Arc<dyn TextureResource>) -> Self {
        Self::new().texture_barrier(TextureBarrierDesc::new(
            texture, ResourceUsage::UNDEFINED, ResourceUsage::RENDER_TARGET))
    }

    pub fn render_target_to_present(texture: &Arc<dyn TextureResource>) -> Self {
        Self::new().texture_barrier(TextureBarrierDesc::new(
            texture, ResourceUsage::RENDER_TARGET, ResourceUsage::PRESENT))
    }

    pub fn render_target_to_shader_resource(texture: &Arc<dyn TextureResource>) -> Self {
        Self::new().texture_barrier(TextureBarrierDesc::new(
            texture, ResourceUsage::RENDER_TARGET, ResourceUsage::SHADER_RESOURCE))
    }

    pub fn uav_to_uav(texture: &Arc<dyn TextureResource>) -> Self {
        Self::new().texture_barrier(TextureBarrierDesc::new(
            texture, ResourceUsage::UNORDERED_ACCESS, ResourceUsage::UNORDERED_ACCESS))
    }
}
