/// Command list argument types

use std::sync::Arc;
use crate::device::{BufferResource, Fence, Semaphore, TextureResource};
use crate::types::{Format, QueueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandListDesc {
    pub queue_type: QueueType,
}

/// Synchronization of one submission
#[derive(Clone, Default)]
pub struct ExecuteDesc {
    /// Waited on before the list runs
    pub wait_on_semaphores: Vec<Arc<dyn Semaphore>>,
    /// Signaled once the list completes
    pub notify_semaphores: Vec<Arc<dyn Semaphore>>,
    /// Completion fence signaled last
    pub notify: Option<Arc<dyn Fence>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { x: 0.0, y: 0.0, width, height, min_depth: 0.0, max_depth: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    pub fn new(width: i32, height: i32) -> Self {
        Self { left: 0, top: 0, right: width, bottom: height }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    Uint16,
    #[default]
    Uint32,
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOp {
    Load,
    #[default]
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

#[derive(Clone)]
pub struct RenderingAttachmentDesc {
    pub resource: Arc<dyn TextureResource>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_color: [f32; 4],
}

impl RenderingAttachmentDesc {
    pub fn new(resource: &Arc<dyn TextureResource>) -> Self {
        Self {
            resource: Arc::clone(resource),
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone)]
pub struct DepthAttachmentDesc {
    pub resource: Arc<dyn TextureResource>,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// Dynamic rendering scope
#[derive(Clone, Default)]
pub struct RenderingDesc {
    pub render_targets: Vec<RenderingAttachmentDesc>,
    pub depth_attachment: Option<DepthAttachmentDesc>,
    /// 0 takes the size of the first attachment
    pub render_area_width: u32,
    pub render_area_height: u32,
}

impl RenderingDesc {
    /// Render area, falling back to the first attachment's extent
    pub fn render_area(&self) -> (u32, u32) {
        if self.render_area_width > 0 && self.render_area_height > 0 {
            return (self.render_area_width, self.render_area_height);
        }
        let first = self.render_targets.first().map(|rt| rt.resource.desc())
            .or_else(|| self.depth_attachment.as_ref().map(|d| d.resource.desc()));
        first.map(|d| (d.width, d.height)).unwrap_or((0, 0))
    }
}

// ============================================================================
// Copies
// ============================================================================

#[derive(Clone)]
pub struct CopyBufferRegionDesc {
    pub src_buffer: Arc<dyn BufferResource>,
    pub src_offset: u64,
    pub dst_buffer: Arc<dyn BufferResource>,
    pub dst_offset: u64,
    pub num_bytes: u64,
}

#[derive(Clone)]
pub struct CopyTextureRegionDesc {
    pub src_texture: Arc<dyn TextureResource>,
    pub dst_texture: Arc<dyn TextureResource>,
    pub src_x: u32,
    pub src_y: u32,
    pub src_z: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub dst_z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub src_mip_level: u32,
    pub dst_mip_level: u32,
    pub src_array_layer: u32,
    pub dst_array_layer: u32,
}

#[derive(Clone)]
pub struct CopyBufferToTextureDesc {
    pub src_buffer: Arc<dyn BufferResource>,
    pub src_offset: u64,
    pub dst_texture: Arc<dyn TextureResource>,
    pub mip_level: u32,
    pub array_layer: u32,
}

#[derive(Clone)]
pub struct CopyTextureToBufferDesc {
    pub src_texture: Arc<dyn TextureResource>,
    pub mip_level: u32,
    pub array_layer: u32,
    pub src_x: u32,
    pub src_y: u32,
    pub src_z: u32,
    /// 0 copies the whole mip
    pub width: u32,
    pub height: u32,
    pub dst_buffer: Arc<dyn BufferResource>,
    pub dst_offset: u64,
}

// ============================================================================
// Ray tracing
// ============================================================================

#[derive(Clone)]
pub struct ShaderBindingTableRegion {
    pub buffer: Arc<dyn BufferResource>,
    pub offset: u64,
    pub size: u64,
    pub stride: u64,
}

#[derive(Clone)]
pub struct DispatchRaysDesc {
    pub ray_generation: ShaderBindingTableRegion,
    pub miss: ShaderBindingTableRegion,
    pub hit_group: ShaderBindingTableRegion,
    pub callable: Option<ShaderBindingTableRegion>,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Clone)]
pub enum AccelerationStructureGeometry {
    Triangles {
        vertex_buffer: Arc<dyn BufferResource>,
        vertex_offset: u64,
        vertex_count: u32,
        vertex_stride: u32,
        vertex_format: Format,
        index_buffer: Option<Arc<dyn BufferResource>>,
        index_offset: u64,
        index_count: u32,
        index_type: IndexType,
        opaque: bool,
    },
    Aabbs {
        buffer: Arc<dyn BufferResource>,
        offset: u64,
        count: u32,
        stride: u32,
        opaque: bool,
    },
}

#[derive(Clone)]
pub struct BuildBottomLevelASDesc {
    pub geometries: Vec<AccelerationStructureGeometry>,
    pub destination: Arc<dyn BufferResource>,
    pub scratch: Arc<dyn BufferResource>,
}

#[derive(Clone)]
pub struct BuildTopLevelASDesc {
    /// Native instance descriptors
    pub instances: Arc<dyn BufferResource>,
    pub num_instances: u32,
    pub destination: Arc<dyn BufferResource>,
    pub scratch: Arc<dyn BufferResource>,
    /// Refit instead of rebuilding
    pub update: bool,
}
