/// Buffer, texture and sampler collaborators
///
/// Resources are opaque handles created by a [`LogicalDevice`](crate::device::LogicalDevice).
/// Each backend provides its own types behind these traits; code that needs
/// the concrete type downcasts through `as_any`.

use std::any::Any;
use crate::error::Result;
use crate::types::{Format, ResourceDescriptor, ResourceUsage};

/// Opaque native resource token
pub trait NativeHandle: Send + Sync {
    /// Raw native object (`VkBuffer`, `VkImage`, ...)
    fn native_handle(&self) -> u64;

    /// Descriptor/view handle when the backend keeps one per resource
    fn descriptor_handle(&self) -> Option<u64> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Buffers
// ============================================================================

/// Memory a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapType {
    /// Device local, not CPU visible
    #[default]
    Gpu,
    /// CPU writable upload memory
    CpuGpu,
    /// CPU readable readback memory
    GpuCpu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub num_bytes: u64,
    pub descriptor: ResourceDescriptor,
    pub initial_usage: ResourceUsage,
    pub heap_type: HeapType,
    /// Typed buffer views
    pub format: Format,
    /// Element stride of structured buffers
    pub stride: u32,
    pub debug_name: String,
}

impl Default for BufferDesc {
    fn default() -> Self {
        Self {
            num_bytes: 0,
            descriptor: ResourceDescriptor::BUFFER,
            initial_usage: ResourceUsage::COMMON,
            heap_type: HeapType::Gpu,
            format: Format::Undefined,
            stride: 0,
            debug_name: String::new(),
        }
    }
}

pub trait BufferResource: NativeHandle {
    fn desc(&self) -> &BufferDesc;

    /// Write into CPU-visible memory
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;
}

// ============================================================================
// Textures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub array_size: u32,
    pub mip_levels: u32,
    pub format: Format,
    pub descriptor: ResourceDescriptor,
    pub initial_usage: ResourceUsage,
    pub debug_name: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            array_size: 1,
            mip_levels: 1,
            format: Format::R8G8B8A8Unorm,
            descriptor: ResourceDescriptor::TEXTURE,
            initial_usage: ResourceUsage::UNDEFINED,
            debug_name: String::new(),
        }
    }
}

pub trait TextureResource: NativeHandle {
    fn desc(&self) -> &TextureDesc;
}

// ============================================================================
// Samplers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipmapMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplerAddressMode {
    #[default]
    Repeat,
    Mirror,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareOp {
    #[default]
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_mode_u: SamplerAddressMode,
    pub address_mode_v: SamplerAddressMode,
    pub address_mode_w: SamplerAddressMode,
    /// 0 disables anisotropic filtering
    pub max_anisotropy: f32,
    pub compare_op: CompareOp,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub debug_name: &'static str,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_mode_u: SamplerAddressMode::Repeat,
            address_mode_v: SamplerAddressMode::Repeat,
            address_mode_w: SamplerAddressMode::Repeat,
            max_anisotropy: 0.0,
            compare_op: CompareOp::Never,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            debug_name: "",
        }
    }
}

pub trait Sampler: NativeHandle {
    fn desc(&self) -> &SamplerDesc;
}
