/// Explicit-API barrier vocabulary (D3D12 style)
///
/// Values match the D3D12 enums so a DX12 backend can pass them through.

use bitflags::bitflags;
use crate::types::{QueueType, ResourceUsage};

bitflags! {
    /// Legacy whole-state transition states
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceStates: u32 {
        const COMMON = 0;
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        const STREAM_OUT = 0x100;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const RAYTRACING_ACCELERATION_STRUCTURE = 0x40_0000;
        const GENERIC_READ = 0x1 | 0x2 | 0x40 | 0x80 | 0x200 | 0x800;
        const PRESENT = 0;
    }
}

bitflags! {
    /// Enhanced-barrier synchronization scopes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierSync: u32 {
        const NONE = 0;
        const ALL = 0x1;
        const DRAW = 0x2;
        const INDEX_INPUT = 0x4;
        const VERTEX_SHADING = 0x8;
        const PIXEL_SHADING = 0x10;
        const DEPTH_STENCIL = 0x20;
        const RENDER_TARGET = 0x40;
        const COMPUTE_SHADING = 0x80;
        const RAYTRACING = 0x100;
        const COPY = 0x200;
        const BUILD_RAYTRACING_ACCELERATION_STRUCTURE = 0x800;
    }
}

bitflags! {
    /// Enhanced-barrier access bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierAccess: u32 {
        const COMMON = 0;
        const VERTEX_BUFFER = 0x1;
        const CONSTANT_BUFFER = 0x2;
        const INDEX_BUFFER = 0x4;
        const RENDER_TARGET = 0x8;
        const UNORDERED_ACCESS = 0x10;
        const DEPTH_STENCIL_WRITE = 0x20;
        const DEPTH_STENCIL_READ = 0x40;
        const SHADER_RESOURCE = 0x80;
        const STREAM_OUTPUT = 0x100;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const RAYTRACING_ACCELERATION_STRUCTURE_READ = 0x4000;
        const RAYTRACING_ACCELERATION_STRUCTURE_WRITE = 0x8000;
        const NO_ACCESS = 0x8000_0000;
    }
}

/// Enhanced-barrier texture layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierLayout {
    Undefined,
    Common,
    Present,
    GenericRead,
    RenderTarget,
    UnorderedAccess,
    DepthStencilWrite,
    DepthStencilRead,
    ShaderResource,
    CopySource,
    CopyDest,
    DirectQueueCommon,
    DirectQueueGenericRead,
    DirectQueueUnorderedAccess,
    DirectQueueShaderResource,
    DirectQueueCopySource,
    DirectQueueCopyDest,
    ComputeQueueCommon,
    ComputeQueueGenericRead,
    ComputeQueueUnorderedAccess,
    ComputeQueueShaderResource,
    ComputeQueueCopySource,
    ComputeQueueCopyDest,
}

/// Legacy state for a (normalized) usage
pub fn resource_states(usage: ResourceUsage) -> ResourceStates {
    let usage = usage.normalized();
    if usage.contains(ResourceUsage::GENERIC_READ) {
        return ResourceStates::GENERIC_READ;
    }
    if usage.contains(ResourceUsage::COMMON) || usage.contains(ResourceUsage::UNDEFINED) {
        return ResourceStates::COMMON;
    }
    if usage.contains(ResourceUsage::PRESENT) {
        return ResourceStates::PRESENT;
    }

    const MAP: [(ResourceUsage, ResourceStates); 12] = [
        (ResourceUsage::VERTEX_AND_CONSTANT_BUFFER, ResourceStates::VERTEX_AND_CONSTANT_BUFFER),
        (ResourceUsage::INDEX_BUFFER, ResourceStates::INDEX_BUFFER),
        (ResourceUsage::RENDER_TARGET, ResourceStates::RENDER_TARGET),
        (ResourceUsage::UNORDERED_ACCESS, ResourceStates::UNORDERED_ACCESS),
        (ResourceUsage::DEPTH_WRITE, ResourceStates::DEPTH_WRITE),
        (ResourceUsage::DEPTH_READ, ResourceStates::DEPTH_READ),
        (ResourceUsage::STREAM_OUT, ResourceStates::STREAM_OUT),
        (ResourceUsage::INDIRECT_ARGUMENT, ResourceStates::INDIRECT_ARGUMENT),
        (ResourceUsage::COPY_DST, ResourceStates::COPY_DEST),
        (ResourceUsage::COPY_SRC, ResourceStates::COPY_SOURCE),
        (ResourceUsage::SHADER_RESOURCE, ResourceStates::NON_PIXEL_SHADER_RESOURCE),
        (ResourceUsage::PIXEL_SHADER_RESOURCE, ResourceStates::PIXEL_SHADER_RESOURCE),
    ];
    let mut states = ResourceStates::COMMON;
    for (bit, state) in MAP {
        if usage.contains(bit) {
            states |= state;
        }
    }
    if usage.intersects(ResourceUsage::ACCELERATION_STRUCTURE_READ | ResourceUsage::ACCELERATION_STRUCTURE_WRITE) {
        states |= ResourceStates::RAYTRACING_ACCELERATION_STRUCTURE;
    }
    states
}

/// Enhanced-barrier access for a usage
pub fn barrier_access(usage: ResourceUsage) -> BarrierAccess {
    let usage = usage.normalized();
    if usage == ResourceUsage::UNDEFINED {
        return BarrierAccess::NO_ACCESS;
    }
    if usage.is_reset_state() {
        return BarrierAccess::COMMON;
    }

    let mut access = BarrierAccess::COMMON;
    if usage.contains(ResourceUsage::VERTEX_AND_CONSTANT_BUFFER) {
        access |= BarrierAccess::VERTEX_BUFFER | BarrierAccess::CONSTANT_BUFFER;
    }
    if usage.contains(ResourceUsage::INDEX_BUFFER) {
        access |= BarrierAccess::INDEX_BUFFER;
    }
    if usage.contains(ResourceUsage::RENDER_TARGET) {
        access |= BarrierAccess::RENDER_TARGET;
    }
    if usage.contains(ResourceUsage::UNORDERED_ACCESS) {
        access |= BarrierAccess::UNORDERED_ACCESS;
    }
    if usage.contains(ResourceUsage::DEPTH_WRITE) {
        access |= BarrierAccess::DEPTH_STENCIL_WRITE;
    } else if usage.contains(ResourceUsage::DEPTH_READ) {
        access |= BarrierAccess::DEPTH_STENCIL_READ;
    }
    if usage.contains(ResourceUsage::STREAM_OUT) {
        access |= BarrierAccess::STREAM_OUTPUT;
    }
    if usage.contains(ResourceUsage::INDIRECT_ARGUMENT) {
        access |= BarrierAccess::INDIRECT_ARGUMENT;
    }
    if usage.contains(ResourceUsage::COPY_DST) {
        access |= BarrierAccess::COPY_DEST;
    }
    if usage.contains(ResourceUsage::COPY_SRC) {
        access |= BarrierAccess::COPY_SOURCE;
    }
    if usage.intersects(ResourceUsage::SHADER_RESOURCE | ResourceUsage::PIXEL_SHADER_RESOURCE) {
        access |= BarrierAccess::SHADER_RESOURCE;
    }
    if usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_READ) {
        access |= BarrierAccess::RAYTRACING_ACCELERATION_STRUCTURE_READ;
    }
    if usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_WRITE) {
        access |= BarrierAccess::RAYTRACING_ACCELERATION_STRUCTURE_WRITE;
    }
    access
}

/// Enhanced-barrier sync scope for a usage
pub fn barrier_sync(usage: ResourceUsage) -> BarrierSync {
    let usage = usage.normalized();
    if usage == ResourceUsage::UNDEFINED {
        return BarrierSync::NONE;
    }

    let mut sync = BarrierSync::NONE;
    if usage.contains(ResourceUsage::RENDER_TARGET) {
        sync |= BarrierSync::RENDER_TARGET;
    }
    if usage.contains(ResourceUsage::UNORDERED_ACCESS) {
        sync |= BarrierSync::ALL;
    }
    if usage.intersects(ResourceUsage::DEPTH_WRITE | ResourceUsage::DEPTH_READ) {
        sync |= BarrierSync::DEPTH_STENCIL;
    }
    if usage.intersects(ResourceUsage::COPY_DST | ResourceUsage::COPY_SRC) {
        sync |= BarrierSync::COPY;
    }
    if usage.intersects(ResourceUsage::ACCELERATION_STRUCTURE_READ | ResourceUsage::ACCELERATION_STRUCTURE_WRITE) {
        sync |= BarrierSync::BUILD_RAYTRACING_ACCELERATION_STRUCTURE;
    }
    if sync.is_empty() { BarrierSync::ALL } else { sync }
}

/// Enhanced-barrier layout of a texture in `usage` on `queue`
pub fn barrier_layout(usage: ResourceUsage, queue: QueueType) -> BarrierLayout {
    let usage = usage.normalized();
    let per_queue = |direct, compute, other| match queue {
        QueueType::Graphics => direct,
        QueueType::Compute | QueueType::RayTracing => compute,
        QueueType::Copy => other,
    };

    if usage == ResourceUsage::UNDEFINED {
        return BarrierLayout::Undefined;
    }
    if usage.intersects(ResourceUsage::COMMON | ResourceUsage::PRESENT) {
        return per_queue(BarrierLayout::DirectQueueCommon, BarrierLayout::ComputeQueueCommon, BarrierLayout::Common);
    }
    if usage.contains(ResourceUsage::GENERIC_READ) {
        return per_queue(BarrierLayout::DirectQueueGenericRead, BarrierLayout::ComputeQueueGenericRead, BarrierLayout::GenericRead);
    }
    if usage.contains(ResourceUsage::COPY_SRC) {
        return per_queue(BarrierLayout::DirectQueueCopySource, BarrierLayout::ComputeQueueCopySource, BarrierLayout::CopySource);
    }
    if usage.contains(ResourceUsage::COPY_DST) {
        return per_queue(BarrierLayout::DirectQueueCopyDest, BarrierLayout::ComputeQueueCopyDest, BarrierLayout::CopyDest);
    }
    if usage.contains(ResourceUsage::UNORDERED_ACCESS) {
        return per_queue(BarrierLayout::DirectQueueUnorderedAccess, BarrierLayout::ComputeQueueUnorderedAccess, BarrierLayout::UnorderedAccess);
    }
    if usage.intersects(ResourceUsage::SHADER_RESOURCE | ResourceUsage::PIXEL_SHADER_RESOURCE) {
        return per_queue(BarrierLayout::DirectQueueShaderResource, BarrierLayout::ComputeQueueShaderResource, BarrierLayout::ShaderResource);
    }
    if usage.contains(ResourceUsage::RENDER_TARGET) {
        return BarrierLayout::RenderTarget;
    }
    if usage.contains(ResourceUsage::DEPTH_WRITE) {
        return BarrierLayout::DepthStencilWrite;
    }
    if usage.contains(ResourceUsage::DEPTH_READ) {
        return BarrierLayout::DepthStencilRead;
    }
    per_queue(BarrierLayout::DirectQueueCommon, BarrierLayout::ComputeQueueCommon, BarrierLayout::Common)
}

/// Legacy subresource index of (mip, layer, depth slice)
pub fn subresource_index(mip_level: u32, array_layer: u32, depth_slice: u32, mip_levels: u32, array_size: u32) -> u32 {
    mip_level + array_layer * mip_levels + depth_slice * mip_levels * array_size
}

/// Legacy "every subresource" index
pub const ALL_SUBRESOURCES: u32 = 0xffff_ffff;

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;
