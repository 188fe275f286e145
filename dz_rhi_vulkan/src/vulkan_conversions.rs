/// Conversions from RHI vocabulary to Vulkan enums and flags

use ash::vk;
use dz_rhi::dz::{Format, ResourceBindingType, ResourceDescriptor, ResourceUsage, ShaderStage, ShaderStages};
use dz_rhi::dz::command::{IndexType, LoadOp, StoreOp};
use dz_rhi::dz::device::{
    BindPoint, CompareOp, CullMode, Filter, MipmapMode, PrimitiveTopology, SamplerAddressMode,
};

pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::R32G32B32A32Uint => vk::Format::R32G32B32A32_UINT,
        Format::R32G32B32A32Sint => vk::Format::R32G32B32A32_SINT,
        Format::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32Uint => vk::Format::R32G32B32_UINT,
        Format::R32G32B32Sint => vk::Format::R32G32B32_SINT,
        Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::R16G16B16A16Unorm => vk::Format::R16G16B16A16_UNORM,
        Format::R16G16B16A16Uint => vk::Format::R16G16B16A16_UINT,
        Format::R32G32Float => vk::Format::R32G32_SFLOAT,
        Format::R32G32Uint => vk::Format::R32G32_UINT,
        Format::R32G32Sint => vk::Format::R32G32_SINT,
        Format::R10G10B10A2Unorm => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8UnormSrgb => vk::Format::R8G8B8A8_SRGB,
        Format::R8G8B8A8Uint => vk::Format::R8G8B8A8_UINT,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8UnormSrgb => vk::Format::B8G8R8A8_SRGB,
        Format::R16G16Float => vk::Format::R16G16_SFLOAT,
        Format::R16G16Unorm => vk::Format::R16G16_UNORM,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sint => vk::Format::R32_SINT,
        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::R16Unorm => vk::Format::R16_UNORM,
        Format::R8G8Unorm => vk::Format::R8G8_UNORM,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8Uint => vk::Format::R8_UINT,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D16Unorm => vk::Format::D16_UNORM,
    }
}

/// Image aspect a view or copy of `format` touches
pub fn aspect_mask(format: Format) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    stages_to_vk(stage.stages())
}

pub fn stages_to_vk(stages: ShaderStages) -> vk::ShaderStageFlags {
    const MAP: [(ShaderStages, vk::ShaderStageFlags); 14] = [
        (ShaderStages::VERTEX, vk::ShaderStageFlags::VERTEX),
        (ShaderStages::HULL, vk::ShaderStageFlags::TESSELLATION_CONTROL),
        (ShaderStages::DOMAIN, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
        (ShaderStages::GEOMETRY, vk::ShaderStageFlags::GEOMETRY),
        (ShaderStages::PIXEL, vk::ShaderStageFlags::FRAGMENT),
        (ShaderStages::COMPUTE, vk::ShaderStageFlags::COMPUTE),
        (ShaderStages::RAYGEN, vk::ShaderStageFlags::RAYGEN_KHR),
        (ShaderStages::ANY_HIT, vk::ShaderStageFlags::ANY_HIT_KHR),
        (ShaderStages::CLOSEST_HIT, vk::ShaderStageFlags::CLOSEST_HIT_KHR),
        (ShaderStages::MISS, vk::ShaderStageFlags::MISS_KHR),
        (ShaderStages::INTERSECTION, vk::ShaderStageFlags::INTERSECTION_KHR),
        (ShaderStages::CALLABLE, vk::ShaderStageFlags::CALLABLE_KHR),
        (ShaderStages::MESH, vk::ShaderStageFlags::MESH_EXT),
        (ShaderStages::TASK, vk::ShaderStageFlags::TASK_EXT),
    ];
    let mut flags = vk::ShaderStageFlags::empty();
    for (stage, flag) in MAP {
        if stages.contains(stage) {
            flags |= flag;
        }
    }
    flags
}

/// Descriptor type of a reflected binding
///
/// Order matters: acceleration structures are SRVs, and a read-only
/// structured buffer and an RW buffer are both storage buffers in SPIR-V.
pub fn descriptor_type(binding_type: ResourceBindingType, descriptor: ResourceDescriptor) -> vk::DescriptorType {
    if descriptor.contains(ResourceDescriptor::ACCELERATION_STRUCTURE) {
        return vk::DescriptorType::ACCELERATION_STRUCTURE_KHR;
    }
    match binding_type {
        ResourceBindingType::ConstantBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceBindingType::Sampler => vk::DescriptorType::SAMPLER,
        ResourceBindingType::ShaderResource => {
            if descriptor.intersects(ResourceDescriptor::TEXTURE | ResourceDescriptor::TEXTURE_CUBE) {
                vk::DescriptorType::SAMPLED_IMAGE
            } else {
                vk::DescriptorType::STORAGE_BUFFER
            }
        }
        ResourceBindingType::UnorderedAccess => {
            if descriptor.contains(ResourceDescriptor::RW_TEXTURE) {
                vk::DescriptorType::STORAGE_IMAGE
            } else {
                vk::DescriptorType::STORAGE_BUFFER
            }
        }
    }
}

pub fn buffer_usage_flags(descriptor: ResourceDescriptor, initial_usage: ResourceUsage) -> vk::BufferUsageFlags {
    // Every buffer can be a copy source or destination
    let mut flags = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
    if descriptor.contains(ResourceDescriptor::INDEX_BUFFER) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if descriptor.contains(ResourceDescriptor::VERTEX_BUFFER) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if descriptor.contains(ResourceDescriptor::UNIFORM_BUFFER) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if descriptor.intersects(ResourceDescriptor::BUFFER | ResourceDescriptor::RW_BUFFER | ResourceDescriptor::STRUCTURED_BUFFER) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if descriptor.contains(ResourceDescriptor::INDIRECT_BUFFER) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if descriptor.contains(ResourceDescriptor::ACCELERATION_STRUCTURE) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if initial_usage.contains(ResourceUsage::SHADER_BINDING_TABLE) {
        flags |= vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if initial_usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_GEOMETRY) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    if initial_usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_WRITE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }
    flags
}

pub fn image_usage_flags(descriptor: ResourceDescriptor, initial_usage: ResourceUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if descriptor.intersects(ResourceDescriptor::TEXTURE | ResourceDescriptor::TEXTURE_CUBE)
        || initial_usage.intersects(ResourceUsage::SHADER_RESOURCE | ResourceUsage::PIXEL_SHADER_RESOURCE)
    {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if descriptor.contains(ResourceDescriptor::RW_TEXTURE) || initial_usage.contains(ResourceUsage::UNORDERED_ACCESS) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if descriptor.contains(ResourceDescriptor::RENDER_TARGET) || initial_usage.contains(ResourceUsage::RENDER_TARGET) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if descriptor.contains(ResourceDescriptor::DEPTH_STENCIL)
        || initial_usage.intersects(ResourceUsage::DEPTH_READ | ResourceUsage::DEPTH_WRITE)
    {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    flags
}

pub fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode_to_vk(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: SamplerAddressMode) -> vk::SamplerAddressMode {
    match mode {
        SamplerAddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        SamplerAddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
        SamplerAddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerAddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn bind_point_to_vk(bind_point: BindPoint) -> vk::PipelineBindPoint {
    match bind_point {
        BindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
        BindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
        BindPoint::RayTracing => vk::PipelineBindPoint::RAY_TRACING_KHR,
    }
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::Uint16 => vk::IndexType::UINT16,
        IndexType::Uint32 => vk::IndexType::UINT32,
    }
}

pub fn load_op_to_vk(op: LoadOp) -> vk::AttachmentLoadOp {
    match op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn store_op_to_vk(op: StoreOp) -> vk::AttachmentStoreOp {
    match op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

#[cfg(test)]
#[path = "vulkan_conversions_tests.rs"]
mod tests;
