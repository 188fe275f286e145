//! Unit tests for Vulkan conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_color_formats() {
    assert_eq!(format_to_vk(Format::R8G8B8A8Unorm), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format_to_vk(Format::B8G8R8A8UnormSrgb), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format_to_vk(Format::R32G32B32Float), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(format_to_vk(Format::R10G10B10A2Unorm), vk::Format::A2B10G10R10_UNORM_PACK32);
    assert_eq!(format_to_vk(Format::Undefined), vk::Format::UNDEFINED);
}

#[test]
fn test_depth_formats_and_aspects() {
    assert_eq!(format_to_vk(Format::D32Float), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(Format::D24UnormS8Uint), vk::Format::D24_UNORM_S8_UINT);

    assert_eq!(aspect_mask(Format::R8G8B8A8Unorm), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_mask(Format::D32Float), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_mask(Format::D24UnormS8Uint),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

// ============================================================================
// STAGE TESTS
// ============================================================================

#[test]
fn test_shader_stages() {
    assert_eq!(shader_stage_to_vk(ShaderStage::Pixel), vk::ShaderStageFlags::FRAGMENT);
    assert_eq!(shader_stage_to_vk(ShaderStage::Hull), vk::ShaderStageFlags::TESSELLATION_CONTROL);
    assert_eq!(shader_stage_to_vk(ShaderStage::Raygen), vk::ShaderStageFlags::RAYGEN_KHR);

    let stages = ShaderStages::VERTEX | ShaderStages::PIXEL;
    assert_eq!(stages_to_vk(stages), vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);
    assert_eq!(stages_to_vk(ShaderStages::empty()), vk::ShaderStageFlags::empty());
}

// ============================================================================
// DESCRIPTOR TESTS
// ============================================================================

#[test]
fn test_descriptor_types() {
    assert_eq!(
        descriptor_type(ResourceBindingType::ConstantBuffer, ResourceDescriptor::UNIFORM_BUFFER),
        vk::DescriptorType::UNIFORM_BUFFER
    );
    assert_eq!(
        descriptor_type(ResourceBindingType::ShaderResource, ResourceDescriptor::TEXTURE),
        vk::DescriptorType::SAMPLED_IMAGE
    );
    assert_eq!(
        descriptor_type(ResourceBindingType::ShaderResource, ResourceDescriptor::STRUCTURED_BUFFER),
        vk::DescriptorType::STORAGE_BUFFER
    );
    assert_eq!(
        descriptor_type(ResourceBindingType::UnorderedAccess, ResourceDescriptor::RW_TEXTURE),
        vk::DescriptorType::STORAGE_IMAGE
    );
    assert_eq!(
        descriptor_type(ResourceBindingType::UnorderedAccess, ResourceDescriptor::RW_BUFFER),
        vk::DescriptorType::STORAGE_BUFFER
    );
    assert_eq!(
        descriptor_type(ResourceBindingType::Sampler, ResourceDescriptor::SAMPLER),
        vk::DescriptorType::SAMPLER
    );
}

#[test]
fn test_acceleration_structure_wins() {
    assert_eq!(
        descriptor_type(ResourceBindingType::ShaderResource, ResourceDescriptor::ACCELERATION_STRUCTURE),
        vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
    );
}

// ============================================================================
// USAGE TESTS
// ============================================================================

#[test]
fn test_buffer_usage() {
    let flags = buffer_usage_flags(
        ResourceDescriptor::VERTEX_BUFFER | ResourceDescriptor::INDEX_BUFFER,
        ResourceUsage::COPY_DST,
    );
    assert!(flags.contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::INDEX_BUFFER));
    assert!(flags.contains(vk::BufferUsageFlags::TRANSFER_DST));
    assert!(!flags.contains(vk::BufferUsageFlags::STORAGE_BUFFER));

    let flags = buffer_usage_flags(ResourceDescriptor::RW_BUFFER, ResourceUsage::UNORDERED_ACCESS);
    assert!(flags.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
}

#[test]
fn test_image_usage() {
    let flags = image_usage_flags(ResourceDescriptor::TEXTURE | ResourceDescriptor::RENDER_TARGET, ResourceUsage::UNDEFINED);
    assert!(flags.contains(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT));
    assert!(!flags.contains(vk::ImageUsageFlags::STORAGE));

    let flags = image_usage_flags(ResourceDescriptor::DEPTH_STENCIL, ResourceUsage::DEPTH_WRITE);
    assert!(flags.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
}

// ============================================================================
// FIXED FUNCTION TESTS
// ============================================================================

#[test]
fn test_sampler_and_pipeline_enums() {
    assert_eq!(address_mode_to_vk(SamplerAddressMode::Mirror), vk::SamplerAddressMode::MIRRORED_REPEAT);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(filter_to_vk(Filter::Nearest), vk::Filter::NEAREST);
    assert_eq!(mipmap_mode_to_vk(MipmapMode::Linear), vk::SamplerMipmapMode::LINEAR);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleStrip), vk::PrimitiveTopology::TRIANGLE_STRIP);
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(bind_point_to_vk(BindPoint::RayTracing), vk::PipelineBindPoint::RAY_TRACING_KHR);
    assert_eq!(index_type_to_vk(IndexType::Uint16), vk::IndexType::UINT16);
    assert_eq!(load_op_to_vk(LoadOp::DontCare), vk::AttachmentLoadOp::DONT_CARE);
    assert_eq!(store_op_to_vk(StoreOp::Store), vk::AttachmentStoreOp::STORE);
}
