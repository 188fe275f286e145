//! Integration tests for VulkanLogicalDevice
//!
//! These tests create a real Vulkan device and submit work to it.
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use dz_rhi::dz::barrier::{BufferBarrierDesc, PipelineBarrierDesc, TextureBarrierDesc};
use dz_rhi::dz::binding::{ResourceBindGroupDesc, RootConstantResourceBinding, RootSignatureDesc};
use dz_rhi::dz::command::{CommandListDesc, CommandListPoolDesc, CopyBufferRegionDesc, ExecuteDesc};
use dz_rhi::dz::device::{BufferDesc, HeapType, SamplerDesc, TextureDesc};
use dz_rhi::dz::shader::ReflectionBinding;
use dz_rhi::dz::{
    BufferResource, Engine, Error, Format, LogicalDevice, QueueType, ResourceBindingType, ResourceDescriptor,
    ResourceUsage, ShaderStages, TargetIL, TextureResource,
};
use dz_rhi_vulkan::dz::{VulkanBuffer, VulkanDeviceConfig, VulkanLogicalDevice, VulkanTexture};
use serial_test::serial;
use std::sync::Arc;

fn create_device() -> VulkanLogicalDevice {
    let config = VulkanDeviceConfig {
        application_name: "Vulkan Device Test".to_string(),
        enable_validation: false,
        ..Default::default()
    };
    VulkanLogicalDevice::new(config).unwrap()
}

fn upload_buffer(device: &VulkanLogicalDevice, num_bytes: u64, name: &str) -> Arc<dyn BufferResource> {
    device.create_buffer_resource(&BufferDesc {
        num_bytes,
        descriptor: ResourceDescriptor::BUFFER,
        heap_type: HeapType::CpuGpu,
        debug_name: name.to_string(),
        ..Default::default()
    }).unwrap()
}

fn reflection_binding(
    name: &str,
    binding_type: ResourceBindingType,
    descriptor: ResourceDescriptor,
    binding: u32,
    register_space: u32,
) -> ReflectionBinding {
    ReflectionBinding {
        name: name.to_string(),
        binding,
        register_space,
        array_size: 1,
        binding_type,
        descriptor,
        stages: ShaderStages::COMPUTE,
        fields: Vec::new(),
        num_bytes: if binding_type == ResourceBindingType::ConstantBuffer { 256 } else { 0 },
    }
}

// ============================================================================
// DEVICE
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_device_capabilities() {
    let device = create_device();
    let caps = device.capabilities();

    assert_eq!(caps.native_target_il, TargetIL::Spirv);
    assert!(caps.subresource_barriers);
    assert!(!device.device_name().is_empty());
    assert!(!device.is_device_lost());
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_device_registered_with_engine() {
    Engine::reset_for_testing();
    let device = Engine::create_device("main", create_device()).unwrap();
    assert_eq!(Engine::device_count(), 1);
    assert_eq!(device.capabilities().native_target_il, TargetIL::Spirv);

    Engine::destroy_device("main").unwrap();
    assert_eq!(Engine::device_count(), 0);
    Engine::reset_for_testing();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_ray_tracing_queue_needs_capability() {
    let device = create_device();
    let result = device.create_command_list(&CommandListDesc { queue_type: QueueType::RayTracing });

    if device.capabilities().ray_tracing {
        assert!(result.is_ok());
    } else {
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}

// ============================================================================
// RESOURCES
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_and_write_buffer() {
    let device = create_device();
    let buffer = upload_buffer(&device, 1024, "upload");

    assert_eq!(buffer.desc().num_bytes, 1024);
    assert_ne!(buffer.native_handle(), 0);
    buffer.write(0, &[1, 2, 3, 4]).unwrap();
    buffer.write(1020, &[5, 6, 7, 8]).unwrap();
    assert!(buffer.write(1022, &[0; 4]).is_err());

    let native = buffer.as_any().downcast_ref::<VulkanBuffer>().unwrap();
    assert_eq!(native.acceleration_structure_address(), None);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_gpu_buffer_is_not_writable() {
    let device = create_device();
    let buffer = device.create_buffer_resource(&BufferDesc {
        num_bytes: 256,
        descriptor: ResourceDescriptor::RW_BUFFER,
        debug_name: "device local".to_string(),
        ..Default::default()
    }).unwrap();

    assert!(buffer.write(0, &[0; 16]).is_err());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_texture() {
    let device = create_device();
    let texture = device.create_texture_resource(&TextureDesc {
        width: 256,
        height: 128,
        mip_levels: 4,
        format: Format::R8G8B8A8Unorm,
        descriptor: ResourceDescriptor::TEXTURE | ResourceDescriptor::RENDER_TARGET,
        debug_name: "color".to_string(),
        ..Default::default()
    }).unwrap();

    assert_eq!(texture.desc().width, 256);
    assert_eq!(texture.desc().height, 128);
    assert_eq!(texture.desc().mip_levels, 4);
    let native = texture.as_any().downcast_ref::<VulkanTexture>().unwrap();
    assert_ne!(native.view(), ash::vk::ImageView::null());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_depth_texture() {
    let device = create_device();
    let texture = device.create_texture_resource(&TextureDesc {
        width: 64,
        height: 64,
        format: Format::D32Float,
        descriptor: ResourceDescriptor::DEPTH_STENCIL,
        ..Default::default()
    }).unwrap();

    assert!(texture.desc().format.is_depth());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_sampler() {
    let device = create_device();
    let sampler = device.create_sampler(&SamplerDesc { debug_name: "linear", ..Default::default() }).unwrap();
    assert_ne!(sampler.native_handle(), 0);
}

// ============================================================================
// ROOT SIGNATURES AND BIND GROUPS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_bind_group_update() {
    let device = create_device();
    let root_signature = device.create_root_signature(&RootSignatureDesc {
        resource_bindings: vec![
            reflection_binding("Params", ResourceBindingType::ConstantBuffer, ResourceDescriptor::UNIFORM_BUFFER, 0, 0),
            reflection_binding("Output", ResourceBindingType::UnorderedAccess, ResourceDescriptor::RW_BUFFER, 0, 0),
        ],
        root_constants: vec![RootConstantResourceBinding {
            name: "PushData".to_string(),
            binding: 0,
            num_bytes: 16,
            stages: ShaderStages::COMPUTE,
        }],
        ..Default::default()
    }).unwrap();

    let params = device.create_buffer_resource(&BufferDesc {
        num_bytes: 256,
        descriptor: ResourceDescriptor::UNIFORM_BUFFER,
        heap_type: HeapType::CpuGpu,
        ..Default::default()
    }).unwrap();
    let output = device.create_buffer_resource(&BufferDesc {
        num_bytes: 1024,
        descriptor: ResourceDescriptor::RW_BUFFER,
        ..Default::default()
    }).unwrap();

    let group = device.create_resource_bind_group(&ResourceBindGroupDesc::new(Arc::clone(&root_signature), 0)).unwrap();
    group.begin_update().unwrap();
    group.cbv(0, &params).unwrap();
    group.uav_buffer(0, &output).unwrap();
    group.end_update().unwrap();
    assert!(!group.is_updating());

    let constants = device.create_resource_bind_group(&ResourceBindGroupDesc::root_constants(Arc::clone(&root_signature))).unwrap();
    constants.set_root_constants(0, &[0u8; 16]).unwrap();
    assert!(constants.set_root_constants(0, &[0u8; 32]).is_err());

    let mut command_list = device.create_command_list(&CommandListDesc { queue_type: QueueType::Compute }).unwrap();
    command_list.begin().unwrap();
    command_list.set_root_signature(&root_signature).unwrap();
    command_list.bind_resource_group(&group).unwrap();
    command_list.bind_resource_group(&constants).unwrap();
    command_list.end().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_many_bind_groups_grow_pools() {
    let device = create_device();
    let root_signature = device.create_root_signature(&RootSignatureDesc {
        resource_bindings: vec![
            reflection_binding("Params", ResourceBindingType::ConstantBuffer, ResourceDescriptor::UNIFORM_BUFFER, 0, 0),
        ],
        ..Default::default()
    }).unwrap();

    let groups: Vec<_> = (0..1500)
        .map(|_| device.create_resource_bind_group(&ResourceBindGroupDesc::new(Arc::clone(&root_signature), 0)).unwrap())
        .collect();
    assert_eq!(groups.len(), 1500);
    assert!(device.descriptor_pool_count() >= 2);
}

// ============================================================================
// SUBMISSION
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_copy_and_fence() {
    let device = create_device();
    let src = upload_buffer(&device, 256, "src");
    let dst = upload_buffer(&device, 256, "dst");
    src.write(0, &[42u8; 256]).unwrap();

    let fence = device.create_fence().unwrap();
    let mut command_list = device.create_command_list(&CommandListDesc { queue_type: QueueType::Copy }).unwrap();
    command_list.begin().unwrap();
    command_list.pipeline_barrier(&PipelineBarrierDesc::new()
        .buffer_barrier(BufferBarrierDesc::new(&src, ResourceUsage::COMMON, ResourceUsage::COPY_SRC))
        .buffer_barrier(BufferBarrierDesc::new(&dst, ResourceUsage::COMMON, ResourceUsage::COPY_DST))).unwrap();
    command_list.copy_buffer_region(&CopyBufferRegionDesc {
        src_buffer: Arc::clone(&src),
        src_offset: 0,
        dst_buffer: Arc::clone(&dst),
        dst_offset: 0,
        num_bytes: 256,
    }).unwrap();
    command_list.end().unwrap();
    command_list.execute(&ExecuteDesc { notify: Some(Arc::clone(&fence)), ..Default::default() }).unwrap();

    fence.wait().unwrap();
    fence.reset().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_semaphore_chain_across_queues() {
    let device = create_device();
    let texture: Arc<dyn TextureResource> = device.create_texture_resource(&TextureDesc {
        width: 32,
        height: 32,
        descriptor: ResourceDescriptor::TEXTURE | ResourceDescriptor::RW_TEXTURE,
        ..Default::default()
    }).unwrap();
    let semaphore = device.create_semaphore().unwrap();
    let fence = device.create_fence().unwrap();

    let mut compute = device.create_command_list(&CommandListDesc { queue_type: QueueType::Compute }).unwrap();
    compute.begin().unwrap();
    compute.pipeline_barrier(&PipelineBarrierDesc::new().texture_barrier(
        TextureBarrierDesc::new(&texture, ResourceUsage::UNDEFINED, ResourceUsage::UNORDERED_ACCESS))).unwrap();
    compute.end().unwrap();
    compute.execute(&ExecuteDesc {
        notify_semaphores: vec![Arc::clone(&semaphore)],
        ..Default::default()
    }).unwrap();

    let mut graphics = device.create_command_list(&CommandListDesc { queue_type: QueueType::Graphics }).unwrap();
    graphics.begin().unwrap();
    graphics.pipeline_barrier(&PipelineBarrierDesc::new().texture_barrier(
        TextureBarrierDesc::new(&texture, ResourceUsage::UNORDERED_ACCESS, ResourceUsage::SHADER_RESOURCE))).unwrap();
    graphics.end().unwrap();
    graphics.execute(&ExecuteDesc {
        wait_on_semaphores: vec![semaphore],
        notify: Some(Arc::clone(&fence)),
        ..Default::default()
    }).unwrap();

    fence.wait().unwrap();
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_command_list_reuse_after_fence() {
    let device = create_device();
    let fence = device.create_fence().unwrap();
    let mut command_list = device.create_command_list(&CommandListDesc { queue_type: QueueType::Graphics }).unwrap();

    for _ in 0..3 {
        command_list.begin().unwrap();
        command_list.end().unwrap();
        command_list.execute(&ExecuteDesc { notify: Some(Arc::clone(&fence)), ..Default::default() }).unwrap();
        fence.wait().unwrap();
        fence.reset().unwrap();
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_command_list_pool_records_on_threads() {
    let device = create_device();
    let src = upload_buffer(&device, 1024, "pool_src");
    let dst = upload_buffer(&device, 1024, "pool_dst");
    src.write(0, &[7u8; 1024]).unwrap();
    let mut pool = device.create_command_list_pool(&CommandListPoolDesc::new(QueueType::Copy, 4)).unwrap();
    assert_eq!(pool.len(), 4);

    std::thread::scope(|scope| {
        for (index, list) in pool.command_lists().iter_mut().enumerate() {
            let (src, dst) = (&src, &dst);
            scope.spawn(move || {
                let offset = index as u64 * 256;
                list.begin().unwrap();
                list.copy_buffer_region(&CopyBufferRegionDesc {
                    src_buffer: Arc::clone(src),
                    src_offset: offset,
                    dst_buffer: Arc::clone(dst),
                    dst_offset: offset,
                    num_bytes: 256,
                }).unwrap();
                list.end().unwrap();
            });
        }
    });

    let fence = device.create_fence().unwrap();
    for list in pool.command_lists() {
        list.execute(&ExecuteDesc { notify: Some(Arc::clone(&fence)), ..Default::default() }).unwrap();
        fence.wait().unwrap();
        fence.reset().unwrap();
    }
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_ray_tracing_pool_needs_capability() {
    let device = create_device();
    let result = device.create_command_list_pool(&CommandListPoolDesc::new(QueueType::RayTracing, 2));

    if device.capabilities().ray_tracing {
        assert_eq!(result.unwrap().len(), 2);
    } else {
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
