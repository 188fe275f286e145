use super::*;

fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties { queue_flags: flags, queue_count, ..Default::default() }
}

fn extension(name: &CStr) -> vk::ExtensionProperties {
    let mut props = vk::ExtensionProperties::default();
    for (dst, &src) in props.extension_name.iter_mut().zip(name.to_bytes()) {
        *dst = src as std::ffi::c_char;
    }
    props
}

#[test]
fn test_single_family_serves_every_queue() {
    let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 16)];
    let selection = QueueFamilySelection::select(&families).unwrap();
    assert_eq!(selection, QueueFamilySelection { graphics: 0, compute: 0, copy: 0 });
    assert_eq!(selection.unique(), vec![0]);
}

#[test]
fn test_dedicated_families_are_preferred() {
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 16),
        family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 8),
        family(vk::QueueFlags::TRANSFER, 2),
    ];
    let selection = QueueFamilySelection::select(&families).unwrap();
    assert_eq!(selection, QueueFamilySelection { graphics: 0, compute: 1, copy: 2 });
    assert_eq!(selection.unique(), vec![0, 1, 2]);
}

#[test]
fn test_copy_falls_back_to_compute_family() {
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 1),
        family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 4),
    ];
    let selection = QueueFamilySelection::select(&families).unwrap();
    assert_eq!(selection.copy, 1);
    assert_eq!(selection.unique(), vec![0, 1]);
}

#[test]
fn test_empty_families_are_skipped() {
    let families = [
        family(vk::QueueFlags::COMPUTE, 0),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1),
    ];
    let selection = QueueFamilySelection::select(&families).unwrap();
    assert_eq!(selection.graphics, 1);
    assert_eq!(selection.compute, 1);
}

#[test]
fn test_no_graphics_family() {
    let families = [family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER, 4)];
    assert!(QueueFamilySelection::select(&families).is_none());
}

#[test]
fn test_extension_supported() {
    let available = [extension(ash::khr::swapchain::NAME), extension(ash::ext::mesh_shader::NAME)];
    assert!(extension_supported(&available, ash::khr::swapchain::NAME));
    assert!(extension_supported(&available, ash::ext::mesh_shader::NAME));
    assert!(!extension_supported(&available, ash::khr::ray_tracing_pipeline::NAME));
}

#[test]
fn test_default_config() {
    let config = VulkanDeviceConfig::default();
    assert!(config.physical_device_index.is_none());
    assert!(config.enable_ray_tracing);
    assert!(config.enable_mesh_shaders);
    assert_eq!(config.enable_validation, cfg!(debug_assertions));
}

#[test]
fn test_validation_needs_feature() {
    let config = VulkanDeviceConfig { enable_validation: true, ..Default::default() };
    assert_eq!(VulkanLogicalDevice::validation_enabled(&config), cfg!(feature = "vulkan-validation"));
}
