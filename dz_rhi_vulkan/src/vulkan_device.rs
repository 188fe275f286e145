/// VulkanLogicalDevice - Vulkan implementation of the LogicalDevice trait
///
/// The device is headless: presentation works through swap chains created by
/// the windowing layer and wrapped with [`VulkanLogicalDevice::wrap_swap_chain`].

use ash::vk;
use dz_rhi::dz::binding::{ResourceBindGroup, ResourceBindGroupDesc, RootSignature, RootSignatureDesc};
use dz_rhi::dz::command::{
    AccelerationStructureGeometry, CommandList, CommandListDesc, CommandListPool, CommandListPoolDesc,
};
use dz_rhi::dz::device::{
    BufferDesc, BufferResource, DeviceCapabilities, Fence, LogicalDevice, Pipeline, PipelineDesc, Sampler,
    SamplerDesc, Semaphore, TextureDesc, TextureResource,
};
use dz_rhi::dz::{Engine, Error, Format, QueueType, Result, TargetIL};
use dz_rhi::{engine_bail, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_acceleration_structure::{bottom_level_geometries, top_level_geometry, AccelerationStructureSizes};
use crate::vulkan_barrier::{select_vulkan_barrier_strategy, PipelineStageSupport};
use crate::vulkan_bind_group::{DescriptorPools, VulkanBindGroup};
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::{DeviceLimits, DeviceQueue, DeviceQueues, ExtensionLoaders, GpuContext};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_root_signature::VulkanRootSignature;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_swapchain::VulkanSwapChain;
use crate::vulkan_sync::{VulkanFence, VulkanSemaphore};
use crate::vulkan_texture::VulkanTexture;

const SOURCE: &str = "dz::vulkan";

/// Device creation options
#[derive(Debug, Clone)]
pub struct VulkanDeviceConfig {
    pub application_name: String,
    /// Load VK_LAYER_KHRONOS_validation and install the debug messenger
    /// (requires the `vulkan-validation` feature)
    pub enable_validation: bool,
    #[cfg(feature = "vulkan-validation")]
    pub validation: crate::debug::Config,
    /// Adapter to use; `None` prefers the first discrete GPU
    pub physical_device_index: Option<usize>,
    /// Enable ray tracing extensions when the adapter has them
    pub enable_ray_tracing: bool,
    /// Enable VK_EXT_mesh_shader when the adapter has it
    pub enable_mesh_shaders: bool,
}

impl Default for VulkanDeviceConfig {
    fn default() -> Self {
        Self {
            application_name: "DenOfIz Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            #[cfg(feature = "vulkan-validation")]
            validation: crate::debug::Config::default(),
            physical_device_index: None,
            enable_ray_tracing: true,
            enable_mesh_shaders: true,
        }
    }
}

/// Queue family chosen for each queue type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilySelection {
    pub graphics: u32,
    pub compute: u32,
    pub copy: u32,
}

impl QueueFamilySelection {
    /// Prefer dedicated compute and transfer families, fall back to graphics
    pub fn select(families: &[vk::QueueFamilyProperties]) -> Option<Self> {
        let has = |props: &vk::QueueFamilyProperties, flags: vk::QueueFlags| {
            props.queue_count > 0 && props.queue_flags.contains(flags)
        };
        let graphics = families.iter()
            .position(|f| has(f, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE))? as u32;
        let compute = families.iter()
            .position(|f| has(f, vk::QueueFlags::COMPUTE) && !f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map_or(graphics, |i| i as u32);
        let copy = families.iter()
            .position(|f| {
                has(f, vk::QueueFlags::TRANSFER)
                    && !f.queue_flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
            })
            .map_or(compute, |i| i as u32);
        Some(Self { graphics, compute, copy })
    }

    fn unique(&self) -> Vec<u32> {
        let mut families = vec![self.graphics];
        for family in [self.compute, self.copy] {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// Features detected on the adapter and enabled on the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct EnabledFeatures {
    synchronization2: bool,
    buffer_device_address: bool,
    ray_tracing: bool,
    mesh_shaders: bool,
    swapchain: bool,
    geometry_shader: bool,
    tessellation_shader: bool,
    sampler_anisotropy: bool,
}

fn extension_supported(available: &[vk::ExtensionProperties], name: &CStr) -> bool {
    available.iter().any(|ext| ext.extension_name_as_c_str().is_ok_and(|n| n == name))
}

pub struct VulkanLogicalDevice {
    ctx: Arc<GpuContext>,
    physical_device: vk::PhysicalDevice,
    capabilities: DeviceCapabilities,
    descriptor_pools: Arc<DescriptorPools>,
    device_name: String,
}

impl VulkanLogicalDevice {
    pub fn new(config: VulkanDeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| engine_err!(SOURCE, InitializationFailed => "Failed to load Vulkan library: {:?}", e))?;

            let application_name = CString::new(config.application_name.as_str())
                .unwrap_or_else(|_| CString::from(c"DenOfIz Application"));
            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"DenOfIz")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let validation = Self::validation_enabled(&config);
            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry.create_instance(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, InitializationFailed => "Failed to create Vulkan instance: {:?}", e))?;

            let (debug_utils_loader, debug_messenger) = match Self::create_debug_messenger(&entry, &instance, &config) {
                Ok(debug) => debug,
                Err(e) => {
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            Self::create_device(entry, instance, debug_utils_loader, debug_messenger, &config)
        }
    }

    fn validation_enabled(config: &VulkanDeviceConfig) -> bool {
        if cfg!(feature = "vulkan-validation") {
            config.enable_validation
        } else {
            if config.enable_validation {
                engine_warn!(SOURCE, "Validation requested but the vulkan-validation feature is disabled");
            }
            false
        }
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &VulkanDeviceConfig,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        if !config.enable_validation {
            return Ok((None, None));
        }
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::init_debug_config(config.validation);

        let mut message_types = vk::DebugUtilsMessageTypeFlagsEXT::GENERAL | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION;
        if config.validation.show_performance {
            message_types |= vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;
        }
        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(config.validation.severity.message_severity_flags())
            .message_type(message_types)
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils.create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| engine_err!(SOURCE, InitializationFailed => "Failed to create debug messenger: {:?}", e))?;
        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
        _config: &VulkanDeviceConfig,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    unsafe fn pick_physical_device(instance: &ash::Instance, config: &VulkanDeviceConfig) -> Result<vk::PhysicalDevice> {
        let physical_devices = instance.enumerate_physical_devices()
            .map_err(|e| engine_err!(SOURCE, InitializationFailed => "Failed to enumerate physical devices: {:?}", e))?;
        if physical_devices.is_empty() {
            engine_bail!(SOURCE, InitializationFailed => "No Vulkan-capable GPU found");
        }

        if let Some(index) = config.physical_device_index {
            return match physical_devices.get(index) {
                Some(&device) => Ok(device),
                None => engine_bail!(SOURCE, InitializationFailed =>
                    "Physical device {} requested but only {} found", index, physical_devices.len()),
            };
        }

        let discrete = physical_devices.iter().copied().find(|&device| {
            instance.get_physical_device_properties(device).device_type == vk::PhysicalDeviceType::DISCRETE_GPU
        });
        Ok(discrete.unwrap_or(physical_devices[0]))
    }

    unsafe fn create_device(
        entry: ash::Entry,
        instance: ash::Instance,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
        config: &VulkanDeviceConfig,
    ) -> Result<Self> {
        // Until GpuContext exists the instance and messenger are ours to clean up
        let cleanup = |instance: &ash::Instance| {
            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();
            if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            instance.destroy_instance(None);
        };

        let physical_device = match Self::pick_physical_device(&instance, config) {
            Ok(device) => device,
            Err(e) => {
                cleanup(&instance);
                return Err(e);
            }
        };
        let properties = instance.get_physical_device_properties(physical_device);
        let device_name = properties.device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        let queue_family_properties = instance.get_physical_device_queue_family_properties(physical_device);
        let Some(families) = QueueFamilySelection::select(&queue_family_properties) else {
            cleanup(&instance);
            engine_bail!(SOURCE, InitializationFailed => "No graphics queue family found on '{}'", device_name);
        };

        let available_extensions = instance.enumerate_device_extension_properties(physical_device)
            .unwrap_or_default();

        // Query supported features
        let mut supported12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut supported13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut supported_as = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default();
        let mut supported_rt = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default();
        let mut supported_mesh = vk::PhysicalDeviceMeshShaderFeaturesEXT::default();
        let base_features = {
            let mut features2 = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut supported12)
                .push_next(&mut supported13)
                .push_next(&mut supported_as)
                .push_next(&mut supported_rt)
                .push_next(&mut supported_mesh);
            instance.get_physical_device_features2(physical_device, &mut features2);
            features2.features
        };

        if supported13.dynamic_rendering == vk::FALSE {
            cleanup(&instance);
            engine_bail!(SOURCE, InitializationFailed => "'{}' does not support dynamic rendering", device_name);
        }

        let ray_tracing_extensions = [
            ash::khr::acceleration_structure::NAME,
            ash::khr::ray_tracing_pipeline::NAME,
            ash::khr::deferred_host_operations::NAME,
        ];
        let buffer_device_address = supported12.buffer_device_address == vk::TRUE;
        let enabled = EnabledFeatures {
            synchronization2: supported13.synchronization2 == vk::TRUE,
            buffer_device_address,
            ray_tracing: config.enable_ray_tracing
                && buffer_device_address
                && ray_tracing_extensions.iter().all(|name| extension_supported(&available_extensions, name))
                && supported_as.acceleration_structure == vk::TRUE
                && supported_rt.ray_tracing_pipeline == vk::TRUE,
            mesh_shaders: config.enable_mesh_shaders
                && extension_supported(&available_extensions, ash::ext::mesh_shader::NAME)
                && supported_mesh.mesh_shader == vk::TRUE,
            swapchain: extension_supported(&available_extensions, ash::khr::swapchain::NAME),
            geometry_shader: base_features.geometry_shader == vk::TRUE,
            tessellation_shader: base_features.tessellation_shader == vk::TRUE,
            sampler_anisotropy: base_features.sampler_anisotropy == vk::TRUE,
        };

        let mut device_extension_names = Vec::new();
        if enabled.swapchain {
            device_extension_names.push(ash::khr::swapchain::NAME.as_ptr());
        }
        if enabled.ray_tracing {
            device_extension_names.extend(ray_tracing_extensions.iter().map(|name| name.as_ptr()));
        }
        if enabled.mesh_shaders {
            device_extension_names.push(ash::ext::mesh_shader::NAME.as_ptr());
        }

        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families.unique().into_iter()
            .map(|family| vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities))
            .collect();

        let base = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(enabled.sampler_anisotropy)
            .geometry_shader(enabled.geometry_shader)
            .tessellation_shader(enabled.tessellation_shader);
        let mut enable12 = vk::PhysicalDeviceVulkan12Features::default()
            .buffer_device_address(enabled.buffer_device_address);
        let mut enable13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(enabled.synchronization2);
        let mut enable_as = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default()
            .acceleration_structure(true);
        let mut enable_rt = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default()
            .ray_tracing_pipeline(true);
        let mut enable_mesh = vk::PhysicalDeviceMeshShaderFeaturesEXT::default()
            .mesh_shader(true)
            .task_shader(supported_mesh.task_shader == vk::TRUE);
        let mut enabled_features = vk::PhysicalDeviceFeatures2::default()
            .features(base)
            .push_next(&mut enable12)
            .push_next(&mut enable13);
        if enabled.ray_tracing {
            enabled_features = enabled_features.push_next(&mut enable_as).push_next(&mut enable_rt);
        }
        if enabled.mesh_shaders {
            enabled_features = enabled_features.push_next(&mut enable_mesh);
        }

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .push_next(&mut enabled_features);
        let device = match instance.create_device(physical_device, &device_create_info, None) {
            Ok(device) => device,
            Err(e) => {
                cleanup(&instance);
                engine_bail!(SOURCE, InitializationFailed => "Failed to create logical device: {:?}", e);
            }
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: enabled.buffer_device_address,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                device.destroy_device(None);
                cleanup(&instance);
                engine_bail!(SOURCE, InitializationFailed => "Failed to create GPU allocator: {:?}", e);
            }
        };

        let graphics = Arc::new(DeviceQueue::new(families.graphics, device.get_device_queue(families.graphics, 0)));
        let queue_for = |family: u32| {
            if family == families.graphics {
                Arc::clone(&graphics)
            } else {
                Arc::new(DeviceQueue::new(family, device.get_device_queue(family, 0)))
            }
        };
        let compute = queue_for(families.compute);
        let copy = if families.copy == families.compute { Arc::clone(&compute) } else { queue_for(families.copy) };
        let queues = DeviceQueues { graphics, compute, copy };

        let extensions = ExtensionLoaders {
            swapchain: enabled.swapchain.then(|| ash::khr::swapchain::Device::new(&instance, &device)),
            acceleration_structure: enabled.ray_tracing
                .then(|| ash::khr::acceleration_structure::Device::new(&instance, &device)),
            ray_tracing_pipeline: enabled.ray_tracing
                .then(|| ash::khr::ray_tracing_pipeline::Device::new(&instance, &device)),
            mesh_shader: enabled.mesh_shaders.then(|| ash::ext::mesh_shader::Device::new(&instance, &device)),
        };

        let mut limits = DeviceLimits {
            max_push_constants_size: properties.limits.max_push_constants_size,
            ..Default::default()
        };
        if enabled.ray_tracing {
            let mut rt_properties = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
            let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut rt_properties);
            instance.get_physical_device_properties2(physical_device, &mut properties2);
            limits.shader_group_handle_size = rt_properties.shader_group_handle_size;
            limits.shader_group_base_alignment = rt_properties.shader_group_base_alignment;
        }

        let stage_support = PipelineStageSupport {
            geometry_shaders: enabled.geometry_shader,
            tessellation: enabled.tessellation_shader,
            ray_tracing: enabled.ray_tracing,
        };

        // GpuContext owns device, instance, and debug messenger destruction
        let ctx = Arc::new(GpuContext::new(
            entry,
            instance,
            device,
            allocator,
            queues,
            extensions,
            stage_support,
            limits,
            enabled.buffer_device_address,
            debug_utils_loader,
            debug_messenger,
        ));

        let capabilities = DeviceCapabilities {
            enhanced_barriers: enabled.synchronization2,
            subresource_barriers: true,
            ray_tracing: enabled.ray_tracing,
            mesh_shaders: enabled.mesh_shaders,
            dedicated_compute_queue: families.compute != families.graphics,
            dedicated_copy_queue: families.copy != families.graphics && families.copy != families.compute,
            native_target_il: TargetIL::Spirv,
        };
        let descriptor_pools = Arc::new(DescriptorPools::new(Arc::clone(&ctx), enabled.ray_tracing)?);

        engine_info!(SOURCE,
            "Created device on '{}' (queues: graphics {}, compute {}, copy {}; sync2 {}, ray tracing {}, mesh {})",
            device_name, families.graphics, families.compute, families.copy,
            enabled.synchronization2, enabled.ray_tracing, enabled.mesh_shaders);

        Ok(Self { ctx, physical_device, capabilities, descriptor_pools, device_name })
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Needed by the windowing layer to create surfaces
    pub fn instance(&self) -> &ash::Instance {
        self.ctx.instance()
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Wrap an externally created swap chain for rendering and present
    pub fn wrap_swap_chain(
        &self,
        swapchain: vk::SwapchainKHR,
        format: Format,
        width: u32,
        height: u32,
    ) -> Result<Arc<VulkanSwapChain>> {
        Ok(Arc::new(VulkanSwapChain::new(Arc::clone(&self.ctx), swapchain, format, width, height)?))
    }

    pub fn descriptor_pool_count(&self) -> usize {
        self.descriptor_pools.pool_count()
    }

    fn acceleration_structure_sizes(
        &self,
        build_info: &vk::AccelerationStructureBuildGeometryInfoKHR,
        primitive_counts: &[u32],
    ) -> Result<AccelerationStructureSizes> {
        let Some(loader) = &self.ctx.extensions.acceleration_structure else {
            engine_bail!(SOURCE, Configuration => "Acceleration structures are not supported by this device");
        };
        let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
        unsafe {
            loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                build_info,
                primitive_counts,
                &mut sizes,
            );
        }
        Ok(sizes.into())
    }

    /// Buffer sizes for a bottom-level build of `geometries`
    pub fn bottom_level_sizes(&self, geometries: &[AccelerationStructureGeometry]) -> Result<AccelerationStructureSizes> {
        let (native, ranges) = bottom_level_geometries(geometries)?;
        let primitive_counts: Vec<u32> = ranges.iter().map(|r| r.primitive_count).collect();
        let build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(&native);
        self.acceleration_structure_sizes(&build_info, &primitive_counts)
    }

    /// Buffer sizes for a top-level build over `num_instances` instances
    pub fn top_level_sizes(&self, num_instances: u32) -> Result<AccelerationStructureSizes> {
        let geometries = [top_level_geometry(0)];
        let build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE
                | vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(&geometries);
        self.acceleration_structure_sizes(&build_info, &[num_instances])
    }
}

impl LogicalDevice for VulkanLogicalDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer_resource(&self, desc: &BufferDesc) -> Result<Arc<dyn BufferResource>> {
        Ok(Arc::new(VulkanBuffer::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_texture_resource(&self, desc: &TextureDesc) -> Result<Arc<dyn TextureResource>> {
        Ok(Arc::new(VulkanTexture::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(VulkanSampler::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<Arc<dyn RootSignature>> {
        Ok(Arc::new(VulkanRootSignature::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(VulkanPipeline::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_resource_bind_group(&self, desc: &ResourceBindGroupDesc) -> Result<Arc<ResourceBindGroup>> {
        let Some(root_signature) = desc.root_signature.as_any().downcast_ref::<VulkanRootSignature>() else {
            engine_bail!(SOURCE, InvalidResource => "Root signature was not created by a Vulkan device");
        };
        let native = VulkanBindGroup::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.descriptor_pools),
            root_signature,
            desc.root_signature.layout(),
            desc.register_space,
        )?;
        Ok(Arc::new(ResourceBindGroup::new(desc, Box::new(native))?))
    }

    fn create_command_list(&self, desc: &CommandListDesc) -> Result<CommandList> {
        if desc.queue_type == QueueType::RayTracing && !self.capabilities.ray_tracing {
            engine_bail!(SOURCE, Configuration => "Ray tracing command lists need a ray tracing capable device");
        }
        let barriers = select_vulkan_barrier_strategy(
            &self.capabilities,
            &Engine::configuration(),
            self.ctx.queues.families(),
            self.ctx.stage_support,
        );
        let backend = VulkanCommandList::new(Arc::clone(&self.ctx), desc.queue_type, barriers)?;
        Ok(CommandList::new(desc, Box::new(backend)))
    }

    /// Every list gets its own `VkCommandPool`, so lists of one pool record
    /// on separate threads without external locking
    fn create_command_list_pool(&self, desc: &CommandListPoolDesc) -> Result<CommandListPool> {
        if desc.queue_type == QueueType::RayTracing && !self.capabilities.ray_tracing {
            engine_bail!(SOURCE, Configuration => "Ray tracing command lists need a ray tracing capable device");
        }
        CommandListPool::new(desc, |list_desc| self.create_command_list(list_desc))
    }

    fn create_fence(&self) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(VulkanFence::new(Arc::clone(&self.ctx))?))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(VulkanSemaphore::new(Arc::clone(&self.ctx))?))
    }

    fn is_device_lost(&self) -> bool {
        self.ctx.is_device_lost()
    }

    fn wait_idle(&self) -> Result<()> {
        if self.ctx.is_device_lost() {
            engine_error!(SOURCE, "wait_idle on a lost device");
            return Err(Error::DeviceLost);
        }
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| self.ctx.check(e, "device wait idle"))
        }
    }
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
