/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Every resource, pipeline and command list holds an `Arc<GpuContext>`, so
/// the logical device and instance are destroyed only after the last object
/// created from them.

use ash::vk;
use dz_rhi::dz::{Error, QueueType, Result};
use dz_rhi::{engine_err, engine_error};
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::vulkan_barrier::{PipelineStageSupport, QueueFamilies};

/// One native queue; submissions to it are externally synchronized
pub struct DeviceQueue {
    pub family: u32,
    queue: Mutex<vk::Queue>,
}

impl DeviceQueue {
    pub fn new(family: u32, queue: vk::Queue) -> Self {
        Self { family, queue: Mutex::new(queue) }
    }

    /// Run `f` with exclusive access to the queue
    pub fn with<R>(&self, f: impl FnOnce(vk::Queue) -> R) -> Result<R> {
        let queue = self.queue.lock()
            .map_err(|_| engine_err!("dz::vulkan", "Queue lock poisoned (family {})", self.family))?;
        Ok(f(*queue))
    }
}

/// Queues of every RHI queue type; types on the same family share a queue
pub struct DeviceQueues {
    pub graphics: Arc<DeviceQueue>,
    pub compute: Arc<DeviceQueue>,
    pub copy: Arc<DeviceQueue>,
}

impl DeviceQueues {
    pub fn get(&self, queue_type: QueueType) -> &Arc<DeviceQueue> {
        match queue_type {
            QueueType::Graphics => &self.graphics,
            QueueType::Compute | QueueType::RayTracing => &self.compute,
            QueueType::Copy => &self.copy,
        }
    }

    pub fn families(&self) -> QueueFamilies {
        QueueFamilies {
            graphics: self.graphics.family,
            compute: self.compute.family,
            copy: self.copy.family,
        }
    }
}

/// Device extension loaders, present only when the extension is enabled
#[derive(Default)]
pub struct ExtensionLoaders {
    pub swapchain: Option<ash::khr::swapchain::Device>,
    pub acceleration_structure: Option<ash::khr::acceleration_structure::Device>,
    pub ray_tracing_pipeline: Option<ash::khr::ray_tracing_pipeline::Device>,
    pub mesh_shader: Option<ash::ext::mesh_shader::Device>,
}

/// Device limits needed after creation
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceLimits {
    pub max_push_constants_size: u32,
    /// 0 without ray tracing
    pub shader_group_handle_size: u32,
    pub shader_group_base_alignment: u32,
}

pub struct GpuContext {
    pub device: ash::Device,

    /// Wrapped in ManuallyDrop so it's dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    pub queues: DeviceQueues,

    pub extensions: ExtensionLoaders,

    pub stage_support: PipelineStageSupport,

    pub limits: DeviceLimits,

    /// `bufferDeviceAddress` is enabled
    pub buffer_device_address: bool,

    instance: ash::Instance,

    /// Keeps the Vulkan loader alive until the instance is destroyed
    _entry: ash::Entry,

    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    debug_names: Option<ash::ext::debug_utils::Device>,

    device_lost: AtomicBool,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        device: ash::Device,
        allocator: Allocator,
        queues: DeviceQueues,
        extensions: ExtensionLoaders,
        stage_support: PipelineStageSupport,
        limits: DeviceLimits,
        buffer_device_address: bool,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        let debug_names = debug_utils_loader.as_ref()
            .map(|_| ash::ext::debug_utils::Device::new(&instance, &device));
        Self {
            device,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            queues,
            extensions,
            stage_support,
            limits,
            buffer_device_address,
            instance,
            _entry: entry,
            debug_utils_loader,
            debug_messenger,
            debug_names,
            device_lost: AtomicBool::new(false),
        }
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::Acquire)
    }

    /// Translate a native failure, latching device loss
    pub fn check(&self, result: vk::Result, what: &str) -> Error {
        if result == vk::Result::ERROR_DEVICE_LOST {
            if !self.device_lost.swap(true, Ordering::AcqRel) {
                engine_error!("dz::vulkan", "Device lost during {}", what);
            }
            return Error::DeviceLost;
        }
        engine_err!("dz::vulkan", "{} failed: {:?}", what, result)
    }

    /// Attach a debug name to a Vulkan object (no-op without validation)
    pub fn set_debug_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(debug_names) = &self.debug_names else {
            return;
        };
        let Ok(name) = std::ffi::CString::new(name) else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            debug_names.set_debug_utils_object_name(&info).ok();
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // Free VkDeviceMemory pages before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
