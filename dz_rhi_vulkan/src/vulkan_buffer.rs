/// Buffer - Vulkan implementation of the BufferResource trait

use ash::vk;
use ash::vk::Handle;
use dz_rhi::dz::device::{BufferDesc, BufferResource, HeapType, NativeHandle};
use dz_rhi::dz::{Error, ResourceDescriptor, Result};
use dz_rhi::{engine_bail, engine_err, engine_error, engine_warn};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::buffer_usage_flags;

fn memory_location(heap_type: HeapType) -> MemoryLocation {
    match heap_type {
        HeapType::Gpu => MemoryLocation::GpuOnly,
        HeapType::CpuGpu => MemoryLocation::CpuToGpu,
        HeapType::GpuCpu => MemoryLocation::GpuToCpu,
    }
}

/// Vulkan buffer implementation
///
/// Buffers created with `ResourceDescriptor::ACCELERATION_STRUCTURE` also own
/// a generic `VkAccelerationStructureKHR` spanning the whole buffer; its type
/// is fixed by the first build.
pub struct VulkanBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    pub(crate) acceleration_structure: Option<vk::AccelerationStructureKHR>,
    device_address: u64,
    desc: BufferDesc,
}

impl VulkanBuffer {
    pub fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.num_bytes == 0 {
            engine_bail!("dz::vulkan", InvalidResource => "Buffer '{}' has zero size", desc.debug_name);
        }

        let mut usage = buffer_usage_flags(desc.descriptor, desc.initial_usage);
        if !ctx.buffer_device_address && usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS) {
            engine_warn!("dz::vulkan",
                "Buffer '{}' needs device addresses but bufferDeviceAddress is not enabled", desc.debug_name);
            usage &= !(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR);
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.num_bytes)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("dz::vulkan",
                    "Failed to create buffer '{}' of size {} bytes: {:?}", desc.debug_name, desc.num_bytes, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = {
                let mut allocator = match ctx.allocator.lock() {
                    Ok(allocator) => allocator,
                    Err(_) => {
                        ctx.device.destroy_buffer(buffer, None);
                        engine_bail!("dz::vulkan", "GPU allocator lock poisoned");
                    }
                };
                allocator.allocate(&AllocationCreateDesc {
                    name: &desc.debug_name,
                    requirements,
                    location: memory_location(desc.heap_type),
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    ctx.device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("dz::vulkan", "Out of GPU memory for buffer '{}' (required: {:.2} MB)",
                        desc.debug_name, size_mb);
                    return Err(Error::OutOfMemory);
                }
            };

            let mut this = Self {
                ctx: Arc::clone(&ctx),
                buffer,
                allocation: Some(allocation),
                acceleration_structure: None,
                device_address: 0,
                desc: desc.clone(),
            };

            if let Some(allocation) = &this.allocation {
                ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("dz::vulkan", "Failed to bind buffer memory: {:?}", e))?;
            }

            if usage.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS) {
                let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
                this.device_address = ctx.device.get_buffer_device_address(&info);
            }

            if desc.descriptor.contains(ResourceDescriptor::ACCELERATION_STRUCTURE) {
                if let Some(loader) = &ctx.extensions.acceleration_structure {
                    let info = vk::AccelerationStructureCreateInfoKHR::default()
                        .buffer(buffer)
                        .offset(0)
                        .size(desc.num_bytes)
                        .ty(vk::AccelerationStructureTypeKHR::GENERIC);
                    let structure = loader.create_acceleration_structure(&info, None)
                        .map_err(|e| engine_err!("dz::vulkan",
                            "Failed to create acceleration structure '{}': {:?}", desc.debug_name, e))?;
                    this.acceleration_structure = Some(structure);
                } else {
                    engine_bail!("dz::vulkan", InvalidResource =>
                        "Buffer '{}' is an acceleration structure but ray tracing is not enabled", desc.debug_name);
                }
            }

            ctx.set_debug_name(buffer, &desc.debug_name);
            Ok(this)
        }
    }

    pub fn buffer(&self) -> vk::Buffer {
        self.buffer
    }

    /// GPU virtual address (0 when the buffer has none)
    pub fn device_address(&self) -> u64 {
        self.device_address
    }

    /// Address referenced by top-level instance descriptors
    pub fn acceleration_structure_address(&self) -> Option<u64> {
        let structure = self.acceleration_structure?;
        let loader = self.ctx.extensions.acceleration_structure.as_ref()?;
        let info = vk::AccelerationStructureDeviceAddressInfoKHR::default().acceleration_structure(structure);
        Some(unsafe { loader.get_acceleration_structure_device_address(&info) })
    }
}

impl NativeHandle for VulkanBuffer {
    fn native_handle(&self) -> u64 {
        self.buffer.as_raw()
    }

    fn descriptor_handle(&self) -> Option<u64> {
        self.acceleration_structure.map(|s| s.as_raw())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl BufferResource for VulkanBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let Some(allocation) = &self.allocation else {
            engine_bail!("dz::vulkan", "Buffer '{}' has no allocation", self.desc.debug_name);
        };
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.desc.num_bytes) {
            engine_bail!("dz::vulkan", InvalidResource =>
                "Write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(), offset, self.desc.debug_name, self.desc.num_bytes);
        }
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!("dz::vulkan", InvalidResource =>
                "Buffer '{}' is not CPU-accessible", self.desc.debug_name))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let (Some(structure), Some(loader)) =
                (self.acceleration_structure.take(), &self.ctx.extensions.acceleration_structure)
            {
                loader.destroy_acceleration_structure(structure, None);
            }

            // Don't panic if lock fails - we still need to destroy the buffer
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
