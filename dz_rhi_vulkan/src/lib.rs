/*!
# DenOfIz RHI - Vulkan Backend

Vulkan implementation of the DenOfIz RHI collaborator traits, using Ash for
the Vulkan bindings and gpu-allocator for memory management.

The device is headless. Windowing code creates the surface and swap chain
from [`VulkanLogicalDevice::instance`] and hands the swap chain to
[`VulkanLogicalDevice::wrap_swap_chain`].

# Example

```no_run
use dz_rhi::dz::{CommandListDesc, LogicalDevice, QueueType};
use dz_rhi_vulkan::dz::{VulkanDeviceConfig, VulkanLogicalDevice};

let device = VulkanLogicalDevice::new(VulkanDeviceConfig::default())?;
let command_list = device.create_command_list(&CommandListDesc { queue_type: QueueType::Graphics })?;
# Ok::<(), dz_rhi::dz::Error>(())
```
*/

// Vulkan implementation modules
mod vulkan_conversions;
mod vulkan_context;
mod vulkan_barrier;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_sync;
mod vulkan_root_signature;
mod vulkan_bind_group;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_command_list;
mod vulkan_acceleration_structure;
mod vulkan_device;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub mod dz {
    pub use crate::vulkan_device::{QueueFamilySelection, VulkanDeviceConfig, VulkanLogicalDevice};
    pub use crate::vulkan_context::{DeviceLimits, DeviceQueue, DeviceQueues, GpuContext};

    // Native objects, reachable through `as_any()` downcasts
    pub use crate::vulkan_buffer::VulkanBuffer;
    pub use crate::vulkan_texture::VulkanTexture;
    pub use crate::vulkan_sampler::VulkanSampler;
    pub use crate::vulkan_sync::{VulkanFence, VulkanSemaphore};
    pub use crate::vulkan_root_signature::VulkanRootSignature;
    pub use crate::vulkan_bind_group::VulkanBindGroup;
    pub use crate::vulkan_pipeline::VulkanPipeline;
    pub use crate::vulkan_swapchain::VulkanSwapChain;
    pub use crate::vulkan_command_list::VulkanCommandList;

    pub use crate::vulkan_barrier::{
        select_vulkan_barrier_strategy, LegacyVulkanBarriers, PipelineStageSupport, QueueFamilies,
        Synchronization2Barriers, VulkanBarrierBatch,
    };
    pub use crate::vulkan_acceleration_structure::{
        align_up, instance_bytes, pack_shader_records, AccelerationStructureInstance, AccelerationStructureSizes,
    };

    // Validation layer utilities
    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{
        get_validation_stats, print_validation_stats_report, Config as ValidationConfig, ValidationSeverity,
        ValidationStats,
    };
}
