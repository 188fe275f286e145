/// Fence and semaphore

use ash::vk;
use dz_rhi::dz::{Fence, Result, Semaphore};
use dz_rhi::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub fn fence(&self) -> vk::Fence {
        self.fence
    }

    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let info = vk::FenceCreateInfo::default();
        let fence = unsafe {
            ctx.device.create_fence(&info, None)
                .map_err(|e| engine_err!("dz::vulkan", "Failed to create fence: {:?}", e))?
        };
        Ok(Self { ctx, fence })
    }
}

impl Fence for VulkanFence {
    fn wait(&self) -> Result<()> {
        unsafe {
            self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(|e| self.ctx.check(e, "fence wait"))
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| engine_err!("dz::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_fence(self.fence, None); }
    }
}

/// Binary semaphore
pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            ctx.device.create_semaphore(&info, None)
                .map_err(|e| engine_err!("dz::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Self { ctx, semaphore })
    }

    pub fn semaphore(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_semaphore(self.semaphore, None); }
    }
}
