/// Swap chain - presentation images of an externally created VkSwapchainKHR
///
/// Surface and swap chain creation belong to the windowing layer; this type
/// only exposes the images as render targets and the handle for present.

use ash::vk;
use dz_rhi::dz::device::{SwapChain, TextureDesc, TextureResource};
use dz_rhi::dz::{Format, ResourceDescriptor, ResourceUsage, Result};
use dz_rhi::{engine_bail, engine_err, engine_info};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_texture::VulkanTexture;

pub struct VulkanSwapChain {
    swapchain: vk::SwapchainKHR,
    images: Vec<Arc<VulkanTexture>>,
}

impl VulkanSwapChain {
    /// Wrap `swapchain`; the caller keeps ownership of the handle
    pub fn new(ctx: Arc<GpuContext>, swapchain: vk::SwapchainKHR, format: Format, width: u32, height: u32) -> Result<Self> {
        let Some(loader) = &ctx.extensions.swapchain else {
            engine_bail!("dz::vulkan::SwapChain", Configuration => "VK_KHR_swapchain is not enabled on this device");
        };
        let raw_images = unsafe {
            loader.get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("dz::vulkan::SwapChain", "Failed to get swap chain images: {:?}", e))?
        };

        let mut images = Vec::with_capacity(raw_images.len());
        for (index, image) in raw_images.into_iter().enumerate() {
            let desc = TextureDesc {
                width,
                height,
                depth: 1,
                array_size: 1,
                mip_levels: 1,
                format,
                descriptor: ResourceDescriptor::RENDER_TARGET | ResourceDescriptor::TEXTURE,
                initial_usage: ResourceUsage::UNDEFINED,
                debug_name: format!("swap chain image {}", index),
            };
            images.push(Arc::new(VulkanTexture::from_external(Arc::clone(&ctx), image, desc)?));
        }

        engine_info!("dz::vulkan::SwapChain", "Wrapped swap chain: {} images, {}x{} {:?}",
            images.len(), width, height, format);
        Ok(Self { swapchain, images })
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }
}

impl SwapChain for VulkanSwapChain {
    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn render_target(&self, index: u32) -> Option<Arc<dyn TextureResource>> {
        self.images.get(index as usize).map(|image| Arc::clone(image) as Arc<dyn TextureResource>)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
