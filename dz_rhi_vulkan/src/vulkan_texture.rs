/// Texture - Vulkan implementation of the TextureResource trait

use ash::vk;
use ash::vk::Handle;
use dz_rhi::dz::device::{NativeHandle, TextureDesc, TextureResource};
use dz_rhi::dz::{Error, ResourceDescriptor, Result};
use dz_rhi::{engine_bail, engine_err, engine_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{aspect_mask, format_to_vk, image_usage_flags};

fn view_type(desc: &TextureDesc) -> vk::ImageViewType {
    if desc.depth > 1 {
        vk::ImageViewType::TYPE_3D
    } else if desc.descriptor.contains(ResourceDescriptor::TEXTURE_CUBE) {
        if desc.array_size > 6 { vk::ImageViewType::CUBE_ARRAY } else { vk::ImageViewType::CUBE }
    } else if desc.array_size > 1 {
        vk::ImageViewType::TYPE_2D_ARRAY
    } else {
        vk::ImageViewType::TYPE_2D
    }
}

/// Vulkan texture implementation
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    /// None for images owned by a swap chain
    allocation: Option<Allocation>,
    owns_image: bool,
    desc: TextureDesc,
}

impl VulkanTexture {
    pub fn new(ctx: Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 || desc.depth == 0 || desc.mip_levels == 0 || desc.array_size == 0 {
            engine_bail!("dz::vulkan", InvalidResource =>
                "Texture '{}' has an empty extent ({}x{}x{}, {} mips, {} layers)",
                desc.debug_name, desc.width, desc.height, desc.depth, desc.mip_levels, desc.array_size);
        }

        let mut flags = vk::ImageCreateFlags::empty();
        if desc.descriptor.contains(ResourceDescriptor::TEXTURE_CUBE) {
            flags |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
        }

        unsafe {
            let create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(if desc.depth > 1 { vk::ImageType::TYPE_3D } else { vk::ImageType::TYPE_2D })
                .format(format_to_vk(desc.format))
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: desc.depth })
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_size)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(image_usage_flags(desc.descriptor, desc.initial_usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&create_info, None)
                .map_err(|e| engine_err!("dz::vulkan", "Failed to create texture '{}': {:?}", desc.debug_name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocator.lock() {
                Ok(mut allocator) => allocator.allocate(&AllocationCreateDesc {
                    name: &desc.debug_name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                }),
                Err(_) => {
                    ctx.device.destroy_image(image, None);
                    engine_bail!("dz::vulkan", "GPU allocator lock poisoned");
                }
            };
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(_) => {
                    ctx.device.destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("dz::vulkan", "Out of GPU memory for texture '{}' (required: {:.2} MB)",
                        desc.debug_name, size_mb);
                    return Err(Error::OutOfMemory);
                }
            };

            let mut texture = Self {
                ctx: Arc::clone(&ctx),
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                owns_image: true,
                desc: desc.clone(),
            };

            if let Some(allocation) = &texture.allocation {
                ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("dz::vulkan", "Failed to bind texture memory: {:?}", e))?;
            }
            texture.view = texture.create_view()?;

            ctx.set_debug_name(image, &desc.debug_name);
            Ok(texture)
        }
    }

    /// Wrap an image owned by someone else (swap chain images)
    pub fn from_external(ctx: Arc<GpuContext>, image: vk::Image, desc: TextureDesc) -> Result<Self> {
        let mut texture = Self {
            ctx,
            image,
            view: vk::ImageView::null(),
            allocation: None,
            owns_image: false,
            desc,
        };
        texture.view = texture.create_view()?;
        Ok(texture)
    }

    fn create_view(&self) -> Result<vk::ImageView> {
        // Sampled views of depth-stencil images expose the depth aspect only
        let aspect = if self.desc.format.is_depth() {
            vk::ImageAspectFlags::DEPTH
        } else {
            aspect_mask(self.desc.format)
        };
        let info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type(&self.desc))
            .format(format_to_vk(self.desc.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: self.desc.mip_levels,
                base_array_layer: 0,
                layer_count: self.desc.array_size,
            });
        unsafe {
            self.ctx.device.create_image_view(&info, None)
                .map_err(|e| engine_err!("dz::vulkan",
                    "Failed to create view of texture '{}': {:?}", self.desc.debug_name, e))
        }
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl NativeHandle for VulkanTexture {
    fn native_handle(&self) -> u64 {
        self.image.as_raw()
    }

    fn descriptor_handle(&self) -> Option<u64> {
        Some(self.view.as_raw())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TextureResource for VulkanTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            if self.owns_image {
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
