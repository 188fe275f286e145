/// Sampler - Vulkan implementation of the Sampler trait
///
/// Also builds the immutable samplers baked into descriptor-set layouts for
/// static samplers.

use ash::vk;
use ash::vk::Handle;
use dz_rhi::dz::device::{CompareOp, NativeHandle, Sampler, SamplerDesc};
use dz_rhi::dz::Result;
use dz_rhi::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{address_mode_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk};

/// Create a raw `VkSampler`; the caller owns it
pub(crate) fn create_vk_sampler(ctx: &GpuContext, desc: &SamplerDesc) -> Result<vk::Sampler> {
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter_to_vk(desc.mag_filter))
        .min_filter(filter_to_vk(desc.min_filter))
        .mipmap_mode(mipmap_mode_to_vk(desc.mipmap_mode))
        .address_mode_u(address_mode_to_vk(desc.address_mode_u))
        .address_mode_v(address_mode_to_vk(desc.address_mode_v))
        .address_mode_w(address_mode_to_vk(desc.address_mode_w))
        .mip_lod_bias(desc.mip_lod_bias)
        .min_lod(desc.min_lod)
        .max_lod(if desc.max_lod == f32::MAX { vk::LOD_CLAMP_NONE } else { desc.max_lod })
        .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
        .unnormalized_coordinates(false);

    if desc.compare_op != CompareOp::Never {
        create_info = create_info
            .compare_enable(true)
            .compare_op(compare_op_to_vk(desc.compare_op));
    } else {
        create_info = create_info
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS);
    }

    if desc.max_anisotropy > 0.0 {
        create_info = create_info
            .anisotropy_enable(true)
            .max_anisotropy(desc.max_anisotropy);
    } else {
        create_info = create_info
            .anisotropy_enable(false)
            .max_anisotropy(1.0);
    }

    unsafe {
        ctx.device.create_sampler(&create_info, None)
            .map_err(|e| engine_err!("dz::vulkan", "Failed to create sampler '{}': {:?}", desc.debug_name, e))
    }
}

pub struct VulkanSampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
    desc: SamplerDesc,
}

impl VulkanSampler {
    pub fn new(ctx: Arc<GpuContext>, desc: &SamplerDesc) -> Result<Self> {
        let sampler = create_vk_sampler(&ctx, desc)?;
        ctx.set_debug_name(sampler, desc.debug_name);
        Ok(Self { ctx, sampler, desc: *desc })
    }
}

impl NativeHandle for VulkanSampler {
    fn native_handle(&self) -> u64 {
        self.sampler.as_raw()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Sampler for VulkanSampler {
    fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe { self.ctx.device.destroy_sampler(self.sampler, None); }
    }
}
