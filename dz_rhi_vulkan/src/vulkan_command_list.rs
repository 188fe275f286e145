/// CommandList - Vulkan implementation of CommandListBackend
///
/// Each list owns a command pool and one primary command buffer on the
/// family of its queue. State and legality checks happen in the core
/// `CommandList`; this type only records and submits.

use ash::vk;
use dz_rhi::dz::barrier::{BarrierPlan, BarrierStrategy};
use dz_rhi::dz::binding::{ResourceBindGroup, RootSignature};
use dz_rhi::dz::command::{
    BuildBottomLevelASDesc, BuildTopLevelASDesc, CommandListBackend,
    CopyBufferRegionDesc, CopyBufferToTextureDesc, CopyTextureRegionDesc, CopyTextureToBufferDesc,
    DispatchRaysDesc, IndexType, RenderingDesc, ScissorRect, ShaderBindingTableRegion, Viewport,
};
use dz_rhi::dz::device::{BindPoint, BufferResource, Fence, Pipeline, PresentDesc, Semaphore, TextureResource};
use dz_rhi::dz::{QueueType, Result};
use dz_rhi::{engine_bail, engine_err, engine_trace, engine_warn};
use std::sync::Arc;

use crate::vulkan_acceleration_structure::{bottom_level_geometries, top_level_geometry};
use crate::vulkan_barrier::VulkanBarrierBatch;
use crate::vulkan_bind_group::VulkanBindGroup;
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::{DeviceQueue, GpuContext};
use crate::vulkan_conversions::{
    aspect_mask, bind_point_to_vk, index_type_to_vk, load_op_to_vk, store_op_to_vk,
};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_root_signature::VulkanRootSignature;
use crate::vulkan_swapchain::VulkanSwapChain;
use crate::vulkan_sync::{VulkanFence, VulkanSemaphore};
use crate::vulkan_texture::VulkanTexture;

const SOURCE: &str = "dz::vulkan::CommandList";

fn vk_buffer(buffer: &Arc<dyn BufferResource>) -> Result<&VulkanBuffer> {
    match buffer.as_any().downcast_ref::<VulkanBuffer>() {
        Some(buffer) => Ok(buffer),
        None => engine_bail!(SOURCE, InvalidResource =>
            "Buffer '{}' was not created by a Vulkan device", buffer.desc().debug_name),
    }
}

fn vk_texture(texture: &Arc<dyn TextureResource>) -> Result<&VulkanTexture> {
    match texture.as_any().downcast_ref::<VulkanTexture>() {
        Some(texture) => Ok(texture),
        None => engine_bail!(SOURCE, InvalidResource =>
            "Texture '{}' was not created by a Vulkan device", texture.desc().debug_name),
    }
}

fn vk_semaphore(semaphore: &Arc<dyn Semaphore>) -> Result<vk::Semaphore> {
    match semaphore.as_any().downcast_ref::<VulkanSemaphore>() {
        Some(semaphore) => Ok(semaphore.semaphore()),
        None => engine_bail!(SOURCE, InvalidResource => "Semaphore was not created by a Vulkan device"),
    }
}

/// Copy aspect of a texture (depth-only for depth-stencil formats)
fn copy_aspect(texture: &VulkanTexture) -> vk::ImageAspectFlags {
    let format = texture.desc().format;
    if format.is_depth() { vk::ImageAspectFlags::DEPTH } else { aspect_mask(format) }
}

fn mip_extent(size: u32, mip_level: u32) -> u32 {
    (size >> mip_level).max(1)
}

fn strided_region(region: &ShaderBindingTableRegion) -> Result<vk::StridedDeviceAddressRegionKHR> {
    let buffer = vk_buffer(&region.buffer)?;
    Ok(vk::StridedDeviceAddressRegionKHR {
        device_address: buffer.device_address() + region.offset,
        stride: region.stride,
        size: region.size,
    })
}

pub struct VulkanCommandList {
    ctx: Arc<GpuContext>,
    queue_type: QueueType,
    queue: Arc<DeviceQueue>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    barriers: Box<dyn BarrierStrategy<Output = VulkanBarrierBatch>>,
    /// Semaphores the next submission waits on
    pending_waits: Vec<vk::Semaphore>,
}

impl VulkanCommandList {
    pub fn new(
        ctx: Arc<GpuContext>,
        queue_type: QueueType,
        barriers: Box<dyn BarrierStrategy<Output = VulkanBarrierBatch>>,
    ) -> Result<Self> {
        let queue = Arc::clone(ctx.queues.get(queue_type));
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue.family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create command pool: {:?}", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    engine_bail!(SOURCE, "Failed to allocate command buffer: {:?}", e);
                }
            };

            Ok(Self {
                ctx,
                queue_type,
                queue,
                command_pool,
                command_buffer: command_buffers[0],
                barriers,
                pending_waits: Vec::new(),
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub fn barrier_strategy_name(&self) -> &'static str {
        self.barriers.name()
    }

    fn submit(&mut self, command_buffers: &[vk::CommandBuffer], signals: &[vk::Semaphore], fence: vk::Fence) -> Result<()> {
        let waits = std::mem::take(&mut self.pending_waits);
        let wait_stages = vec![vk::PipelineStageFlags::ALL_COMMANDS; waits.len()];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&waits)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(command_buffers)
            .signal_semaphores(signals);

        let ctx = &self.ctx;
        self.queue.with(|queue| unsafe { ctx.device.queue_submit(queue, &[submit_info], fence) })?
            .map_err(|e| ctx.check(e, "queue submit"))
    }
}

impl CommandListBackend for VulkanCommandList {
    fn supports_subresource_barriers(&self) -> bool {
        self.barriers.supports_subresource_barriers()
    }

    fn begin(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| self.ctx.check(e, "command pool reset"))?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| self.ctx.check(e, "command buffer begin"))
        }
    }

    fn end(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.end_command_buffer(self.command_buffer)
                .map_err(|e| self.ctx.check(e, "command buffer end"))
        }
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        let (width, height) = desc.render_area();

        let mut color_attachments = Vec::with_capacity(desc.render_targets.len());
        for target in &desc.render_targets {
            let texture = vk_texture(&target.resource)?;
            color_attachments.push(vk::RenderingAttachmentInfo::default()
                .image_view(texture.view)
                .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .load_op(load_op_to_vk(target.load_op))
                .store_op(store_op_to_vk(target.store_op))
                .clear_value(vk::ClearValue {
                    color: vk::ClearColorValue { float32: target.clear_color },
                }));
        }

        let depth_attachment = match &desc.depth_attachment {
            Some(depth) => {
                let texture = vk_texture(&depth.resource)?;
                Some(vk::RenderingAttachmentInfo::default()
                    .image_view(texture.view)
                    .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                    .load_op(load_op_to_vk(depth.load_op))
                    .store_op(store_op_to_vk(depth.store_op))
                    .clear_value(vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: depth.clear_depth,
                            stencil: depth.clear_stencil,
                        },
                    }))
            }
            None => None,
        };

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width, height },
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = &depth_attachment {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let Some(vk_pipeline) = pipeline.as_any().downcast_ref::<VulkanPipeline>() else {
            engine_bail!(SOURCE, InvalidResource => "Pipeline was not created by a Vulkan device");
        };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                bind_point_to_vk(pipeline.bind_point()),
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn set_root_signature(&mut self, root_signature: &Arc<dyn RootSignature>, _bind_point: BindPoint) -> Result<()> {
        // Vulkan has no separate root signature binding; sets and push
        // constants are bound with the signature's pipeline layout
        if root_signature.as_any().downcast_ref::<VulkanRootSignature>().is_none() {
            engine_bail!(SOURCE, InvalidResource => "Root signature was not created by a Vulkan device");
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64) -> Result<()> {
        let buffer = vk_buffer(buffer)?;
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn BufferResource>, offset: u64, index_type: IndexType) -> Result<()> {
        let buffer = vk_buffer(buffer)?;
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(self.command_buffer, buffer.buffer, offset, index_type_to_vk(index_type));
        }
        Ok(())
    }

    fn bind_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        // Negative height flips Y so clip space matches the other backends
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y + viewport.height,
            width: viewport.width,
            height: -viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn bind_scissor_rect(&mut self, rect: &ScissorRect) -> Result<()> {
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: rect.left.max(0), y: rect.top.max(0) },
            extent: vk::Extent2D {
                width: rect.width().max(0) as u32,
                height: rect.height().max(0) as u32,
            },
        };
        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[scissor]);
        }
        Ok(())
    }

    fn bind_resource_group(&mut self, group: &ResourceBindGroup, bind_point: BindPoint) -> Result<()> {
        let Some(root_signature) = group.root_signature().as_any().downcast_ref::<VulkanRootSignature>() else {
            engine_bail!(SOURCE, InvalidResource => "Bind group root signature was not created by a Vulkan device");
        };
        let layout = root_signature.pipeline_layout();
        let push_stages = root_signature.push_constant_stages();
        let device = &self.ctx.device;
        let command_buffer = self.command_buffer;

        group.with_native(|native, _table| {
            let Some(native) = native.as_any().downcast_ref::<VulkanBindGroup>() else {
                engine_bail!(SOURCE, InvalidResource => "Bind group was not created by a Vulkan device");
            };
            unsafe {
                if let Some(set) = native.descriptor_set() {
                    device.cmd_bind_descriptor_sets(
                        command_buffer,
                        bind_point_to_vk(bind_point),
                        layout,
                        native.register_space(),
                        &[set],
                        &[],
                    );
                }
                if !native.push_constants().is_empty() {
                    device.cmd_push_constants(command_buffer, layout, push_stages, 0, native.push_constants());
                }
            }
            Ok(())
        })?
    }

    fn pipeline_barrier(&mut self, plan: &BarrierPlan) -> Result<()> {
        let batch = self.barriers.translate(plan, self.queue_type)?;
        engine_trace!(SOURCE, "{} barrier(s) via {}", plan.len(), self.barriers.name());
        unsafe {
            batch.record(&self.ctx.device, self.command_buffer);
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, instance_count, first_vertex, first_instance);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer, index_count, instance_count, first_index, vertex_offset, first_instance);
        }
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        unsafe {
            self.ctx.device.cmd_dispatch(self.command_buffer, x, y, z);
        }
        Ok(())
    }

    fn dispatch_mesh(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        let Some(mesh) = &self.ctx.extensions.mesh_shader else {
            engine_bail!(SOURCE, Configuration => "Mesh shaders are not supported by this device");
        };
        unsafe {
            mesh.cmd_draw_mesh_tasks(self.command_buffer, x, y, z);
        }
        Ok(())
    }

    fn dispatch_rays(&mut self, desc: &DispatchRaysDesc) -> Result<()> {
        let Some(loader) = &self.ctx.extensions.ray_tracing_pipeline else {
            engine_bail!(SOURCE, Configuration => "Ray tracing is not supported by this device");
        };
        let ray_generation = strided_region(&desc.ray_generation)?;
        let miss = strided_region(&desc.miss)?;
        let hit_group = strided_region(&desc.hit_group)?;
        let callable = match &desc.callable {
            Some(region) => strided_region(region)?,
            None => vk::StridedDeviceAddressRegionKHR::default(),
        };
        unsafe {
            loader.cmd_trace_rays(
                self.command_buffer,
                &ray_generation,
                &miss,
                &hit_group,
                &callable,
                desc.width,
                desc.height,
                desc.depth,
            );
        }
        Ok(())
    }

    fn copy_buffer_region(&mut self, desc: &CopyBufferRegionDesc) -> Result<()> {
        let src = vk_buffer(&desc.src_buffer)?;
        let dst = vk_buffer(&desc.dst_buffer)?;
        let region = vk::BufferCopy {
            src_offset: desc.src_offset,
            dst_offset: desc.dst_offset,
            size: desc.num_bytes,
        };
        unsafe {
            self.ctx.device.cmd_copy_buffer(self.command_buffer, src.buffer, dst.buffer, &[region]);
        }
        Ok(())
    }

    fn copy_texture_region(&mut self, desc: &CopyTextureRegionDesc) -> Result<()> {
        let src = vk_texture(&desc.src_texture)?;
        let dst = vk_texture(&desc.dst_texture)?;
        let region = vk::ImageCopy {
            src_subresource: vk::ImageSubresourceLayers {
                aspect_mask: copy_aspect(src),
                mip_level: desc.src_mip_level,
                base_array_layer: desc.src_array_layer,
                layer_count: 1,
            },
            src_offset: vk::Offset3D { x: desc.src_x as i32, y: desc.src_y as i32, z: desc.src_z as i32 },
            dst_subresource: vk::ImageSubresourceLayers {
                aspect_mask: copy_aspect(dst),
                mip_level: desc.dst_mip_level,
                base_array_layer: desc.dst_array_layer,
                layer_count: 1,
            },
            dst_offset: vk::Offset3D { x: desc.dst_x as i32, y: desc.dst_y as i32, z: desc.dst_z as i32 },
            extent: vk::Extent3D { width: desc.width, height: desc.height, depth: desc.depth.max(1) },
        };
        unsafe {
            self.ctx.device.cmd_copy_image(
                self.command_buffer,
                src.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    fn copy_buffer_to_texture(&mut self, desc: &CopyBufferToTextureDesc) -> Result<()> {
        let src = vk_buffer(&desc.src_buffer)?;
        let dst = vk_texture(&desc.dst_texture)?;
        let texture_desc = dst.desc();
        let region = vk::BufferImageCopy {
            buffer_offset: desc.src_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: copy_aspect(dst),
                mip_level: desc.mip_level,
                base_array_layer: desc.array_layer,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width: mip_extent(texture_desc.width, desc.mip_level),
                height: mip_extent(texture_desc.height, desc.mip_level),
                depth: mip_extent(texture_desc.depth, desc.mip_level),
            },
        };
        unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                src.buffer,
                dst.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    fn copy_texture_to_buffer(&mut self, desc: &CopyTextureToBufferDesc) -> Result<()> {
        let src = vk_texture(&desc.src_texture)?;
        let dst = vk_buffer(&desc.dst_buffer)?;
        let texture_desc = src.desc();
        // Zero extent copies the rest of the mip level
        let width = if desc.width == 0 {
            mip_extent(texture_desc.width, desc.mip_level).saturating_sub(desc.src_x)
        } else {
            desc.width
        };
        let height = if desc.height == 0 {
            mip_extent(texture_desc.height, desc.mip_level).saturating_sub(desc.src_y)
        } else {
            desc.height
        };
        let region = vk::BufferImageCopy {
            buffer_offset: desc.dst_offset,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: copy_aspect(src),
                mip_level: desc.mip_level,
                base_array_layer: desc.array_layer,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: desc.src_x as i32, y: desc.src_y as i32, z: desc.src_z as i32 },
            image_extent: vk::Extent3D { width, height, depth: 1 },
        };
        unsafe {
            self.ctx.device.cmd_copy_image_to_buffer(
                self.command_buffer,
                src.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.buffer,
                &[region],
            );
        }
        Ok(())
    }

    fn build_top_level_as(&mut self, desc: &BuildTopLevelASDesc) -> Result<()> {
        let Some(loader) = &self.ctx.extensions.acceleration_structure else {
            engine_bail!(SOURCE, Configuration => "Acceleration structures are not supported by this device");
        };
        let instances = vk_buffer(&desc.instances)?;
        let destination = vk_buffer(&desc.destination)?;
        let scratch = vk_buffer(&desc.scratch)?;
        let Some(structure) = destination.acceleration_structure else {
            engine_bail!(SOURCE, InvalidResource =>
                "Buffer '{}' is not an acceleration structure", destination.desc().debug_name);
        };

        let geometry = top_level_geometry(instances.device_address());
        let geometries = [geometry];
        let mode = if desc.update {
            vk::BuildAccelerationStructureModeKHR::UPDATE
        } else {
            vk::BuildAccelerationStructureModeKHR::BUILD
        };
        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::TOP_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE
                | vk::BuildAccelerationStructureFlagsKHR::ALLOW_UPDATE)
            .mode(mode)
            .dst_acceleration_structure(structure)
            .geometries(&geometries)
            .scratch_data(vk::DeviceOrHostAddressKHR { device_address: scratch.device_address() });
        if desc.update {
            build_info = build_info.src_acceleration_structure(structure);
        }
        let ranges = [vk::AccelerationStructureBuildRangeInfoKHR {
            primitive_count: desc.num_instances,
            primitive_offset: 0,
            first_vertex: 0,
            transform_offset: 0,
        }];
        unsafe {
            loader.cmd_build_acceleration_structures(self.command_buffer, &[build_info], &[&ranges[..]]);
        }
        Ok(())
    }

    fn build_bottom_level_as(&mut self, desc: &BuildBottomLevelASDesc) -> Result<()> {
        let Some(loader) = &self.ctx.extensions.acceleration_structure else {
            engine_bail!(SOURCE, Configuration => "Acceleration structures are not supported by this device");
        };
        let destination = vk_buffer(&desc.destination)?;
        let scratch = vk_buffer(&desc.scratch)?;
        let Some(structure) = destination.acceleration_structure else {
            engine_bail!(SOURCE, InvalidResource =>
                "Buffer '{}' is not an acceleration structure", destination.desc().debug_name);
        };

        let (geometries, ranges) = bottom_level_geometries(&desc.geometries)?;

        let build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .dst_acceleration_structure(structure)
            .geometries(&geometries)
            .scratch_data(vk::DeviceOrHostAddressKHR { device_address: scratch.device_address() });
        unsafe {
            loader.cmd_build_acceleration_structures(self.command_buffer, &[build_info], &[&ranges[..]]);
        }
        Ok(())
    }

    fn queue_wait(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()> {
        self.pending_waits.push(vk_semaphore(semaphore)?);
        Ok(())
    }

    fn queue_submit(&mut self) -> Result<()> {
        let command_buffers = [self.command_buffer];
        self.submit(&command_buffers, &[], vk::Fence::null())
    }

    fn queue_signal(&mut self, semaphore: &Arc<dyn Semaphore>) -> Result<()> {
        // Empty submission: signals once everything before it on the queue completes
        let semaphore = vk_semaphore(semaphore)?;
        self.submit(&[], &[semaphore], vk::Fence::null())
    }

    fn queue_signal_fence(&mut self, fence: &Arc<dyn Fence>) -> Result<()> {
        let Some(fence) = fence.as_any().downcast_ref::<VulkanFence>() else {
            engine_bail!(SOURCE, InvalidResource => "Fence was not created by a Vulkan device");
        };
        self.submit(&[], &[], fence.fence())
    }

    fn present(&mut self, desc: &PresentDesc) -> Result<()> {
        let Some(loader) = &self.ctx.extensions.swapchain else {
            engine_bail!(SOURCE, Configuration => "VK_KHR_swapchain is not enabled on this device");
        };
        let Some(swap_chain) = desc.swap_chain.as_any().downcast_ref::<VulkanSwapChain>() else {
            engine_bail!(SOURCE, InvalidResource => "Swap chain is not a Vulkan swap chain");
        };
        let wait_semaphores = desc.wait_semaphores.iter()
            .map(vk_semaphore)
            .collect::<Result<Vec<_>>>()?;
        let swapchains = [swap_chain.swapchain()];
        let image_indices = [desc.image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let ctx = &self.ctx;
        let result = self.queue.with(|queue| unsafe { loader.queue_present(queue, &present_info) })?;
        match result {
            Ok(false) => Ok(()),
            Ok(true) => {
                engine_warn!(SOURCE, "Swap chain is suboptimal for the surface");
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                dz_rhi::engine_bail_warn!(SOURCE, "Swap chain is out of date; recreate it before presenting again");
            }
            Err(e) => Err(ctx.check(e, "present")),
        }
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees the command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
