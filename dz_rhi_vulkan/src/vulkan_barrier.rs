/// Vulkan barrier strategies
///
/// Both strategies turn a [`BarrierPlan`] into owned Vulkan barrier structs.
/// `LegacyVulkanBarriers` accumulates one source and one destination stage
/// mask for the whole batch (`vkCmdPipelineBarrier`); `Synchronization2Barriers`
/// scopes stages per barrier (`vkCmdPipelineBarrier2`).

use ash::vk;
use ash::vk::Handle;
use dz_rhi::dz::barrier::{
    BarrierPlan, BarrierStrategy, BufferBarrierPlan, MemoryBarrierPlan, TextureBarrierPlan, TransferHalf,
};
use dz_rhi::dz::device::DeviceCapabilities;
use dz_rhi::dz::{QueueType, ResourceUsage, Result, RhiConfiguration};

use crate::vulkan_conversions::aspect_mask;

// ============================================================================
// Device facts the translation depends on
// ============================================================================

/// Queue family index of every RHI queue type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub compute: u32,
    pub copy: u32,
}

impl QueueFamilies {
    /// Every queue type on one family
    pub fn single(family: u32) -> Self {
        Self { graphics: family, compute: family, copy: family }
    }

    pub fn family(&self, queue: QueueType) -> u32 {
        match queue {
            QueueType::Graphics => self.graphics,
            QueueType::Compute | QueueType::RayTracing => self.compute,
            QueueType::Copy => self.copy,
        }
    }
}

/// Optional pipeline stages enabled on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStageSupport {
    pub geometry_shaders: bool,
    pub tessellation: bool,
    pub ray_tracing: bool,
}

// ============================================================================
// Usage translation
// ============================================================================

const SHADER_ACCESS: vk::AccessFlags = vk::AccessFlags::from_raw(
    vk::AccessFlags::UNIFORM_READ.as_raw() | vk::AccessFlags::SHADER_READ.as_raw() | vk::AccessFlags::SHADER_WRITE.as_raw(),
);
const VERTEX_INPUT_ACCESS: vk::AccessFlags = vk::AccessFlags::from_raw(
    vk::AccessFlags::INDEX_READ.as_raw() | vk::AccessFlags::VERTEX_ATTRIBUTE_READ.as_raw(),
);
const COLOR_ACCESS: vk::AccessFlags = vk::AccessFlags::from_raw(
    vk::AccessFlags::COLOR_ATTACHMENT_READ.as_raw() | vk::AccessFlags::COLOR_ATTACHMENT_WRITE.as_raw(),
);
const DEPTH_ACCESS: vk::AccessFlags = vk::AccessFlags::from_raw(
    vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ.as_raw() | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw(),
);

/// Memory access a usage performs on `queue`
pub fn access_flags(usage: ResourceUsage, queue: QueueType) -> vk::AccessFlags {
    let usage = usage.normalized();
    if usage == ResourceUsage::GENERIC_READ {
        let mut access = vk::AccessFlags::UNIFORM_READ
            | vk::AccessFlags::INDEX_READ
            | vk::AccessFlags::SHADER_READ
            | vk::AccessFlags::INDIRECT_COMMAND_READ
            | vk::AccessFlags::TRANSFER_READ;
        if queue == QueueType::Graphics {
            access |= vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
        }
        return access;
    }

    let mut access = vk::AccessFlags::empty();
    if usage.contains(ResourceUsage::COPY_SRC) {
        access |= vk::AccessFlags::TRANSFER_READ;
    }
    if usage.contains(ResourceUsage::COPY_DST) {
        access |= vk::AccessFlags::TRANSFER_WRITE;
    }
    if usage.contains(ResourceUsage::VERTEX_AND_CONSTANT_BUFFER) {
        access |= vk::AccessFlags::UNIFORM_READ;
        if queue == QueueType::Graphics {
            access |= vk::AccessFlags::VERTEX_ATTRIBUTE_READ;
        }
    }
    if usage.contains(ResourceUsage::INDEX_BUFFER) {
        access |= vk::AccessFlags::INDEX_READ;
    }
    if usage.contains(ResourceUsage::UNORDERED_ACCESS) {
        access |= vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE;
    }
    if usage.contains(ResourceUsage::INDIRECT_ARGUMENT) {
        access |= vk::AccessFlags::INDIRECT_COMMAND_READ;
    }
    if usage.contains(ResourceUsage::RENDER_TARGET) {
        access |= COLOR_ACCESS;
    }
    if usage.contains(ResourceUsage::DEPTH_WRITE) {
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if usage.contains(ResourceUsage::DEPTH_READ) {
        access |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
    }
    if usage.intersects(ResourceUsage::SHADER_RESOURCE | ResourceUsage::PIXEL_SHADER_RESOURCE) {
        access |= vk::AccessFlags::SHADER_READ;
    }
    if usage.contains(ResourceUsage::PRESENT) {
        access |= vk::AccessFlags::MEMORY_READ;
    }
    if usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_READ) {
        access |= vk::AccessFlags::ACCELERATION_STRUCTURE_READ_KHR;
    }
    if usage.contains(ResourceUsage::ACCELERATION_STRUCTURE_WRITE) {
        access |= vk::AccessFlags::ACCELERATION_STRUCTURE_WRITE_KHR;
    }
    access
}

/// Image layout of a texture in `usage`; the first matching bit wins
pub fn image_layout(usage: ResourceUsage) -> vk::ImageLayout {
    let usage = usage.normalized();
    const PRIORITY: [(ResourceUsage, vk::ImageLayout); 10] = [
        (ResourceUsage::COPY_SRC, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
        (ResourceUsage::COPY_DST, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        (ResourceUsage::RENDER_TARGET, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        (ResourceUsage::DEPTH_WRITE, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        (ResourceUsage::DEPTH_READ, vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL),
        (ResourceUsage::UNORDERED_ACCESS, vk::ImageLayout::GENERAL),
        (ResourceUsage::SHADER_RESOURCE, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (ResourceUsage::PIXEL_SHADER_RESOURCE, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (ResourceUsage::PRESENT, vk::ImageLayout::PRESENT_SRC_KHR),
        (ResourceUsage::COMMON, vk::ImageLayout::GENERAL),
    ];
    for (bit, layout) in PRIORITY {
        if usage.contains(bit) {
            return layout;
        }
    }
    if usage == ResourceUsage::GENERIC_READ {
        return vk::ImageLayout::GENERAL;
    }
    vk::ImageLayout::UNDEFINED
}

/// Pipeline stages that perform `access` on `queue`
pub fn pipeline_stage_flags(
    support: PipelineStageSupport,
    queue: QueueType,
    access: vk::AccessFlags,
) -> vk::PipelineStageFlags {
    let mut flags = vk::PipelineStageFlags::empty();

    match queue {
        QueueType::Graphics => {
            if access.intersects(VERTEX_INPUT_ACCESS) {
                flags |= vk::PipelineStageFlags::VERTEX_INPUT;
            }
            if access.intersects(SHADER_ACCESS) {
                flags |= vk::PipelineStageFlags::VERTEX_SHADER
                    | vk::PipelineStageFlags::FRAGMENT_SHADER
                    | vk::PipelineStageFlags::COMPUTE_SHADER;
                if support.geometry_shaders {
                    flags |= vk::PipelineStageFlags::GEOMETRY_SHADER;
                }
                if support.tessellation {
                    flags |= vk::PipelineStageFlags::TESSELLATION_CONTROL_SHADER
                        | vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER;
                }
                if support.ray_tracing {
                    flags |= vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR;
                }
            }
            if access.intersects(COLOR_ACCESS) {
                flags |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
            }
            if access.intersects(DEPTH_ACCESS) {
                flags |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
            }
        }
        QueueType::Compute | QueueType::RayTracing => {
            // Graphics-only access on a compute queue cannot be scoped
            if access.intersects(VERTEX_INPUT_ACCESS | COLOR_ACCESS | DEPTH_ACCESS) {
                return vk::PipelineStageFlags::ALL_COMMANDS;
            }
            if access.intersects(SHADER_ACCESS) {
                flags |= vk::PipelineStageFlags::COMPUTE_SHADER;
            }
            if support.ray_tracing {
                if access.contains(vk::AccessFlags::ACCELERATION_STRUCTURE_READ_KHR) {
                    flags |= vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR
                        | vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_KHR;
                }
                if access.contains(vk::AccessFlags::ACCELERATION_STRUCTURE_WRITE_KHR) {
                    flags |= vk::PipelineStageFlags::ACCELERATION_STRUCTURE_BUILD_KHR;
                }
                if access.contains(vk::AccessFlags::SHADER_READ) {
                    flags |= vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR;
                }
            }
        }
        QueueType::Copy => return vk::PipelineStageFlags::ALL_COMMANDS,
    }

    if access.contains(vk::AccessFlags::INDIRECT_COMMAND_READ) {
        flags |= vk::PipelineStageFlags::DRAW_INDIRECT;
    }
    if access.intersects(vk::AccessFlags::TRANSFER_READ | vk::AccessFlags::TRANSFER_WRITE) {
        flags |= vk::PipelineStageFlags::TRANSFER;
    }
    if access.intersects(vk::AccessFlags::HOST_READ | vk::AccessFlags::HOST_WRITE) {
        flags |= vk::PipelineStageFlags::HOST;
    }

    if flags.is_empty() {
        flags = match queue {
            QueueType::Graphics => vk::PipelineStageFlags::TOP_OF_PIPE,
            QueueType::Compute | QueueType::RayTracing if support.ray_tracing => {
                vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR
            }
            QueueType::Compute | QueueType::RayTracing => vk::PipelineStageFlags::COMPUTE_SHADER,
            QueueType::Copy => vk::PipelineStageFlags::TRANSFER,
        };
    }
    flags
}

fn is_uav_hazard(old_state: ResourceUsage, new_state: ResourceUsage) -> bool {
    old_state.contains(ResourceUsage::UNORDERED_ACCESS) && new_state.contains(ResourceUsage::UNORDERED_ACCESS)
}

/// Source and destination access of one barrier
fn barrier_access(old_state: ResourceUsage, new_state: ResourceUsage, queue: QueueType) -> (vk::AccessFlags, vk::AccessFlags) {
    if is_uav_hazard(old_state, new_state) {
        return (
            vk::AccessFlags::SHADER_WRITE,
            vk::AccessFlags::SHADER_WRITE | vk::AccessFlags::SHADER_READ,
        );
    }
    (access_flags(old_state, queue), access_flags(new_state, queue))
}

// ============================================================================
// Texture barrier fields shared by both strategies
// ============================================================================

struct ImageBarrierFields {
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    src_family: u32,
    dst_family: u32,
}

fn image_barrier_fields(texture: &TextureBarrierPlan, queue: QueueType, families: &QueueFamilies) -> ImageBarrierFields {
    let desc = texture.resource.desc();
    let (mut src_access, mut dst_access) = barrier_access(texture.old_state, texture.new_state, queue);
    let (old_layout, new_layout) = if is_uav_hazard(texture.old_state, texture.new_state) {
        (vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL)
    } else {
        (image_layout(texture.old_state), image_layout(texture.new_state))
    };

    let range = match texture.subresource {
        Some(subresource) => vk::ImageSubresourceRange {
            aspect_mask: aspect_mask(desc.format),
            base_mip_level: subresource.mip_level,
            level_count: 1,
            base_array_layer: subresource.array_layer,
            layer_count: 1,
        },
        None => vk::ImageSubresourceRange {
            aspect_mask: aspect_mask(desc.format),
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        },
    };

    // Ownership moves only when there is content to keep
    let (mut src_family, mut dst_family) = (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED);
    if let Some(transfer) = texture.transfer {
        if !texture.old_state.is_undefined() {
            src_family = families.family(transfer.source_queue);
            dst_family = families.family(transfer.destination_queue);
            match transfer.half {
                TransferHalf::Release => dst_access = vk::AccessFlags::empty(),
                TransferHalf::Acquire => src_access = vk::AccessFlags::empty(),
            }
        }
    }

    ImageBarrierFields {
        image: vk::Image::from_raw(texture.resource.native_handle()),
        range,
        src_access,
        dst_access,
        old_layout,
        new_layout,
        src_family,
        dst_family,
    }
}

fn buffer_handle(buffer: &BufferBarrierPlan) -> vk::Buffer {
    vk::Buffer::from_raw(buffer.resource.native_handle())
}

fn memory_access(memory: &MemoryBarrierPlan, queue: QueueType) -> (vk::AccessFlags, vk::AccessFlags) {
    barrier_access(memory.old_state, memory.new_state, queue)
}

// ============================================================================
// Output
// ============================================================================

/// One `vkCmdPipelineBarrier` call
#[derive(Debug, Clone, Default)]
pub struct LegacyBarrierBatch {
    pub src_stage_mask: vk::PipelineStageFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
    pub memory: Vec<vk::MemoryBarrier<'static>>,
    pub buffers: Vec<vk::BufferMemoryBarrier<'static>>,
    pub images: Vec<vk::ImageMemoryBarrier<'static>>,
}

/// One `vkCmdPipelineBarrier2` call
#[derive(Debug, Clone, Default)]
pub struct Sync2BarrierBatch {
    pub memory: Vec<vk::MemoryBarrier2<'static>>,
    pub buffers: Vec<vk::BufferMemoryBarrier2<'static>>,
    pub images: Vec<vk::ImageMemoryBarrier2<'static>>,
}

#[derive(Debug, Clone)]
pub enum VulkanBarrierBatch {
    Legacy(LegacyBarrierBatch),
    Sync2(Sync2BarrierBatch),
}

impl VulkanBarrierBatch {
    pub fn is_empty(&self) -> bool {
        match self {
            VulkanBarrierBatch::Legacy(batch) => {
                batch.memory.is_empty() && batch.buffers.is_empty() && batch.images.is_empty()
            }
            VulkanBarrierBatch::Sync2(batch) => {
                batch.memory.is_empty() && batch.buffers.is_empty() && batch.images.is_empty()
            }
        }
    }

    /// Record the batch into `command_buffer`
    ///
    /// # Safety
    ///
    /// `command_buffer` must be recording and every handle in the batch alive.
    pub unsafe fn record(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        if self.is_empty() {
            return;
        }
        match self {
            VulkanBarrierBatch::Legacy(batch) => device.cmd_pipeline_barrier(
                command_buffer,
                batch.src_stage_mask,
                batch.dst_stage_mask,
                vk::DependencyFlags::empty(),
                &batch.memory,
                &batch.buffers,
                &batch.images,
            ),
            VulkanBarrierBatch::Sync2(batch) => {
                let dependency = vk::DependencyInfo::default()
                    .memory_barriers(&batch.memory)
                    .buffer_memory_barriers(&batch.buffers)
                    .image_memory_barriers(&batch.images);
                device.cmd_pipeline_barrier2(command_buffer, &dependency);
            }
        }
    }
}

// ============================================================================
// Legacy: one stage scope per batch
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct LegacyVulkanBarriers {
    families: QueueFamilies,
    stages: PipelineStageSupport,
}

impl LegacyVulkanBarriers {
    pub fn new(families: QueueFamilies, stages: PipelineStageSupport) -> Self {
        Self { families, stages }
    }
}

impl BarrierStrategy for LegacyVulkanBarriers {
    type Output = VulkanBarrierBatch;

    fn name(&self) -> &'static str {
        "vulkan-legacy"
    }

    fn supports_subresource_barriers(&self) -> bool {
        true
    }

    fn translate(&self, plan: &BarrierPlan, queue: QueueType) -> Result<VulkanBarrierBatch> {
        let mut batch = LegacyBarrierBatch::default();
        let mut src_access = vk::AccessFlags::empty();
        let mut dst_access = vk::AccessFlags::empty();

        for texture in &plan.textures {
            let fields = image_barrier_fields(texture, queue, &self.families);
            src_access |= fields.src_access;
            dst_access |= fields.dst_access;
            batch.images.push(
                vk::ImageMemoryBarrier::default()
                    .image(fields.image)
                    .subresource_range(fields.range)
                    .src_access_mask(fields.src_access)
                    .dst_access_mask(fields.dst_access)
                    .old_layout(fields.old_layout)
                    .new_layout(fields.new_layout)
                    .src_queue_family_index(fields.src_family)
                    .dst_queue_family_index(fields.dst_family),
            );
        }

        for buffer in &plan.buffers {
            let (src, dst) = barrier_access(buffer.old_state, buffer.new_state, queue);
            src_access |= src;
            dst_access |= dst;
            batch.buffers.push(
                vk::BufferMemoryBarrier::default()
                    .buffer(buffer_handle(buffer))
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
                    .src_access_mask(src)
                    .dst_access_mask(dst)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED),
            );
        }

        for memory in &plan.memory {
            let (src, dst) = memory_access(memory, queue);
            src_access |= src;
            dst_access |= dst;
            batch.memory.push(vk::MemoryBarrier::default().src_access_mask(src).dst_access_mask(dst));
        }

        batch.src_stage_mask = pipeline_stage_flags(self.stages, queue, src_access);
        batch.dst_stage_mask = pipeline_stage_flags(self.stages, queue, dst_access);
        Ok(VulkanBarrierBatch::Legacy(batch))
    }
}

// ============================================================================
// Synchronization2: stage scope per barrier
// ============================================================================

fn stages2(support: PipelineStageSupport, queue: QueueType, access: vk::AccessFlags) -> vk::PipelineStageFlags2 {
    vk::PipelineStageFlags2::from_raw(u64::from(pipeline_stage_flags(support, queue, access).as_raw()))
}

fn access2(access: vk::AccessFlags) -> vk::AccessFlags2 {
    vk::AccessFlags2::from_raw(u64::from(access.as_raw()))
}

#[derive(Debug, Clone, Copy)]
pub struct Synchronization2Barriers {
    families: QueueFamilies,
    stages: PipelineStageSupport,
}

impl Synchronization2Barriers {
    pub fn new(families: QueueFamilies, stages: PipelineStageSupport) -> Self {
        Self { families, stages }
    }
}

impl BarrierStrategy for Synchronization2Barriers {
    type Output = VulkanBarrierBatch;

    fn name(&self) -> &'static str {
        "vulkan-synchronization2"
    }

    fn supports_subresource_barriers(&self) -> bool {
        true
    }

    fn translate(&self, plan: &BarrierPlan, queue: QueueType) -> Result<VulkanBarrierBatch> {
        let mut batch = Sync2BarrierBatch::default();

        for texture in &plan.textures {
            let fields = image_barrier_fields(texture, queue, &self.families);
            batch.images.push(
                vk::ImageMemoryBarrier2::default()
                    .image(fields.image)
                    .subresource_range(fields.range)
                    .src_stage_mask(stages2(self.stages, queue, fields.src_access))
                    .dst_stage_mask(stages2(self.stages, queue, fields.dst_access))
                    .src_access_mask(access2(fields.src_access))
                    .dst_access_mask(access2(fields.dst_access))
                    .old_layout(fields.old_layout)
                    .new_layout(fields.new_layout)
                    .src_queue_family_index(fields.src_family)
                    .dst_queue_family_index(fields.dst_family),
            );
        }

        for buffer in &plan.buffers {
            let (src, dst) = barrier_access(buffer.old_state, buffer.new_state, queue);
            batch.buffers.push(
                vk::BufferMemoryBarrier2::default()
                    .buffer(buffer_handle(buffer))
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
                    .src_stage_mask(stages2(self.stages, queue, src))
                    .dst_stage_mask(stages2(self.stages, queue, dst))
                    .src_access_mask(access2(src))
                    .dst_access_mask(access2(dst))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED),
            );
        }

        for memory in &plan.memory {
            let (src, dst) = memory_access(memory, queue);
            batch.memory.push(
                vk::MemoryBarrier2::default()
                    .src_stage_mask(stages2(self.stages, queue, src))
                    .dst_stage_mask(stages2(self.stages, queue, dst))
                    .src_access_mask(access2(src))
                    .dst_access_mask(access2(dst)),
            );
        }

        Ok(VulkanBarrierBatch::Sync2(batch))
    }
}

/// Strategy for a device, decided once from its capabilities
pub fn select_vulkan_barrier_strategy(
    capabilities: &DeviceCapabilities,
    config: &RhiConfiguration,
    families: QueueFamilies,
    stages: PipelineStageSupport,
) -> Box<dyn BarrierStrategy<Output = VulkanBarrierBatch>> {
    if capabilities.enhanced_barriers && config.use_enhanced_barriers {
        Box::new(Synchronization2Barriers::new(families, stages))
    } else {
        Box::new(LegacyVulkanBarriers::new(families, stages))
    }
}

#[cfg(test)]
#[path = "vulkan_barrier_tests.rs"]
mod tests;
