/// Acceleration structure helpers
///
/// Geometry translation shared by builds and size queries, the native
/// top-level instance record, and shader binding table packing.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use dz_rhi::dz::command::AccelerationStructureGeometry;
use dz_rhi::dz::Result;
use dz_rhi::engine_bail;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_conversions::{format_to_vk, index_type_to_vk};

/// `VkAccelerationStructureInstanceKHR`, as read by top-level builds
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AccelerationStructureInstance {
    /// Row-major 3x4 object-to-world transform
    pub transform: [f32; 12],
    /// Custom index in the low 24 bits, visibility mask in the high 8
    pub instance_custom_index_and_mask: u32,
    /// Hit group offset in the low 24 bits, `VkGeometryInstanceFlagsKHR` in the high 8
    pub sbt_offset_and_flags: u32,
    /// Device address of the bottom-level structure
    pub acceleration_structure_reference: u64,
}

impl AccelerationStructureInstance {
    pub const IDENTITY: [f32; 12] = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
    ];

    pub fn new(bottom_level: &VulkanBuffer, transform: [f32; 12], custom_index: u32, mask: u8) -> Result<Self> {
        let Some(reference) = bottom_level.acceleration_structure_address() else {
            engine_bail!("dz::vulkan::AccelerationStructure", InvalidResource =>
                "Instance target is not an acceleration structure buffer");
        };
        Ok(Self {
            transform,
            instance_custom_index_and_mask: (custom_index & 0x00FF_FFFF) | ((mask as u32) << 24),
            sbt_offset_and_flags: vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() << 24,
            acceleration_structure_reference: reference,
        })
    }

    pub fn with_hit_group_offset(mut self, offset: u32) -> Self {
        self.sbt_offset_and_flags = (self.sbt_offset_and_flags & 0xFF00_0000) | (offset & 0x00FF_FFFF);
        self
    }
}

/// Bytes uploaded to the instance buffer of a top-level build
pub fn instance_bytes(instances: &[AccelerationStructureInstance]) -> &[u8] {
    bytemuck::cast_slice(instances)
}

fn geometry_buffer(buffer: &std::sync::Arc<dyn dz_rhi::dz::BufferResource>) -> Result<&VulkanBuffer> {
    match buffer.as_any().downcast_ref::<VulkanBuffer>() {
        Some(buffer) => Ok(buffer),
        None => engine_bail!("dz::vulkan::AccelerationStructure", InvalidResource =>
            "Geometry buffer '{}' was not created by a Vulkan device", buffer.desc().debug_name),
    }
}

fn geometry_flags(opaque: bool) -> vk::GeometryFlagsKHR {
    if opaque { vk::GeometryFlagsKHR::OPAQUE } else { vk::GeometryFlagsKHR::empty() }
}

/// Native geometries and build ranges of a bottom-level structure
pub fn bottom_level_geometries(
    geometries: &[AccelerationStructureGeometry],
) -> Result<(Vec<vk::AccelerationStructureGeometryKHR<'static>>, Vec<vk::AccelerationStructureBuildRangeInfoKHR>)> {
    let mut native = Vec::with_capacity(geometries.len());
    let mut ranges = Vec::with_capacity(geometries.len());

    for geometry in geometries {
        let (geometry, primitive_count) = match geometry {
            AccelerationStructureGeometry::Triangles {
                vertex_buffer, vertex_offset, vertex_count, vertex_stride, vertex_format,
                index_buffer, index_offset, index_count, index_type, opaque,
            } => {
                let vertices = geometry_buffer(vertex_buffer)?;
                let mut triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::default()
                    .vertex_format(format_to_vk(*vertex_format))
                    .vertex_data(vk::DeviceOrHostAddressConstKHR {
                        device_address: vertices.device_address() + vertex_offset,
                    })
                    .vertex_stride(*vertex_stride as u64)
                    .max_vertex(vertex_count.saturating_sub(1))
                    .index_type(vk::IndexType::NONE_KHR);
                let primitive_count = match index_buffer {
                    Some(index_buffer) => {
                        let indices = geometry_buffer(index_buffer)?;
                        triangles = triangles
                            .index_type(index_type_to_vk(*index_type))
                            .index_data(vk::DeviceOrHostAddressConstKHR {
                                device_address: indices.device_address() + index_offset,
                            });
                        index_count / 3
                    }
                    None => vertex_count / 3,
                };
                let geometry = vk::AccelerationStructureGeometryKHR::default()
                    .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
                    .flags(geometry_flags(*opaque))
                    .geometry(vk::AccelerationStructureGeometryDataKHR { triangles });
                (geometry, primitive_count)
            }
            AccelerationStructureGeometry::Aabbs { buffer, offset, count, stride, opaque } => {
                let boxes = geometry_buffer(buffer)?;
                let aabbs = vk::AccelerationStructureGeometryAabbsDataKHR::default()
                    .data(vk::DeviceOrHostAddressConstKHR { device_address: boxes.device_address() + offset })
                    .stride(*stride as u64);
                let geometry = vk::AccelerationStructureGeometryKHR::default()
                    .geometry_type(vk::GeometryTypeKHR::AABBS)
                    .flags(geometry_flags(*opaque))
                    .geometry(vk::AccelerationStructureGeometryDataKHR { aabbs });
                (geometry, *count)
            }
        };
        native.push(geometry);
        ranges.push(vk::AccelerationStructureBuildRangeInfoKHR {
            primitive_count,
            primitive_offset: 0,
            first_vertex: 0,
            transform_offset: 0,
        });
    }
    Ok((native, ranges))
}

/// Instance geometry of a top-level structure reading `instances_address`
pub fn top_level_geometry(instances_address: u64) -> vk::AccelerationStructureGeometryKHR<'static> {
    vk::AccelerationStructureGeometryKHR::default()
        .geometry_type(vk::GeometryTypeKHR::INSTANCES)
        .geometry(vk::AccelerationStructureGeometryDataKHR {
            instances: vk::AccelerationStructureGeometryInstancesDataKHR::default()
                .array_of_pointers(false)
                .data(vk::DeviceOrHostAddressConstKHR { device_address: instances_address }),
        })
}

/// Memory a build needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelerationStructureSizes {
    pub structure_bytes: u64,
    pub build_scratch_bytes: u64,
    pub update_scratch_bytes: u64,
}

impl From<vk::AccelerationStructureBuildSizesInfoKHR<'_>> for AccelerationStructureSizes {
    fn from(sizes: vk::AccelerationStructureBuildSizesInfoKHR<'_>) -> Self {
        Self {
            structure_bytes: sizes.acceleration_structure_size,
            build_scratch_bytes: sizes.build_scratch_size,
            update_scratch_bytes: sizes.update_scratch_size,
        }
    }
}

/// Pack shader group handles into records of `record_stride` bytes
///
/// Each record starts with the handle; `record_stride` must be at least the
/// handle size. Handles are taken in the order given.
pub fn pack_shader_records(handles: &[&[u8]], record_stride: usize) -> Result<Vec<u8>> {
    let mut table = vec![0u8; handles.len() * record_stride];
    for (index, handle) in handles.iter().enumerate() {
        if handle.len() > record_stride {
            engine_bail!("dz::vulkan::AccelerationStructure", Configuration =>
                "Shader record stride {} is smaller than the {}-byte group handle", record_stride, handle.len());
        }
        let start = index * record_stride;
        table[start..start + handle.len()].copy_from_slice(handle);
    }
    Ok(table)
}

/// Round `value` up to a power-of-two `alignment`
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
#[path = "vulkan_acceleration_structure_tests.rs"]
mod tests;
