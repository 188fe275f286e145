/// Shader reflection
///
/// The shipped reflector reads SPIR-V produced with the DXC register shifts
/// and maps every descriptor back to its HLSL register (class, slot, space).

use crate::error::Result;
use crate::shader::dxc::unshift_binding;
use crate::shader::reflection::{
    parse_semantic, ReflectionBinding, ReflectionField, ReflectionFieldType,
    ShaderInputParameter, ShaderReflectionData, ThreadGroupInfo,
};
use crate::shader::shader_data::TargetIL;
use crate::types::{ResourceBindingType, ResourceDescriptor, ShaderStage};

/// Extracts bindings, inputs and thread-group size from bytecode
pub trait ShaderReflector: Send + Sync {
    /// The only bytecode format `reflect` accepts
    fn reflection_il(&self) -> TargetIL;

    fn reflect(&self, bytecode: &[u8], stage: ShaderStage, entry_point: &str) -> Result<ShaderReflectionData>;
}

/// spirq-based reflector for register-shifted SPIR-V
#[derive(Debug, Default, Clone, Copy)]
pub struct SpirvReflector;

impl ShaderReflector for SpirvReflector {
    fn reflection_il(&self) -> TargetIL {
        TargetIL::Spirv
    }

    fn reflect(&self, bytecode: &[u8], stage: ShaderStage, entry_point: &str) -> Result<ShaderReflectionData> {
        if bytecode.len() % 4 != 0 || bytecode.len() < 20 {
            crate::engine_bail!("dz::ShaderReflector", InvalidResource =>
                "'{}' is not SPIR-V ({} bytes)", entry_point, bytecode.len());
        }
        let words: Vec<u32> = bytemuck::pod_collect_to_vec(bytecode);

        let entry_points = spirq::ReflectConfig::new()
            .spv(words.as_slice())
            .ref_all_rscs(true)
            .reflect()
            .map_err(|e| crate::engine_err!("dz::ShaderReflector",
                "SPIR-V reflection failed for '{}': {:?}", entry_point, e))?;

        let Some(entry) = entry_points.iter()
            .find(|ep| ep.name == entry_point)
            .or_else(|| entry_points.first())
        else {
            crate::engine_bail!("dz::ShaderReflector", InvalidResource =>
                "No entry point in SPIR-V for '{}'", entry_point);
        };

        let mut data = ShaderReflectionData::default();

        for var in entry.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, ty, nbind } => {
                    let (binding_type, binding) = match unshift_binding(desc_bind.bind()) {
                        Some(shifted) => shifted,
                        None => (class_of(desc_ty), desc_bind.bind()),
                    };
                    let descriptor = descriptor_for(binding_type, desc_ty);
                    let fields = if binding_type == ResourceBindingType::ConstantBuffer {
                        flatten_fields(ty)
                    } else {
                        Vec::new()
                    };
                    data.bindings.push(ReflectionBinding {
                        name: name.clone().unwrap_or_default(),
                        binding,
                        register_space: desc_bind.set(),
                        array_size: *nbind,
                        binding_type,
                        descriptor,
                        stages: stage.stages(),
                        fields,
                        num_bytes: ty.nbyte().map(|n| n as u32).unwrap_or(0),
                    });
                }
                spirq::var::Variable::Input { name, location, ty } => {
                    let Some(name) = name.as_deref() else { continue };
                    if name.starts_with("gl_") {
                        continue;
                    }
                    let num_components = match ty {
                        spirq::ty::Type::Scalar(_) => 1,
                        spirq::ty::Type::Vector(v) => v.nscalar,
                        _ => continue,
                    };
                    let (semantic_name, semantic_index) = parse_semantic(name);
                    data.inputs.push(ShaderInputParameter {
                        semantic_name,
                        semantic_index,
                        location: location.loc(),
                        num_components,
                    });
                }
                _ => {}
            }
        }

        data.bindings.sort_by_key(|b| b.slot());
        data.inputs.sort_by_key(|i| i.location);

        if matches!(stage, ShaderStage::Compute | ShaderStage::Mesh | ShaderStage::Task) {
            data.thread_group = local_size(&words);
        }

        Ok(data)
    }
}

/// Register class for bindings that were not shifted
fn class_of(desc_ty: &spirq::ty::DescriptorType) -> ResourceBindingType {
    use spirq::ty::{AccessType, DescriptorType};
    match desc_ty {
        DescriptorType::UniformBuffer() => ResourceBindingType::ConstantBuffer,
        DescriptorType::Sampler() => ResourceBindingType::Sampler,
        DescriptorType::StorageImage(_) | DescriptorType::StorageTexelBuffer(_) => {
            ResourceBindingType::UnorderedAccess
        }
        DescriptorType::StorageBuffer(AccessType::ReadOnly) => ResourceBindingType::ShaderResource,
        DescriptorType::StorageBuffer(_) => ResourceBindingType::UnorderedAccess,
        _ => ResourceBindingType::ShaderResource,
    }
}

/// Descriptor kind a resource needs to fill a reflected slot
fn descriptor_for(binding_type: ResourceBindingType, desc_ty: &spirq::ty::DescriptorType) -> ResourceDescriptor {
    use spirq::ty::DescriptorType;
    match binding_type {
        ResourceBindingType::ConstantBuffer => ResourceDescriptor::UNIFORM_BUFFER,
        ResourceBindingType::Sampler => ResourceDescriptor::SAMPLER,
        ResourceBindingType::UnorderedAccess => match desc_ty {
            DescriptorType::StorageImage(_) => ResourceDescriptor::RW_TEXTURE,
            _ => ResourceDescriptor::RW_BUFFER,
        },
        ResourceBindingType::ShaderResource => match desc_ty {
            DescriptorType::SampledImage() | DescriptorType::CombinedImageSampler() => ResourceDescriptor::TEXTURE,
            DescriptorType::StorageBuffer(_) => ResourceDescriptor::STRUCTURED_BUFFER,
            DescriptorType::AccelStruct() => ResourceDescriptor::ACCELERATION_STRUCTURE,
            _ => ResourceDescriptor::BUFFER,
        },
    }
}

fn scalar_kind(scalar: &spirq::ty::ScalarType) -> ReflectionFieldType {
    use spirq::ty::ScalarType;
    match scalar {
        ScalarType::Float { bits: 64 } => ReflectionFieldType::Double,
        ScalarType::Float { .. } => ReflectionFieldType::Float,
        ScalarType::Integer { is_signed: true, .. } => ReflectionFieldType::Int,
        ScalarType::Integer { is_signed: false, .. } => ReflectionFieldType::Uint,
        ScalarType::Boolean => ReflectionFieldType::Bool,
        ScalarType::Void => ReflectionFieldType::Undefined,
    }
}

/// Flatten a constant-buffer struct into dotted leaf fields
fn flatten_fields(ty: &spirq::ty::Type) -> Vec<ReflectionField> {
    let mut fields = Vec::new();
    if let spirq::ty::Type::Struct(st) = ty {
        for member in &st.members {
            let name = member.name.clone().unwrap_or_default();
            let offset = member.offset.unwrap_or(0) as u32;
            flatten_member(&name, offset, &member.ty, &mut fields);
        }
    }
    fields
}

fn flatten_member(name: &str, offset: u32, ty: &spirq::ty::Type, out: &mut Vec<ReflectionField>) {
    use spirq::ty::Type;
    let num_bytes = ty.nbyte().map(|n| n as u32).unwrap_or(0);
    let leaf = |field_type, num_rows, num_columns, array_size| ReflectionField {
        name: name.to_string(),
        field_type,
        num_rows,
        num_columns,
        num_bytes,
        offset,
        array_size,
    };
    match ty {
        Type::Scalar(s) => out.push(leaf(scalar_kind(s), 1, 1, 0)),
        Type::Vector(v) => out.push(leaf(scalar_kind(&v.scalar_ty), 1, v.nscalar, 0)),
        Type::Matrix(m) => out.push(leaf(scalar_kind(&m.vector_ty.scalar_ty), m.nvector, m.vector_ty.nscalar, 0)),
        Type::Array(a) => {
            let count = a.nelement.unwrap_or(0);
            let (kind, rows, cols) = match &*a.element_ty {
                Type::Scalar(s) => (scalar_kind(s), 1, 1),
                Type::Vector(v) => (scalar_kind(&v.scalar_ty), 1, v.nscalar),
                Type::Matrix(m) => (scalar_kind(&m.vector_ty.scalar_ty), m.nvector, m.vector_ty.nscalar),
                _ => (ReflectionFieldType::Struct, 0, 0),
            };
            out.push(leaf(kind, rows, cols, count));
        }
        Type::Struct(st) => {
            out.push(leaf(ReflectionFieldType::Struct, 0, 0, 0));
            for member in &st.members {
                let child = format!("{}.{}", name, member.name.clone().unwrap_or_default());
                let child_offset = offset + member.offset.unwrap_or(0) as u32;
                flatten_member(&child, child_offset, &member.ty, out);
            }
        }
        _ => out.push(leaf(ReflectionFieldType::Undefined, 0, 0, 0)),
    }
}

const SPIRV_MAGIC: u32 = 0x0723_0203;
const OP_EXECUTION_MODE: u32 = 16;
const EXECUTION_MODE_LOCAL_SIZE: u32 = 17;

/// `OpExecutionMode %entry LocalSize x y z`, read straight from the words
pub(crate) fn local_size(words: &[u32]) -> Option<ThreadGroupInfo> {
    if words.first() != Some(&SPIRV_MAGIC) {
        return None;
    }
    let mut cursor = 5;
    while cursor < words.len() {
        let word_count = (words[cursor] >> 16) as usize;
        let opcode = words[cursor] & 0xffff;
        if word_count == 0 || cursor + word_count > words.len() {
            return None;
        }
        if opcode == OP_EXECUTION_MODE && word_count >= 6 && words[cursor + 2] == EXECUTION_MODE_LOCAL_SIZE {
            return Some(ThreadGroupInfo {
                x: words[cursor + 3],
                y: words[cursor + 4],
                z: words[cursor + 5],
            });
        }
        cursor += word_count;
    }
    None
}

#[cfg(test)]
#[path = "reflector_tests.rs"]
mod tests;
