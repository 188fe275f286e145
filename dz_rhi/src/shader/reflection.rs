/// Reflection data extracted from compiled shaders
///
/// `ShaderReflectionData` is what the cache persists next to the bytecode,
/// so every type here is serde-serializable.

use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::types::{Format, ResourceBindingType, ResourceDescriptor, ShaderStages};

/// Scalar kind of a constant-buffer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReflectionFieldType {
    Undefined,
    Bool,
    Int,
    Uint,
    Float,
    Double,
    Struct,
}

/// One flattened constant-buffer field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionField {
    /// Dotted path for nested struct members (`light.color`)
    pub name: String,
    pub field_type: ReflectionFieldType,
    pub num_rows: u32,
    pub num_columns: u32,
    pub num_bytes: u32,
    pub offset: u32,
    /// Element count, 0 when the field is not an array
    pub array_size: u32,
}

/// Unique address of a binding: register space, slot and register class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceSlot {
    pub register_space: u32,
    pub binding: u32,
    pub binding_type: ResourceBindingType,
}

impl std::fmt::Display for ResourceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}, space{}", self.binding_type.register_class(), self.binding, self.register_space)
    }
}

/// A bound resource as seen by the shaders of one program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionBinding {
    pub name: String,
    pub binding: u32,
    pub register_space: u32,
    /// 1 for a single resource, 0 for an unbounded array
    pub array_size: u32,
    pub binding_type: ResourceBindingType,
    /// Descriptor kind a resource needs to fill this slot
    pub descriptor: ResourceDescriptor,
    pub stages: ShaderStages,
    /// Constant-buffer layout (empty for everything else)
    pub fields: Vec<ReflectionField>,
    /// Constant-buffer size in bytes
    pub num_bytes: u32,
}

impl ReflectionBinding {
    pub fn slot(&self) -> ResourceSlot {
        ResourceSlot {
            register_space: self.register_space,
            binding: self.binding,
            binding_type: self.binding_type,
        }
    }

    /// Number of descriptors this binding occupies in a table
    pub fn descriptor_count(&self) -> u32 {
        self.array_size.max(1)
    }
}

/// One vertex-stage input as reflected (before format inference)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInputParameter {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub location: u32,
    /// Width of the component mask (1..=4)
    pub num_components: u32,
}

/// Compute thread-group size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreadGroupInfo {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Everything reflection produces for one compiled stage
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShaderReflectionData {
    pub bindings: Vec<ReflectionBinding>,
    pub inputs: Vec<ShaderInputParameter>,
    pub thread_group: Option<ThreadGroupInfo>,
}

impl ShaderReflectionData {
    /// Serialized form stored in the `.reflection` cache file
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| crate::engine_err!("dz::ShaderReflection",
                "Failed to encode reflection data: {}", e))
    }

    /// Inverse of [`to_blob`](Self::to_blob); trailing bytes are rejected
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let (data, read): (Self, usize) =
            bincode::serde::decode_from_slice(blob, bincode::config::standard())
                .map_err(|e| crate::dz::Error::InvalidResource(
                    format!("Corrupt reflection blob: {}", e)))?;
        if read != blob.len() {
            return Err(crate::dz::Error::InvalidResource(format!(
                "Corrupt reflection blob: {} trailing bytes", blob.len() - read)));
        }
        Ok(data)
    }
}

/// One element of a vertex input layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayoutElementDesc {
    pub semantic: String,
    pub semantic_index: u32,
    pub location: u32,
    pub format: Format,
    /// Byte offset in the interleaved vertex
    pub offset: u32,
}

/// Interleaved single-stream vertex layout
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputLayoutDesc {
    pub elements: Vec<InputLayoutElementDesc>,
    pub stride: u32,
}

/// Semantics the pipeline supplies implicitly (vertex/instance/primitive id,
/// clip and cull distances, render-target and viewport array index)
pub fn is_system_value(semantic: &str) -> bool {
    semantic.get(..3).is_some_and(|prefix| prefix.eq_ignore_ascii_case("SV_"))
}

impl InputLayoutDesc {
    /// Build the layout of a vertex stage's inputs, in location order.
    ///
    /// System values are skipped. Inputs wider than four components cannot
    /// be expressed and are skipped with a warning.
    pub fn from_inputs(inputs: &[ShaderInputParameter]) -> Self {
        let mut sorted: Vec<&ShaderInputParameter> = inputs.iter()
            .filter(|input| !is_system_value(&input.semantic_name))
            .collect();
        sorted.sort_by_key(|input| input.location);

        let mut layout = InputLayoutDesc::default();
        for input in sorted {
            let Some(format) = Format::float_vector(input.num_components) else {
                crate::engine_warn!("dz::ShaderReflection",
                    "Input {}{} has {} components, skipped",
                    input.semantic_name, input.semantic_index, input.num_components);
                continue;
            };
            layout.elements.push(InputLayoutElementDesc {
                semantic: input.semantic_name.clone(),
                semantic_index: input.semantic_index,
                location: input.location,
                format,
                offset: layout.stride,
            });
            layout.stride += format.num_bytes();
        }
        layout
    }
}

/// Split a DXC SPIR-V interface name (`in.var.TEXCOORD1`) into semantic
/// name and index
pub fn parse_semantic(variable_name: &str) -> (String, u32) {
    let name = variable_name
        .strip_prefix("in.var.")
        .unwrap_or(variable_name);
    let digits = name.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    let (semantic, index) = name.split_at(name.len() - digits);
    (semantic.to_string(), index.parse().unwrap_or(0))
}

#[cfg(test)]
#[path = "reflection_tests.rs"]
mod tests;
