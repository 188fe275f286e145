/// Bytecode converter backend
///
/// The converter turns DXIL into native bytecode and needs the program's
/// final binding layout as input, because it lays out a top-level argument
/// buffer from it. `ConverterRootSignature` is that layout in converter
/// form; `ConverterDescriptorOffsets` lets bind groups find their entries
/// in the top-level argument buffer afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use serde::{Deserialize, Serialize};
use crate::binding::root_signature::{RootParameter, RootSignatureLayout, StaticSamplerDesc, TableKind};
use crate::device::{CompareOp, Filter, MipmapMode, SamplerAddressMode};
use crate::error::Result;
use crate::shader::reflection::{ReflectionBinding, ResourceSlot};
use crate::shader::shader_data::RayTracingShaderDesc;
use crate::types::{ResourceBindingType, ShaderStage};

// ============================================================================
// Root signature
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConverterRangeType {
    #[serde(rename = "CBV")]
    Cbv,
    #[serde(rename = "SRV")]
    Srv,
    #[serde(rename = "UAV")]
    Uav,
    Sampler,
}

impl From<ResourceBindingType> for ConverterRangeType {
    fn from(binding_type: ResourceBindingType) -> Self {
        match binding_type {
            ResourceBindingType::ConstantBuffer => ConverterRangeType::Cbv,
            ResourceBindingType::ShaderResource => ConverterRangeType::Srv,
            ResourceBindingType::UnorderedAccess => ConverterRangeType::Uav,
            ResourceBindingType::Sampler => ConverterRangeType::Sampler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConverterDescriptorRange {
    pub range_type: ConverterRangeType,
    pub num_descriptors: u32,
    pub base_shader_register: u32,
    pub register_space: u32,
    pub offset_in_descriptors_from_table_start: u32,
}

/// Top-level argument buffer entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ParameterType")]
pub enum ConverterRootParameter {
    #[serde(rename = "32BitConstants", rename_all = "PascalCase")]
    Constants {
        shader_register: u32,
        register_space: u32,
        num_32_bit_values: u32,
    },
    #[serde(rename = "DescriptorTable", rename_all = "PascalCase")]
    DescriptorTable {
        descriptor_ranges: Vec<ConverterDescriptorRange>,
    },
    #[serde(rename = "Descriptor", rename_all = "PascalCase")]
    Descriptor {
        descriptor_type: ConverterRangeType,
        shader_register: u32,
        register_space: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConverterStaticSampler {
    pub filter: String,
    pub address_u: String,
    pub address_v: String,
    pub address_w: String,
    #[serde(rename = "MipLODBias")]
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: String,
    #[serde(rename = "MinLOD")]
    pub min_lod: f32,
    #[serde(rename = "MaxLOD")]
    pub max_lod: f32,
    pub shader_register: u32,
    pub register_space: u32,
}

impl From<&StaticSamplerDesc> for ConverterStaticSampler {
    fn from(desc: &StaticSamplerDesc) -> Self {
        let sampler = &desc.sampler;
        let filter = if sampler.max_anisotropy > 0.0 {
            "Anisotropic".to_string()
        } else {
            let part = |f: Filter| match f {
                Filter::Nearest => "Point",
                Filter::Linear => "Linear",
            };
            let mip = match sampler.mipmap_mode {
                MipmapMode::Nearest => "Point",
                MipmapMode::Linear => "Linear",
            };
            format!("Min{}Mag{}Mip{}", part(sampler.min_filter), part(sampler.mag_filter), mip)
        };
        let address = |mode: SamplerAddressMode| match mode {
            SamplerAddressMode::Repeat => "Wrap",
            SamplerAddressMode::Mirror => "Mirror",
            SamplerAddressMode::ClampToEdge => "Clamp",
            SamplerAddressMode::ClampToBorder => "Border",
        }.to_string();
        let comparison = match sampler.compare_op {
            CompareOp::Never => "Never",
            CompareOp::Less => "Less",
            CompareOp::Equal => "Equal",
            CompareOp::LessOrEqual => "LessEqual",
            CompareOp::Greater => "Greater",
            CompareOp::NotEqual => "NotEqual",
            CompareOp::GreaterOrEqual => "GreaterEqual",
            CompareOp::Always => "Always",
        };
        Self {
            filter,
            address_u: address(sampler.address_mode_u),
            address_v: address(sampler.address_mode_v),
            address_w: address(sampler.address_mode_w),
            mip_lod_bias: sampler.mip_lod_bias,
            max_anisotropy: sampler.max_anisotropy as u32,
            comparison_func: comparison.to_string(),
            min_lod: sampler.min_lod,
            max_lod: sampler.max_lod,
            shader_register: desc.binding,
            register_space: desc.register_space,
        }
    }
}

/// Where one register space landed in the top-level argument buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterDescriptorOffsets {
    pub cbv_srv_uav_offset: Option<u32>,
    pub sampler_offset: Option<u32>,
    /// Entry index of every root constant and root descriptor of the space
    pub root_parameter_index: BTreeMap<ResourceSlot, u32>,
}

/// Binding layout handed to the converter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterRootSignature {
    parameters: Vec<ConverterRootParameter>,
    static_samplers: Vec<ConverterStaticSampler>,
    offsets: BTreeMap<u32, ConverterDescriptorOffsets>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RootSignatureDocument<'a> {
    version: &'static str,
    flags: [&'static str; 2],
    parameters: &'a [ConverterRootParameter],
    static_samplers: &'a [ConverterStaticSampler],
}

impl ConverterRootSignature {
    /// Global signature of a program
    ///
    /// Entries follow the layout's native order: every root constant first,
    /// then per register space the CBV/SRV/UAV table, the sampler table and
    /// the root descriptors.
    pub fn from_layout(layout: &RootSignatureLayout) -> Self {
        let mut signature = Self {
            static_samplers: layout.static_samplers().iter().map(ConverterStaticSampler::from).collect(),
            ..Default::default()
        };

        for parameter in layout.parameters() {
            let entry = signature.parameters.len() as u32;
            match parameter {
                RootParameter::Constants { binding, register_space, num_32bit_values, .. } => {
                    signature.offsets_mut(*register_space).root_parameter_index.insert(
                        ResourceSlot {
                            register_space: *register_space,
                            binding: *binding,
                            binding_type: ResourceBindingType::ConstantBuffer,
                        },
                        entry,
                    );
                    signature.parameters.push(ConverterRootParameter::Constants {
                        shader_register: *binding,
                        register_space: *register_space,
                        num_32_bit_values: *num_32bit_values,
                    });
                }
                RootParameter::Table { kind, register_space, ranges, .. } => {
                    let offsets = signature.offsets_mut(*register_space);
                    match kind {
                        TableKind::CbvSrvUav => offsets.cbv_srv_uav_offset = Some(entry),
                        TableKind::Sampler => offsets.sampler_offset = Some(entry),
                    }
                    signature.parameters.push(ConverterRootParameter::DescriptorTable {
                        descriptor_ranges: ranges.iter().map(|range| ConverterDescriptorRange {
                            range_type: range.binding_type.into(),
                            num_descriptors: range.num_descriptors,
                            base_shader_register: range.base_register,
                            register_space: range.register_space,
                            offset_in_descriptors_from_table_start: range.offset_in_table,
                        }).collect(),
                    });
                }
                RootParameter::Descriptor { binding_type, binding, register_space, .. } => {
                    signature.offsets_mut(*register_space).root_parameter_index.insert(
                        ResourceSlot {
                            register_space: *register_space,
                            binding: *binding,
                            binding_type: *binding_type,
                        },
                        entry,
                    );
                    signature.parameters.push(ConverterRootParameter::Descriptor {
                        descriptor_type: (*binding_type).into(),
                        shader_register: *binding,
                        register_space: *register_space,
                    });
                }
            }
        }

        signature
    }

    /// Shader-record signature of one ray-tracing stage
    ///
    /// Local constant buffers become inline constants; everything else goes
    /// to per-space tables.
    pub fn local(bindings: &[ReflectionBinding]) -> Self {
        let mut signature = Self::default();
        let mut sorted: Vec<&ReflectionBinding> = bindings.iter().collect();
        sorted.sort_by_key(|b| b.slot());

        for binding in sorted.iter().filter(|b| b.binding_type == ResourceBindingType::ConstantBuffer) {
            let entry = signature.parameters.len() as u32;
            signature.offsets_mut(binding.register_space).root_parameter_index.insert(binding.slot(), entry);
            signature.parameters.push(ConverterRootParameter::Constants {
                shader_register: binding.binding,
                register_space: binding.register_space,
                num_32_bit_values: binding.num_bytes.div_ceil(4),
            });
        }

        let mut tables: BTreeMap<(u32, TableKind), Vec<&ReflectionBinding>> = BTreeMap::new();
        for binding in sorted.iter().filter(|b| b.binding_type != ResourceBindingType::ConstantBuffer) {
            tables.entry((binding.register_space, TableKind::of(binding.binding_type)))
                .or_default()
                .push(binding);
        }
        for ((register_space, kind), entries) in tables {
            let entry = signature.parameters.len() as u32;
            let offsets = signature.offsets_mut(register_space);
            match kind {
                TableKind::CbvSrvUav => offsets.cbv_srv_uav_offset = Some(entry),
                TableKind::Sampler => offsets.sampler_offset = Some(entry),
            }
            let mut offset = 0;
            let descriptor_ranges = entries.into_iter().map(|binding| {
                let range = ConverterDescriptorRange {
                    range_type: binding.binding_type.into(),
                    num_descriptors: binding.descriptor_count(),
                    base_shader_register: binding.binding,
                    register_space,
                    offset_in_descriptors_from_table_start: offset,
                };
                offset += binding.descriptor_count();
                range
            }).collect();
            signature.parameters.push(ConverterRootParameter::DescriptorTable { descriptor_ranges });
        }

        signature
    }

    fn offsets_mut(&mut self, register_space: u32) -> &mut ConverterDescriptorOffsets {
        self.offsets.entry(register_space).or_default()
    }

    pub fn parameters(&self) -> &[ConverterRootParameter] {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.static_samplers.is_empty()
    }

    pub fn offsets(&self, register_space: u32) -> Option<&ConverterDescriptorOffsets> {
        self.offsets.get(&register_space)
    }

    pub fn register_spaces(&self) -> impl Iterator<Item = u32> + '_ {
        self.offsets.keys().copied()
    }

    /// Root signature document consumed by the converter executable
    pub fn to_json(&self) -> Result<String> {
        let document = RootSignatureDocument {
            version: "1.1",
            flags: ["CBVSRVUAVHeapDirectlyIndexed", "SamplerHeapDirectlyIndexed"],
            parameters: &self.parameters,
            static_samplers: &self.static_samplers,
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| crate::engine_err!("dz::ShaderConverter",
                "Failed to serialize root signature: {}", e))
    }
}

// ============================================================================
// Converter
// ============================================================================

/// One DXIL module to convert
#[derive(Debug, Clone)]
pub struct ConversionRequest<'a> {
    pub dxil: &'a [u8],
    pub stage: ShaderStage,
    pub entry_point: &'a str,
    pub root_signature: &'a ConverterRootSignature,
    pub local_root_signature: Option<&'a ConverterRootSignature>,
    pub ray_tracing: Option<&'a RayTracingShaderDesc>,
}

/// Converts DXIL to native bytecode against a finished binding layout
pub trait BytecodeConverter: Send + Sync {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Vec<u8>>;
}

/// Minimum OS the produced metallib targets
const DEPLOYMENT_OS: &str = "macOS";
const MINIMUM_OS_VERSION: &str = "15.1";

/// Runs the `metal-shaderconverter` executable
#[derive(Debug, Clone)]
pub struct MetalShaderConverterCli {
    executable: PathBuf,
}

impl MetalShaderConverterCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

fn write_temp(prefix: &str, suffix: &str, bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
    use std::io::Write;
    let mut file = tempfile::Builder::new().prefix(prefix).suffix(suffix).tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

impl BytecodeConverter for MetalShaderConverterCli {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Vec<u8>> {
        let input = write_temp("dz-msc-", ".dxil", request.dxil)?;
        let root_signature = write_temp("dz-msc-", ".json", request.root_signature.to_json()?.as_bytes())?;
        let local_root_signature = match request.local_root_signature {
            Some(local) if !local.is_empty() => Some(write_temp("dz-msc-local-", ".json", local.to_json()?.as_bytes())?),
            _ => None,
        };
        let output = tempfile::Builder::new()
            .prefix("dz-msc-")
            .suffix(".metallib")
            .tempfile()?;

        let mut command = Command::new(&self.executable);
        command
            .arg(input.path())
            .arg("-o").arg(output.path())
            .arg(format!("--entry-point-name={}", request.entry_point))
            .arg(format!("--deployment-os={}", DEPLOYMENT_OS))
            .arg(format!("--minimum-os-build-version={}", MINIMUM_OS_VERSION))
            .arg("--root-signature").arg(root_signature.path());
        if let Some(local) = &local_root_signature {
            command.arg("--local-root-signature").arg(local.path());
        }
        if let (true, Some(ray_tracing)) = (request.stage.is_ray_tracing(), request.ray_tracing) {
            command
                .arg(format!("--max-attribute-size={}", ray_tracing.max_attribute_bytes))
                .arg(format!("--max-recursion-depth={}", ray_tracing.max_recursion_depth));
        }

        crate::engine_trace!("dz::ShaderConverter", "{:?}", command);

        let result = command.output()
            .map_err(|e| crate::engine_err!("dz::ShaderConverter", Configuration =>
                "Failed to run '{}': {}", self.executable.display(), e))?;

        if !result.status.success() {
            let diagnostic = String::from_utf8_lossy(&result.stderr).trim().to_string();
            crate::engine_bail!("dz::ShaderConverter", Compile =>
                "Conversion of '{}' failed: {}", request.entry_point, diagnostic);
        }

        let bytecode = std::fs::read(output.path())?;
        if bytecode.is_empty() {
            crate::engine_bail!("dz::ShaderConverter", Compile =>
                "Conversion of '{}' produced no output", request.entry_point);
        }
        Ok(bytecode)
    }
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
