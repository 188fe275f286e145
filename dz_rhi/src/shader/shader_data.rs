/// Compile requests and compiled shader objects

use std::path::PathBuf;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::shader::converter::ConverterRootSignature;
use crate::shader::reflection::ShaderReflectionData;
use crate::types::{ResourceBindingType, ShaderStage};

/// Bytecode format a shader is compiled to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetIL {
    /// DirectX intermediate language
    Dxil,
    /// Vulkan SPIR-V
    Spirv,
    /// Native bytecode of the converter backend (DXIL converted to metallib)
    MetalLib,
}

impl TargetIL {
    /// Cache file extension
    pub fn extension(self) -> &'static str {
        match self {
            TargetIL::Dxil => "dxil",
            TargetIL::Spirv => "spv",
            TargetIL::MetalLib => "metallib",
        }
    }

    /// Produced by the HLSL front end directly (no conversion step)
    pub fn is_front_end_output(self) -> bool {
        !matches!(self, TargetIL::MetalLib)
    }
}

/// Ray-tracing hit group geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HitGroupType {
    #[default]
    Triangles,
    Aabbs,
}

/// Binding that belongs to a shader record instead of the global signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalBindingDesc {
    pub binding: u32,
    pub register_space: u32,
    pub binding_type: ResourceBindingType,
}

/// Per-stage ray-tracing hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayTracingShaderDesc {
    pub hit_group_type: HitGroupType,
    pub local_bindings: Vec<LocalBindingDesc>,
    pub max_payload_bytes: u32,
    pub max_attribute_bytes: u32,
    pub max_recursion_depth: u32,
}

impl Default for RayTracingShaderDesc {
    fn default() -> Self {
        Self {
            hit_group_type: HitGroupType::Triangles,
            local_bindings: Vec::new(),
            max_payload_bytes: 0,
            max_attribute_bytes: 0,
            max_recursion_depth: 1,
        }
    }
}

/// One stage of a shader program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub stage: ShaderStage,
    pub path: PathBuf,
    pub entry_point: String,
    pub defines: Vec<String>,
    pub ray_tracing: Option<RayTracingShaderDesc>,
}

impl ShaderStageDesc {
    /// Stage compiled from `main`
    pub fn new(stage: ShaderStage, path: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            path: path.into(),
            entry_point: "main".to_string(),
            defines: Vec::new(),
            ray_tracing: None,
        }
    }

    pub fn with_entry_point(mut self, entry_point: &str) -> Self {
        self.entry_point = entry_point.to_string();
        self
    }

    pub fn with_define(mut self, define: &str) -> Self {
        self.defines.push(define.to_string());
        self
    }

    pub fn with_ray_tracing(mut self, ray_tracing: RayTracingShaderDesc) -> Self {
        self.ray_tracing = Some(ray_tracing);
        self
    }
}

/// Single-stage compile request
#[derive(Debug, Clone)]
pub struct CompileDesc {
    pub path: PathBuf,
    pub entry_point: String,
    pub stage: ShaderStage,
    pub target_il: TargetIL,
    pub defines: Vec<String>,
    pub ray_tracing: Option<RayTracingShaderDesc>,
    pub enable_caching: bool,
    /// Finished binding layout; required when `target_il` is `MetalLib`
    pub root_signature: Option<Arc<ConverterRootSignature>>,
    /// Shader-record layout for ray-tracing stages of the converter backend
    pub local_root_signature: Option<Arc<ConverterRootSignature>>,
}

impl CompileDesc {
    pub fn new(path: impl Into<PathBuf>, stage: ShaderStage, target_il: TargetIL) -> Self {
        Self {
            path: path.into(),
            entry_point: "main".to_string(),
            stage,
            target_il,
            defines: Vec::new(),
            ray_tracing: None,
            enable_caching: true,
            root_signature: None,
            local_root_signature: None,
        }
    }

    /// Request for one stage of a program
    pub fn for_stage(stage: &ShaderStageDesc, target_il: TargetIL, enable_caching: bool) -> Self {
        Self {
            path: stage.path.clone(),
            entry_point: stage.entry_point.clone(),
            stage: stage.stage,
            target_il,
            defines: stage.defines.clone(),
            ray_tracing: stage.ray_tracing.clone(),
            enable_caching,
            root_signature: None,
            local_root_signature: None,
        }
    }
}

/// Bytecode plus reflection; never exists partially populated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub target_il: TargetIL,
    pub bytecode: Vec<u8>,
    pub reflection: ShaderReflectionData,
    pub ray_tracing: Option<RayTracingShaderDesc>,
}

impl CompiledShader {
    /// Serialized reflection, as persisted in the cache
    pub fn reflection_blob(&self) -> Result<Vec<u8>> {
        self.reflection.to_blob()
    }

    /// SPIR-V words (for backends that consume `u32` code)
    pub fn bytecode_words(&self) -> Option<Vec<u32>> {
        if self.bytecode.len() % 4 != 0 {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec::<u8, u32>(&self.bytecode))
    }
}
