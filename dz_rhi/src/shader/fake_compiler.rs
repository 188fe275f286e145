/// Fake front end, reflector and converter for tests (no dxc needed)
///
/// The front end emits `<IL>:<entry>` as bytecode so tests can tell which
/// pass produced what; the reflector only accepts bytecode of its own IL.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::shader::converter::{BytecodeConverter, ConversionRequest, ConverterRootSignature};
use crate::shader::dxc::{HlslCompileRequest, HlslCompiler};
use crate::shader::reflection::{ReflectionBinding, ShaderInputParameter, ShaderReflectionData, ThreadGroupInfo};
use crate::shader::reflector::ShaderReflector;
use crate::shader::shader_data::TargetIL;
use crate::types::{ResourceBindingType, ResourceDescriptor, ShaderStage};

pub type CompileLog = Arc<Mutex<Vec<(String, TargetIL)>>>;

pub fn compile_calls(log: &CompileLog) -> Vec<(String, TargetIL)> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

#[derive(Default, Clone)]
pub struct FakeHlslCompiler {
    pub log: CompileLog,
    /// Diagnostic returned for every compile when set
    pub diagnostic: Option<String>,
}

impl HlslCompiler for FakeHlslCompiler {
    fn compile(&self, request: &HlslCompileRequest<'_>) -> Result<Vec<u8>> {
        if let Ok(mut log) = self.log.lock() {
            log.push((request.entry_point.to_string(), request.output));
        }
        if let Some(diagnostic) = &self.diagnostic {
            return Err(crate::dz::Error::Compile(diagnostic.clone()));
        }
        Ok(format!("{:?}:{}", request.output, request.entry_point).into_bytes())
    }
}

#[derive(Default, Clone)]
pub struct FakeReflector {
    pub reflection: FxHashMap<String, ShaderReflectionData>,
}

impl FakeReflector {
    pub fn with_entry(mut self, entry_point: &str, reflection: ShaderReflectionData) -> Self {
        self.reflection.insert(entry_point.to_string(), reflection);
        self
    }
}

impl ShaderReflector for FakeReflector {
    fn reflection_il(&self) -> TargetIL {
        TargetIL::Spirv
    }

    fn reflect(&self, bytecode: &[u8], _stage: ShaderStage, entry_point: &str) -> Result<ShaderReflectionData> {
        if !bytecode.starts_with(b"Spirv:") {
            return Err(crate::dz::Error::InvalidResource(format!(
                "reflector got {}", String::from_utf8_lossy(bytecode))));
        }
        Ok(self.reflection.get(entry_point).cloned().unwrap_or_default())
    }
}

pub type ConversionLog = Arc<Mutex<Vec<(String, ConverterRootSignature, bool)>>>;

#[derive(Default, Clone)]
pub struct FakeConverter {
    pub log: ConversionLog,
}

impl BytecodeConverter for FakeConverter {
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<Vec<u8>> {
        if !request.dxil.starts_with(b"Dxil:") {
            return Err(crate::dz::Error::InvalidResource("converter expects DXIL".to_string()));
        }
        if let Ok(mut log) = self.log.lock() {
            log.push((
                request.entry_point.to_string(),
                request.root_signature.clone(),
                request.local_root_signature.is_some(),
            ));
        }
        Ok(format!("MetalLib:{}", request.entry_point).into_bytes())
    }
}

pub fn binding(
    name: &str,
    binding_type: ResourceBindingType,
    slot: u32,
    space: u32,
    stage: ShaderStage,
) -> ReflectionBinding {
    let descriptor = match binding_type {
        ResourceBindingType::ConstantBuffer => ResourceDescriptor::UNIFORM_BUFFER,
        ResourceBindingType::ShaderResource => ResourceDescriptor::TEXTURE,
        ResourceBindingType::UnorderedAccess => ResourceDescriptor::RW_TEXTURE,
        ResourceBindingType::Sampler => ResourceDescriptor::SAMPLER,
    };
    ReflectionBinding {
        name: name.to_string(),
        binding: slot,
        register_space: space,
        array_size: 1,
        binding_type,
        descriptor,
        stages: stage.stages(),
        fields: Vec::new(),
        num_bytes: if binding_type == ResourceBindingType::ConstantBuffer { 64 } else { 0 },
    }
}

pub fn vertex_input(semantic: &str, location: u32, num_components: u32) -> ShaderInputParameter {
    ShaderInputParameter {
        semantic_name: semantic.to_string(),
        semantic_index: 0,
        location,
        num_components,
    }
}

pub fn reflection(bindings: Vec<ReflectionBinding>) -> ShaderReflectionData {
    ShaderReflectionData {
        bindings,
        inputs: Vec::new(),
        thread_group: None,
    }
}

pub fn compute_reflection(bindings: Vec<ReflectionBinding>, x: u32, y: u32, z: u32) -> ShaderReflectionData {
    ShaderReflectionData {
        bindings,
        inputs: Vec::new(),
        thread_group: Some(ThreadGroupInfo { x, y, z }),
    }
}

/// Writes an (unused) HLSL source so existence checks pass
pub fn source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let _ = std::fs::write(&path, "// test source\n");
    path
}
