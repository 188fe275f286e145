/// Shader programs
///
/// A `ShaderProgram` compiles every stage of a pipeline and merges their
/// reflection into one root signature description. For the converter
/// backend compilation takes two passes: the stages are first compiled to
/// DXIL and reflected, then converted to native bytecode against the
/// layout derived from that reflection.

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::binding::root_signature::{
    RootConstantResourceBinding, RootSignatureDesc, RootSignatureLayout, RootSignatureType,
};
use crate::config::RhiConfiguration;
use crate::dz::Engine;
use crate::error::Result;
use crate::shader::compiler::ShaderCompiler;
use crate::shader::converter::ConverterRootSignature;
use crate::shader::reflection::{InputLayoutDesc, ReflectionBinding, ResourceSlot, ThreadGroupInfo};
use crate::shader::shader_data::{CompileDesc, CompiledShader, ShaderStageDesc, TargetIL};
use crate::types::{ResourceBindingType, ShaderStage};

// ============================================================================
// Descriptions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgramDesc {
    pub shaders: Vec<ShaderStageDesc>,
    pub target_il: TargetIL,
    pub enable_caching: bool,
}

impl ShaderProgramDesc {
    pub fn new(target_il: TargetIL) -> Self {
        Self {
            shaders: Vec::new(),
            target_il,
            enable_caching: true,
        }
    }

    pub fn with_shader(mut self, shader: ShaderStageDesc) -> Self {
        self.shaders.push(shader);
        self
    }
}

/// Shader-record bindings of one ray-tracing stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRootSignatureDesc {
    pub stage: Option<ShaderStage>,
    pub resource_bindings: Vec<ReflectionBinding>,
}

impl LocalRootSignatureDesc {
    pub fn is_empty(&self) -> bool {
        self.resource_bindings.is_empty()
    }
}

/// Everything a pipeline needs from the program's reflection
#[derive(Debug, Clone, Default)]
pub struct ShaderReflectDesc {
    pub root_signature: RootSignatureDesc,
    /// Empty unless the program has a vertex stage
    pub input_layout: InputLayoutDesc,
    /// One entry per shader, in program order
    pub local_root_signatures: Vec<LocalRootSignatureDesc>,
    pub thread_group: Option<ThreadGroupInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderProgramState {
    Uncompiled,
    Compiling,
    Compiled,
    Failed,
}

/// How a target is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilePlan {
    /// The front end emits the target directly
    SinglePass,
    /// DXIL first, then conversion against the reflected layout
    NeedsTwoPass,
}

impl CompilePlan {
    pub fn for_target(target_il: TargetIL) -> Self {
        if target_il.is_front_end_output() {
            CompilePlan::SinglePass
        } else {
            CompilePlan::NeedsTwoPass
        }
    }
}

// ============================================================================
// Program
// ============================================================================

pub struct ShaderProgram {
    desc: ShaderProgramDesc,
    compiler: Arc<ShaderCompiler>,
    config: RhiConfiguration,
    state: ShaderProgramState,
    compiled: Vec<CompiledShader>,
    converter_layout: Option<Arc<ConverterRootSignature>>,
}

impl ShaderProgram {
    /// Compile `desc` with the shared compiler
    pub fn new(desc: ShaderProgramDesc) -> Result<Self> {
        let compiler = Engine::shader_compiler()?;
        Self::with_compiler(desc, compiler)
    }

    /// Compile `desc` with an explicit compiler
    pub fn with_compiler(desc: ShaderProgramDesc, compiler: Arc<ShaderCompiler>) -> Result<Self> {
        let mut program = Self::deferred(desc, compiler);
        program.compile()?;
        Ok(program)
    }

    /// Program in the `Uncompiled` state; call [`compile`](Self::compile) once
    pub fn deferred(desc: ShaderProgramDesc, compiler: Arc<ShaderCompiler>) -> Self {
        Self {
            desc,
            compiler,
            config: Engine::configuration(),
            state: ShaderProgramState::Uncompiled,
            compiled: Vec::new(),
            converter_layout: None,
        }
    }

    /// Compile every stage
    ///
    /// # Errors
    ///
    /// `ContractViolation` on any call after the first. Compiler and
    /// reserved-space errors move the program to `Failed`.
    pub fn compile(&mut self) -> Result<()> {
        if self.state != ShaderProgramState::Uncompiled {
            crate::engine_bail!("dz::ShaderProgram", ContractViolation =>
                "compile() called on a program in state {:?}", self.state);
        }
        if self.desc.shaders.is_empty() {
            self.state = ShaderProgramState::Failed;
            crate::engine_bail!("dz::ShaderProgram", Configuration => "Shader program has no stages");
        }

        self.state = ShaderProgramState::Compiling;
        let result = match CompilePlan::for_target(self.desc.target_il) {
            CompilePlan::SinglePass => self.compile_single_pass(),
            CompilePlan::NeedsTwoPass => self.compile_two_pass(),
        };

        match result {
            Ok(compiled) => {
                self.compiled = compiled;
                self.state = ShaderProgramState::Compiled;
                crate::engine_debug!("dz::ShaderProgram", "Compiled {} stages to {:?}",
                    self.compiled.len(), self.desc.target_il);
                Ok(())
            }
            Err(e) => {
                self.state = ShaderProgramState::Failed;
                Err(e)
            }
        }
    }

    fn compile_single_pass(&self) -> Result<Vec<CompiledShader>> {
        let compiled = self.desc.shaders.iter()
            .map(|shader| self.compiler.compile(&CompileDesc::for_stage(
                shader, self.desc.target_il, self.desc.enable_caching)))
            .collect::<Result<Vec<_>>>()?;
        self.validate_reserved_spaces(&compiled)?;
        Ok(compiled)
    }

    fn compile_two_pass(&mut self) -> Result<Vec<CompiledShader>> {
        let dxil = self.desc.shaders.iter()
            .map(|shader| self.compiler.compile(&CompileDesc::for_stage(
                shader, TargetIL::Dxil, self.desc.enable_caching)))
            .collect::<Result<Vec<_>>>()?;
        self.validate_reserved_spaces(&dxil)?;

        let reflected = self.reflect_shaders(&dxil);
        let layout = RootSignatureLayout::build(&reflected.root_signature, &self.config)?;
        let global = Arc::new(ConverterRootSignature::from_layout(&layout));
        crate::engine_debug!("dz::ShaderProgram", "Converter layout: {} top-level entries",
            global.parameters().len());

        let mut converted = Vec::with_capacity(self.desc.shaders.len());
        for (shader, local) in self.desc.shaders.iter().zip(&reflected.local_root_signatures) {
            let mut desc = CompileDesc::for_stage(shader, self.desc.target_il, self.desc.enable_caching);
            desc.root_signature = Some(Arc::clone(&global));
            if !local.is_empty() {
                desc.local_root_signature = Some(Arc::new(ConverterRootSignature::local(&local.resource_bindings)));
            }
            converted.push(self.compiler.compile(&desc)?);
        }

        self.converter_layout = Some(global);
        Ok(converted)
    }

    /// Root-constant space holds constant buffers only, the root-level
    /// buffer space holds no samplers
    fn validate_reserved_spaces(&self, compiled: &[CompiledShader]) -> Result<()> {
        let constant_space = self.config.root_constant_register_space;
        let root_level_space = self.config.root_level_buffer_register_space;

        for shader in compiled {
            for binding in &shader.reflection.bindings {
                if binding.register_space == constant_space
                    && binding.binding_type != ResourceBindingType::ConstantBuffer
                {
                    crate::engine_bail!("dz::ShaderProgram", Configuration =>
                        "'{}' ({}) at {} is in the root constant space but is not a constant buffer",
                        binding.name, shader.entry_point, binding.slot());
                }
                if binding.register_space == root_level_space
                    && binding.binding_type == ResourceBindingType::Sampler
                {
                    crate::engine_bail!("dz::ShaderProgram", Configuration =>
                        "'{}' ({}) at {} is a sampler in the root level buffer space",
                        binding.name, shader.entry_point, binding.slot());
                }
            }
        }
        Ok(())
    }

    /// Merged reflection of all stages
    ///
    /// # Errors
    ///
    /// `ContractViolation` unless the program is `Compiled`.
    pub fn reflect(&self) -> Result<ShaderReflectDesc> {
        if self.state != ShaderProgramState::Compiled {
            crate::engine_bail!("dz::ShaderProgram", ContractViolation =>
                "reflect() requires a compiled program, state is {:?}", self.state);
        }
        Ok(self.reflect_shaders(&self.compiled))
    }

    fn reflect_shaders(&self, compiled: &[CompiledShader]) -> ShaderReflectDesc {
        let constant_space = self.config.root_constant_register_space;
        let mut result = ShaderReflectDesc::default();
        let mut bindings: BTreeMap<ResourceSlot, ReflectionBinding> = BTreeMap::new();
        let mut constants: BTreeMap<u32, RootConstantResourceBinding> = BTreeMap::new();

        for (shader, stage_desc) in compiled.iter().zip(&self.desc.shaders) {
            let local_slots = stage_desc.ray_tracing.as_ref()
                .map(|rt| rt.local_bindings.as_slice())
                .unwrap_or(&[]);
            let mut local = LocalRootSignatureDesc {
                stage: Some(shader.stage),
                resource_bindings: Vec::new(),
            };

            for binding in &shader.reflection.bindings {
                let is_local = local_slots.iter().any(|l| {
                    l.binding == binding.binding
                        && l.register_space == binding.register_space
                        && l.binding_type == binding.binding_type
                });
                if is_local {
                    local.resource_bindings.push(binding.clone());
                    continue;
                }

                let stages = binding.stages | shader.stage.stages();
                if binding.register_space == constant_space {
                    constants.entry(binding.binding)
                        .and_modify(|c| {
                            c.stages |= stages;
                            c.num_bytes = c.num_bytes.max(binding.num_bytes);
                        })
                        .or_insert_with(|| RootConstantResourceBinding {
                            name: binding.name.clone(),
                            binding: binding.binding,
                            num_bytes: binding.num_bytes,
                            stages,
                        });
                    continue;
                }

                match bindings.get_mut(&binding.slot()) {
                    Some(existing) => {
                        existing.stages |= stages;
                        existing.num_bytes = existing.num_bytes.max(binding.num_bytes);
                        if existing.name != binding.name {
                            crate::engine_warn!("dz::ShaderProgram",
                                "{} is '{}' in one stage and '{}' in {:?}",
                                binding.slot(), existing.name, binding.name, shader.stage);
                        }
                    }
                    None => {
                        let mut merged = binding.clone();
                        merged.stages = stages;
                        bindings.insert(binding.slot(), merged);
                    }
                }
            }

            if shader.stage == ShaderStage::Vertex {
                result.input_layout = InputLayoutDesc::from_inputs(&shader.reflection.inputs);
            }
            if result.thread_group.is_none() {
                result.thread_group = shader.reflection.thread_group;
            }
            result.local_root_signatures.push(local);
        }

        let is_compute = compiled.iter()
            .all(|s| s.stage == ShaderStage::Compute || s.stage.is_ray_tracing());
        result.root_signature = RootSignatureDesc {
            root_type: if is_compute { RootSignatureType::Compute } else { RootSignatureType::Graphics },
            resource_bindings: bindings.into_values().collect(),
            root_constants: constants.into_values().collect(),
            static_samplers: Vec::new(),
        };
        result
    }

    pub fn compiled_shaders(&self) -> &[CompiledShader] {
        &self.compiled
    }

    pub fn desc(&self) -> &ShaderProgramDesc {
        &self.desc
    }

    pub fn state(&self) -> ShaderProgramState {
        self.state
    }

    /// Global converter layout; `Some` only for two-pass targets
    pub fn converter_layout(&self) -> Option<&Arc<ConverterRootSignature>> {
        self.converter_layout.as_ref()
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
