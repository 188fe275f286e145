/// HLSL to bytecode compiler
///
/// `ShaderCompiler` drives the HLSL front end, the reflector, the optional
/// bytecode converter and the on-disk cache. A compile either produces both
/// bytecode and reflection or fails; nothing partial is returned or cached.

use std::path::PathBuf;
use crate::config::RhiConfiguration;
use crate::error::Result;
use crate::shader::cache::ShaderCache;
use crate::shader::converter::{BytecodeConverter, ConversionRequest, MetalShaderConverterCli};
use crate::shader::dxc::{DxcCommandLine, HlslCompileRequest, HlslCompiler};
use crate::shader::reflector::{ShaderReflector, SpirvReflector};
use crate::shader::shader_data::{CompileDesc, CompiledShader, TargetIL};

pub struct ShaderCompiler {
    front_end: Box<dyn HlslCompiler>,
    reflector: Box<dyn ShaderReflector>,
    converter: Option<Box<dyn BytecodeConverter>>,
    cache: ShaderCache,
    enable_cache: bool,
}

impl std::fmt::Debug for ShaderCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCompiler")
            .field("reflection_il", &self.reflector.reflection_il())
            .field("has_converter", &self.converter.is_some())
            .field("cache", &self.cache)
            .field("enable_cache", &self.enable_cache)
            .finish()
    }
}

impl ShaderCompiler {
    /// `dxc`, the SPIR-V reflector and `metal-shaderconverter` as configured
    pub fn from_configuration(config: &RhiConfiguration) -> Self {
        Self {
            front_end: Box::new(DxcCommandLine::new(config.dxc_path.clone())),
            reflector: Box::new(SpirvReflector),
            converter: Some(Box::new(MetalShaderConverterCli::new(config.metal_converter_path.clone()))),
            cache: ShaderCache::new(config.shader_cache_dir.clone()),
            enable_cache: config.enable_shader_cache,
        }
    }

    /// Custom front end and reflector, no converter, caching disabled
    pub fn new<C, R>(front_end: C, reflector: R) -> Self
    where
        C: HlslCompiler + 'static,
        R: ShaderReflector + 'static,
    {
        Self {
            front_end: Box::new(front_end),
            reflector: Box::new(reflector),
            converter: None,
            cache: ShaderCache::default(),
            enable_cache: false,
        }
    }

    pub fn with_converter<B: BytecodeConverter + 'static>(mut self, converter: B) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Enable caching in `directory` (`None`: next to the sources)
    pub fn with_cache(mut self, directory: Option<PathBuf>) -> Self {
        self.cache = ShaderCache::new(directory);
        self.enable_cache = true;
        self
    }

    pub fn reflection_il(&self) -> TargetIL {
        self.reflector.reflection_il()
    }

    pub fn cache(&self) -> &ShaderCache {
        &self.cache
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.enable_cache
    }

    /// Compile one stage
    ///
    /// # Errors
    ///
    /// - `Configuration` for `MetalLib` without a root signature, a missing
    ///   source file, or a `MetalLib` request without a converter
    /// - `Compile` with the full diagnostic when the front end or converter fails
    pub fn compile(&self, desc: &CompileDesc) -> Result<CompiledShader> {
        if desc.target_il == TargetIL::MetalLib && desc.root_signature.is_none() {
            crate::engine_bail!("dz::ShaderCompiler", Configuration =>
                "{} ({}): MetalLib needs the program root signature, compile through ShaderProgram",
                desc.path.display(), desc.entry_point);
        }
        if !desc.path.is_file() {
            crate::engine_bail!("dz::ShaderCompiler", Configuration =>
                "Shader source not found: {}", desc.path.display());
        }

        let caching = self.enable_cache && desc.enable_caching;
        if caching {
            if let Some((bytecode, reflection)) = self.cache.load(&desc.path, &desc.entry_point, desc.target_il) {
                return Ok(CompiledShader {
                    stage: desc.stage,
                    entry_point: desc.entry_point.clone(),
                    target_il: desc.target_il,
                    bytecode,
                    reflection,
                    ray_tracing: desc.ray_tracing.clone(),
                });
            }
        }

        let compiled = match desc.target_il {
            TargetIL::MetalLib => self.compile_converted(desc)?,
            target_il => self.compile_front_end(desc, target_il)?,
        };

        if caching {
            if let Err(e) = self.cache.store(&desc.path, &desc.entry_point, desc.target_il,
                &compiled.bytecode, &compiled.reflection) {
                crate::engine_warn!("dz::ShaderCompiler", "Failed to cache {} ({}): {}",
                    desc.path.display(), desc.entry_point, e);
            }
        }

        crate::engine_debug!("dz::ShaderCompiler", "Compiled {} ({}) to {:?}: {} bytes, {} bindings",
            desc.path.display(), desc.entry_point, desc.target_il,
            compiled.bytecode.len(), compiled.reflection.bindings.len());
        Ok(compiled)
    }

    fn front_end_output(&self, desc: &CompileDesc, output: TargetIL) -> Result<Vec<u8>> {
        self.front_end.compile(&HlslCompileRequest {
            path: &desc.path,
            entry_point: &desc.entry_point,
            stage: desc.stage,
            output,
            defines: &desc.defines,
        })
    }

    fn compile_front_end(&self, desc: &CompileDesc, target_il: TargetIL) -> Result<CompiledShader> {
        let bytecode = self.front_end_output(desc, target_il)?;

        let reflection_il = self.reflector.reflection_il();
        let reflection = if reflection_il == target_il {
            self.reflector.reflect(&bytecode, desc.stage, &desc.entry_point)?
        } else {
            // Only the reflection of this second compile is kept
            crate::engine_trace!("dz::ShaderCompiler", "Reflection-only compile of {} ({}) to {:?}",
                desc.path.display(), desc.entry_point, reflection_il);
            let reflection_bytecode = self.front_end_output(desc, reflection_il)?;
            self.reflector.reflect(&reflection_bytecode, desc.stage, &desc.entry_point)?
        };

        Ok(CompiledShader {
            stage: desc.stage,
            entry_point: desc.entry_point.clone(),
            target_il,
            bytecode,
            reflection,
            ray_tracing: desc.ray_tracing.clone(),
        })
    }

    fn compile_converted(&self, desc: &CompileDesc) -> Result<CompiledShader> {
        let Some(converter) = &self.converter else {
            crate::engine_bail!("dz::ShaderCompiler", Configuration =>
                "No bytecode converter installed for {} ({})", desc.path.display(), desc.entry_point);
        };
        let Some(root_signature) = desc.root_signature.as_deref() else {
            crate::engine_bail!("dz::ShaderCompiler", Configuration =>
                "MetalLib needs the program root signature");
        };

        let dxil_desc = CompileDesc {
            target_il: TargetIL::Dxil,
            root_signature: None,
            local_root_signature: None,
            ..desc.clone()
        };
        let dxil = self.compile(&dxil_desc)?;

        let bytecode = converter.convert(&ConversionRequest {
            dxil: &dxil.bytecode,
            stage: desc.stage,
            entry_point: &desc.entry_point,
            root_signature,
            local_root_signature: desc.local_root_signature.as_deref(),
            ray_tracing: desc.ray_tracing.as_ref(),
        })?;

        Ok(CompiledShader {
            target_il: TargetIL::MetalLib,
            bytecode,
            ..dxil
        })
    }
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
