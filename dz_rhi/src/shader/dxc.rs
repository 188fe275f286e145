/// HLSL front end: DXC argument building and the command-line driver

use std::path::{Path, PathBuf};
use std::process::Command;
use crate::error::Result;
use crate::shader::shader_data::TargetIL;
use crate::types::{ResourceBindingType, ShaderStage};

// Vulkan needs a unique binding per descriptor while HLSL keeps one register
// file per class, so each class is shifted into its own binding range.
pub const VK_SHIFT_CBV: u32 = 1000;
pub const VK_SHIFT_SRV: u32 = 2000;
pub const VK_SHIFT_UAV: u32 = 3000;
pub const VK_SHIFT_SAMPLER: u32 = 4000;

/// Vulkan binding number DXC assigns to an HLSL register
pub fn shifted_binding(binding_type: ResourceBindingType, slot: u32) -> u32 {
    let shift = match binding_type {
        ResourceBindingType::ConstantBuffer => VK_SHIFT_CBV,
        ResourceBindingType::ShaderResource => VK_SHIFT_SRV,
        ResourceBindingType::UnorderedAccess => VK_SHIFT_UAV,
        ResourceBindingType::Sampler => VK_SHIFT_SAMPLER,
    };
    shift + slot
}

/// Inverse of [`shifted_binding`]; `None` for bindings below the CBV range
pub fn unshift_binding(binding: u32) -> Option<(ResourceBindingType, u32)> {
    match binding {
        b if b >= VK_SHIFT_SAMPLER => Some((ResourceBindingType::Sampler, b - VK_SHIFT_SAMPLER)),
        b if b >= VK_SHIFT_UAV => Some((ResourceBindingType::UnorderedAccess, b - VK_SHIFT_UAV)),
        b if b >= VK_SHIFT_SRV => Some((ResourceBindingType::ShaderResource, b - VK_SHIFT_SRV)),
        b if b >= VK_SHIFT_CBV => Some((ResourceBindingType::ConstantBuffer, b - VK_SHIFT_CBV)),
        _ => None,
    }
}

/// One invocation of the HLSL front end
#[derive(Debug, Clone)]
pub struct HlslCompileRequest<'a> {
    pub path: &'a Path,
    pub entry_point: &'a str,
    pub stage: ShaderStage,
    /// `Dxil` or `Spirv`
    pub output: TargetIL,
    pub defines: &'a [String],
}

/// Compiles HLSL to DXIL or SPIR-V
///
/// Implementations must return the full diagnostic text in
/// `Error::Compile` when the source does not compile.
pub trait HlslCompiler: Send + Sync {
    fn compile(&self, request: &HlslCompileRequest<'_>) -> Result<Vec<u8>>;
}

/// DXC arguments for a request, excluding the output and source paths
pub fn dxc_arguments(request: &HlslCompileRequest<'_>) -> Result<Vec<String>> {
    let Some(profile) = request.stage.target_profile() else {
        crate::engine_bail!("dz::ShaderCompiler", Configuration =>
            "{:?} is a stage group and cannot be compiled", request.stage);
    };
    if !request.output.is_front_end_output() {
        crate::engine_bail!("dz::ShaderCompiler", Configuration =>
            "DXC cannot emit {:?} directly", request.output);
    }

    let mut args: Vec<String> = vec![
        "-T".into(), profile.into(),
        "-Zpr".into(),
    ];

    if request.output == TargetIL::Spirv {
        args.extend([
            "-spirv".to_string(),
            "-fspv-target-env=vulkan1.3".to_string(),
            "-Wno-parameter-usage".to_string(),
        ]);
        if request.stage.is_ray_tracing() {
            args.push("-fspv-extension=SPV_KHR_ray_tracing".into());
            args.push("-fspv-extension=SPV_KHR_ray_query".into());
        }
        for (flag, shift) in [
            ("-fvk-b-shift", VK_SHIFT_CBV),
            ("-fvk-t-shift", VK_SHIFT_SRV),
            ("-fvk-u-shift", VK_SHIFT_UAV),
            ("-fvk-s-shift", VK_SHIFT_SAMPLER),
        ] {
            args.extend([flag.to_string(), shift.to_string(), "all".to_string()]);
        }
        args.extend([
            "-fvk-use-dx-position-w".to_string(),
            "-fvk-use-dx-layout".to_string(),
        ]);
    }

    for define in request.defines {
        args.push("-D".into());
        args.push(define.clone());
    }

    args.extend(["-HV".to_string(), "2021".to_string()]);
    args.extend(["-E".to_string(), request.entry_point.to_string()]);

    if profile.starts_with("lib") {
        args.extend([
            "-default-linkage".to_string(),
            "external".to_string(),
            "-export-shaders-only".to_string(),
            "-exports".to_string(),
            request.entry_point.to_string(),
        ]);
    }

    Ok(args)
}

/// Runs the `dxc` executable
#[derive(Debug, Clone)]
pub struct DxcCommandLine {
    executable: PathBuf,
}

impl DxcCommandLine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl HlslCompiler for DxcCommandLine {
    fn compile(&self, request: &HlslCompileRequest<'_>) -> Result<Vec<u8>> {
        let args = dxc_arguments(request)?;

        let output = tempfile::Builder::new()
            .prefix("dz-dxc-")
            .suffix(&format!(".{}", request.output.extension()))
            .tempfile()?;

        crate::engine_trace!("dz::ShaderCompiler", "{} {} -Fo {} {}",
            self.executable.display(), args.join(" "),
            output.path().display(), request.path.display());

        let result = Command::new(&self.executable)
            .args(&args)
            .arg("-Fo")
            .arg(output.path())
            .arg(request.path)
            .output()
            .map_err(|e| crate::engine_err!("dz::ShaderCompiler", Configuration =>
                "Failed to run '{}': {}", self.executable.display(), e))?;

        if !result.status.success() {
            let diagnostic = String::from_utf8_lossy(&result.stderr).trim().to_string();
            crate::engine_bail!("dz::ShaderCompiler", Compile =>
                "{} ({}): {}", request.path.display(), request.entry_point, diagnostic);
        }

        let bytecode = std::fs::read(output.path())?;
        if bytecode.is_empty() {
            crate::engine_bail!("dz::ShaderCompiler", Compile =>
                "{} ({}): DXC produced no output", request.path.display(), request.entry_point);
        }
        Ok(bytecode)
    }
}

#[cfg(test)]
#[path = "dxc_tests.rs"]
mod tests;
