//! Unit tests for dxc.rs (argument building only; no executable needed)

use std::path::Path;
use crate::shader::dxc::*;
use crate::shader::TargetIL;
use crate::types::{ResourceBindingType, ShaderStage};
use crate::dz::Error;

fn request<'a>(stage: ShaderStage, output: TargetIL, defines: &'a [String]) -> HlslCompileRequest<'a> {
    HlslCompileRequest {
        path: Path::new("shaders/mesh.hlsl"),
        entry_point: "main",
        stage,
        output,
        defines,
    }
}

fn position(args: &[String], value: &str) -> Option<usize> {
    args.iter().position(|a| a == value)
}

#[test]
fn test_dxil_arguments() {
    let args = dxc_arguments(&request(ShaderStage::Pixel, TargetIL::Dxil, &[])).unwrap();
    assert_eq!(args, vec!["-T", "ps_6_6", "-Zpr", "-HV", "2021", "-E", "main"]);
}

#[test]
fn test_spirv_arguments_carry_register_shifts() {
    let args = dxc_arguments(&request(ShaderStage::Vertex, TargetIL::Spirv, &[])).unwrap();
    let joined = args.join(" ");

    assert!(joined.contains("-spirv"));
    assert!(joined.contains("-fspv-target-env=vulkan1.3"));
    assert!(joined.contains("-fvk-b-shift 1000 all"));
    assert!(joined.contains("-fvk-t-shift 2000 all"));
    assert!(joined.contains("-fvk-u-shift 3000 all"));
    assert!(joined.contains("-fvk-s-shift 4000 all"));
    assert!(joined.contains("-fvk-use-dx-layout"));
    assert!(!joined.contains("SPV_KHR_ray_tracing"));
}

#[test]
fn test_defines_precede_language_version() {
    let defines = vec!["USE_SHADOWS=1".to_string(), "MAX_LIGHTS=8".to_string()];
    let args = dxc_arguments(&request(ShaderStage::Compute, TargetIL::Dxil, &defines)).unwrap();

    let first = position(&args, "USE_SHADOWS=1").unwrap();
    let second = position(&args, "MAX_LIGHTS=8").unwrap();
    assert_eq!(args[first - 1], "-D");
    assert!(first < second);
    assert!(second < position(&args, "-HV").unwrap());
}

#[test]
fn test_ray_tracing_library_arguments() {
    let args = dxc_arguments(&request(ShaderStage::ClosestHit, TargetIL::Spirv, &[])).unwrap();
    assert_eq!(args[1], "lib_6_6");
    assert!(args.contains(&"-fspv-extension=SPV_KHR_ray_tracing".to_string()));
    assert!(args.contains(&"-export-shaders-only".to_string()));
    assert_eq!(args.last().map(String::as_str), Some("main"));
}

#[test]
fn test_metallib_is_not_a_front_end_output() {
    let result = dxc_arguments(&request(ShaderStage::Pixel, TargetIL::MetalLib, &[]));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_stage_group_is_rejected() {
    let result = dxc_arguments(&request(ShaderStage::AllGraphics, TargetIL::Dxil, &[]));
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_binding_shift_round_trip() {
    assert_eq!(shifted_binding(ResourceBindingType::ShaderResource, 3), 2003);
    assert_eq!(unshift_binding(2003), Some((ResourceBindingType::ShaderResource, 3)));
    assert_eq!(unshift_binding(4000), Some((ResourceBindingType::Sampler, 0)));
    assert_eq!(unshift_binding(1000), Some((ResourceBindingType::ConstantBuffer, 0)));
    assert_eq!(unshift_binding(12), None);
}
