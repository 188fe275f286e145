//! End-to-end shader pipeline tests against a real DXC
//!
//! Compiles HLSL to SPIR-V with the `dxc` found through the configuration,
//! reflects it and builds a root signature layout from the result.
//! All tests need DXC on the PATH (or DZ_DXC_PATH) and are marked with #[ignore].
//!
//! Run with: cargo test --test dxc_pipeline_tests -- --ignored

use dz_rhi::dz::binding::RootSignatureLayout;
use dz_rhi::dz::shader::{CompileDesc, ShaderCompiler, ShaderProgram, ShaderProgramDesc, ShaderStageDesc};
use dz_rhi::dz::{
    Engine, Error, ResourceBindingType, RhiConfiguration, ShaderStage, ShaderStages, TargetIL,
};
use serial_test::serial;
use std::path::PathBuf;
use std::sync::Arc;

const VERTEX_SHADER: &str = r#"
cbuffer Camera : register(b0, space0)
{
    float4x4 ViewProjection;
};

struct PushData { float4 Tint; };
ConstantBuffer<PushData> Push : register(b0, space31);

struct VSInput
{
    float3 Position : POSITION;
    float2 TexCoord : TEXCOORD0;
};

struct VSOutput
{
    float4 Position : SV_POSITION;
    float2 TexCoord : TEXCOORD0;
};

VSOutput main(VSInput input)
{
    VSOutput output;
    output.Position = mul(ViewProjection, float4(input.Position, 1.0)) * Push.Tint.w;
    output.TexCoord = input.TexCoord;
    return output;
}
"#;

const PIXEL_SHADER: &str = r#"
Texture2D Albedo : register(t0, space1);
SamplerState LinearSampler : register(s0, space1);

struct PushData { float4 Tint; };
ConstantBuffer<PushData> Push : register(b0, space31);

float4 main(float4 position : SV_POSITION, float2 texCoord : TEXCOORD0) : SV_TARGET
{
    return Albedo.Sample(LinearSampler, texCoord) * Push.Tint;
}
"#;

const COMPUTE_SHADER: &str = r#"
RWStructuredBuffer<uint> Output : register(u0, space0);

[numthreads(8, 4, 1)]
void main(uint3 id : SV_DispatchThreadID)
{
    Output[id.x + id.y * 64] = id.x;
}
"#;

fn write_shader(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

fn compiler() -> Arc<ShaderCompiler> {
    Arc::new(ShaderCompiler::from_configuration(&RhiConfiguration::from_env()))
}

#[test]
#[ignore] // Requires DXC
#[serial]
fn test_compile_vertex_shader_to_spirv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shader(&dir, "triangle.vs.hlsl", VERTEX_SHADER);

    let mut desc = CompileDesc::new(&path, ShaderStage::Vertex, TargetIL::Spirv);
    desc.enable_caching = false;
    let compiled = compiler().compile(&desc).unwrap();

    assert_eq!(compiled.target_il, TargetIL::Spirv);
    let words = compiled.bytecode_words().unwrap();
    assert_eq!(words[0], 0x0723_0203);
    assert_eq!(compiled.reflection.inputs.len(), 2);
}

#[test]
#[ignore] // Requires DXC
#[serial]
fn test_compile_error_carries_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shader(&dir, "broken.hlsl", "float4 main() : SV_TARGET { return undefined_symbol; }");

    let mut desc = CompileDesc::new(&path, ShaderStage::Pixel, TargetIL::Spirv);
    desc.enable_caching = false;
    match compiler().compile(&desc) {
        Err(Error::Compile(message)) => assert!(message.contains("undefined_symbol")),
        other => panic!("expected a compile error, got {:?}", other.map(|s| s.bytecode.len())),
    }
}

#[test]
#[ignore] // Requires DXC
#[serial]
fn test_program_reflection_merges_stages() {
    Engine::reset_for_testing();
    let dir = tempfile::tempdir().unwrap();
    let vertex = write_shader(&dir, "mesh.vs.hlsl", VERTEX_SHADER);
    let pixel = write_shader(&dir, "mesh.ps.hlsl", PIXEL_SHADER);

    let mut desc = ShaderProgramDesc::new(TargetIL::Spirv)
        .with_shader(ShaderStageDesc::new(ShaderStage::Vertex, vertex))
        .with_shader(ShaderStageDesc::new(ShaderStage::Pixel, pixel));
    desc.enable_caching = false;
    let program = ShaderProgram::with_compiler(desc, compiler()).unwrap();
    let reflection = program.reflect().unwrap();

    let bindings = &reflection.root_signature.resource_bindings;
    let camera = bindings.iter()
        .find(|b| b.binding_type == ResourceBindingType::ConstantBuffer)
        .unwrap();
    assert_eq!((camera.binding, camera.register_space), (0, 0));
    assert_eq!(camera.num_bytes, 64);

    let albedo = bindings.iter()
        .find(|b| b.binding_type == ResourceBindingType::ShaderResource)
        .unwrap();
    assert_eq!((albedo.binding, albedo.register_space), (0, 1));
    assert!(albedo.stages.contains(ShaderStages::PIXEL));

    // Push is seen by both stages and folds into one root constant block
    assert_eq!(reflection.root_signature.root_constants.len(), 1);
    let push = &reflection.root_signature.root_constants[0];
    assert_eq!(push.num_bytes, 16);
    assert!(push.stages.contains(ShaderStages::VERTEX | ShaderStages::PIXEL));

    assert_eq!(reflection.input_layout.elements.len(), 2);

    let layout = RootSignatureLayout::build(&reflection.root_signature, &Engine::configuration()).unwrap();
    assert_eq!(layout.root_constants_num_bytes(), 16);
    assert!(layout.spaces().any(|space| space.register_space == 1));
    Engine::reset_for_testing();
}

#[test]
#[ignore] // Requires DXC
#[serial]
fn test_compute_thread_group_is_reflected() {
    Engine::reset_for_testing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_shader(&dir, "fill.cs.hlsl", COMPUTE_SHADER);

    let mut desc = ShaderProgramDesc::new(TargetIL::Spirv)
        .with_shader(ShaderStageDesc::new(ShaderStage::Compute, path));
    desc.enable_caching = false;
    let program = ShaderProgram::with_compiler(desc, compiler()).unwrap();
    let reflection = program.reflect().unwrap();

    let thread_group = reflection.thread_group.unwrap();
    assert_eq!((thread_group.x, thread_group.y, thread_group.z), (8, 4, 1));

    let output = &reflection.root_signature.resource_bindings[0];
    assert_eq!(output.binding_type, ResourceBindingType::UnorderedAccess);
    Engine::reset_for_testing();
}

#[test]
#[ignore] // Requires DXC
#[serial]
fn test_compiled_shader_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    let path = write_shader(&dir, "cached.cs.hlsl", COMPUTE_SHADER);
    let compiler = ShaderCompiler::from_configuration(&RhiConfiguration::from_env())
        .with_cache(Some(cache_dir.path().to_path_buf()));

    let desc = CompileDesc::new(&path, ShaderStage::Compute, TargetIL::Spirv);
    let first = compiler.compile(&desc).unwrap();
    assert!(std::fs::read_dir(cache_dir.path()).unwrap().next().is_some());

    let second = compiler.compile(&desc).unwrap();
    assert_eq!(first.bytecode, second.bytecode);
    assert_eq!(first.reflection, second.reflection);
}
