//! Unit tests for program.rs

use serial_test::serial;
use super::*;
use crate::dz::Error;
use crate::shader::fake_compiler::*;
use crate::shader::reflection::ShaderReflectionData;
use crate::shader::shader_data::{LocalBindingDesc, RayTracingShaderDesc};
use crate::types::{Format, ShaderStages};

// ============================================================================
// Helper Functions
// ============================================================================

fn vertex_reflection() -> ShaderReflectionData {
    ShaderReflectionData {
        bindings: vec![binding("Frame", ResourceBindingType::ConstantBuffer, 0, 0, ShaderStage::Vertex)],
        inputs: vec![
            vertex_input("POSITION", 0, 3),
            vertex_input("TEXCOORD", 1, 2),
            vertex_input("SV_VertexID", 2, 1),
        ],
        thread_group: None,
    }
}

fn pixel_reflection() -> ShaderReflectionData {
    reflection(vec![
        binding("Frame", ResourceBindingType::ConstantBuffer, 0, 0, ShaderStage::Pixel),
        binding("albedo", ResourceBindingType::ShaderResource, 0, 1, ShaderStage::Pixel),
        binding("linear", ResourceBindingType::Sampler, 0, 1, ShaderStage::Pixel),
    ])
}

struct Fixture {
    _dir: tempfile::TempDir,
    desc: ShaderProgramDesc,
    log: CompileLog,
    conversions: ConversionLog,
    compiler: Arc<ShaderCompiler>,
}

fn fixture(target_il: TargetIL, stages: &[(ShaderStage, &str, ShaderReflectionData)]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = source(dir.path(), "program.hlsl");
    let front_end = FakeHlslCompiler::default();
    let converter = FakeConverter::default();
    let log = front_end.log.clone();
    let conversions = converter.log.clone();

    let mut reflector = FakeReflector::default();
    let mut desc = ShaderProgramDesc::new(target_il);
    desc.enable_caching = false;
    for (stage, entry, data) in stages {
        reflector = reflector.with_entry(entry, data.clone());
        desc = desc.with_shader(ShaderStageDesc::new(*stage, &path).with_entry_point(entry));
    }

    let compiler = Arc::new(ShaderCompiler::new(front_end, reflector).with_converter(converter));
    Fixture { _dir: dir, desc, log, conversions, compiler }
}

fn graphics_fixture(target_il: TargetIL) -> Fixture {
    fixture(target_il, &[
        (ShaderStage::Vertex, "VSMain", vertex_reflection()),
        (ShaderStage::Pixel, "PSMain", pixel_reflection()),
    ])
}

// ============================================================================
// Single pass
// ============================================================================

#[test]
#[serial]
fn test_graphics_program_merges_stages() {
    let f = graphics_fixture(TargetIL::Spirv);

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let reflect = program.reflect().unwrap();

    assert_eq!(program.state(), ShaderProgramState::Compiled);
    assert_eq!(program.compiled_shaders().len(), 2);
    assert!(program.converter_layout().is_none());
    let bindings = &reflect.root_signature.resource_bindings;
    assert_eq!(bindings.len(), 3);
    let frame = bindings.iter().find(|b| b.name == "Frame").unwrap();
    assert_eq!(frame.stages, ShaderStages::VERTEX | ShaderStages::PIXEL);
    assert_eq!(reflect.root_signature.root_type, RootSignatureType::Graphics);
    assert_eq!(reflect.local_root_signatures.len(), 2);
    assert!(reflect.thread_group.is_none());
}

#[test]
#[serial]
fn test_input_layout_from_vertex_stage() {
    let f = graphics_fixture(TargetIL::Spirv);

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let layout = program.reflect().unwrap().input_layout;

    // SV_VertexID is supplied by the pipeline
    assert_eq!(layout.elements.len(), 2);
    assert_eq!(layout.elements[0].format, Format::R32G32B32Float);
    assert_eq!(layout.elements[1].format, Format::R32G32Float);
    assert_eq!(layout.elements[1].offset, 12);
    assert_eq!(layout.stride, 20);
}

#[test]
#[serial]
fn test_compute_program() {
    let f = fixture(TargetIL::Dxil, &[(
        ShaderStage::Compute,
        "CSMain",
        compute_reflection(vec![binding("output", ResourceBindingType::UnorderedAccess, 0, 0, ShaderStage::Compute)], 8, 8, 1),
    )]);

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let reflect = program.reflect().unwrap();

    assert_eq!(reflect.root_signature.root_type, RootSignatureType::Compute);
    assert_eq!(reflect.thread_group, Some(ThreadGroupInfo { x: 8, y: 8, z: 1 }));
    assert!(reflect.input_layout.elements.is_empty());
}

#[test]
#[serial]
fn test_root_constants_merge_across_stages() {
    let mut vertex = vertex_reflection();
    vertex.bindings.push(binding("Push", ResourceBindingType::ConstantBuffer, 0, 31, ShaderStage::Vertex));
    let mut pixel = pixel_reflection();
    pixel.bindings.push(binding("Push", ResourceBindingType::ConstantBuffer, 0, 31, ShaderStage::Pixel));
    let f = fixture(TargetIL::Spirv, &[
        (ShaderStage::Vertex, "VSMain", vertex),
        (ShaderStage::Pixel, "PSMain", pixel),
    ]);

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let reflect = program.reflect().unwrap();

    assert_eq!(reflect.root_signature.root_constants.len(), 1);
    assert_eq!(reflect.root_signature.root_constants[0].num_bytes, 64);
    assert_eq!(reflect.root_signature.root_constants[0].stages, ShaderStages::VERTEX | ShaderStages::PIXEL);
    assert!(reflect.root_signature.resource_bindings.iter().all(|b| b.register_space != 31));
}

// ============================================================================
// Reserved spaces and state machine
// ============================================================================

#[test]
#[serial]
fn test_texture_in_root_constant_space_fails() {
    let f = fixture(TargetIL::Spirv, &[(
        ShaderStage::Pixel,
        "PSMain",
        reflection(vec![binding("bad", ResourceBindingType::ShaderResource, 0, 31, ShaderStage::Pixel)]),
    )]);
    let mut program = ShaderProgram::deferred(f.desc.clone(), Arc::clone(&f.compiler));

    assert!(matches!(program.compile(), Err(Error::Configuration(_))));
    assert_eq!(program.state(), ShaderProgramState::Failed);
    assert!(matches!(program.compile(), Err(Error::ContractViolation(_))));
}

#[test]
#[serial]
fn test_sampler_in_root_level_space_fails() {
    let f = fixture(TargetIL::Spirv, &[(
        ShaderStage::Pixel,
        "PSMain",
        reflection(vec![binding("bad", ResourceBindingType::Sampler, 0, 30, ShaderStage::Pixel)]),
    )]);

    let result = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler));

    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
#[serial]
fn test_second_compile_is_rejected() {
    let f = graphics_fixture(TargetIL::Spirv);
    let mut program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let calls = compile_calls(&f.log).len();

    assert!(matches!(program.compile(), Err(Error::ContractViolation(_))));
    assert_eq!(program.state(), ShaderProgramState::Compiled);
    assert_eq!(compile_calls(&f.log).len(), calls);
}

#[test]
#[serial]
fn test_reflect_before_compile_is_rejected() {
    let f = graphics_fixture(TargetIL::Spirv);
    let program = ShaderProgram::deferred(f.desc.clone(), Arc::clone(&f.compiler));

    assert_eq!(program.state(), ShaderProgramState::Uncompiled);
    assert!(matches!(program.reflect(), Err(Error::ContractViolation(_))));
}

#[test]
#[serial]
fn test_empty_program_is_rejected() {
    let f = fixture(TargetIL::Spirv, &[]);

    let result = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler));

    assert!(matches!(result, Err(Error::Configuration(_))));
}

// ============================================================================
// Two-pass compilation
// ============================================================================

#[test]
fn test_compile_plan() {
    assert_eq!(CompilePlan::for_target(TargetIL::Spirv), CompilePlan::SinglePass);
    assert_eq!(CompilePlan::for_target(TargetIL::Dxil), CompilePlan::SinglePass);
    assert_eq!(CompilePlan::for_target(TargetIL::MetalLib), CompilePlan::NeedsTwoPass);
}

#[test]
#[serial]
fn test_metallib_two_pass() {
    let f = graphics_fixture(TargetIL::MetalLib);

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();

    // Pass one reaches DXIL for every stage before anything is converted
    let calls = compile_calls(&f.log);
    assert_eq!(calls[0], ("VSMain".to_string(), TargetIL::Dxil));
    assert_eq!(calls[2], ("PSMain".to_string(), TargetIL::Dxil));
    assert!(calls.iter().all(|(_, il)| *il != TargetIL::MetalLib));

    let layout = program.converter_layout().unwrap();
    let conversions = f.conversions.lock().unwrap();
    assert_eq!(conversions.len(), 2);
    assert!(conversions.iter().all(|(_, signature, _)| signature == layout.as_ref()));
    // Frame b0 space0 table, then space1 CBV/SRV/UAV and sampler tables
    assert_eq!(layout.parameters().len(), 3);
    assert_eq!(layout.offsets(1).unwrap().sampler_offset, Some(2));

    let compiled = program.compiled_shaders();
    assert_eq!(compiled[0].bytecode, b"MetalLib:VSMain");
    assert_eq!(compiled[1].target_il, TargetIL::MetalLib);
    assert_eq!(program.reflect().unwrap().root_signature.resource_bindings.len(), 3);
}

#[test]
#[serial]
fn test_local_bindings_leave_the_global_signature() {
    let hit = reflection(vec![
        binding("scene", ResourceBindingType::ShaderResource, 0, 0, ShaderStage::ClosestHit),
        binding("hitTexture", ResourceBindingType::ShaderResource, 1, 2, ShaderStage::ClosestHit),
    ]);
    let mut f = fixture(TargetIL::MetalLib, &[(ShaderStage::ClosestHit, "ClosestHit", hit)]);
    f.desc.shaders[0].ray_tracing = Some(RayTracingShaderDesc {
        local_bindings: vec![LocalBindingDesc {
            binding: 1,
            register_space: 2,
            binding_type: ResourceBindingType::ShaderResource,
        }],
        ..Default::default()
    });

    let program = ShaderProgram::with_compiler(f.desc.clone(), Arc::clone(&f.compiler)).unwrap();
    let reflect = program.reflect().unwrap();

    assert_eq!(reflect.root_signature.resource_bindings.len(), 1);
    assert_eq!(reflect.root_signature.resource_bindings[0].name, "scene");
    assert_eq!(reflect.local_root_signatures[0].resource_bindings[0].name, "hitTexture");
    assert_eq!(reflect.root_signature.root_type, RootSignatureType::Compute);
    let conversions = f.conversions.lock().unwrap();
    assert!(conversions[0].2);
}

#[test]
#[serial]
fn test_failed_front_end_marks_program_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path = source(dir.path(), "broken.hlsl");
    let front_end = FakeHlslCompiler {
        diagnostic: Some("error: expected ';'".to_string()),
        ..Default::default()
    };
    let compiler = Arc::new(ShaderCompiler::new(front_end, FakeReflector::default()));
    let desc = ShaderProgramDesc::new(TargetIL::Spirv)
        .with_shader(ShaderStageDesc::new(ShaderStage::Pixel, &path));
    let mut program = ShaderProgram::deferred(desc, compiler);

    assert!(matches!(program.compile(), Err(Error::Compile(_))));
    assert_eq!(program.state(), ShaderProgramState::Failed);
}
