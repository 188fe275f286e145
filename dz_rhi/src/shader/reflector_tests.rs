//! Unit tests for reflector.rs
//!
//! Reflection of real DXC output is covered by the ignored tests in
//! tests/dxc_pipeline_tests.rs.

use crate::shader::reflector::{local_size, ShaderReflector, SpirvReflector};
use crate::shader::reflection::ThreadGroupInfo;
use crate::shader::TargetIL;
use crate::types::ShaderStage;

fn header() -> Vec<u32> {
    vec![0x0723_0203, 0x0001_0600, 0, 16, 0]
}

#[test]
fn test_reflection_il_is_spirv() {
    assert_eq!(SpirvReflector.reflection_il(), TargetIL::Spirv);
}

#[test]
fn test_local_size_is_read_from_execution_mode() {
    let mut words = header();
    // OpCapability Shader
    words.extend([(2 << 16) | 17, 1]);
    // OpExecutionMode %4 LocalSize 8 4 1
    words.extend([(6 << 16) | 16, 4, 17, 8, 4, 1]);

    assert_eq!(local_size(&words), Some(ThreadGroupInfo { x: 8, y: 4, z: 1 }));
}

#[test]
fn test_local_size_absent() {
    let mut words = header();
    words.extend([(2 << 16) | 17, 1]);
    assert_eq!(local_size(&words), None);
}

#[test]
fn test_local_size_rejects_truncated_instruction() {
    let mut words = header();
    words.extend([(6 << 16) | 16, 4, 17]);
    assert_eq!(local_size(&words), None);
}

#[test]
fn test_local_size_requires_magic() {
    assert_eq!(local_size(&[0xdead_beef, 0, 0, 0, 0]), None);
}

#[test]
fn test_reflect_rejects_non_spirv() {
    let result = SpirvReflector.reflect(&[1, 2, 3], ShaderStage::Vertex, "main");
    assert!(result.is_err());
}
