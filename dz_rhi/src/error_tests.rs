//! Unit tests for error.rs
//!
//! Tests Display output, fatality classification, and `?` propagation.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_configuration_error_display() {
    let err = Error::Configuration("register space 31 holds a texture".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Configuration error"));
    assert!(display.contains("register space 31"));
}

#[test]
fn test_compile_error_display_keeps_diagnostic() {
    let diagnostic = "shader.hlsl:3:5: error: use of undeclared identifier 'foo'";
    let err = Error::Compile(diagnostic.to_string());
    assert!(format!("{}", err).contains(diagnostic));
}

#[test]
fn test_binding_error_display() {
    let err = Error::Binding("slot t0 expects a texture".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Binding error"));
    assert!(display.contains("slot t0"));
}

#[test]
fn test_contract_violation_display() {
    let err = Error::ContractViolation("Dispatch on a Graphics queue".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Contract violation"));
    assert!(display.contains("Graphics"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_device_lost_display() {
    assert_eq!(format!("{}", Error::DeviceLost), "Device lost");
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[test]
fn test_fatal_classification() {
    assert!(Error::Configuration(String::new()).is_fatal());
    assert!(Error::Compile(String::new()).is_fatal());
    assert!(Error::DeviceLost.is_fatal());

    assert!(!Error::Binding(String::new()).is_fatal());
    assert!(!Error::ContractViolation(String::new()).is_fatal());
    assert!(!Error::BackendError(String::new()).is_fatal());
}

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::Binding("b0".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::Binding("b1".to_string()));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.hlsl");
    let err: Error = io.into();
    match err {
        Error::BackendError(msg) => assert!(msg.contains("missing.hlsl")),
        other => panic!("unexpected variant {:?}", other),
    }
}

// ============================================================================
// RESULT PROPAGATION
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<()> {
        Err(Error::ContractViolation("inner".to_string()))
    }

    fn outer() -> Result<u32> {
        inner()?;
        Ok(1)
    }

    assert_eq!(outer(), Err(Error::ContractViolation("inner".to_string())));
}
