//! Error types for the DenOfIz RHI
//!
//! Errors fall into three families:
//! - fatal configuration errors (bad register-space usage, missing sources,
//!   compiler diagnostics, lost device)
//! - recoverable inconsistencies, which are logged as warnings and never
//!   surface as an `Error`
//! - caller-contract violations (wrong queue type, binding-kind mismatch,
//!   double compilation), reported distinctly so tests can assert on them

use std::fmt;

/// Result type for RHI operations
pub type Result<T> = std::result::Result<T, Error>;

/// RHI errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed configuration that would corrupt GPU-visible state
    /// (reserved register-space misuse, missing shader source, missing handle)
    Configuration(String),

    /// Shader compiler diagnostic failure (carries the full diagnostic text)
    Compile(String),

    /// Resource does not satisfy the kind a bind-group slot expects
    Binding(String),

    /// Operation called in a state or on a queue where it is not legal
    ContractViolation(String),

    /// Backend-specific error (Vulkan, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, device, subsystems)
    InitializationFailed(String),

    /// The logical device was lost; every GPU object must be rebuilt
    DeviceLost,
}

impl Error {
    /// Whether the error aborts the current operation for good.
    ///
    /// Contract violations and binding errors are reported to the caller
    /// but leave the object they were raised on usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Compile(_) | Error::DeviceLost | Error::OutOfMemory
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Error::Compile(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::Binding(msg) => write!(f, "Binding error: {}", msg),
            Error::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DeviceLost => write!(f, "Device lost"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::BackendError(format!("I/O error: {}", error))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
