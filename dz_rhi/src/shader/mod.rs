/// Shader pipeline: HLSL compilation, reflection, caching and programs

pub mod reflection;
pub mod shader_data;
pub mod dxc;
pub mod reflector;
pub mod converter;
pub mod cache;
pub mod compiler;
pub mod program;

pub use reflection::*;
pub use shader_data::*;
pub use dxc::*;
pub use reflector::*;
pub use converter::*;
pub use cache::*;
pub use compiler::*;
pub use program::*;

// Fake compiler pieces for tests
#[cfg(test)]
pub mod fake_compiler;
