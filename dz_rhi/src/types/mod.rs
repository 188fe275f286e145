/// Shared vocabulary of the RHI: usage and descriptor bitsets, formats,
/// shader stages and queue types

pub mod format;
pub mod queue;
pub mod resource_usage;
pub mod shader_stage;

pub use format::*;
pub use queue::*;
pub use resource_usage::*;
pub use shader_stage::*;
