/// Device collaborators: the logical device factory and the opaque
/// resource, synchronization and pipeline objects it creates

pub mod logical_device;
pub mod resource;
pub mod sync;
pub mod pipeline;
pub mod swapchain;

pub use logical_device::*;
pub use resource::*;
pub use sync::*;
pub use pipeline::*;
pub use swapchain::*;

// Mock device for tests (no GPU required)
#[cfg(test)]
pub mod mock_device;
