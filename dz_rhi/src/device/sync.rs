/// GPU/CPU synchronization primitives

use std::any::Any;
use crate::error::Result;

/// CPU-waitable completion signal
pub trait Fence: Send + Sync {
    /// Block the calling thread until the GPU signals the fence
    fn wait(&self) -> Result<()>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

/// GPU-to-GPU ordering between queue submissions
pub trait Semaphore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
