/// Presentation collaborator
///
/// Swap chain creation lives outside the RHI; command lists only need to
/// present an acquired image.

use std::any::Any;
use std::sync::Arc;
use crate::device::{Semaphore, TextureResource};

pub trait SwapChain: Send + Sync {
    fn image_count(&self) -> u32;

    /// Render target texture of image `index`
    fn render_target(&self, index: u32) -> Option<Arc<dyn TextureResource>>;

    fn as_any(&self) -> &dyn Any;
}

/// Arguments of [`CommandList::present`](crate::command_list::CommandList::present)
#[derive(Clone)]
pub struct PresentDesc {
    pub swap_chain: Arc<dyn SwapChain>,
    pub image_index: u32,
    pub wait_semaphores: Vec<Arc<dyn Semaphore>>,
}
