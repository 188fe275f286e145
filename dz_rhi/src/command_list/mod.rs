/// Command recording

pub mod backend;
#[allow(clippy::module_inception)]
pub mod command_list;
pub mod descs;
pub mod pool;

pub use backend::*;
pub use command_list::*;
pub use descs::*;
pub use pool::*;
