/// Barrier translation: requests, planning and native strategies

pub mod barrier_desc;
pub mod native;
pub mod translator;
pub mod strategy;

pub use barrier_desc::*;
pub use translator::*;
pub use strategy::*;
