/// Binding layer: root signature layouts and the bind groups built on them

pub mod root_signature;
pub mod bind_group;

pub use root_signature::*;
pub use bind_group::*;
