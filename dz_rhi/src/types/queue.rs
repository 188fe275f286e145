/// Hardware queue classification

use std::fmt;

/// Queue a command list records for; decides which operations are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueType {
    #[default]
    Graphics,
    Compute,
    Copy,
    RayTracing,
}

impl QueueType {
    /// Whether the queue can execute shader work at all
    pub fn supports_shaders(self) -> bool {
        !matches!(self, QueueType::Copy)
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueType::Graphics => "Graphics",
            QueueType::Compute => "Compute",
            QueueType::Copy => "Copy",
            QueueType::RayTracing => "RayTracing",
        };
        f.write_str(name)
    }
}
