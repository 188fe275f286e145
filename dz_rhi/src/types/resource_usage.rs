/// Resource usage (state) and resource descriptor bitsets
///
/// `ResourceUsage` is the vocabulary callers use to describe what a resource
/// is about to be used for. `ResourceDescriptor` is fixed at creation and
/// says what a resource may ever be bound as.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Desired state of a resource at a barrier point
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResourceUsage: u32 {
        const UNDEFINED = 1 << 0;
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 1;
        const INDEX_BUFFER = 1 << 2;
        const RENDER_TARGET = 1 << 3;
        const UNORDERED_ACCESS = 1 << 4;
        const DEPTH_WRITE = 1 << 5;
        const DEPTH_READ = 1 << 6;
        const SHADER_RESOURCE = 1 << 7;
        const PIXEL_SHADER_RESOURCE = 1 << 8;
        const STREAM_OUT = 1 << 9;
        const INDIRECT_ARGUMENT = 1 << 10;
        const COPY_DST = 1 << 11;
        const COPY_SRC = 1 << 12;
        const GENERIC_READ = 1 << 13;
        const PRESENT = 1 << 14;
        const COMMON = 1 << 15;
        const ACCELERATION_STRUCTURE_READ = 1 << 16;
        const ACCELERATION_STRUCTURE_WRITE = 1 << 17;
        const ACCELERATION_STRUCTURE_GEOMETRY = 1 << 18;
        const SHADER_BINDING_TABLE = 1 << 19;
    }
}

impl ResourceUsage {
    /// Canonical form used for every comparison and translation.
    ///
    /// - `GENERIC_READ`, `COMMON` and `PRESENT` discard every other bit
    ///   (checked in that order)
    /// - `DEPTH_WRITE` dominates `DEPTH_READ`
    /// - `UNDEFINED` only survives on its own; the empty set means `UNDEFINED`
    pub fn normalized(self) -> ResourceUsage {
        if self.contains(ResourceUsage::GENERIC_READ) {
            return ResourceUsage::GENERIC_READ;
        }
        if self.contains(ResourceUsage::COMMON) {
            return ResourceUsage::COMMON;
        }
        if self.contains(ResourceUsage::PRESENT) {
            return ResourceUsage::PRESENT;
        }

        let mut usage = self;
        if usage.contains(ResourceUsage::DEPTH_WRITE) {
            usage.remove(ResourceUsage::DEPTH_READ);
        }
        if usage != ResourceUsage::UNDEFINED {
            usage.remove(ResourceUsage::UNDEFINED);
        }
        if usage.is_empty() {
            return ResourceUsage::UNDEFINED;
        }
        usage
    }

    /// Whether the normalized usage is one of the terminal reset states
    pub fn is_reset_state(self) -> bool {
        let usage = self.normalized();
        usage == ResourceUsage::COMMON
            || usage == ResourceUsage::PRESENT
            || usage == ResourceUsage::GENERIC_READ
    }

    /// Whether the normalized usage is `UNDEFINED`
    pub fn is_undefined(self) -> bool {
        self.normalized() == ResourceUsage::UNDEFINED
    }

    /// States a copy queue can express
    pub fn copy_queue_compatible() -> ResourceUsage {
        ResourceUsage::UNDEFINED
            | ResourceUsage::COMMON
            | ResourceUsage::COPY_SRC
            | ResourceUsage::COPY_DST
    }
}

bitflags! {
    /// What a resource may be bound as (immutable after creation)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResourceDescriptor: u32 {
        const BUFFER = 1 << 0;
        const RW_BUFFER = 1 << 1;
        const TEXTURE = 1 << 2;
        const RW_TEXTURE = 1 << 3;
        const RENDER_TARGET = 1 << 4;
        const DEPTH_STENCIL = 1 << 5;
        const SAMPLER = 1 << 6;
        const UNIFORM_BUFFER = 1 << 7;
        const ROOT_CONSTANT = 1 << 8;
        const INDEX_BUFFER = 1 << 9;
        const VERTEX_BUFFER = 1 << 10;
        const INDIRECT_BUFFER = 1 << 11;
        const TEXTURE_CUBE = 1 << 12;
        const ACCELERATION_STRUCTURE = 1 << 13;
        const STRUCTURED_BUFFER = 1 << 14;
    }
}

/// Binding class of a slot: which native descriptor heap/table it lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceBindingType {
    ConstantBuffer,
    ShaderResource,
    UnorderedAccess,
    Sampler,
}

impl ResourceBindingType {
    /// HLSL register class letter (`b`, `t`, `u`, `s`)
    pub fn register_class(self) -> char {
        match self {
            ResourceBindingType::ConstantBuffer => 'b',
            ResourceBindingType::ShaderResource => 't',
            ResourceBindingType::UnorderedAccess => 'u',
            ResourceBindingType::Sampler => 's',
        }
    }
}

impl ResourceDescriptor {
    /// Binding class this descriptor maps onto
    pub fn binding_type(self) -> ResourceBindingType {
        if self.intersects(ResourceDescriptor::RW_BUFFER | ResourceDescriptor::RW_TEXTURE) {
            ResourceBindingType::UnorderedAccess
        } else if self.contains(ResourceDescriptor::SAMPLER) {
            ResourceBindingType::Sampler
        } else if self.intersects(ResourceDescriptor::UNIFORM_BUFFER | ResourceDescriptor::ROOT_CONSTANT) {
            ResourceBindingType::ConstantBuffer
        } else {
            ResourceBindingType::ShaderResource
        }
    }

    /// Every usage a resource with this descriptor may transition into
    pub fn allowed_usages(self) -> ResourceUsage {
        let mut allowed = ResourceUsage::UNDEFINED
            | ResourceUsage::COMMON
            | ResourceUsage::GENERIC_READ
            | ResourceUsage::COPY_SRC
            | ResourceUsage::COPY_DST;

        let buffer_like = ResourceDescriptor::BUFFER
            | ResourceDescriptor::RW_BUFFER
            | ResourceDescriptor::STRUCTURED_BUFFER
            | ResourceDescriptor::UNIFORM_BUFFER
            | ResourceDescriptor::VERTEX_BUFFER
            | ResourceDescriptor::INDEX_BUFFER
            | ResourceDescriptor::INDIRECT_BUFFER;

        if self.intersects(
            ResourceDescriptor::TEXTURE
                | ResourceDescriptor::TEXTURE_CUBE
                | ResourceDescriptor::BUFFER
                | ResourceDescriptor::STRUCTURED_BUFFER
                | ResourceDescriptor::RW_BUFFER
                | ResourceDescriptor::RW_TEXTURE
                | ResourceDescriptor::DEPTH_STENCIL,
        ) {
            allowed |= ResourceUsage::SHADER_RESOURCE | ResourceUsage::PIXEL_SHADER_RESOURCE;
        }
        if self.intersects(ResourceDescriptor::RW_BUFFER | ResourceDescriptor::RW_TEXTURE) {
            allowed |= ResourceUsage::UNORDERED_ACCESS;
        }
        if self.intersects(ResourceDescriptor::UNIFORM_BUFFER | ResourceDescriptor::VERTEX_BUFFER) {
            allowed |= ResourceUsage::VERTEX_AND_CONSTANT_BUFFER;
        }
        if self.contains(ResourceDescriptor::INDEX_BUFFER) {
            allowed |= ResourceUsage::INDEX_BUFFER;
        }
        if self.contains(ResourceDescriptor::INDIRECT_BUFFER) {
            allowed |= ResourceUsage::INDIRECT_ARGUMENT;
        }
        if self.contains(ResourceDescriptor::RENDER_TARGET) {
            allowed |= ResourceUsage::RENDER_TARGET | ResourceUsage::PRESENT;
        }
        if self.contains(ResourceDescriptor::DEPTH_STENCIL) {
            allowed |= ResourceUsage::DEPTH_READ | ResourceUsage::DEPTH_WRITE;
        }
        if self.contains(ResourceDescriptor::ACCELERATION_STRUCTURE) {
            allowed |= ResourceUsage::ACCELERATION_STRUCTURE_READ
                | ResourceUsage::ACCELERATION_STRUCTURE_WRITE;
        }
        if self.intersects(buffer_like) {
            allowed |= ResourceUsage::ACCELERATION_STRUCTURE_GEOMETRY
                | ResourceUsage::SHADER_BINDING_TABLE
                | ResourceUsage::STREAM_OUT;
        }
        allowed
    }

    /// Whether `usage` (normalized) is legal for this descriptor
    pub fn allows_usage(self, usage: ResourceUsage) -> bool {
        self.allowed_usages().contains(usage.normalized())
    }

    /// Whether a resource with this descriptor can fill a slot that was
    /// reflected as `required`
    pub fn satisfies(self, required: ResourceDescriptor) -> bool {
        let accepted = if required.contains(ResourceDescriptor::RW_TEXTURE) {
            ResourceDescriptor::RW_TEXTURE
        } else if required.contains(ResourceDescriptor::RW_BUFFER) {
            ResourceDescriptor::RW_BUFFER
        } else if required.contains(ResourceDescriptor::SAMPLER) {
            ResourceDescriptor::SAMPLER
        } else if required.intersects(ResourceDescriptor::UNIFORM_BUFFER | ResourceDescriptor::ROOT_CONSTANT) {
            ResourceDescriptor::UNIFORM_BUFFER
        } else if required.contains(ResourceDescriptor::ACCELERATION_STRUCTURE) {
            ResourceDescriptor::ACCELERATION_STRUCTURE
        } else if required.contains(ResourceDescriptor::TEXTURE_CUBE) {
            ResourceDescriptor::TEXTURE_CUBE
        } else if required.contains(ResourceDescriptor::TEXTURE) {
            ResourceDescriptor::TEXTURE | ResourceDescriptor::TEXTURE_CUBE
        } else if required.intersects(ResourceDescriptor::BUFFER | ResourceDescriptor::STRUCTURED_BUFFER) {
            ResourceDescriptor::BUFFER
                | ResourceDescriptor::STRUCTURED_BUFFER
                | ResourceDescriptor::RW_BUFFER
        } else {
            return false;
        };
        self.intersects(accepted)
    }
}

#[cfg(test)]
#[path = "resource_usage_tests.rs"]
mod tests;
