/// Texel and vertex-element formats

use serde::{Deserialize, Serialize};

/// Format of a texture texel or a vertex input element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    #[default]
    Undefined,
    R32G32B32A32Float,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32Float,
    R32G32B32Uint,
    R32G32B32Sint,
    R16G16B16A16Float,
    R16G16B16A16Unorm,
    R16G16B16A16Uint,
    R32G32Float,
    R32G32Uint,
    R32G32Sint,
    R10G10B10A2Unorm,
    R8G8B8A8Unorm,
    R8G8B8A8UnormSrgb,
    R8G8B8A8Uint,
    B8G8R8A8Unorm,
    B8G8R8A8UnormSrgb,
    R16G16Float,
    R16G16Unorm,
    R32Float,
    R32Uint,
    R32Sint,
    R16Float,
    R16Uint,
    R16Unorm,
    R8G8Unorm,
    R8Unorm,
    R8Uint,
    D32Float,
    D24UnormS8Uint,
    D16Unorm,
}

impl Format {
    /// Size of one texel/element in bytes
    pub fn num_bytes(self) -> u32 {
        match self {
            Format::Undefined => 0,
            Format::R32G32B32A32Float | Format::R32G32B32A32Uint | Format::R32G32B32A32Sint => 16,
            Format::R32G32B32Float | Format::R32G32B32Uint | Format::R32G32B32Sint => 12,
            Format::R16G16B16A16Float
            | Format::R16G16B16A16Unorm
            | Format::R16G16B16A16Uint
            | Format::R32G32Float
            | Format::R32G32Uint
            | Format::R32G32Sint => 8,
            Format::R10G10B10A2Unorm
            | Format::R8G8B8A8Unorm
            | Format::R8G8B8A8UnormSrgb
            | Format::R8G8B8A8Uint
            | Format::B8G8R8A8Unorm
            | Format::B8G8R8A8UnormSrgb
            | Format::R16G16Float
            | Format::R16G16Unorm
            | Format::R32Float
            | Format::R32Uint
            | Format::R32Sint
            | Format::D32Float
            | Format::D24UnormS8Uint => 4,
            Format::R16Float | Format::R16Uint | Format::R16Unorm | Format::R8G8Unorm | Format::D16Unorm => 2,
            Format::R8Unorm | Format::R8Uint => 1,
        }
    }

    /// Depth (or depth/stencil) format
    pub fn is_depth(self) -> bool {
        matches!(self, Format::D32Float | Format::D24UnormS8Uint | Format::D16Unorm)
    }

    /// Carries a stencil aspect
    pub fn has_stencil(self) -> bool {
        matches!(self, Format::D24UnormS8Uint)
    }

    /// 32-bit float vector format for a vertex input of `components` floats
    pub fn float_vector(components: u32) -> Option<Format> {
        match components {
            1 => Some(Format::R32Float),
            2 => Some(Format::R32G32Float),
            3 => Some(Format::R32G32B32Float),
            4 => Some(Format::R32G32B32A32Float),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Format;

    #[test]
    fn test_float_vector_from_component_count() {
        assert_eq!(Format::float_vector(1), Some(Format::R32Float));
        assert_eq!(Format::float_vector(2), Some(Format::R32G32Float));
        assert_eq!(Format::float_vector(3), Some(Format::R32G32B32Float));
        assert_eq!(Format::float_vector(4), Some(Format::R32G32B32A32Float));
        assert_eq!(Format::float_vector(5), None);
    }

    #[test]
    fn test_num_bytes() {
        assert_eq!(Format::R32G32B32Float.num_bytes(), 12);
        assert_eq!(Format::R8G8B8A8Unorm.num_bytes(), 4);
        assert_eq!(Format::D16Unorm.num_bytes(), 2);
        assert_eq!(Format::Undefined.num_bytes(), 0);
    }

    #[test]
    fn test_depth_formats() {
        assert!(Format::D24UnormS8Uint.is_depth());
        assert!(Format::D24UnormS8Uint.has_stencil());
        assert!(!Format::D32Float.has_stencil());
        assert!(!Format::R32Float.is_depth());
    }
}
