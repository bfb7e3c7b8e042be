//! Image usage flags, formats and view types.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Image can be the source of a copy.
        const TRANSFER_SRC = 1 << 0;
        /// Image can be the destination of a copy.
        const TRANSFER_DST = 1 << 1;
        /// Image can be the source of a blit.
        const BLIT_SRC = 1 << 2;
        /// Image can be the destination of a blit.
        const BLIT_DST = 1 << 3;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 4;
        /// Image can be used as read/write storage.
        const STORAGE = 1 << 5;
        /// Image can be used as a color attachment.
        const COLOR_ATTACHMENT = 1 << 6;
        /// Image can be used as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 7;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Image dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageDimension {
    D1,
    #[default]
    D2,
    D3,
    Cube,
}

/// Texel format of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    R8Unorm,
    Rg8Unorm,
    #[default]
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    R16Float,
    Rgba16Float,
    R32Uint,
    R32Float,
    Rgba32Float,
    Depth32Float,
    Depth24PlusStencil8,
}

impl Format {
    /// Bytes per texel for tightly packed data.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm => 2,
            Self::Rgba8Unorm | Self::Rgba8Srgb | Self::Bgra8Unorm => 4,
            Self::R16Float => 2,
            Self::Rgba16Float => 8,
            Self::R32Uint | Self::R32Float => 4,
            Self::Rgba32Float => 16,
            Self::Depth32Float => 4,
            Self::Depth24PlusStencil8 => 4,
        }
    }

    /// Whether this format has a depth aspect.
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float | Self::Depth24PlusStencil8)
    }

    /// Whether this format has a stencil aspect.
    pub fn is_stencil(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8)
    }
}

/// How an image is viewed from a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageViewType {
    D1,
    D1Array,
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sizes() {
        assert_eq!(Format::R8Unorm.bytes_per_texel(), 1);
        assert_eq!(Format::Rgba8Unorm.bytes_per_texel(), 4);
        assert_eq!(Format::Rgba16Float.bytes_per_texel(), 8);
        assert_eq!(Format::Rgba32Float.bytes_per_texel(), 16);
    }

    #[test]
    fn test_format_aspects() {
        assert!(Format::Depth32Float.is_depth());
        assert!(!Format::Depth32Float.is_stencil());
        assert!(Format::Depth24PlusStencil8.is_stencil());
        assert!(!Format::Rgba8Unorm.is_depth());
    }
}
