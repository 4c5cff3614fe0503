/// Image formats, sampling modes and image usage flags

use bitflags::bitflags;

/// Pixel format of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum ImageFormat {
    #[default]
    Unknown,
    /// 8-bit BGRA, the swapchain format
    B8G8R8A8,
    /// 8-bit RGBA
    R8G8B8A8,
}

impl ImageFormat {
    /// Size of one pixel in bytes (0 for Unknown)
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Unknown => 0,
            ImageFormat::B8G8R8A8 | ImageFormat::R8G8B8A8 => 4,
        }
    }
}

/// Texel filtering used when sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFilteringMode {
    Nearest,
    #[default]
    Linear,
}

/// Behavior of texture coordinates outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageAddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
}

bitflags! {
    /// How an image will be bound to the pipeline
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Can be bound as a render target
        const RENDER_TARGET = 1 << 0;
        /// Can be sampled from a shader
        const SHADER_RESOURCE = 1 << 1;
        /// Backs a swapchain and can be presented
        const PRESENT = 1 << 2;
    }
}
