/// Backend selection

use std::fmt;

/// Graphics backends known to the engine
///
/// Backend dispatch (`create_graphics_device`, `create_renderer_interface`)
/// matches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererApi {
    /// CPU rasterizer, available on every platform
    Software,
}

impl RendererApi {
    /// Every backend compiled into this build
    pub const ALL: [RendererApi; 1] = [RendererApi::Software];

    /// Whether the backend can be used on the current platform
    pub fn is_available(self) -> bool {
        match self {
            RendererApi::Software => true,
        }
    }

    /// Backend picked when the configuration does not name one
    pub fn recommended_for_current_platform() -> Self {
        RendererApi::Software
    }

    pub fn name(self) -> &'static str {
        match self {
            RendererApi::Software => "Software",
        }
    }
}

impl Default for RendererApi {
    fn default() -> Self {
        Self::recommended_for_current_platform()
    }
}

impl fmt::Display for RendererApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
