/*!
# Cave Engine

Rendering abstraction layer and 2D quad renderer of the Cave engine.

The crate exposes a backend-agnostic rendering API built from a small set of
reference-counted GPU resources, a renderer facade that forwards frame and
pass control to a backend, and a batched quad renderer on top of it. The only
backend shipped is a CPU software device, so everything runs headless.

## Architecture

- **RenderingContext**: graphics device + swapchain bound to one window
- **Framebuffer**: owned color attachments, or the swapchain back buffer
- **RenderPass**: target framebuffer + load/store operations + pipeline state
- **Texture / VertexBuffer / IndexBuffer / Shader**: GPU resources shared via `Arc`
- **Renderer**: facade over a `RendererInterface` backend
- **Renderer2D**: quad batcher drawing up to 4096 quads per draw call
- **Engine / GameLoop**: frame driver owning the renderer

Backends implement the `GraphicsDevice` and `RendererInterface` traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod platform;
pub mod renderer;

// Main cave namespace module
pub mod cave {
    // Error types
    pub use crate::error::{Error, Result};

    // Frame driver
    pub use crate::engine::{Engine, GameLoop, FIRST_FRAME_DELTA_TIME};

    // Renderer facade and quad batcher
    pub use crate::renderer::{Renderer, Renderer2D, RendererConfig};

    // Logging sub-module (types and configuration, macros stay at the crate root)
    pub mod log {
        pub use crate::log::{
            min_severity, reset_logger, set_logger, set_min_severity, DefaultLogger, LogEntry,
            LogSeverity, Logger,
        };
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }

    // Platform sub-module
    pub mod platform {
        pub use crate::platform::*;
    }
}

// Re-export math library at crate root
pub use glam;
