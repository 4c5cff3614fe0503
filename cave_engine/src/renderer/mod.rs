/// Renderer module - rendering context, GPU resources, the renderer facade
/// and the 2D quad batcher

// Module declarations
pub mod renderer_api;
pub mod color;
pub mod image;
pub mod pipeline;
pub mod graphics_device;
pub mod shader;
pub mod vertex_buffer;
pub mod index_buffer;
pub mod texture;
pub mod rendering_context;
pub mod framebuffer;
pub mod render_pass;
pub mod renderer_interface;
pub mod renderer;
pub mod renderer_2d;
pub mod software;

// Re-export everything from renderer.rs
pub use renderer::*;

// Re-export from other modules
pub use renderer_api::*;
pub use color::*;
pub use image::*;
pub use pipeline::*;
pub use graphics_device::*;
pub use shader::*;
pub use vertex_buffer::*;
pub use index_buffer::*;
pub use texture::*;
pub use rendering_context::RenderingContext;
pub(crate) use rendering_context::Swapchain;
pub use framebuffer::*;
pub use render_pass::*;
pub use renderer_interface::*;
pub use renderer_2d::*;
pub use software::{SoftwareDevice, SoftwareRenderer};
