/// Renderer facade - owns the backend interface, the rendering context and
/// the default textures, and routes every frame/pass/draw call to the backend
///
/// State machine:
/// `Uninitialized -> Initialized -> (FrameActive -> [PassActive]* -> FrameActive)* -> Shutdown`

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::platform::Window;
use crate::renderer::{
    create_renderer_interface, ImageFilteringMode, ImageFormat, IndexBuffer, RenderPass,
    RendererApi, RendererInterface, RendererStats, RenderingContext, Texture,
    TextureDescription, VertexBuffer,
};

/// Packed RGBA of the default white texture
pub const WHITE_TEXTURE_RGBA: u32 = 0xFFFFFFFF;

/// Packed RGBA of the default black texture
pub const BLACK_TEXTURE_RGBA: u32 = 0x000000FF;

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Backend to instantiate
    pub renderer_api: RendererApi,
    /// Swapchain pixel format
    pub swapchain_format: ImageFormat,
    /// Number of swapchain images
    pub swapchain_image_count: u32,
    /// Directory holding the shader-stage source files
    pub shader_directory: PathBuf,
    /// Application name
    pub app_name: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            renderer_api: RendererApi::recommended_for_current_platform(),
            swapchain_format: ImageFormat::B8G8R8A8,
            swapchain_image_count: 2,
            shader_directory: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
            app_name: "Cave Application".to_string(),
        }
    }
}

// Field order is drop order: textures, then context, then backend.
struct RendererState {
    white_texture: Arc<Texture>,
    black_texture: Arc<Texture>,
    rendering_context: RenderingContext,
    interface: Box<dyn RendererInterface>,
    config: RendererConfig,
    frame_active: bool,
}

/// Renderer facade
///
/// # Example
///
/// ```no_run
/// use cave_engine::cave::{Renderer, RendererConfig};
/// use cave_engine::cave::platform::HeadlessWindow;
///
/// let mut renderer = Renderer::new();
/// renderer.initialize(&HeadlessWindow::new(640, 480), RendererConfig::default())?;
/// renderer.begin_frame()?;
/// renderer.end_frame()?;
/// renderer.shutdown();
/// # Ok::<(), cave_engine::cave::Error>(())
/// ```
#[derive(Default)]
pub struct Renderer {
    state: Option<RendererState>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Create the backend interface, the rendering context and the default
    /// textures
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if called twice without `shutdown`, otherwise any
    /// backend or context creation error.
    pub fn initialize(&mut self, window: &dyn Window, config: RendererConfig) -> Result<()> {
        if self.state.is_some() {
            crate::engine_bail!("cave::Renderer", AlreadyInitialized, "renderer is already initialized");
        }

        let mut interface = create_renderer_interface(config.renderer_api)?;
        interface.initialize(&config)?;

        let rendering_context = match RenderingContext::create(window, &config) {
            Ok(context) => context,
            Err(error) => {
                interface.shutdown();
                return Err(error);
            }
        };

        let white_texture = create_default_texture(&rendering_context, WHITE_TEXTURE_RGBA);
        let black_texture = create_default_texture(&rendering_context, BLACK_TEXTURE_RGBA);
        let (white_texture, black_texture) = match (white_texture, black_texture) {
            (Ok(white), Ok(black)) => (white, black),
            (Err(error), _) | (_, Err(error)) => {
                drop(rendering_context);
                interface.shutdown();
                return Err(error);
            }
        };

        crate::engine_info!(
            "cave::Renderer",
            "Renderer initialized ({}, {}x{})",
            interface.renderer_api(),
            rendering_context.swapchain_width(),
            rendering_context.swapchain_height()
        );

        self.state = Some(RendererState {
            white_texture,
            black_texture,
            rendering_context,
            interface,
            config,
            frame_active: false,
        });
        Ok(())
    }

    /// Release the default textures, the rendering context and the backend,
    /// in that order
    ///
    /// Does nothing when the renderer is not initialized.
    pub fn shutdown(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        let RendererState {
            white_texture,
            black_texture,
            rendering_context,
            mut interface,
            ..
        } = state;

        drop(white_texture);
        drop(black_texture);
        drop(rendering_context);
        interface.shutdown();
        drop(interface);

        crate::engine_info!("cave::Renderer", "Renderer shut down");
    }

    pub fn begin_frame(&mut self) -> Result<()> {
        let state = self.state_mut("begin_frame");
        crate::engine_assert!(!state.frame_active, "cave::Renderer", "begin_frame called twice");
        state.interface.begin_frame(&state.rendering_context)?;
        state.frame_active = true;
        Ok(())
    }

    /// Finish the frame and present; no render pass may be active
    pub fn end_frame(&mut self) -> Result<()> {
        let state = self.state_mut("end_frame");
        crate::engine_assert!(state.frame_active, "cave::Renderer", "end_frame without begin_frame");
        crate::engine_assert!(
            !state.interface.has_active_render_pass(),
            "cave::Renderer",
            "end_frame with an active render pass"
        );
        state.frame_active = false;
        state.interface.end_frame(&state.rendering_context)
    }

    pub fn begin_render_pass(&mut self, render_pass: &Arc<RenderPass>) -> Result<()> {
        let state = self.state_mut("begin_render_pass");
        crate::engine_assert!(state.frame_active, "cave::Renderer", "begin_render_pass outside a frame");
        state.interface.begin_render_pass(&state.rendering_context, render_pass)
    }

    pub fn end_render_pass(&mut self) {
        let state = self.state_mut("end_render_pass");
        state.interface.end_render_pass(&state.rendering_context);
    }

    pub fn draw_indexed(
        &mut self,
        vertex_buffer: &VertexBuffer,
        index_buffer: &IndexBuffer,
        indices_count: u32,
    ) -> Result<()> {
        let state = self.state_mut("draw_indexed");
        state
            .interface
            .draw_indexed(&state.rendering_context, vertex_buffer, index_buffer, indices_count)
    }

    pub fn bind_input_texture(&mut self, texture: &Arc<Texture>, slot: u32) {
        let state = self.state_mut("bind_input_texture");
        state.interface.bind_input_texture(&state.rendering_context, texture, slot);
    }

    /// Resize the swapchain; swapchain-target framebuffers follow
    pub fn on_window_resized(&mut self, width: u32, height: u32) -> Result<()> {
        crate::engine_debug!("cave::Renderer", "Window resized to {}x{}", width, height);
        self.state("on_window_resized")
            .rendering_context
            .invalidate_swapchain(width, height)
    }

    pub fn rendering_context(&self) -> &RenderingContext {
        &self.state("rendering_context").rendering_context
    }

    /// 1x1 opaque white texture
    pub fn white_texture(&self) -> &Arc<Texture> {
        &self.state("white_texture").white_texture
    }

    /// 1x1 opaque black texture
    pub fn black_texture(&self) -> &Arc<Texture> {
        &self.state("black_texture").black_texture
    }

    pub fn config(&self) -> &RendererConfig {
        &self.state("config").config
    }

    pub fn renderer_api(&self) -> RendererApi {
        self.state("renderer_api").interface.renderer_api()
    }

    pub fn stats(&self) -> RendererStats {
        self.state("stats").interface.stats()
    }

    pub fn is_frame_active(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.frame_active)
    }

    pub fn has_active_render_pass(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| state.interface.has_active_render_pass())
    }

    fn state(&self, operation: &str) -> &RendererState {
        match &self.state {
            Some(state) => state,
            None => crate::engine_fatal!("cave::Renderer", "{} on an uninitialized renderer", operation),
        }
    }

    fn state_mut(&mut self, operation: &str) -> &mut RendererState {
        match &mut self.state {
            Some(state) => state,
            None => crate::engine_fatal!("cave::Renderer", "{} on an uninitialized renderer", operation),
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn create_default_texture(context: &RenderingContext, rgba: u32) -> Result<Arc<Texture>> {
    let pixel = rgba.to_be_bytes();
    let mut desc = TextureDescription::new(1, 1, ImageFormat::R8G8B8A8, &pixel);
    desc.min_filter = ImageFilteringMode::Nearest;
    desc.mag_filter = ImageFilteringMode::Nearest;
    Texture::create(context, &desc)
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
