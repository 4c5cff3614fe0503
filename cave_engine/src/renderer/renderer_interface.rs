/// RendererInterface - per-backend frame, pass and draw submission

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{
    IndexBuffer, RenderPass, RendererApi, RendererConfig, RenderingContext, Texture, VertexBuffer,
};
use crate::renderer::software::SoftwareRenderer;

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Number of draw calls this frame
    pub draw_calls: u32,
    /// Number of indices submitted this frame
    pub indices: u64,
    /// Number of triangles submitted this frame
    pub triangles: u64,
    /// Render passes begun this frame
    pub render_passes: u32,
    /// Texture bindings this frame
    pub texture_binds: u32,
    /// Frames presented since initialization
    pub frames_presented: u64,
}

/// Backend implementation behind the `Renderer` facade
///
/// At most one render pass is active at a time; beginning a second pass or
/// ending a pass that was never begun is fatal. Draws and texture bindings
/// also require an active pass.
pub trait RendererInterface {
    fn renderer_api(&self) -> RendererApi;

    fn initialize(&mut self, config: &RendererConfig) -> Result<()>;

    fn shutdown(&mut self);

    fn begin_frame(&mut self, context: &RenderingContext) -> Result<()>;

    /// Finish the frame and present the swapchain
    fn end_frame(&mut self, context: &RenderingContext) -> Result<()>;

    /// Bind the pass pipeline and target framebuffer, clearing attachments
    /// whose load operation is `Clear`
    fn begin_render_pass(&mut self, context: &RenderingContext, render_pass: &Arc<RenderPass>) -> Result<()>;

    fn end_render_pass(&mut self, context: &RenderingContext);

    fn has_active_render_pass(&self) -> bool;

    /// Bind a texture to a fragment-stage slot
    fn bind_input_texture(&mut self, context: &RenderingContext, texture: &Arc<Texture>, slot: u32);

    /// Draw `indices_count` indices with the active pass pipeline
    fn draw_indexed(
        &mut self,
        context: &RenderingContext,
        vertex_buffer: &VertexBuffer,
        index_buffer: &IndexBuffer,
        indices_count: u32,
    ) -> Result<()>;

    fn stats(&self) -> RendererStats;
}

/// Create the renderer interface for a backend
pub fn create_renderer_interface(api: RendererApi) -> Result<Box<dyn RendererInterface>> {
    if !api.is_available() {
        crate::engine_bail!(
            "cave::RendererInterface",
            InitializationFailed,
            "renderer API '{}' is not available on this platform",
            api
        );
    }
    match api {
        RendererApi::Software => Ok(Box::new(SoftwareRenderer::new())),
    }
}
