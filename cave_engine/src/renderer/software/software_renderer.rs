/// Software implementation of the RendererInterface
///
/// Translates pass and draw requests into immediate-context calls on the
/// rendering context's graphics device.

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{
    DrawIndexedCommand, IndexBuffer, RenderPass, RenderPassAttachmentLoadOperation, RendererApi,
    RendererConfig, RendererInterface, RendererStats, RenderingContext, Texture, VertexBuffer,
    Viewport,
};

#[derive(Default)]
pub struct SoftwareRenderer {
    initialized: bool,
    active_render_pass: Option<Arc<RenderPass>>,
    stats: RendererStats,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass currently bound, if any
    pub fn active_render_pass(&self) -> Option<&Arc<RenderPass>> {
        self.active_render_pass.as_ref()
    }
}

impl RendererInterface for SoftwareRenderer {
    fn renderer_api(&self) -> RendererApi {
        RendererApi::Software
    }

    fn initialize(&mut self, config: &RendererConfig) -> Result<()> {
        if self.initialized {
            crate::engine_bail!("cave::software", AlreadyInitialized, "software renderer already initialized");
        }
        self.initialized = true;
        self.stats = RendererStats::default();
        crate::engine_info!("cave::software", "Software renderer initialized for '{}'", config.app_name);
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.active_render_pass.take().is_some() {
            crate::engine_warn!("cave::software", "Shutting down with an active render pass");
        }
        self.initialized = false;
        crate::engine_info!(
            "cave::software",
            "Software renderer shut down after {} frame(s)",
            self.stats.frames_presented
        );
    }

    fn begin_frame(&mut self, _context: &RenderingContext) -> Result<()> {
        crate::engine_assert!(self.initialized, "cave::software", "begin_frame before initialize");
        self.stats = RendererStats {
            frames_presented: self.stats.frames_presented,
            ..RendererStats::default()
        };
        Ok(())
    }

    fn end_frame(&mut self, context: &RenderingContext) -> Result<()> {
        crate::engine_assert!(
            self.active_render_pass.is_none(),
            "cave::software",
            "end_frame with an active render pass"
        );
        context.present()?;
        self.stats.frames_presented += 1;
        Ok(())
    }

    fn begin_render_pass(&mut self, context: &RenderingContext, render_pass: &Arc<RenderPass>) -> Result<()> {
        crate::engine_assert!(
            self.active_render_pass.is_none(),
            "cave::software",
            "begin_render_pass while another render pass is active"
        );

        let device = context.device();
        let pipeline = render_pass.pipeline_description();
        device.set_input_layout(render_pass.input_layout());
        device.set_primitive_topology(pipeline.topology);
        for (stage, module) in pipeline.shader.modules() {
            device.set_shader_module(stage, module);
        }
        device.set_rasterizer_state(render_pass.rasterizer_state());

        let framebuffer = render_pass.target_framebuffer();
        device.set_viewport(Viewport::full(framebuffer.width(), framebuffer.height()));

        let mut views = Vec::with_capacity(framebuffer.attachment_count());
        for index in 0..framebuffer.attachment_count() {
            match framebuffer.attachment_image_view(index) {
                Some(view) => views.push(view),
                None => crate::engine_bail!(
                    "cave::software",
                    InvalidResource,
                    "attachment {} of framebuffer {:?} is released",
                    index,
                    framebuffer.id()
                ),
            }
        }
        device.set_render_targets(&views);

        for (view, attachment) in views.iter().zip(render_pass.attachments()) {
            if attachment.load_operation == RenderPassAttachmentLoadOperation::Clear {
                device.clear_render_target(*view, attachment.clear_color);
            }
        }

        self.active_render_pass = Some(Arc::clone(render_pass));
        self.stats.render_passes += 1;
        Ok(())
    }

    fn end_render_pass(&mut self, _context: &RenderingContext) {
        crate::engine_assert!(
            self.active_render_pass.is_some(),
            "cave::software",
            "end_render_pass without an active render pass"
        );
        self.active_render_pass = None;
    }

    fn has_active_render_pass(&self) -> bool {
        self.active_render_pass.is_some()
    }

    fn bind_input_texture(&mut self, context: &RenderingContext, texture: &Arc<Texture>, slot: u32) {
        crate::engine_assert!(
            self.active_render_pass.is_some(),
            "cave::software",
            "bind_input_texture without an active render pass"
        );
        context
            .device()
            .set_input_texture(slot, texture.native_image_view(), texture.native_sampler());
        self.stats.texture_binds += 1;
    }

    fn draw_indexed(
        &mut self,
        context: &RenderingContext,
        vertex_buffer: &VertexBuffer,
        index_buffer: &IndexBuffer,
        indices_count: u32,
    ) -> Result<()> {
        let vertex_stride = match &self.active_render_pass {
            Some(render_pass) => render_pass.vertex_stride(),
            None => crate::engine_fatal!("cave::software", "draw_indexed without an active render pass"),
        };

        context.device().draw_indexed(&DrawIndexedCommand {
            vertex_buffer: vertex_buffer.native_handle(),
            vertex_stride,
            index_buffer: index_buffer.native_handle(),
            index_type: index_buffer.data_type(),
            index_count: indices_count,
        })?;

        self.stats.draw_calls += 1;
        self.stats.indices += indices_count as u64;
        self.stats.triangles += (indices_count / 3) as u64;
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        self.stats
    }
}
