/// Renderer2D - batched colored quads on top of the Renderer facade
///
/// Quads are staged on the CPU and flushed in batches of at most
/// [`MAX_QUADS_PER_BATCH`]. Every batch reuses one immutable index buffer
/// holding the `[0, 1, 2, 2, 3, 0]` pattern for every quad slot, and one
/// dynamic vertex buffer rewritten on each flush.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::error::Result;
use crate::renderer::{
    Color4, Framebuffer, FramebufferAttachmentDescription, FramebufferDescription, ImageFormat,
    IndexBuffer, IndexBufferDataType, IndexBufferDescription, IndexBufferUpdateFrequency,
    PipelineDescription, PipelineVertexAttributeType, RenderPass, RenderPassAttachmentDescription,
    RenderPassDescription, Renderer, Shader, ShaderDescription, ShaderStage,
    ShaderStageDescription, VertexBuffer, VertexBufferDescription, VertexBufferUpdateFrequency,
};

/// Quads drawn by one `draw_indexed` call
pub const MAX_QUADS_PER_BATCH: usize = 4096;

pub const VERTICES_PER_QUAD: usize = 4;

pub const INDICES_PER_QUAD: usize = 6;

/// Vertex stage source, looked up in `RendererConfig::shader_directory`
pub const QUAD_VERTEX_SHADER_FILE: &str = "renderer_2d_quad.vs.hlsl";

/// Fragment stage source, looked up in `RendererConfig::shader_directory`
pub const QUAD_FRAGMENT_SHADER_FILE: &str = "renderer_2d_quad.ps.hlsl";

/// Quad corner: Float2 POSITION followed by Float4 COLOR, 24 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: Vec2,
    pub color: Color4,
}

/// Batched quad renderer
///
/// Owns its render pass, which keeps the target framebuffer alive. A
/// `Renderer2D` drawing into the swapchain must be dropped before the
/// `Renderer` shuts down.
pub struct Renderer2D {
    render_pass: Arc<RenderPass>,
    shader: Arc<Shader>,
    index_buffer: Arc<IndexBuffer>,
    vertex_buffer: Arc<VertexBuffer>,
    quad_vertices: Vec<QuadVertex>,
    current_quad_count: usize,
    frame_quad_count: usize,
    flush_count: usize,
}

impl Renderer2D {
    /// Create a quad renderer drawing into `target_framebuffer`
    ///
    /// # Arguments
    ///
    /// * `renderer` - Initialized renderer; its shader directory holds the quad shaders
    /// * `target_framebuffer` - Single-attachment framebuffer to draw into
    ///
    /// # Errors
    ///
    /// `FileReadFailed` if a quad shader file is missing, or any shader,
    /// pipeline or buffer creation error.
    pub fn create(renderer: &Renderer, target_framebuffer: Arc<Framebuffer>) -> Result<Renderer2D> {
        crate::engine_assert!(
            target_framebuffer.attachment_count() == 1,
            "cave::Renderer2D",
            "target framebuffer must have exactly one attachment, got {}",
            target_framebuffer.attachment_count()
        );

        let context = renderer.rendering_context();
        let shader_directory = &renderer.config().shader_directory;

        let shader = Shader::create(
            context,
            &ShaderDescription {
                stages: vec![
                    ShaderStageDescription::from_file(
                        ShaderStage::Vertex,
                        shader_directory.join(QUAD_VERTEX_SHADER_FILE),
                    )?,
                    ShaderStageDescription::from_file(
                        ShaderStage::Fragment,
                        shader_directory.join(QUAD_FRAGMENT_SHADER_FILE),
                    )?,
                ],
            },
        )?;

        let pipeline_description = PipelineDescription::new(Arc::clone(&shader))
            .with_attribute(PipelineVertexAttributeType::Float2, "POSITION")
            .with_attribute(PipelineVertexAttributeType::Float4, "COLOR");

        let render_pass = RenderPass::create(
            context,
            RenderPassDescription {
                target_framebuffer,
                target_framebuffer_attachments: vec![RenderPassAttachmentDescription::clear(Color4::BLACK)],
                pipeline_description,
            },
        )?;

        let indices = generate_quad_indices(MAX_QUADS_PER_BATCH);
        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
        let index_buffer = IndexBuffer::create(
            context,
            &IndexBufferDescription {
                size: index_bytes.len(),
                data_type: IndexBufferDataType::UInt32,
                update_frequency: IndexBufferUpdateFrequency::Never,
                data: Some(index_bytes),
            },
        )?;

        let vertex_buffer = VertexBuffer::create(
            context,
            &VertexBufferDescription {
                size: MAX_QUADS_PER_BATCH * VERTICES_PER_QUAD * std::mem::size_of::<QuadVertex>(),
                update_frequency: VertexBufferUpdateFrequency::Often,
                data: None,
            },
        )?;

        crate::engine_debug!(
            "cave::Renderer2D",
            "Quad renderer created for a {}x{} target",
            render_pass.target_framebuffer().width(),
            render_pass.target_framebuffer().height()
        );

        Ok(Renderer2D {
            render_pass,
            shader,
            index_buffer,
            vertex_buffer,
            quad_vertices: Vec::with_capacity(MAX_QUADS_PER_BATCH * VERTICES_PER_QUAD),
            current_quad_count: 0,
            frame_quad_count: 0,
            flush_count: 0,
        })
    }

    /// Create a quad renderer drawing into the swapchain back buffer
    pub fn create_for_swapchain(renderer: &Renderer) -> Result<Renderer2D> {
        let target = Framebuffer::create_swapchain_target(renderer.rendering_context());
        Self::create(renderer, target)
    }

    /// Create a quad renderer with its own `width` x `height` B8G8R8A8 target
    pub fn create_with_target_size(renderer: &Renderer, width: u32, height: u32) -> Result<Renderer2D> {
        let target = Framebuffer::create(
            renderer.rendering_context(),
            &FramebufferDescription {
                width,
                height,
                attachments: vec![FramebufferAttachmentDescription::with_format(ImageFormat::B8G8R8A8)],
            },
        )?;
        Self::create(renderer, target)
    }

    /// Begin the quad render pass (clears the target to black)
    pub fn begin_frame(&mut self, renderer: &mut Renderer) -> Result<()> {
        renderer.begin_render_pass(&self.render_pass)?;
        self.quad_vertices.clear();
        self.current_quad_count = 0;
        self.frame_quad_count = 0;
        self.flush_count = 0;
        Ok(())
    }

    /// Flush the pending quads and end the quad render pass
    ///
    /// The pass is closed even when the flush fails.
    pub fn end_frame(&mut self, renderer: &mut Renderer) -> Result<()> {
        let flushed = self.flush_quad_batch(renderer);
        renderer.end_render_pass();
        flushed
    }

    /// Queue an axis-aligned quad centered on `translation`
    ///
    /// # Arguments
    ///
    /// * `translation` - Quad center in normalized device coordinates
    /// * `scale` - Full width and height
    /// * `color` - Color of all four corners
    pub fn submit_quad(&mut self, renderer: &mut Renderer, translation: Vec2, scale: Vec2, color: Color4) -> Result<()> {
        if self.current_quad_count >= MAX_QUADS_PER_BATCH {
            self.flush_quad_batch(renderer)?;
        }

        self.quad_vertices.extend_from_slice(&construct_quad(translation, scale, color));
        self.current_quad_count += 1;
        self.frame_quad_count += 1;
        Ok(())
    }

    /// Draw the staged quads, if any
    ///
    /// The batch is emptied whether or not the draw succeeds.
    pub fn flush_quad_batch(&mut self, renderer: &mut Renderer) -> Result<()> {
        if self.current_quad_count == 0 {
            return Ok(());
        }

        let drawn = self.draw_staged_quads(renderer);
        self.quad_vertices.clear();
        self.current_quad_count = 0;
        drawn
    }

    fn draw_staged_quads(&mut self, renderer: &mut Renderer) -> Result<()> {
        let vertex_count = self.current_quad_count * VERTICES_PER_QUAD;
        self.vertex_buffer
            .upload_data(bytemuck::cast_slice(&self.quad_vertices[..vertex_count]))?;

        let indices_count = (self.current_quad_count * INDICES_PER_QUAD) as u32;
        renderer.draw_indexed(&self.vertex_buffer, &self.index_buffer, indices_count)?;

        crate::engine_trace!(
            "cave::Renderer2D",
            "Flushed {} quad(s) ({} indices)",
            self.current_quad_count,
            indices_count
        );
        self.flush_count += 1;
        Ok(())
    }

    /// Quads staged since the last flush
    pub fn current_quad_count(&self) -> usize {
        self.current_quad_count
    }

    /// Quads submitted since `begin_frame`
    pub fn frame_quad_count(&self) -> usize {
        self.frame_quad_count
    }

    /// Batches drawn since `begin_frame`
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn target_framebuffer(&self) -> &Arc<Framebuffer> {
        self.render_pass.target_framebuffer()
    }

    pub fn target_width(&self) -> u32 {
        self.render_pass.target_framebuffer().width()
    }

    pub fn target_height(&self) -> u32 {
        self.render_pass.target_framebuffer().height()
    }
}

/// Corners of a quad in bottom-left, bottom-right, top-right, top-left order
pub fn construct_quad(translation: Vec2, scale: Vec2, color: Color4) -> [QuadVertex; 4] {
    let half = scale * 0.5;
    [
        QuadVertex { position: translation + Vec2::new(-half.x, -half.y), color },
        QuadVertex { position: translation + Vec2::new(half.x, -half.y), color },
        QuadVertex { position: translation + Vec2::new(half.x, half.y), color },
        QuadVertex { position: translation + Vec2::new(-half.x, half.y), color },
    ]
}

/// Two triangles per quad: `[4i, 4i+1, 4i+2, 4i+2, 4i+3, 4i]`
pub fn generate_quad_indices(quad_count: usize) -> Vec<u32> {
    (0..quad_count as u32)
        .flat_map(|quad| {
            let base = quad * VERTICES_PER_QUAD as u32;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

#[cfg(test)]
#[path = "renderer_2d_tests.rs"]
mod tests;
