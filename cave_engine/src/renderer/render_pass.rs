/// RenderPass - target framebuffer + per-attachment load/store + pipeline
///
/// Immutable once created. The backend pipeline objects (input layout,
/// rasterizer state) are built at construction and released on drop.

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{
    compute_vertex_input_layout, Color4, Framebuffer, GraphicsDevice, NativeInputLayout,
    NativeRasterizerState, PipelineDescription, RasterizerDescription, RenderingContext,
    ShaderStage, VertexInputElement,
};

/// What happens to an attachment's contents when the pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPassAttachmentLoadOperation {
    /// Keep the previous contents
    #[default]
    Load,
    /// Fill with the attachment's clear color
    Clear,
    /// Contents are undefined
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPassAttachmentStoreOperation {
    #[default]
    Store,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderPassAttachmentDescription {
    pub load_operation: RenderPassAttachmentLoadOperation,
    pub store_operation: RenderPassAttachmentStoreOperation,
    pub clear_color: Color4,
}

impl RenderPassAttachmentDescription {
    /// Clear to `color` on begin, store on end
    pub fn clear(color: Color4) -> Self {
        Self {
            load_operation: RenderPassAttachmentLoadOperation::Clear,
            store_operation: RenderPassAttachmentStoreOperation::Store,
            clear_color: color,
        }
    }
}

/// Descriptor for creating a render pass
#[derive(Clone)]
pub struct RenderPassDescription {
    pub target_framebuffer: Arc<Framebuffer>,
    /// One entry per target framebuffer attachment
    pub target_framebuffer_attachments: Vec<RenderPassAttachmentDescription>,
    pub pipeline_description: PipelineDescription,
}

pub struct RenderPass {
    device: Arc<dyn GraphicsDevice>,
    target_framebuffer: Arc<Framebuffer>,
    attachments: Vec<RenderPassAttachmentDescription>,
    pipeline_description: PipelineDescription,
    vertex_input_elements: Vec<VertexInputElement>,
    vertex_stride: u32,
    input_layout: NativeInputLayout,
    rasterizer_state: NativeRasterizerState,
}

impl RenderPass {
    /// Build a render pass and its pipeline state
    ///
    /// A mismatch between the attachment descriptions and the framebuffer's
    /// attachment count, or a shader without a vertex stage, is fatal.
    pub fn create(context: &RenderingContext, desc: RenderPassDescription) -> Result<Arc<RenderPass>> {
        let framebuffer_attachments = desc.target_framebuffer.attachment_count();
        crate::engine_assert!(
            desc.target_framebuffer_attachments.len() == framebuffer_attachments,
            "cave::RenderPass",
            "{} attachment description(s) for a framebuffer with {} attachment(s)",
            desc.target_framebuffer_attachments.len(),
            framebuffer_attachments
        );

        let (vertex_input_elements, vertex_stride) =
            compute_vertex_input_layout(&desc.pipeline_description.vertex_attributes);

        let vertex_module = match desc.pipeline_description.shader.module(ShaderStage::Vertex) {
            Some(module) => module,
            None => crate::engine_fatal!("cave::RenderPass", "pipeline shader has no vertex stage"),
        };

        let device = Arc::clone(context.device());
        let input_layout = device.create_input_layout(&vertex_input_elements, vertex_module)?;
        let rasterizer_state = match device.create_rasterizer_state(&RasterizerDescription {
            fill_mode: desc.pipeline_description.fill_mode,
            cull_mode: desc.pipeline_description.cull_mode,
            front_face: desc.pipeline_description.front_face,
        }) {
            Ok(state) => state,
            Err(error) => {
                device.destroy_input_layout(input_layout);
                return Err(error);
            }
        };

        crate::engine_debug!(
            "cave::RenderPass",
            "Render pass created: {} attachment(s), {} vertex attribute(s), stride {}",
            framebuffer_attachments,
            vertex_input_elements.len(),
            vertex_stride
        );

        Ok(Arc::new(RenderPass {
            device,
            target_framebuffer: desc.target_framebuffer,
            attachments: desc.target_framebuffer_attachments,
            pipeline_description: desc.pipeline_description,
            vertex_input_elements,
            vertex_stride,
            input_layout,
            rasterizer_state,
        }))
    }

    pub fn target_framebuffer(&self) -> &Arc<Framebuffer> {
        &self.target_framebuffer
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Load/store description of attachment `index` (fatal if out of range)
    pub fn attachment(&self, index: usize) -> &RenderPassAttachmentDescription {
        crate::engine_assert!(
            index < self.attachments.len(),
            "cave::RenderPass",
            "attachment index {} out of range ({} attachments)",
            index,
            self.attachments.len()
        );
        &self.attachments[index]
    }

    pub fn attachments(&self) -> &[RenderPassAttachmentDescription] {
        &self.attachments
    }

    pub fn pipeline_description(&self) -> &PipelineDescription {
        &self.pipeline_description
    }

    pub fn vertex_input_elements(&self) -> &[VertexInputElement] {
        &self.vertex_input_elements
    }

    /// Bytes per vertex, the sum of the attribute sizes
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }

    pub fn input_layout(&self) -> NativeInputLayout {
        self.input_layout
    }

    pub fn rasterizer_state(&self) -> NativeRasterizerState {
        self.rasterizer_state
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        self.device.destroy_rasterizer_state(self.rasterizer_state);
        self.device.destroy_input_layout(self.input_layout);
    }
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
