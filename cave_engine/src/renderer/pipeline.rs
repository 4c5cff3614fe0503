/// Pipeline description: vertex layout, shader and rasterizer configuration

use std::sync::Arc;

use crate::renderer::{Shader, VertexInputElement};

/// Type of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineVertexAttributeType {
    Float1,
    Float2,
    Float3,
    Float4,
}

impl PipelineVertexAttributeType {
    /// Size of the attribute in bytes
    pub fn size_bytes(self) -> u32 {
        self.component_count() * 4
    }

    /// Number of f32 components
    pub fn component_count(self) -> u32 {
        match self {
            PipelineVertexAttributeType::Float1 => 1,
            PipelineVertexAttributeType::Float2 => 2,
            PipelineVertexAttributeType::Float3 => 3,
            PipelineVertexAttributeType::Float4 => 4,
        }
    }
}

/// One vertex attribute, bound to the shader by semantic name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineVertexAttribute {
    pub attribute_type: PipelineVertexAttributeType,
    /// Shader semantic (e.g. "POSITION", "COLOR", "TEXCOORD")
    pub name: String,
}

impl PipelineVertexAttribute {
    pub fn new(attribute_type: PipelineVertexAttributeType, name: impl Into<String>) -> Self {
        Self { attribute_type, name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineTopology {
    #[default]
    TriangleList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineFillMode {
    #[default]
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineCullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Winding order of front-facing triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineFrontFaceDirection {
    Clockwise,
    #[default]
    CounterClockwise,
}

/// Everything a render pass needs to build its pipeline state
#[derive(Clone)]
pub struct PipelineDescription {
    /// Vertex attributes in declaration order
    pub vertex_attributes: Vec<PipelineVertexAttribute>,
    pub shader: Arc<Shader>,
    pub topology: PipelineTopology,
    pub fill_mode: PipelineFillMode,
    pub cull_mode: PipelineCullMode,
    pub front_face: PipelineFrontFaceDirection,
}

impl PipelineDescription {
    /// Triangle list, solid fill, no culling, counter-clockwise front faces
    pub fn new(shader: Arc<Shader>) -> Self {
        Self {
            vertex_attributes: Vec::new(),
            shader,
            topology: PipelineTopology::default(),
            fill_mode: PipelineFillMode::default(),
            cull_mode: PipelineCullMode::default(),
            front_face: PipelineFrontFaceDirection::default(),
        }
    }

    /// Append a vertex attribute
    pub fn with_attribute(mut self, attribute_type: PipelineVertexAttributeType, name: &str) -> Self {
        self.vertex_attributes.push(PipelineVertexAttribute::new(attribute_type, name));
        self
    }
}

/// Compute input elements and vertex stride from an ordered attribute list
///
/// Offsets accumulate in declaration order; the stride is the sum of all
/// attribute sizes. Repeated semantics get increasing semantic indices.
///
/// # Returns
///
/// `(elements, stride)`
pub fn compute_vertex_input_layout(
    attributes: &[PipelineVertexAttribute],
) -> (Vec<VertexInputElement>, u32) {
    let mut elements: Vec<VertexInputElement> = Vec::with_capacity(attributes.len());
    let mut offset = 0u32;

    for attribute in attributes {
        let semantic_index = elements
            .iter()
            .filter(|element| element.semantic_name == attribute.name)
            .count() as u32;
        elements.push(VertexInputElement {
            semantic_name: attribute.name.clone(),
            semantic_index,
            attribute_type: attribute.attribute_type,
            offset,
        });
        offset += attribute.attribute_type.size_bytes();
    }

    (elements, offset)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
