/// GraphicsDevice trait - the backend seam below every renderer resource
///
/// Resources (textures, buffers, shaders, framebuffers, render passes) and the
/// rendering context never talk to a native API directly. They hold an
/// `Arc<dyn GraphicsDevice>` and manipulate opaque native handles through it.
/// The device also exposes the immediate context used by the renderer
/// interface to bind state and submit draws.

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::platform::NativeWindowHandle;
use crate::renderer::{
    Color4, ImageAddressMode, ImageFilteringMode, ImageFormat, ImageUsage,
    IndexBufferDataType, PipelineCullMode, PipelineFillMode, PipelineFrontFaceDirection,
    PipelineTopology, PipelineVertexAttributeType, RendererApi, RendererConfig,
    ShaderSource, ShaderStage,
};
use crate::renderer::software::SoftwareDevice;

// ============================================================================
// Native handles
// ============================================================================

macro_rules! native_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

native_handle! {
    /// Image (texture storage, render target, swapchain back buffer)
    NativeImage;
    /// View over an image, bindable as render target or shader input
    NativeImageView;
    NativeSampler;
    /// Vertex or index buffer
    NativeBuffer;
    /// One compiled shader stage
    NativeShaderModule;
    NativeInputLayout;
    NativeRasterizerState;
    NativeSwapchain;
}

/// Kinds of native objects tracked by [`DeviceResourceStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Image,
    ImageView,
    Sampler,
    Buffer,
    ShaderModule,
    InputLayout,
    RasterizerState,
    Swapchain,
}

// ============================================================================
// Descriptions
// ============================================================================

/// Descriptor for creating an image
#[derive(Debug, Clone, Copy)]
pub struct ImageDescription<'a> {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub usage: ImageUsage,
    /// Tightly packed pixels in `format` order, `width * height` pixels
    pub initial_data: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerDescription {
    pub min_filter: ImageFilteringMode,
    pub mag_filter: ImageFilteringMode,
    pub address_u: ImageAddressMode,
    pub address_v: ImageAddressMode,
    pub address_w: ImageAddressMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy)]
pub struct BufferDescription<'a> {
    pub kind: BufferKind,
    /// Size in bytes
    pub size: usize,
    /// Whether `upload_buffer` is allowed after creation
    pub cpu_writable: bool,
    pub initial_data: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy)]
pub struct SwapchainDescription {
    pub window: NativeWindowHandle,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub image_count: u32,
}

/// One element of an input layout, matched to the vertex shader by semantic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInputElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub attribute_type: PipelineVertexAttributeType,
    /// Byte offset inside one vertex record
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterizerDescription {
    pub fill_mode: PipelineFillMode,
    pub cull_mode: PipelineCullMode,
    pub front_face: PipelineFrontFaceDirection,
}

/// Viewport in render target pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Viewport covering a whole `width` x `height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32 }
    }
}

/// Indexed draw over the currently bound pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedCommand {
    pub vertex_buffer: NativeBuffer,
    /// Bytes between consecutive vertices
    pub vertex_stride: u32,
    pub index_buffer: NativeBuffer,
    pub index_type: IndexBufferDataType,
    pub index_count: u32,
}

// ============================================================================
// Readback and statistics
// ============================================================================

/// CPU copy of an image, always RGBA8 regardless of the image format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReadback {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// `width * height` pixels, row-major, top row first
    pub rgba: Vec<[u8; 4]>,
}

impl ImageReadback {
    /// Pixel at (x, y), `None` if out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.rgba.get((y * self.width + x) as usize).copied()
    }

    /// Number of pixels equal to `rgba`
    pub fn count_pixels(&self, rgba: [u8; 4]) -> usize {
        self.rgba.iter().filter(|pixel| **pixel == rgba).count()
    }
}

/// Live and destroyed native object counts per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceResourceStats {
    live: FxHashMap<ResourceKind, usize>,
    destroyed: FxHashMap<ResourceKind, usize>,
}

impl DeviceResourceStats {
    pub fn live(&self, kind: ResourceKind) -> usize {
        self.live.get(&kind).copied().unwrap_or(0)
    }

    pub fn destroyed(&self, kind: ResourceKind) -> usize {
        self.destroyed.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_live(&self) -> usize {
        self.live.values().sum()
    }

    pub(crate) fn record_created(&mut self, kind: ResourceKind) {
        *self.live.entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn record_destroyed(&mut self, kind: ResourceKind) {
        if let Some(count) = self.live.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
        *self.destroyed.entry(kind).or_insert(0) += 1;
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics device: native object factory plus immediate context
///
/// Destroy calls on unknown handles are ignored. Handles stay valid until
/// explicitly destroyed; the device never destroys objects on its own except
/// swapchain back buffers, which belong to their swapchain.
pub trait GraphicsDevice: Send + Sync {
    /// Backend implemented by this device
    fn renderer_api(&self) -> RendererApi;

    // ===== IMAGES =====

    fn create_image(&self, desc: &ImageDescription) -> Result<NativeImage>;

    fn create_image_view(&self, image: NativeImage) -> Result<NativeImageView>;

    fn destroy_image(&self, image: NativeImage);

    fn destroy_image_view(&self, view: NativeImageView);

    /// Copy an image back to the CPU
    fn read_image(&self, image: NativeImage) -> Result<ImageReadback>;

    fn create_sampler(&self, desc: &SamplerDescription) -> Result<NativeSampler>;

    fn destroy_sampler(&self, sampler: NativeSampler);

    // ===== BUFFERS =====

    fn create_buffer(&self, desc: &BufferDescription) -> Result<NativeBuffer>;

    /// Overwrite the start of a CPU-writable buffer
    ///
    /// # Arguments
    ///
    /// * `buffer` - Target buffer
    /// * `data` - Bytes written at offset 0, must fit in the buffer
    fn upload_buffer(&self, buffer: NativeBuffer, data: &[u8]) -> Result<()>;

    fn destroy_buffer(&self, buffer: NativeBuffer);

    // ===== SHADERS AND PIPELINE STATE =====

    fn compile_shader_module(
        &self,
        stage: ShaderStage,
        source: &ShaderSource,
        entry_point: &str,
    ) -> Result<NativeShaderModule>;

    fn destroy_shader_module(&self, module: NativeShaderModule);

    /// Create an input layout validated against a vertex shader module
    fn create_input_layout(
        &self,
        elements: &[VertexInputElement],
        vertex_module: NativeShaderModule,
    ) -> Result<NativeInputLayout>;

    fn destroy_input_layout(&self, layout: NativeInputLayout);

    fn create_rasterizer_state(&self, desc: &RasterizerDescription) -> Result<NativeRasterizerState>;

    fn destroy_rasterizer_state(&self, state: NativeRasterizerState);

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDescription) -> Result<NativeSwapchain>;

    /// Back buffer `index` of a swapchain
    ///
    /// The returned image is owned by the swapchain and must not be destroyed
    /// by the caller.
    fn swapchain_image(&self, swapchain: NativeSwapchain, index: u32) -> Result<NativeImage>;

    fn present(&self, swapchain: NativeSwapchain) -> Result<()>;

    /// Frames presented through a swapchain since its creation
    fn presented_frame_count(&self, swapchain: NativeSwapchain) -> u64;

    /// Destroy a swapchain and its back buffers
    fn destroy_swapchain(&self, swapchain: NativeSwapchain);

    // ===== IMMEDIATE CONTEXT =====

    fn set_input_layout(&self, layout: NativeInputLayout);

    fn set_primitive_topology(&self, topology: PipelineTopology);

    fn set_shader_module(&self, stage: ShaderStage, module: NativeShaderModule);

    fn set_rasterizer_state(&self, state: NativeRasterizerState);

    fn set_viewport(&self, viewport: Viewport);

    /// Bind render targets; draws go to slot 0
    fn set_render_targets(&self, views: &[NativeImageView]);

    fn clear_render_target(&self, view: NativeImageView, color: Color4);

    /// Bind a texture and sampler to a fragment-stage slot
    fn set_input_texture(&self, slot: u32, view: NativeImageView, sampler: NativeSampler);

    /// Rasterize an indexed triangle list with the bound state
    fn draw_indexed(&self, command: &DrawIndexedCommand) -> Result<()>;

    // ===== DIAGNOSTICS =====

    fn resource_stats(&self) -> DeviceResourceStats;
}

/// Create the graphics device for a backend
///
/// # Arguments
///
/// * `api` - Backend to instantiate
/// * `config` - Renderer configuration
pub fn create_graphics_device(api: RendererApi, config: &RendererConfig) -> Result<Arc<dyn GraphicsDevice>> {
    if !api.is_available() {
        crate::engine_bail!(
            "cave::GraphicsDevice",
            InitializationFailed,
            "renderer API '{}' is not available on this platform",
            api
        );
    }
    match api {
        RendererApi::Software => {
            crate::engine_debug!(
                "cave::GraphicsDevice",
                "Creating software device for '{}'",
                config.app_name
            );
            Ok(Arc::new(SoftwareDevice::new()))
        }
    }
}
