//! CPU implementation of the GraphicsDevice trait
//!
//! Native objects live in slotmap arenas; their keys are exported as the
//! opaque `Native*` handles. Images store RGBA8 texels whatever their format,
//! B8G8R8A8 data is swizzled on upload.

use std::sync::{Mutex, MutexGuard, PoisonError};

use glam::Vec2;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::error::{Error, Result};
use crate::renderer::{
    BufferDescription, BufferKind, Color4, DeviceResourceStats, DrawIndexedCommand,
    GraphicsDevice, ImageDescription, ImageFormat, ImageReadback, ImageUsage,
    IndexBufferDataType, NativeBuffer, NativeImage, NativeImageView, NativeInputLayout,
    NativeRasterizerState, NativeSampler, NativeShaderModule, NativeSwapchain,
    PipelineTopology, RasterizerDescription, RendererApi, ResourceKind,
    SamplerDescription, ShaderSource, ShaderStage, SwapchainDescription, VertexInputElement,
    Viewport,
};
use super::software_rasterizer::{draw_triangle, RasterState, RasterTarget, RasterVertex, SampledTexture};

new_key_type! {
    struct ImageKey;
    struct ImageViewKey;
    struct SamplerKey;
    struct BufferKey;
    struct ShaderModuleKey;
    struct InputLayoutKey;
    struct RasterizerStateKey;
    struct SwapchainKey;
}

/// Largest image or swapchain edge, in pixels
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

fn to_native<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

fn from_native<K: Key>(value: u64) -> K {
    KeyData::from_ffi(value).into()
}

// ============================================================================
// Device objects
// ============================================================================

struct SoftwareImage {
    width: u32,
    height: u32,
    format: ImageFormat,
    usage: ImageUsage,
    texels: Vec<[u8; 4]>,
    /// Back buffers are destroyed with their swapchain only
    owned_by_swapchain: bool,
}

struct SoftwareBuffer {
    kind: BufferKind,
    bytes: Vec<u8>,
    cpu_writable: bool,
}

struct SoftwareShaderModule {
    stage: ShaderStage,
}

/// Where each semantic lives inside a vertex record
#[derive(Debug, Clone, Copy)]
struct AttributeSlot {
    offset: usize,
    components: usize,
}

struct SoftwareInputLayout {
    position: Option<AttributeSlot>,
    color: Option<AttributeSlot>,
    texcoord: Option<AttributeSlot>,
}

struct SoftwareSwapchain {
    width: u32,
    height: u32,
    format: ImageFormat,
    back_buffer: ImageKey,
    front_buffer: Vec<[u8; 4]>,
    presented_frames: u64,
}

/// Immediate-context bindings
#[derive(Default)]
struct BoundState {
    input_layout: Option<InputLayoutKey>,
    topology: Option<PipelineTopology>,
    vertex_shader: Option<ShaderModuleKey>,
    fragment_shader: Option<ShaderModuleKey>,
    rasterizer_state: Option<RasterizerStateKey>,
    viewport: Option<Viewport>,
    render_targets: Vec<ImageViewKey>,
    textures: FxHashMap<u32, (ImageViewKey, SamplerKey)>,
}

#[derive(Default)]
struct DeviceState {
    images: SlotMap<ImageKey, SoftwareImage>,
    image_views: SlotMap<ImageViewKey, ImageKey>,
    samplers: SlotMap<SamplerKey, SamplerDescription>,
    buffers: SlotMap<BufferKey, SoftwareBuffer>,
    shader_modules: SlotMap<ShaderModuleKey, SoftwareShaderModule>,
    input_layouts: SlotMap<InputLayoutKey, SoftwareInputLayout>,
    rasterizer_states: SlotMap<RasterizerStateKey, RasterizerDescription>,
    swapchains: SlotMap<SwapchainKey, SoftwareSwapchain>,
    bound: BoundState,
    stats: DeviceResourceStats,
}

/// Graphics device rasterizing on the CPU
#[derive(Default)]
pub struct SoftwareDevice {
    state: Mutex<DeviceState>,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Image shown by the last `present` of a swapchain
    pub fn read_presented_image(&self, swapchain: NativeSwapchain) -> Option<ImageReadback> {
        let state = self.lock();
        let chain = state.swapchains.get(from_native::<SwapchainKey>(swapchain.0))?;
        Some(ImageReadback {
            width: chain.width,
            height: chain.height,
            format: chain.format,
            rgba: chain.front_buffer.clone(),
        })
    }
}

fn decode_pixels(format: ImageFormat, bytes: &[u8]) -> Vec<[u8; 4]> {
    bytes
        .chunks_exact(4)
        .map(|pixel| match format {
            ImageFormat::B8G8R8A8 => [pixel[2], pixel[1], pixel[0], pixel[3]],
            _ => [pixel[0], pixel[1], pixel[2], pixel[3]],
        })
        .collect()
}

fn read_floats(bytes: &[u8], offset: usize, components: usize) -> [f32; 4] {
    let mut values = [0.0f32; 4];
    for (component, value) in values.iter_mut().enumerate().take(components) {
        let start = offset + component * 4;
        *value = bytemuck::pod_read_unaligned::<f32>(&bytes[start..start + 4]);
    }
    values
}

impl SoftwareInputLayout {
    fn from_elements(elements: &[VertexInputElement]) -> Self {
        let slot = |name: &str| {
            elements
                .iter()
                .find(|element| element.semantic_name == name && element.semantic_index == 0)
                .map(|element| AttributeSlot {
                    offset: element.offset as usize,
                    components: element.attribute_type.component_count() as usize,
                })
        };
        Self {
            position: slot("POSITION"),
            color: slot("COLOR"),
            texcoord: slot("TEXCOORD"),
        }
    }

    fn fetch(&self, record: &[u8]) -> Result<RasterVertex> {
        let position = match self.position {
            Some(slot) if slot.components >= 2 => {
                let [x, y, _, w] = read_floats(record, slot.offset, slot.components);
                if slot.components == 4 && w != 0.0 {
                    Vec2::new(x / w, y / w)
                } else {
                    Vec2::new(x, y)
                }
            }
            _ => {
                return Err(Error::BackendError(
                    "input layout has no two-component POSITION attribute".to_string(),
                ))
            }
        };
        let color = match self.color {
            Some(slot) => {
                let [r, g, b, a] = read_floats(record, slot.offset, slot.components);
                Color4::new(r, g, b, if slot.components == 4 { a } else { 1.0 })
            }
            None => Color4::WHITE,
        };
        let texcoord = self.texcoord.map(|slot| {
            let [u, v, _, _] = read_floats(record, slot.offset, slot.components);
            Vec2::new(u, v)
        });
        Ok(RasterVertex { position, color, texcoord })
    }

    fn record_size(&self) -> usize {
        [self.position, self.color, self.texcoord]
            .iter()
            .flatten()
            .map(|slot| slot.offset + slot.components * 4)
            .max()
            .unwrap_or(0)
    }
}

fn read_indices(bytes: &[u8], index_type: IndexBufferDataType, count: usize) -> Result<Vec<usize>> {
    let size = index_type.size_bytes();
    if count * size > bytes.len() {
        return Err(Error::BackendError(format!(
            "{} indices exceed index buffer of {} bytes",
            count,
            bytes.len()
        )));
    }
    Ok(bytes[..count * size]
        .chunks_exact(size)
        .map(|chunk| match index_type {
            IndexBufferDataType::UInt16 => bytemuck::pod_read_unaligned::<u16>(chunk) as usize,
            IndexBufferDataType::UInt32 => bytemuck::pod_read_unaligned::<u32>(chunk) as usize,
        })
        .collect())
}

fn missing(what: &str) -> Error {
    Error::BackendError(format!("draw_indexed without {} bound", what))
}

impl DeviceState {
    fn insert_image(&mut self, image: SoftwareImage) -> ImageKey {
        if !image.owned_by_swapchain {
            self.stats.record_created(ResourceKind::Image);
        }
        self.images.insert(image)
    }

    fn draw_indexed(&mut self, command: &DrawIndexedCommand) -> Result<()> {
        let bound = &self.bound;
        let layout = bound
            .input_layout
            .and_then(|key| self.input_layouts.get(key))
            .ok_or_else(|| missing("an input layout"))?;
        if bound.topology != Some(PipelineTopology::TriangleList) {
            return Err(missing("a primitive topology"));
        }
        if bound.vertex_shader.is_none() || bound.fragment_shader.is_none() {
            return Err(missing("vertex and fragment shaders"));
        }
        let rasterizer = bound
            .rasterizer_state
            .and_then(|key| self.rasterizer_states.get(key))
            .copied()
            .ok_or_else(|| missing("a rasterizer state"))?;
        let viewport = bound.viewport.ok_or_else(|| missing("a viewport"))?;
        let target_key = bound
            .render_targets
            .first()
            .and_then(|view| self.image_views.get(*view))
            .copied()
            .filter(|image| {
                self.images
                    .get(*image)
                    .is_some_and(|image| image.usage.contains(ImageUsage::RENDER_TARGET))
            })
            .ok_or_else(|| missing("a render target"))?;

        let vertex_buffer = self
            .buffers
            .get(from_native::<BufferKey>(command.vertex_buffer.0))
            .filter(|buffer| buffer.kind == BufferKind::Vertex)
            .ok_or_else(|| Error::InvalidResource("unknown vertex buffer".to_string()))?;
        let index_buffer = self
            .buffers
            .get(from_native::<BufferKey>(command.index_buffer.0))
            .filter(|buffer| buffer.kind == BufferKind::Index)
            .ok_or_else(|| Error::InvalidResource("unknown index buffer".to_string()))?;

        let indices = read_indices(&index_buffer.bytes, command.index_type, command.index_count as usize)?;
        let stride = command.vertex_stride as usize;
        if stride < layout.record_size() {
            return Err(Error::BackendError(format!(
                "vertex stride {} smaller than the input layout ({} bytes)",
                stride,
                layout.record_size()
            )));
        }

        let mut vertices = Vec::with_capacity(indices.len());
        for index in indices {
            let start = index * stride;
            let record = vertex_buffer
                .bytes
                .get(start..start + stride)
                .ok_or_else(|| Error::BackendError(format!("vertex index {} out of range", index)))?;
            vertices.push(layout.fetch(record)?);
        }
        let textured = layout.texcoord.is_some();

        let raster_state = RasterState {
            fill_mode: rasterizer.fill_mode,
            cull_mode: rasterizer.cull_mode,
            front_face: rasterizer.front_face,
            viewport,
        };

        let texture_binding = bound.textures.get(&0).copied();
        let (width, height) = {
            let image = &self.images[target_key];
            (image.width, image.height)
        };
        let mut target_texels = std::mem::take(&mut self.images[target_key].texels);
        {
            let texture = texture_binding.filter(|_| textured).and_then(|(view, sampler)| {
                let image = self
                    .image_views
                    .get(view)
                    .and_then(|image| self.images.get(*image))
                    .filter(|image| image.usage.contains(ImageUsage::SHADER_RESOURCE))?;
                Some(SampledTexture {
                    width: image.width,
                    height: image.height,
                    texels: &image.texels,
                    sampler: *self.samplers.get(sampler)?,
                })
            });

            let mut target = RasterTarget { width, height, texels: &mut target_texels };
            for triangle in vertices.chunks_exact(3) {
                draw_triangle(
                    &mut target,
                    &raster_state,
                    [&triangle[0], &triangle[1], &triangle[2]],
                    texture.as_ref(),
                );
            }
        }
        self.images[target_key].texels = target_texels;
        Ok(())
    }
}

// ============================================================================
// GraphicsDevice implementation
// ============================================================================

impl GraphicsDevice for SoftwareDevice {
    fn renderer_api(&self) -> RendererApi {
        RendererApi::Software
    }

    fn create_image(&self, desc: &ImageDescription) -> Result<NativeImage> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!("image size {}x{} is empty", desc.width, desc.height)));
        }
        if desc.width > MAX_IMAGE_DIMENSION || desc.height > MAX_IMAGE_DIMENSION {
            return Err(Error::InvalidResource(format!(
                "image size {}x{} exceeds {}",
                desc.width, desc.height, MAX_IMAGE_DIMENSION
            )));
        }
        if desc.format == ImageFormat::Unknown {
            return Err(Error::InvalidResource("image format is Unknown".to_string()));
        }
        let pixel_count = desc.width as usize * desc.height as usize;
        let texels = match desc.initial_data {
            Some(data) => {
                if data.len() != pixel_count * desc.format.bytes_per_pixel() {
                    return Err(Error::InvalidResource(format!(
                        "initial data is {} bytes, expected {}",
                        data.len(),
                        pixel_count * desc.format.bytes_per_pixel()
                    )));
                }
                decode_pixels(desc.format, data)
            }
            None => vec![[0, 0, 0, 0]; pixel_count],
        };

        let key = self.lock().insert_image(SoftwareImage {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            texels,
            owned_by_swapchain: false,
        });
        Ok(NativeImage(to_native(key)))
    }

    fn create_image_view(&self, image: NativeImage) -> Result<NativeImageView> {
        let mut state = self.lock();
        let image_key = from_native::<ImageKey>(image.0);
        if !state.images.contains_key(image_key) {
            return Err(Error::InvalidResource(format!("unknown image {:?}", image)));
        }
        let key = state.image_views.insert(image_key);
        state.stats.record_created(ResourceKind::ImageView);
        Ok(NativeImageView(to_native(key)))
    }

    fn destroy_image(&self, image: NativeImage) {
        let mut state = self.lock();
        let key = from_native::<ImageKey>(image.0);
        if state.images.get(key).is_some_and(|image| image.owned_by_swapchain) {
            crate::engine_warn!("cave::software", "Ignoring destroy of swapchain back buffer {:?}", image);
            return;
        }
        if state.images.remove(key).is_some() {
            state.stats.record_destroyed(ResourceKind::Image);
        }
    }

    fn destroy_image_view(&self, view: NativeImageView) {
        let mut state = self.lock();
        let key = from_native::<ImageViewKey>(view.0);
        if state.image_views.remove(key).is_some() {
            state.bound.render_targets.retain(|bound| *bound != key);
            state.bound.textures.retain(|_, (bound, _)| *bound != key);
            state.stats.record_destroyed(ResourceKind::ImageView);
        }
    }

    fn read_image(&self, image: NativeImage) -> Result<ImageReadback> {
        let state = self.lock();
        let image = state
            .images
            .get(from_native::<ImageKey>(image.0))
            .ok_or_else(|| Error::InvalidResource(format!("unknown image {:?}", image)))?;
        Ok(ImageReadback {
            width: image.width,
            height: image.height,
            format: image.format,
            rgba: image.texels.clone(),
        })
    }

    fn create_sampler(&self, desc: &SamplerDescription) -> Result<NativeSampler> {
        let mut state = self.lock();
        let key = state.samplers.insert(*desc);
        state.stats.record_created(ResourceKind::Sampler);
        Ok(NativeSampler(to_native(key)))
    }

    fn destroy_sampler(&self, sampler: NativeSampler) {
        let mut state = self.lock();
        let key = from_native::<SamplerKey>(sampler.0);
        if state.samplers.remove(key).is_some() {
            state.bound.textures.retain(|_, (_, bound)| *bound != key);
            state.stats.record_destroyed(ResourceKind::Sampler);
        }
    }

    fn create_buffer(&self, desc: &BufferDescription) -> Result<NativeBuffer> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("buffer size is zero".to_string()));
        }
        let mut bytes = vec![0u8; desc.size];
        if let Some(data) = desc.initial_data {
            if data.len() > desc.size {
                return Err(Error::InvalidResource(format!(
                    "initial data ({} bytes) larger than buffer ({} bytes)",
                    data.len(),
                    desc.size
                )));
            }
            bytes[..data.len()].copy_from_slice(data);
        }

        let mut state = self.lock();
        let key = state.buffers.insert(SoftwareBuffer {
            kind: desc.kind,
            bytes,
            cpu_writable: desc.cpu_writable,
        });
        state.stats.record_created(ResourceKind::Buffer);
        Ok(NativeBuffer(to_native(key)))
    }

    fn upload_buffer(&self, buffer: NativeBuffer, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let target = state
            .buffers
            .get_mut(from_native::<BufferKey>(buffer.0))
            .ok_or_else(|| Error::InvalidResource(format!("unknown buffer {:?}", buffer)))?;
        if !target.cpu_writable {
            return Err(Error::InvalidResource("buffer is not CPU writable".to_string()));
        }
        if data.len() > target.bytes.len() {
            return Err(Error::InvalidResource(format!(
                "upload of {} bytes exceeds buffer size {}",
                data.len(),
                target.bytes.len()
            )));
        }
        target.bytes[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: NativeBuffer) {
        let mut state = self.lock();
        if state.buffers.remove(from_native::<BufferKey>(buffer.0)).is_some() {
            state.stats.record_destroyed(ResourceKind::Buffer);
        }
    }

    fn compile_shader_module(
        &self,
        stage: ShaderStage,
        source: &ShaderSource,
        entry_point: &str,
    ) -> Result<NativeShaderModule> {
        match source {
            ShaderSource::SourceCode(code) => {
                if code.trim().is_empty() {
                    crate::engine_bail!("cave::software", ShaderCompilationFailed, "{:?} stage source is empty", stage);
                }
                if !code.contains(entry_point) {
                    crate::engine_bail!(
                        "cave::software",
                        ShaderCompilationFailed,
                        "entry point '{}' not found in {:?} stage",
                        entry_point,
                        stage
                    );
                }
            }
            ShaderSource::Bytecode(bytes) => {
                if bytes.is_empty() {
                    crate::engine_bail!("cave::software", ShaderCompilationFailed, "{:?} stage bytecode is empty", stage);
                }
            }
        }

        let mut state = self.lock();
        let key = state.shader_modules.insert(SoftwareShaderModule { stage });
        state.stats.record_created(ResourceKind::ShaderModule);
        Ok(NativeShaderModule(to_native(key)))
    }

    fn destroy_shader_module(&self, module: NativeShaderModule) {
        let mut state = self.lock();
        let key = from_native::<ShaderModuleKey>(module.0);
        if state.shader_modules.remove(key).is_some() {
            if state.bound.vertex_shader == Some(key) {
                state.bound.vertex_shader = None;
            }
            if state.bound.fragment_shader == Some(key) {
                state.bound.fragment_shader = None;
            }
            state.stats.record_destroyed(ResourceKind::ShaderModule);
        }
    }

    fn create_input_layout(
        &self,
        elements: &[VertexInputElement],
        vertex_module: NativeShaderModule,
    ) -> Result<NativeInputLayout> {
        let mut state = self.lock();
        let module_stage = state
            .shader_modules
            .get(from_native::<ShaderModuleKey>(vertex_module.0))
            .map(|module| module.stage);
        if module_stage != Some(ShaderStage::Vertex) {
            return Err(Error::InvalidResource(format!(
                "input layout needs a vertex shader module, got {:?}",
                module_stage
            )));
        }
        let key = state.input_layouts.insert(SoftwareInputLayout::from_elements(elements));
        state.stats.record_created(ResourceKind::InputLayout);
        Ok(NativeInputLayout(to_native(key)))
    }

    fn destroy_input_layout(&self, layout: NativeInputLayout) {
        let mut state = self.lock();
        let key = from_native::<InputLayoutKey>(layout.0);
        if state.input_layouts.remove(key).is_some() {
            if state.bound.input_layout == Some(key) {
                state.bound.input_layout = None;
            }
            state.stats.record_destroyed(ResourceKind::InputLayout);
        }
    }

    fn create_rasterizer_state(&self, desc: &RasterizerDescription) -> Result<NativeRasterizerState> {
        let mut state = self.lock();
        let key = state.rasterizer_states.insert(*desc);
        state.stats.record_created(ResourceKind::RasterizerState);
        Ok(NativeRasterizerState(to_native(key)))
    }

    fn destroy_rasterizer_state(&self, rasterizer_state: NativeRasterizerState) {
        let mut state = self.lock();
        let key = from_native::<RasterizerStateKey>(rasterizer_state.0);
        if state.rasterizer_states.remove(key).is_some() {
            if state.bound.rasterizer_state == Some(key) {
                state.bound.rasterizer_state = None;
            }
            state.stats.record_destroyed(ResourceKind::RasterizerState);
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDescription) -> Result<NativeSwapchain> {
        if desc.width == 0 || desc.height == 0 {
            crate::engine_bail!(
                "cave::software",
                InitializationFailed,
                "swapchain size {}x{} is empty",
                desc.width,
                desc.height
            );
        }
        if desc.width > MAX_IMAGE_DIMENSION || desc.height > MAX_IMAGE_DIMENSION {
            crate::engine_bail!(
                "cave::software",
                InitializationFailed,
                "swapchain size {}x{} exceeds {}",
                desc.width,
                desc.height,
                MAX_IMAGE_DIMENSION
            );
        }
        if desc.format == ImageFormat::Unknown || desc.image_count == 0 {
            crate::engine_bail!(
                "cave::software",
                InitializationFailed,
                "invalid swapchain format {:?} or image count {}",
                desc.format,
                desc.image_count
            );
        }

        let pixel_count = desc.width as usize * desc.height as usize;
        let mut state = self.lock();
        let back_buffer = state.insert_image(SoftwareImage {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: ImageUsage::RENDER_TARGET | ImageUsage::PRESENT,
            texels: vec![[0, 0, 0, 0]; pixel_count],
            owned_by_swapchain: true,
        });
        let key = state.swapchains.insert(SoftwareSwapchain {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            back_buffer,
            front_buffer: vec![[0, 0, 0, 0]; pixel_count],
            presented_frames: 0,
        });
        state.stats.record_created(ResourceKind::Swapchain);
        Ok(NativeSwapchain(to_native(key)))
    }

    fn swapchain_image(&self, swapchain: NativeSwapchain, index: u32) -> Result<NativeImage> {
        let state = self.lock();
        let swapchain = state
            .swapchains
            .get(from_native::<SwapchainKey>(swapchain.0))
            .ok_or_else(|| Error::InvalidResource(format!("unknown swapchain {:?}", swapchain)))?;
        if index != 0 {
            return Err(Error::InvalidResource(format!("swapchain image {} is not accessible", index)));
        }
        Ok(NativeImage(to_native(swapchain.back_buffer)))
    }

    fn present(&self, swapchain: NativeSwapchain) -> Result<()> {
        let mut state = self.lock();
        let state = &mut *state;
        let chain = state
            .swapchains
            .get_mut(from_native::<SwapchainKey>(swapchain.0))
            .ok_or_else(|| Error::InvalidResource(format!("unknown swapchain {:?}", swapchain)))?;
        if let Some(back_buffer) = state.images.get(chain.back_buffer) {
            chain.front_buffer.clone_from(&back_buffer.texels);
        }
        chain.presented_frames += 1;
        Ok(())
    }

    fn presented_frame_count(&self, swapchain: NativeSwapchain) -> u64 {
        self.lock()
            .swapchains
            .get(from_native::<SwapchainKey>(swapchain.0))
            .map(|chain| chain.presented_frames)
            .unwrap_or(0)
    }

    fn destroy_swapchain(&self, swapchain: NativeSwapchain) {
        let mut state = self.lock();
        if let Some(chain) = state.swapchains.remove(from_native::<SwapchainKey>(swapchain.0)) {
            state.images.remove(chain.back_buffer);
            state.stats.record_destroyed(ResourceKind::Swapchain);
        }
    }

    fn set_input_layout(&self, layout: NativeInputLayout) {
        self.lock().bound.input_layout = Some(from_native(layout.0));
    }

    fn set_primitive_topology(&self, topology: PipelineTopology) {
        self.lock().bound.topology = Some(topology);
    }

    fn set_shader_module(&self, stage: ShaderStage, module: NativeShaderModule) {
        let mut state = self.lock();
        let key = from_native::<ShaderModuleKey>(module.0);
        match stage {
            ShaderStage::Vertex => state.bound.vertex_shader = Some(key),
            ShaderStage::Fragment => state.bound.fragment_shader = Some(key),
        }
    }

    fn set_rasterizer_state(&self, rasterizer_state: NativeRasterizerState) {
        self.lock().bound.rasterizer_state = Some(from_native(rasterizer_state.0));
    }

    fn set_viewport(&self, viewport: Viewport) {
        self.lock().bound.viewport = Some(viewport);
    }

    fn set_render_targets(&self, views: &[NativeImageView]) {
        self.lock().bound.render_targets = views.iter().map(|view| from_native(view.0)).collect();
    }

    fn clear_render_target(&self, view: NativeImageView, color: Color4) {
        let mut state = self.lock();
        let state = &mut *state;
        let Some(image_key) = state.image_views.get(from_native::<ImageViewKey>(view.0)).copied() else {
            crate::engine_warn!("cave::software", "Clear of unknown view {:?}", view);
            return;
        };
        match state.images.get_mut(image_key) {
            Some(image) if image.usage.contains(ImageUsage::RENDER_TARGET) => {
                image.texels.fill(color.to_bytes());
            }
            _ => crate::engine_warn!("cave::software", "View {:?} is not a render target", view),
        }
    }

    fn set_input_texture(&self, slot: u32, view: NativeImageView, sampler: NativeSampler) {
        self.lock()
            .bound
            .textures
            .insert(slot, (from_native(view.0), from_native(sampler.0)));
    }

    fn draw_indexed(&self, command: &DrawIndexedCommand) -> Result<()> {
        self.lock().draw_indexed(command)
    }

    fn resource_stats(&self) -> DeviceResourceStats {
        self.lock().stats.clone()
    }
}

#[cfg(test)]
#[path = "software_device_tests.rs"]
mod tests;
