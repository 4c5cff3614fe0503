//! Unit tests for the Renderer facade
//!
//! Covers the initialize/shutdown lifecycle, default textures, the frame and
//! pass state machine and forwarding to the software backend.

use super::*;
use crate::error::Error;
use crate::platform::HeadlessWindow;
use crate::renderer::{
    Color4, Framebuffer, IndexBufferDataType, IndexBufferDescription, IndexBufferUpdateFrequency,
    PipelineDescription, PipelineVertexAttributeType, RenderPassAttachmentDescription,
    RenderPassDescription, ResourceKind, Shader, ShaderDescription, ShaderStage,
    ShaderStageDescription, VertexBufferDescription, VertexBufferUpdateFrequency,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

fn initialized_renderer(width: u32, height: u32) -> Renderer {
    let mut renderer = Renderer::new();
    renderer
        .initialize(&HeadlessWindow::new(width, height), RendererConfig::default())
        .unwrap();
    renderer
}

/// Swapchain pass clearing to `clear`, POSITION(Float2) + COLOR(Float4)
fn swapchain_pass(renderer: &Renderer, clear: Color4) -> Arc<RenderPass> {
    let context = renderer.rendering_context();
    let shader = Shader::create(
        context,
        &ShaderDescription {
            stages: vec![
                ShaderStageDescription::from_source(ShaderStage::Vertex, "VertexOutput main(VertexInput input)"),
                ShaderStageDescription::from_source(ShaderStage::Fragment, "float4 main() : SV_Target"),
            ],
        },
    )
    .unwrap();
    RenderPass::create(
        context,
        RenderPassDescription {
            target_framebuffer: Framebuffer::create_swapchain_target(context),
            target_framebuffer_attachments: vec![RenderPassAttachmentDescription::clear(clear)],
            pipeline_description: PipelineDescription::new(shader)
                .with_attribute(PipelineVertexAttributeType::Float2, "POSITION")
                .with_attribute(PipelineVertexAttributeType::Float4, "COLOR"),
        },
    )
    .unwrap()
}

/// Full-screen quad buffers
fn quad_buffers(renderer: &Renderer, color: Color4) -> (Arc<VertexBuffer>, Arc<IndexBuffer>) {
    let context = renderer.rendering_context();
    let mut vertices = Vec::new();
    for (x, y) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        vertices.extend_from_slice(&[x, y, color.r, color.g, color.b, color.a]);
    }
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
    let vertex_buffer = VertexBuffer::create(
        context,
        &VertexBufferDescription {
            size: vertex_bytes.len(),
            update_frequency: VertexBufferUpdateFrequency::Never,
            data: Some(vertex_bytes),
        },
    )
    .unwrap();

    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
    let index_buffer = IndexBuffer::create(
        context,
        &IndexBufferDescription {
            size: index_bytes.len(),
            data_type: IndexBufferDataType::UInt32,
            update_frequency: IndexBufferUpdateFrequency::Never,
            data: Some(index_bytes),
        },
    )
    .unwrap();
    (vertex_buffer, index_buffer)
}

// ============================================================================
// CONFIGURATION TESTS
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = RendererConfig::default();
    assert_eq!(config.renderer_api, RendererApi::Software);
    assert_eq!(config.swapchain_format, ImageFormat::B8G8R8A8);
    assert_eq!(config.swapchain_image_count, 2);
    assert!(config.shader_directory.ends_with("shaders"));
}

#[test]
fn test_default_texture_colors() {
    assert_eq!(WHITE_TEXTURE_RGBA.to_be_bytes(), [255, 255, 255, 255]);
    assert_eq!(BLACK_TEXTURE_RGBA.to_be_bytes(), [0, 0, 0, 255]);
}

// ============================================================================
// LIFECYCLE TESTS
// ============================================================================

#[test]
fn test_initialize_and_shutdown() {
    let mut renderer = Renderer::new();
    assert!(!renderer.is_initialized());

    renderer
        .initialize(&HeadlessWindow::new(320, 200), RendererConfig::default())
        .unwrap();
    assert!(renderer.is_initialized());
    assert_eq!(renderer.renderer_api(), RendererApi::Software);
    assert_eq!(renderer.rendering_context().swapchain_width(), 320);
    assert_eq!(renderer.config().swapchain_image_count, 2);

    renderer.shutdown();
    assert!(!renderer.is_initialized());
    renderer.shutdown();
}

#[test]
fn test_double_initialize_fails() {
    let mut renderer = initialized_renderer(8, 8);
    let result = renderer.initialize(&HeadlessWindow::new(8, 8), RendererConfig::default());
    assert!(matches!(result, Err(Error::AlreadyInitialized(_))));
    assert!(renderer.is_initialized());
}

#[test]
fn test_initialize_with_empty_window_fails() {
    let mut renderer = Renderer::new();
    let result = renderer.initialize(&HeadlessWindow::new(0, 0), RendererConfig::default());
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    assert!(!renderer.is_initialized());
}

#[test]
fn test_reinitialize_after_shutdown() {
    let mut renderer = initialized_renderer(8, 8);
    renderer.shutdown();
    renderer
        .initialize(&HeadlessWindow::new(16, 16), RendererConfig::default())
        .unwrap();
    assert_eq!(renderer.rendering_context().swapchain_width(), 16);
}

#[test]
fn test_default_textures() {
    let renderer = initialized_renderer(8, 8);
    let device = renderer.rendering_context().device();

    let white = device.read_image(renderer.white_texture().native_image()).unwrap();
    let black = device.read_image(renderer.black_texture().native_image()).unwrap();

    assert_eq!((white.width, white.height), (1, 1));
    assert_eq!(white.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(black.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(renderer.white_texture().format(), ImageFormat::R8G8B8A8);
}

#[test]
#[should_panic(expected = "white_texture on an uninitialized renderer")]
fn test_getter_on_uninitialized_renderer_is_fatal() {
    let renderer = Renderer::new();
    let _ = renderer.white_texture();
}

// ============================================================================
// FRAME STATE TESTS
// ============================================================================

#[test]
fn test_frame_presents() {
    let mut renderer = initialized_renderer(8, 8);

    renderer.begin_frame().unwrap();
    assert!(renderer.is_frame_active());
    renderer.end_frame().unwrap();
    assert!(!renderer.is_frame_active());
    renderer.begin_frame().unwrap();
    renderer.end_frame().unwrap();

    assert_eq!(renderer.rendering_context().presented_frame_count(), 2);
    assert_eq!(renderer.stats().frames_presented, 2);
}

#[test]
#[should_panic(expected = "begin_frame called twice")]
fn test_double_begin_frame_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    renderer.begin_frame().unwrap();
    let _ = renderer.begin_frame();
}

#[test]
#[should_panic(expected = "end_frame without begin_frame")]
fn test_end_frame_without_begin_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let _ = renderer.end_frame();
}

#[test]
#[should_panic(expected = "begin_render_pass outside a frame")]
fn test_render_pass_outside_frame_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let pass = swapchain_pass(&renderer, Color4::BLACK);
    let _ = renderer.begin_render_pass(&pass);
}

#[test]
#[should_panic(expected = "begin_render_pass while another render pass is active")]
fn test_double_begin_render_pass_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let pass = swapchain_pass(&renderer, Color4::BLACK);
    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&pass).unwrap();
    let _ = renderer.begin_render_pass(&pass);
}

#[test]
#[should_panic(expected = "end_render_pass without an active render pass")]
fn test_end_render_pass_without_begin_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    renderer.begin_frame().unwrap();
    renderer.end_render_pass();
}

#[test]
#[should_panic(expected = "end_frame with an active render pass")]
fn test_end_frame_with_open_pass_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let pass = swapchain_pass(&renderer, Color4::BLACK);
    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&pass).unwrap();
    let _ = renderer.end_frame();
}

#[test]
#[should_panic(expected = "draw_indexed without an active render pass")]
fn test_draw_without_pass_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let (vertices, indices) = quad_buffers(&renderer, Color4::RED);
    renderer.begin_frame().unwrap();
    let _ = renderer.draw_indexed(&vertices, &indices, 6);
}

#[test]
#[should_panic(expected = "bind_input_texture without an active render pass")]
fn test_bind_texture_without_pass_is_fatal() {
    let mut renderer = initialized_renderer(8, 8);
    let texture = Arc::clone(renderer.white_texture());
    renderer.begin_frame().unwrap();
    renderer.bind_input_texture(&texture, 0);
}

// ============================================================================
// RENDERING TESTS
// ============================================================================

#[test]
fn test_pass_clears_swapchain() {
    let mut renderer = initialized_renderer(4, 4);
    let pass = swapchain_pass(&renderer, Color4::GREEN);

    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&pass).unwrap();
    assert!(renderer.has_active_render_pass());
    renderer.end_render_pass();
    renderer.end_frame().unwrap();

    let image = renderer.rendering_context().read_swapchain_image().unwrap();
    assert_eq!(image.count_pixels([0, 255, 0, 255]), 16);
}

#[test]
fn test_draw_updates_stats_and_pixels() {
    let mut renderer = initialized_renderer(4, 4);
    let pass = swapchain_pass(&renderer, Color4::BLACK);
    let (vertices, indices) = quad_buffers(&renderer, Color4::RED);
    let texture = Arc::clone(renderer.white_texture());

    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&pass).unwrap();
    renderer.bind_input_texture(&texture, 0);
    renderer.draw_indexed(&vertices, &indices, 6).unwrap();
    renderer.draw_indexed(&vertices, &indices, 3).unwrap();
    renderer.end_render_pass();

    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.indices, 9);
    assert_eq!(stats.triangles, 3);
    assert_eq!(stats.render_passes, 1);
    assert_eq!(stats.texture_binds, 1);
    renderer.end_frame().unwrap();

    let image = renderer.rendering_context().read_swapchain_image().unwrap();
    assert_eq!(image.count_pixels([255, 0, 0, 255]), 16);

    // Per-frame counters reset on the next frame.
    renderer.begin_frame().unwrap();
    assert_eq!(renderer.stats().draw_calls, 0);
    assert_eq!(renderer.stats().frames_presented, 1);
    renderer.end_frame().unwrap();
}

#[test]
fn test_window_resize_follows_swapchain_targets() {
    let mut renderer = initialized_renderer(8, 8);
    let pass = swapchain_pass(&renderer, Color4::BLUE);

    renderer.on_window_resized(20, 10).unwrap();

    assert_eq!(pass.target_framebuffer().width(), 20);
    assert_eq!(pass.target_framebuffer().height(), 10);

    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&pass).unwrap();
    renderer.end_render_pass();
    renderer.end_frame().unwrap();

    let image = renderer.rendering_context().read_swapchain_image().unwrap();
    assert_eq!(image.count_pixels([0, 0, 255, 255]), 200);
}

#[test]
fn test_shutdown_releases_every_native_object() {
    let mut renderer = initialized_renderer(8, 8);
    let device = Arc::clone(renderer.rendering_context().device());
    assert!(device.resource_stats().live(ResourceKind::Image) >= 2);

    renderer.shutdown();

    assert_eq!(device.resource_stats().total_live(), 0);
}
