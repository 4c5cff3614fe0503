//! Unit tests for Renderer2D
//!
//! Covers quad geometry, the shared index pattern, batching and flush
//! behavior, and rendering into owned and swapchain targets.

use std::path::PathBuf;

use super::*;
use crate::error::Error;
use crate::platform::HeadlessWindow;
use crate::renderer::RendererConfig;

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

const RED: [u8; 4] = [255, 0, 0, 255];
const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

// ============================================================================
// GEOMETRY TESTS
// ============================================================================

#[test]
fn test_quad_vertex_layout() {
    assert_eq!(std::mem::size_of::<QuadVertex>(), 24);
    assert_eq!(std::mem::align_of::<QuadVertex>(), 4);
}

#[test]
fn test_construct_quad_corner_order() {
    let quad = construct_quad(Vec2::new(1.0, 2.0), Vec2::new(4.0, 2.0), Color4::RED);

    assert_eq!(quad[0].position, Vec2::new(-1.0, 1.0));
    assert_eq!(quad[1].position, Vec2::new(3.0, 1.0));
    assert_eq!(quad[2].position, Vec2::new(3.0, 3.0));
    assert_eq!(quad[3].position, Vec2::new(-1.0, 3.0));
    assert!(quad.iter().all(|vertex| vertex.color == Color4::RED));
}

#[test]
fn test_square_quad_corners_are_equidistant() {
    let translation = Vec2::new(0.25, -0.5);
    for size in [0.5f32, 1.0, 3.0] {
        let quad = construct_quad(translation, Vec2::splat(size), Color4::WHITE);
        let expected = size / std::f32::consts::SQRT_2;
        for vertex in &quad {
            assert!((vertex.position.distance(translation) - expected).abs() < 1e-5);
        }
    }
}

#[test]
fn test_quad_index_pattern() {
    let indices = generate_quad_indices(3);

    assert_eq!(indices.len(), 18);
    assert_eq!(&indices[0..6], &[0, 1, 2, 2, 3, 0]);
    assert_eq!(&indices[6..12], &[4, 5, 6, 6, 7, 4]);
    for quad in 0..3u32 {
        let base = 4 * quad;
        let chunk = &indices[(6 * quad) as usize..(6 * quad + 6) as usize];
        assert_eq!(chunk, &[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
}

#[test]
fn test_full_batch_index_count() {
    let indices = generate_quad_indices(MAX_QUADS_PER_BATCH);
    assert_eq!(indices.len(), MAX_QUADS_PER_BATCH * INDICES_PER_QUAD);
    assert_eq!(indices.last().copied(), Some(4 * (MAX_QUADS_PER_BATCH as u32 - 1)));
}

// ============================================================================
// CREATION TESTS
// ============================================================================

#[test]
fn test_create_with_target_size() {
    let renderer = initialized_renderer(8, 8);
    let renderer_2d = Renderer2D::create_with_target_size(&renderer, 32, 16).unwrap();

    assert_eq!(renderer_2d.target_width(), 32);
    assert_eq!(renderer_2d.target_height(), 16);
    assert!(!renderer_2d.target_framebuffer().is_swapchain_target());
    assert_eq!(
        renderer_2d.target_framebuffer().attachment_description(0).format,
        ImageFormat::B8G8R8A8
    );
    assert_eq!(renderer_2d.render_pass().vertex_stride(), 24);
    assert_eq!(renderer_2d.shader().stage_count(), 2);
    assert_eq!(renderer_2d.current_quad_count(), 0);
}

#[test]
fn test_create_for_swapchain_follows_resize() {
    let mut renderer = initialized_renderer(8, 8);
    let renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();
    assert_eq!(renderer.rendering_context().referenced_framebuffer_count(), 1);

    renderer.on_window_resized(24, 12).unwrap();

    assert_eq!(renderer_2d.target_width(), 24);
    assert_eq!(renderer_2d.target_height(), 12);
    drop(renderer_2d);
    assert_eq!(renderer.rendering_context().referenced_framebuffer_count(), 0);
}

#[test]
fn test_missing_shader_file_fails() {
    let mut renderer = Renderer::new();
    let config = RendererConfig {
        shader_directory: PathBuf::from("this/directory/does/not/exist"),
        ..RendererConfig::default()
    };
    renderer.initialize(&HeadlessWindow::new(8, 8), config).unwrap();

    let result = Renderer2D::create_with_target_size(&renderer, 8, 8);
    assert!(matches!(result, Err(Error::FileReadFailed(_))));
}

#[test]
#[should_panic(expected = "target framebuffer must have exactly one attachment")]
fn test_multi_attachment_target_is_fatal() {
    let renderer = initialized_renderer(8, 8);
    let target = Framebuffer::create(
        renderer.rendering_context(),
        &FramebufferDescription {
            width: 4,
            height: 4,
            attachments: vec![FramebufferAttachmentDescription::default(); 2],
        },
    )
    .unwrap();
    let _ = Renderer2D::create(&renderer, target);
}

// ============================================================================
// BATCHING TESTS
// ============================================================================

#[test]
fn test_empty_flush_draws_nothing() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d.flush_quad_batch(&mut renderer).unwrap();
    renderer_2d.flush_quad_batch(&mut renderer).unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();

    assert_eq!(renderer.stats().draw_calls, 0);
    assert_eq!(renderer_2d.flush_count(), 0);
    renderer.end_frame().unwrap();
}

#[test]
fn test_flush_resets_batch_but_keeps_frame_total() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    for _ in 0..3 {
        renderer_2d
            .submit_quad(&mut renderer, Vec2::ZERO, Vec2::ONE, Color4::RED)
            .unwrap();
    }
    assert_eq!(renderer_2d.current_quad_count(), 3);

    renderer_2d.flush_quad_batch(&mut renderer).unwrap();
    assert_eq!(renderer_2d.current_quad_count(), 0);
    assert_eq!(renderer_2d.frame_quad_count(), 3);
    assert_eq!(renderer.stats().draw_calls, 1);
    assert_eq!(renderer.stats().indices, 18);

    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();
}

#[test]
fn test_batch_boundary_triggers_one_auto_flush() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    for _ in 0..MAX_QUADS_PER_BATCH + 1 {
        renderer_2d
            .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(0.1), Color4::WHITE)
            .unwrap();
    }

    assert_eq!(renderer_2d.flush_count(), 1);
    assert_eq!(renderer_2d.current_quad_count(), 1);
    assert_eq!(renderer_2d.frame_quad_count(), MAX_QUADS_PER_BATCH + 1);
    assert_eq!(renderer.stats().indices, (MAX_QUADS_PER_BATCH * INDICES_PER_QUAD) as u64);

    renderer_2d.end_frame(&mut renderer).unwrap();
    assert_eq!(renderer_2d.flush_count(), 2);
    assert_eq!(renderer.stats().draw_calls, 2);
    renderer.end_frame().unwrap();
}

#[test]
fn test_begin_frame_resets_counters() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    for _ in 0..2 {
        renderer.begin_frame().unwrap();
        renderer_2d.begin_frame(&mut renderer).unwrap();
        assert_eq!(renderer_2d.frame_quad_count(), 0);
        renderer_2d
            .submit_quad(&mut renderer, Vec2::ZERO, Vec2::ONE, Color4::RED)
            .unwrap();
        renderer_2d.end_frame(&mut renderer).unwrap();
        renderer.end_frame().unwrap();
        assert_eq!(renderer_2d.frame_quad_count(), 1);
    }
}

#[test]
fn test_failed_flush_closes_the_pass_and_drops_the_batch() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    // Resizing mid-pass destroys the back buffer the pass has bound.
    renderer.on_window_resized(16, 16).unwrap();
    renderer_2d
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::ONE, Color4::RED)
        .unwrap();

    let result = renderer_2d.end_frame(&mut renderer);
    assert!(matches!(result, Err(Error::BackendError(_))));
    assert!(!renderer.has_active_render_pass());
    assert_eq!(renderer_2d.current_quad_count(), 0);
    assert_eq!(renderer_2d.flush_count(), 0);
    renderer.end_frame().unwrap();

    // The next frame binds the new back buffer.
    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(2.0), Color4::RED)
        .unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();

    let image = renderer.rendering_context().read_swapchain_image().unwrap();
    assert_eq!(image.count_pixels(RED), 16 * 16);
}

// ============================================================================
// RENDERING TESTS
// ============================================================================

#[test]
fn test_quad_pixels_in_owned_target() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::ONE, Color4::RED)
        .unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();

    let image = renderer_2d.target_framebuffer().read_attachment(0).unwrap();
    assert_eq!(image.count_pixels(RED), 16);
    assert_eq!(image.count_pixels(OPAQUE_BLACK), 48);
    assert_eq!(image.pixel(2, 2), Some(RED));
    assert_eq!(image.pixel(5, 5), Some(RED));
    assert_eq!(image.pixel(1, 2), Some(OPAQUE_BLACK));
    assert_eq!(image.pixel(6, 5), Some(OPAQUE_BLACK));
}

#[test]
fn test_quads_reach_the_swapchain() {
    let mut renderer = initialized_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    // Left half red.
    renderer_2d
        .submit_quad(&mut renderer, Vec2::new(-0.5, 0.0), Vec2::new(1.0, 2.0), Color4::RED)
        .unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();

    let image = renderer.rendering_context().read_swapchain_image().unwrap();
    assert_eq!(image.count_pixels(RED), 32);
    assert_eq!(image.pixel(0, 0), Some(RED));
    assert_eq!(image.pixel(7, 7), Some(OPAQUE_BLACK));
}
