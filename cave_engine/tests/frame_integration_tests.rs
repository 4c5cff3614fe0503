//! Integration tests for whole frames
//!
//! Frames are driven through the public Renderer and Renderer2D API and the
//! result is checked on the presented back buffer.
//!
//! Run with: cargo test --test frame_integration_tests

mod test_utils;

use cave_engine::cave::render::{
    Color4, Framebuffer, FramebufferAttachmentDescription, FramebufferDescription, ImageFormat,
    IndexBuffer, IndexBufferDataType, IndexBufferDescription, IndexBufferUpdateFrequency,
    PipelineDescription, PipelineVertexAttributeType, RenderPass, RenderPassAttachmentDescription,
    RenderPassAttachmentLoadOperation, RenderPassAttachmentStoreOperation,
    RenderPassDescription, Shader, ShaderDescription, ShaderStage, ShaderStageDescription,
    VertexBuffer, VertexBufferDescription, VertexBufferUpdateFrequency, INDICES_PER_QUAD,
    MAX_QUADS_PER_BATCH,
};
use cave_engine::cave::Renderer2D;
use cave_engine::glam::Vec2;
use test_utils::*;

// ============================================================================
// RENDERER2D FRAME TESTS
// ============================================================================

#[test]
fn test_integration_quadrants() {
    let mut renderer = create_test_renderer(32, 32);
    let mut renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    let quads = [
        (Vec2::new(-0.5, -0.5), Color4::RED),
        (Vec2::new(-0.5, 0.5), Color4::GREEN),
        (Vec2::new(0.5, -0.5), Color4::BLUE),
        (Vec2::new(0.5, 0.5), Color4::WHITE),
    ];
    for (translation, color) in quads {
        renderer_2d
            .submit_quad(&mut renderer, translation, Vec2::ONE, color)
            .unwrap();
    }
    renderer_2d.end_frame(&mut renderer).unwrap();

    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.triangles, 8);
    renderer.end_frame().unwrap();

    let image = swapchain_pixels(&renderer);
    for color in [RED, GREEN, BLUE, WHITE] {
        assert_eq!(image.count_pixels(color), 16 * 16);
    }
    let left = image.pixel(0, 0).unwrap();
    let right = image.pixel(31, 0).unwrap();
    assert!(left == RED || left == GREEN);
    assert!(right == BLUE || right == WHITE);
    assert_eq!(renderer.stats().frames_presented, 1);
}

#[test]
fn test_integration_frames_start_from_black() {
    let mut renderer = create_test_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(2.0), Color4::RED)
        .unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();
    assert_eq!(swapchain_pixels(&renderer).count_pixels(RED), 64);

    // Nothing submitted: the pass clear alone reaches the back buffer.
    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();
    assert_eq!(swapchain_pixels(&renderer).count_pixels(OPAQUE_BLACK), 64);
    assert_eq!(renderer.rendering_context().presented_frame_count(), 2);
}

#[test]
fn test_integration_batch_boundary() {
    let mut renderer = create_test_renderer(16, 16);
    let mut renderer_2d = Renderer2D::create_for_swapchain(&renderer).unwrap();
    let quad_count = MAX_QUADS_PER_BATCH + 1;

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    for index in 0..quad_count {
        // The last quad covers the whole target.
        let (scale, color) = if index + 1 == quad_count {
            (Vec2::splat(2.0), Color4::BLUE)
        } else {
            (Vec2::splat(0.25), Color4::RED)
        };
        renderer_2d
            .submit_quad(&mut renderer, Vec2::ZERO, scale, color)
            .unwrap();
    }
    renderer_2d.end_frame(&mut renderer).unwrap();

    let stats = renderer.stats();
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.indices, (quad_count * INDICES_PER_QUAD) as u64);
    assert_eq!(renderer_2d.flush_count(), 2);
    assert_eq!(renderer_2d.frame_quad_count(), quad_count);
    renderer.end_frame().unwrap();

    // The second batch drew after the first one.
    assert_eq!(swapchain_pixels(&renderer).count_pixels(BLUE), 256);
}

#[test]
fn test_integration_offscreen_and_swapchain_in_one_frame() {
    let mut renderer = create_test_renderer(8, 8);
    let mut offscreen = Renderer2D::create_with_target_size(&renderer, 4, 4).unwrap();
    let mut onscreen = Renderer2D::create_for_swapchain(&renderer).unwrap();

    renderer.begin_frame().unwrap();
    offscreen.begin_frame(&mut renderer).unwrap();
    offscreen
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(2.0), Color4::GREEN)
        .unwrap();
    offscreen.end_frame(&mut renderer).unwrap();

    onscreen.begin_frame(&mut renderer).unwrap();
    onscreen
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(2.0), Color4::WHITE)
        .unwrap();
    onscreen.end_frame(&mut renderer).unwrap();
    assert_eq!(renderer.stats().render_passes, 2);
    renderer.end_frame().unwrap();

    let offscreen_image = offscreen.target_framebuffer().read_attachment(0).unwrap();
    assert_eq!(offscreen_image.count_pixels(GREEN), 16);
    assert_eq!(swapchain_pixels(&renderer).count_pixels(WHITE), 64);
}

// ============================================================================
// RAW RENDER PASS TESTS
// ============================================================================

#[test]
fn test_integration_hand_built_pass() {
    let mut renderer = create_test_renderer(8, 8);
    let shader_directory = renderer.config().shader_directory.clone();
    let context = renderer.rendering_context();

    let shader = Shader::create(
        context,
        &ShaderDescription {
            stages: vec![
                ShaderStageDescription::from_file(
                    ShaderStage::Vertex,
                    shader_directory.join("renderer_2d_quad.vs.hlsl"),
                )
                .unwrap(),
                ShaderStageDescription::from_file(
                    ShaderStage::Fragment,
                    shader_directory.join("renderer_2d_quad.ps.hlsl"),
                )
                .unwrap(),
            ],
        },
    )
    .unwrap();
    let target = Framebuffer::create(
        context,
        &FramebufferDescription {
            width: 8,
            height: 8,
            attachments: vec![FramebufferAttachmentDescription::with_format(ImageFormat::R8G8B8A8)],
        },
    )
    .unwrap();
    let render_pass = RenderPass::create(
        context,
        RenderPassDescription {
            target_framebuffer: target,
            target_framebuffer_attachments: vec![RenderPassAttachmentDescription::clear(Color4::BLUE)],
            pipeline_description: PipelineDescription::new(shader)
                .with_attribute(PipelineVertexAttributeType::Float2, "POSITION")
                .with_attribute(PipelineVertexAttributeType::Float4, "COLOR"),
        },
    )
    .unwrap();

    // One triangle over the lower-left half of clip space.
    let vertices: [f32; 18] = [
        -1.0, -1.0, 1.0, 0.0, 0.0, 1.0, //
        1.0, -1.0, 1.0, 0.0, 0.0, 1.0, //
        -1.0, 1.0, 1.0, 0.0, 0.0, 1.0,
    ];
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
    let indices: [u16; 3] = [0, 1, 2];
    let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
    let index_buffer = IndexBuffer::create(
        context,
        &IndexBufferDescription {
            size: index_bytes.len(),
            data_type: IndexBufferDataType::UInt16,
            update_frequency: IndexBufferUpdateFrequency::Never,
            data: Some(index_bytes),
        },
    )
    .unwrap();

    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&render_pass).unwrap();
    renderer.draw_indexed(&vertex_buffer, &index_buffer, 3).unwrap();
    renderer.end_render_pass();
    renderer.end_frame().unwrap();

    let image = render_pass.target_framebuffer().read_attachment(0).unwrap();
    let red = image.count_pixels(RED);
    let blue = image.count_pixels(BLUE);
    assert_eq!(red + blue, 64);
    assert!((28..=36).contains(&red), "half the target should be red, got {}", red);
}

#[test]
fn test_integration_load_and_dont_care_keep_contents() {
    let mut renderer = create_test_renderer(8, 8);
    let mut renderer_2d = Renderer2D::create_with_target_size(&renderer, 8, 8).unwrap();

    renderer.begin_frame().unwrap();
    renderer_2d.begin_frame(&mut renderer).unwrap();
    renderer_2d
        .submit_quad(&mut renderer, Vec2::ZERO, Vec2::splat(2.0), Color4::RED)
        .unwrap();
    renderer_2d.end_frame(&mut renderer).unwrap();
    renderer.end_frame().unwrap();
    assert_eq!(renderer_2d.target_framebuffer().read_attachment(0).unwrap().count_pixels(RED), 64);

    let pass_with = |load_operation: RenderPassAttachmentLoadOperation, clear_color: Color4| {
        RenderPass::create(
            renderer.rendering_context(),
            RenderPassDescription {
                target_framebuffer: renderer_2d.target_framebuffer().clone(),
                target_framebuffer_attachments: vec![RenderPassAttachmentDescription {
                    load_operation,
                    store_operation: RenderPassAttachmentStoreOperation::Store,
                    clear_color,
                }],
                pipeline_description: renderer_2d.render_pass().pipeline_description().clone(),
            },
        )
        .unwrap()
    };
    let load_pass = pass_with(RenderPassAttachmentLoadOperation::Load, Color4::BLUE);
    let dont_care_pass = pass_with(RenderPassAttachmentLoadOperation::DontCare, Color4::GREEN);
    let clear_pass = pass_with(RenderPassAttachmentLoadOperation::Clear, Color4::BLUE);

    renderer.begin_frame().unwrap();
    for render_pass in [&load_pass, &dont_care_pass] {
        renderer.begin_render_pass(render_pass).unwrap();
        renderer.end_render_pass();
    }
    renderer.end_frame().unwrap();

    let image = renderer_2d.target_framebuffer().read_attachment(0).unwrap();
    assert_eq!(image.count_pixels(RED), 64);

    renderer.begin_frame().unwrap();
    renderer.begin_render_pass(&clear_pass).unwrap();
    renderer.end_render_pass();
    renderer.end_frame().unwrap();

    let image = renderer_2d.target_framebuffer().read_attachment(0).unwrap();
    assert_eq!(image.count_pixels(BLUE), 64);
}
