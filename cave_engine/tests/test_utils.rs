#![allow(dead_code)]
//! Shared helpers for the integration tests
//!
//! Every test builds its own headless renderer on the software backend, so
//! tests need no window system and can run in parallel.

use cave_engine::cave::platform::HeadlessWindow;
use cave_engine::cave::render::{ImageReadback, ResourceKind};
use cave_engine::cave::{Renderer, RendererConfig};

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

/// Initialized renderer presenting to a `width` x `height` headless window
pub fn create_test_renderer(width: u32, height: u32) -> Renderer {
    let mut renderer = Renderer::new();
    renderer
        .initialize(&HeadlessWindow::new(width, height), RendererConfig::default())
        .unwrap();
    renderer
}

/// Live native objects of `kind` on the renderer's device
pub fn live_objects(renderer: &Renderer, kind: ResourceKind) -> usize {
    renderer.rendering_context().device().resource_stats().live(kind)
}

/// Current swapchain back buffer
pub fn swapchain_pixels(renderer: &Renderer) -> ImageReadback {
    renderer.rendering_context().read_swapchain_image().unwrap()
}
