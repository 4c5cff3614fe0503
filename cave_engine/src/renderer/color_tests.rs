//! Unit tests for color.rs

use crate::renderer::Color4;

// ============================================================================
// PACKING TESTS
// ============================================================================

#[test]
fn test_from_rgba8_white_and_black() {
    assert_eq!(Color4::from_rgba8(0xFFFFFFFF), Color4::WHITE);
    assert_eq!(Color4::from_rgba8(0x000000FF), Color4::BLACK);
}

#[test]
fn test_to_rgba8_matches_channel_order() {
    assert_eq!(Color4::RED.to_rgba8(), 0xFF0000FF);
    assert_eq!(Color4::BLUE.to_rgba8(), 0x0000FFFF);
    assert_eq!(Color4::TRANSPARENT.to_rgba8(), 0x00000000);
}

#[test]
fn test_to_bytes_clamps_out_of_range_channels() {
    let color = Color4::new(2.0, -1.0, 0.5, 1.0);
    assert_eq!(color.to_bytes(), [255, 0, 128, 255]);
}

#[test]
fn test_from_bytes_round_trip_of_pure_channels() {
    let bytes = [255, 0, 255, 0];
    assert_eq!(Color4::from_bytes(bytes).to_bytes(), bytes);
}

// ============================================================================
// LAYOUT / OPERATOR TESTS
// ============================================================================

#[test]
fn test_color_is_sixteen_bytes() {
    assert_eq!(std::mem::size_of::<Color4>(), 16);
    let bytes = bytemuck::bytes_of(&Color4::WHITE);
    assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
}

#[test]
fn test_operators() {
    let half = Color4::WHITE * 0.5;
    assert_eq!(half, Color4::new(0.5, 0.5, 0.5, 0.5));
    assert_eq!(half + half, Color4::WHITE);
    assert_eq!(Color4::RED * Color4::WHITE, Color4::RED);
    assert_eq!(Color4::RED * Color4::GREEN, Color4::BLACK);
}
