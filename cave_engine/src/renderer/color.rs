/// Linear RGBA color

use std::ops::{Add, Mul};
use bytemuck::{Pod, Zeroable};

/// RGBA color with f32 channels in [0, 1]
///
/// `#[repr(C)]` so it can be written straight into vertex data.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const BLACK: Color4 = Color4::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color4 = Color4::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Color4 = Color4::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color4 = Color4::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color4 = Color4::new(0.0, 0.0, 1.0, 1.0);
    pub const TRANSPARENT: Color4 = Color4::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Decode a packed `0xRRGGBBAA` value
    pub fn from_rgba8(packed: u32) -> Self {
        let channel = |shift: u32| ((packed >> shift) & 0xFF) as f32 / 255.0;
        Self::new(channel(24), channel(16), channel(8), channel(0))
    }

    /// Encode as packed `0xRRGGBBAA`, clamping each channel
    pub fn to_rgba8(self) -> u32 {
        let bytes = self.to_bytes();
        u32::from_be_bytes(bytes)
    }

    /// Channels as `[r, g, b, a]` bytes, clamped and rounded
    pub fn to_bytes(self) -> [u8; 4] {
        let quantize = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b), quantize(self.a)]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::new(
            bytes[0] as f32 / 255.0,
            bytes[1] as f32 / 255.0,
            bytes[2] as f32 / 255.0,
            bytes[3] as f32 / 255.0,
        )
    }
}

impl Add for Color4 {
    type Output = Color4;

    fn add(self, rhs: Color4) -> Color4 {
        Color4::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

/// Component-wise modulation
impl Mul for Color4 {
    type Output = Color4;

    fn mul(self, rhs: Color4) -> Color4 {
        Color4::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }
}

impl Mul<f32> for Color4 {
    type Output = Color4;

    fn mul(self, rhs: f32) -> Color4 {
        Color4::new(self.r * rhs, self.g * rhs, self.b * rhs, self.a * rhs)
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
