//! Triangle rasterization for the software device
//!
//! Works on RGBA8 texel slices. Positions arrive in normalized device
//! coordinates (x right, y up); the viewport transform flips y so that row 0
//! is the top of the render target. Pixels are covered when their center lies
//! inside the triangle.

use glam::Vec2;

use crate::renderer::{
    Color4, ImageAddressMode, ImageFilteringMode, PipelineCullMode, PipelineFillMode,
    PipelineFrontFaceDirection, SamplerDescription, Viewport,
};

/// Vertex after input assembly
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RasterVertex {
    /// Normalized device coordinates
    pub position: Vec2,
    pub color: Color4,
    pub texcoord: Option<Vec2>,
}

/// Fixed-function state for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct RasterState {
    pub fill_mode: PipelineFillMode,
    pub cull_mode: PipelineCullMode,
    pub front_face: PipelineFrontFaceDirection,
    pub viewport: Viewport,
}

pub(crate) struct RasterTarget<'a> {
    pub width: u32,
    pub height: u32,
    pub texels: &'a mut [[u8; 4]],
}

pub(crate) struct SampledTexture<'a> {
    pub width: u32,
    pub height: u32,
    pub texels: &'a [[u8; 4]],
    pub sampler: SamplerDescription,
}

/// Rasterize one triangle
///
/// # Returns
///
/// `false` if the triangle was culled or degenerate
pub(crate) fn draw_triangle(
    target: &mut RasterTarget,
    state: &RasterState,
    vertices: [&RasterVertex; 3],
    texture: Option<&SampledTexture>,
) -> bool {
    let [a, b, c] = vertices;

    let ndc_area = (b.position - a.position).perp_dot(c.position - a.position);
    if ndc_area == 0.0 || is_culled(ndc_area, state) {
        return false;
    }

    let screen = [
        to_screen(a.position, &state.viewport),
        to_screen(b.position, &state.viewport),
        to_screen(c.position, &state.viewport),
    ];

    match state.fill_mode {
        PipelineFillMode::Solid => fill_triangle(target, state, screen, vertices, texture),
        PipelineFillMode::Wireframe => {
            let filter = texture.map(|texture| texture.sampler.mag_filter);
            for (from, to) in [(0, 1), (1, 2), (2, 0)] {
                draw_line(target, state, (screen[from], vertices[from]), (screen[to], vertices[to]), texture, filter);
            }
        }
    }
    true
}

fn is_culled(ndc_area: f32, state: &RasterState) -> bool {
    let counter_clockwise = ndc_area > 0.0;
    let front_facing = match state.front_face {
        PipelineFrontFaceDirection::CounterClockwise => counter_clockwise,
        PipelineFrontFaceDirection::Clockwise => !counter_clockwise,
    };
    match state.cull_mode {
        PipelineCullMode::None => false,
        PipelineCullMode::Front => front_facing,
        PipelineCullMode::Back => !front_facing,
    }
}

/// NDC to render target pixels, y down
pub(crate) fn to_screen(ndc: Vec2, viewport: &Viewport) -> Vec2 {
    Vec2::new(
        viewport.x + (ndc.x + 1.0) * 0.5 * viewport.width,
        viewport.y + (1.0 - ndc.y) * 0.5 * viewport.height,
    )
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` covered by both viewport and target
fn scissor(target: &RasterTarget, viewport: &Viewport) -> (i64, i64, i64, i64) {
    let x0 = viewport.x.floor().max(0.0) as i64;
    let y0 = viewport.y.floor().max(0.0) as i64;
    let x1 = ((viewport.x + viewport.width).ceil() as i64).min(target.width as i64);
    let y1 = ((viewport.y + viewport.height).ceil() as i64).min(target.height as i64);
    (x0, y0, x1, y1)
}

fn fill_triangle(
    target: &mut RasterTarget,
    state: &RasterState,
    screen: [Vec2; 3],
    vertices: [&RasterVertex; 3],
    texture: Option<&SampledTexture>,
) {
    let [p0, p1, p2] = screen;
    let mut area = edge(p0, p1, p2);
    let sign = if area < 0.0 { -1.0 } else { 1.0 };
    area *= sign;
    if area == 0.0 {
        return;
    }

    let filter = texture.map(|texture| select_filter(texture, vertices, area));

    let (sx0, sy0, sx1, sy1) = scissor(target, &state.viewport);
    let min = p0.min(p1).min(p2);
    let max = p0.max(p1).max(p2);
    let x0 = (min.x.floor() as i64).max(sx0);
    let y0 = (min.y.floor() as i64).max(sy0);
    let x1 = (max.x.ceil() as i64).min(sx1);
    let y1 = (max.y.ceil() as i64).min(sy1);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(p1, p2, p) * sign;
            let w1 = edge(p2, p0, p) * sign;
            let w2 = edge(p0, p1, p) * sign;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let weights = [w0 / area, w1 / area, w2 / area];
            let color = shade(vertices, weights, texture, filter);
            write_pixel(target, x, y, color);
        }
    }
}

fn draw_line(
    target: &mut RasterTarget,
    state: &RasterState,
    from: (Vec2, &RasterVertex),
    to: (Vec2, &RasterVertex),
    texture: Option<&SampledTexture>,
    filter: Option<ImageFilteringMode>,
) {
    let (sx0, sy0, sx1, sy1) = scissor(target, &state.viewport);
    let delta = to.0 - from.0;
    let bounds = (Vec2::new(sx0 as f32, sy0 as f32), Vec2::new(sx1 as f32, sy1 as f32));
    let (t_enter, t_exit) = match clip_segment(from.0, delta, bounds) {
        Some(range) => range,
        None => return,
    };
    let visible = delta * (t_exit - t_enter);
    let steps = visible.x.abs().max(visible.y.abs()).ceil().max(1.0) as u32;

    for step in 0..=steps {
        let t = t_enter + (t_exit - t_enter) * (step as f32 / steps as f32);
        let point = from.0 + delta * t;
        let (x, y) = (point.x.floor() as i64, point.y.floor() as i64);
        if x < sx0 || x >= sx1 || y < sy0 || y >= sy1 {
            continue;
        }
        let color = shade([from.1, to.1, to.1], [1.0 - t, t, 0.0], texture, filter);
        write_pixel(target, x, y, color);
    }
}

/// Parameter range of `from + t * delta`, `t` in `[0, 1]`, inside `bounds`
///
/// Liang-Barsky clipping. `None` if the segment misses the rectangle or has a
/// non-finite endpoint.
fn clip_segment(from: Vec2, delta: Vec2, bounds: (Vec2, Vec2)) -> Option<(f32, f32)> {
    if !from.is_finite() || !delta.is_finite() {
        return None;
    }
    let (min, max) = bounds;
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    for (p, q) in [
        (-delta.x, from.x - min.x),
        (delta.x, max.x - from.x),
        (-delta.y, from.y - min.y),
        (delta.y, max.y - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else if p < 0.0 {
            t_enter = t_enter.max(q / p);
        } else {
            t_exit = t_exit.min(q / p);
        }
    }
    (t_enter <= t_exit).then_some((t_enter, t_exit))
}

/// Interpolated vertex color, modulated by the texture when one is bound
fn shade(
    vertices: [&RasterVertex; 3],
    weights: [f32; 3],
    texture: Option<&SampledTexture>,
    filter: Option<ImageFilteringMode>,
) -> Color4 {
    let color = vertices[0].color * weights[0]
        + vertices[1].color * weights[1]
        + vertices[2].color * weights[2];

    let texcoords = (vertices[0].texcoord, vertices[1].texcoord, vertices[2].texcoord);
    match (texture, filter, texcoords) {
        (Some(texture), Some(filter), (Some(t0), Some(t1), Some(t2))) => {
            let uv = t0 * weights[0] + t1 * weights[1] + t2 * weights[2];
            color * sample(texture, uv, filter)
        }
        _ => color,
    }
}

/// Minification filter when a pixel covers more than one texel
fn select_filter(texture: &SampledTexture, vertices: [&RasterVertex; 3], screen_area: f32) -> ImageFilteringMode {
    let (Some(t0), Some(t1), Some(t2)) = (vertices[0].texcoord, vertices[1].texcoord, vertices[2].texcoord) else {
        return texture.sampler.mag_filter;
    };
    let texel_area = (t1 - t0).perp_dot(t2 - t0).abs() * texture.width as f32 * texture.height as f32;
    if texel_area > screen_area {
        texture.sampler.min_filter
    } else {
        texture.sampler.mag_filter
    }
}

fn write_pixel(target: &mut RasterTarget, x: i64, y: i64, color: Color4) {
    let index = y as usize * target.width as usize + x as usize;
    if let Some(texel) = target.texels.get_mut(index) {
        *texel = color.to_bytes();
    }
}

/// Sample a texture at normalized coordinates
pub(crate) fn sample(texture: &SampledTexture, uv: Vec2, filter: ImageFilteringMode) -> Color4 {
    if texture.width == 0 || texture.height == 0 || texture.texels.is_empty() {
        return Color4::WHITE;
    }
    let sampler = &texture.sampler;
    let fetch = |x: i64, y: i64| -> Color4 {
        let x = address(x, texture.width, sampler.address_u);
        let y = address(y, texture.height, sampler.address_v);
        let index = (y * texture.width + x) as usize;
        texture.texels.get(index).map(|texel| Color4::from_bytes(*texel)).unwrap_or(Color4::WHITE)
    };

    match filter {
        ImageFilteringMode::Nearest => {
            let x = (uv.x * texture.width as f32).floor() as i64;
            let y = (uv.y * texture.height as f32).floor() as i64;
            fetch(x, y)
        }
        ImageFilteringMode::Linear => {
            let fx = uv.x * texture.width as f32 - 0.5;
            let fy = uv.y * texture.height as f32 - 0.5;
            let (x0, y0) = (fx.floor(), fy.floor());
            let (tx, ty) = (fx - x0, fy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let top = fetch(x0, y0) * (1.0 - tx) + fetch(x0 + 1, y0) * tx;
            let bottom = fetch(x0, y0 + 1) * (1.0 - tx) + fetch(x0 + 1, y0 + 1) * tx;
            top * (1.0 - ty) + bottom * ty
        }
    }
}

/// Resolve an integer texel coordinate against an address mode
pub(crate) fn address(coordinate: i64, size: u32, mode: ImageAddressMode) -> u32 {
    let size = size as i64;
    let resolved = match mode {
        ImageAddressMode::Wrap => coordinate.rem_euclid(size),
        ImageAddressMode::Clamp => coordinate.clamp(0, size - 1),
        ImageAddressMode::Mirror => {
            let period = coordinate.rem_euclid(2 * size);
            if period >= size { 2 * size - 1 - period } else { period }
        }
    };
    resolved as u32
}

#[cfg(test)]
#[path = "software_rasterizer_tests.rs"]
mod tests;
