//! Alignment grid overlay.
//!
//! One-pixel lines every `spacing` pixels, blended half-way toward white.
//! Vertical lines are drawn first and horizontal lines over them, so
//! crossings are blended twice and read slightly brighter.

use image::Rgba;

use crate::types::RgbaImage;

/// Opacity of grid lines.
const LINE_ALPHA: f64 = 0.5;

/// Blend a pixel toward white by [`LINE_ALPHA`]. Alpha is left alone.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lighten(pixel: &mut Rgba<u8>) {
    for c in &mut pixel.0[..3] {
        let blended = f64::from(*c).mul_add(1.0 - LINE_ALPHA, 255.0 * LINE_ALPHA);
        *c = blended.round().clamp(0.0, 255.0) as u8;
    }
}

/// Draw the grid over `image`. Lines start one `spacing` in from the
/// top-left corner; a spacing of 0 draws nothing.
pub fn draw_grid(image: &mut RgbaImage, spacing: u32) {
    if spacing == 0 {
        return;
    }
    let (width, height) = image.dimensions();
    let step = spacing as usize;

    for x in (spacing..width).step_by(step) {
        for y in 0..height {
            lighten(image.get_pixel_mut(x, y));
        }
    }
    for y in (spacing..height).step_by(step) {
        for x in 0..width {
            lighten(image.get_pixel_mut(x, y));
        }
    }
}
