//! Per-pixel tonal transform: luma, inversion, brightness, tint.
//!
//! For each pixel:
//!
//! ```text
//! gray  = 0.299*R + 0.587*G + 0.114*B
//! value = invert ? 255 - gray : gray
//! value = clamp(value * brightness / 100, 0, 255)
//! C_out = value * tint.C / 255        for C in R, G, B
//! ```
//!
//! Alpha is passed through untouched. Output channels are rounded to the
//! nearest integer, as a canvas does when storing fractional values.

use image::Rgba;

use crate::filter::Tint;
use crate::types::RgbaImage;

/// Luma weights for R, G, B.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Tone settings for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParams {
    /// Filter tint applied after the tone curve.
    pub tint: Tint,
    /// Invert tones before brightness is applied.
    pub invert: bool,
    /// Brightness in percent.
    pub brightness: f64,
}

/// Weighted luminance of an RGB triple, `0.0..=255.0`.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    LUMA_WEIGHTS[2].mul_add(
        f64::from(b),
        LUMA_WEIGHTS[0].mul_add(f64::from(r), LUMA_WEIGHTS[1] * f64::from(g)),
    )
}

/// Tone value of a pixel after inversion and brightness, `0.0..=255.0`.
#[must_use]
pub fn tone_value(r: u8, g: u8, b: u8, invert: bool, brightness: f64) -> f64 {
    let gray = luma(r, g, b);
    let value = if invert { 255.0 - gray } else { gray };
    (value * brightness / 100.0).clamp(0.0, 255.0)
}

/// Apply the full transform to a single pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tone_pixel(pixel: Rgba<u8>, params: &ToneParams) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    let value = tone_value(r, g, b, params.invert, params.brightness);
    let channel = |tint: u8| (value * f64::from(tint) / 255.0).round().clamp(0.0, 255.0) as u8;
    let [tr, tg, tb] = params.tint.channels();
    Rgba([channel(tr), channel(tg), channel(tb), a])
}

/// Apply the transform to every pixel of `image` in place.
///
/// Pixels are independent, so the result does not depend on visit order.
pub fn apply_tone(image: &mut RgbaImage, params: &ToneParams) {
    for pixel in image.pixels_mut() {
        *pixel = tone_pixel(*pixel, params);
    }
}
