//! Source image loading.
//!
//! A [`SourceImage`] is the bitmap the operator loaded. It is read-only
//! once constructed and shared by every composition. Whether the image is
//! shown rotated is decided once, here, from its shape.

use image::RgbaImage;

use crate::types::{Dimensions, PipelineError};

/// An immutable RGBA source bitmap.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    rotated: bool,
}

impl SourceImage {
    /// Wrap an already-decoded RGBA image.
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        let rotated = Dimensions::new(pixels.width(), pixels.height()).is_portrait();
        Self { pixels, rotated }
    }

    /// Build a source from a raw RGBA8 buffer, row-major, 4 bytes per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if `raw.len()` is not
    /// `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Result<Self, PipelineError> {
        let len = raw.len();
        let expected = Dimensions::new(width, height).pixel_count() * 4;
        if u64::try_from(len).ok() != Some(expected) {
            return Err(PipelineError::InvalidDimensions { width, height, len });
        }
        RgbaImage::from_raw(width, height, raw)
            .map(Self::new)
            .ok_or(PipelineError::InvalidDimensions { width, height, len })
    }

    /// Decode encoded image bytes (PNG, JPEG, BMP, WebP).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
    /// Returns [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let img = image::load_from_memory(bytes)?;
        Ok(Self::new(img.to_rgba8()))
    }

    /// The source pixels.
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Stored dimensions, before any rotation.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }

    /// Whether the image is portrait and is drawn rotated by 90°.
    #[must_use]
    pub const fn rotated(&self) -> bool {
        self.rotated
    }

    /// Dimensions as drawn: swapped for rotated images, so the logical
    /// image is always landscape or square.
    #[must_use]
    pub fn oriented_dimensions(&self) -> Dimensions {
        let dims = self.dimensions();
        if self.rotated { dims.transposed() } else { dims }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = SourceImage::decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = SourceImage::decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_round_trips_pixels() {
        let img = RgbaImage::from_fn(17, 31, |x, y| {
            image::Rgba([u8::try_from(x).unwrap(), u8::try_from(y).unwrap(), 7, 255])
        });
        let source = SourceImage::decode(&encode_png(&img)).unwrap();
        assert_eq!(source.dimensions(), Dimensions::new(17, 31));
        assert_eq!(source.pixels().as_raw(), img.as_raw());
    }

    #[test]
    fn portrait_is_rotated() {
        let source = SourceImage::new(RgbaImage::new(30, 40));
        assert!(source.rotated());
        assert_eq!(source.oriented_dimensions(), Dimensions::new(40, 30));
    }

    #[test]
    fn landscape_and_square_are_not_rotated() {
        assert!(!SourceImage::new(RgbaImage::new(40, 30)).rotated());
        assert!(!SourceImage::new(RgbaImage::new(8, 8)).rotated());
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(SourceImage::from_raw(2, 2, vec![0; 16]).is_ok());
        let result = SourceImage::from_raw(2, 2, vec![0; 15]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 2,
                height: 2,
                len: 15
            })
        ));
    }

    #[test]
    fn from_raw_rejects_oversized_buffer() {
        // `RgbaImage::from_raw` accepts a longer buffer; the source must not.
        assert!(SourceImage::from_raw(1, 1, vec![0; 8]).is_err());
    }
}
