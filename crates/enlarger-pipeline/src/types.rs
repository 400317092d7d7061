//! Shared types for the enlarger frame compositor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::ContrastGrade;
use crate::resample::ResampleFilter;

/// Re-export `RgbaImage` so downstream crates can hold rendered frames
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Image or viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new set of dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Zero-height dimensions report an aspect of 0.
    #[must_use]
    pub fn aspect(self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            f64::from(self.width) / f64::from(self.height)
        }
    }

    /// Whether the image is taller than it is wide.
    #[must_use]
    pub const fn is_portrait(self) -> bool {
        self.height > self.width
    }

    /// Width and height swapped.
    #[must_use]
    pub const fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Whether either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-frame processing parameters.
///
/// Every field has a default matching a fresh printing session. Fields
/// are public and unvalidated; the caller keeps values inside the
/// documented domains. [`sanitized`](Self::sanitized) clamps anything
/// outside them so a bad value can degrade the picture but never crash
/// the compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    /// Multigrade filter grade, selects the tint.
    pub contrast_grade: ContrastGrade,

    /// Brightness in percent, `[50, 150]`.
    pub brightness: f64,

    /// Invert tones so a positive prints as a positive.
    pub invert: bool,

    /// Share of the fitted viewport the image occupies, `[0, 100]`.
    pub scale_percent: f64,

    /// Draw the alignment grid over the image in `Setup` and `Align`.
    pub show_grid: bool,

    /// Grid line spacing in frame pixels. Must be at least 1.
    pub grid_spacing: u32,

    /// Filter used to scale the source into the drawn region.
    pub resample: ResampleFilter,
}

impl ProcessingParams {
    /// Default contrast grade: grade 2, the balanced filter.
    pub const DEFAULT_CONTRAST_GRADE: ContrastGrade = ContrastGrade::GRADE_2;
    /// Default brightness in percent.
    pub const DEFAULT_BRIGHTNESS: f64 = 100.0;
    /// Lowest accepted brightness in percent.
    pub const MIN_BRIGHTNESS: f64 = 50.0;
    /// Highest accepted brightness in percent.
    pub const MAX_BRIGHTNESS: f64 = 150.0;
    /// Default for tonal inversion.
    pub const DEFAULT_INVERT: bool = true;
    /// Default scale in percent.
    pub const DEFAULT_SCALE_PERCENT: f64 = 100.0;
    /// Default alignment grid spacing in pixels.
    pub const DEFAULT_GRID_SPACING: u32 = 20;
    /// Default resampling filter.
    pub const DEFAULT_RESAMPLE: ResampleFilter = ResampleFilter::Triangle;

    /// Copy of these parameters with every field clamped into its domain.
    ///
    /// Non-finite numbers fall back to the field default.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let brightness = clamp_or_default(
            "brightness",
            self.brightness,
            Self::MIN_BRIGHTNESS,
            Self::MAX_BRIGHTNESS,
            Self::DEFAULT_BRIGHTNESS,
        );
        let scale_percent = clamp_or_default(
            "scale_percent",
            self.scale_percent,
            0.0,
            100.0,
            Self::DEFAULT_SCALE_PERCENT,
        );
        let grid_spacing = if self.grid_spacing == 0 {
            tracing::warn!("grid_spacing 0 is out of range, using 1");
            1
        } else {
            self.grid_spacing
        };
        Self {
            brightness,
            scale_percent,
            grid_spacing,
            ..self.clone()
        }
    }
}

fn clamp_or_default(name: &str, value: f64, min: f64, max: f64, default: f64) -> f64 {
    if !value.is_finite() {
        tracing::warn!("{name} {value} is not finite, using default {default}");
        return default;
    }
    let clamped = value.clamp(min, max);
    if (clamped - value).abs() > f64::EPSILON {
        tracing::warn!("{name} {value} outside [{min}, {max}], clamped to {clamped}");
    }
    clamped
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            contrast_grade: Self::DEFAULT_CONTRAST_GRADE,
            brightness: Self::DEFAULT_BRIGHTNESS,
            invert: Self::DEFAULT_INVERT,
            scale_percent: Self::DEFAULT_SCALE_PERCENT,
            show_grid: false,
            grid_spacing: Self::DEFAULT_GRID_SPACING,
            resample: Self::DEFAULT_RESAMPLE,
        }
    }
}

/// Progress through a test-strip run, as reported to observers and
/// consumed by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripProgress {
    /// Zero-based index of the strip currently being exposed.
    pub current: u32,
    /// Number of strips in a full run.
    pub total: u32,
    /// Whether test-strip mode is enabled.
    pub test_strip_mode: bool,
}

impl StripProgress {
    /// Share of the source revealed while exposing strip `current`:
    /// `(current + 1) / total`, capped at 1.
    ///
    /// Strips reveal cumulatively from the origin edge, so the share never
    /// shrinks as `current` grows.
    #[must_use]
    pub fn reveal_fraction(self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (f64::from(self.current) + 1.0)
            .min(f64::from(self.total))
            / f64::from(self.total)
    }
}

/// Output of one composition.
///
/// `Hidden` and `Blank` produce [`RenderedFrame::Blank`]: the surface is
/// left dark even though a source image is loaded.
///
/// Does not derive `PartialEq`; compare painted frames through
/// [`RgbaImage::as_raw`].
#[derive(Debug, Clone)]
pub enum RenderedFrame {
    /// A processed frame the size of the viewport.
    Painted(RgbaImage),
    /// Nothing is painted; the surface stays dark.
    Blank(Dimensions),
}

impl RenderedFrame {
    /// Frame dimensions (always the viewport size).
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        match self {
            Self::Painted(image) => Dimensions::new(image.width(), image.height()),
            Self::Blank(dimensions) => *dimensions,
        }
    }

    /// Whether the frame carries pixels to present.
    #[must_use]
    pub const fn is_painted(&self) -> bool {
        matches!(self, Self::Painted(_))
    }

    /// The painted pixels, if any.
    #[must_use]
    pub const fn image(&self) -> Option<&RgbaImage> {
        match self {
            Self::Painted(image) => Some(image),
            Self::Blank(_) => None,
        }
    }

    /// The frame as an RGBA image. Blank frames become opaque black.
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        match self {
            Self::Painted(image) => image.clone(),
            Self::Blank(dimensions) => {
                RgbaImage::from_pixel(dimensions.width, dimensions.height, BACKGROUND)
            }
        }
    }
}

/// Colour of viewport pixels outside the drawn image.
pub const BACKGROUND: image::Rgba<u8> = image::Rgba([0, 0, 0, 255]);

/// Errors that can occur while loading a source image.
///
/// Rendering itself never fails: a missing image or out-of-domain
/// parameter degrades to "nothing renders" instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A raw pixel buffer does not match its stated dimensions.
    #[error("raw RGBA buffer of {len} bytes does not match {width}x{height}")]
    InvalidDimensions {
        /// Stated width in pixels.
        width: u32,
        /// Stated height in pixels.
        height: u32,
        /// Actual buffer length in bytes.
        len: usize,
    },
}
