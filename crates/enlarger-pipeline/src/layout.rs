//! Frame geometry: fitting the image into the viewport, scaling, and
//! test-strip cropping.
//!
//! All computations happen in oriented space, where a portrait source has
//! already had its width and height swapped. The fit rule is:
//!
//! ```text
//! if image_aspect > viewport_aspect { fit width } else { fit height }
//! ```
//!
//! so the fitted image never overflows the viewport. The drawn region is
//! then `scale_percent / 100` of the fitted size, centred.

use crate::types::Dimensions;

/// Where the image lands inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge of the drawn region in viewport pixels.
    pub x: u32,
    /// Top edge of the drawn region in viewport pixels.
    pub y: u32,
    /// Size of the drawn region.
    pub size: Dimensions,
}

/// Axis along which test strips are revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Strips advance left to right.
    Horizontal,
    /// Strips advance top to bottom.
    Vertical,
}

/// The longer axis of `dims`. Square images use the horizontal axis.
#[must_use]
pub const fn long_axis(dims: Dimensions) -> Axis {
    if dims.width >= dims.height {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

/// Fitted size of an image with `image` proportions inside `viewport`,
/// before scaling. Returns `(width, height)` in fractional pixels.
#[must_use]
pub fn fit(image: Dimensions, viewport: Dimensions) -> (f64, f64) {
    let image_aspect = image.aspect();
    if image_aspect <= 0.0 {
        return (0.0, 0.0);
    }
    let vw = f64::from(viewport.width);
    let vh = f64::from(viewport.height);
    if image_aspect > viewport.aspect() {
        (vw, vw / image_aspect)
    } else {
        (vh * image_aspect, vh)
    }
}

/// Compute the drawn region for an oriented image.
///
/// Returns `None` when nothing would be drawn: an empty image or viewport,
/// or a scale that rounds the region down to zero pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn place(image: Dimensions, viewport: Dimensions, scale_percent: f64) -> Option<Placement> {
    if image.is_empty() || viewport.is_empty() {
        return None;
    }
    let (fit_w, fit_h) = fit(image, viewport);
    let scale = (scale_percent / 100.0).clamp(0.0, 1.0);
    let width = (fit_w * scale).round().min(f64::from(viewport.width)) as u32;
    let height = (fit_h * scale).round().min(f64::from(viewport.height)) as u32;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Placement {
        x: (viewport.width - width) / 2,
        y: (viewport.height - height) / 2,
        size: Dimensions::new(width, height),
    })
}

/// Number of pixels revealed out of `extent` for a reveal `fraction`.
///
/// Rounds up so the first strip is never empty, and never exceeds
/// `extent`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn revealed_extent(extent: u32, fraction: f64) -> u32 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ((f64::from(extent) * fraction).ceil() as u32).min(extent)
}

/// Shrink `dims` along `axis` to `fraction` of its extent, keeping the
/// origin edge.
#[must_use]
pub fn reveal_along(dims: Dimensions, axis: Axis, fraction: f64) -> Dimensions {
    match axis {
        Axis::Horizontal => Dimensions::new(revealed_extent(dims.width, fraction), dims.height),
        Axis::Vertical => Dimensions::new(dims.width, revealed_extent(dims.height, fraction)),
    }
}
