//! Frame composition: source + parameters + exposure state -> frame.
//!
//! [`compose`] is a pure function. It keeps no state between calls and
//! identical requests produce byte-identical frames.
//!
//! # Steps
//!
//! 1. Orient: portrait sources are rotated 90° clockwise so the image is
//!    landscape in the viewport.
//! 2. Fit and scale: the oriented image is fitted into the viewport and
//!    shrunk to `scale_percent`, centred.
//! 3. Strip crop: while exposing a test strip, only the first
//!    `(current + 1) / total` of the long axis is drawn.
//! 4. Tint: `Align` uses the alignment filter, every other painted state
//!    the grade filter.
//! 5. Tone: luma, inversion, brightness and tint per drawn pixel.
//! 6. Grid: optional alignment grid in `Setup` and `Align`.
//!
//! `Hidden` and `Blank` skip all of the above and yield a blank frame.

use std::borrow::Cow;

use crate::filter::{ALIGNMENT_TINT, ContrastGrade, Tint};
use crate::layout::{self, Placement};
use crate::resample::resize_exact;
use crate::source::SourceImage;
use crate::state::ExposureState;
use crate::tone::{ToneParams, apply_tone};
use crate::types::{BACKGROUND, Dimensions, ProcessingParams, RenderedFrame, RgbaImage, StripProgress};

/// Everything one composition depends on.
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    /// The loaded image.
    pub source: &'a SourceImage,
    /// Processing parameters for this frame.
    pub params: &'a ProcessingParams,
    /// Current exposure state.
    pub state: ExposureState,
    /// Test-strip progress, `Some` only while test-strip mode is enabled.
    pub strip: Option<StripProgress>,
    /// Size of the display surface.
    pub viewport: Dimensions,
}

/// Filter tint for a state and grade.
///
/// `Align` always gets the alignment filter, whatever the grade.
#[must_use]
pub const fn tint_for(state: ExposureState, grade: ContrastGrade) -> Tint {
    match state {
        ExposureState::Align => ALIGNMENT_TINT,
        _ => grade.tint(),
    }
}

/// Share of the long axis to draw.
///
/// Below 1 only while exposing with test-strip mode enabled.
#[must_use]
pub fn crop_fraction(state: ExposureState, strip: Option<StripProgress>) -> f64 {
    match (state, strip) {
        (ExposureState::Expose, Some(progress)) if progress.test_strip_mode => {
            progress.reveal_fraction()
        }
        _ => 1.0,
    }
}

/// Compose one frame.
#[must_use]
pub fn compose(request: &FrameRequest<'_>) -> RenderedFrame {
    let viewport = request.viewport;
    if !request.state.is_painted() {
        return RenderedFrame::Blank(viewport);
    }

    let params = request.params.sanitized();
    let mut frame = RgbaImage::from_pixel(viewport.width, viewport.height, BACKGROUND);

    let oriented_dims = request.source.oriented_dimensions();
    let Some(placement) = layout::place(oriented_dims, viewport, params.scale_percent) else {
        tracing::debug!(%viewport, image = %oriented_dims, "nothing to draw");
        return RenderedFrame::Painted(frame);
    };

    let fraction = crop_fraction(request.state, request.strip);
    if let Some(drawn) = draw_image(request, &params, placement, fraction) {
        image::imageops::replace(
            &mut frame,
            &drawn,
            i64::from(placement.x),
            i64::from(placement.y),
        );
    }

    tracing::debug!(
        state = request.state.slug(),
        %viewport,
        drawn = %placement.size,
        x = placement.x,
        y = placement.y,
        fraction,
        rotated = request.source.rotated(),
        "composed frame"
    );
    RenderedFrame::Painted(frame)
}

/// Produce the processed pixels for the drawn region, cropped to
/// `fraction` of the long axis. Returns `None` if the crop is empty.
fn draw_image(
    request: &FrameRequest<'_>,
    params: &ProcessingParams,
    placement: Placement,
    fraction: f64,
) -> Option<RgbaImage> {
    let source = request.source;
    let oriented: Cow<'_, RgbaImage> = if source.rotated() {
        Cow::Owned(image::imageops::rotate90(source.pixels()))
    } else {
        Cow::Borrowed(source.pixels())
    };

    let oriented_dims = Dimensions::new(oriented.width(), oriented.height());
    let axis = layout::long_axis(oriented_dims);
    let src_region = layout::reveal_along(oriented_dims, axis, fraction);
    let dst_region = layout::reveal_along(placement.size, axis, fraction);
    if src_region.is_empty() || dst_region.is_empty() {
        return None;
    }

    let cropped: Cow<'_, RgbaImage> = if src_region == oriented_dims {
        oriented
    } else {
        Cow::Owned(
            image::imageops::crop_imm(
                oriented.as_ref(),
                0,
                0,
                src_region.width,
                src_region.height,
            )
            .to_image(),
        )
    };

    let mut drawn = resize_exact(
        &cropped,
        dst_region.width,
        dst_region.height,
        params.resample,
    );

    apply_tone(
        &mut drawn,
        &ToneParams {
            tint: tint_for(request.state, params.contrast_grade),
            invert: params.invert,
            brightness: params.brightness,
        },
    );

    if params.show_grid && matches!(request.state, ExposureState::Setup | ExposureState::Align) {
        crate::grid::draw_grid(&mut drawn, params.grid_spacing);
    }

    Some(drawn)
}
