//! enlarger-pipeline: Pure frame compositor for a digital darkroom enlarger
//! (sans-IO).
//!
//! Turns a loaded photograph into the frame the enlarger projects onto
//! paper:
//! orient -> fit and scale -> test-strip crop -> tint -> tone -> grid.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! bitmaps and byte slices and returns rendered frames. Timers, observers
//! and the exposure cycle itself live in `enlarger-session`.

pub mod compositor;
pub mod filter;
pub mod grid;
pub mod layout;
pub mod resample;
pub mod source;
pub mod state;
pub mod tone;
pub mod types;

pub use compositor::{FrameRequest, compose};
pub use filter::{ALIGNMENT_TINT, ContrastGrade, Tint};
pub use resample::ResampleFilter;
pub use source::SourceImage;
pub use state::ExposureState;
pub use types::{
    BACKGROUND, Dimensions, PipelineError, ProcessingParams, RenderedFrame, RgbaImage,
    StripProgress,
};
