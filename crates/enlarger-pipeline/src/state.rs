//! Exposure states and their operator-facing metadata.
//!
//! The enlarger cycles through five states in a fixed order. Each
//! [`ExposureState`] decides what the compositor paints and which filter
//! tint it uses, and carries the labels the printing UI shows in its
//! stepper.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of the printing cycle.
///
/// The cycle is closed: [`next`](Self::next) after [`Blank`](Self::Blank)
/// returns to [`Setup`](Self::Setup). There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureState {
    /// Adjust settings. The processed image is shown with the grade tint.
    #[default]
    Setup,
    /// Position the paper under the dim red alignment filter.
    Align,
    /// Paper in place, image hidden.
    Hidden,
    /// Exposing the paper.
    Expose,
    /// Exposure finished, nothing shown.
    Blank,
}

impl ExposureState {
    /// All states in cycle order.
    pub const ALL: [Self; 5] = [
        Self::Setup,
        Self::Align,
        Self::Hidden,
        Self::Expose,
        Self::Blank,
    ];

    /// Position of this state in the cycle (0–4).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Setup => 0,
            Self::Align => 1,
            Self::Hidden => 2,
            Self::Expose => 3,
            Self::Blank => 4,
        }
    }

    /// State at a cycle position. Positions wrap, so any `usize` is valid.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Cyclic successor: the state a manual trigger moves to.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Setup => Self::Align,
            Self::Align => Self::Hidden,
            Self::Hidden => Self::Expose,
            Self::Expose => Self::Blank,
            Self::Blank => Self::Setup,
        }
    }

    /// Whether the compositor paints anything in this state.
    #[must_use]
    pub const fn is_painted(self) -> bool {
        matches!(self, Self::Setup | Self::Align | Self::Expose)
    }

    /// Whether the printing controls are shown alongside the image.
    ///
    /// Controls are hidden while exposing and afterwards so that no stray
    /// light reaches the paper.
    #[must_use]
    pub const fn controls_visible(self) -> bool {
        matches!(self, Self::Setup | Self::Align | Self::Hidden)
    }

    /// Stepper label, numbered from 1.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Setup => "1: SETUP",
            Self::Align => "2: ALIGN",
            Self::Hidden => "3: READY",
            Self::Expose => "4: EXPOSE",
            Self::Blank => "5: COMPLETE",
        }
    }

    /// One-line description shown under the stepper label.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Setup => "Adjust settings",
            Self::Align => "Position paper with red filter",
            Self::Hidden => "Paper in place",
            Self::Expose => "Exposing paper",
            Self::Blank => "Exposure complete",
        }
    }

    /// Instruction telling the operator what the next trigger does.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Setup => "Press SPACEBAR to enter alignment mode",
            Self::Align => "Align paper with red image, press SPACEBAR to hide image",
            Self::Hidden => "Press SPACEBAR to begin exposure",
            Self::Expose => "Exposing... Press SPACEBAR when done",
            Self::Blank => "Press SPACEBAR to restart cycle",
        }
    }

    /// Lowercase identifier, used for file names and log fields.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Align => "align",
            Self::Hidden => "hidden",
            Self::Expose => "expose",
            Self::Blank => "blank",
        }
    }
}

impl fmt::Display for ExposureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
