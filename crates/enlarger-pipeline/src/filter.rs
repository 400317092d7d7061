//! Multigrade filter tints.
//!
//! Variable-contrast paper carries two emulsions: a soft one sensitive to
//! green light and a hard one sensitive to blue. Filtering the enlarger
//! light toward green lowers contrast and toward magenta raises it. Each
//! half-grade from 0 to 5 has its own fixed tint; there is no
//! interpolation between entries.
//!
//! While the operator aligns the paper a separate dim red filter is used,
//! which the paper is effectively blind to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An RGB filter colour. Each channel scales the matching output channel
/// by `channel / 255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Tint {
    /// Create a new tint.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array in RGB order.
    #[must_use]
    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Dim red filter used while aligning the paper, independent of grade.
pub const ALIGNMENT_TINT: Tint = Tint::new(50, 0, 0);

/// Grade tints indexed by half-steps: index 0 is grade 0, index 10 is
/// grade 5.
const GRADE_TINTS: [Tint; ContrastGrade::STEPS] = [
    Tint::new(50, 255, 50),   // 0: very soft, strong green
    Tint::new(70, 240, 70),   // 0.5
    Tint::new(90, 220, 90),   // 1
    Tint::new(120, 200, 120), // 1.5
    Tint::new(150, 180, 150), // 2: balanced
    Tint::new(170, 160, 170), // 2.5
    Tint::new(190, 140, 190), // 3
    Tint::new(210, 120, 210), // 3.5
    Tint::new(230, 100, 230), // 4
    Tint::new(240, 80, 240),  // 4.5
    Tint::new(255, 50, 255),  // 5: hard, magenta
];

/// A multigrade contrast grade in half-grade steps from 0 to 5.
///
/// Stored as a half-step count so the eleven grades compare and hash
/// exactly. Serializes as the grade number (`2.5`, not `5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ContrastGrade(u8);

impl ContrastGrade {
    /// Number of selectable grades.
    pub const STEPS: usize = 11;
    /// Softest grade.
    pub const GRADE_0: Self = Self(0);
    /// Balanced grade, the session default.
    pub const GRADE_2: Self = Self(4);
    /// Hardest grade.
    pub const GRADE_5: Self = Self(10);

    /// All grades from softest to hardest.
    #[must_use]
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=10).map(Self)
    }

    /// Exact grade from its number. Returns `None` unless `grade` is one of
    /// `0, 0.5, …, 5`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_grade(grade: f64) -> Option<Self> {
        let doubled = grade * 2.0;
        if !(0.0..=10.0).contains(&doubled) || (doubled - doubled.round()).abs() > 1e-9 {
            return None;
        }
        Some(Self(doubled.round() as u8))
    }

    /// Half-step count, `0..=10`.
    #[must_use]
    pub const fn half_steps(self) -> u8 {
        self.0
    }

    /// The grade number, `0.0..=5.0`.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    /// Filter tint for this grade.
    #[must_use]
    pub const fn tint(self) -> Tint {
        GRADE_TINTS[self.0 as usize]
    }
}

impl Default for ContrastGrade {
    fn default() -> Self {
        Self::GRADE_2
    }
}

impl fmt::Display for ContrastGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TryFrom<f64> for ContrastGrade {
    type Error = String;

    fn try_from(grade: f64) -> Result<Self, Self::Error> {
        Self::from_grade(grade)
            .ok_or_else(|| format!("contrast grade must be one of 0, 0.5, ..., 5, got {grade}"))
    }
}

impl From<ContrastGrade> for f64 {
    fn from(grade: ContrastGrade) -> Self {
        grade.value()
    }
}
