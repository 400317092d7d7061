//! Test-strip counter.
//!
//! A test-strip run exposes the paper `total` times in a row. The counter
//! holds the zero-based index of the strip being exposed; it only moves
//! while exposing and drops back to zero whenever the cycle leaves the
//! run.

use enlarger_pipeline::StripProgress;

/// Number of strips in a run unless configured otherwise.
pub const DEFAULT_TOTAL_STRIPS: u32 = 5;

/// Result of finishing one strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripStep {
    /// Another strip follows; the counter now holds its index.
    Next(u32),
    /// That was the last strip. The counter is unchanged; the caller ends
    /// the run and resets it.
    Complete,
}

/// Position within a test-strip run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripCounter {
    current: u32,
    total: u32,
}

impl StripCounter {
    /// A counter at strip 0. A `total` of 0 is treated as 1.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            current: 0,
            total: total.max(1),
        }
    }

    /// Index of the strip being exposed.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Strips in a full run.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Finish the current strip.
    pub const fn advance(&mut self) -> StripStep {
        let next = self.current + 1;
        if next >= self.total {
            StripStep::Complete
        } else {
            self.current = next;
            StripStep::Next(next)
        }
    }

    /// Return to strip 0. Returns whether the counter changed.
    pub const fn reset(&mut self) -> bool {
        let changed = self.current != 0;
        self.current = 0;
        changed
    }

    /// Snapshot for observers and the compositor.
    #[must_use]
    pub const fn progress(&self, test_strip_mode: bool) -> StripProgress {
        StripProgress {
            current: self.current,
            total: self.total,
            test_strip_mode,
        }
    }
}

impl Default for StripCounter {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_STRIPS)
    }
}
