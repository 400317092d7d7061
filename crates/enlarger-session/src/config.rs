//! Session configuration.
//!
//! A [`SessionConfig`] holds everything a fresh session starts from. It
//! deserializes from partial JSON, filling unspecified fields with their
//! defaults.

use enlarger_pipeline::{Dimensions, ProcessingParams};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::strip::DEFAULT_TOTAL_STRIPS;
use crate::timer::ExposureTime;

/// Starting configuration for an [`EnlargerSession`](crate::EnlargerSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial processing parameters.
    pub params: ProcessingParams,

    /// Exposure time in seconds. `None`, zero or a negative value means
    /// the operator ends each exposure manually.
    pub exposure_time_seconds: Option<f64>,

    /// Start with test-strip mode enabled.
    pub test_strip_mode: bool,

    /// Strips in a test-strip run.
    pub total_strips: u32,

    /// Initial display surface size.
    pub viewport: Dimensions,
}

impl SessionConfig {
    /// Default number of test strips.
    pub const DEFAULT_TOTAL_STRIPS: u32 = DEFAULT_TOTAL_STRIPS;
    /// Default viewport: a 1080p projector.
    pub const DEFAULT_VIEWPORT: Dimensions = Dimensions::new(1920, 1080);

    /// Parse a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConfigParse`] if the document is not valid
    /// JSON for this type, and [`SessionError::InvalidConfig`] if
    /// `total_strips` is zero.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialization alone cannot rule out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if `total_strips` is zero.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.total_strips == 0 {
            return Err(SessionError::InvalidConfig(
                "total_strips must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// The configured exposure time.
    #[must_use]
    pub fn exposure_time(&self) -> ExposureTime {
        ExposureTime::from(self.exposure_time_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            params: ProcessingParams::default(),
            exposure_time_seconds: None,
            test_strip_mode: false,
            total_strips: Self::DEFAULT_TOTAL_STRIPS,
            viewport: Self::DEFAULT_VIEWPORT,
        }
    }
}
