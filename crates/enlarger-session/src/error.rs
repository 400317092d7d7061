//! Session error types.

use enlarger_pipeline::PipelineError;

/// Errors raised while configuring a session or loading its image.
///
/// Runtime operations (triggers, timer fires, setters) never fail:
/// invalid timer input falls back to manual timing and a missing image
/// simply renders nothing.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session configuration document could not be parsed.
    #[error("failed to parse session config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    /// The source image could not be loaded.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
