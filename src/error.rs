//! Fatal errors surfaced by the public API
//!
//! Data-dependent failures (service outages, drift rejections, strategies
//! that do not apply) never reach this type; they degrade to "best text so
//! far" inside the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HumanizeError {
    /// Configuration payload had the wrong shape (wrong JSON types etc.)
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] serde_json::Error),

    /// Caller abandoned the run between passes
    #[error("humanization cancelled before pass '{0}'")]
    Cancelled(&'static str),
}

pub type Result<T> = std::result::Result<T, HumanizeError>;
