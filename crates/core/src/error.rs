use thiserror::Error;

use crate::tag::TagScore;

/// Result type for vocabulary and configuration operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building a vocabulary or validating a run configuration.
///
/// Classification itself never fails: unusable labels produce empty results.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The same token is defined twice across the loaded sources
    #[error("Duplicate tag `{name}` (already defined as {existing})")]
    DuplicateTag { name: String, existing: String },

    /// A snapshot row is below `Confirmed` where only confirmed rows are allowed
    #[error("Tag `{name}` is not confirmed (score {score})")]
    Unconfirmed { name: String, score: TagScore },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Create a duplicate tag error
    pub fn duplicate(name: impl Into<String>, existing: impl Into<String>) -> Self {
        Self::DuplicateTag {
            name: name.into(),
            existing: existing.into(),
        }
    }

    /// Create an unconfirmed tag error
    pub fn unconfirmed(name: impl Into<String>, score: TagScore) -> Self {
        Self::Unconfirmed {
            name: name.into(),
            score,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
