use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::tokenizer::DEFAULT_MAX_SEQ_LENGTH;

/// How location-first search treats uncertain inferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Classify labels: a lone unknown token becomes the family
    Parse,
    /// Grow the vocabulary: only multi-locator inferences are promoted
    #[default]
    Update,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs of a classification / vocabulary update run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagClassConfig {
    /// Maximum number of tokens kept per label
    pub max_seq_length: usize,

    /// Co-occurrences with a family needed before a token becomes a locator
    pub threshold_cfs: usize,

    /// Upper bound on incremental update rounds
    pub max_round: usize,

    /// Location-first search mode used while updating
    pub lfs_mode: RunMode,

    /// Inferred families shorter than this are rejected
    pub family_min_len: usize,

    /// Inferred families with at least this share of digits are rejected
    pub family_max_digit_ratio: f64,
}

impl Default for TagClassConfig {
    fn default() -> Self {
        Self {
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            threshold_cfs: 6,
            max_round: 3,
            lfs_mode: RunMode::Update,
            family_min_len: 4,
            family_max_digit_ratio: 0.5,
        }
    }
}

impl TagClassConfig {
    /// Config for classifying labels against a fixed vocabulary
    pub fn for_parsing() -> Self {
        Self {
            lfs_mode: RunMode::Parse,
            ..Default::default()
        }
    }

    /// Config for growing the locator vocabulary from a corpus
    pub fn for_updating() -> Self {
        Self {
            lfs_mode: RunMode::Update,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_seq_length == 0 {
            return Err(CoreError::invalid_config("max_seq_length must be > 0"));
        }
        if self.threshold_cfs == 0 {
            return Err(CoreError::invalid_config("threshold_cfs must be > 0"));
        }
        if self.max_round == 0 {
            return Err(CoreError::invalid_config("max_round must be > 0"));
        }
        if !(self.family_max_digit_ratio > 0.0 && self.family_max_digit_ratio <= 1.0) {
            return Err(CoreError::invalid_config(format!(
                "family_max_digit_ratio ({}) must be in (0, 1]",
                self.family_max_digit_ratio
            )));
        }
        Ok(())
    }
}
