use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Vocabulary error: {0}")]
    CoreError(#[from] tagclass_core::CoreError),

    #[error("Invalid snapshot {path}: {source}")]
    InvalidSnapshot {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Snapshot serialization error: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

