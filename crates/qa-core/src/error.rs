use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("invalid layer {0}: must be 1, 2, or 3")]
    InvalidLayer(u8),

    #[error("invalid story id '{0}': must be alphanumeric with dots, dashes, or underscores")]
    InvalidStoryId(String),

    #[error("cannot write {path}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("coderabbit findings_count {count} does not match severity sum {sum}")]
    FindingsMismatch { count: u64, sum: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, QaError>;
