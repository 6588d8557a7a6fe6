use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File name is not valid UTF-8: {}", path.display())]
    InvalidName { path: PathBuf },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write manifest to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// True for failures tied to a single entry of the scanned tree.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            ManifestError::Walk { .. }
                | ManifestError::Read { .. }
                | ManifestError::InvalidName { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
