use super::config::ConfigError;
use super::mapping::CorrespondenceError;
use super::md::ExternalEngineError;
use super::oracle::OracleError;
use crate::core::io::error::{FormatError, ReadError};
use crate::core::io::mol2::PoseSelectionError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of one merge or fix operation. Every variant is fatal to the edge in progress.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Invalid file '{}': {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("Invalid atom correspondence: {0}")]
    Correspondence(#[from] CorrespondenceError),

    #[error("MD engine failure: {0}")]
    ExternalEngine(#[from] ExternalEngineError),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Correspondence oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No usable pose in '{}': {source}", .path.display())]
    Pose {
        path: PathBuf,
        #[source]
        source: PoseSelectionError,
    },
}

impl MergeError {
    pub fn format(path: &Path, source: impl Into<FormatError>) -> Self {
        MergeError::Format {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        MergeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, error: ReadError) -> Self {
        match error {
            ReadError::Io(source) => Self::io(path, source),
            ReadError::Format(source) => Self::format(path, source),
        }
    }
}
