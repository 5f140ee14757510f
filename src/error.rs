//! Crate-wide error type.
//!
//! Every fallible operation in the pipeline returns [`Result`]. Numerical
//! domain problems (zero histograms, non-finite energies) are reported here
//! instead of leaking NaN/inf into later stages.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CosegError>;

#[derive(Debug, Error)]
pub enum CosegError {
    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("degenerate histogram: {0}")]
    DegenerateHistogram(String),

    #[error("one-class training failed: {0}")]
    Training(String),

    #[error("support vector set is empty; potentials are undefined")]
    EmptySupport,

    #[error("invalid grid energy: {0}")]
    InvalidEnergy(String),

    #[error("worker for {task} failed: {reason}")]
    Worker { task: String, reason: String },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CosegError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        CosegError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CosegError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Fails with [`CosegError::ShapeMismatch`] unless both shapes agree.
pub(crate) fn ensure_same_shape(
    context: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CosegError::ShapeMismatch {
            context,
            expected,
            actual,
        })
    }
}
