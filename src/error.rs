//! Crate-wide error type.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("delimited file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Row counts or id sets disagree between sets that should describe the same examples.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("duplicate example id: {0}")]
    DuplicateId(String),

    #[error("label conflict: {0}")]
    LabelConflict(String),

    /// The same feature name is owned by more than one subset.
    #[error("ambiguous merge: {0}")]
    AmbiguousMerge(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{}:{line}: {message}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unsupported feature file format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    pub(crate) fn format(path: &std::path::Path, line: usize, message: impl Into<String>) -> Error {
        Error::Format {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
