//! Errors in the library.
use crate::TraceField;
use std::path::PathBuf;
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum TraceError {
    /// A mutating method was called after [`TraceRecorder::close()`].
    ///
    /// [`TraceRecorder::close()`]: crate::TraceRecorder::close
    #[error("The recorder has already been closed")]
    RecorderClosed,

    /// Save type string not in `raw`, `returns` or `steps`.
    #[error("Unknown save type: {0}")]
    UnknownSaveType(String),

    /// Field name not in [`TraceField::ALL`].
    #[error("Unknown trace field: {0}")]
    UnknownField(String),

    /// File extension of neither supported format.
    #[error("Unknown trace format: {0}")]
    UnknownFormat(String),

    /// No file was found for the field.
    #[error("No data for field {0} in {1:?}")]
    NoDataForField(TraceField, PathBuf),

    /// The file name does not follow the trace naming convention.
    #[error("Invalid trace file name: {0}")]
    InvalidFileName(String),

    /// A legacy episode lacks a key required outside reward-only mode.
    #[error("Episode in {file:?} has no {key}")]
    MissingEpisodeKey {
        /// Missing key.
        key: &'static str,
        /// File containing the episode.
        file: PathBuf,
    },

    /// Arrays of a field cannot be stacked or concatenated.
    #[error("Shape mismatch in field {field}: {detail}")]
    ShapeMismatch {
        /// Field of the arrays.
        field: String,
        /// Description of the mismatch.
        detail: String,
    },

    /// Failed to read or write a `.npy` file.
    #[error("Npy error in {path:?}: {source}")]
    Npy {
        /// File being processed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize with bincode.
    #[error("Bincode error in {path:?}: {source}")]
    Bincode {
        /// File being processed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: bincode::Error,
    },

    /// Failed to parse or write a YAML configuration.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type of the library.
pub type Result<T> = std::result::Result<T, TraceError>;
