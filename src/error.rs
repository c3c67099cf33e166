//! Error types for the emotion viewer library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The video source could not be opened (bad path or codec)
    #[error("Failed to open video source {path}: {reason}")]
    SourceOpen {
        /// Path that was passed to the video backend
        path: String,
        /// Backend-provided reason
        reason: String,
    },

    /// A key/value table file is missing or is not a flat string mapping
    #[error("Failed to load table {}: {reason}", path.display())]
    TableLoad {
        /// Path of the table file
        path: PathBuf,
        /// What went wrong while reading or parsing it
        reason: String,
    },

    /// Emotion classification of a single face failed
    #[error("Emotion analysis failed: {0}")]
    Analysis(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model input configuration error
    #[error("Model input error: {0}")]
    ModelInputError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Model data shape or format error
    #[error("Model data format error: {0}")]
    ModelDataFormatError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether this error is recovered locally by the annotator instead of aborting the frame
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Analysis(_))
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
