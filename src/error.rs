use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced while loading data, building models, or training.
///
/// Every variant is terminal for a training run: the trainer never retries,
/// it returns the error to its caller.
#[derive(Debug)]
pub enum TrainError {
    /// A shape invariant was violated (e.g. mismatched matrix dimensions).
    ShapeMismatch {
        /// What was being checked (e.g. "dot", "labels").
        what: &'static str,
        /// Observed value.
        got: usize,
        /// Expected value.
        expected: usize,
    },

    /// A label does not name one of the model's output classes.
    InvalidLabel { label: usize, classes: usize },

    /// A configuration value is out of range.
    InvalidConfig(String),

    /// A dataset that must contain samples is empty.
    EmptyDataset(&'static str),

    /// `backward` was called without a forward pass recorded for gradients.
    GradientsDisabled,

    /// A sample index is past the end of a dataset.
    IndexOutOfBounds { index: usize, len: usize },

    /// The trainer has already run every configured epoch.
    AlreadyCompleted,

    /// An image could not be decoded.
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    Io(io::Error),

    Json(serde_json::Error),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            TrainError::InvalidLabel { label, classes } => {
                write!(f, "label {label} is out of range for {classes} classes")
            }
            TrainError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            TrainError::EmptyDataset(which) => write!(f, "{which} dataset is empty"),
            TrainError::GradientsDisabled => {
                write!(f, "backward called without a gradient-tracked forward pass")
            }
            TrainError::IndexOutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for dataset of {len}")
            }
            TrainError::AlreadyCompleted => write!(f, "training run has already completed"),
            TrainError::Image { path, source } => {
                write!(f, "cannot load image '{}': {source}", path.display())
            }
            TrainError::Io(e) => write!(f, "io error: {e}"),
            TrainError::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainError::Image { source, .. } => Some(source),
            TrainError::Io(e) => Some(e),
            TrainError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainError {
    fn from(e: io::Error) -> Self {
        TrainError::Io(e)
    }
}

impl From<serde_json::Error> for TrainError {
    fn from(e: serde_json::Error) -> Self {
        TrainError::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;
