//! Error types for dataset access.

use crate::config::ConfigError;
use crate::transform::TransformError;
use depthkit_data::{ArchiveError, ManifestError, ModalityError, ModalityToken};
use thiserror::Error;

/// Errors that can occur while building a dataset or assembling a sample.
///
/// None of these are retried: synthesis is deterministic, so the caller decides
/// whether to skip the sample or abort.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("please select a sparsifier: modality requests `fd` but none is configured")]
    MissingSparsifier,

    #[error("transform not defined: the dataset has no channel transform")]
    MissingTransform,

    #[error("transform not defined for token `{0}`")]
    NotImplemented(ModalityToken),

    #[error("landmark {landmark} at pixel ({row}, {col}) lies outside the {height}x{width} image")]
    LandmarkOutOfBounds {
        landmark: usize,
        row: i64,
        col: i64,
        height: usize,
        width: usize,
    },

    #[error("landmark {landmark} has non-finite position ({x}, {y})")]
    NonFiniteLandmark { landmark: usize, x: f32, y: f32 },

    #[error("sparsifier mask is {found:?}, expected {expected:?}")]
    MaskShape {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("channel `{key}` should have 2 or 3 dimensions, got {ndim}")]
    Dimensionality { key: String, ndim: usize },

    #[error("channel `{key}` has shape {found:?}, expected spatial size {expected:?}")]
    ShapeMismatch {
        key: String,
        expected: (usize, usize),
        found: Vec<usize>,
    },

    #[error("channel set has no `gt_depth` target")]
    MissingTarget,

    #[error("modality produced no input channels")]
    NoInputChannels,

    #[error("sample index {index} out of range for dataset of {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Stacking error: {0}")]
    Stack(#[from] ndarray::ShapeError),

    #[error("Modality error: {0}")]
    Modality(#[from] ModalityError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
