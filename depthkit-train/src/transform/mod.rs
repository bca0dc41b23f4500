//! Pre-assembly transform hook.
//!
//! A [`ChannelTransform`] sees the whole [`ChannelSet`], including `gt_depth`,
//! once per access, between synthesis and assembly. Geometric operations must be
//! applied to every channel alike so pixels stay aligned with the target.

mod ops;
mod train;
mod val;

pub use ops::{center_crop, hflip, jitter_color};
pub use train::TrainTransform;
pub use val::ValTransform;

use crate::channels::ChannelSet;
use thiserror::Error;

/// Errors that can occur inside a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("crop {crop:?} is larger than channel `{key}` of size {size:?}")]
    CropTooLarge {
        key: String,
        crop: (usize, usize),
        size: (usize, usize),
    },

    #[error("channel `{key}` has unsupported dimensionality {ndim}")]
    Dimensionality { key: String, ndim: usize },
}

/// Split-specific hook applied to synthesized channels.
pub trait ChannelTransform: Send + Sync {
    /// Transform the channels of sample `index`.
    ///
    /// `index` lets randomized transforms seed per sample, so results are
    /// reproducible no matter which thread serves the access.
    fn apply(&self, index: usize, channels: ChannelSet) -> Result<ChannelSet, TransformError>;
}

/// Returns the channels unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ChannelTransform for IdentityTransform {
    fn apply(&self, _index: usize, channels: ChannelSet) -> Result<ChannelSet, TransformError> {
        Ok(channels)
    }
}

fn check_dims(key: &str, ndim: usize) -> Result<(), TransformError> {
    if ndim == 2 || ndim == 3 {
        Ok(())
    } else {
        Err(TransformError::Dimensionality {
            key: key.to_string(),
            ndim,
        })
    }
}
