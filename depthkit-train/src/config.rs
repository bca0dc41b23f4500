//! Dataset configuration, loaded from JSON.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```json
//! {
//!   "root": "data/scenes",
//!   "modality": "rgb-fd-kw",
//!   "sparsifier": { "kind": "uniform", "num_samples": 500 },
//!   "transform": { "crop": [228, 304] }
//! }
//! ```

use crate::synthesis::{BoundsPolicy, ChannelOrder, DEFAULT_MAX_GT_DEPTH, Sparsifier, UniformSampling};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything needed to open a [`DepthDataset`](crate::DepthDataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory holding `train.txt` / `val.txt`.
    pub root: PathBuf,
    /// Modality string, e.g. `rgb-kor-kw`.
    pub modality: String,
    /// Reject invalid modality strings instead of degrading to zero channels.
    pub strict_modality: bool,
    /// `declared` stacks channels as the modality string lists them; `legacy`
    /// uses the fixed order of the original loader.
    pub channel_order: ChannelOrder,
    /// Ground-truth depth above this is zeroed.
    pub max_gt_depth: f32,
    pub landmark_bounds: BoundsPolicy,
    pub sparsifier: Option<SparsifierConfig>,
    pub transform: TransformConfig,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            modality: "rgb".to_string(),
            strict_modality: true,
            channel_order: ChannelOrder::default(),
            max_gt_depth: DEFAULT_MAX_GT_DEPTH,
            landmark_bounds: BoundsPolicy::default(),
            sparsifier: None,
            transform: TransformConfig::default(),
        }
    }
}

impl DatasetConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_gt_depth > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_gt_depth must be positive, got {}",
                self.max_gt_depth
            )));
        }
        self.transform.validate()
    }
}

/// Sparsifier selection for the `fd` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SparsifierConfig {
    Uniform {
        num_samples: usize,
        #[serde(default)]
        max_depth: Option<f32>,
        #[serde(default)]
        seed: u64,
    },
}

impl SparsifierConfig {
    pub fn build(&self) -> Arc<dyn Sparsifier> {
        match *self {
            SparsifierConfig::Uniform {
                num_samples,
                max_depth,
                seed,
            } => Arc::new(UniformSampling {
                num_samples,
                max_depth,
                seed,
            }),
        }
    }
}

/// Augmentation settings for the train and val transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Center crop as `[height, width]`.
    pub crop: Option<[usize; 2]>,
    /// Probability of a horizontal flip (train only).
    pub hflip_probability: f64,
    /// Color jitter strengths (train only).
    pub color_jitter: ColorJitter,
    /// Scale color channels from [0, 255] to [0, 1].
    pub normalize_color: bool,
    /// Base seed for per-sample augmentation.
    pub seed: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            crop: None,
            hflip_probability: 0.5,
            color_jitter: ColorJitter::default(),
            normalize_color: true,
            seed: 0,
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.hflip_probability) {
            return Err(ConfigError::Invalid(format!(
                "hflip_probability must be in [0, 1], got {}",
                self.hflip_probability
            )));
        }
        let jitter = &self.color_jitter;
        if [jitter.brightness, jitter.contrast, jitter.saturation]
            .iter()
            .any(|&v| !(v >= 0.0))
        {
            return Err(ConfigError::Invalid(format!(
                "color jitter strengths must be non-negative, got {:?}",
                jitter
            )));
        }
        if let Some([h, w]) = self.crop {
            if h == 0 || w == 0 {
                return Err(ConfigError::Invalid("crop must be non-empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Brightness, contrast and saturation jitter. A strength `s` draws a factor
/// uniformly from `[max(0, 1 - s), 1 + s]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorJitter {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl ColorJitter {
    pub fn new(brightness: f32, contrast: f32, saturation: f32) -> Self {
        Self {
            brightness,
            contrast,
            saturation,
        }
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Default for ColorJitter {
    fn default() -> Self {
        Self::new(0.4, 0.4, 0.4)
    }
}
