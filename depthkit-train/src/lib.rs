//! Depthkit Training Data Crate
//!
//! Turns archived depth-completion samples into model-ready tensors. A
//! [`Modality`](depthkit_data::Modality) declares which channels to derive;
//! each indexed access then runs:
//!
//! 1. [`synthesis`]: read the archive and derive one array per requested token
//! 2. [`transform`]: split-specific augmentation hook, called exactly once
//! 3. [`assemble`]: stack the channels into a channel-major input tensor and a target
//!
//! ## Modules
//!
//! - [`channels`]: the ordered name → array map passed between stages
//! - [`synthesis`]: channel synthesizer, landmark rasterization and sparsifiers
//! - [`transform`]: the [`ChannelTransform`] hook and its train/val implementations
//! - [`assemble`]: tensor stacking and shape checks
//! - [`dataset`]: [`DepthDataset`], the indexed entry point
//! - [`config`]: serde configuration

pub mod assemble;
pub mod channels;
pub mod config;
pub mod dataset;
pub mod error;
pub mod synthesis;
pub mod transform;

pub use assemble::{AssembledSample, assemble};
pub use channels::{ChannelSet, GT_DEPTH_KEY};
pub use config::{ColorJitter, ConfigError, DatasetConfig, SparsifierConfig, TransformConfig};
pub use dataset::{DepthDataset, DepthDatasetBuilder};
pub use error::PipelineError;
pub use synthesis::{BoundsPolicy, ChannelOrder, ChannelSynthesizer, Sparsifier, UniformSampling};
pub use transform::{ChannelTransform, IdentityTransform, TrainTransform, TransformError, ValTransform};
