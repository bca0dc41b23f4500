//! Depthkit Data Crate
//!
//! Data loading for depth-completion samples: the modality vocabulary,
//! split manifests, and the per-sample `.npz` archives holding a color image,
//! a stack of dense depth layers and the tracked landmark table.
//! This crate knows nothing about channel synthesis or tensors; see `depthkit-train`.

pub mod archive;
pub mod manifest;
pub mod modality;
pub mod types;

pub use archive::{ArchiveError, SampleArchive};
pub use manifest::{ManifestError, Sample, SampleIndex, Split};
pub use modality::{Modality, ModalityError, ModalityToken};
pub use types::{DenseLayer, Landmark};
