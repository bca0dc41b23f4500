//! Split manifests and the sample index.
//!
//! A manifest is a header-less CSV file of `label,relative_path` rows. Paths
//! are resolved against the directory that contains the manifest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid dataset split \"{0}\"; supported splits are: train, val")]
    UnsupportedSplit(String),

    #[error("Malformed manifest row at line {line}: expected `label,relative_path`")]
    MalformedRow { line: u64 },

    #[error("Found 0 samples in manifest {0}")]
    Empty(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
}

impl Split {
    /// Manifest file name for this split, relative to the dataset root.
    pub fn manifest_name(self) -> &'static str {
        match self {
            Split::Train => "train.txt",
            Split::Val => "val.txt",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            other => Err(ManifestError::UnsupportedSplit(other.to_string())),
        }
    }
}

/// One manifest entry: where the archive lives and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub archive_path: PathBuf,
    pub label: String,
}

/// Ordered, immutable list of samples for one split.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    samples: Vec<Sample>,
}

impl SampleIndex {
    /// Load the manifest of `split` under `root`.
    pub fn load(root: impl AsRef<Path>, split: Split) -> Result<Self, ManifestError> {
        let path = root.as_ref().join(split.manifest_name());
        let index = Self::from_manifest(&path)?;
        info!("Found {} samples in {} split", index.len(), split);
        Ok(index)
    }

    /// Load an explicit manifest file. Fails if it lists no samples.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let folder = path.parent().unwrap_or_else(|| Path::new(""));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let (Some(label), Some(relative)) = (record.get(0), record.get(1)) else {
                return Err(ManifestError::MalformedRow { line });
            };
            if relative.is_empty() {
                return Err(ManifestError::MalformedRow { line });
            }
            samples.push(Sample {
                archive_path: folder.join(relative),
                label: label.to_string(),
            });
        }

        if samples.is_empty() {
            return Err(ManifestError::Empty(path.to_path_buf()));
        }

        debug!("Loaded {} manifest rows", samples.len());
        Ok(Self { samples })
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
