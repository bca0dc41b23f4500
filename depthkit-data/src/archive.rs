//! Per-sample `.npz` archives.
//!
//! An archive holds three named arrays:
//! - `rgb_image_data`: `u8`, (3, H, W), channel-first color image
//! - `dense_image_data`: `f32`, (L, H, W), stacked dense layers, layer 0 is ground truth
//! - `landmark_2d_data`: `f32`, (N, >=5), one tracked landmark per row

use crate::types::{DenseLayer, LANDMARK_COLUMNS, Landmark};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use ndarray_npy::{NpzReader, NpzWriter, ReadNpzError, WriteNpzError};
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const COLOR_ARRAY: &str = "rgb_image_data";
pub const DENSE_ARRAY: &str = "dense_image_data";
pub const LANDMARK_ARRAY: &str = "landmark_2d_data";

/// Errors that can occur while reading or writing an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NPZ read error: {0}")]
    Read(#[from] ReadNpzError),

    #[error("NPZ write error: {0}")]
    Write(#[from] WriteNpzError),

    #[error("Invalid archive layout: {0}")]
    Layout(String),

    #[error("Dense layer {layer:?} (index {index}) missing; archive has {available} layers")]
    MissingLayer {
        layer: DenseLayer,
        index: usize,
        available: usize,
    },
}

/// The raw contents of one sample archive.
#[derive(Debug, Clone)]
pub struct SampleArchive {
    color: Array3<u8>,
    dense: Array3<f32>,
    landmarks: Array2<f32>,
}

impl SampleArchive {
    /// Wrap raw arrays, validating their shapes.
    pub fn new(
        color: Array3<u8>,
        dense: Array3<f32>,
        landmarks: Array2<f32>,
    ) -> Result<Self, ArchiveError> {
        let (channels, color_h, color_w) = color.dim();
        let (layers, height, width) = dense.dim();

        if channels != 3 {
            return Err(ArchiveError::Layout(format!(
                "{} must have 3 channels, got {}",
                COLOR_ARRAY, channels
            )));
        }
        if layers == 0 {
            return Err(ArchiveError::Layout(format!("{} has no layers", DENSE_ARRAY)));
        }
        if (color_h, color_w) != (height, width) {
            return Err(ArchiveError::Layout(format!(
                "color is {}x{} but depth is {}x{}",
                color_h, color_w, height, width
            )));
        }
        if landmarks.nrows() > 0 && landmarks.ncols() < LANDMARK_COLUMNS {
            return Err(ArchiveError::Layout(format!(
                "{} needs at least {} columns, got {}",
                LANDMARK_ARRAY,
                LANDMARK_COLUMNS,
                landmarks.ncols()
            )));
        }

        Ok(Self {
            color,
            dense,
            landmarks,
        })
    }

    /// Read an archive from disk.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let file = File::open(path.as_ref())?;
        let mut npz = NpzReader::new(file)?;

        let color: Array3<u8> = npz.by_name(&entry_name(COLOR_ARRAY))?;
        let dense: Array3<f32> = npz.by_name(&entry_name(DENSE_ARRAY))?;
        let landmarks: Array2<f32> = npz.by_name(&entry_name(LANDMARK_ARRAY))?;

        debug!(
            "Archive read: {:?} color, {:?} dense, {} landmarks",
            color.dim(),
            dense.dim(),
            landmarks.nrows()
        );

        Self::new(color, dense, landmarks)
    }

    /// Write the archive in the layout [`SampleArchive::open`] reads.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArchiveError> {
        let file = File::create(path.as_ref())?;
        let mut npz = NpzWriter::new(file);
        npz.add_array(COLOR_ARRAY, &self.color)?;
        npz.add_array(DENSE_ARRAY, &self.dense)?;
        npz.add_array(LANDMARK_ARRAY, &self.landmarks)?;
        npz.finish()?;
        Ok(())
    }

    /// Image size as `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        let (_, height, width) = self.dense.dim();
        (height, width)
    }

    /// Number of stacked dense layers.
    pub fn layer_count(&self) -> usize {
        self.dense.len_of(Axis(0))
    }

    /// Channel-first color image as stored.
    pub fn color(&self) -> ArrayView3<'_, u8> {
        self.color.view()
    }

    /// Color image as a channel-last (H, W, 3) float array.
    pub fn color_hwc(&self) -> Array3<f32> {
        self.color
            .view()
            .permuted_axes([1, 2, 0])
            .as_standard_layout()
            .mapv(f32::from)
    }

    /// One layer of the dense stack.
    pub fn layer(&self, layer: DenseLayer) -> Result<ArrayView2<'_, f32>, ArchiveError> {
        let index = layer.index();
        if index >= self.layer_count() {
            return Err(ArchiveError::MissingLayer {
                layer,
                index,
                available: self.layer_count(),
            });
        }
        Ok(self.dense.index_axis(Axis(0), index))
    }

    /// Landmarks in table order.
    pub fn landmarks(&self) -> Vec<Landmark> {
        self.landmarks
            .rows()
            .into_iter()
            .filter_map(|row| Landmark::from_row(&row.to_vec()))
            .collect()
    }
}

// ndarray-npy stores entries with NumPy's `.npy` suffix.
fn entry_name(name: &str) -> String {
    format!("{}.npy", name)
}
