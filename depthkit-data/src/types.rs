//! Core data types for landmarks and dense depth layers.
//!
//! These are CPU-side representations read out of a sample archive.

use glam::Vec2;

/// Minimum number of columns in a landmark table row.
pub const LANDMARK_COLUMNS: usize = 5;

/// Index of a layer within the archived dense depth stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenseLayer {
    /// Ground-truth depth, the training target.
    GroundTruth,
    /// Mesh interpolation of the original landmark depth.
    Original,
    /// 3D distance to the closest original landmark.
    Distance3dOriginal,
    /// Mesh interpolation of the denoised landmark depth.
    Denoised,
    /// 3D distance to the closest denoised landmark.
    Distance3dDenoised,
}

impl DenseLayer {
    /// Position of the layer along the first axis of the stack.
    pub fn index(self) -> usize {
        match self {
            DenseLayer::GroundTruth => 0,
            DenseLayer::Original => 1,
            DenseLayer::Distance3dOriginal => 3,
            DenseLayer::Denoised => 4,
            DenseLayer::Distance3dDenoised => 6,
        }
    }
}

/// A tracked landmark observed in one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Sub-pixel image position (x = column, y = row).
    pub position: Vec2,
    /// Depth reported by the tracker.
    pub original_depth: f32,
    /// Depth after mesh-based denoising.
    pub denoised_depth: f32,
    /// Confidence weight of the observation.
    pub confidence: f32,
}

impl Landmark {
    /// Create a new landmark.
    pub fn new(position: Vec2, original_depth: f32, denoised_depth: f32, confidence: f32) -> Self {
        Self {
            position,
            original_depth,
            denoised_depth,
            confidence,
        }
    }

    /// Build a landmark from one row of the archived table.
    ///
    /// Returns `None` if the row is shorter than [`LANDMARK_COLUMNS`].
    pub fn from_row(row: &[f32]) -> Option<Self> {
        if row.len() < LANDMARK_COLUMNS {
            return None;
        }
        Some(Self {
            position: Vec2::new(row[0], row[1]),
            original_depth: row[2],
            denoised_depth: row[3],
            confidence: row[4],
        })
    }

    /// Floor-truncated pixel index as `(row, col)`. May be negative.
    pub fn pixel(&self) -> (i64, i64) {
        (self.position.y.floor() as i64, self.position.x.floor() as i64)
    }
}
