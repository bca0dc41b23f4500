//! Landmark rasterization into dense-shaped channels.

use crate::error::PipelineError;
use depthkit_data::Landmark;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// What to do with a landmark whose pixel falls outside the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Fail the access.
    #[default]
    Reject,
    /// Move the landmark to the nearest border pixel.
    Clamp,
    /// Drop the landmark.
    Skip,
}

/// Landmarks resolved to in-bounds `(row, col)` pixels, in list order.
/// `None` marks a skipped landmark.
pub struct LandmarkPixels<'a> {
    landmarks: &'a [Landmark],
    pixels: Vec<Option<(usize, usize)>>,
}

impl<'a> LandmarkPixels<'a> {
    pub fn resolve(
        landmarks: &'a [Landmark],
        (height, width): (usize, usize),
        policy: BoundsPolicy,
    ) -> Result<Self, PipelineError> {
        let mut pixels = Vec::with_capacity(landmarks.len());

        for (i, landmark) in landmarks.iter().enumerate() {
            // NaN and infinite positions have no pixel
            if !landmark.position.is_finite() {
                if policy == BoundsPolicy::Reject {
                    return Err(PipelineError::NonFiniteLandmark {
                        landmark: i,
                        x: landmark.position.x,
                        y: landmark.position.y,
                    });
                }
                pixels.push(None);
                continue;
            }

            let (row, col) = landmark.pixel();
            let inside = (0..height as i64).contains(&row) && (0..width as i64).contains(&col);

            let pixel = if inside {
                Some((row as usize, col as usize))
            } else {
                match policy {
                    BoundsPolicy::Reject => {
                        return Err(PipelineError::LandmarkOutOfBounds {
                            landmark: i,
                            row,
                            col,
                            height,
                            width,
                        });
                    }
                    BoundsPolicy::Clamp if height > 0 && width > 0 => Some((
                        row.clamp(0, height as i64 - 1) as usize,
                        col.clamp(0, width as i64 - 1) as usize,
                    )),
                    BoundsPolicy::Clamp | BoundsPolicy::Skip => None,
                }
            };
            pixels.push(pixel);
        }

        Ok(Self { landmarks, pixels })
    }

    /// Rasterize one value per landmark into a zero array of `shape`.
    ///
    /// Only positive values are written; a later landmark on the same pixel
    /// overwrites an earlier one.
    pub fn rasterize<F>(&self, shape: (usize, usize), mut value: F) -> Array2<f32>
    where
        F: FnMut(&Landmark, (usize, usize)) -> f32,
    {
        let mut out = Array2::zeros(shape);
        for (landmark, pixel) in self.landmarks.iter().zip(&self.pixels) {
            let Some(pixel) = *pixel else {
                continue;
            };
            let v = value(landmark, pixel);
            if v > 0.0 {
                out[pixel] = v;
            }
        }
        out
    }
}
