//! Sparse depth simulation.

use ndarray::{Array2, ArrayView2, ArrayView3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Strategy that picks which ground-truth depth pixels survive as sparse input.
///
/// Implementations must be pure: the same inputs give the same mask.
pub trait Sparsifier: Send + Sync {
    /// Keep-mask of the same shape as `depth`.
    ///
    /// `color` is the (H, W, 3) color image, for strategies that sample along edges.
    fn dense_to_sparse(&self, color: ArrayView3<'_, f32>, depth: ArrayView2<'_, f32>) -> Array2<bool>;
}

/// Uniformly keeps about `num_samples` of the valid depth pixels.
///
/// A pixel is valid when its depth is positive and, if `max_depth` is set, not
/// beyond it. The random stream is seeded from `seed` and the depth values so
/// the mask is reproducible per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSampling {
    pub num_samples: usize,
    pub max_depth: Option<f32>,
    pub seed: u64,
}

impl UniformSampling {
    pub fn new(num_samples: usize) -> Self {
        Self {
            num_samples,
            max_depth: None,
            seed: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: f32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Sparsifier for UniformSampling {
    fn dense_to_sparse(&self, _color: ArrayView3<'_, f32>, depth: ArrayView2<'_, f32>) -> Array2<bool> {
        let max_depth = self.max_depth;
        let valid = depth.mapv(|d| d > 0.0 && max_depth.is_none_or(|max| d <= max));

        let n_keep = valid.iter().filter(|&&v| v).count();
        if n_keep == 0 {
            return valid;
        }

        let prob = self.num_samples as f64 / n_keep as f64;
        let mut rng = StdRng::seed_from_u64(self.seed ^ fingerprint(depth));
        let mask = valid.mapv(|v| v && rng.random::<f64>() < prob);

        debug!(
            "Uniform sparsifier kept {} of {} valid pixels",
            mask.iter().filter(|&&v| v).count(),
            n_keep
        );
        mask
    }
}

// FNV-1a over the depth bit patterns, in logical order.
fn fingerprint(depth: ArrayView2<'_, f32>) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    depth.iter().fold(OFFSET, |hash, d| {
        d.to_bits()
            .to_le_bytes()
            .iter()
            .fold(hash, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME))
    })
}
