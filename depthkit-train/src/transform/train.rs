//! Training transform: per-sample random flip and color jitter.

use super::{ChannelTransform, TransformError, center_crop, check_dims, hflip, jitter_color};
use crate::channels::ChannelSet;
use crate::config::TransformConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

const SEED_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Randomly flips all channels together, jitters color, then crops and scales
/// like [`ValTransform`](super::ValTransform).
///
/// The random stream is derived from the configured seed and the sample index.
#[derive(Debug, Clone, Default)]
pub struct TrainTransform {
    config: TransformConfig,
}

impl TrainTransform {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    fn rng_for(&self, index: usize) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ (index as u64).wrapping_mul(SEED_MIX))
    }
}

impl ChannelTransform for TrainTransform {
    fn apply(&self, index: usize, mut channels: ChannelSet) -> Result<ChannelSet, TransformError> {
        let mut rng = self.rng_for(index);
        let flip = rng.random::<f64>() < self.config.hflip_probability;
        let max_value = if self.config.normalize_color { 1.0 } else { 255.0 };
        trace!("sample {}: flip={}", index, flip);

        for (key, array) in channels.iter_mut() {
            check_dims(key, array.ndim())?;
            if flip {
                *array = hflip(array);
            }
            if array.ndim() == 3 {
                if self.config.normalize_color {
                    array.mapv_inplace(|v| v / 255.0);
                }
                jitter_color(array, &self.config.color_jitter, max_value, &mut rng);
            }
            if let Some([h, w]) = self.config.crop {
                *array = center_crop(key, array, (h, w))?;
            }
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::GT_DEPTH_KEY;
    use crate::config::ColorJitter;
    use ndarray::{Array2, Array3};

    fn channels() -> ChannelSet {
        let mut set = ChannelSet::new();
        set.insert(
            GT_DEPTH_KEY,
            Array2::from_shape_fn((3, 4), |(y, x)| (y * 4 + x) as f32).into_dyn(),
        );
        set.insert(
            "rgb",
            Array3::from_shape_fn((3, 4, 3), |(y, x, c)| (y * 40 + x * 10 + c) as f32).into_dyn(),
        );
        set.insert(
            "kor",
            Array2::from_shape_fn((3, 4), |(y, x)| (y * 4 + x) as f32).into_dyn(),
        );
        set
    }

    #[test]
    fn test_same_index_same_output() {
        let transform = TrainTransform::new(TransformConfig::default());
        let a = transform.apply(5, channels()).unwrap();
        let b = transform.apply(5, channels()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_flip_keeps_channels_aligned() {
        let config = TransformConfig {
            hflip_probability: 1.0,
            color_jitter: ColorJitter::none(),
            ..TransformConfig::default()
        };
        let out = TrainTransform::new(config).apply(0, channels()).unwrap();

        let gt = out.target().unwrap();
        assert_eq!(gt[[0, 0]], 3.0);
        assert_eq!(gt, out.get("kor").unwrap());
        let rgb = out.get("rgb").unwrap();
        assert!((rgb[[0, 0, 0]] - 30.0 / 255.0).abs() < 1e-5);
    }

    #[test]
    fn test_disabled_augmentation_is_identity() {
        let config = TransformConfig {
            hflip_probability: 0.0,
            color_jitter: ColorJitter::none(),
            normalize_color: false,
            ..TransformConfig::default()
        };
        let out = TrainTransform::new(config).apply(9, channels()).unwrap();
        let input = channels();
        assert_eq!(out.target(), input.target());
        for (a, b) in out.get("rgb").unwrap().iter().zip(input.get("rgb").unwrap().iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_crop_applies_to_every_channel() {
        let config = TransformConfig {
            crop: Some([2, 2]),
            ..TransformConfig::default()
        };
        let out = TrainTransform::new(config).apply(1, channels()).unwrap();
        for (_, array) in out.iter() {
            assert_eq!(&array.shape()[..2], &[2, 2]);
        }
    }
}
