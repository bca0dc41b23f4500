//! Validation transform: deterministic crop and color scaling.

use super::{ChannelTransform, TransformError, center_crop, check_dims};
use crate::channels::ChannelSet;
use crate::config::TransformConfig;

/// Center-crops every channel and scales color to [0, 1]. No randomness.
#[derive(Debug, Clone, Default)]
pub struct ValTransform {
    config: TransformConfig,
}

impl ValTransform {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }
}

impl ChannelTransform for ValTransform {
    fn apply(&self, _index: usize, mut channels: ChannelSet) -> Result<ChannelSet, TransformError> {
        for (key, array) in channels.iter_mut() {
            check_dims(key, array.ndim())?;
            if array.ndim() == 3 && self.config.normalize_color {
                array.mapv_inplace(|v| v / 255.0);
            }
            if let Some([h, w]) = self.config.crop {
                *array = center_crop(key, array, (h, w))?;
            }
        }
        Ok(channels)
    }
}
