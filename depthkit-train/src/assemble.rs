//! Tensor assembly: channel sets to stacked model input.

use crate::channels::ChannelSet;
use crate::error::PipelineError;
use depthkit_data::Modality;
use ndarray::{Array3, ArrayView3, Axis, Ix2, Ix3, concatenate};
use tracing::warn;

/// Model input and target for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSample {
    /// Channel-major input, (C, H, W).
    pub input: Array3<f32>,
    /// Ground-truth depth, (1, H, W).
    pub target: Array3<f32>,
}

impl AssembledSample {
    pub fn channels(&self) -> usize {
        self.input.len_of(Axis(0))
    }

    /// Spatial size as `(height, width)`.
    pub fn dims(&self) -> (usize, usize) {
        let (_, height, width) = self.target.dim();
        (height, width)
    }
}

/// Stack every non-target channel, in set order, along a leading channel axis.
///
/// (H, W) arrays contribute one channel; (H, W, C) arrays contribute C channels.
/// No value normalization happens here.
pub fn assemble(channels: &ChannelSet, modality: &Modality) -> Result<AssembledSample, PipelineError> {
    let gt = channels.target().ok_or(PipelineError::MissingTarget)?;
    let gt = gt
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| PipelineError::Dimensionality {
            key: crate::channels::GT_DEPTH_KEY.to_string(),
            ndim: gt.ndim(),
        })?;
    let expected = gt.dim();

    let mut blocks: Vec<ArrayView3<'_, f32>> = Vec::with_capacity(channels.len());
    for (key, value) in channels.inputs() {
        let block = match value.ndim() {
            2 => value.view().into_dimensionality::<Ix2>()?.insert_axis(Axis(0)),
            3 => value
                .view()
                .into_dimensionality::<Ix3>()?
                .permuted_axes([2, 0, 1]),
            ndim => {
                return Err(PipelineError::Dimensionality {
                    key: key.to_string(),
                    ndim,
                });
            }
        };

        let (_, height, width) = block.dim();
        if (height, width) != expected {
            return Err(PipelineError::ShapeMismatch {
                key: key.to_string(),
                expected,
                found: value.shape().to_vec(),
            });
        }
        blocks.push(block);
    }

    if blocks.is_empty() {
        return Err(PipelineError::NoInputChannels);
    }

    let input = concatenate(Axis(0), &blocks)?;
    if input.len_of(Axis(0)) != modality.num_channels() {
        warn!(
            "Assembled {} channels but modality {} declares {}",
            input.len_of(Axis(0)),
            modality,
            modality.num_channels()
        );
    }

    Ok(AssembledSample {
        input,
        target: gt.insert_axis(Axis(0)).to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::GT_DEPTH_KEY;
    use ndarray::{Array1, Array2};

    fn base(h: usize, w: usize) -> ChannelSet {
        let mut set = ChannelSet::new();
        set.insert(
            GT_DEPTH_KEY,
            Array2::from_shape_fn((h, w), |(y, x)| (y * w + x) as f32).into_dyn(),
        );
        set
    }

    #[test]
    fn test_rgb_kor_kw_layout() {
        let (h, w) = (2, 3);
        let mut set = base(h, w);
        set.insert(
            "rgb",
            Array3::from_shape_fn((h, w, 3), |(_, _, c)| 10.0 * (c + 1) as f32).into_dyn(),
        );
        set.insert("kor", Array2::from_elem((h, w), 4.0).into_dyn());
        set.insert("kw", Array2::from_elem((h, w), 5.0).into_dyn());

        let modality = Modality::parse("rgb-kor-kw").unwrap();
        let sample = assemble(&set, &modality).unwrap();

        assert_eq!(sample.input.dim(), (5, h, w));
        assert_eq!(sample.target.dim(), (1, h, w));
        assert_eq!(sample.channels(), modality.num_channels());
        assert_eq!(sample.dims(), (h, w));
        for (c, expected) in [10.0, 20.0, 30.0, 4.0, 5.0].into_iter().enumerate() {
            assert!(sample.input.index_axis(Axis(0), c).iter().all(|&v| v == expected));
        }
        assert_eq!(sample.target[[0, 1, 2]], 5.0);
    }

    #[test]
    fn test_order_follows_set() {
        let mut set = base(2, 2);
        set.insert("kw", Array2::from_elem((2, 2), 1.0).into_dyn());
        set.insert("kor", Array2::from_elem((2, 2), 2.0).into_dyn());

        let modality = Modality::parse("kw-kor").unwrap();
        let sample = assemble(&set, &modality).unwrap();
        assert_eq!(sample.input[[0, 0, 0]], 1.0);
        assert_eq!(sample.input[[1, 0, 0]], 2.0);
    }

    #[test]
    fn test_target_is_not_an_input() {
        let mut set = base(2, 2);
        set.insert("kor", Array2::from_elem((2, 2), 7.0).into_dyn());
        let sample = assemble(&set, &Modality::parse("kor").unwrap()).unwrap();
        assert_eq!(sample.input.dim(), (1, 2, 2));
    }

    #[test]
    fn test_bad_dimensionality() {
        let mut set = base(2, 2);
        set.insert("kor", Array1::zeros(4).into_dyn());
        let err = assemble(&set, &Modality::parse("kor").unwrap()).unwrap_err();
        assert!(matches!(err, PipelineError::Dimensionality { ndim: 1, .. }));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut set = base(2, 2);
        set.insert("kor", Array2::zeros((3, 2)).into_dyn());
        let err = assemble(&set, &Modality::parse("kor").unwrap()).unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_target() {
        let mut set = ChannelSet::new();
        set.insert("kor", Array2::zeros((2, 2)).into_dyn());
        let err = assemble(&set, &Modality::parse("kor").unwrap()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingTarget));
    }

    #[test]
    fn test_no_inputs() {
        let err = assemble(&base(2, 2), &Modality::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoInputChannels));
    }
}
