//! Channel synthesis from sample archives.
//!
//! [`ChannelSynthesizer`] reads one archive and derives an array for every token
//! of a [`Modality`], plus the ground-truth depth target under [`GT_DEPTH_KEY`].

pub mod rasterize;
pub mod sparsifier;

pub use rasterize::{BoundsPolicy, LandmarkPixels};
pub use sparsifier::{Sparsifier, UniformSampling};

use crate::channels::{ChannelSet, GT_DEPTH_KEY};
use crate::error::PipelineError;
use depthkit_data::{DenseLayer, Landmark, Modality, ModalityToken, SampleArchive};
use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Depth beyond this is treated as infinite and zeroed, in archive units.
pub const DEFAULT_MAX_GT_DEPTH: f32 = 10_000.0;

/// Luminance weights for the `grey` channel.
const GREY_WEIGHTS: [f32; 3] = [0.2989, 0.587, 0.114];

/// Fixed channel order of the legacy loader.
const LEGACY_ORDER: [ModalityToken; 11] = [
    ModalityToken::Rgb,
    ModalityToken::Grey,
    ModalityToken::FakeDepth,
    ModalityToken::KeypointOriginal,
    ModalityToken::KeypointGroundTruth,
    ModalityToken::KeypointDenoised,
    ModalityToken::KeypointWeight,
    ModalityToken::DenseOriginal,
    ModalityToken::DenseDenoised,
    ModalityToken::Distance3dOriginal,
    ModalityToken::Distance3dDenoised,
];

/// Order in which requested channels are synthesized, and so stacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Tokens in the order the modality string lists them.
    #[default]
    Declared,
    /// `rgb, grey, fd, kor, kgt, kde, kw, dor, dde, d3dwor, d3dwde` whatever the
    /// modality string order. `d3dwor` and `d3dwde` are only produced together
    /// with `dor` or `dde`, as models trained on the legacy loader expect.
    Legacy,
}

impl ChannelOrder {
    /// The tokens of `modality` that will be synthesized, in output order.
    pub fn arrange(self, modality: &Modality) -> Vec<ModalityToken> {
        match self {
            ChannelOrder::Declared => modality.tokens().to_vec(),
            ChannelOrder::Legacy => {
                let dense = modality.contains(ModalityToken::DenseOriginal)
                    || modality.contains(ModalityToken::DenseDenoised);
                LEGACY_ORDER
                    .into_iter()
                    .filter(|&t| modality.contains(t))
                    .filter(|&t| {
                        dense
                            || !matches!(
                                t,
                                ModalityToken::Distance3dOriginal | ModalityToken::Distance3dDenoised
                            )
                    })
                    .collect()
            }
        }
    }
}

/// Derives modality channels from sample archives.
///
/// Holds only read-only configuration, so one synthesizer can serve many
/// threads at once.
#[derive(Clone)]
pub struct ChannelSynthesizer {
    max_gt_depth: f32,
    bounds: BoundsPolicy,
    order: ChannelOrder,
    sparsifier: Option<Arc<dyn Sparsifier>>,
}

impl ChannelSynthesizer {
    pub fn new() -> Self {
        Self {
            max_gt_depth: DEFAULT_MAX_GT_DEPTH,
            bounds: BoundsPolicy::default(),
            order: ChannelOrder::default(),
            sparsifier: None,
        }
    }

    /// Set the range above which ground-truth depth is zeroed.
    pub fn with_max_gt_depth(mut self, max_gt_depth: f32) -> Self {
        self.max_gt_depth = max_gt_depth;
        self
    }

    pub fn with_bounds_policy(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Set the sparsifier used by the `fd` channel.
    pub fn with_sparsifier(mut self, sparsifier: Arc<dyn Sparsifier>) -> Self {
        self.sparsifier = Some(sparsifier);
        self
    }

    pub fn has_sparsifier(&self) -> bool {
        self.sparsifier.is_some()
    }

    pub fn max_gt_depth(&self) -> f32 {
        self.max_gt_depth
    }

    /// Fail early on requests this synthesizer can never satisfy.
    pub fn check(&self, modality: &Modality) -> Result<(), PipelineError> {
        if let Some(&token) = modality.tokens().iter().find(|t| !t.is_implemented()) {
            return Err(PipelineError::NotImplemented(token));
        }
        if modality.contains(ModalityToken::FakeDepth) && self.sparsifier.is_none() {
            return Err(PipelineError::MissingSparsifier);
        }
        Ok(())
    }

    /// Open the archive at `path` and synthesize its channels.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), modality = %modality))]
    pub fn synthesize_path(
        &self,
        path: impl AsRef<Path>,
        modality: &Modality,
    ) -> Result<ChannelSet, PipelineError> {
        self.check(modality)?;
        let archive = SampleArchive::open(path)?;
        self.synthesize(&archive, modality)
    }

    /// Synthesize `gt_depth` followed by one channel per token, in the configured order.
    pub fn synthesize(
        &self,
        archive: &SampleArchive,
        modality: &Modality,
    ) -> Result<ChannelSet, PipelineError> {
        self.check(modality)?;

        let shape = archive.dims();
        let max = self.max_gt_depth;
        // in this software infinite distance is zero
        let depth = archive
            .layer(DenseLayer::GroundTruth)?
            .mapv(|d| if d > max { 0.0 } else { d });

        let mut color: Option<Array3<f32>> = None;
        let mut landmarks: Option<Vec<Landmark>> = None;

        let mut result = ChannelSet::new();
        result.insert(GT_DEPTH_KEY, depth.clone().into_dyn());

        for token in self.order.arrange(modality) {
            let channel = match token {
                ModalityToken::Rgb => color_of(&mut color, archive).clone().into_dyn(),
                ModalityToken::Grey => greyscale(color_of(&mut color, archive)).into_dyn(),
                ModalityToken::FakeDepth => {
                    let rgb = color_of(&mut color, archive);
                    self.sparse_depth(rgb, depth.view())?.into_dyn()
                }
                ModalityToken::KeypointOriginal
                | ModalityToken::KeypointGroundTruth
                | ModalityToken::KeypointDenoised
                | ModalityToken::KeypointWeight => {
                    let landmarks = landmarks.get_or_insert_with(|| archive.landmarks());
                    let pixels = LandmarkPixels::resolve(landmarks, shape, self.bounds)?;
                    let plane = match token {
                        ModalityToken::KeypointOriginal => {
                            pixels.rasterize(shape, |l, _| l.original_depth)
                        }
                        ModalityToken::KeypointGroundTruth => {
                            pixels.rasterize(shape, |_, pixel| depth[pixel])
                        }
                        ModalityToken::KeypointDenoised => {
                            pixels.rasterize(shape, |l, _| l.denoised_depth)
                        }
                        _ => pixels.rasterize(shape, |l, _| l.confidence),
                    };
                    plane.into_dyn()
                }
                ModalityToken::DenseOriginal => layer(archive, DenseLayer::Original)?,
                ModalityToken::DenseDenoised => layer(archive, DenseLayer::Denoised)?,
                ModalityToken::Distance3dOriginal => {
                    layer(archive, DenseLayer::Distance3dOriginal)?
                }
                ModalityToken::Distance3dDenoised => {
                    layer(archive, DenseLayer::Distance3dDenoised)?
                }
                ModalityToken::KeypointVoronoi | ModalityToken::Distance2dOriginal => {
                    return Err(PipelineError::NotImplemented(token));
                }
            };
            result.insert(token.as_str(), channel);
        }

        debug!("Synthesized {} channels for {}", result.len(), modality);
        Ok(result)
    }

    fn sparse_depth(
        &self,
        color: &Array3<f32>,
        depth: ArrayView2<'_, f32>,
    ) -> Result<Array2<f32>, PipelineError> {
        let sparsifier = self
            .sparsifier
            .as_ref()
            .ok_or(PipelineError::MissingSparsifier)?;

        let mask = sparsifier.dense_to_sparse(color.view(), depth);
        if mask.dim() != depth.dim() {
            return Err(PipelineError::MaskShape {
                expected: depth.dim(),
                found: mask.dim(),
            });
        }

        let mut sparse = Array2::zeros(depth.dim());
        Zip::from(&mut sparse)
            .and(&mask)
            .and(&depth)
            .for_each(|s, &keep, &d| {
                if keep {
                    *s = d;
                }
            });
        Ok(sparse)
    }
}

impl Default for ChannelSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn color_of<'a>(cache: &'a mut Option<Array3<f32>>, archive: &SampleArchive) -> &'a Array3<f32> {
    cache.get_or_insert_with(|| archive.color_hwc())
}

fn greyscale(color: &Array3<f32>) -> Array2<f32> {
    color.map_axis(Axis(2), |px| {
        px.iter().zip(GREY_WEIGHTS).map(|(&c, w)| c * w).sum()
    })
}

fn layer(archive: &SampleArchive, layer: DenseLayer) -> Result<ndarray::ArrayD<f32>, PipelineError> {
    Ok(archive.layer(layer)?.to_owned().into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, ArrayView3, array};

    fn archive() -> SampleArchive {
        let color = Array::from_shape_fn((3, 2, 3), |(c, y, x)| (c * 100 + y * 10 + x) as u8);
        let mut dense = Array::from_shape_fn((7, 2, 3), |(l, y, x)| (l * 100 + y * 10 + x) as f32 + 1.0);
        dense[[0, 0, 0]] = 20_000.0;
        dense[[0, 1, 2]] = 0.0;
        let landmarks = array![
            [1.5, 0.5, 4.0, 3.5, 0.9],
            [2.2, 1.1, -1.0, 2.0, 0.0],
            [1.9, 0.2, 6.0, -2.0, 0.4],
        ];
        SampleArchive::new(color, dense, landmarks).unwrap()
    }

    #[test]
    fn test_gt_depth_always_present_and_clamped() {
        let modality = Modality::parse("kw").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();

        let gt = channels.target().unwrap();
        assert_eq!(gt.shape(), &[2, 3]);
        assert_eq!(gt[[0, 0]], 0.0);
        assert_eq!(gt[[0, 1]], 2.0);
        assert_eq!(gt[[1, 1]], 12.0);

        let mut dense = Array3::<f32>::zeros((1, 1, 3));
        dense[[0, 0, 0]] = 10_000.0;
        dense[[0, 0, 1]] = 10_000.5;
        dense[[0, 0, 2]] = 9_999.5;
        let edge = SampleArchive::new(Array3::zeros((3, 1, 3)), dense, Array2::zeros((0, 5))).unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&edge, &modality).unwrap();
        let gt = channels.target().unwrap();
        assert_eq!(gt[[0, 0]], 10_000.0);
        assert_eq!(gt[[0, 1]], 0.0);
        assert_eq!(gt[[0, 2]], 9_999.5);
    }

    #[test]
    fn test_custom_max_depth() {
        let modality = Modality::parse("kw").unwrap();
        let channels = ChannelSynthesizer::new()
            .with_max_gt_depth(10.0)
            .synthesize(&archive(), &modality)
            .unwrap();
        let gt = channels.target().unwrap();
        assert_eq!(gt[[0, 2]], 3.0);
        assert_eq!(gt[[1, 0]], 0.0);
    }

    #[test]
    fn test_channels_follow_token_order() {
        let modality = Modality::parse("kw-dde-rgb-kor").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();
        let keys: Vec<_> = channels.keys().collect();
        assert_eq!(keys, vec![GT_DEPTH_KEY, "kw", "dde", "rgb", "kor"]);
    }

    #[test]
    fn test_legacy_order_ignores_declaration() {
        let synthesizer = ChannelSynthesizer::new().with_channel_order(ChannelOrder::Legacy);

        let channels = synthesizer
            .synthesize(&archive(), &Modality::parse("kw-dde-rgb-kor").unwrap())
            .unwrap();
        let keys: Vec<_> = channels.keys().collect();
        assert_eq!(keys, vec![GT_DEPTH_KEY, "rgb", "kor", "kw", "dde"]);

        let channels = synthesizer
            .synthesize(&archive(), &Modality::parse("kw-kor-d3dwor").unwrap())
            .unwrap();
        let keys: Vec<_> = channels.keys().collect();
        assert_eq!(keys, vec![GT_DEPTH_KEY, "kor", "kw"]);
    }

    #[test]
    fn test_declared_order_keeps_distance_layers() {
        let modality = Modality::parse("kw-kor-d3dwor").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();
        let keys: Vec<_> = channels.keys().collect();
        assert_eq!(keys, vec![GT_DEPTH_KEY, "kw", "kor", "d3dwor"]);
    }

    #[test]
    fn test_legacy_distance_layers_need_dense() {
        let modality = Modality::parse("d3dwde-dor-d3dwor").unwrap();
        assert_eq!(
            ChannelOrder::Legacy.arrange(&modality),
            vec![
                ModalityToken::DenseOriginal,
                ModalityToken::Distance3dOriginal,
                ModalityToken::Distance3dDenoised
            ]
        );
        assert_eq!(ChannelOrder::Declared.arrange(&modality), modality.tokens().to_vec());
    }

    #[test]
    fn test_rgb_is_channel_last() {
        let modality = Modality::parse("rgb").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();
        let rgb = channels.get("rgb").unwrap();
        assert_eq!(rgb.shape(), &[2, 3, 3]);
        assert_eq!(rgb[[1, 2, 1]], 112.0);
    }

    #[test]
    fn test_grey_luminance() {
        let modality = Modality::parse("grey").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();
        let grey = channels.get("grey").unwrap();
        let expected = 0.2989 * 11.0 + 0.587 * 111.0 + 0.114 * 211.0;
        assert!((grey[[1, 1]] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_keypoint_channels() {
        let modality = Modality::parse("kor-kgt-kde-kw").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();

        // landmark 0 -> (0, 1), landmark 1 -> (1, 2), landmark 2 -> (0, 1)
        let kor = channels.get("kor").unwrap();
        assert_eq!(kor[[0, 1]], 6.0);
        assert_eq!(kor[[1, 2]], 0.0);

        let kgt = channels.get("kgt").unwrap();
        assert_eq!(kgt[[0, 1]], 2.0);
        assert_eq!(kgt[[1, 2]], 0.0);

        let kde = channels.get("kde").unwrap();
        assert_eq!(kde[[0, 1]], 3.5);
        assert_eq!(kde[[1, 2]], 2.0);

        let kw = channels.get("kw").unwrap();
        assert_eq!(kw[[0, 1]], 0.4);
        assert_eq!(kw[[1, 2]], 0.0);

        for key in ["kor", "kgt", "kde", "kw"] {
            let plane = channels.get(key).unwrap();
            assert_eq!(plane[[0, 0]], 0.0);
            assert_eq!(plane[[1, 0]], 0.0);
        }
    }

    #[test]
    fn test_dense_layers() {
        let modality = Modality::parse("dor-dde-d3dwor-d3dwde").unwrap();
        let channels = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap();
        assert_eq!(channels.get("dor").unwrap()[[0, 0]], 101.0);
        assert_eq!(channels.get("d3dwor").unwrap()[[0, 0]], 301.0);
        assert_eq!(channels.get("dde").unwrap()[[0, 0]], 401.0);
        assert_eq!(channels.get("d3dwde").unwrap()[[1, 2]], 613.0);
    }

    #[test]
    fn test_fake_depth_requires_sparsifier() {
        let modality = Modality::parse("rgb-fd").unwrap();
        let err = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap_err();
        assert!(matches!(err, PipelineError::MissingSparsifier));
    }

    #[test]
    fn test_fake_depth_copies_kept_pixels() {
        struct KeepFirstRow;
        impl Sparsifier for KeepFirstRow {
            fn dense_to_sparse(&self, _: ArrayView3<'_, f32>, depth: ArrayView2<'_, f32>) -> Array2<bool> {
                Array2::from_shape_fn(depth.dim(), |(y, _)| y == 0)
            }
        }

        let modality = Modality::parse("fd").unwrap();
        let channels = ChannelSynthesizer::new()
            .with_sparsifier(Arc::new(KeepFirstRow))
            .synthesize(&archive(), &modality)
            .unwrap();
        let fd = channels.get("fd").unwrap();
        assert_eq!(fd[[0, 0]], 0.0);
        assert_eq!(fd[[0, 2]], 3.0);
        assert_eq!(fd[[1, 1]], 0.0);
    }

    #[test]
    fn test_mask_shape_is_checked() {
        struct WrongShape;
        impl Sparsifier for WrongShape {
            fn dense_to_sparse(&self, _: ArrayView3<'_, f32>, _: ArrayView2<'_, f32>) -> Array2<bool> {
                Array2::from_elem((1, 1), true)
            }
        }

        let modality = Modality::parse("fd").unwrap();
        let err = ChannelSynthesizer::new()
            .with_sparsifier(Arc::new(WrongShape))
            .synthesize(&archive(), &modality)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MaskShape { .. }));
    }

    #[test]
    fn test_unimplemented_tokens_fail() {
        for value in ["kvor", "rgb-kvor", "d2dwor-kor", "kw-dor-d2dwor"] {
            let modality = Modality::parse(value).unwrap();
            let err = ChannelSynthesizer::new().synthesize(&archive(), &modality).unwrap_err();
            assert!(matches!(err, PipelineError::NotImplemented(_)), "{}", value);
        }
    }

    #[test]
    fn test_missing_layer_is_reported() {
        let archive = SampleArchive::new(
            Array3::zeros((3, 2, 2)),
            Array3::zeros((2, 2, 2)),
            Array2::zeros((0, 5)),
        )
        .unwrap();
        let modality = Modality::parse("dde").unwrap();
        let err = ChannelSynthesizer::new().synthesize(&archive, &modality).unwrap_err();
        assert!(matches!(err, PipelineError::Archive(_)));
    }

    #[test]
    fn test_repeated_synthesis_is_identical() {
        let modality = Modality::parse("rgb-fd-kgt-dor").unwrap();
        let synthesizer =
            ChannelSynthesizer::new().with_sparsifier(Arc::new(UniformSampling::new(3).with_seed(11)));
        let a = synthesizer.synthesize(&archive(), &modality).unwrap();
        let b = synthesizer.synthesize(&archive(), &modality).unwrap();
        assert_eq!(a, b);
    }
}
