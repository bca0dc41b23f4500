//! Indexed dataset access.

use crate::assemble::{AssembledSample, assemble};
use crate::channels::ChannelSet;
use crate::config::{DatasetConfig, TransformConfig};
use crate::error::PipelineError;
use crate::synthesis::{BoundsPolicy, ChannelOrder, ChannelSynthesizer, Sparsifier};
use crate::transform::{ChannelTransform, TrainTransform, ValTransform};
use depthkit_data::{Modality, ModalityToken, Sample, SampleIndex, Split};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A split of archived samples, producing `(input, target)` tensors per index.
///
/// Only the sample index, modality and configuration are kept; every access
/// reads its own archive, so the dataset can be shared across threads.
pub struct DepthDataset {
    split: Split,
    index: SampleIndex,
    modality: Modality,
    synthesizer: ChannelSynthesizer,
    transform: Arc<dyn ChannelTransform>,
}

impl DepthDataset {
    /// Open a dataset from configuration, using the split's default transform.
    pub fn open(config: &DatasetConfig, split: Split) -> Result<Self, PipelineError> {
        DepthDatasetBuilder::from_config(config, split)?.build()
    }

    pub fn builder(root: impl Into<PathBuf>, split: Split) -> DepthDatasetBuilder {
        DepthDatasetBuilder::new(root, split)
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn modality(&self) -> &Modality {
        &self.modality
    }

    pub fn samples(&self) -> &[Sample] {
        self.index.samples()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn sample(&self, index: usize) -> Result<&Sample, PipelineError> {
        self.index.get(index).ok_or(PipelineError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Synthesize the channels of one sample without transforming them.
    pub fn load_channels(&self, index: usize) -> Result<ChannelSet, PipelineError> {
        let sample = self.sample(index)?;
        self.synthesizer
            .synthesize_path(&sample.archive_path, &self.modality)
    }

    /// Run the full pipeline for one sample: synthesize, transform, assemble.
    #[tracing::instrument(skip(self), fields(split = %self.split))]
    pub fn get(&self, index: usize) -> Result<AssembledSample, PipelineError> {
        let channels = self.load_channels(index)?;
        let channels = self.transform.apply(index, channels)?;
        let assembled = assemble(&channels, &self.modality)?;
        debug!(
            "Assembled sample {}: input {:?}, target {:?}",
            index,
            assembled.input.dim(),
            assembled.target.dim()
        );
        Ok(assembled)
    }

    /// Fetch several samples in parallel. Results keep the order of `indices`.
    pub fn get_many(&self, indices: &[usize]) -> Vec<Result<AssembledSample, PipelineError>> {
        indices.par_iter().map(|&index| self.get(index)).collect()
    }
}

/// Builder for [`DepthDataset`].
pub struct DepthDatasetBuilder {
    root: PathBuf,
    split: Split,
    modality: Modality,
    synthesizer: ChannelSynthesizer,
    transform: Option<Arc<dyn ChannelTransform>>,
}

impl DepthDatasetBuilder {
    /// Start from defaults: `rgb` modality, no sparsifier, no transform.
    pub fn new(root: impl Into<PathBuf>, split: Split) -> Self {
        Self {
            root: root.into(),
            split,
            modality: Modality::from_tokens(&[ModalityToken::Rgb]).unwrap_or_default(),
            synthesizer: ChannelSynthesizer::new(),
            transform: None,
        }
    }

    /// Builder populated from configuration, with the split's default transform.
    pub fn from_config(config: &DatasetConfig, split: Split) -> Result<Self, PipelineError> {
        config.validate()?;

        let modality = if config.strict_modality {
            Modality::parse(&config.modality)?
        } else {
            Modality::parse_lenient(&config.modality)
        };

        let mut builder = Self::new(&config.root, split)
            .with_modality(modality)
            .with_max_gt_depth(config.max_gt_depth)
            .with_bounds_policy(config.landmark_bounds)
            .with_channel_order(config.channel_order)
            .with_default_transform(config.transform.clone());
        if let Some(sparsifier) = &config.sparsifier {
            builder = builder.with_sparsifier(sparsifier.build());
        }
        Ok(builder)
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_sparsifier(mut self, sparsifier: Arc<dyn Sparsifier>) -> Self {
        self.synthesizer = self.synthesizer.with_sparsifier(sparsifier);
        self
    }

    pub fn with_max_gt_depth(mut self, max_gt_depth: f32) -> Self {
        self.synthesizer = self.synthesizer.with_max_gt_depth(max_gt_depth);
        self
    }

    pub fn with_bounds_policy(mut self, bounds: BoundsPolicy) -> Self {
        self.synthesizer = self.synthesizer.with_bounds_policy(bounds);
        self
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.synthesizer = self.synthesizer.with_channel_order(order);
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn ChannelTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Use [`TrainTransform`] for the train split and [`ValTransform`] otherwise.
    pub fn with_default_transform(self, config: TransformConfig) -> Self {
        let transform: Arc<dyn ChannelTransform> = match self.split {
            Split::Train => Arc::new(TrainTransform::new(config)),
            Split::Val => Arc::new(ValTransform::new(config)),
        };
        self.with_transform(transform)
    }

    pub fn build(self) -> Result<DepthDataset, PipelineError> {
        let transform = self.transform.ok_or(PipelineError::MissingTransform)?;
        let index = SampleIndex::load(&self.root, self.split)?;

        if self.modality.contains(ModalityToken::FakeDepth) && !self.synthesizer.has_sparsifier() {
            return Err(PipelineError::MissingSparsifier);
        }
        if let Some(token) = self.modality.tokens().iter().find(|t| !t.is_implemented()) {
            warn!("Modality token `{}` is not implemented; every access will fail", token);
        }
        let produced = self.synthesizer.channel_order().arrange(&self.modality).len();
        if produced != self.modality.len() {
            warn!(
                "Channel order {:?} drops {} of the tokens in {}",
                self.synthesizer.channel_order(),
                self.modality.len() - produced,
                self.modality
            );
        }
        if self.modality.is_empty() {
            warn!("Modality is empty; every access will fail with no input channels");
        }

        info!(
            "Opened {} split: {} samples, modality {} ({} channels)",
            self.split,
            index.len(),
            self.modality,
            self.modality.num_channels()
        );

        Ok(DepthDataset {
            split: self.split,
            index,
            modality: self.modality,
            synthesizer: self.synthesizer,
            transform,
        })
    }
}
