//! Subcommand implementations.

use crate::DatasetArgs;
use depthkit_data::{ManifestError, Modality, ModalityError, Split};
use depthkit_train::{
    ChannelOrder, ConfigError, DatasetConfig, DepthDataset, DepthDatasetBuilder, IdentityTransform,
    PipelineError, SparsifierConfig,
};
use image::{GrayImage, Luma};
use ndarray::{ArrayView2, Axis};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Modality error: {0}")]
    Modality(#[from] ModalityError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NPY write error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl DatasetArgs {
    /// Merge the config file (if any) with command-line overrides.
    pub fn resolve(&self) -> Result<(DatasetConfig, Split), CliError> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::from_json_file(path)?,
            None => DatasetConfig::default(),
        };

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(modality) = &self.modality {
            config.modality = modality.clone();
        }
        if self.lenient {
            config.strict_modality = false;
        }
        if self.legacy_order {
            config.channel_order = ChannelOrder::Legacy;
        }
        if let Some(n) = self.num_samples {
            config.sparsifier = Some(match config.sparsifier.take() {
                Some(SparsifierConfig::Uniform {
                    max_depth, seed, ..
                }) => SparsifierConfig::Uniform {
                    num_samples: n,
                    max_depth,
                    seed,
                },
                None => SparsifierConfig::Uniform {
                    num_samples: n,
                    max_depth: None,
                    seed: 0,
                },
            });
        }

        config.validate()?;
        let split = self.split.parse::<Split>()?;
        Ok((config, split))
    }
}

pub fn check_modality(value: &str) -> Result<(), CliError> {
    let modality = Modality::parse(value)?;
    println!("{}: {} channels", modality, modality.num_channels());
    for token in modality.tokens() {
        let note = if token.is_implemented() {
            ""
        } else {
            " (not implemented)"
        };
        println!("  {:<8}{}{}", token.as_str(), token.channels(), note);
    }
    Ok(())
}

pub fn inspect(args: &DatasetArgs, limit: usize) -> Result<(), CliError> {
    let (config, split) = args.resolve()?;
    let dataset = DepthDataset::open(&config, split)?;

    let indices: Vec<usize> = (0..dataset.len().min(limit)).collect();
    info!("Assembling {} of {} samples", indices.len(), dataset.len());

    let mut failures = 0;
    for (&index, result) in indices.iter().zip(dataset.get_many(&indices)) {
        let sample = &dataset.samples()[index];
        match result {
            Ok(assembled) => println!(
                "{:>5}  {:<16} input {:?}  target {:?}",
                index,
                sample.label,
                assembled.input.dim(),
                assembled.target.dim()
            ),
            Err(e) => {
                failures += 1;
                println!("{:>5}  {:<16} error: {}", index, sample.label, e);
            }
        }
    }

    if failures > 0 {
        warn!("{} of {} samples failed", failures, indices.len());
    }
    Ok(())
}

pub fn export(args: &DatasetArgs, index: usize, out: &Path, raw: bool) -> Result<(), CliError> {
    let (config, split) = args.resolve()?;
    let mut builder = DepthDatasetBuilder::from_config(&config, split)?;
    if raw {
        builder = builder.with_transform(Arc::new(IdentityTransform));
    }
    let dataset = builder.build()?;
    let sample = dataset.get(index)?;

    fs::create_dir_all(out)?;
    ndarray_npy::write_npy(out.join("input.npy"), &sample.input)?;
    ndarray_npy::write_npy(out.join("target.npy"), &sample.target)?;
    depth_preview(sample.target.index_axis(Axis(0), 0)).save(out.join("target.png"))?;

    info!(
        "Exported sample {} ({} channels) to {}",
        index,
        sample.channels(),
        out.display()
    );
    Ok(())
}

/// Grey preview of a depth map scaled by its maximum. Missing depth stays black.
pub fn depth_preview(depth: ArrayView2<'_, f32>) -> GrayImage {
    let (height, width) = depth.dim();
    let max = depth.iter().copied().fold(0.0f32, f32::max);
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let d = depth[[y as usize, x as usize]];
        let v = if max > 0.0 && d > 0.0 {
            (d / max * 255.0).round() as u8
        } else {
            0
        };
        Luma([v])
    })
}
