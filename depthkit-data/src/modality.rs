//! Modality vocabulary and token-list parsing.
//!
//! A modality is written as tokens joined by `-`, e.g. `rgb-kor-kw`. The order
//! of the tokens is the order of the channels in the assembled input.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Separator between tokens in a modality string.
pub const TOKEN_SEPARATOR: char = '-';

/// Errors produced while validating a modality string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModalityError {
    #[error("token \"{0}\" is not a known channel")]
    UnknownToken(String),

    #[error("token \"{0}\" appears more than once")]
    DuplicateToken(ModalityToken),

    #[error("modality string is empty")]
    Empty,
}

/// One derivable channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalityToken {
    /// Color image, three channels.
    Rgb,
    /// Luminance of the color image.
    Grey,
    /// Sparse depth simulated from ground truth by a sparsifier.
    FakeDepth,
    /// Landmark pixels carrying the original SLAM depth.
    KeypointOriginal,
    /// Landmark pixels carrying the ground-truth depth.
    KeypointGroundTruth,
    /// Landmark pixels carrying the confidence weight.
    KeypointWeight,
    /// Landmark pixels carrying the denoised depth.
    KeypointDenoised,
    /// Dense interpolation of the original landmarks.
    DenseOriginal,
    /// Dense interpolation of the denoised landmarks.
    DenseDenoised,
    /// Voronoi expansion of the landmarks. Not implemented.
    KeypointVoronoi,
    /// 2D distance transform seeded by landmarks. Not implemented.
    Distance2dOriginal,
    /// 3D euclidean distance to the closest original landmark.
    Distance3dOriginal,
    /// 3D euclidean distance to the closest denoised landmark.
    Distance3dDenoised,
}

impl ModalityToken {
    /// Every token, in vocabulary order.
    pub const ALL: [ModalityToken; 13] = [
        ModalityToken::Rgb,
        ModalityToken::Grey,
        ModalityToken::FakeDepth,
        ModalityToken::KeypointOriginal,
        ModalityToken::KeypointGroundTruth,
        ModalityToken::KeypointWeight,
        ModalityToken::KeypointDenoised,
        ModalityToken::DenseOriginal,
        ModalityToken::DenseDenoised,
        ModalityToken::KeypointVoronoi,
        ModalityToken::Distance2dOriginal,
        ModalityToken::Distance3dOriginal,
        ModalityToken::Distance3dDenoised,
    ];

    /// Short name used in modality strings and channel keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ModalityToken::Rgb => "rgb",
            ModalityToken::Grey => "grey",
            ModalityToken::FakeDepth => "fd",
            ModalityToken::KeypointOriginal => "kor",
            ModalityToken::KeypointGroundTruth => "kgt",
            ModalityToken::KeypointWeight => "kw",
            ModalityToken::KeypointDenoised => "kde",
            ModalityToken::DenseOriginal => "dor",
            ModalityToken::DenseDenoised => "dde",
            ModalityToken::KeypointVoronoi => "kvor",
            ModalityToken::Distance2dOriginal => "d2dwor",
            ModalityToken::Distance3dOriginal => "d3dwor",
            ModalityToken::Distance3dDenoised => "d3dwde",
        }
    }

    /// Number of input channels this token contributes.
    pub fn channels(self) -> usize {
        match self {
            ModalityToken::Rgb => 3,
            _ => 1,
        }
    }

    /// Whether the pipeline can synthesize this token.
    pub fn is_implemented(self) -> bool {
        !matches!(
            self,
            ModalityToken::KeypointVoronoi | ModalityToken::Distance2dOriginal
        )
    }
}

impl fmt::Display for ModalityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModalityToken {
    type Err = ModalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModalityToken::ALL
            .into_iter()
            .find(|token| token.as_str() == s)
            .ok_or_else(|| ModalityError::UnknownToken(s.to_string()))
    }
}

/// An ordered, validated list of modality tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modality {
    tokens: Vec<ModalityToken>,
}

impl Modality {
    /// Parse a modality string, rejecting unknown and repeated tokens.
    pub fn parse(value: &str) -> Result<Self, ModalityError> {
        if value.trim().is_empty() {
            return Err(ModalityError::Empty);
        }

        let mut tokens = Vec::new();
        for raw in value.split(TOKEN_SEPARATOR) {
            let token: ModalityToken = raw.trim().parse()?;
            if tokens.contains(&token) {
                return Err(ModalityError::DuplicateToken(token));
            }
            tokens.push(token);
        }

        Ok(Self { tokens })
    }

    /// Parse a modality string, degrading to an empty modality on any error.
    ///
    /// Kept for datasets configured against the legacy behavior, where an
    /// invalid token silently produced no channels.
    pub fn parse_lenient(value: &str) -> Self {
        match Self::parse(value) {
            Ok(modality) => modality,
            Err(e) => {
                warn!("Modality \"{}\" is invalid ({}); no channels will be produced", value, e);
                Self::default()
            }
        }
    }

    /// Build a modality from already-typed tokens.
    pub fn from_tokens(tokens: &[ModalityToken]) -> Result<Self, ModalityError> {
        if tokens.is_empty() {
            return Err(ModalityError::Empty);
        }
        let mut out = Vec::with_capacity(tokens.len());
        for &token in tokens {
            if out.contains(&token) {
                return Err(ModalityError::DuplicateToken(token));
            }
            out.push(token);
        }
        Ok(Self { tokens: out })
    }

    /// Membership test.
    pub fn contains(&self, token: ModalityToken) -> bool {
        self.tokens.contains(&token)
    }

    /// Tokens in declared order.
    pub fn tokens(&self) -> &[ModalityToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of stacked input channels: one per token, three for `rgb`.
    pub fn num_channels(&self) -> usize {
        let mut num = self.tokens.len();
        if self.contains(ModalityToken::Rgb) {
            num += 2;
        }
        num
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", TOKEN_SEPARATOR)?;
            }
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for Modality {
    type Err = ModalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
