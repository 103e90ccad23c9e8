//! Shared types for the remint transform-and-verify pipeline.

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Re-export `RgbImage` so downstream crates can reference decoded
/// and candidate rasters without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Whether either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The decoded source image, normalized to three-channel RGB.
///
/// Owned by the orchestrator for the duration of one run and never
/// mutated: every transform works on a copy.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbImage,
    hash: ContentHash,
}

impl SourceImage {
    pub(crate) const fn new(pixels: RgbImage, hash: ContentHash) -> Self {
        Self { pixels, hash }
    }

    /// The decoded RGB pixels.
    #[must_use]
    pub const fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Content hash of the original source bytes (not of the pixels).
    #[must_use]
    pub const fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Pixel dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.pixels)
    }
}

/// Inclusive range of how many transforms a plan may compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRange {
    /// Fewest methods in a plan.
    pub min: usize,
    /// Most methods in a plan.
    pub max: usize,
}

impl MethodRange {
    /// Create a new range. No validation happens here; see
    /// [`GenerationConfig::validate`].
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Configuration for a generation run.
///
/// All parameters have defaults matching the documented pipeline
/// behavior. Construct with struct-update syntax over
/// [`GenerationConfig::default`] and call [`validate`](Self::validate)
/// (the orchestrator does so before decoding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Attempts allowed per version, counting both hash collisions and
    /// failed compositions/encodes.
    pub max_attempts: u32,

    /// Plan size for a version's ordinary attempts.
    pub base_methods: MethodRange,

    /// Plan size once an attempt has collided with a claimed hash.
    pub escalated_methods: MethodRange,

    /// Lowest JPEG quality in the per-version quality band.
    ///
    /// The effective quality is `base + index % 5 + retry % 3`, clamped
    /// to the encoder's `1..=100` range.
    pub jpeg_quality_base: u8,

    /// Run seed. `None` draws a fresh one; the resolved seed is
    /// reported so the run can be reproduced.
    pub seed: Option<u64>,

    /// Whether a version that still collides after `max_attempts` is
    /// accepted (flagged degraded) or recorded as a failure.
    pub accept_degraded: bool,
}

impl GenerationConfig {
    /// Default per-version attempt budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    /// Default plan size for ordinary attempts.
    pub const DEFAULT_BASE_METHODS: MethodRange = MethodRange::new(2, 4);
    /// Default plan size after a collision.
    pub const DEFAULT_ESCALATED_METHODS: MethodRange = MethodRange::new(3, 5);
    /// Default lowest JPEG quality.
    pub const DEFAULT_JPEG_QUALITY_BASE: u8 = 95;

    /// Check the configuration's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `max_attempts` is zero,
    /// a method range is empty or inverted, or the JPEG quality base is
    /// outside `1..=100`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_attempts == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        for (name, range) in [
            ("base_methods", self.base_methods),
            ("escalated_methods", self.escalated_methods),
        ] {
            if range.min == 0 || range.min > range.max {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must satisfy 1 <= min <= max, got {}..={}",
                    range.min, range.max,
                )));
            }
        }
        if !(1..=100).contains(&self.jpeg_quality_base) {
            return Err(PipelineError::InvalidConfig(format!(
                "jpeg_quality_base must be in 1..=100, got {}",
                self.jpeg_quality_base,
            )));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_methods: Self::DEFAULT_BASE_METHODS,
            escalated_methods: Self::DEFAULT_ESCALATED_METHODS,
            jpeg_quality_base: Self::DEFAULT_JPEG_QUALITY_BASE,
            seed: None,
            accept_degraded: true,
        }
    }
}

/// One accepted output image.
///
/// Immutable once accepted. The encoded bytes are not serialized;
/// callers write them wherever they keep outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedVersion {
    /// 1-based position in the requested sequence.
    pub index: usize,

    /// Encoded image bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Content hash of `bytes`.
    pub hash: ContentHash,

    /// MD5 of `bytes` in hex, for checking files with `md5sum`.
    pub md5: String,

    /// Length of `bytes`.
    pub size: usize,

    /// `true` when uniqueness could not be verified within the attempt
    /// budget and the hash duplicates an earlier claim.
    pub degraded: bool,

    /// Attempts spent, including the accepted one.
    pub attempts: u32,

    /// JPEG quality used, when the output is JPEG.
    pub quality: Option<u8>,

    /// Names of the transforms composed into this version, in order.
    pub methods: Vec<&'static str>,
}

/// A requested version that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFailure {
    /// 1-based position in the requested sequence.
    pub index: usize,
    /// Attempts spent before giving up.
    pub attempts: u32,
    /// Display text of the last error.
    pub reason: String,
}

/// Result of a full generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Hash of the source bytes.
    pub source_hash: ContentHash,

    /// MD5 of the source bytes in hex.
    pub source_md5: String,

    /// Dimensions of the decoded source. Every version matches them.
    pub dimensions: Dimensions,

    /// Number of versions requested.
    pub requested: usize,

    /// Accepted versions (including degraded ones), in index order.
    pub versions: Vec<GeneratedVersion>,

    /// Versions that were skipped, in index order.
    pub failures: Vec<VersionFailure>,

    /// Distinct hashes claimed during the run, the source's included.
    pub distinct_hashes: usize,

    /// Seed the run's plan selector was created from.
    pub seed: u64,
}

impl GenerationReport {
    /// Versions whose uniqueness was verified.
    #[must_use]
    pub fn verified_count(&self) -> usize {
        self.versions.iter().filter(|v| !v.degraded).count()
    }

    /// Versions accepted without verified uniqueness.
    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.versions.iter().filter(|v| v.degraded).count()
    }
}

/// Errors that can occur during a generation run.
///
/// Only the decode and configuration variants abort a run. Transform
/// and encode errors are retried per version and end up as
/// [`VersionFailure`] entries when the budget runs out.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the source image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// The source image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Generation configuration is invalid.
    #[error("invalid generation configuration: {0}")]
    InvalidConfig(String),

    /// A transform could not be applied.
    #[error("transform {method} failed: {reason}")]
    Transform {
        /// Name of the failing transform.
        method: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// The format hint names no format the encoder can write.
    #[error("unsupported output format: {0:?}")]
    UnsupportedFormat(String),

    /// The encoder rejected the candidate image.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}
