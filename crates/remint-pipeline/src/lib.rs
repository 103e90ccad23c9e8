//! remint-pipeline: Pure transform-and-verify pipeline (sans-IO).
//!
//! Turns one source image into N visually identical variants whose
//! content hashes differ from the source and from each other, through:
//! decode -> plan -> compose -> encode -> hash -> verify (retry/escalate).
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Writing outputs, packaging,
//! and user-facing progress live in front ends such as `remint-cli`.

pub mod attempt;
pub mod blur;
pub mod compose;
pub mod decode;
pub mod encode;
pub mod enhance;
pub mod events;
pub mod generate;
pub mod geometry;
pub mod guard;
pub mod hash;
pub mod noise;
pub mod plan;
pub mod transform;
pub mod types;

pub use encode::OutputFormat;
pub use events::{GenerationEvent, GenerationObserver, NoopObserver};
pub use generate::Generator;
pub use hash::{ContentHash, HashRegistry, md5_hex};
pub use transform::{Catalog, TransformKind, TransformMethod};
pub use types::{
    Dimensions, GeneratedVersion, GenerationConfig, GenerationReport, MethodRange, PipelineError,
    RgbImage, SourceImage, VersionFailure,
};

/// Generate `num_versions` hash-distinct variants of an image.
///
/// Takes raw image bytes (PNG, JPEG, BMP, GIF, WebP), a format hint
/// naming the output format (usually the source file name), and a
/// configuration. Uses the standard transform catalog.
///
/// # Pipeline steps
///
/// 1. Decode the source and hash its bytes
/// 2. For each version: pick a plan of 2-4 transforms
/// 3. Compose the plan onto a copy of the source
/// 4. Encode in the source's format (JPEG quality varies per version)
/// 5. Hash the encoded bytes; on collision retry with 3-5 transforms
/// 6. Record the version as verified, degraded, or failed
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `source_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Returns [`PipelineError::InvalidConfig`] if `num_versions` is zero or
/// `config` is invalid.
pub fn generate(
    source_bytes: &[u8],
    format_hint: &str,
    num_versions: usize,
    config: &GenerationConfig,
) -> Result<GenerationReport, PipelineError> {
    Generator::new(config.clone()).run(source_bytes, format_hint, num_versions)
}
