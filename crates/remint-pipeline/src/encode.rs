//! Output encoding.
//!
//! The output format follows the source file's extension. JPEG output
//! varies its quality per version and per retry, so even a
//! pixel-identical candidate yields a different byte stream. PNG is
//! lossless and deterministic: there, distinct hashes depend entirely on
//! the pixel differences introduced by the transforms.

use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder as _, ImageFormat};

use crate::types::{PipelineError, RgbImage};

/// Number of distinct per-version quality offsets.
const QUALITY_INDEX_CYCLE: usize = 5;
/// Number of distinct per-retry quality offsets.
const QUALITY_RETRY_CYCLE: u32 = 3;
/// Highest quality the JPEG encoder accepts.
const MAX_JPEG_QUALITY: u8 = 100;

/// Format candidates are encoded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG with per-version quality.
    Jpeg,
    /// Lossless PNG with maximum compression.
    Png,
    /// Any other format the `image` crate can write, with its default
    /// settings.
    Other(ImageFormat),
    /// The hint named no writable format. Encoding always fails.
    Unsupported(String),
}

impl OutputFormat {
    /// Resolve a format hint.
    ///
    /// The hint may be a file name (`photo.JPG`), a dotted extension
    /// (`.png`), or a bare extension (`webp`); matching is
    /// case-insensitive. An empty hint, or a path whose last component
    /// has no extension, means JPEG.
    #[must_use]
    pub fn from_hint(hint: &str) -> Self {
        let name = hint.trim();
        let ext = name.rsplit_once('.').map_or(name, |(_, ext)| ext);
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Self::Jpeg;
        }
        let ext = ext.to_ascii_lowercase();
        match ImageFormat::from_extension(&ext) {
            Some(ImageFormat::Jpeg) => Self::Jpeg,
            Some(ImageFormat::Png) => Self::Png,
            Some(format) if format.writing_enabled() => Self::Other(format),
            _ => Self::Unsupported(ext),
        }
    }

    /// JPEG quality for version `index0` (0-based) on attempt `retry`.
    ///
    /// `None` for formats without a quality parameter. The quality is
    /// `base + index0 % 5 + retry % 3`, clamped to the encoder's range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn quality(&self, base: u8, index0: usize, retry: u32) -> Option<u8> {
        if *self != Self::Jpeg {
            return None;
        }
        let offset = (index0 % QUALITY_INDEX_CYCLE) as u32 + retry % QUALITY_RETRY_CYCLE;
        let quality = u32::from(base) + offset;
        Some(quality.clamp(1, u32::from(MAX_JPEG_QUALITY)) as u8)
    }

    /// Serialize an RGB image.
    ///
    /// `quality` is used only for JPEG; when absent the default base
    /// quality applies.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedFormat`] for
    /// [`OutputFormat::Unsupported`] and [`PipelineError::Encode`] if the
    /// encoder rejects the image.
    pub fn encode(
        &self,
        image: &RgbImage,
        quality: Option<u8>,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut buf = Vec::new();
        match self {
            Self::Jpeg => {
                let quality = quality
                    .unwrap_or(crate::types::GenerationConfig::DEFAULT_JPEG_QUALITY_BASE)
                    .clamp(1, MAX_JPEG_QUALITY);
                JpegEncoder::new_with_quality(&mut buf, quality)
                    .write_image(
                        image.as_raw(),
                        image.width(),
                        image.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(PipelineError::Encode)?;
            }
            Self::Png => {
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
                    .write_image(
                        image.as_raw(),
                        image.width(),
                        image.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(PipelineError::Encode)?;
            }
            Self::Other(format) => {
                DynamicImage::ImageRgb8(image.clone())
                    .write_to(&mut Cursor::new(&mut buf), *format)
                    .map_err(PipelineError::Encode)?;
            }
            Self::Unsupported(ext) => return Err(PipelineError::UnsupportedFormat(ext.clone())),
        }
        Ok(buf)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => f.write_str("JPEG"),
            Self::Png => f.write_str("PNG"),
            Self::Other(format) => write!(f, "{format:?}"),
            Self::Unsupported(ext) => write!(f, "unsupported ({ext})"),
        }
    }
}
