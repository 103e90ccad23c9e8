//! Source decoding and RGB normalization.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, GIF, WebP) and produces the
//! [`SourceImage`] every attempt composes from. This is the first step of
//! a run and the only one whose failure aborts it.

use crate::hash::ContentHash;
use crate::types::{PipelineError, SourceImage};

/// Decode raw image bytes into a three-channel RGB source image.
///
/// Alpha is dropped and grayscale or palette images are expanded, so
/// every transform downstream sees `Rgb<u8>` pixels. The returned image
/// carries the content hash of `bytes` as given, which seeds the run's
/// hash registry.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<SourceImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes).map_err(PipelineError::ImageDecode)?;
    Ok(SourceImage::new(img.to_rgb8(), ContentHash::of(bytes)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_rgba_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgb(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgb(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn alpha_is_dropped() {
        let img = image::RgbaImage::from_fn(3, 2, |_, _| image::Rgba([10, 20, 30, 0]));
        let source = decode_rgb(&encode_rgba_png(&img)).unwrap();
        for pixel in source.pixels().pixels() {
            assert_eq!(pixel.0, [10, 20, 30]);
        }
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = image::RgbaImage::from_fn(17, 31, |_, _| image::Rgba([128, 64, 32, 255]));
        let source = decode_rgb(&encode_rgba_png(&img)).unwrap();
        assert_eq!(source.pixels().width(), 17);
        assert_eq!(source.pixels().height(), 31);
    }

    #[test]
    fn source_hash_covers_input_bytes() {
        let img = image::RgbaImage::from_fn(2, 2, |_, _| image::Rgba([255, 255, 255, 255]));
        let bytes = encode_rgba_png(&img);
        let source = decode_rgb(&bytes).unwrap();
        assert_eq!(source.hash(), ContentHash::of(&bytes));
    }
}
