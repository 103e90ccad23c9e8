//! Sub-pixel geometric perturbations that keep the image size.

use image::imageops::FilterType;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::types::RgbImage;

/// Fill color for pixels rotated in from outside the frame.
const ROTATION_FILL: image::Rgb<u8> = image::Rgb([255, 255, 255]);

/// Rotate about the image center by `degrees` without expanding the
/// canvas.
///
/// Nearest-neighbor sampling keeps every output pixel an exact copy of
/// some source pixel or the white fill, so small angles only shift pixels
/// along the rotation front.
#[must_use = "returns the rotated image"]
#[allow(clippy::cast_possible_truncation)]
pub fn micro_rotate(image: &RgbImage, degrees: f64) -> RgbImage {
    rotate_about_center(
        image,
        degrees.to_radians() as f32,
        Interpolation::Nearest,
        ROTATION_FILL,
    )
}

/// Resample by `scale` with Lanczos3 and back to the original size.
///
/// The intermediate size is clamped to at least one pixel per axis, so
/// even a 1x1 image survives a scale below 1.0.
#[must_use = "returns the resampled image"]
pub fn resample_round_trip(image: &RgbImage, scale: f64) -> RgbImage {
    let (w, h) = image.dimensions();
    let (sw, sh) = (scaled_axis(w, scale), scaled_axis(h, scale));
    let scaled = image::imageops::resize(image, sw, sh, FilterType::Lanczos3);
    image::imageops::resize(&scaled, w, h, FilterType::Lanczos3)
}

/// `floor(len × scale)`, clamped to `1..=u32::MAX`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled_axis(len: u32, scale: f64) -> u32 {
    let scaled = (f64::from(len) * scale).floor();
    if scaled < 1.0 {
        1
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}
