//! Enhancement-style adjustments: interpolate between the image and a
//! "degenerate" version of it.
//!
//! Each adjustment picks a degenerate image (black for brightness, the
//! mean gray for contrast, the grayscale image for saturation, a smoothed
//! image for sharpness) and computes
//!
//! ```text
//! out = degenerate + factor × (image − degenerate)
//! ```
//!
//! per channel, rounded and clamped to `0..=255`. A factor of 1.0 returns
//! the image unchanged; factors close to 1.0 produce changes well below
//! what the eye can see.

use crate::types::RgbImage;

/// Scale every channel toward (factor < 1) or away from (factor > 1)
/// black.
#[must_use = "returns the adjusted image"]
pub fn brightness(image: &RgbImage, factor: f64) -> RgbImage {
    let degenerate = RgbImage::new(image.width(), image.height());
    blend(&degenerate, image, factor)
}

/// Scale every channel toward or away from the image's mean luminance.
#[must_use = "returns the adjusted image"]
pub fn contrast(image: &RgbImage, factor: f64) -> RgbImage {
    let mean = mean_luma(image);
    let degenerate = RgbImage::from_pixel(image.width(), image.height(), image::Rgb([mean; 3]));
    blend(&degenerate, image, factor)
}

/// Scale every pixel toward or away from its own gray value.
#[must_use = "returns the adjusted image"]
pub fn saturation(image: &RgbImage, factor: f64) -> RgbImage {
    let degenerate = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let gray = luma(image.get_pixel(x, y).0);
        image::Rgb([gray; 3])
    });
    blend(&degenerate, image, factor)
}

/// Scale every pixel toward or away from a 3x3 smoothed copy.
#[must_use = "returns the adjusted image"]
pub fn sharpness(image: &RgbImage, factor: f64) -> RgbImage {
    let degenerate = crate::blur::smooth(image);
    blend(&degenerate, image, factor)
}

/// Per-channel linear interpolation `a + factor × (b − a)`.
///
/// Both images must have the same dimensions; the output takes `b`'s.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops
)]
pub fn blend(a: &RgbImage, b: &RgbImage, factor: f64) -> RgbImage {
    debug_assert_eq!(a.dimensions(), b.dimensions(), "blend dimension mismatch");
    let mut out = b.clone();
    for (dst, &lo) in out.iter_mut().zip(a.iter()) {
        let lo = f64::from(lo);
        let value = lo + factor * (f64::from(*dst) - lo);
        *dst = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// ITU-R 601-2 luma with 16-bit fixed-point weights, rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    let weighted = u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471;
    ((weighted + 0x8000) >> 16) as u8
}

/// Mean luma over the image, rounded to the nearest integer.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn mean_luma(image: &RgbImage) -> u8 {
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0;
    }
    let total: u64 = image.pixels().map(|p| u64::from(luma(p.0))).sum();
    (total as f64 / count as f64).round().clamp(0.0, 255.0) as u8
}
