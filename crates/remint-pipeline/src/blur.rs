//! Blur and 3x3 convolution filters.
//!
//! [`gaussian_blur_rgb`] wraps [`imageproc::filter::gaussian_blur_f32`],
//! applying it independently to each R/G/B channel. [`sharpen`] and
//! [`smooth`] are fixed 3x3 kernels; they leave the one-pixel border
//! untouched, so images narrower or shorter than three pixels pass
//! through unchanged.

use image::GrayImage;

use crate::types::RgbImage;

/// Sharpen kernel: strong center, negative ring, weight sum 16.
const SHARPEN_KERNEL: [i32; 9] = [-2, -2, -2, -2, 32, -2, -2, -2, -2];
const SHARPEN_DIVISOR: i32 = 16;

/// Smoothing kernel used as the degenerate image for sharpness.
const SMOOTH_KERNEL: [i32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_DIVISOR: i32 = 13;

/// Apply Gaussian blur to an RGB image by blurring each channel
/// independently.
///
/// `imageproc::filter::gaussian_blur_f32` is applied to single-channel
/// images, so this function splits the RGB image into three grayscale
/// images, blurs each, and reassembles. Gaussian blur is linear and
/// per-channel, so this equals blurring in color space.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred RGB image"]
pub fn gaussian_blur_rgb(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 3] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Apply the 3x3 sharpen kernel.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &RgbImage) -> RgbImage {
    convolve3x3(image, &SHARPEN_KERNEL, SHARPEN_DIVISOR)
}

/// Apply the 3x3 smoothing kernel.
#[must_use = "returns the smoothed image"]
pub fn smooth(image: &RgbImage) -> RgbImage {
    convolve3x3(image, &SMOOTH_KERNEL, SMOOTH_DIVISOR)
}

/// Convolve the interior of `image` with a row-major 3x3 integer kernel,
/// dividing by `divisor` with rounding and clamping to `0..=255`.
///
/// Border pixels are copied from the input.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn convolve3x3(image: &RgbImage, kernel: &[i32; 9], divisor: i32) -> RgbImage {
    let (w, h) = (image.width(), image.height());
    let mut out = image.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0i32; 3];
            for (k, &weight) in kernel.iter().enumerate() {
                // k / 3 and k % 3 are in 0..3, so the offsets stay in bounds.
                let sx = x + (k % 3) as u32 - 1;
                let sy = y + (k / 3) as u32 - 1;
                let src = image.get_pixel(sx, sy).0;
                for (sum, &value) in acc.iter_mut().zip(&src) {
                    *sum += weight * i32::from(value);
                }
            }
            let pixel = acc.map(|sum| {
                let rounded = (sum + divisor / 2).div_euclid(divisor);
                rounded.clamp(0, 255) as u8
            });
            out.put_pixel(x, y, image::Rgb(pixel));
        }
    }
    out
}
