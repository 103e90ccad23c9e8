//! Additive per-channel noise.

use rand::Rng;

use crate::types::RgbImage;

/// Largest absolute change added to a single channel value.
pub const NOISE_AMPLITUDE: i16 = 3;

/// Add independent uniform integer noise in
/// `[-NOISE_AMPLITUDE, NOISE_AMPLITUDE]` to every channel of every pixel,
/// saturating at 0 and 255.
///
/// Channels are visited in raw buffer order (row-major, R/G/B), so the
/// result is a pure function of the image and the generator state.
#[must_use = "returns the noisy image"]
pub fn additive_noise<R: Rng>(image: &RgbImage, rng: &mut R) -> RgbImage {
    let mut out = image.clone();
    for value in out.iter_mut() {
        let delta = rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
        *value = clamp_u8(i16::from(*value) + delta);
    }
    out
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn clamp_u8(value: i16) -> u8 {
    value.clamp(0, 255) as u8
}
