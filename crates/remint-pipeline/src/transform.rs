//! The catalog of imperceptible transforms.
//!
//! This module defines the [`TransformMethod`] trait for pluggable pixel
//! operations, the [`TransformKind`] enum naming the built-in ones, and
//! the [`Catalog`] the plan selector draws from.
//!
//! # Strategy pattern
//!
//! Every method is a pure function of `(image, seed)`: it seeds its own
//! PCG32 generator from `seed` and never reads ambient randomness, so the
//! same inputs produce byte-identical output. Perturbations are fixed,
//! small constants so any composition of a handful of methods stays
//! visually equivalent to the source.

use std::fmt;

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::types::{PipelineError, RgbImage};

/// A deterministic, seed-parameterized image operation.
///
/// Implementations must return an RGB image with the same dimensions as
/// the input (the composition engine resamples anything else back) and
/// must not fail for valid input unless the operation is genuinely
/// impossible, e.g. degenerate geometry.
pub trait TransformMethod {
    /// Stable, human-readable identifier.
    fn name(&self) -> &'static str;

    /// Apply the transform to a copy of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Transform`] if the operation cannot be
    /// applied.
    fn apply(&self, image: &RgbImage, seed: u64) -> Result<RgbImage, PipelineError>;
}

/// The built-in transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Uniform integer noise in `[-3, 3]` on every channel.
    AdditiveNoise,
    /// Brightness factor `1 ± 0.02`.
    Brightness,
    /// Contrast factor `1 ± 0.02` around the mean luminance.
    Contrast,
    /// Saturation factor `1 ± 0.02` against the grayscale image.
    Saturation,
    /// Sub-pixel Gaussian blur followed by a 3x3 sharpen kernel.
    BlurSharpen,
    /// Sharpness factor `1 ± 0.02` against a smoothed image.
    Sharpness,
    /// Rotation about the center by at most 0.1 degree, white fill.
    MicroRotation,
    /// Resample by `1 ± 0.001` and back, then brightness `1 ± 0.005`.
    ResizeBrightness,
}

impl TransformKind {
    /// Every built-in transform, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::AdditiveNoise,
        Self::Brightness,
        Self::Contrast,
        Self::Saturation,
        Self::BlurSharpen,
        Self::Sharpness,
        Self::MicroRotation,
        Self::ResizeBrightness,
    ];

    /// Stable identifier, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdditiveNoise => "additive_noise",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::BlurSharpen => "blur_sharpen",
            Self::Sharpness => "sharpness",
            Self::MicroRotation => "micro_rotation",
            Self::ResizeBrightness => "resize_brightness",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Largest relative change of the enhancement factors.
const ENHANCE_SPAN: f64 = 0.02;
/// Largest relative change of the resample scale.
const RESAMPLE_SPAN: f64 = 0.001;
/// Largest relative change of the brightness following a resample.
const RESAMPLE_BRIGHTNESS_SPAN: f64 = 0.005;
/// Largest rotation, in degrees.
const ROTATION_SPAN_DEGREES: f64 = 0.1;
/// Blur sigma range for [`TransformKind::BlurSharpen`].
const BLUR_SIGMA: (f32, f32) = (0.08, 0.12);

impl TransformMethod for TransformKind {
    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn apply(&self, image: &RgbImage, seed: u64) -> Result<RgbImage, PipelineError> {
        let mut rng = method_rng(seed);
        let out = match *self {
            Self::AdditiveNoise => crate::noise::additive_noise(image, &mut rng),
            Self::Brightness => {
                crate::enhance::brightness(image, jitter(&mut rng, ENHANCE_SPAN))
            }
            Self::Contrast => crate::enhance::contrast(image, jitter(&mut rng, ENHANCE_SPAN)),
            Self::Saturation => {
                crate::enhance::saturation(image, jitter(&mut rng, ENHANCE_SPAN))
            }
            Self::BlurSharpen => {
                let sigma = rng.gen_range(BLUR_SIGMA.0..=BLUR_SIGMA.1);
                crate::blur::sharpen(&crate::blur::gaussian_blur_rgb(image, sigma))
            }
            Self::Sharpness => crate::enhance::sharpness(image, jitter(&mut rng, ENHANCE_SPAN)),
            Self::MicroRotation => {
                let degrees = rng.gen_range(-ROTATION_SPAN_DEGREES..=ROTATION_SPAN_DEGREES);
                crate::geometry::micro_rotate(image, degrees)
            }
            Self::ResizeBrightness => {
                let scale = jitter(&mut rng, RESAMPLE_SPAN);
                let resampled = crate::geometry::resample_round_trip(image, scale);
                crate::enhance::brightness(&resampled, jitter(&mut rng, RESAMPLE_BRIGHTNESS_SPAN))
            }
        };
        Ok(out)
    }
}

/// Create the PCG32 generator a transform draws its parameters from.
#[must_use]
pub fn method_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Draw a factor uniformly from `[1 - span, 1 + span]`.
fn jitter(rng: &mut Pcg32, span: f64) -> f64 {
    1.0 + rng.gen_range(-span..=span)
}

/// The set of transforms a plan selector chooses from.
///
/// Order is significant only for reproducibility: selection is by index,
/// so two catalogs with the same methods in a different order produce
/// different plans from the same seed.
pub struct Catalog {
    methods: Vec<Box<dyn TransformMethod>>,
}

impl Catalog {
    /// The standard catalog holding every [`TransformKind`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(
            TransformKind::ALL
                .into_iter()
                .map(|kind| Box::new(kind) as Box<dyn TransformMethod>)
                .collect(),
        )
    }

    /// A catalog of arbitrary methods.
    #[must_use]
    pub fn new(methods: Vec<Box<dyn TransformMethod>>) -> Self {
        Self { methods }
    }

    /// Add a method to the end of the catalog.
    #[must_use]
    pub fn with_method(mut self, method: impl TransformMethod + 'static) -> Self {
        self.methods.push(Box::new(method));
        self
    }

    /// Number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the catalog has no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The method at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&dyn TransformMethod> {
        self.methods.get(index).map(Box::as_ref)
    }

    /// Method names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|m| m.name())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([
                ((x * 255) / w.max(1)) as u8,
                ((y * 255) / h.max(1)) as u8,
                ((x + y) * 3).min(255) as u8,
            ])
        })
    }

    fn max_channel_diff(a: &RgbImage, b: &RgbImage) -> u8 {
        a.as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&p, &q)| p.abs_diff(q))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn standard_catalog_holds_all_kinds() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), 8);
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names[0], "additive_noise");
        assert_eq!(names[7], "resize_brightness");
    }

    #[test]
    fn names_match_serde_representation() {
        for kind in TransformKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn every_kind_is_deterministic() {
        let img = gradient(24, 16);
        for kind in TransformKind::ALL {
            let a = kind.apply(&img, 1234).unwrap();
            let b = kind.apply(&img, 1234).unwrap();
            assert_eq!(a, b, "{kind} is not deterministic");
        }
    }

    #[test]
    fn every_kind_preserves_dimensions() {
        for (w, h) in [(1, 1), (2, 3), (24, 16), (33, 7)] {
            let img = gradient(w, h);
            for kind in TransformKind::ALL {
                let out = kind.apply(&img, 99).unwrap();
                assert_eq!(
                    (out.width(), out.height()),
                    (w, h),
                    "{kind} changed dimensions of a {w}x{h} image",
                );
            }
        }
    }

    #[test]
    fn every_kind_stays_visually_close() {
        let img = gradient(40, 40);
        for kind in TransformKind::ALL {
            let out = kind.apply(&img, 7).unwrap();
            // Rotation can move a high-contrast pixel by one position,
            // so bound the mean rather than the maximum.
            let total: u64 = img
                .as_raw()
                .iter()
                .zip(out.as_raw())
                .map(|(&p, &q)| u64::from(p.abs_diff(q)))
                .sum();
            let mean = total / img.as_raw().len() as u64;
            assert!(mean <= 4, "{kind} mean channel change {mean} is too large");
        }
    }

    #[test]
    fn noise_is_bounded_by_three() {
        let img = RgbImage::from_pixel(16, 16, image::Rgb([128, 128, 128]));
        let out = TransformKind::AdditiveNoise.apply(&img, 5).unwrap();
        assert!(max_channel_diff(&img, &out) <= 3);
    }

    #[test]
    fn different_seeds_give_different_noise() {
        let img = gradient(16, 16);
        let a = TransformKind::AdditiveNoise.apply(&img, 1).unwrap();
        let b = TransformKind::AdditiveNoise.apply(&img, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn jitter_stays_in_span() {
        let mut rng = method_rng(0);
        for _ in 0..1000 {
            let f = jitter(&mut rng, 0.02);
            assert!((0.98..=1.02).contains(&f), "factor {f} out of span");
        }
    }

    #[test]
    fn with_method_appends() {
        let catalog = Catalog::new(Vec::new()).with_method(TransformKind::Contrast);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).map(|m| m.name()), Some("contrast"));
        assert!(catalog.get(1).is_none());
    }
}
