//! One attempt at producing a version, advanced stage by stage.
//!
//! ```text
//! Planned --compose--> Composed --encode--> Encoded --hash--> HashChecked
//! ```
//!
//! Each stage method consumes `self` and returns the next state (or
//! `Result` for fallible stages), carrying the plan's method names along
//! so the accepted version can report them. The guard decides what to do
//! with a [`HashChecked`] attempt.

use crate::encode::OutputFormat;
use crate::hash::ContentHash;
use crate::plan::ModificationPlan;
use crate::types::{PipelineError, RgbImage};

/// An attempt with its plan chosen but nothing computed yet.
#[must_use = "attempt stages are consumed by advancing; call .compose() to continue"]
pub struct Planned<'c> {
    plan: ModificationPlan<'c>,
}

impl<'c> Planned<'c> {
    /// Start an attempt from a plan.
    pub const fn new(plan: ModificationPlan<'c>) -> Self {
        Self { plan }
    }

    /// Fold the plan through a copy of `source`.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::compose::compose`] errors.
    pub fn compose(self, source: &RgbImage) -> Result<Composed, PipelineError> {
        let candidate = crate::compose::compose(source, &self.plan)?;
        Ok(Composed {
            methods: self.plan.method_names(),
            candidate,
        })
    }
}

/// An attempt whose candidate image exists.
#[must_use = "attempt stages are consumed by advancing; call .encode() to continue"]
pub struct Composed {
    methods: Vec<&'static str>,
    candidate: RgbImage,
}

impl Composed {
    /// The candidate image.
    #[must_use]
    pub const fn candidate(&self) -> &RgbImage {
        &self.candidate
    }

    /// Encode the candidate.
    ///
    /// # Errors
    ///
    /// Propagates [`OutputFormat::encode`] errors.
    pub fn encode(self, format: &OutputFormat, quality: Option<u8>) -> Result<Encoded, PipelineError> {
        let bytes = format.encode(&self.candidate, quality)?;
        Ok(Encoded {
            methods: self.methods,
            bytes,
            quality,
        })
    }
}

/// An attempt whose candidate has been serialized.
#[must_use = "attempt stages are consumed by advancing; call .hash() to continue"]
pub struct Encoded {
    methods: Vec<&'static str>,
    bytes: Vec<u8>,
    quality: Option<u8>,
}

impl Encoded {
    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Compute the content hash of the encoded bytes.
    pub fn hash(self) -> HashChecked {
        HashChecked {
            hash: ContentHash::of(&self.bytes),
            methods: self.methods,
            bytes: self.bytes,
            quality: self.quality,
        }
    }
}

/// A finished candidate awaiting the guard's verdict.
#[derive(Debug, Clone)]
pub struct HashChecked {
    /// Content hash of `bytes`.
    pub hash: ContentHash,
    /// Transform names, in application order.
    pub methods: Vec<&'static str>,
    /// Encoded image.
    pub bytes: Vec<u8>,
    /// JPEG quality used, if any.
    pub quality: Option<u8>,
}

/// Run one attempt through every stage.
///
/// # Errors
///
/// Returns the first composition or encoding error.
pub fn run(
    plan: ModificationPlan<'_>,
    source: &RgbImage,
    format: &OutputFormat,
    quality: Option<u8>,
) -> Result<HashChecked, PipelineError> {
    Ok(Planned::new(plan)
        .compose(source)?
        .encode(format, quality)?
        .hash())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plan::PlanStep;
    use crate::transform::TransformKind;

    #[test]
    fn stages_carry_method_names() {
        let source = RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 90]));
        let saturation = TransformKind::Saturation;
        let noise = TransformKind::AdditiveNoise;
        let plan = ModificationPlan::new(vec![
            PlanStep {
                method: &saturation,
                seed: 1,
            },
            PlanStep {
                method: &noise,
                seed: 101,
            },
        ]);

        let composed = Planned::new(plan).compose(&source).unwrap();
        assert_eq!(composed.candidate().dimensions(), (8, 8));
        let encoded = composed.encode(&OutputFormat::Png, None).unwrap();
        let expected = ContentHash::of(encoded.bytes());
        let checked = encoded.hash();
        assert_eq!(checked.hash, expected);
        assert_eq!(checked.methods, vec!["saturation", "additive_noise"]);
        assert_eq!(checked.quality, None);
    }

    #[test]
    fn run_matches_manual_stages() {
        let source = RgbImage::from_pixel(6, 4, image::Rgb([30, 60, 90]));
        let brightness = TransformKind::Brightness;
        let step = PlanStep {
            method: &brightness,
            seed: 5,
        };
        let a = run(
            ModificationPlan::new(vec![step]),
            &source,
            &OutputFormat::Jpeg,
            Some(97),
        )
        .unwrap();
        let b = Planned::new(ModificationPlan::new(vec![step]))
            .compose(&source)
            .unwrap()
            .encode(&OutputFormat::Jpeg, Some(97))
            .unwrap()
            .hash();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.quality, Some(97));
    }

    #[test]
    fn encode_failure_surfaces() {
        let source = RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]));
        let result = run(
            ModificationPlan::new(Vec::new()),
            &source,
            &OutputFormat::Unsupported("xyz".to_string()),
            None,
        );
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat(_))));
    }
}
