//! Composition: fold a plan's transforms through a copy of the source.

use image::imageops::FilterType;

use crate::plan::ModificationPlan;
use crate::types::{Dimensions, PipelineError, RgbImage};

/// Apply every step of `plan` to a working copy of `source`, in order.
///
/// The source is never mutated. The candidate always has the source's
/// dimensions: a step that returns a different (non-empty) size is
/// resampled back with Lanczos3 before the next step runs. The result is
/// three-channel RGB by construction.
///
/// # Errors
///
/// Propagates the first step's [`PipelineError`], and returns
/// [`PipelineError::Transform`] if a step produces a zero-area image.
pub fn compose(
    source: &RgbImage,
    plan: &ModificationPlan<'_>,
) -> Result<RgbImage, PipelineError> {
    let target = Dimensions::of(source);
    let mut working = source.clone();

    for step in plan.steps() {
        let next = step.method.apply(&working, step.seed)?;
        let got = Dimensions::of(&next);
        working = if got == target {
            next
        } else if got.is_empty() {
            return Err(PipelineError::Transform {
                method: step.method.name(),
                reason: format!("produced a {}x{} image", got.width, got.height),
            });
        } else {
            tracing::debug!(
                method = step.method.name(),
                width = got.width,
                height = got.height,
                "reconciling transform output size",
            );
            image::imageops::resize(&next, target.width, target.height, FilterType::Lanczos3)
        };
    }

    Ok(working)
}
