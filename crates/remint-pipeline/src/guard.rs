//! Uniqueness guard: the retry and escalation state machine that turns
//! attempts into accepted versions.
//!
//! For each version the guard runs attempts until one produces a hash no
//! earlier output (and not the source) has claimed:
//!
//! - an attempt whose hash is already claimed is a **collision**: the next
//!   attempt draws a new base seed and escalates to the larger plan size;
//! - an attempt whose composition or encoding fails is a **failure**: the
//!   next attempt draws a new base seed at the current level;
//! - collisions and failures share one budget of
//!   [`GenerationConfig::max_attempts`].
//!
//! On exhaustion, the last collided candidate is accepted and flagged
//! degraded when [`GenerationConfig::accept_degraded`] allows it.
//! Otherwise the version is recorded as a [`VersionFailure`].

use crate::attempt::{self, HashChecked};
use crate::encode::OutputFormat;
use crate::events::{GenerationEvent, GenerationObserver};
use crate::hash::{HashRegistry, md5_hex};
use crate::plan::{DiversityLevel, PlanSelector};
use crate::types::{GeneratedVersion, GenerationConfig, PipelineError, RgbImage, VersionFailure};

/// What became of one requested version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOutcome {
    /// The version was produced, verified or degraded.
    Accepted(GeneratedVersion),
    /// The version was skipped.
    Failed(VersionFailure),
}

/// Owns the run's hash registry and decides each attempt's fate.
#[derive(Debug)]
pub struct UniquenessGuard<'g> {
    registry: HashRegistry,
    config: &'g GenerationConfig,
}

impl<'g> UniquenessGuard<'g> {
    /// Create a guard over a registry already seeded with the source hash.
    #[must_use]
    pub const fn new(registry: HashRegistry, config: &'g GenerationConfig) -> Self {
        Self { registry, config }
    }

    /// The registry as it stands.
    #[must_use]
    pub const fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    /// Give up the registry once the run is over.
    #[must_use]
    pub fn into_registry(self) -> HashRegistry {
        self.registry
    }

    /// Produce version `index` (1-based) from `source`.
    ///
    /// Never returns an error: every per-attempt error is absorbed into
    /// the retry loop and, if the budget runs out, into the returned
    /// [`VersionOutcome::Failed`].
    #[tracing::instrument(skip_all, fields(index = index))]
    pub fn produce<O: GenerationObserver + ?Sized>(
        &mut self,
        index: usize,
        source: &RgbImage,
        format: &OutputFormat,
        selector: &mut PlanSelector<'_>,
        observer: &mut O,
    ) -> VersionOutcome {
        let config = self.config;
        let mut level = DiversityLevel::Base;
        let mut base_seed = selector.next_base_seed();
        let mut last_candidate: Option<HashChecked> = None;
        let mut last_error: Option<PipelineError> = None;

        for retry in 0..config.max_attempts {
            let attempt = retry + 1;
            let plan = selector.select(base_seed, level.method_range(config), retry);
            let quality = format.quality(
                config.jpeg_quality_base,
                index.saturating_sub(1),
                retry,
            );
            tracing::trace!(attempt, ?level, methods = ?plan.method_names(), ?quality, "attempt");

            match attempt::run(plan, source, format, quality) {
                Ok(checked) => {
                    if self.registry.claim(checked.hash) {
                        observer.on_event(&GenerationEvent::VersionAccepted {
                            index,
                            hash: checked.hash,
                            size: checked.bytes.len(),
                            attempts: attempt,
                        });
                        tracing::debug!(attempt, hash = %checked.hash, "version accepted");
                        return VersionOutcome::Accepted(version(index, checked, attempt, false));
                    }
                    tracing::debug!(attempt, hash = %checked.hash, "hash collision, escalating");
                    observer.on_event(&GenerationEvent::AttemptCollided {
                        index,
                        attempt,
                        hash: checked.hash,
                    });
                    level = DiversityLevel::Escalated;
                    last_candidate = Some(checked);
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "attempt failed");
                    observer.on_event(&GenerationEvent::AttemptFailed {
                        index,
                        attempt,
                        reason: err.to_string(),
                    });
                    last_error = Some(err);
                }
            }
            base_seed = selector.next_base_seed();
        }

        self.exhausted(index, last_candidate, last_error, observer)
    }

    fn exhausted<O: GenerationObserver + ?Sized>(
        &mut self,
        index: usize,
        last_candidate: Option<HashChecked>,
        last_error: Option<PipelineError>,
        observer: &mut O,
    ) -> VersionOutcome {
        let attempts = self.config.max_attempts;

        if self.config.accept_degraded
            && let Some(candidate) = last_candidate
        {
            // A candidate whose hash is (somehow) free by now is simply
            // verified; only a hash that is actually claimed is degraded.
            let degraded = !self.registry.claim(candidate.hash);
            let event = if degraded {
                tracing::warn!(
                    index,
                    attempts,
                    hash = %candidate.hash,
                    "attempt budget exhausted, accepting duplicate hash",
                );
                GenerationEvent::VersionDegraded {
                    index,
                    hash: candidate.hash,
                    size: candidate.bytes.len(),
                    attempts,
                }
            } else {
                GenerationEvent::VersionAccepted {
                    index,
                    hash: candidate.hash,
                    size: candidate.bytes.len(),
                    attempts,
                }
            };
            observer.on_event(&event);
            return VersionOutcome::Accepted(version(index, candidate, attempts, degraded));
        }

        let reason = last_error.map_or_else(
            || format!("no unique content hash within {attempts} attempts"),
            |err| err.to_string(),
        );
        tracing::warn!(index, attempts, %reason, "version skipped");
        observer.on_event(&GenerationEvent::VersionFailed {
            index,
            attempts,
            reason: reason.clone(),
        });
        VersionOutcome::Failed(VersionFailure {
            index,
            attempts,
            reason,
        })
    }
}

fn version(index: usize, checked: HashChecked, attempts: u32, degraded: bool) -> GeneratedVersion {
    GeneratedVersion {
        index,
        size: checked.bytes.len(),
        md5: md5_hex(&checked.bytes),
        bytes: checked.bytes,
        hash: checked.hash,
        degraded,
        attempts,
        quality: checked.quality,
        methods: checked.methods,
    }
}
