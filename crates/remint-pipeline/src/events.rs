//! Progress events for callers that narrate a run.
//!
//! The core never prints. Front ends (CLI, web handler, GUI thread)
//! subscribe by passing a [`GenerationObserver`] to
//! [`Generator::run_with_observer`](crate::Generator::run_with_observer);
//! any `FnMut(&GenerationEvent)` closure qualifies.

use serde::Serialize;

use crate::hash::ContentHash;

/// Something that happened while generating one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// An attempt produced a hash that was already claimed.
    AttemptCollided {
        /// 1-based version index.
        index: usize,
        /// 1-based attempt number within the version.
        attempt: u32,
        /// The colliding hash.
        hash: ContentHash,
    },
    /// An attempt failed to compose or encode.
    AttemptFailed {
        /// 1-based version index.
        index: usize,
        /// 1-based attempt number within the version.
        attempt: u32,
        /// Display text of the error.
        reason: String,
    },
    /// A version was accepted with a verified-unique hash.
    VersionAccepted {
        /// 1-based version index.
        index: usize,
        /// The claimed hash.
        hash: ContentHash,
        /// Encoded size in bytes.
        size: usize,
        /// Attempts spent.
        attempts: u32,
    },
    /// A version was accepted after exhausting its budget without a
    /// unique hash.
    VersionDegraded {
        /// 1-based version index.
        index: usize,
        /// The duplicate hash.
        hash: ContentHash,
        /// Encoded size in bytes.
        size: usize,
        /// Attempts spent.
        attempts: u32,
    },
    /// A version was skipped.
    VersionFailed {
        /// 1-based version index.
        index: usize,
        /// Attempts spent.
        attempts: u32,
        /// Display text of the last error.
        reason: String,
    },
}

impl GenerationEvent {
    /// The 1-based version index the event belongs to.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::AttemptCollided { index, .. }
            | Self::AttemptFailed { index, .. }
            | Self::VersionAccepted { index, .. }
            | Self::VersionDegraded { index, .. }
            | Self::VersionFailed { index, .. } => *index,
        }
    }

    /// Whether the event concludes its version.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::VersionAccepted { .. } | Self::VersionDegraded { .. } | Self::VersionFailed { .. }
        )
    }
}

/// Receiver of [`GenerationEvent`]s.
pub trait GenerationObserver {
    /// Called synchronously, in order, as the run progresses.
    fn on_event(&mut self, event: &GenerationEvent);
}

impl<F: FnMut(&GenerationEvent)> GenerationObserver for F {
    fn on_event(&mut self, event: &GenerationEvent) {
        self(event);
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {
    fn on_event(&mut self, _event: &GenerationEvent) {}
}
