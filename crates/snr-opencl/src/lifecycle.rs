//! Session lifecycle: failure classification and the rebuild flag.
//!
//! The controller owns the needs-rebuild flag as a two-state machine
//! instead of a free boolean toggled from catch sites. A recoverable
//! failure flags the session; the driver rebuilds it once before the next
//! compile, so a contiguous run of failures triggers at most one rebuild
//! per subsequent attempt.

use tracing::warn;

use crate::error::SnrError;

/// What the sweep should do with a failed configuration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fatal device error or compile rejection: end the run now.
    Abort,
    /// Transient device error: drop this configuration's partial result,
    /// rebuild the session, and move on to the next configuration.
    DiscardAndRebuild,
}

/// Classify a device-level failure.
///
/// The reserved fatal codes and compile rejections abort; any other
/// device error during measurement is transient. Non-device errors reach
/// this point only through driver bugs and abort conservatively.
pub fn classify(err: &SnrError) -> Disposition {
    match err {
        SnrError::Device { .. } if err.is_fatal_device() => Disposition::Abort,
        SnrError::Device { .. } => Disposition::DiscardAndRebuild,
        _ => Disposition::Abort,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    NeedsRebuild,
    Ready,
}

/// Owns the session state across configuration attempts.
///
/// Starts in `NeedsRebuild` so the first configuration builds the session
/// lazily; flagging is idempotent.
#[derive(Debug)]
pub struct LifecycleController {
    state: SessionState,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleController {
    pub fn new() -> Self {
        Self {
            state: SessionState::NeedsRebuild,
        }
    }

    /// True when the session must be rebuilt before the next compile.
    pub fn needs_rebuild(&self) -> bool {
        self.state == SessionState::NeedsRebuild
    }

    /// Call after a successful rebuild.
    pub fn mark_ready(&mut self) {
        self.state = SessionState::Ready;
    }

    /// Record a failed attempt and decide how the sweep proceeds. Flags
    /// the session for rebuild when the failure is recoverable.
    pub fn on_failure(&mut self, err: &SnrError) -> Disposition {
        let disposition = classify(err);
        if disposition == Disposition::DiscardAndRebuild {
            warn!(error = %err, "discarding configuration, session flagged for rebuild");
            self.state = SessionState::NeedsRebuild;
        }
        disposition
    }
}
