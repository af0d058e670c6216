//! Playlist reconciliation: a read-only planner that diffs a source and a destination into a
//! [`Changelog`], and an applier that replays a changelog against the destination.

pub mod apply;
pub mod changelog;
pub mod diff;
pub mod error;
pub mod persist;
pub mod plan;
pub mod reporter;

use tokio_util::sync::CancellationToken;

pub use apply::{ApplySummary, ChangelogApplier};
pub use changelog::{Changelog, PlaylistRef, PlaylistTarget, TrackChangelog};
pub use error::SyncError;
pub use plan::SyncPlanner;
pub use reporter::{NoopReporter, SyncReporter, TracingReporter};

static NOOP_REPORTER: NoopReporter = NoopReporter;

/// Reporter and cancellation shared by every step of a plan or apply run.
#[derive(Clone)]
pub struct SyncContext<'a> {
    pub reporter: &'a dyn SyncReporter,
    pub cancel: CancellationToken,
}

impl Default for SyncContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SyncContext<'a> {
    pub fn new() -> Self {
        Self {
            reporter: &NOOP_REPORTER,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn SyncReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checked before every connector call.
    pub(crate) fn ensure_active(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }
}
