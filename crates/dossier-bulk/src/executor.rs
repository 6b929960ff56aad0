//! The executor seam.
//!
//! The lifecycle never mutates entities itself. A host plugs in a
//! `BulkExecutor` that performs the operation and hands back a report plus an
//! optional undo token. The trait returns futures so the caller decides how
//! to drive them, and tests can substitute a mock.

use futures::future::BoxFuture;
use std::sync::Arc;

use dossier_core::{ActionInvocation, ExecutionReport, UndoToken};

use crate::error::EngineError;
use crate::progress::ProgressTracker;

// =============================================================================
// Executor Trait
// =============================================================================

#[cfg_attr(test, mockall::automock)]
pub trait BulkExecutor: Send + Sync {
    /// Run the action over every included item.
    ///
    /// Report processed counts through `reporter` as work advances. Per-item
    /// failures belong in the report's `failed_ids`; return `Err` only when
    /// the run as a whole could not be carried out.
    fn execute(
        &self,
        invocation: ActionInvocation,
        reporter: ProgressReporter,
    ) -> BoxFuture<'static, Result<ExecutionReport, EngineError>>;

    /// Revert a previous execution.
    fn undo(&self, token: UndoToken) -> BoxFuture<'static, Result<(), EngineError>>;
}

// =============================================================================
// Progress Reporter
// =============================================================================

/// Handle the executor uses to report progress.
///
/// Reports after the user cancels are ignored. Executors may poll
/// `is_cancelled()` to stop early; cancellation is cooperative only.
#[derive(Clone)]
pub struct ProgressReporter {
    tracker: Arc<ProgressTracker>,
}

impl ProgressReporter {
    pub fn new(tracker: Arc<ProgressTracker>) -> Self {
        Self { tracker }
    }

    /// Record the number of items processed so far.
    pub fn report(&self, processed: usize) {
        self.tracker.report(processed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.tracker.is_cancelled()
    }
}

// =============================================================================
// Mock Executor for Testing
// =============================================================================
