//! Observable progress state machine.
//!
//! Every transition broadcasts the new snapshot. Callers cannot move the
//! state without notifying subscribers.
//!
//! ```text
//! idle -> pending -> processing -> completed | failed | cancelled
//!   ^                                         |
//!   +---------------- acknowledge ------------+
//! ```

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use dossier_core::{ActionKind, EntityType, ExecutionReport};

use crate::error::TransitionError;

// =============================================================================
// Status & Snapshot
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
        )
    }

    /// Pending or processing.
    pub fn is_busy(&self) -> bool {
        matches!(self, ActionStatus::Pending | ActionStatus::Processing)
    }
}

/// Point-in-time view of an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub status: ActionStatus,
    pub action: Option<ActionKind>,
    pub entity_type: Option<EntityType>,
    /// Percent complete, 0..=100.
    pub progress: u8,
    pub processed_count: usize,
    pub total_count: usize,
    pub last_report: Option<ExecutionReport>,
    pub error: Option<String>,
}

fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

// =============================================================================
// ProgressTracker
// =============================================================================

/// Progress state for the one in-flight invocation.
///
/// Uses `parking_lot::RwLock` for the state and `tokio::sync::watch` for
/// broadcasts. The lock is released before sending.
pub struct ProgressTracker {
    inner: RwLock<ProgressSnapshot>,
    tx: watch::Sender<ProgressSnapshot>,
    rx: watch::Receiver<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(ProgressSnapshot::default());
        Self {
            inner: RwLock::new(ProgressSnapshot::default()),
            tx,
            rx,
        }
    }

    // =========================================================================
    // Transitions (all broadcast automatically)
    // =========================================================================

    /// `idle -> pending` for a new invocation of `total` items.
    pub fn begin(
        &self,
        action: ActionKind,
        entity_type: EntityType,
        total: usize,
    ) -> Result<(), TransitionError> {
        self.transition("begin", |state| {
            if state.status != ActionStatus::Idle {
                return false;
            }
            *state = ProgressSnapshot {
                status: ActionStatus::Pending,
                action: Some(action),
                entity_type: Some(entity_type),
                total_count: total,
                ..ProgressSnapshot::default()
            };
            true
        })
    }

    /// `pending -> processing`.
    pub fn start_processing(&self) -> Result<(), TransitionError> {
        self.transition("start processing", |state| {
            if state.status != ActionStatus::Pending {
                return false;
            }
            state.status = ActionStatus::Processing;
            true
        })
    }

    /// Record processed items. Clamped to the total; never moves backwards.
    ///
    /// Ignored outside `processing`. Returns whether the snapshot changed.
    pub fn report(&self, processed: usize) -> bool {
        let snapshot = {
            let mut state = self.inner.write();
            if state.status != ActionStatus::Processing {
                return false;
            }
            let processed = processed.min(state.total_count);
            if processed <= state.processed_count {
                return false;
            }
            state.processed_count = processed;
            state.progress = state
                .progress
                .max(percent(processed, state.total_count));
            state.clone()
        };
        let _ = self.tx.send(snapshot);
        true
    }

    /// `processing -> completed`. Progress jumps to 100.
    pub fn complete(&self, report: ExecutionReport) -> Result<(), TransitionError> {
        self.transition("complete", |state| {
            if state.status != ActionStatus::Processing {
                return false;
            }
            state.status = ActionStatus::Completed;
            state.progress = 100;
            state.processed_count = state.total_count;
            state.last_report = Some(report);
            true
        })
    }

    /// `pending | processing -> failed`.
    pub fn fail(
        &self,
        error: impl Into<String>,
        report: Option<ExecutionReport>,
    ) -> Result<(), TransitionError> {
        let error = error.into();
        self.transition("fail", |state| {
            if !state.status.is_busy() {
                return false;
            }
            state.status = ActionStatus::Failed;
            state.error = Some(error);
            state.last_report = report;
            true
        })
    }

    /// `processing -> cancelled`. Cooperative: the executor may still finish.
    pub fn cancel(&self) -> Result<(), TransitionError> {
        self.transition("cancel", |state| {
            if state.status != ActionStatus::Processing {
                return false;
            }
            state.status = ActionStatus::Cancelled;
            true
        })
    }

    /// Any terminal status back to `idle`.
    pub fn acknowledge(&self) -> Result<(), TransitionError> {
        self.transition("acknowledge", |state| {
            if !state.status.is_terminal() {
                return false;
            }
            *state = ProgressSnapshot::default();
            true
        })
    }

    fn transition<F>(&self, operation: &'static str, f: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&mut ProgressSnapshot) -> bool,
    {
        let snapshot = {
            let mut state = self.inner.write();
            let from = state.status;
            if !f(&mut *state) {
                tracing::debug!("Rejected '{}' while {:?}", operation, from);
                return Err(TransitionError { from, operation });
            }
            tracing::debug!("Progress {:?} -> {:?}", from, state.status);
            state.clone()
        };
        let _ = self.tx.send(snapshot);
        Ok(())
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.read().clone()
    }

    pub fn status(&self) -> ActionStatus {
        self.inner.read().status
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == ActionStatus::Cancelled
    }

    /// Subscribe to snapshots. Clone the receiver for each subscriber.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.rx.clone()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processing(total: usize) -> ProgressTracker {
        let tracker = ProgressTracker::new();
        tracker
            .begin(ActionKind::Archive, EntityType::Task, total)
            .unwrap();
        tracker.start_processing().unwrap();
        tracker
    }

    #[test]
    fn test_happy_path() {
        let tracker = processing(4);
        assert_eq!(tracker.status(), ActionStatus::Processing);

        assert!(tracker.report(1));
        assert_eq!(tracker.snapshot().progress, 25);

        tracker.complete(ExecutionReport::succeeded(4)).unwrap();
        let snap = tracker.snapshot();
        assert_eq!(snap.status, ActionStatus::Completed);
        assert_eq!(snap.progress, 100);
        assert_eq!(snap.processed_count, 4);
        assert_eq!(snap.last_report.map(|r| r.success_count), Some(4));

        tracker.acknowledge().unwrap();
        assert_eq!(tracker.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn test_report_clamps_and_is_monotonic() {
        let tracker = processing(3);

        assert!(tracker.report(2));
        assert_eq!(tracker.snapshot().progress, 67);

        assert!(!tracker.report(1));
        assert_eq!(tracker.snapshot().processed_count, 2);

        assert!(tracker.report(10));
        let snap = tracker.snapshot();
        assert_eq!(snap.processed_count, 3);
        assert_eq!(snap.progress, 100);
    }

    #[test]
    fn test_report_ignored_outside_processing() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.report(1));

        tracker
            .begin(ActionKind::Export, EntityType::Contact, 2)
            .unwrap();
        assert!(!tracker.report(1));
        assert_eq!(tracker.snapshot().processed_count, 0);
    }

    #[test]
    fn test_invalid_transitions() {
        let tracker = ProgressTracker::new();

        let err = tracker.cancel().unwrap_err();
        assert_eq!(err.from, ActionStatus::Idle);
        assert!(tracker.acknowledge().is_err());
        assert!(tracker.complete(ExecutionReport::succeeded(0)).is_err());

        tracker
            .begin(ActionKind::Delete, EntityType::Document, 1)
            .unwrap();
        assert!(tracker
            .begin(ActionKind::Delete, EntityType::Document, 1)
            .is_err());
        // Cancel is only legal once processing
        assert!(tracker.cancel().is_err());
    }

    #[test]
    fn test_cancel_then_acknowledge() {
        let tracker = processing(10);
        tracker.report(3);
        tracker.cancel().unwrap();
        assert!(tracker.is_cancelled());
        assert!(!tracker.report(5));

        tracker.acknowledge().unwrap();
        assert_eq!(tracker.status(), ActionStatus::Idle);
    }

    #[test]
    fn test_fail_keeps_error() {
        let tracker = processing(2);
        tracker
            .fail("backend unavailable", Some(ExecutionReport::failed(vec![], "x")))
            .unwrap();

        let snap = tracker.snapshot();
        assert_eq!(snap.status, ActionStatus::Failed);
        assert_eq!(snap.error.as_deref(), Some("backend unavailable"));
        assert!(snap.last_report.is_some());
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_subscribers_see_every_transition() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        assert!(!rx.has_changed().unwrap());

        tracker
            .begin(ActionKind::AddTags, EntityType::Engagement, 5)
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, ActionStatus::Pending);

        // Rejected transitions do not broadcast
        let _ = tracker.acknowledge();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_zero_total() {
        let tracker = processing(0);
        assert!(!tracker.report(1));
        assert_eq!(tracker.snapshot().progress, 0);

        tracker.complete(ExecutionReport::succeeded(0)).unwrap();
        assert_eq!(tracker.snapshot().progress, 100);
    }
}
