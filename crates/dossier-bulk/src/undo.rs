//! Time-boxed undo.
//!
//! After an undo-eligible action completes, one window opens for a fixed
//! TTL. It closes exactly once, for exactly one [`FinalizeReason`]. Whoever
//! takes the active window out of the manager's slot owns finalization, so
//! expiry, dismissal, supersession and undo cannot both finalize.
//!
//! ## Pausing
//!
//! The countdown holds while the pointer is over the toast or while an undo
//! is running. The two sources are independent.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use dossier_core::{
    ActionInvocation, ActionKind, BulkConfig, ConfigError, EntityType, ExecutionReport, ItemId,
    UndoToken,
};

use crate::countdown::Countdown;
use crate::error::UndoError;
use crate::events::{BulkEvent, EventBus};
use crate::executor::BulkExecutor;
use crate::shortcut::{Keystroke, Shortcut, ShortcutLatch};

// =============================================================================
// Window State
// =============================================================================

/// What a single countdown tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ticked,
    /// Paused; nothing consumed.
    Paused,
    /// Reached zero on this tick. Returned once.
    Expired,
    /// Already closed.
    Closed,
}

/// Pure countdown state for one undo window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoWindow {
    ttl: Duration,
    remaining: Duration,
    hover_paused: bool,
    undoing: bool,
    closed: bool,
}

impl UndoWindow {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            remaining: ttl,
            hover_paused: false,
            undoing: false,
            closed: false,
        }
    }

    /// Consume one quantum unless paused or closed.
    pub fn tick(&mut self, quantum: Duration) -> TickOutcome {
        if self.closed {
            return TickOutcome::Closed;
        }
        if self.is_paused() {
            return TickOutcome::Paused;
        }
        self.remaining = self.remaining.saturating_sub(quantum);
        if self.remaining.is_zero() {
            self.closed = true;
            return TickOutcome::Expired;
        }
        TickOutcome::Ticked
    }

    pub fn set_hover_paused(&mut self, paused: bool) {
        self.hover_paused = paused;
    }

    /// Mark an undo as running. Pauses the countdown.
    pub fn begin_undo(&mut self) -> Result<(), UndoError> {
        if self.closed {
            return Err(UndoError::NotAvailable);
        }
        if self.undoing {
            return Err(UndoError::InProgress);
        }
        self.undoing = true;
        Ok(())
    }

    /// The undo settled, either way. The window is closed.
    pub fn finish_undo(&mut self) {
        self.undoing = false;
        self.closed = true;
    }

    /// Close without undo. Returns `false` if already closed.
    pub fn close(&mut self) -> bool {
        !std::mem::replace(&mut self.closed, true)
    }

    pub fn is_paused(&self) -> bool {
        self.hover_paused || self.undoing
    }

    pub fn is_undoing(&self) -> bool {
        self.undoing
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Whole seconds left, rounded up.
    pub fn seconds_remaining(&self) -> u64 {
        self.remaining.as_millis().div_ceil(1000) as u64
    }

    /// Remaining time as a percentage of the TTL.
    pub fn progress_percent(&self) -> u8 {
        if self.ttl.is_zero() {
            return 0;
        }
        let pct = self.remaining.as_secs_f64() / self.ttl.as_secs_f64() * 100.0;
        pct.round().clamp(0.0, 100.0) as u8
    }
}

// =============================================================================
// Record & Reasons
// =============================================================================

/// What can be reverted while the window is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndoRecord {
    pub token: UndoToken,
    pub action: ActionKind,
    pub entity_type: EntityType,
    /// Items actually changed: the invocation minus reported failures.
    pub item_ids: Vec<ItemId>,
    pub opened_at: SystemTime,
    pub ttl: Duration,
}

impl UndoRecord {
    /// Build a record for a finished execution.
    ///
    /// `None` when the action is not undo-eligible, the run failed, or the
    /// executor returned no token.
    pub fn from_execution(
        invocation: &ActionInvocation,
        report: &ExecutionReport,
        ttl: Duration,
    ) -> Option<Self> {
        if !invocation.action().undo_eligible() || !report.success {
            return None;
        }
        let token = report.undo_token.clone()?;
        let item_ids = invocation
            .included_ids()
            .iter()
            .filter(|id| !report.failed_ids.contains(*id))
            .cloned()
            .collect();

        Some(Self {
            token,
            action: invocation.kind(),
            entity_type: invocation.entity_type(),
            item_ids,
            opened_at: SystemTime::now(),
            ttl,
        })
    }
}

/// Why an undo window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    Expired,
    Dismissed,
    /// A newer action replaced it.
    Superseded,
    Undone,
    UndoFailed,
}

/// Render-ready view of the open window.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoView {
    pub record: UndoRecord,
    pub remaining: Duration,
    pub seconds_remaining: u64,
    pub progress_percent: u8,
    pub paused: bool,
    pub undoing: bool,
}

// =============================================================================
// Manager
// =============================================================================

struct ActiveWindow {
    id: u64,
    record: UndoRecord,
    window: Arc<Mutex<UndoWindow>>,
    countdown: Countdown,
}

/// Holds at most one open undo window.
///
/// Lock order is slot, then window. The countdown task only takes the
/// window lock, and releases it before touching the slot.
pub struct UndoWindowManager {
    quantum: Duration,
    slot: Arc<Mutex<Option<ActiveWindow>>>,
    latch: Mutex<ShortcutLatch>,
    events: EventBus,
    next_id: AtomicU64,
}

impl UndoWindowManager {
    pub fn new(config: &BulkConfig, events: EventBus) -> Result<Self, ConfigError> {
        let shortcut = Shortcut::parse(&config.undo_shortcut)?;
        Ok(Self {
            quantum: config.tick(),
            slot: Arc::new(Mutex::new(None)),
            latch: Mutex::new(ShortcutLatch::new(shortcut)),
            events,
            next_id: AtomicU64::new(1),
        })
    }

    /// Open a window for `record`, superseding any idle open window.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, record: UndoRecord) -> Result<(), UndoError> {
        self.supersede()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let window = Arc::new(Mutex::new(UndoWindow::new(record.ttl)));
        let countdown = Countdown::start(
            window.clone(),
            self.quantum,
            expire_callback(Arc::downgrade(&self.slot), self.events.clone(), id),
        );

        tracing::info!(
            "Undo available for '{}' on {} items ({:?})",
            record.action,
            record.item_ids.len(),
            record.ttl
        );
        *self.slot.lock() = Some(ActiveWindow {
            id,
            record,
            window,
            countdown,
        });
        Ok(())
    }

    /// Finalize the open window as superseded.
    ///
    /// Returns `Ok(false)` when nothing was open. Refused while it is undoing.
    pub fn supersede(&self) -> Result<bool, UndoError> {
        let taken = {
            let mut slot = self.slot.lock();
            let undoing = match slot.as_ref() {
                None => return Ok(false),
                Some(active) => active.window.lock().is_undoing(),
            };
            if undoing {
                return Err(UndoError::InProgress);
            }
            slot.take()
        };
        Ok(self.finalize(taken, FinalizeReason::Superseded).is_some())
    }

    /// Close without undoing. Ignored while an undo is running.
    pub fn dismiss(&self) -> bool {
        let taken = {
            let mut slot = self.slot.lock();
            let undoing = slot
                .as_ref()
                .is_some_and(|active| active.window.lock().is_undoing());
            if undoing {
                None
            } else {
                slot.take()
            }
        };
        self.finalize(taken, FinalizeReason::Dismissed).is_some()
    }

    /// Revert the open window's action through `executor`.
    ///
    /// The window closes whether or not the executor succeeds.
    pub async fn undo(&self, executor: &dyn BulkExecutor) -> Result<UndoRecord, UndoError> {
        let (id, record) = {
            let slot = self.slot.lock();
            let active = slot.as_ref().ok_or(UndoError::NotAvailable)?;
            active.window.lock().begin_undo()?;
            (active.id, active.record.clone())
        };

        tracing::info!("Undoing '{}' on {} items", record.action, record.item_ids.len());
        self.events.publish(BulkEvent::UndoInvoked {
            entity_type: record.entity_type,
            action: record.action,
            count: record.item_ids.len(),
        });

        let result = executor.undo(record.token.clone()).await;

        let taken = {
            let mut slot = self.slot.lock();
            if slot.as_ref().map(|active| active.id) == Some(id) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(active) = &taken {
            active.window.lock().finish_undo();
        }

        match result {
            Ok(()) => {
                self.events.publish(BulkEvent::UndoCompleted {
                    entity_type: record.entity_type,
                    action: record.action,
                    count: record.item_ids.len(),
                });
                self.finalize(taken, FinalizeReason::Undone);
                Ok(record)
            }
            Err(e) => {
                tracing::warn!("Undo of '{}' failed: {}", record.action, e);
                self.events.publish(BulkEvent::UndoFailed {
                    entity_type: record.entity_type,
                    action: record.action,
                    count: record.item_ids.len(),
                    error: e.to_string(),
                });
                self.finalize(taken, FinalizeReason::UndoFailed);
                Err(UndoError::Failed(e))
            }
        }
    }

    // =========================================================================
    // Pointer & Keyboard
    // =========================================================================

    pub fn pointer_enter(&self) {
        if let Some(active) = self.slot.lock().as_ref() {
            active.countdown.pause();
        }
    }

    pub fn pointer_leave(&self) {
        if let Some(active) = self.slot.lock().as_ref() {
            active.countdown.resume();
        }
    }

    /// Returns `true` when this key press should trigger an undo.
    pub fn key_down(&self, keystroke: &Keystroke, repeat: bool) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.latch.lock().press(keystroke, repeat)
    }

    pub fn key_up(&self, keystroke: &Keystroke) {
        self.latch.lock().release(keystroke);
    }

    // =========================================================================
    // Read Methods
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn is_undoing(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|active| active.window.lock().is_undoing())
    }

    /// Open and not already undoing.
    pub fn can_undo(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|active| {
            let window = active.window.lock();
            !window.is_closed() && !window.is_undoing()
        })
    }

    pub fn view(&self) -> Option<UndoView> {
        let slot = self.slot.lock();
        let active = slot.as_ref()?;
        let window = active.window.lock();
        Some(UndoView {
            record: active.record.clone(),
            remaining: window.remaining(),
            seconds_remaining: window.seconds_remaining(),
            progress_percent: window.progress_percent(),
            paused: window.is_paused(),
            undoing: window.is_undoing(),
        })
    }

    fn finalize(&self, taken: Option<ActiveWindow>, reason: FinalizeReason) -> Option<UndoRecord> {
        let active = taken?;
        active.window.lock().close();
        active.countdown.cancel();
        publish_finalized(&self.events, &active.record, reason);
        Some(active.record)
    }
}

fn expire_callback(
    slot: Weak<Mutex<Option<ActiveWindow>>>,
    events: EventBus,
    id: u64,
) -> impl FnOnce() + Send + 'static {
    move || {
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let taken = {
            let mut slot = slot.lock();
            if slot.as_ref().map(|active| active.id) == Some(id) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(active) = taken {
            publish_finalized(&events, &active.record, FinalizeReason::Expired);
        }
    }
}

fn publish_finalized(events: &EventBus, record: &UndoRecord, reason: FinalizeReason) {
    tracing::debug!("Undo window for '{}' finalized: {:?}", record.action, reason);
    events.publish(BulkEvent::UndoFinalized {
        entity_type: record.entity_type,
        action: record.action,
        count: record.item_ids.len(),
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::executor::mock::{token_for, MockExecutor};
    use dossier_core::{ActionParams, BulkActionDefinition};
    use tokio::sync::broadcast;
    use tokio::time;

    fn config(ttl_ms: u64) -> BulkConfig {
        BulkConfig {
            undo_ttl_ms: ttl_ms,
            ..BulkConfig::default()
        }
    }

    fn record(ttl_ms: u64) -> UndoRecord {
        let ids = vec![ItemId::from("1"), ItemId::from("2")];
        UndoRecord {
            token: token_for(&ids),
            action: ActionKind::Archive,
            entity_type: EntityType::Dossier,
            item_ids: ids,
            opened_at: SystemTime::now(),
            ttl: Duration::from_millis(ttl_ms),
        }
    }

    fn manager(ttl_ms: u64) -> (Arc<UndoWindowManager>, broadcast::Receiver<BulkEvent>) {
        let events = EventBus::new();
        let rx = events.subscribe();
        let manager = UndoWindowManager::new(&config(ttl_ms), events).unwrap();
        (Arc::new(manager), rx)
    }

    fn finalized(rx: &mut broadcast::Receiver<BulkEvent>) -> Vec<FinalizeReason> {
        let mut reasons = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BulkEvent::UndoFinalized { reason, .. } = event {
                reasons.push(reason);
            }
        }
        reasons
    }

    // =========================================================================
    // Window State
    // =========================================================================

    #[test]
    fn test_window_expires_after_fifty_ticks() {
        let mut window = UndoWindow::new(Duration::from_millis(5_000));
        let quantum = Duration::from_millis(100);

        for _ in 0..49 {
            assert_eq!(window.tick(quantum), TickOutcome::Ticked);
        }
        assert_eq!(window.seconds_remaining(), 1);
        assert_eq!(window.tick(quantum), TickOutcome::Expired);
        assert_eq!(window.tick(quantum), TickOutcome::Closed);
        assert_eq!(window.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_window_pause_sources_are_independent() {
        let mut window = UndoWindow::new(Duration::from_millis(1_000));
        let quantum = Duration::from_millis(100);

        window.set_hover_paused(true);
        window.begin_undo().unwrap();
        window.set_hover_paused(false);
        assert!(window.is_paused());
        assert_eq!(window.tick(quantum), TickOutcome::Paused);
        assert_eq!(window.remaining(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_window_view_helpers() {
        let mut window = UndoWindow::new(Duration::from_millis(30_000));
        assert_eq!(window.seconds_remaining(), 30);
        assert_eq!(window.progress_percent(), 100);

        window.tick(Duration::from_millis(100));
        assert_eq!(window.seconds_remaining(), 30);
        assert_eq!(window.progress_percent(), 100);

        window.tick(Duration::from_millis(14_900));
        assert_eq!(window.seconds_remaining(), 15);
        assert_eq!(window.progress_percent(), 50);
    }

    #[test]
    fn test_begin_undo_guards() {
        let mut window = UndoWindow::new(Duration::from_millis(1_000));
        window.begin_undo().unwrap();
        assert_eq!(window.begin_undo(), Err(UndoError::InProgress));

        window.finish_undo();
        assert!(window.is_closed());
        assert_eq!(window.begin_undo(), Err(UndoError::NotAvailable));
        assert!(!window.close());
    }

    #[test]
    fn test_record_drops_failed_items() {
        let ids: Vec<ItemId> = ["1", "2", "3"].iter().map(|s| ItemId::from(*s)).collect();
        let invocation = ActionInvocation::new(
            BulkActionDefinition::new(ActionKind::AddTags, "actions.addTags").undoable(),
            EntityType::Contact,
            ids.clone(),
            ActionParams::None,
        )
        .unwrap();
        let report = ExecutionReport::succeeded(3)
            .with_failures(vec![ItemId::from("2")])
            .with_undo_token(token_for(&ids));

        let record =
            UndoRecord::from_execution(&invocation, &report, Duration::from_secs(30)).unwrap();
        assert_eq!(record.item_ids, vec![ItemId::from("1"), ItemId::from("3")]);
        assert_eq!(record.entity_type, EntityType::Contact);

        let no_token = ExecutionReport::succeeded(3);
        assert!(UndoRecord::from_execution(&invocation, &no_token, Duration::from_secs(30))
            .is_none());
    }

    #[test]
    fn test_record_requires_eligible_action() {
        let ids = vec![ItemId::from("1")];
        let invocation = ActionInvocation::new(
            BulkActionDefinition::new(ActionKind::Delete, "actions.delete")
                .undoable()
                .destructive(),
            EntityType::Task,
            ids.clone(),
            ActionParams::None,
        )
        .unwrap();
        let report = ExecutionReport::succeeded(1).with_undo_token(token_for(&ids));

        assert!(UndoRecord::from_execution(&invocation, &report, Duration::from_secs(30))
            .is_none());
    }

    // =========================================================================
    // Manager
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expiry_finalizes_once() {
        let (manager, mut rx) = manager(5_000);
        manager.open(record(5_000)).unwrap();
        assert!(manager.is_open());

        time::sleep(Duration::from_millis(4_950)).await;
        assert!(manager.is_open());
        assert_eq!(manager.view().unwrap().seconds_remaining, 1);

        time::sleep(Duration::from_millis(100)).await;
        assert!(!manager.is_open());
        assert!(!manager.dismiss());

        time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(finalized(&mut rx), vec![FinalizeReason::Expired]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_freezes_countdown() {
        let (manager, mut rx) = manager(5_000);
        let executor = Arc::new(MockExecutor::new());
        let release = executor.gate_undo();
        manager.open(record(5_000)).unwrap();

        time::sleep(Duration::from_millis(2_050)).await;
        let task = {
            let manager = manager.clone();
            let executor = executor.clone();
            tokio::spawn(async move { manager.undo(executor.as_ref()).await })
        };
        time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_undoing());
        assert!(!manager.can_undo());

        time::sleep(Duration::from_millis(10_000)).await;
        let view = manager.view().unwrap();
        assert_eq!(view.remaining, Duration::from_millis(3_000));
        assert!(view.paused);

        // A second undo is refused while the first runs
        assert_eq!(
            manager.undo(executor.as_ref()).await.unwrap_err(),
            UndoError::InProgress
        );

        release.send(()).unwrap();
        let undone = task.await.unwrap().unwrap();
        assert_eq!(undone.item_ids.len(), 2);
        assert!(!manager.is_open());
        assert_eq!(executor.undo_count(), 1);
        assert_eq!(finalized(&mut rx), vec![FinalizeReason::Undone]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_failure_closes_window() {
        let (manager, mut rx) = manager(5_000);
        let executor = MockExecutor::new()
            .with_undo_outcome(Err(EngineError::Unavailable("offline".to_string())));
        manager.open(record(5_000)).unwrap();

        let err = manager.undo(&executor).await.unwrap_err();
        assert!(matches!(err, UndoError::Failed(EngineError::Unavailable(_))));
        assert!(!manager.is_open());
        assert_eq!(finalized(&mut rx), vec![FinalizeReason::UndoFailed]);

        assert_eq!(
            manager.undo(&executor).await.unwrap_err(),
            UndoError::NotAvailable
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_then_expiry_is_silent() {
        let (manager, mut rx) = manager(1_000);
        manager.open(record(1_000)).unwrap();

        time::sleep(Duration::from_millis(500)).await;
        assert!(manager.dismiss());
        assert!(!manager.dismiss());

        time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(finalized(&mut rx), vec![FinalizeReason::Dismissed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_supersedes_previous() {
        let (manager, mut rx) = manager(5_000);
        manager.open(record(5_000)).unwrap();
        time::sleep(Duration::from_millis(1_000)).await;

        let mut second = record(5_000);
        second.action = ActionKind::UpdateStatus;
        manager.open(second).unwrap();
        assert_eq!(finalized(&mut rx), vec![FinalizeReason::Superseded]);

        // The first window's countdown must not expire the second
        time::sleep(Duration::from_millis(4_500)).await;
        let view = manager.view().unwrap();
        assert_eq!(view.record.action, ActionKind::UpdateStatus);
        assert!(finalized(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_refused_while_undoing() {
        let (manager, _rx) = manager(5_000);
        let executor = Arc::new(MockExecutor::new());
        let release = executor.gate_undo();
        manager.open(record(5_000)).unwrap();

        let task = {
            let manager = manager.clone();
            let executor = executor.clone();
            tokio::spawn(async move { manager.undo(executor.as_ref()).await })
        };
        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(manager.open(record(5_000)), Err(UndoError::InProgress));
        assert!(!manager.dismiss());

        release.send(()).unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_pauses_countdown() {
        let (manager, _rx) = manager(1_000);
        manager.open(record(1_000)).unwrap();

        time::sleep(Duration::from_millis(450)).await;
        manager.pointer_enter();
        time::sleep(Duration::from_millis(5_000)).await;
        assert!(manager.is_open());
        assert_eq!(manager.view().unwrap().remaining, Duration::from_millis(600));

        manager.pointer_leave();
        time::sleep(Duration::from_millis(600)).await;
        assert!(!manager.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shortcut_only_while_open() {
        let (manager, _rx) = manager(5_000);
        let key = Keystroke::new("z").ctrl();
        assert!(!manager.key_down(&key, false));

        manager.open(record(5_000)).unwrap();
        assert!(manager.key_down(&key, false));
        assert!(!manager.key_down(&key, true));
        assert!(!manager.key_down(&key, false));

        manager.key_up(&Keystroke::new("z"));
        assert!(manager.key_down(&key, false));
        assert!(!manager.key_down(&Keystroke::new("z").ctrl().shift(), false));
    }
}
