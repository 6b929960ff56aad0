//! Bulk Action Controller
//!
//! Orchestrates the lifecycle for one host list:
//!
//! ```text
//! toggle / range / select all
//!        │
//!        ▼
//! SelectionTracker ──► ActionCatalog (applicable actions)
//!        │
//!        ▼
//! begin_confirmation ──► Confirmation::confirm()
//!        │
//!        ▼
//! execute(invocation)
//!        │   ProgressTracker: pending → processing
//!        ▼
//! BulkExecutor::execute ──► completed | failed | cancelled
//!        │
//!        ▼
//! UndoWindowManager::open (undo-eligible + token)
//!        │
//!        ▼
//! expiry | dismiss | undo | superseded
//! ```
//!
//! No lock is held across an `.await`.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use dossier_core::{
    ActionInvocation, ActionKind, ActionParams, BulkActionDefinition, BulkConfig, ConfigError,
    EntityType, ExecutionReport, ItemId, SelectAllOutcome, SelectableItem, SelectionError,
    SelectionState, SelectionTracker,
};

use crate::catalog::{ActionCatalog, ToolbarActions};
use crate::confirmation::{
    Confirmation, ConfirmationContext, PreviewConfirmation, SimpleConfirmation,
};
use crate::error::{ConfirmationError, LifecycleError, LifecycleResult, UndoError};
use crate::events::{BulkEvent, EventBus};
use crate::executor::{BulkExecutor, ProgressReporter};
use crate::progress::{ActionStatus, ProgressSnapshot, ProgressTracker};
use crate::shortcut::Keystroke;
use crate::undo::{UndoRecord, UndoView, UndoWindowManager};

/// Which confirmation strategy to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfirmationMode {
    #[default]
    Simple,
    /// Per-item exclusion with search.
    Preview,
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed {
        report: ExecutionReport,
        undo_available: bool,
    },
    Failed {
        error: String,
        report: Option<ExecutionReport>,
    },
    /// The user cancelled; whatever the executor returned afterwards was discarded.
    Cancelled { processed: usize },
}

// =============================================================================
// Controller
// =============================================================================

pub struct BulkActionController {
    config: BulkConfig,
    entity_type: EntityType,
    selection: Mutex<SelectionTracker>,
    catalog: Arc<ActionCatalog>,
    progress: Arc<ProgressTracker>,
    undo: UndoWindowManager,
    executor: Arc<dyn BulkExecutor>,
    events: EventBus,
}

impl BulkActionController {
    /// Create a controller for one list of `entity_type` items.
    pub fn new(
        config: BulkConfig,
        entity_type: EntityType,
        catalog: Arc<ActionCatalog>,
        executor: Arc<dyn BulkExecutor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventBus::new();
        let undo = UndoWindowManager::new(&config, events.clone())?;

        Ok(Self {
            selection: Mutex::new(SelectionTracker::new(
                config.max_selection,
                config.select_all_policy,
            )),
            config,
            entity_type,
            catalog,
            progress: Arc::new(ProgressTracker::new()),
            undo,
            executor,
            events,
        })
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BulkEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Report the ids the host currently shows, in display order.
    pub fn set_visible(&self, ids: Vec<ItemId>) {
        self.selection.lock().set_visible(ids);
    }

    pub fn toggle(&self, id: impl Into<ItemId>) -> LifecycleResult<bool> {
        let id = id.into();
        self.update_selection(|tracker| tracker.toggle(id))
    }

    /// Select from `anchor` to `target` in visible order.
    pub fn select_range(&self, anchor: &ItemId, target: &ItemId) -> LifecycleResult<usize> {
        self.update_selection(|tracker| {
            let visible = tracker.visible().to_vec();
            tracker.select_range(anchor, target, &visible)
        })
    }

    /// Shift-click on `target`.
    pub fn shift_select(&self, target: impl Into<ItemId>) -> LifecycleResult<usize> {
        let target = target.into();
        self.update_selection(|tracker| {
            let visible = tracker.visible().to_vec();
            tracker.shift_select(target, &visible)
        })
    }

    /// Select every visible item, subject to the select-all policy.
    pub fn select_all(&self) -> LifecycleResult<SelectAllOutcome> {
        self.update_selection(|tracker| {
            let visible = tracker.visible().to_vec();
            tracker.select_all(visible)
        })
    }

    pub fn clear_selection(&self) {
        let state = {
            let mut tracker = self.selection.lock();
            tracker.clear();
            tracker.state()
        };
        self.publish_selection(&state);
    }

    pub fn selection(&self) -> SelectionState {
        self.selection.lock().state()
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selection.lock().is_selected(id)
    }

    /// The selected items among `items`, in the order given.
    pub fn selected_items(&self, items: &[SelectableItem]) -> Vec<SelectableItem> {
        let tracker = self.selection.lock();
        items
            .iter()
            .filter(|item| tracker.is_selected(&item.item_id()))
            .cloned()
            .collect()
    }

    fn update_selection<T, F>(&self, f: F) -> LifecycleResult<T>
    where
        F: FnOnce(&mut SelectionTracker) -> Result<T, SelectionError>,
    {
        let (result, state) = {
            let mut tracker = self.selection.lock();
            let result = f(&mut *tracker);
            (result, tracker.state())
        };

        match result {
            Ok(value) => {
                self.publish_selection(&state);
                Ok(value)
            }
            Err(SelectionError::LimitReached { max }) => {
                self.events.publish(BulkEvent::SelectionLimitReached {
                    entity_type: self.entity_type,
                    max,
                });
                Err(SelectionError::LimitReached { max }.into())
            }
        }
    }

    fn publish_selection(&self, state: &SelectionState) {
        self.events.publish(BulkEvent::SelectionChanged {
            entity_type: self.entity_type,
            selected_count: state.selected_count,
            max_reached: state.max_reached,
        });
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Actions for the current selection. Empty when nothing is selected.
    pub fn available_actions(&self) -> Vec<BulkActionDefinition> {
        self.catalog.applicable(self.entity_type, &self.selection())
    }

    /// Inline buttons plus overflow menu for the current selection.
    pub fn toolbar_actions(&self) -> ToolbarActions {
        if self.selection().is_empty() {
            return ToolbarActions {
                inline: Vec::new(),
                overflow: Vec::new(),
            };
        }
        self.catalog
            .toolbar(self.entity_type, self.config.inline_actions)
    }

    pub fn definition(&self, kind: ActionKind) -> LifecycleResult<BulkActionDefinition> {
        self.catalog
            .find(self.entity_type, kind)
            .ok_or(LifecycleError::UnknownAction {
                action: kind,
                entity_type: self.entity_type,
            })
    }

    /// Open a confirmation for the selected items among `items`.
    ///
    /// `items` is the host's list in display order; the confirmation keeps
    /// that order.
    pub fn begin_confirmation(
        &self,
        kind: ActionKind,
        items: &[SelectableItem],
        mode: ConfirmationMode,
    ) -> LifecycleResult<Box<dyn Confirmation>> {
        let definition = self.definition(kind)?;
        let selected = self.selected_items(items);
        if selected.is_empty() {
            return Err(ConfirmationError::NothingIncluded.into());
        }

        let context =
            ConfirmationContext::new(definition, self.entity_type, self.config.undo_ttl_ms);
        tracing::debug!(
            "Confirming '{}' for {} items ({:?})",
            kind,
            selected.len(),
            mode
        );

        Ok(match mode {
            ConfirmationMode::Simple => {
                let ids = selected.iter().map(SelectableItem::item_id).collect();
                Box::new(SimpleConfirmation::new(context, ids))
            }
            ConfirmationMode::Preview => Box::new(PreviewConfirmation::new(context, selected)),
        })
    }

    /// Run an action that needs no confirmation on the whole selection.
    pub async fn execute_selected(&self, kind: ActionKind) -> LifecycleResult<ExecutionOutcome> {
        let definition = self.definition(kind)?;
        if definition.requires_confirmation {
            return Err(LifecycleError::ConfirmationRequired(kind));
        }

        let ids = {
            let tracker = self.selection.lock();
            tracker.selected_in_order(tracker.visible())
        };
        let invocation = ActionInvocation::new(
            definition,
            self.entity_type,
            ids,
            ActionParams::defaults_for(kind),
        )
        .map_err(ConfirmationError::from)?;

        self.execute(invocation).await
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute a confirmed invocation.
    ///
    /// Executor failures are reported as [`ExecutionOutcome::Failed`], not as
    /// errors. Errors mean the invocation never started.
    ///
    /// A previous completed or cancelled action is acknowledged implicitly; a
    /// failed one must be acknowledged first.
    pub async fn execute(&self, invocation: ActionInvocation) -> LifecycleResult<ExecutionOutcome> {
        if self.progress.is_busy() {
            return Err(LifecycleError::Busy);
        }
        // A failure stays on screen until the user dismisses it
        if self.progress.status() == ActionStatus::Failed {
            return Err(LifecycleError::AwaitingAcknowledge);
        }

        // A newer action closes the previous undo window for good
        self.undo.supersede().map_err(|e| match e {
            UndoError::InProgress => LifecycleError::UndoInProgress,
            other => other.into(),
        })?;

        if self.progress.status().is_terminal() {
            self.progress.acknowledge()?;
        }
        self.progress
            .begin(
                invocation.kind(),
                invocation.entity_type(),
                invocation.item_count(),
            )
            .map_err(|_| LifecycleError::Busy)?;

        let entity_type = invocation.entity_type();
        let action = invocation.kind();
        let count = invocation.item_count();

        tracing::info!("Executing '{}' on {} {} items", action, count, entity_type);
        self.events.publish(BulkEvent::ActionInvoked {
            entity_type,
            action,
            count,
            invocation_id: invocation.id(),
        });

        self.progress.start_processing()?;
        let reporter = ProgressReporter::new(self.progress.clone());
        let result = self.executor.execute(invocation.clone(), reporter).await;

        if self.progress.is_cancelled() {
            let processed = self.progress.snapshot().processed_count;
            tracing::info!(
                "'{}' cancelled after {} of {} items",
                action,
                processed,
                count
            );
            if let Ok(report) = &result {
                tracing::debug!("Discarding late report: {} succeeded", report.success_count);
            }
            self.events.publish(BulkEvent::ActionCancelled {
                entity_type,
                action,
                count,
                processed,
            });
            return Ok(ExecutionOutcome::Cancelled { processed });
        }

        match result {
            Ok(report) if report.success => self.finish_success(&invocation, report),
            Ok(report) => {
                let error = report
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} of {} items failed", report.failed_count, count));
                self.finish_failure(&invocation, error, Some(report))
            }
            Err(e) => self.finish_failure(&invocation, e.to_string(), None),
        }
    }

    fn finish_success(
        &self,
        invocation: &ActionInvocation,
        report: ExecutionReport,
    ) -> LifecycleResult<ExecutionOutcome> {
        self.progress.complete(report.clone())?;
        tracing::info!(
            "'{}' completed: {} succeeded, {} failed",
            invocation.kind(),
            report.success_count,
            report.failed_count
        );
        self.events.publish(BulkEvent::ActionCompleted {
            entity_type: invocation.entity_type(),
            action: invocation.kind(),
            count: invocation.item_count(),
            success_count: report.success_count,
            failed_count: report.failed_count,
        });

        self.clear_selection();

        let undo_available =
            match UndoRecord::from_execution(invocation, &report, self.config.undo_ttl()) {
                Some(record) => {
                    self.undo.open(record)?;
                    true
                }
                None => false,
            };

        Ok(ExecutionOutcome::Completed {
            report,
            undo_available,
        })
    }

    fn finish_failure(
        &self,
        invocation: &ActionInvocation,
        error: String,
        report: Option<ExecutionReport>,
    ) -> LifecycleResult<ExecutionOutcome> {
        tracing::warn!("'{}' failed: {}", invocation.kind(), error);
        self.progress.fail(error.clone(), report.clone())?;
        self.events.publish(BulkEvent::ActionFailed {
            entity_type: invocation.entity_type(),
            action: invocation.kind(),
            count: invocation.item_count(),
            error: error.clone(),
        });
        Ok(ExecutionOutcome::Failed { error, report })
    }

    /// Request cooperative cancellation of the running action.
    pub fn cancel(&self) -> LifecycleResult<()> {
        self.progress.cancel()?;
        Ok(())
    }

    /// Return a finished action's progress to idle.
    pub fn acknowledge(&self) -> LifecycleResult<()> {
        self.progress.acknowledge()?;
        Ok(())
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    // =========================================================================
    // Undo
    // =========================================================================

    pub async fn undo(&self) -> LifecycleResult<UndoRecord> {
        Ok(self.undo.undo(self.executor.as_ref()).await?)
    }

    pub fn dismiss_undo(&self) -> bool {
        self.undo.dismiss()
    }

    pub fn undo_view(&self) -> Option<UndoView> {
        self.undo.view()
    }

    pub fn pointer_enter(&self) {
        self.undo.pointer_enter();
    }

    pub fn pointer_leave(&self) {
        self.undo.pointer_leave();
    }

    /// Handle a key press. Returns the undo result when the shortcut fired.
    pub async fn key_down(
        &self,
        keystroke: &Keystroke,
        repeat: bool,
    ) -> Option<LifecycleResult<UndoRecord>> {
        if !self.undo.key_down(keystroke, repeat) {
            return None;
        }
        Some(self.undo().await)
    }

    pub fn key_up(&self, keystroke: &Keystroke) {
        self.undo.key_up(keystroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::executor::mock::MockExecutor;
    use crate::undo::FinalizeReason;
    use std::time::Duration;
    use tokio::time;

    fn items(n: usize) -> Vec<SelectableItem> {
        (1..=n)
            .map(|i| SelectableItem::new(i.to_string()).with_name(format!("Deliverable {}", i)))
            .collect()
    }

    fn controller_with(
        config: BulkConfig,
        executor: Arc<MockExecutor>,
    ) -> Arc<BulkActionController> {
        let controller = BulkActionController::new(
            config,
            EntityType::Deliverable,
            Arc::new(ActionCatalog::with_defaults()),
            executor,
        )
        .unwrap();
        Arc::new(controller)
    }

    fn controller(executor: Arc<MockExecutor>) -> Arc<BulkActionController> {
        let config = BulkConfig {
            undo_ttl_ms: 5_000,
            ..BulkConfig::default()
        };
        controller_with(config, executor)
    }

    fn show(controller: &BulkActionController, items: &[SelectableItem]) {
        controller.set_visible(items.iter().map(SelectableItem::item_id).collect());
    }

    fn drain(rx: &mut broadcast::Receiver<BulkEvent>) -> Vec<BulkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn confirm_and_run(
        controller: &BulkActionController,
        kind: ActionKind,
        list: &[SelectableItem],
    ) -> ExecutionOutcome {
        let mut flow = controller
            .begin_confirmation(kind, list, ConfirmationMode::Simple)
            .unwrap();
        let invocation = flow.confirm().unwrap();
        let outcome = controller.execute(invocation).await.unwrap();
        flow.settle();
        outcome
    }

    #[tokio::test]
    async fn test_selection_events_and_limit() {
        let config = BulkConfig {
            max_selection: 2,
            ..BulkConfig::default()
        };
        let controller = controller_with(config, Arc::new(MockExecutor::new()));
        let list = items(3);
        show(&controller, &list);
        let mut rx = controller.subscribe_events();

        controller.toggle("1").unwrap();
        controller.toggle("2").unwrap();
        let err = controller.toggle("3").unwrap_err();
        assert_eq!(err, LifecycleError::Selection(SelectionError::LimitReached { max: 2 }));
        assert!(!controller.is_selected(&"3".into()));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[1],
            BulkEvent::SelectionChanged {
                selected_count: 2,
                max_reached: true,
                ..
            }
        ));
        assert!(matches!(
            events[2],
            BulkEvent::SelectionLimitReached { max: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_shift_select_range() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(5);
        show(&controller, &list);

        controller.toggle("2").unwrap();
        assert_eq!(controller.shift_select("4").unwrap(), 2);
        let selected: Vec<String> = controller
            .selected_items(&list)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(selected, vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_select_range_publishes_events() {
        let config = BulkConfig {
            max_selection: 3,
            ..BulkConfig::default()
        };
        let controller = controller_with(config, Arc::new(MockExecutor::new()));
        let list = items(5);
        show(&controller, &list);
        let mut rx = controller.subscribe_events();

        assert_eq!(controller.select_range(&"1".into(), &"3".into()).unwrap(), 3);
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![BulkEvent::SelectionChanged {
                entity_type: EntityType::Deliverable,
                selected_count: 3,
                max_reached: true,
            }]
        );

        let err = controller
            .select_range(&"4".into(), &"5".into())
            .unwrap_err();
        assert_eq!(err, LifecycleError::Selection(SelectionError::LimitReached { max: 3 }));
        assert_eq!(
            drain(&mut rx),
            vec![BulkEvent::SelectionLimitReached {
                entity_type: EntityType::Deliverable,
                max: 3,
            }]
        );
        assert_eq!(controller.selection().selected_count, 3);
        assert!(!controller.is_selected(&"4".into()));
    }

    #[tokio::test]
    async fn test_toolbar_empty_without_selection() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(3);
        show(&controller, &list);

        assert!(controller.available_actions().is_empty());
        assert!(controller.toolbar_actions().inline.is_empty());

        controller.select_all().unwrap();
        let toolbar = controller.toolbar_actions();
        assert_eq!(toolbar.inline.len(), 3);
        assert!(!toolbar.overflow.is_empty());
    }

    #[tokio::test]
    async fn test_begin_confirmation_requires_selection() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(3);

        let err = controller
            .begin_confirmation(ActionKind::Archive, &list, ConfirmationMode::Simple)
            .err()
            .unwrap();
        assert_eq!(
            err,
            LifecycleError::Confirmation(ConfirmationError::NothingIncluded)
        );

        let err = controller
            .begin_confirmation(ActionKind::Restore, &list, ConfirmationMode::Simple)
            .err()
            .unwrap();
        assert!(matches!(err, LifecycleError::UnknownAction { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_execute_and_undo() {
        let executor = Arc::new(MockExecutor::new());
        let controller = controller(executor.clone());
        let list = items(5);
        show(&controller, &list);
        controller.select_all().unwrap();
        let mut rx = controller.subscribe_events();

        let mut flow = controller
            .begin_confirmation(ActionKind::Archive, &list, ConfirmationMode::Preview)
            .unwrap();
        assert_eq!(flow.included_count(), 5);
        let invocation = flow.confirm().unwrap();
        assert_eq!(invocation.item_count(), 5);

        let outcome = controller.execute(invocation).await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Completed {
                undo_available: true,
                ..
            }
        ));
        assert_eq!(controller.progress().status, ActionStatus::Completed);
        assert_eq!(controller.progress().progress, 100);
        assert!(controller.selection().is_empty());

        let view = controller.undo_view().unwrap();
        assert_eq!(view.seconds_remaining, 5);

        let record = controller.undo().await.unwrap();
        assert_eq!(record.item_ids.len(), 5);
        assert_eq!(executor.undo_count(), 1);
        assert!(controller.undo_view().is_none());

        let names: Vec<&str> = drain(&mut rx).iter().map(|e| e.event_name()).collect();
        assert_eq!(
            names,
            vec![
                "bulk:action-invoked",
                "bulk:action-completed",
                "bulk:selection-changed",
                "bulk:undo-invoked",
                "bulk:undo-completed",
                "bulk:undo-finalized",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_window_expires() {
        let executor = Arc::new(MockExecutor::new());
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        confirm_and_run(&controller, ActionKind::UpdateStatus, &list).await;
        assert!(controller.undo_view().is_some());

        time::sleep(Duration::from_millis(5_050)).await;
        assert!(controller.undo_view().is_none());
        assert_eq!(
            controller.undo().await.unwrap_err(),
            LifecycleError::Undo(UndoError::NotAvailable)
        );
        assert_eq!(executor.undo_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destructive_action_has_no_undo() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        let outcome = confirm_and_run(&controller, ActionKind::Delete, &list).await;
        assert!(matches!(
            outcome,
            ExecutionOutcome::Completed {
                undo_available: false,
                ..
            }
        ));
        assert!(controller.undo_view().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_execute_supersedes_open_window() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(3);
        show(&controller, &list);
        let mut rx = controller.subscribe_events();

        controller.select_all().unwrap();
        confirm_and_run(&controller, ActionKind::Archive, &list).await;

        controller.select_all().unwrap();
        confirm_and_run(&controller, ActionKind::ChangePriority, &list).await;

        let reasons: Vec<FinalizeReason> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                BulkEvent::UndoFinalized { reason, .. } => Some(reason),
                _ => None,
            })
            .collect();
        assert_eq!(reasons, vec![FinalizeReason::Superseded]);
        assert_eq!(
            controller.undo_view().unwrap().record.action,
            ActionKind::ChangePriority
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_rejected_while_undoing() {
        let executor = Arc::new(MockExecutor::new());
        let release = executor.gate_undo();
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);

        controller.select_all().unwrap();
        confirm_and_run(&controller, ActionKind::Archive, &list).await;

        let undo_task = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.undo().await })
        };
        time::sleep(Duration::from_millis(10)).await;

        controller.select_all().unwrap();
        let mut flow = controller
            .begin_confirmation(ActionKind::Archive, &list, ConfirmationMode::Simple)
            .unwrap();
        let invocation = flow.confirm().unwrap();
        assert_eq!(
            controller.execute(invocation).await.unwrap_err(),
            LifecycleError::UndoInProgress
        );

        release.send(()).unwrap();
        assert!(undo_task.await.unwrap().is_ok());
        assert_eq!(executor.execution_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_while_processing() {
        let executor = Arc::new(MockExecutor::new());
        let release = executor.gate_execute();
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        let run = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.execute_selected(ActionKind::Export).await })
        };
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(controller.progress().status, ActionStatus::Processing);

        assert_eq!(
            controller.execute_selected(ActionKind::Export).await.unwrap_err(),
            LifecycleError::Busy
        );

        release.send(()).unwrap();
        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));
        assert_eq!(executor.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_execute_selected_requires_no_confirmation() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        assert_eq!(
            controller
                .execute_selected(ActionKind::Archive)
                .await
                .unwrap_err(),
            LifecycleError::ConfirmationRequired(ActionKind::Archive)
        );
    }

    #[tokio::test]
    async fn test_execute_selected_with_empty_selection() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let err = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Confirmation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_processing() {
        let executor = Arc::new(MockExecutor::new().with_step_delay(Duration::from_millis(50)));
        let controller = controller(executor);
        let list = items(10);
        show(&controller, &list);
        controller.select_all().unwrap();
        let mut rx = controller.subscribe_events();

        let run = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.execute_selected(ActionKind::Export).await })
        };
        time::sleep(Duration::from_millis(175)).await;
        controller.cancel().unwrap();

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(outcome, ExecutionOutcome::Cancelled { processed: 3 });
        assert_eq!(controller.progress().status, ActionStatus::Cancelled);
        assert!(controller.undo_view().is_none());
        assert!(drain(&mut rx)
            .iter()
            .any(|e| e.event_name() == "bulk:action-cancelled"));

        controller.acknowledge().unwrap();
        assert_eq!(controller.progress().status, ActionStatus::Idle);
    }

    #[tokio::test]
    async fn test_executor_failure_is_reported() {
        let executor = Arc::new(
            MockExecutor::new().with_outcome(Err(EngineError::Rejected("locked".to_string()))),
        );
        let controller = controller(executor);
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        let outcome = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));

        let snap = controller.progress();
        assert_eq!(snap.status, ActionStatus::Failed);
        assert_eq!(snap.error.as_deref(), Some("Rejected: locked"));
        // Selection is kept so the user can retry
        assert_eq!(controller.selection().selected_count, 2);
    }

    #[tokio::test]
    async fn test_failure_must_be_acknowledged_before_next_execute() {
        let executor = Arc::new(
            MockExecutor::new().with_outcome(Err(EngineError::Rejected("locked".to_string()))),
        );
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();

        let outcome = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));

        let err = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::AwaitingAcknowledge);
        assert_eq!(executor.execution_count(), 1);
        assert_eq!(controller.progress().status, ActionStatus::Failed);
        assert_eq!(controller.progress().error.as_deref(), Some("Rejected: locked"));

        controller.acknowledge().unwrap();
        let outcome = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Failed { .. }));
        assert_eq!(executor.execution_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_action_is_acknowledged_by_next_execute() {
        let executor = Arc::new(MockExecutor::new());
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);

        controller.select_all().unwrap();
        controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap();
        assert_eq!(controller.progress().status, ActionStatus::Completed);

        controller.select_all().unwrap();
        let outcome = controller
            .execute_selected(ActionKind::Export)
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Completed { .. }));
        assert_eq!(executor.execution_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_excluded_from_undo() {
        let report = ExecutionReport::succeeded(3)
            .with_failures(vec![ItemId::from("2")])
            .with_undo_token(dossier_core::UndoToken(serde_json::json!("batch-7")));
        let executor = Arc::new(MockExecutor::new().with_outcome(Ok(report)));
        let controller = controller(executor);
        let list = items(3);
        show(&controller, &list);
        controller.select_all().unwrap();

        confirm_and_run(&controller, ActionKind::AddTags, &list).await;
        let record = controller.undo_view().unwrap().record;
        assert_eq!(record.item_ids, vec![ItemId::from("1"), ItemId::from("3")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyboard_undo() {
        let executor = Arc::new(MockExecutor::new());
        let controller = controller(executor.clone());
        let list = items(2);
        show(&controller, &list);
        controller.select_all().unwrap();
        confirm_and_run(&controller, ActionKind::Archive, &list).await;

        let key = Keystroke::new("z").cmd();
        assert!(controller.key_down(&key, true).await.is_none());
        let result = controller.key_down(&key, false).await.unwrap();
        assert!(result.is_ok());
        assert_eq!(executor.undo_count(), 1);

        // Window is gone; the shortcut does nothing now
        controller.key_up(&key);
        assert!(controller.key_down(&key, false).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_undo() {
        let controller = controller(Arc::new(MockExecutor::new()));
        let list = items(1);
        show(&controller, &list);
        controller.select_all().unwrap();
        confirm_and_run(&controller, ActionKind::Archive, &list).await;

        controller.pointer_enter();
        time::sleep(Duration::from_millis(10_000)).await;
        assert!(controller.undo_view().unwrap().paused);
        controller.pointer_leave();

        assert!(controller.dismiss_undo());
        assert!(controller.undo_view().is_none());
        assert!(!controller.dismiss_undo());
    }
}
