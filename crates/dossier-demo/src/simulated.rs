//! In-memory executor for the demo.
//!
//! Applies actions to a shared item store in batches of ten, one batch every
//! 50 ms, and hands back the previous item states as the undo token.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dossier_bulk::{BulkExecutor, EngineError, ProgressReporter};
use dossier_core::{
    ActionInvocation, ActionKind, ActionParams, ExecutionReport, ItemId, SelectableItem,
    UndoToken,
};

use crate::render::wire_name;

/// Items processed per batch.
pub const BATCH_SIZE: usize = 10;

/// Pause between batches.
pub const BATCH_DELAY: Duration = Duration::from_millis(50);

type Store = Arc<Mutex<BTreeMap<ItemId, SelectableItem>>>;

pub struct SimulatedExecutor {
    store: Store,
    /// Ids that always fail, to exercise partial failure.
    failing: Arc<Mutex<HashSet<ItemId>>>,
    batch_delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(items: Vec<SelectableItem>) -> Self {
        let store = items
            .into_iter()
            .map(|item| (item.item_id(), item))
            .collect();
        Self {
            store: Arc::new(Mutex::new(store)),
            failing: Arc::new(Mutex::new(HashSet::new())),
            batch_delay: BATCH_DELAY,
        }
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Make every execution fail for `id`.
    pub fn fail_item(&self, id: impl Into<ItemId>) {
        self.failing.lock().insert(id.into());
    }

    pub fn get(&self, id: &ItemId) -> Option<SelectableItem> {
        self.store.lock().get(id).cloned()
    }

    /// Current items in id order.
    pub fn items(&self) -> Vec<SelectableItem> {
        self.store.lock().values().cloned().collect()
    }
}

/// Apply one action to one item. Returns `false` if the item should be removed.
fn apply(item: &mut SelectableItem, kind: ActionKind, params: &ActionParams) -> bool {
    match (kind, params) {
        (ActionKind::UpdateStatus, ActionParams::UpdateStatus { status }) => {
            item.status = Some(wire_name(status));
        }
        (ActionKind::ChangePriority, ActionParams::ChangePriority { priority }) => {
            item.priority = Some(wire_name(priority));
        }
        (ActionKind::Escalate, ActionParams::Escalate { notes }) => {
            item.priority = Some("urgent".to_string());
            if !notes.is_empty() {
                item.fields
                    .insert("escalation_notes".to_string(), notes.clone().into());
            }
        }
        (ActionKind::Assign, _) => item.assignee = Some("me".to_string()),
        (ActionKind::Unassign, _) => item.assignee = None,
        (ActionKind::Archive, _) => item.status = Some("archived".to_string()),
        (ActionKind::Restore, _) => item.status = Some("pending".to_string()),
        (ActionKind::AddTags, _) => {
            item.fields.insert("tagged".to_string(), true.into());
        }
        (ActionKind::RemoveTags, _) => {
            item.fields.remove("tagged");
        }
        (ActionKind::Delete, _) => return false,
        _ => {}
    }
    true
}

impl BulkExecutor for SimulatedExecutor {
    fn execute(
        &self,
        invocation: ActionInvocation,
        reporter: ProgressReporter,
    ) -> BoxFuture<'static, Result<ExecutionReport, EngineError>> {
        let store = self.store.clone();
        let failing = self.failing.lock().clone();
        let delay = self.batch_delay;

        Box::pin(async move {
            let kind = invocation.kind();
            let mut previous: Vec<SelectableItem> = Vec::new();
            let mut failed: Vec<ItemId> = Vec::new();
            let mut processed = 0;

            for batch in invocation.included_ids().chunks(BATCH_SIZE) {
                if reporter.is_cancelled() {
                    break;
                }
                tokio::time::sleep(delay).await;

                {
                    let mut store = store.lock();
                    for id in batch {
                        if failing.contains(id) {
                            failed.push(id.clone());
                            continue;
                        }
                        let Some(item) = store.get_mut(id) else {
                            failed.push(id.clone());
                            continue;
                        };
                        previous.push(item.clone());
                        if !apply(item, kind, invocation.params()) {
                            store.remove(id);
                        }
                    }
                }

                processed += batch.len();
                reporter.report(processed);
            }

            if !failed.is_empty() && failed.len() == invocation.item_count() {
                return Ok(ExecutionReport::failed(
                    failed,
                    format!("No items could be updated for '{}'", kind),
                ));
            }

            let token = serde_json::to_value(&previous)
                .map_err(|e| EngineError::Internal(e.to_string()))?;
            let report = ExecutionReport::succeeded(invocation.item_count())
                .with_failures(failed)
                .with_undo_token(UndoToken(token));
            tracing::debug!(
                "Simulated '{}': {} ok, {} failed",
                kind,
                report.success_count,
                report.failed_count
            );
            Ok(report)
        })
    }

    fn undo(&self, token: UndoToken) -> BoxFuture<'static, Result<(), EngineError>> {
        let store = self.store.clone();
        let delay = self.batch_delay;

        Box::pin(async move {
            let previous: Vec<SelectableItem> = serde_json::from_value(token.0)
                .map_err(|e| EngineError::Rejected(format!("Malformed undo token: {}", e)))?;
            tokio::time::sleep(delay).await;

            let mut store = store.lock();
            for item in previous {
                store.insert(item.item_id(), item);
            }
            Ok(())
        })
    }
}
