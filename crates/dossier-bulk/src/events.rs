//! Lifecycle events.
//!
//! Uses an enum-based event bus with `tokio::sync::broadcast`. Hosts
//! subscribe for telemetry or toasts; nothing in the lifecycle waits on a
//! subscriber.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use dossier_core::{ActionKind, EntityType};

use crate::undo::FinalizeReason;

/// Everything the bulk-action lifecycle announces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkEvent {
    SelectionChanged {
        entity_type: EntityType,
        selected_count: usize,
        max_reached: bool,
    },
    SelectionLimitReached {
        entity_type: EntityType,
        max: usize,
    },
    ActionInvoked {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        invocation_id: Uuid,
    },
    ActionCompleted {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        success_count: usize,
        failed_count: usize,
    },
    ActionFailed {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        error: String,
    },
    ActionCancelled {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        processed: usize,
    },
    UndoInvoked {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
    },
    UndoCompleted {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
    },
    UndoFailed {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        error: String,
    },
    UndoFinalized {
        entity_type: EntityType,
        action: ActionKind,
        count: usize,
        reason: FinalizeReason,
    },
}

impl BulkEvent {
    /// Stable event name for host telemetry.
    pub fn event_name(&self) -> &'static str {
        match self {
            BulkEvent::SelectionChanged { .. } => "bulk:selection-changed",
            BulkEvent::SelectionLimitReached { .. } => "bulk:selection-limit-reached",
            BulkEvent::ActionInvoked { .. } => "bulk:action-invoked",
            BulkEvent::ActionCompleted { .. } => "bulk:action-completed",
            BulkEvent::ActionFailed { .. } => "bulk:action-failed",
            BulkEvent::ActionCancelled { .. } => "bulk:action-cancelled",
            BulkEvent::UndoInvoked { .. } => "bulk:undo-invoked",
            BulkEvent::UndoCompleted { .. } => "bulk:undo-completed",
            BulkEvent::UndoFailed { .. } => "bulk:undo-failed",
            BulkEvent::UndoFinalized { .. } => "bulk:undo-finalized",
        }
    }
}

/// Simple event bus using tokio broadcast channels.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BulkEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BulkEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers. Dropped if nobody listens.
    pub fn publish(&self, event: BulkEvent) {
        tracing::debug!("Event {}", event.event_name());
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
