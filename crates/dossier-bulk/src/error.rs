//! Error types for the bulk-action lifecycle.
//!
//! Controller calls return `LifecycleResult<T>`; each component has its own
//! error enum that converts into [`LifecycleError`].

use std::time::Duration;

use dossier_core::{ActionKind, EntityType, InvocationError, SelectionError};
use thiserror::Error;

use crate::progress::ActionStatus;

/// A confirmation could not produce an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    /// Every item was excluded.
    #[error("No items included. Please include at least one item.")]
    NothingIncluded,

    /// The previous confirmation is still executing.
    #[error("Action is already processing")]
    Processing,

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Failure classification reported by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The backend refused the operation.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Caller lacks permission for some or all items.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached.
    #[error("Executor unavailable: {0}")]
    Unavailable(String),

    #[error("Executor timeout after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Executor error: {0}")]
    Internal(String),
}

/// An illegal progress state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot {operation} while {from:?}")]
pub struct TransitionError {
    pub from: ActionStatus,
    pub operation: &'static str,
}

/// Undo window failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    /// No window is open (expired, dismissed, or never opened).
    #[error("No undo available")]
    NotAvailable,

    /// An undo is already running for this window.
    #[error("Undo already in progress")]
    InProgress,

    /// The executor failed to revert. The window is closed regardless.
    #[error("Undo failed: {0}")]
    Failed(#[from] EngineError),
}

/// Errors surfaced by [`crate::BulkActionController`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    /// The action is not registered for the entity type.
    #[error("Action '{action}' not available for '{entity_type}'")]
    UnknownAction {
        action: ActionKind,
        entity_type: EntityType,
    },

    /// The action needs a confirmation step and cannot be run directly.
    #[error("Action '{0}' requires confirmation")]
    ConfirmationRequired(ActionKind),

    /// Another invocation is pending or processing.
    #[error("Another bulk action is still processing")]
    Busy,

    /// A previous action's undo is mid-flight and must settle first.
    #[error("Previous action is being undone")]
    UndoInProgress,

    /// The previous action failed and has not been acknowledged.
    #[error("Previous action failed; dismiss it before starting another")]
    AwaitingAcknowledge,
}

/// Result type alias for controller operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
