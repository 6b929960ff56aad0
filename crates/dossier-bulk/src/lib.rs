//! Bulk-action lifecycle for dossier lists.
//!
//! This crate sequences selection, confirmation, execution and undo:
//! - Action catalog per entity type
//! - Simple and preview confirmation flows
//! - Observable progress state machine
//! - Timed undo window with hover pause and keyboard shortcut
//! - Lifecycle events for host telemetry
//!
//! The mutation itself is delegated to a host-supplied [`BulkExecutor`].

pub mod catalog;
pub mod confirmation;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod events;
pub mod executor;
pub mod progress;
pub mod shortcut;
pub mod undo;

// Re-export commonly used types
pub use catalog::{default_actions, ActionCatalog, ToolbarActions};
pub use confirmation::{
    Confirmation, ConfirmationContext, EmptyView, FormField, Notice, ParamsForm,
    PreviewConfirmation, SimpleConfirmation,
};
pub use controller::{BulkActionController, ConfirmationMode, ExecutionOutcome};
pub use countdown::Countdown;
pub use error::{
    ConfirmationError, EngineError, LifecycleError, LifecycleResult, TransitionError, UndoError,
};
pub use events::{BulkEvent, EventBus};
pub use executor::{BulkExecutor, ProgressReporter};
pub use progress::{ActionStatus, ProgressSnapshot, ProgressTracker};
pub use shortcut::{Keystroke, Shortcut, ShortcutLatch};
pub use undo::{FinalizeReason, TickOutcome, UndoRecord, UndoView, UndoWindow, UndoWindowManager};

// Re-export dossier_core types for convenience
pub use dossier_core::{
    ActionInvocation, ActionKind, ActionParams, BulkActionDefinition, BulkConfig, EntityType,
    ExecutionReport, ItemId, SelectableItem, SelectionState, UndoToken,
};
