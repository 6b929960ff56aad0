//! Core types for dossier bulk actions.
//!
//! This crate contains the data structures shared by the bulk-action crates:
//! - Selectable items and entity types
//! - Action definitions, parameters and invocations
//! - The selection tracker
//! - Configuration types
//! - Error types

mod action;
mod config;
mod error;
mod item;
mod selection;

pub use action::{
    ActionInvocation, ActionKind, ActionParams, ActionVariant, BulkActionDefinition,
    EntityStatus, ExecutionReport, ExportFormat, Priority, UndoToken,
};
pub use config::{
    config_dir, config_path, load_config, load_config_from, ttl_seconds, BulkConfig,
    DEFAULT_MAX_SELECTION, DEFAULT_TICK_MS, DEFAULT_UNDO_TTL_MS,
};
pub use error::{ConfigError, InvocationError, SelectionError};
pub use item::{EntityType, ItemId, SelectableItem};
pub use selection::{SelectAllOutcome, SelectAllPolicy, SelectionState, SelectionTracker};
