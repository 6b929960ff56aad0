//! Error types shared across the dossier crates.

use thiserror::Error;

use crate::action::ActionKind;

/// Selection changes that were refused. State is unchanged when returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Adding the item(s) would go past the selection cap.
    #[error("Maximum selection limit ({max}) reached")]
    LimitReached { max: usize },
}

/// An invocation could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// Nothing left to act on.
    #[error("No items selected")]
    NoItems,

    /// Parameters were collected for a different action.
    #[error("Parameters do not match action '{action}'")]
    ParamsMismatch { action: ActionKind },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("Invalid config value '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Invalid shortcut format.
    #[error("Invalid shortcut: {0}")]
    InvalidShortcut(String),
}
