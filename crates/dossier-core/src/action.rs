//! Bulk action definitions, parameters and invocations.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::InvocationError;
use crate::item::{EntityType, ItemId};

// =============================================================================
// Action Kind
// =============================================================================

/// Every bulk action the product knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    UpdateStatus,
    Assign,
    Unassign,
    AddTags,
    RemoveTags,
    Export,
    Delete,
    Archive,
    Restore,
    SendReminder,
    Escalate,
    ChangePriority,
}

impl ActionKind {
    /// Wire id, e.g. `"update-status"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::UpdateStatus => "update-status",
            ActionKind::Assign => "assign",
            ActionKind::Unassign => "unassign",
            ActionKind::AddTags => "add-tags",
            ActionKind::RemoveTags => "remove-tags",
            ActionKind::Export => "export",
            ActionKind::Delete => "delete",
            ActionKind::Archive => "archive",
            ActionKind::Restore => "restore",
            ActionKind::SendReminder => "send-reminder",
            ActionKind::Escalate => "escalate",
            ActionKind::ChangePriority => "change-priority",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual hint for the toolbar button. Has no effect on behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVariant {
    #[default]
    Default,
    Secondary,
    Outline,
    Destructive,
}

// =============================================================================
// Action Definition
// =============================================================================

/// A statically registered bulk action for an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionDefinition {
    /// Which action this is.
    pub kind: ActionKind,

    /// Translation key for the button label.
    pub label_key: String,

    /// Icon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default)]
    pub variant: ActionVariant,

    /// Whether the host must show a confirmation before executing.
    #[serde(default)]
    pub requires_confirmation: bool,

    #[serde(default)]
    pub is_destructive: bool,

    #[serde(default)]
    pub supports_undo: bool,
}

impl BulkActionDefinition {
    /// Create a non-destructive definition with no undo and no confirmation.
    pub fn new(kind: ActionKind, label_key: impl Into<String>) -> Self {
        Self {
            kind,
            label_key: label_key.into(),
            icon: None,
            variant: ActionVariant::Default,
            requires_confirmation: false,
            is_destructive: false,
            supports_undo: false,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    pub fn undoable(mut self) -> Self {
        self.supports_undo = true;
        self
    }

    /// Mark as destructive. Destructive actions always require confirmation.
    pub fn destructive(mut self) -> Self {
        self.is_destructive = true;
        self.requires_confirmation = true;
        self.variant = ActionVariant::Destructive;
        self
    }

    /// Whether a successful run opens an undo window.
    pub fn undo_eligible(&self) -> bool {
        self.supports_undo && !self.is_destructive
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Status values offered by the update-status form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Draft,
    Review,
    Approved,
    Rejected,
    Archived,
}

impl EntityStatus {
    pub const ALL: [EntityStatus; 9] = [
        EntityStatus::Pending,
        EntityStatus::InProgress,
        EntityStatus::Completed,
        EntityStatus::Cancelled,
        EntityStatus::Draft,
        EntityStatus::Review,
        EntityStatus::Approved,
        EntityStatus::Rejected,
        EntityStatus::Archived,
    ];
}

/// Priority values offered by the change-priority form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];
}

/// Export file formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Pdf,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Xlsx,
        ExportFormat::Pdf,
        ExportFormat::Json,
    ];
}

/// Action-specific parameters collected by the confirmation form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionParams {
    UpdateStatus {
        status: EntityStatus,
    },
    ChangePriority {
        priority: Priority,
    },
    Export {
        format: ExportFormat,
    },
    Escalate {
        notes: String,
    },
    /// Actions without a parameter form.
    #[default]
    None,
}

impl ActionParams {
    /// Form defaults for an action kind.
    pub fn defaults_for(kind: ActionKind) -> Self {
        match kind {
            ActionKind::UpdateStatus => ActionParams::UpdateStatus {
                status: EntityStatus::default(),
            },
            ActionKind::ChangePriority => ActionParams::ChangePriority {
                priority: Priority::default(),
            },
            ActionKind::Export => ActionParams::Export {
                format: ExportFormat::default(),
            },
            ActionKind::Escalate => ActionParams::Escalate {
                notes: String::new(),
            },
            ActionKind::Assign
            | ActionKind::Unassign
            | ActionKind::AddTags
            | ActionKind::RemoveTags
            | ActionKind::Delete
            | ActionKind::Archive
            | ActionKind::Restore
            | ActionKind::SendReminder => ActionParams::None,
        }
    }

    /// Whether this parameter shape belongs to `kind`.
    pub fn fits(&self, kind: ActionKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&ActionParams::defaults_for(kind))
    }
}

// =============================================================================
// Invocation
// =============================================================================

/// The resolved, immutable unit of work for one bulk action execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionInvocation {
    id: Uuid,
    action: BulkActionDefinition,
    entity_type: EntityType,
    included_ids: Vec<ItemId>,
    params: ActionParams,
}

impl ActionInvocation {
    /// Build an invocation. Fails on an empty item set or mismatched params.
    pub fn new(
        action: BulkActionDefinition,
        entity_type: EntityType,
        included_ids: Vec<ItemId>,
        params: ActionParams,
    ) -> Result<Self, InvocationError> {
        if included_ids.is_empty() {
            return Err(InvocationError::NoItems);
        }
        if !params.fits(action.kind) {
            return Err(InvocationError::ParamsMismatch { action: action.kind });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            action,
            entity_type,
            included_ids,
            params,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn action(&self) -> &BulkActionDefinition {
        &self.action
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn included_ids(&self) -> &[ItemId] {
        &self.included_ids
    }

    pub fn item_count(&self) -> usize {
        self.included_ids.len()
    }

    pub fn params(&self) -> &ActionParams {
        &self.params
    }
}

// =============================================================================
// Execution Report
// =============================================================================

/// Opaque inverse-operation handle produced by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoToken(pub serde_json::Value);

/// What the executor reports back for one invocation.
///
/// `success` is the aggregate verdict. Items in `failed_ids` are left out of
/// the undo record even when the run as a whole succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub success_count: usize,
    pub failed_count: usize,
    #[serde(default)]
    pub failed_ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_token: Option<UndoToken>,
}

impl ExecutionReport {
    /// Every item succeeded.
    pub fn succeeded(count: usize) -> Self {
        Self {
            success: true,
            success_count: count,
            failed_count: 0,
            failed_ids: Vec::new(),
            message: None,
            undo_token: None,
        }
    }

    /// The run failed as a whole.
    pub fn failed(failed_ids: Vec<ItemId>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            success_count: 0,
            failed_count: failed_ids.len(),
            failed_ids,
            message: Some(message.into()),
            undo_token: None,
        }
    }

    pub fn with_undo_token(mut self, token: UndoToken) -> Self {
        self.undo_token = Some(token);
        self
    }

    /// Record per-item failures without changing the aggregate verdict.
    pub fn with_failures(mut self, failed_ids: Vec<ItemId>) -> Self {
        let failed = failed_ids.len();
        self.success_count = self.success_count.saturating_sub(failed);
        self.failed_count += failed;
        self.failed_ids.extend(failed_ids);
        self
    }
}
