//! Action Catalog
//!
//! Maps each entity type to its ordered bulk actions. The host registers
//! definitions once at startup; the toolbar and confirmation dialogs read
//! them.

use parking_lot::RwLock;
use std::collections::HashMap;

use dossier_core::{ActionKind, BulkActionDefinition, EntityType, SelectionState};

/// Registry of bulk actions keyed by entity type.
pub struct ActionCatalog {
    actions: RwLock<HashMap<EntityType, Vec<BulkActionDefinition>>>,
}

/// Toolbar layout: the first few actions inline, the rest in an overflow menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarActions {
    pub inline: Vec<BulkActionDefinition>,
    pub overflow: Vec<BulkActionDefinition>,
}

impl ActionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a catalog with the standard action set for every entity type.
    pub fn with_defaults() -> Self {
        let catalog = Self::new();
        for entity_type in [
            EntityType::Dossier,
            EntityType::Engagement,
            EntityType::Deliverable,
            EntityType::Commitment,
            EntityType::Task,
            EntityType::Contact,
            EntityType::Document,
            EntityType::Position,
            EntityType::Entity,
        ] {
            catalog.register(entity_type, default_actions());
        }
        catalog
    }

    /// Set the actions for an entity type, replacing any previous set.
    ///
    /// Duplicate kinds keep their first occurrence.
    pub fn register(&self, entity_type: EntityType, definitions: Vec<BulkActionDefinition>) {
        let mut seen = Vec::with_capacity(definitions.len());
        let mut unique = Vec::with_capacity(definitions.len());
        for def in definitions {
            if seen.contains(&def.kind) {
                tracing::warn!(
                    "Duplicate action '{}' for '{}' ignored",
                    def.kind,
                    entity_type
                );
                continue;
            }
            seen.push(def.kind);
            unique.push(def);
        }

        tracing::debug!(
            "Registered {} actions for '{}'",
            unique.len(),
            entity_type
        );
        self.actions.write().insert(entity_type, unique);
    }

    /// Append one action to an entity type's list.
    ///
    /// Returns `false` if that kind is already registered.
    pub fn add(&self, entity_type: EntityType, definition: BulkActionDefinition) -> bool {
        let mut actions = self.actions.write();
        let list = actions.entry(entity_type).or_default();
        if list.iter().any(|d| d.kind == definition.kind) {
            return false;
        }
        list.push(definition);
        true
    }

    /// Remove an action. Returns `true` if it was registered.
    pub fn remove(&self, entity_type: EntityType, kind: ActionKind) -> bool {
        let mut actions = self.actions.write();
        let Some(list) = actions.get_mut(&entity_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|d| d.kind != kind);
        list.len() != before
    }

    /// Ordered actions for an entity type.
    pub fn actions_for(&self, entity_type: EntityType) -> Vec<BulkActionDefinition> {
        self.actions
            .read()
            .get(&entity_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Look up one action.
    pub fn find(&self, entity_type: EntityType, kind: ActionKind) -> Option<BulkActionDefinition> {
        self.actions
            .read()
            .get(&entity_type)
            .and_then(|list| list.iter().find(|d| d.kind == kind).cloned())
    }

    /// Actions that apply to the current selection. Empty when nothing is selected.
    pub fn applicable(
        &self,
        entity_type: EntityType,
        selection: &SelectionState,
    ) -> Vec<BulkActionDefinition> {
        if selection.is_empty() {
            return Vec::new();
        }
        self.actions_for(entity_type)
    }

    /// Split actions into inline buttons and an overflow menu.
    pub fn toolbar(&self, entity_type: EntityType, inline: usize) -> ToolbarActions {
        let mut all = self.actions_for(entity_type);
        let overflow = if all.len() > inline {
            all.split_off(inline)
        } else {
            Vec::new()
        };
        ToolbarActions {
            inline: all,
            overflow,
        }
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard bulk action set.
pub fn default_actions() -> Vec<BulkActionDefinition> {
    vec![
        BulkActionDefinition::new(ActionKind::UpdateStatus, "bulkActions.actions.updateStatus")
            .with_icon("RefreshCw")
            .confirmed()
            .undoable(),
        BulkActionDefinition::new(ActionKind::Assign, "bulkActions.actions.assign")
            .with_icon("UserPlus")
            .confirmed()
            .undoable(),
        BulkActionDefinition::new(ActionKind::AddTags, "bulkActions.actions.addTags")
            .with_icon("Tags")
            .undoable(),
        BulkActionDefinition::new(ActionKind::ChangePriority, "bulkActions.actions.changePriority")
            .with_icon("Flag")
            .confirmed()
            .undoable(),
        BulkActionDefinition::new(ActionKind::Escalate, "bulkActions.actions.escalate")
            .with_icon("AlertTriangle")
            .confirmed(),
        BulkActionDefinition::new(ActionKind::Export, "bulkActions.actions.export")
            .with_icon("Download"),
        BulkActionDefinition::new(ActionKind::Archive, "bulkActions.actions.archive")
            .with_icon("Archive")
            .confirmed()
            .undoable(),
        BulkActionDefinition::new(ActionKind::Delete, "bulkActions.actions.delete")
            .with_icon("Trash2")
            .undoable()
            .destructive(),
    ]
}
