//! Confirmation flows.
//!
//! A confirmation turns a selected item set plus an action into an
//! [`ActionInvocation`], or nothing when the user cancels. Two strategies
//! implement the same [`Confirmation`] trait:
//!
//! - [`SimpleConfirmation`] - fixed item set, only the parameter form
//! - [`PreviewConfirmation`] - per-item exclusion with search and bulk toggles
//!
//! Both latch into a processing state once `confirm()` succeeds so a second
//! submit is refused until the host calls `settle()`.

use std::collections::HashSet;

use dossier_core::{
    ActionInvocation, ActionKind, ActionParams, BulkActionDefinition, EntityStatus, EntityType,
    ExportFormat, ItemId, Priority, SelectableItem,
};

use crate::error::ConfirmationError;

// =============================================================================
// Parameter Form
// =============================================================================

/// Which form control an action needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    StatusSelect,
    PrioritySelect,
    FormatSelect,
    /// Free-text reason.
    ReasonText,
    None,
}

impl FormField {
    pub fn for_kind(kind: ActionKind) -> Self {
        match kind {
            ActionKind::UpdateStatus => FormField::StatusSelect,
            ActionKind::ChangePriority => FormField::PrioritySelect,
            ActionKind::Export => FormField::FormatSelect,
            ActionKind::Escalate => FormField::ReasonText,
            ActionKind::Assign
            | ActionKind::Unassign
            | ActionKind::AddTags
            | ActionKind::RemoveTags
            | ActionKind::Delete
            | ActionKind::Archive
            | ActionKind::Restore
            | ActionKind::SendReminder => FormField::None,
        }
    }
}

/// Values entered in the action-specific form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamsForm {
    pub status: EntityStatus,
    pub priority: Priority,
    pub format: ExportFormat,
    pub notes: String,
}

impl ParamsForm {
    /// Build the parameters for `kind` from the current form values.
    pub fn resolve(&self, kind: ActionKind) -> ActionParams {
        match FormField::for_kind(kind) {
            FormField::StatusSelect => ActionParams::UpdateStatus {
                status: self.status,
            },
            FormField::PrioritySelect => ActionParams::ChangePriority {
                priority: self.priority,
            },
            FormField::FormatSelect => ActionParams::Export {
                format: self.format,
            },
            FormField::ReasonText => ActionParams::Escalate {
                notes: self.notes.clone(),
            },
            FormField::None => ActionParams::None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// Notices
// =============================================================================

/// Informational blocks the dialog shows alongside the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Destructive action: permanent, must be read before confirming.
    DestructiveWarning,
    /// Archived items can be restored later.
    ArchiveNote,
    /// The action can be undone for this many seconds after it completes.
    UndoAvailable { seconds: u64 },
    /// Every item is excluded.
    NothingIncluded,
}

/// Why the preview list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyView {
    /// The search matched nothing.
    NoResults,
    NoItems,
}

// =============================================================================
// Confirmation Trait
// =============================================================================

/// State shared by both confirmation strategies.
#[derive(Debug, Clone)]
pub struct ConfirmationContext {
    pub action: BulkActionDefinition,
    pub entity_type: EntityType,
    pub undo_ttl_ms: u64,
    pub form: ParamsForm,
    processing: bool,
}

impl ConfirmationContext {
    pub fn new(action: BulkActionDefinition, entity_type: EntityType, undo_ttl_ms: u64) -> Self {
        Self {
            action,
            entity_type,
            undo_ttl_ms,
            form: ParamsForm::default(),
            processing: false,
        }
    }

    fn undo_seconds(&self) -> u64 {
        dossier_core::ttl_seconds(self.undo_ttl_ms)
    }
}

/// A confirmation dialog's logic, independent of rendering.
pub trait Confirmation: Send {
    fn context(&self) -> &ConfirmationContext;

    fn context_mut(&mut self) -> &mut ConfirmationContext;

    /// Ids that would be acted on, in display order.
    fn included_ids(&self) -> Vec<ItemId>;

    /// Clear strategy-specific view state (exclusions, search).
    fn reset_view(&mut self);

    fn included_count(&self) -> usize {
        self.included_ids().len()
    }

    fn action(&self) -> &BulkActionDefinition {
        &self.context().action
    }

    fn form(&self) -> &ParamsForm {
        &self.context().form
    }

    fn form_mut(&mut self) -> &mut ParamsForm {
        &mut self.context_mut().form
    }

    fn form_field(&self) -> FormField {
        FormField::for_kind(self.action().kind)
    }

    fn is_processing(&self) -> bool {
        self.context().processing
    }

    /// Whether the confirm button is enabled.
    fn can_confirm(&self) -> bool {
        !self.is_processing() && self.included_count() > 0
    }

    /// Resolve the invocation and latch into processing.
    fn confirm(&mut self) -> Result<ActionInvocation, ConfirmationError> {
        if self.is_processing() {
            return Err(ConfirmationError::Processing);
        }

        let included = self.included_ids();
        if included.is_empty() {
            return Err(ConfirmationError::NothingIncluded);
        }

        let ctx = self.context();
        let params = ctx.form.resolve(ctx.action.kind);
        let invocation =
            ActionInvocation::new(ctx.action.clone(), ctx.entity_type, included, params)?;

        self.context_mut().processing = true;
        tracing::debug!(
            "Confirmed '{}' for {} items",
            invocation.kind(),
            invocation.item_count()
        );
        Ok(invocation)
    }

    /// Release the processing latch once execution has settled.
    fn settle(&mut self) {
        self.context_mut().processing = false;
    }

    /// Close without confirming. Restores form and view defaults.
    fn cancel(&mut self) {
        let ctx = self.context_mut();
        ctx.form.reset();
        ctx.processing = false;
        self.reset_view();
    }

    /// Notices to show for this action.
    fn notices(&self) -> Vec<Notice> {
        let ctx = self.context();
        let mut notices = Vec::new();

        if ctx.action.is_destructive {
            notices.push(Notice::DestructiveWarning);
        }
        if ctx.action.kind == ActionKind::Archive {
            notices.push(Notice::ArchiveNote);
        }
        if ctx.action.undo_eligible() {
            notices.push(Notice::UndoAvailable {
                seconds: ctx.undo_seconds(),
            });
        }
        if self.included_count() == 0 {
            notices.push(Notice::NothingIncluded);
        }
        notices
    }
}

// =============================================================================
// Simple Confirmation
// =============================================================================

/// Confirms a fixed item set. Only the parameter form is editable.
#[derive(Debug, Clone)]
pub struct SimpleConfirmation {
    context: ConfirmationContext,
    item_ids: Vec<ItemId>,
}

impl SimpleConfirmation {
    pub fn new(context: ConfirmationContext, item_ids: Vec<ItemId>) -> Self {
        Self { context, item_ids }
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }
}

impl Confirmation for SimpleConfirmation {
    fn context(&self) -> &ConfirmationContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ConfirmationContext {
        &mut self.context
    }

    fn included_ids(&self) -> Vec<ItemId> {
        self.item_ids.clone()
    }

    fn included_count(&self) -> usize {
        self.item_ids.len()
    }

    fn reset_view(&mut self) {}
}

// =============================================================================
// Preview Confirmation
// =============================================================================

/// Lists every selected item with its own include checkbox.
///
/// Exclusions are keyed by id and independent of the search filter: items
/// excluded while a filter is active stay excluded after it is cleared.
#[derive(Debug, Clone)]
pub struct PreviewConfirmation {
    context: ConfirmationContext,
    items: Vec<SelectableItem>,
    excluded: HashSet<ItemId>,
    query: String,
    show_excluded_only: bool,
    display_field: Option<String>,
}

impl PreviewConfirmation {
    pub fn new(context: ConfirmationContext, items: Vec<SelectableItem>) -> Self {
        Self {
            context,
            items,
            excluded: HashSet::new(),
            query: String::new(),
            show_excluded_only: false,
            display_field: None,
        }
    }

    /// Use a specific item field as the display name.
    pub fn with_display_field(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_excluded(&self, id: &ItemId) -> bool {
        self.excluded.contains(id)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    pub fn show_excluded_only(&self) -> bool {
        self.show_excluded_only
    }

    /// Flip the "excluded only" view. Only meaningful while something is excluded.
    pub fn toggle_show_excluded_only(&mut self) {
        if self.excluded.is_empty() {
            self.show_excluded_only = false;
            return;
        }
        self.show_excluded_only = !self.show_excluded_only;
    }

    /// Display name for an item, honoring the configured display field.
    pub fn display_name(&self, item: &SelectableItem) -> String {
        item.display_name_with(self.display_field.as_deref())
    }

    /// Items currently shown: search filter, then the excluded-only view.
    pub fn visible_items(&self) -> Vec<&SelectableItem> {
        self.items
            .iter()
            .filter(|item| item.matches_query(&self.query, self.display_field.as_deref()))
            .filter(|item| !self.show_excluded_only || self.excluded.contains(&item.item_id()))
            .collect()
    }

    /// Why the list is empty, if it is.
    pub fn empty_view(&self) -> Option<EmptyView> {
        if !self.visible_items().is_empty() {
            return None;
        }
        if self.query.trim().is_empty() {
            Some(EmptyView::NoItems)
        } else {
            Some(EmptyView::NoResults)
        }
    }

    /// Whether every visible item is included (disables "include all").
    pub fn all_visible_included(&self) -> bool {
        self.visible_items()
            .iter()
            .all(|item| !self.excluded.contains(&item.item_id()))
    }

    /// Flip one item's inclusion. Returns whether it is included afterwards.
    ///
    /// Ids not in the preview are ignored.
    pub fn toggle_item(&mut self, id: &ItemId) -> Result<bool, ConfirmationError> {
        if self.is_processing() {
            return Err(ConfirmationError::Processing);
        }
        if !self.items.iter().any(|item| item.id == id.0) {
            return Ok(false);
        }

        let included = if self.excluded.remove(id) {
            true
        } else {
            self.excluded.insert(id.clone());
            false
        };
        self.sync_view();
        Ok(included)
    }

    /// Include every visible item. Returns how many changed.
    pub fn include_all_visible(&mut self) -> Result<usize, ConfirmationError> {
        if self.is_processing() {
            return Err(ConfirmationError::Processing);
        }
        let visible: Vec<ItemId> = self.visible_items().iter().map(|i| i.item_id()).collect();
        let changed = visible
            .iter()
            .filter(|id| self.excluded.remove(*id))
            .count();
        self.sync_view();
        Ok(changed)
    }

    /// Exclude every visible item. Returns how many changed.
    pub fn exclude_all_visible(&mut self) -> Result<usize, ConfirmationError> {
        if self.is_processing() {
            return Err(ConfirmationError::Processing);
        }
        let visible: Vec<ItemId> = self.visible_items().iter().map(|i| i.item_id()).collect();
        let changed = visible
            .into_iter()
            .filter(|id| self.excluded.insert(id.clone()))
            .count();
        Ok(changed)
    }

    fn sync_view(&mut self) {
        if self.excluded.is_empty() {
            self.show_excluded_only = false;
        }
    }
}

impl Confirmation for PreviewConfirmation {
    fn context(&self) -> &ConfirmationContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ConfirmationContext {
        &mut self.context
    }

    fn included_ids(&self) -> Vec<ItemId> {
        self.items
            .iter()
            .map(|item| item.item_id())
            .filter(|id| !self.excluded.contains(id))
            .collect()
    }

    fn included_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !self.excluded.contains(&item.item_id()))
            .count()
    }

    fn reset_view(&mut self) {
        self.excluded.clear();
        self.query.clear();
        self.show_excluded_only = false;
    }
}
