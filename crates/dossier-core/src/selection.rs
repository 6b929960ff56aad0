//! Multi-item selection with a hard cap.
//!
//! `SelectionTracker` owns the selected id set for one host list. Every
//! derived flag the toolbar and table header need comes from
//! [`SelectionState::project`], so they cannot drift apart between callers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SelectionError;
use crate::item::ItemId;

/// What `select_all` does when the visible set is larger than the cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectAllPolicy {
    /// Select the first `max_selection` visible items and report how many were left out.
    #[default]
    Cap,
    /// Refuse and leave the selection unchanged.
    Reject,
}

/// Result of a successful `select_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllOutcome {
    /// Every visible item is now selected.
    Selected { count: usize },
    /// Only the first `selected` items fit; `dropped` visible items were not selected.
    Capped { selected: usize, dropped: usize },
}

// =============================================================================
// Selection State
// =============================================================================

/// Snapshot of the selection with its derived flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    pub selected_ids: HashSet<ItemId>,
    pub selected_count: usize,
    /// Every visible id is selected (and at least one is visible).
    pub all_selected: bool,
    /// Some, but not all, visible ids are selected.
    pub partially_selected: bool,
    pub max_reached: bool,
    pub can_select_more: bool,
}

impl SelectionState {
    /// Derive the flags for a selection against the visible ids.
    pub fn project(selected: &HashSet<ItemId>, visible: &[ItemId], max_selection: usize) -> Self {
        let selected_count = selected.len();
        let all_selected = !visible.is_empty() && visible.iter().all(|id| selected.contains(id));
        let partially_selected = !all_selected && visible.iter().any(|id| selected.contains(id));
        let max_reached = selected_count >= max_selection;

        Self {
            selected_ids: selected.clone(),
            selected_count,
            all_selected,
            partially_selected,
            max_reached,
            can_select_more: !max_reached,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_count == 0
    }
}

// =============================================================================
// Selection Tracker
// =============================================================================

/// Owns the selected ids for one host list.
///
/// Invariant: `selected.len() <= max_selection` after every call.
#[derive(Debug, Clone)]
pub struct SelectionTracker {
    selected: HashSet<ItemId>,
    /// Ids currently shown by the host, in display order.
    visible: Vec<ItemId>,
    /// Most recently toggled id, used as the shift-click anchor.
    anchor: Option<ItemId>,
    max_selection: usize,
    policy: SelectAllPolicy,
}

impl SelectionTracker {
    /// Create an empty tracker.
    pub fn new(max_selection: usize, policy: SelectAllPolicy) -> Self {
        Self {
            selected: HashSet::new(),
            visible: Vec::new(),
            anchor: None,
            max_selection,
            policy,
        }
    }

    pub fn max_selection(&self) -> usize {
        self.max_selection
    }

    pub fn anchor(&self) -> Option<&ItemId> {
        self.anchor.as_ref()
    }

    /// Tell the tracker which ids the host is showing.
    pub fn set_visible(&mut self, visible: Vec<ItemId>) {
        self.visible = visible;
    }

    pub fn visible(&self) -> &[ItemId] {
        &self.visible
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Current snapshot with derived flags.
    pub fn state(&self) -> SelectionState {
        SelectionState::project(&self.selected, &self.visible, self.max_selection)
    }

    /// Selected ids in the given display order. Ids not in `order` are appended sorted.
    pub fn selected_in_order(&self, order: &[ItemId]) -> Vec<ItemId> {
        let mut result: Vec<ItemId> = order
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect();

        let ordered: HashSet<&ItemId> = order.iter().collect();
        let mut rest: Vec<ItemId> = self
            .selected
            .iter()
            .filter(|id| !ordered.contains(id))
            .cloned()
            .collect();
        rest.sort();
        result.extend(rest);
        result
    }

    /// Flip membership of `id`.
    ///
    /// Returns whether the item is selected afterwards. Adding past the cap
    /// is refused and leaves both the selection and the anchor untouched.
    pub fn toggle(&mut self, id: ItemId) -> Result<bool, SelectionError> {
        if self.selected.remove(&id) {
            self.anchor = Some(id);
            return Ok(false);
        }

        if self.selected.len() >= self.max_selection {
            tracing::warn!("Maximum selection limit ({}) reached", self.max_selection);
            return Err(SelectionError::LimitReached {
                max: self.max_selection,
            });
        }

        self.selected.insert(id.clone());
        self.anchor = Some(id);
        Ok(true)
    }

    /// Select every id between `anchor` and `target`, inclusive, in `ordered_visible` order.
    ///
    /// Returns how many ids were newly added. If either id is not in the list
    /// nothing happens. If the range does not fit under the cap the whole
    /// range is refused.
    pub fn select_range(
        &mut self,
        anchor: &ItemId,
        target: &ItemId,
        ordered_visible: &[ItemId],
    ) -> Result<usize, SelectionError> {
        let (Some(from), Some(to)) = (
            ordered_visible.iter().position(|id| id == anchor),
            ordered_visible.iter().position(|id| id == target),
        ) else {
            tracing::debug!("Range endpoints not visible, ignoring range select");
            return Ok(0);
        };

        let (start, end) = (from.min(to), from.max(to));
        let additions: Vec<&ItemId> = ordered_visible[start..=end]
            .iter()
            .filter(|id| !self.selected.contains(*id))
            .collect();

        if self.selected.len() + additions.len() > self.max_selection {
            tracing::warn!(
                "Range of {} items exceeds selection limit ({})",
                additions.len(),
                self.max_selection
            );
            return Err(SelectionError::LimitReached {
                max: self.max_selection,
            });
        }

        let added = additions.len();
        for id in additions {
            self.selected.insert(id.clone());
        }
        self.anchor = Some(target.clone());
        Ok(added)
    }

    /// Shift-click: range from the current anchor, or a plain toggle without one.
    pub fn shift_select(
        &mut self,
        target: ItemId,
        ordered_visible: &[ItemId],
    ) -> Result<usize, SelectionError> {
        match self.anchor.clone() {
            Some(anchor) => self.select_range(&anchor, &target, ordered_visible),
            None => self.toggle(target).map(usize::from),
        }
    }

    /// Replace the selection with the visible ids.
    ///
    /// Over the cap, behavior follows the configured [`SelectAllPolicy`].
    pub fn select_all(&mut self, visible: Vec<ItemId>) -> Result<SelectAllOutcome, SelectionError> {
        let total = visible.len();

        if total > self.max_selection && self.policy == SelectAllPolicy::Reject {
            tracing::warn!(
                "Select all of {} items refused, limit is {}",
                total,
                self.max_selection
            );
            self.visible = visible;
            return Err(SelectionError::LimitReached {
                max: self.max_selection,
            });
        }

        self.selected = visible.iter().take(self.max_selection).cloned().collect();
        self.visible = visible;

        let selected = self.selected.len();
        if selected < total {
            tracing::warn!(
                "Select all capped at {} of {} items",
                selected,
                total
            );
            Ok(SelectAllOutcome::Capped {
                selected,
                dropped: total - selected,
            })
        } else {
            Ok(SelectAllOutcome::Selected { count: selected })
        }
    }

    /// Drop the whole selection and the anchor.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }
}
