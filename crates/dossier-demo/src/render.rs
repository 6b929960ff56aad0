//! Plain-text rendering of the bulk-action surfaces.

use serde::Serialize;

use dossier_bulk::{
    ActionStatus, Confirmation, FormField, Notice, PreviewConfirmation, ProgressSnapshot,
    ToolbarActions, UndoView,
};
use dossier_core::{ActionKind, EntityStatus, ExportFormat, Priority, SelectionState};

/// `"update-status"` -> `"Update Status"`.
pub fn action_label(kind: ActionKind) -> String {
    kind.as_str()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Serialized name of a unit enum value, e.g. `"in_progress"`.
pub fn wire_name<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn choices<T: Serialize>(values: &[T]) -> String {
    values.iter().map(wire_name).collect::<Vec<_>>().join(" | ")
}

/// The form control an action's dialog shows, with its options.
pub fn form_options(kind: ActionKind) -> Option<String> {
    match FormField::for_kind(kind) {
        FormField::StatusSelect => Some(format!("status: {}", choices(&EntityStatus::ALL))),
        FormField::PrioritySelect => Some(format!("priority: {}", choices(&Priority::ALL))),
        FormField::FormatSelect => Some(format!("format: {}", choices(&ExportFormat::ALL))),
        FormField::ReasonText => Some("reason: (free text)".to_string()),
        FormField::None => None,
    }
}

fn bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}

fn status_name(status: ActionStatus) -> &'static str {
    match status {
        ActionStatus::Idle => "idle",
        ActionStatus::Pending => "pending",
        ActionStatus::Processing => "processing",
        ActionStatus::Completed => "completed",
        ActionStatus::Failed => "failed",
        ActionStatus::Cancelled => "cancelled",
    }
}

pub fn toolbar_line(selection: &SelectionState, toolbar: &ToolbarActions) -> String {
    if selection.is_empty() {
        return "No items selected".to_string();
    }

    let mut line = format!("{} selected", selection.selected_count);
    if selection.max_reached {
        line.push_str(" (limit)");
    }

    let inline: Vec<String> = toolbar.inline.iter().map(|a| action_label(a.kind)).collect();
    line.push_str(" | ");
    line.push_str(&inline.join(", "));

    if !toolbar.overflow.is_empty() {
        line.push_str(&format!(" | +{} more", toolbar.overflow.len()));
    }
    line
}

pub fn progress_line(snapshot: &ProgressSnapshot) -> String {
    let Some(action) = snapshot.action else {
        return status_name(snapshot.status).to_string();
    };

    let mut line = format!(
        "{} [{}] {:>3}% {}/{} {}",
        action,
        bar(snapshot.progress, 20),
        snapshot.progress,
        snapshot.processed_count,
        snapshot.total_count,
        status_name(snapshot.status)
    );
    if let Some(error) = &snapshot.error {
        line.push_str(": ");
        line.push_str(error);
    }
    line
}

pub fn undo_line(view: &UndoView) -> String {
    let label = action_label(view.record.action);
    let count = view.record.item_ids.len();
    if view.undoing {
        return format!("Undoing {} on {} items...", label, count);
    }

    let mut line = format!(
        "{} applied to {} items. Undo ({}s) [{}]",
        label,
        count,
        view.seconds_remaining,
        bar(view.progress_percent, 10)
    );
    if view.paused {
        line.push_str(" (paused)");
    }
    line
}

pub fn notice_line(notice: &Notice) -> String {
    match notice {
        Notice::DestructiveWarning => "warning: This action cannot be undone.".to_string(),
        Notice::ArchiveNote => "note: Archived items can be restored later.".to_string(),
        Notice::UndoAvailable { seconds } => {
            format!("note: Undo available for {} seconds after completion.", seconds)
        }
        Notice::NothingIncluded => {
            "error: No items included. Please include at least one item.".to_string()
        }
    }
}

/// Preview dialog body: counts, visible rows, notices.
pub fn preview_text(flow: &PreviewConfirmation) -> String {
    let mut lines = vec![format!(
        "{} of {} included",
        flow.included_count(),
        flow.total_count()
    )];

    for item in flow.visible_items() {
        let mark = if flow.is_excluded(&item.item_id()) {
            " "
        } else {
            "x"
        };
        lines.push(format!("[{}] {}", mark, flow.display_name(item)));
    }

    lines.extend(flow.notices().iter().map(notice_line));
    lines.join("\n")
}
