//! Selectable item types for bulk actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Stable item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The list types that bulk actions can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Dossier,
    Engagement,
    Deliverable,
    Commitment,
    Task,
    Contact,
    Document,
    Position,
    #[default]
    Entity,
}

impl EntityType {
    /// Wire name, e.g. `"deliverable"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Dossier => "dossier",
            EntityType::Engagement => "engagement",
            EntityType::Deliverable => "deliverable",
            EntityType::Commitment => "commitment",
            EntityType::Task => "task",
            EntityType::Contact => "contact",
            EntityType::Document => "document",
            EntityType::Position => "position",
            EntityType::Entity => "entity",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row in a host list or table that can take part in a bulk action.
///
/// Owned by the host; this subsystem only reads it. Only `id` is required,
/// the remaining fields feed display names and preview search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectableItem {
    /// Unique identifier within the host list.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Any other host-specific display fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SelectableItem {
    /// Create an item with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            title: None,
            label: None,
            status: None,
            priority: None,
            assignee: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the status badge value.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the priority badge value.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Attach an extra display field.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Get the item's ID as an ItemId.
    pub fn item_id(&self) -> ItemId {
        ItemId(self.id.clone())
    }

    /// First present of name, title, label; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.title.as_deref())
            .or(self.label.as_deref())
            .unwrap_or(&self.id)
    }

    /// Display name using a host-chosen field, if that field holds a value.
    pub fn display_name_with(&self, field: Option<&str>) -> String {
        let Some(field) = field else {
            return self.display_name().to_string();
        };

        let value = match field {
            "name" => self.name.clone(),
            "title" => self.title.clone(),
            "label" => self.label.clone(),
            "status" => self.status.clone(),
            "priority" => self.priority.clone(),
            "assignee" => self.assignee.clone(),
            other => self.fields.get(other).and_then(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                v => Some(v.to_string()),
            }),
        };

        value
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.display_name().to_string())
    }

    /// Case-insensitive match of `query` against the display name or id.
    ///
    /// A blank query matches everything.
    pub fn matches_query(&self, query: &str, display_field: Option<&str>) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.display_name_with(display_field)
            .to_lowercase()
            .contains(&query)
            || self.id.to_lowercase().contains(&query)
    }
}
