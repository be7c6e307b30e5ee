use serde::{Deserialize, Serialize};

/// What kind of value an entity's entries carry.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ValueType {
    #[default]
    None,
    Number,
    Text,
    Boolean,
    Duration,
    Rating,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct PropertyDef {
    pub name: String,
    #[serde(rename = "value-type", default)]
    pub value_type: ValueType,
}

/// A user-defined template for something trackable (habit, task, mood...).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "value-type", default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub(crate) struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One timestamped record logged against an entity.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Entry {
    pub id: String,

    #[serde(rename = "entity-id")]
    pub entity_id: String,

    /// Unix epoch milliseconds.
    pub timestamp: i64,

    /// Markdown body. Backend omits it for entries that were never annotated.
    #[serde(default)]
    pub notes: String,

    /// Raw value as entered; its meaning depends on the entity's value type.
    #[serde(default)]
    pub value: Option<serde_json::Value>,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub links: Vec<String>,

    #[serde(default)]
    pub location: Option<GeoPoint>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update sent to the backend. Absent fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl EntryPatch {
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, entry: &mut Entry) {
        if let Some(notes) = &self.notes {
            entry.notes = notes.clone();
        }
        if let Some(tags) = &self.tags {
            entry.tags = tags.clone();
        }
    }
}
