use serde::{Deserialize, Serialize};
use std::fmt;

use super::source::{SourceType, TextField, TextSource};

/// Newtype wrapper for entity ids (slug-style strings such as `mira-holt`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A prior description, kept when a rewrite replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRecord {
    pub description: String,
    pub reason: String,
}

/// A character, place, artifact or other named thing in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// Append-only; newest last.
    #[serde(default)]
    pub description_history: Vec<DescriptionRecord>,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            kind: kind.into(),
            subtype: None,
            culture: None,
            summary: String::new(),
            description: String::new(),
            description_history: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    /// Replace the description, pushing the previous one onto the history.
    pub fn revise_description(&mut self, description: String, reason: &str) {
        if description == self.description {
            return;
        }
        let previous = std::mem::replace(&mut self.description, description);
        self.description_history.push(DescriptionRecord {
            description: previous,
            reason: reason.to_string(),
        });
    }
}

impl TextSource for Entity {
    fn source_type(&self) -> SourceType {
        SourceType::Entity
    }

    fn source_id(&self) -> &str {
        self.id.as_str()
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn text_fields(&self) -> Vec<(TextField, &str)> {
        vec![
            (TextField::Name, self.name.as_str()),
            (TextField::Summary, self.summary.as_str()),
            (TextField::Description, self.description.as_str()),
        ]
    }

    fn set_field(&mut self, field: TextField, value: String) -> bool {
        match field {
            TextField::Name => self.name = value,
            TextField::Summary => self.summary = value,
            TextField::Description => self.description = value,
            _ => return false,
        }
        true
    }
}
