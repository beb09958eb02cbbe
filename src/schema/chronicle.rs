use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::source::{SourceType, TextField, TextSource};

/// A role slot in a chronicle, pointing at the entity that fills it.
///
/// `entity_name` is a denormalised copy of the entity's name at
/// generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastEntry {
    pub role: String,
    pub entity_id: EntityId,
    pub entity_name: String,
}

/// Generated prose about one or more entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub body: String,
    #[serde(default)]
    pub cast: Vec<CastEntry>,
}

impl ChronicleRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            body: body.into(),
            cast: Vec::new(),
        }
    }

    pub fn with_cast(mut self, role: &str, entity_id: &str, entity_name: &str) -> Self {
        self.cast.push(CastEntry {
            role: role.to_string(),
            entity_id: EntityId::new(entity_id),
            entity_name: entity_name.to_string(),
        });
        self
    }

    pub fn features(&self, id: &EntityId) -> bool {
        self.cast.iter().any(|c| &c.entity_id == id)
    }
}

impl TextSource for ChronicleRecord {
    fn source_type(&self) -> SourceType {
        SourceType::Chronicle
    }

    fn source_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn text_fields(&self) -> Vec<(TextField, &str)> {
        let mut fields = vec![
            (TextField::Title, self.title.as_str()),
            (TextField::Summary, self.summary.as_str()),
            (TextField::Body, self.body.as_str()),
        ];
        for (i, entry) in self.cast.iter().enumerate() {
            fields.push((TextField::CastName(i), entry.entity_name.as_str()));
        }
        fields
    }

    fn set_field(&mut self, field: TextField, value: String) -> bool {
        match field {
            TextField::Title => self.title = value,
            TextField::Summary => self.summary = value,
            TextField::Body => self.body = value,
            TextField::CastName(i) => match self.cast.get_mut(i) {
                Some(entry) => entry.entity_name = value,
                None => return false,
            },
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_fields_are_indexed() {
        let chronicle = ChronicleRecord::new("c1", "The Long Walk", "Mira Holt walked home.")
            .with_cast("protagonist", "mira-holt", "Mira Holt")
            .with_cast("witness", "oskar-venn", "Oskar Venn");
        assert_eq!(chronicle.field(TextField::CastName(1)), Some("Oskar Venn"));
        assert_eq!(chronicle.field(TextField::CastName(2)), None);
        assert!(chronicle.features(&EntityId::new("mira-holt")));
        assert!(!chronicle.features(&EntityId::new("nobody")));
    }

    #[test]
    fn set_cast_name() {
        let mut chronicle =
            ChronicleRecord::new("c1", "t", "b").with_cast("protagonist", "mira-holt", "Mira Holt");
        assert!(chronicle.set_field(TextField::CastName(0), "Mira Thale".to_string()));
        assert_eq!(chronicle.cast[0].entity_name, "Mira Thale");
        assert!(!chronicle.set_field(TextField::CastName(5), "x".to_string()));
        assert!(!chronicle.set_field(TextField::Name, "x".to_string()));
    }
}
