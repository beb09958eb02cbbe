use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::source::{SourceType, TextField, TextSource};

/// A lightweight reference to an entity taking part in an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub entity_id: EntityId,
    pub role: String,
    /// Name as recorded when the event was derived.
    pub entity_name: String,
}

/// A derived record of something that happened in the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: String,
    pub event_type: String,
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub subject: Option<EntityId>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl NarrativeEvent {
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        headline: impl Into<String>,
    ) -> Self {

        Self {
            id: id.into(),
            event_type: event_type.into(),
            headline: headline.into(),
            description: String::new(),
            action: String::new(),
            subject: None,
            participants: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_subject(mut self, entity_id: &str) -> Self {
        self.subject = Some(EntityId::new(entity_id));
        self
    }

    pub fn with_participant(mut self, role: &str, entity_id: &str, entity_name: &str) -> Self {
        self.participants.push(Participant {
            entity_id: EntityId::new(entity_id),
            role: role.to_string(),
            entity_name: entity_name.to_string(),
        });
        self
    }

    /// True if `id` is the subject or one of the participants.
    pub fn involves(&self, id: &EntityId) -> bool {
        self.subject.as_ref() == Some(id) || self.participants.iter().any(|p| &p.entity_id == id)
    }
}

impl TextSource for NarrativeEvent {
    fn source_type(&self) -> SourceType {
        SourceType::Event
    }

    fn source_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.headline
    }

    fn text_fields(&self) -> Vec<(TextField, &str)> {
        let mut fields = vec![
            (TextField::Headline, self.headline.as_str()),
            (TextField::Description, self.description.as_str()),
            (TextField::Action, self.action.as_str()),
        ];
        for (i, p) in self.participants.iter().enumerate() {
            fields.push((TextField::ParticipantName(i), p.entity_name.as_str()));
        }
        fields
    }

    fn set_field(&mut self, field: TextField, value: String) -> bool {
        match field {
            TextField::Headline => self.headline = value,
            TextField::Description => self.description = value,
            TextField::Action => self.action = value,
            TextField::ParticipantName(i) => match self.participants.get_mut(i) {
                Some(p) => p.entity_name = value,
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
    fn event_creation() {
        let event = NarrativeEvent::new("e1", "duel", "Duel at the ford")
            .with_description("Mira Holt crossed blades with Oskar Venn.")
            .with_subject("mira-holt")
            .with_participant("opponent", "oskar-venn", "Oskar Venn");
        assert_eq!(event.participants.len(), 1);
        assert!(event.involves(&EntityId::new("mira-holt")));
        assert!(event.involves(&EntityId::new("oskar-venn")));
        assert!(!event.involves(&EntityId::new("someone-else")));
    }

    #[test]
    fn participant_name_fields() {
        let mut event = NarrativeEvent::new("e1", "duel", "Duel")
            .with_participant("challenger", "mira-holt", "Mira Holt");
        assert_eq!(event.field(TextField::ParticipantName(0)), Some("Mira Holt"));
        assert!(event.set_field(TextField::ParticipantName(0), "Mira Thale".to_string()));
        assert_eq!(event.participants[0].entity_name, "Mira Thale");
        assert!(!event.set_field(TextField::Body, "x".to_string()));
    }
}
