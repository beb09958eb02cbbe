use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::chronicle::ChronicleRecord;
use super::culture::Culture;
use super::entity::{Entity, EntityId};
use super::event::NarrativeEvent;
use super::relationship::Relationship;
use super::source::{SourceType, TextSource};

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),
}

/// Everything one simulation run contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub events: Vec<NarrativeEvent>,
    #[serde(default)]
    pub chronicles: Vec<ChronicleRecord>,
    #[serde(default)]
    pub cultures: Vec<Culture>,
}

impl Corpus {
    pub fn load_from_ron(path: &Path) -> Result<Corpus, CorpusError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Corpus, CorpusError> {
        Ok(ron::from_str(input)?)
    }

    pub fn to_ron(&self) -> Result<String, CorpusError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }

    pub fn chronicle(&self, id: &str) -> Option<&ChronicleRecord> {
        self.chronicles.iter().find(|c| c.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&NarrativeEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn event_mut(&mut self, id: &str) -> Option<&mut NarrativeEvent> {
        self.events.iter_mut().find(|e| e.id == id)
    }

    pub fn culture(&self, id: &str) -> Option<&Culture> {
        self.cultures.iter().find(|c| c.id == id)
    }

    /// Look up any record by type and id.
    pub fn source(&self, source_type: SourceType, id: &str) -> Option<&dyn TextSource> {
        match source_type {
            SourceType::Entity => self
                .entities
                .iter()
                .find(|e| e.id.as_str() == id)
                .map(|e| e as &dyn TextSource),
            SourceType::Event => self.event(id).map(|e| e as &dyn TextSource),
            SourceType::Chronicle => self.chronicle(id).map(|c| c as &dyn TextSource),
        }
    }

    /// Every record in scan order: entities, then events, then chronicles.
    pub fn sources(&self) -> impl Iterator<Item = &dyn TextSource> {
        self.entities
            .iter()
            .map(|e| e as &dyn TextSource)
            .chain(self.events.iter().map(|e| e as &dyn TextSource))
            .chain(self.chronicles.iter().map(|c| c as &dyn TextSource))
    }
}
