//! Storage collaborators.
//!
//! The engine never owns persistence. It reads a corpus through
//! [`CorpusLoader`], looks up the entity being renamed through
//! [`EntitySource`], and writes through [`ChronicleStore`] (the chronicle
//! partition) and [`CorpusStore`] (entities and events). [`MemoryWorld`]
//! implements all of them over a single in-memory run, for tests and the
//! preview tool.

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::patch::{EntityPatch, EventPatch};
use crate::schema::chronicle::ChronicleRecord;
use crate::schema::corpus::{Corpus, CorpusError};
use crate::schema::entity::Entity;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("simulation run not found: {0}")]
    RunNotFound(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

/// Bulk read of everything one simulation run contains.
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load_corpus(&self, run_id: &str) -> Result<Corpus, StorageError>;
}

/// Full entity fetch, including every text field.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn get_entities_for_run(&self, run_id: &str) -> Result<Vec<Entity>, StorageError>;
}

/// Per-record chronicle storage.
#[async_trait]
pub trait ChronicleStore: Send + Sync {
    async fn get_chronicle(&self, id: &str) -> Result<Option<ChronicleRecord>, StorageError>;
    async fn put_chronicle(&self, record: ChronicleRecord) -> Result<(), StorageError>;
}

/// Writes for entity and event patches.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    async fn apply_entity_patch(
        &self,
        run_id: &str,
        patch: &EntityPatch,
    ) -> Result<(), StorageError>;
    async fn apply_event_patch(
        &self,
        run_id: &str,
        patch: &EventPatch,
    ) -> Result<(), StorageError>;

}

/// One simulation run held in memory.
#[derive(Debug)]
pub struct MemoryWorld {
    run_id: String,
    corpus: RwLock<Corpus>,
    failing: FxHashSet<String>,
}

impl MemoryWorld {
    pub fn new(run_id: impl Into<String>, corpus: Corpus) -> Self {
        Self {
            run_id: run_id.into(),
            corpus: RwLock::new(corpus),
            failing: FxHashSet::default(),
        }
    }

    /// Make every write to the record with this id fail.
    pub fn fail_writes_to(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> Corpus {
        self.corpus.read().await.clone()
    }

    /// Mutate the stored corpus directly, bypassing the engine.
    pub async fn edit<F: FnOnce(&mut Corpus)>(&self, f: F) {
        f(&mut *self.corpus.write().await);
    }

    fn check_run(&self, run_id: &str) -> Result<(), StorageError> {
        if run_id == self.run_id {
            Ok(())
        } else {
            Err(StorageError::RunNotFound(run_id.to_string()))
        }
    }

    fn check_writable(&self, id: &str) -> Result<(), StorageError> {
        if self.failing.contains(id) {
            Err(StorageError::Backend(format!("write rejected for {id}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CorpusLoader for MemoryWorld {
    async fn load_corpus(&self, run_id: &str) -> Result<Corpus, StorageError> {
        self.check_run(run_id)?;
        Ok(self.snapshot().await)
    }
}

#[async_trait]
impl EntitySource for MemoryWorld {
    async fn get_entities_for_run(&self, run_id: &str) -> Result<Vec<Entity>, StorageError> {
        self.check_run(run_id)?;
        Ok(self.corpus.read().await.entities.clone())
    }
}

#[async_trait]
impl ChronicleStore for MemoryWorld {
    async fn get_chronicle(&self, id: &str) -> Result<Option<ChronicleRecord>, StorageError> {
        Ok(self.corpus.read().await.chronicle(id).cloned())
    }

    async fn put_chronicle(&self, record: ChronicleRecord) -> Result<(), StorageError> {
        self.check_writable(&record.id)?;
        let mut corpus = self.corpus.write().await;
        match corpus.chronicles.iter_mut().find(|c| c.id == record.id) {
            Some(slot) => *slot = record,
            None => corpus.chronicles.push(record),
        }
        Ok(())
    }
}

#[async_trait]
impl CorpusStore for MemoryWorld {
    async fn apply_entity_patch(
        &self,
        run_id: &str,
        patch: &EntityPatch,
    ) -> Result<(), StorageError> {
        self.check_run(run_id)?;
        self.check_writable(patch.entity_id.as_str())?;
        let mut corpus = self.corpus.write().await;
        let entity = corpus
            .entity_mut(&patch.entity_id)
            .ok_or_else(|| StorageError::NotFound(patch.entity_id.to_string()))?;
        patch.apply_to(entity);
        Ok(())
    }

    async fn apply_event_patch(
        &self,
        run_id: &str,
        patch: &EventPatch,
    ) -> Result<(), StorageError> {
        self.check_run(run_id)?;
        self.check_writable(&patch.event_id)?;
        let mut corpus = self.corpus.write().await;
        let event = corpus
            .event_mut(&patch.event_id)
            .ok_or_else(|| StorageError::NotFound(patch.event_id.clone()))?;
        patch.apply_to(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::FieldChange;
    use crate::schema::entity::EntityId;
    use crate::schema::source::TextField;

    fn world() -> MemoryWorld {
        MemoryWorld::new(
            "run-1",
            Corpus {
                entities: vec![Entity::new("mira", "Mira Holt", "npc")],
                chronicles: vec![ChronicleRecord::new(
                    "c1",
                    "Homecoming",
                    "Mira Holt walked home.",
                )],

                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn load_checks_run_id() {
        let world = world();
        assert_eq!(world.load_corpus("run-1").await.unwrap().entities.len(), 1);
        assert!(matches!(world.load_corpus("run-2").await, Err(StorageError::RunNotFound(_))));
        assert_eq!(world.get_entities_for_run("run-1").await.unwrap()[0].name, "Mira Holt");
    }

    #[tokio::test]
    async fn chronicle_read_modify_write() {
        let world = world();
        let mut record = world.get_chronicle("c1").await.unwrap().unwrap();
        record.body = "Mira Thale walked home.".to_string();
        world.put_chronicle(record).await.unwrap();
        assert_eq!(world.snapshot().await.chronicles[0].body, "Mira Thale walked home.");
        assert!(world.get_chronicle("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entity_patch_and_failures() {
        let world = world().fail_writes_to("c1");
        let patch = EntityPatch {
            entity_id: EntityId::new("mira"),
            changes: vec![FieldChange { field: TextField::Name, value: "Mira Thale".to_string() }],
            reason: "rename".to_string(),
        };
        world.apply_entity_patch("run-1", &patch).await.unwrap();
        assert_eq!(world.snapshot().await.entities[0].name, "Mira Thale");

        let missing = EntityPatch { entity_id: EntityId::new("ghost"), ..patch };
        assert!(matches!(
            world.apply_entity_patch("run-1", &missing).await,
            Err(StorageError::NotFound(_))
        ));

        let record = world.get_chronicle("c1").await.unwrap().unwrap();
        assert!(matches!(world.put_chronicle(record).await, Err(StorageError::Backend(_))));
    }
}
