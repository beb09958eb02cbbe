/// Patch application — the only place durable writes happen.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::patch::PatchSet;
use crate::storage::{ChronicleStore, CorpusStore, StorageError};

/// How many records of each kind were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplySummary {
    pub entities: usize,
    pub chronicles: usize,
    pub events: usize,
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated {} entities, {} chronicles, {} events",
            self.entities, self.chronicles, self.events
        )
    }
}

/// A write failed part-way. Records counted in `summary` stay written.
#[derive(Debug, Error)]
#[error("apply stopped ({summary}): {source}")]
pub struct ApplyFailure {
    pub summary: ApplySummary,
    #[source]
    pub source: StorageError,
}

/// Persists a `PatchSet`: chronicles first, then entities, then events.
pub struct PatchApplier<'a> {
    chronicles: &'a dyn ChronicleStore,
    corpus: &'a dyn CorpusStore,
}

impl<'a> PatchApplier<'a> {
    pub fn new(chronicles: &'a dyn ChronicleStore, corpus: &'a dyn CorpusStore) -> Self {
        Self { chronicles, corpus }
    }

    /// Write every patch, one record at a time.
    ///
    /// Stops at the first storage error; nothing already written is rolled
    /// back. A chronicle deleted since the scan is skipped and not counted.
    pub async fn apply(
        &self,
        run_id: &str,
        patches: &PatchSet,
    ) -> Result<ApplySummary, ApplyFailure> {
        let mut summary = ApplySummary::default();
        let fail = |summary: ApplySummary, source: StorageError| {
            warn!(%run_id, %summary, error = %source, "apply failed");
            ApplyFailure { summary, source }
        };

        for patch in &patches.chronicle_patches {
            let current = self
                .chronicles
                .get_chronicle(&patch.chronicle_id)
                .await
                .map_err(|e| fail(summary, e))?;
            let Some(mut record) = current else {
                warn!(chronicle = %patch.chronicle_id, "chronicle vanished before apply");
                continue;
            };
            patch.apply_to(&mut record);
            self.chronicles
                .put_chronicle(record)
                .await
                .map_err(|e| fail(summary, e))?;
            summary.chronicles += 1;
        }

        for patch in &patches.entity_patches {
            self.corpus
                .apply_entity_patch(run_id, patch)
                .await
                .map_err(|e| fail(summary, e))?;
            summary.entities += 1;
        }

        for patch in &patches.event_patches {
            self.corpus
                .apply_event_patch(run_id, patch)
                .await
                .map_err(|e| fail(summary, e))?;
            summary.events += 1;
        }

        info!(%run_id, %summary, "patches applied");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::patch::{ChroniclePatch, EntityPatch, EventPatch, FieldChange};
    use crate::schema::chronicle::ChronicleRecord;
    use crate::schema::corpus::Corpus;
    use crate::schema::entity::{Entity, EntityId};
    use crate::schema::event::NarrativeEvent;
    use crate::schema::source::TextField;
    use crate::storage::MemoryWorld;

    fn change(field: TextField, value: &str) -> FieldChange {
        FieldChange { field, value: value.to_string() }
    }

    fn world() -> MemoryWorld {
        MemoryWorld::new(
            "run",
            Corpus {
                entities: vec![Entity::new("mira", "Mira Holt", "npc")],
                events: vec![NarrativeEvent::new("e1", "duel", "Mira Holt duels")],
                chronicles: vec![
                    ChronicleRecord::new("c1", "One", "Mira Holt walked."),
                    ChronicleRecord::new("c2", "Two", "Mira Holt ran."),
                ],
                ..Default::default()
            },
        )
    }

    fn patches() -> PatchSet {
        PatchSet {
            entity_patches: vec![EntityPatch {
                entity_id: EntityId::new("mira"),
                changes: vec![change(TextField::Name, "Mira Thale")],
                reason: "rename".to_string(),
            }],
            event_patches: vec![EventPatch {
                event_id: "e1".to_string(),
                changes: vec![change(TextField::Headline, "Mira Thale duels")],
            }],
            chronicle_patches: vec![
                ChroniclePatch {
                    chronicle_id: "c1".to_string(),
                    changes: vec![change(TextField::Body, "Mira Thale walked.")],
                },
                ChroniclePatch {
                    chronicle_id: "c2".to_string(),
                    changes: vec![change(TextField::Body, "Mira Thale ran.")],
                },

            ],
            accepted: 4,
            applied: 4,
            skipped: Vec::new(),
        }
    }

    #[tokio::test]
    async fn applies_everything() {
        let world = world();
        let summary = PatchApplier::new(&world, &world).apply("run", &patches()).await.unwrap();
        assert_eq!(summary, ApplySummary { entities: 1, chronicles: 2, events: 1 });
        assert_eq!(summary.to_string(), "updated 1 entities, 2 chronicles, 1 events");

        let after = world.snapshot().await;
        assert_eq!(after.entities[0].name, "Mira Thale");
        assert_eq!(after.events[0].headline, "Mira Thale duels");
        assert_eq!(after.chronicles[1].body, "Mira Thale ran.");
    }

    #[tokio::test]
    async fn partial_failure_keeps_earlier_writes() {
        let world = world().fail_writes_to("c2");
        let err = PatchApplier::new(&world, &world).apply("run", &patches()).await.unwrap_err();
        assert_eq!(err.summary, ApplySummary { entities: 0, chronicles: 1, events: 0 });
        assert!(matches!(err.source, StorageError::Backend(_)));

        let after = world.snapshot().await;
        assert_eq!(after.chronicles[0].body, "Mira Thale walked.");
        assert_eq!(after.chronicles[1].body, "Mira Holt ran.");
        assert_eq!(after.entities[0].name, "Mira Holt");
    }

    #[tokio::test]
    async fn vanished_chronicle_is_not_counted() {
        let world = world();
        world.edit(|c| c.chronicles.retain(|r| r.id != "c2")).await;
        let summary = PatchApplier::new(&world, &world).apply("run", &patches()).await.unwrap();
        assert_eq!(summary.chronicles, 1);
        assert_eq!(summary.entities, 1);
    }
}
