use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// A typed, directional edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: String,
    pub src: EntityId,
    pub dst: EntityId,
    #[serde(default)]
    pub status: Option<String>,
}

impl Relationship {
    pub fn new(kind: impl Into<String>, src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            src: EntityId::new(src),
            dst: EntityId::new(dst),
            status: None,
        }
    }

    /// The endpoint opposite `id`, if this edge touches `id` at all.
    pub fn other_end(&self, id: &EntityId) -> Option<&EntityId> {
        if &self.src == id {
            Some(&self.dst)
        } else if &self.dst == id {
            Some(&self.src)
        } else {
            None
        }
    }
}
