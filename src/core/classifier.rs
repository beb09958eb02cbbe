/// Match classification — tier assignment, grouping by source and
/// presentation ordering.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::scanner::{MatchId, RawMatch, RenameMatch, SourceRef};
use crate::schema::corpus::Corpus;
use crate::schema::entity::EntityId;
use crate::schema::source::SourceType;

/// A source record's narrative distance from the renamed entity.
///
/// Declaration order is the presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// The renamed entity itself.
    SelfEntity,
    /// Directly connected: a related entity, a participating event, or a
    /// chronicle featuring the entity in its cast.
    Related,
    /// Any other record that merely mentions the name.
    General,
}

impl Tier {
    /// User-facing label, which depends on the kind of source.
    pub fn label(&self, source_type: SourceType) -> &'static str {
        match (self, source_type) {
            (Self::SelfEntity, _) => "self",
            (Self::Related, SourceType::Entity) => "related",
            (Self::Related, SourceType::Event) => "participant",
            (Self::Related, SourceType::Chronicle) => "cast",
            (Self::General, _) => "mention",
        }
    }
}

/// All matches from one source record, sharing a single tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceGroup {
    pub source: SourceRef,
    pub tier: Tier,
    pub match_ids: Vec<MatchId>,
}

impl SourceGroup {
    pub fn label(&self) -> &'static str {
        self.tier.label(self.source.source_type)
    }
}

/// Computes tiers from the corpus' relationship, cast and participant data.
pub struct TierAssigner<'a> {
    entity_id: &'a EntityId,
    related_entities: FxHashSet<&'a str>,
    participant_events: FxHashSet<&'a str>,
    cast_chronicles: FxHashSet<&'a str>,
}

impl<'a> TierAssigner<'a> {
    pub fn new(corpus: &'a Corpus, entity_id: &'a EntityId) -> Self {
        let related_entities = corpus
            .relationships
            .iter()
            .filter_map(|r| r.other_end(entity_id))
            .map(|id| id.as_str())
            .collect();
        let participant_events = corpus
            .events
            .iter()
            .filter(|e| e.involves(entity_id))
            .map(|e| e.id.as_str())
            .collect();
        let cast_chronicles = corpus
            .chronicles
            .iter()
            .filter(|c| c.features(entity_id))
            .map(|c| c.id.as_str())
            .collect();
        Self {
            entity_id,
            related_entities,
            participant_events,
            cast_chronicles,
        }
    }

    pub fn tier_for(&self, source_type: SourceType, id: &str) -> Tier {
        let related = match source_type {
            SourceType::Entity if id == self.entity_id.as_str() => return Tier::SelfEntity,
            SourceType::Entity => self.related_entities.contains(id),
            SourceType::Event => self.participant_events.contains(id),
            SourceType::Chronicle => self.cast_chronicles.contains(id),
        };
        if related {
            Tier::Related
        } else {
            Tier::General
        }
    }
}

/// Group raw matches by source, assign tiers, order the groups for
/// presentation and hand out match ids in that order.
///
/// Order: self first, then entities, events, chronicles; within a type,
/// related before general; ties by display name, then id. Matches keep
/// their scan order inside a group.
pub fn classify(
    raw: Vec<RawMatch>,
    corpus: &Corpus,
    entity_id: &EntityId,
) -> (Vec<RenameMatch>, Vec<SourceGroup>) {
    let tiers = TierAssigner::new(corpus, entity_id);

    let mut index: FxHashMap<(SourceType, String), usize> = FxHashMap::default();
    let mut buckets: Vec<(SourceRef, Tier, Vec<RawMatch>)> = Vec::new();
    for m in raw {
        let key = (m.source.source_type, m.source.id.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            let tier = tiers.tier_for(m.source.source_type, &m.source.id);
            buckets.push((m.source.clone(), tier, Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].2.push(m);
    }

    buckets.sort_by(|(a, ta, _), (b, tb, _)| {
        (*ta != Tier::SelfEntity, a.source_type, *ta, &a.name, &a.id)
            .cmp(&(*tb != Tier::SelfEntity, b.source_type, *tb, &b.name, &b.id))
    });

    let mut matches = Vec::new();
    let mut groups = Vec::with_capacity(buckets.len());
    let mut next = 0u32;
    for (source, tier, raws) in buckets {
        let mut match_ids = Vec::with_capacity(raws.len());
        for raw in raws {
            let id = MatchId(next);
            next += 1;
            match_ids.push(id);
            matches.push(RenameMatch::from_raw(raw, id, tier));
        }
        groups.push(SourceGroup { source, tier, match_ids });
    }
    (matches, groups)
}
