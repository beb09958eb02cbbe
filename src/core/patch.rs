/// Patch building — turns a reviewed scan into per-record field rewrites,
/// guarding against text that changed since the scan.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::GrammarPolicy;
use crate::core::decision::{DecisionMap, MatchDecision};
use crate::core::grammar::{adjust, Adjustment};
use crate::core::scanner::{MatchId, MatchKind, RenameMatch, RenameScanResult};
use crate::schema::chronicle::ChronicleRecord;
use crate::schema::corpus::Corpus;
use crate::schema::entity::{Entity, EntityId};
use crate::schema::event::NarrativeEvent;
use crate::schema::source::{MatchField, SourceType, TextField, TextSource};

/// The new value for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: TextField,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub entity_id: EntityId,
    pub changes: Vec<FieldChange>,
    /// Recorded in the description history when the description changes.
    pub reason: String,
}

impl EntityPatch {
    /// Write the changes into `entity`. A description change goes through
    /// `Entity::revise_description` so the prior text is kept.
    pub fn apply_to(&self, entity: &mut Entity) {
        for change in &self.changes {
            if change.field == TextField::Description {
                entity.revise_description(change.value.clone(), &self.reason);
            } else {
                entity.set_field(change.field, change.value.clone());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub event_id: String,
    pub changes: Vec<FieldChange>,
}

impl EventPatch {
    pub fn apply_to(&self, event: &mut NarrativeEvent) {
        for change in &self.changes {
            event.set_field(change.field, change.value.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChroniclePatch {
    pub chronicle_id: String,
    pub changes: Vec<FieldChange>,
}

impl ChroniclePatch {
    pub fn apply_to(&self, chronicle: &mut ChronicleRecord) {
        for change in &self.changes {
            chronicle.set_field(change.field, change.value.clone());
        }
    }
}

/// Everything the applier needs, plus bookkeeping for the summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub entity_patches: Vec<EntityPatch>,
    pub event_patches: Vec<EventPatch>,
    pub chronicle_patches: Vec<ChroniclePatch>,
    /// Matches whose decision called for a rewrite.
    pub accepted: usize,
    /// Matches actually rewritten.
    pub applied: usize,
    /// Matches dropped because their text had moved or changed.
    pub skipped: Vec<MatchId>,
}

impl PatchSet {
    pub fn is_empty(&self) -> bool {
        self.entity_patches.is_empty()
            && self.event_patches.is_empty()
            && self.chronicle_patches.is_empty()
    }
}

/// Default replacement for a partial match: the token at the same index in
/// the new name when both names have the same number of tokens, otherwise
/// the whole new name.
pub fn fragment_replacement(old_name: &str, new_name: &str, fragment: &str) -> String {
    let old_tokens: Vec<&str> = old_name.split_whitespace().collect();
    let new_tokens: Vec<&str> = new_name.split_whitespace().collect();
    if old_tokens.len() == new_tokens.len() {
        let index = old_tokens.iter().position(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .eq_ignore_ascii_case(fragment)
        });
        if let Some(i) = index {
            return new_tokens[i].trim_matches(|c: char| !c.is_alphanumeric()).to_string();
        }
    }
    new_name.to_string()
}

/// The rewrite a decision implies for one match, or `None` if nothing is
/// to be written (rejected, undecided or structural).
///
/// Accepted prose matches go through the grammar adjuster; metadata
/// matches and edits replace exactly the matched span.
pub fn planned_edit(
    m: &RenameMatch,
    decision: Option<&MatchDecision>,
    old_name: &str,
    replacement: &str,
    policy: &GrammarPolicy,
) -> Option<Adjustment> {
    let decision = decision?;
    match (decision, m.kind) {
        (_, MatchKind::Structural) | (MatchDecision::Reject, _) => None,
        (MatchDecision::Edit(text), _) => Some(Adjustment::raw(m.position, &m.matched_text, text)),
        (MatchDecision::Accept, MatchKind::Metadata) => {
            Some(Adjustment::raw(m.position, &m.matched_text, replacement))
        }
        (MatchDecision::Accept, MatchKind::Full) => Some(adjust(
            &m.context_before,
            &m.context_after,
            m.position,
            &m.matched_text,
            replacement,
            policy,
        )),
        (MatchDecision::Accept, MatchKind::Partial) => {
            let fragment = m.fragment.as_deref().unwrap_or(&m.matched_text);
            let text = fragment_replacement(old_name, replacement, fragment);
            Some(adjust(
                &m.context_before,
                &m.context_after,
                m.position,
                &m.matched_text,
                &text,
                policy,
            ))
        }
    }
}

type FieldKey = (SourceType, String, TextField);

/// Apply `edits` to `current` back to front. Returns the new value and the
/// ids of edits that no longer line up with the text.
fn rewrite_field(
    current: &str,
    mut edits: Vec<(MatchId, Adjustment)>,
) -> (String, usize, Vec<MatchId>) {
    edits.sort_by(|(_, a), (_, b)| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

    let mut value = current.to_string();
    let mut applied = 0;
    let mut skipped = Vec::new();
    // Start of the most recently applied span; everything before it is
    // still the original text.
    let mut floor = usize::MAX;
    for (id, edit) in edits {
        let intact = edit.end <= floor
            && value.get(edit.start..edit.end) == Some(edit.original.as_str());
        if !intact {
            debug!(%id, start = edit.start, end = edit.end, "skipping stale match");
            skipped.push(id);
            continue;
        }
        value.replace_range(edit.start..edit.end, &edit.text);
        floor = edit.start;
        applied += 1;
    }
    (value, applied, skipped)
}

/// Build the patches for a reviewed scan against the current `corpus`.
///
/// `corpus` should be a fresh snapshot: each match's recorded span is
/// re-checked against it and stale matches are skipped rather than
/// failing the batch, so `applied` may be lower than `accepted`.
pub fn build_patches(
    scan: &RenameScanResult,
    replacement: &str,
    decisions: &DecisionMap,
    corpus: &Corpus,
    policy: &GrammarPolicy,
) -> PatchSet {
    let mut set = PatchSet::default();

    let mut by_field: BTreeMap<FieldKey, Vec<(MatchId, Adjustment)>> = BTreeMap::new();
    for m in &scan.matches {
        let MatchField::Text(field) = m.field else {
            continue;
        };
        let decision = decisions.get(m.id);
        let Some(edit) = planned_edit(m, decision, &scan.old_name, replacement, policy) else {
            continue;
        };
        set.accepted += 1;
        by_field
            .entry((m.source.source_type, m.source.id.clone(), field))
            .or_default()
            .push((m.id, edit));
    }

    let mut changes: FxHashMap<(SourceType, String), Vec<FieldChange>> = FxHashMap::default();
    for ((source_type, id, field), edits) in by_field {
        let current = corpus.source(source_type, &id).and_then(|s| s.field(field));
        let Some(current) = current else {
            debug!(%source_type, %id, %field, "record or field gone since scan");
            set.skipped.extend(edits.into_iter().map(|(mid, _)| mid));
            continue;
        };
        let (value, applied, skipped) = rewrite_field(current, edits);
        set.applied += applied;
        set.skipped.extend(skipped);
        if value != current {
            changes
                .entry((source_type, id))
                .or_default()
                .push(FieldChange { field, value });
        }
    }

    let reason = format!("renamed {} to {}", scan.old_name, replacement);
    for group in &scan.groups {
        let key = (group.source.source_type, group.source.id.clone());
        let Some(changes) = changes.remove(&key) else {
            continue;
        };
        let (source_type, id) = key;
        match source_type {
            SourceType::Entity => set.entity_patches.push(EntityPatch {
                entity_id: EntityId(id),
                changes,
                reason: reason.clone(),
            }),
            SourceType::Event => set.event_patches.push(EventPatch { event_id: id, changes }),
            SourceType::Chronicle => {
                set.chronicle_patches.push(ChroniclePatch { chronicle_id: id, changes })
            }
        }
    }

    set.skipped.sort();
    info!(
        accepted = set.accepted,
        applied = set.applied,
        skipped = set.skipped.len(),
        entities = set.entity_patches.len(),
        events = set.event_patches.len(),
        chronicles = set.chronicle_patches.len(),
        "patches built"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: usize, original: &str, text: &str) -> Adjustment {
        Adjustment::raw(start, original, text)
    }

    #[test]
    fn fragment_maps_to_same_index() {
        assert_eq!(fragment_replacement("Mira Holt", "Mira Thale", "Holt"), "Thale");
        assert_eq!(fragment_replacement("Mira Holt", "Mira Thale", "Mira"), "Mira");
        assert_eq!(fragment_replacement("Mira Holt", "Thale", "Holt"), "Thale");
        assert_eq!(fragment_replacement("Mira Holt", "Ser Mira Thale", "Holt"), "Ser Mira Thale");
    }

    #[test]
    fn rewrite_back_to_front() {
        let text = "Holt, Holt and Holt.";
        let edits = vec![
            (MatchId(0), edit(0, "Holt", "Thale")),
            (MatchId(1), edit(6, "Holt", "Ember")),
            (MatchId(2), edit(15, "Holt", "Vale")),
        ];
        let (value, applied, skipped) = rewrite_field(text, edits);
        assert_eq!(value, "Thale, Ember and Vale.");
        assert_eq!(applied, 3);
        assert!(skipped.is_empty());
    }

    #[test]
    fn rewrite_skips_changed_text() {
        let text = "Holt, Bolt and Holt.";
        let edits = vec![
            (MatchId(0), edit(0, "Holt", "Thale")),
            (MatchId(1), edit(6, "Holt", "Thale")),
            (MatchId(2), edit(15, "Holt", "Thale")),
        ];
        let (value, applied, skipped) = rewrite_field(text, edits);
        assert_eq!(value, "Thale, Bolt and Thale.");
        assert_eq!(applied, 2);
        assert_eq!(skipped, vec![MatchId(1)]);
    }

    #[test]
    fn rewrite_skips_out_of_range_and_overlap() {
        let text = "a Holt";
        let edits = vec![
            (MatchId(0), edit(2, "Holt", "Thale")),
            (MatchId(1), edit(0, "a Holt", "an Ember")),
            (MatchId(2), edit(40, "Holt", "Thale")),
        ];
        let (value, applied, skipped) = rewrite_field(text, edits);
        assert_eq!(value, "a Thale");
        assert_eq!(applied, 1);
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn rewrite_rejects_non_char_boundary() {
        let text = "é Holt";
        // Byte 1 is inside the "é".
        let (value, applied, skipped) =
            rewrite_field(text, vec![(MatchId(0), edit(1, "x Holt", "y"))]);
        assert_eq!(value, text);
        assert_eq!(applied, 0);
        assert_eq!(skipped, vec![MatchId(0)]);
    }

    #[test]
    fn entity_patch_keeps_description_history() {
        let mut entity =
            Entity::new("mira", "Mira Holt", "npc").with_description("Mira Holt sails.");
        let patch = EntityPatch {
            entity_id: EntityId::new("mira"),
            changes: vec![
                FieldChange { field: TextField::Name, value: "Mira Thale".to_string() },
                FieldChange {
                    field: TextField::Description,
                    value: "Mira Thale sails.".to_string(),
                },

            ],
            reason: "renamed Mira Holt to Mira Thale".to_string(),
        };
        patch.apply_to(&mut entity);
        assert_eq!(entity.name, "Mira Thale");
        assert_eq!(entity.description, "Mira Thale sails.");
        assert_eq!(entity.description_history.len(), 1);
        assert_eq!(entity.description_history[0].description, "Mira Holt sails.");
    }
}
