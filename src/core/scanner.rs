/// Reference scanner — finds every textual and structural reference to a
/// name across a corpus.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::RenameConfig;
use crate::core::classifier::{classify, SourceGroup, Tier};
use crate::schema::corpus::Corpus;
use crate::schema::entity::EntityId;
use crate::schema::source::{FieldKind, MatchField, SourceType, StructuralRef, TextSource};
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
    #[error("search phrase is empty")]
    EmptyPhrase,
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Identifier of a match, unique within one scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub u32);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// How an occurrence relates to the searched phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// The complete phrase in narrative prose.
    Full,
    /// A single token of a multi-token name, where the full phrase is absent.
    Partial,
    /// The complete phrase in a label-like field.
    Metadata,
    /// An id reference to the entity. Informational only.
    Structural,
}

/// The record a match came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_type: SourceType,
    pub id: String,
    pub name: String,
}

impl SourceRef {
    fn of(source: &dyn TextSource) -> Self {
        Self {
            source_type: source.source_type(),
            id: source.source_id().to_string(),
            name: source.display_name().to_string(),
        }
    }
}

/// An occurrence found by the scanner, before classification.
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub source: SourceRef,
    pub field: MatchField,
    pub kind: MatchKind,
    pub matched_text: String,
    pub position: usize,
    pub context_before: String,
    pub context_after: String,
    pub fragment: Option<String>,
}

/// One discovered occurrence.
///
/// `position` is a byte offset into the field; `matched_text` occupied
/// `position..position + matched_text.len()` when the scan ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameMatch {
    pub id: MatchId,
    pub source: SourceRef,
    pub field: MatchField,
    pub kind: MatchKind,
    pub matched_text: String,
    pub position: usize,
    pub context_before: String,
    pub context_after: String,
    pub fragment: Option<String>,
    pub tier: Tier,
}

impl RenameMatch {
    pub(crate) fn from_raw(raw: RawMatch, id: MatchId, tier: Tier) -> Self {
        Self {
            id,
            source: raw.source,
            field: raw.field,
            kind: raw.kind,
            matched_text: raw.matched_text,
            position: raw.position,
            context_before: raw.context_before,
            context_after: raw.context_after,
            fragment: raw.fragment,
            tier,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.kind != MatchKind::Structural
    }
}

/// What to look for: `old_name` is the phrase to find, `new_name` the
/// intended replacement. When `old_name` differs from the entity's current
/// name the scan repairs a stale name instead of renaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub entity_id: EntityId,
    pub old_name: String,
    pub new_name: String,
}

impl ScanRequest {
    pub fn rename(entity_id: &str, old_name: &str, new_name: &str) -> Self {
        Self {
            entity_id: EntityId::new(entity_id),
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        }
    }
}

/// The outcome of one scan. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameScanResult {
    pub entity_id: EntityId,
    pub old_name: String,
    pub new_name: String,
    pub matches: Vec<RenameMatch>,
    pub groups: Vec<SourceGroup>,
}

impl RenameScanResult {
    pub fn get(&self, id: MatchId) -> Option<&RenameMatch> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn actionable(&self) -> impl Iterator<Item = &RenameMatch> {
        self.matches.iter().filter(|m| m.is_actionable())
    }

    pub fn connections(&self) -> impl Iterator<Item = &RenameMatch> {
        self.matches.iter().filter(|m| !m.is_actionable())
    }

    pub fn count_of(&self, kind: MatchKind) -> usize {
        self.matches.iter().filter(|m| m.kind == kind).count()
    }
}

/// Build a word-bounded pattern for a literal phrase.
fn phrase_pattern(phrase: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if phrase.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if phrase.chars().next_back().is_some_and(is_word) { r"\b" } else { "" };
    RegexBuilder::new(&format!("{lead}{}{trail}", regex::escape(phrase)))
        .case_insensitive(!case_sensitive)
        .build()
}

/// Tokens of a multi-token name that may stand for it on their own.
pub fn name_fragments(phrase: &str, config: &RenameConfig) -> Vec<String> {
    let tokens: Vec<&str> = phrase.split_whitespace().collect();
    if tokens.len() < 2 {
        return Vec::new();
    }
    let mut fragments: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.chars().count() < config.min_fragment_len || config.is_stopword(token) {
            continue;
        }
        if !fragments.iter().any(|f| f == token) {
            fragments.push(token.to_string());
        }
    }
    fragments
}

/// Context windows around `start..end`, clamped to char boundaries.
pub fn context_window(text: &str, start: usize, end: usize, window: usize) -> (String, String) {
    let mut from = start.saturating_sub(window);
    while !text.is_char_boundary(from) {
        from += 1;
    }
    let mut to = end.saturating_add(window).min(text.len());
    while !text.is_char_boundary(to) {
        to -= 1;
    }
    (text[from..start].to_string(), text[end..to].to_string())
}

/// True if the occurrence at `start..end` already sits inside a spelled-out
/// copy of `replacement`.
fn already_replaced(text: &str, start: usize, end: usize, replacement: &str) -> bool {
    let matched = &text[start..end];
    if matched == replacement {
        return true;
    }
    replacement.match_indices(matched).any(|(offset, _)| {
        start >= offset
            && text.get(start - offset..start - offset + replacement.len()) == Some(replacement)
    })
}

struct Patterns {
    full: Regex,
    fragments: Vec<(String, Regex)>,
}

impl Patterns {
    fn compile(phrase: &str, config: &RenameConfig) -> Result<Self, regex::Error> {
        let full = phrase_pattern(phrase, config.case_sensitive)?;
        let fragments = name_fragments(phrase, config)
            .into_iter()
            .map(|f| phrase_pattern(&f, config.case_sensitive).map(|re| (f, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { full, fragments })
    }
}

/// Scan every text field of one record.
fn scan_source(
    source: &dyn TextSource,
    patterns: &Patterns,
    new_name: &str,
    config: &RenameConfig,
    out: &mut Vec<RawMatch>,
) {
    let source_ref = SourceRef::of(source);
    for (field, text) in source.text_fields() {
        if text.is_empty() {
            continue;
        }
        let kind = match field.kind() {
            FieldKind::Narrative => MatchKind::Full,
            FieldKind::Metadata => MatchKind::Metadata,
        };

        let full_spans: Vec<(usize, usize)> =
            patterns.full.find_iter(text).map(|m| (m.start(), m.end())).collect();

        let mut found: Vec<RawMatch> = Vec::new();
        for &(start, end) in &full_spans {
            if already_replaced(text, start, end, new_name) {
                debug!(source = %source_ref.id, %field, start, "dropping no-op match");
                continue;
            }
            let (before, after) = context_window(text, start, end, config.context_window);
            found.push(RawMatch {
                source: source_ref.clone(),
                field: MatchField::Text(field),
                kind,
                matched_text: text[start..end].to_string(),
                position: start,
                context_before: before,
                context_after: after,
                fragment: None,
            });
        }

        if field.kind() == FieldKind::Narrative {
            for (fragment, re) in &patterns.fragments {
                for m in re.find_iter(text) {
                    let overlaps_full =
                        full_spans.iter().any(|&(s, e)| m.start() < e && s < m.end());
                    if overlaps_full || already_replaced(text, m.start(), m.end(), new_name) {
                        continue;
                    }
                    let (before, after) =
                        context_window(text, m.start(), m.end(), config.context_window);
                    found.push(RawMatch {
                        source: source_ref.clone(),
                        field: MatchField::Text(field),
                        kind: MatchKind::Partial,
                        matched_text: m.as_str().to_string(),
                        position: m.start(),
                        context_before: before,
                        context_after: after,
                        fragment: Some(fragment.clone()),
                    });
                }
            }
        }

        found.sort_by_key(|m| m.position);
        out.extend(found);
    }
}

fn structural(source: &dyn TextSource, reference: StructuralRef, entity_id: &EntityId) -> RawMatch {
    RawMatch {
        source: SourceRef::of(source),
        field: MatchField::Reference(reference),
        kind: MatchKind::Structural,
        matched_text: entity_id.to_string(),
        position: 0,
        context_before: String::new(),
        context_after: String::new(),
        fragment: None,
    }
}

/// Id references to the entity: relationship edges (surfaced on the entity
/// at the other end), chronicle cast slots and event subjects/participants.
fn scan_structural(corpus: &Corpus, entity_id: &EntityId) -> Vec<RawMatch> {
    let mut out = Vec::new();
    for rel in &corpus.relationships {
        let Some(other) = rel.other_end(entity_id) else {
            continue;
        };
        if let Some(entity) = corpus.entity(other) {
            let reference = StructuralRef::Relationship { kind: rel.kind.clone() };
            out.push(structural(entity, reference, entity_id));
        }
    }
    for event in &corpus.events {
        if event.subject.as_ref() == Some(entity_id) {
            out.push(structural(event, StructuralRef::Subject, entity_id));
        }
        for (index, p) in event.participants.iter().enumerate() {
            if &p.entity_id == entity_id {
                out.push(structural(event, StructuralRef::Participant { index }, entity_id));
            }
        }
    }
    for chronicle in &corpus.chronicles {
        for entry in chronicle.cast.iter().filter(|c| &c.entity_id == entity_id) {
            let reference = StructuralRef::Cast { role: entry.role.clone() };
            out.push(structural(chronicle, reference, entity_id));
        }
    }
    out
}

/// Scan `corpus` for references to the entity named in `request`.
///
/// Results are deterministic for a fixed corpus, request and config:
/// sources in presentation order, then fields in record order, then
/// position, with structural connections last within a source.
pub fn scan(
    corpus: &Corpus,
    request: &ScanRequest,
    config: &RenameConfig,
) -> Result<RenameScanResult, ScanError> {
    let phrase = request.old_name.trim();
    if phrase.is_empty() {
        return Err(ScanError::EmptyPhrase);
    }
    if corpus.entity(&request.entity_id).is_none() {
        return Err(ScanError::EntityNotFound(request.entity_id.clone()));
    }

    let patterns = Patterns::compile(phrase, config)?;
    let mut raw = Vec::new();
    for source in corpus.sources() {
        scan_source(source, &patterns, &request.new_name, config, &mut raw);
    }
    raw.extend(scan_structural(corpus, &request.entity_id));

    let (matches, groups) = classify(raw, corpus, &request.entity_id);
    let result = RenameScanResult {
        entity_id: request.entity_id.clone(),
        old_name: phrase.to_string(),
        new_name: request.new_name.clone(),
        matches,
        groups,
    };

    info!(
        entity = %request.entity_id,
        sources = result.groups.len(),
        full = result.count_of(MatchKind::Full),
        partial = result.count_of(MatchKind::Partial),
        metadata = result.count_of(MatchKind::Metadata),
        structural = result.count_of(MatchKind::Structural),
        "scan complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::chronicle::ChronicleRecord;
    use crate::schema::entity::Entity;
    use crate::schema::event::NarrativeEvent;
    use crate::schema::relationship::Relationship;
    use crate::schema::source::TextField;

    fn mira_corpus() -> Corpus {
        Corpus {
            entities: vec![
                Entity::new("mira-holt", "Mira Holt", "npc")
                    .with_description("Mira Holt charts the northern ice."),
                Entity::new("oskar-venn", "Oskar Venn", "npc")
                    .with_description("Oskar once sailed with Mira Holt."),
            ],
            relationships: vec![Relationship::new("crewmate", "oskar-venn", "mira-holt")],
            chronicles: vec![ChronicleRecord::new(
                "c1",
                "Homecoming",
                "Mira Holt walked home. The Holt family was proud.",
            )
            .with_cast("protagonist", "mira-holt", "Mira Holt")],
            ..Default::default()
        }
    }

    fn request() -> ScanRequest {
        ScanRequest::rename("mira-holt", "Mira Holt", "Mira Thale")
    }

    #[test]
    fn finds_full_partial_metadata_and_structural() {
        let result = scan(&mira_corpus(), &request(), &RenameConfig::default()).unwrap();
        let chronicle: Vec<&RenameMatch> =
            result.matches.iter().filter(|m| m.source.id == "c1").collect();
        let kinds: Vec<MatchKind> = chronicle.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MatchKind::Full, MatchKind::Partial, MatchKind::Metadata, MatchKind::Structural]
        );
        assert_eq!(chronicle[1].matched_text, "Holt");
        assert_eq!(chronicle[1].fragment.as_deref(), Some("Holt"));
        assert_eq!(chronicle[2].field, MatchField::Text(TextField::CastName(0)));
    }

    #[test]
    fn self_name_is_a_metadata_match() {
        let result = scan(&mira_corpus(), &request(), &RenameConfig::default()).unwrap();
        let first = &result.matches[0];
        assert_eq!(first.source.id, "mira-holt");
        assert_eq!(first.field, MatchField::Text(TextField::Name));
        assert_eq!(first.kind, MatchKind::Metadata);
        assert_eq!(first.tier, Tier::SelfEntity);
    }

    #[test]
    fn relationship_surfaces_on_other_entity() {
        let result = scan(&mira_corpus(), &request(), &RenameConfig::default()).unwrap();
        let conn: Vec<&RenameMatch> = result.connections().collect();
        let crewmate = MatchField::Reference(StructuralRef::Relationship {
            kind: "crewmate".to_string(),
        });
        assert!(conn.iter().any(|m| m.source.id == "oskar-venn" && m.field == crewmate));
        assert!(conn.iter().all(|m| m.matched_text == "mira-holt"));
    }

    #[test]
    fn word_boundaries_respected() {
        let corpus = Corpus {
            entities: vec![Entity::new("holt", "Holt", "place")],
            events: vec![NarrativeEvent::new("e1", "raid", "Raid")
                .with_description("Holton and Holt burned.")],
            ..Default::default()
        };
        let request = ScanRequest::rename("holt", "Holt", "Vale");
        let result = scan(&corpus, &request, &RenameConfig::default()).unwrap();
        let event: Vec<&RenameMatch> =
            result.matches.iter().filter(|m| m.source.id == "e1").collect();
        assert_eq!(event.len(), 1);
        assert_eq!(event[0].position, 11);
    }

    #[test]
    fn case_insensitive_when_configured() {
        let corpus = Corpus {
            entities: vec![
                Entity::new("holt", "Holt", "place").with_description("the ruins of HOLT")
            ],
            ..Default::default()
        };
        let config = RenameConfig { case_sensitive: false, ..Default::default() };
        let result = scan(&corpus, &ScanRequest::rename("holt", "Holt", "Vale"), &config).unwrap();
        assert!(result.matches.iter().any(|m| m.matched_text == "HOLT"));

        let request = ScanRequest::rename("holt", "Holt", "Vale");
        let strict = scan(&corpus, &request, &RenameConfig::default()).unwrap();

        assert!(!strict.matches.iter().any(|m| m.matched_text == "HOLT"));
    }

    #[test]
    fn no_op_matches_dropped() {
        let corpus = Corpus {
            entities: vec![Entity::new("holt", "Holt", "npc")
                .with_description("Holt the Elder ruled. Holt fell.")],
            ..Default::default()
        };
        let result = scan(
            &corpus,
            &ScanRequest::rename("holt", "Holt", "Holt the Elder"),
            &RenameConfig::default(),
        )
        .unwrap();
        let desc: Vec<&RenameMatch> = result
            .matches
            .iter()
            .filter(|m| m.field == MatchField::Text(TextField::Description))
            .collect();
        assert_eq!(desc.len(), 1);
        assert_eq!(desc[0].position, 22);
    }

    #[test]
    fn identical_replacement_yields_nothing_actionable() {
        let result = scan(
            &mira_corpus(),
            &ScanRequest::rename("mira-holt", "Mira Holt", "Mira Holt"),
            &RenameConfig::default(),
        )
        .unwrap();
        assert!(result.actionable().all(|m| m.kind == MatchKind::Partial));
    }

    #[test]
    fn fragments_skip_short_tokens_and_stopwords() {
        let config = RenameConfig::default();
        assert_eq!(name_fragments("Mira Holt", &config), vec!["Mira", "Holt"]);
        assert_eq!(name_fragments("Jo of the Vale", &config), vec!["Vale"]);
        assert!(name_fragments("Holt", &config).is_empty());
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = "ééé Holt ééé";
        let start = text.find("Holt").unwrap();
        let (before, after) = context_window(text, start, start + 4, 4);
        assert!(before.len() <= 4);
        assert!(after.len() <= 4);
        assert!(before.ends_with(' '));
        assert!(after.starts_with(' '));
    }

    #[test]
    fn unknown_entity_and_empty_phrase_fail() {
        let corpus = mira_corpus();
        let config = RenameConfig::default();
        assert!(matches!(
            scan(&corpus, &ScanRequest::rename("nobody", "X", "Y"), &config),
            Err(ScanError::EntityNotFound(_))
        ));
        assert!(matches!(
            scan(&corpus, &ScanRequest::rename("mira-holt", "  ", "Y"), &config),
            Err(ScanError::EmptyPhrase)
        ));
    }

    #[test]
    fn match_ids_are_sequential() {
        let result = scan(&mira_corpus(), &request(), &RenameConfig::default()).unwrap();
        for (i, m) in result.matches.iter().enumerate() {
            assert_eq!(m.id, MatchId(i as u32));
        }
    }
}
