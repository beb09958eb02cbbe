/// Preview rendering — the diff line a reviewer sees for each match.
use serde::{Deserialize, Serialize};

use crate::config::GrammarPolicy;
use crate::core::decision::MatchDecision;
use crate::core::patch::planned_edit;
use crate::core::scanner::RenameMatch;

/// One match in context. `original` is struck through and `replacement`
/// (if any) shown in its place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewLine {
    pub before: String,
    pub original: String,
    pub replacement: Option<String>,
    pub after: String,
}

impl PreviewLine {
    /// The text as it will read once applied.
    pub fn result(&self) -> String {
        let middle = self.replacement.as_deref().unwrap_or(&self.original);
        format!("{}{}{}", self.before, middle, self.after)
    }
}

/// Render a match under its current decision.
///
/// Uses the same edit planning as the patch builder, so a widened span in
/// the preview is exactly the span that will be written.
pub fn render(
    m: &RenameMatch,
    decision: Option<&MatchDecision>,
    old_name: &str,
    replacement: &str,
    policy: &GrammarPolicy,
) -> PreviewLine {
    let Some(edit) = planned_edit(m, decision, old_name, replacement, policy) else {
        return PreviewLine {
            before: m.context_before.clone(),
            original: m.matched_text.clone(),
            replacement: None,
            after: m.context_after.clone(),
        };
    };

    // The widened span is carved out of the context windows.
    let absorbed_before = m.position - edit.start;
    let absorbed_after = edit.end - (m.position + m.matched_text.len());
    let before_end = m.context_before.len() - absorbed_before;
    PreviewLine {
        before: m.context_before[..before_end].to_string(),
        original: edit.original,
        replacement: Some(edit.text),
        after: m.context_after[absorbed_after..].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenameConfig;
    use crate::core::scanner::{scan, MatchKind, ScanRequest};
    use crate::schema::chronicle::ChronicleRecord;
    use crate::schema::corpus::Corpus;

    use crate::schema::entity::Entity;

    fn scan_one(description: &str, new_name: &str) -> Vec<RenameMatch> {
        let corpus = Corpus {
            entities: vec![Entity::new("holt", "Holt", "npc").with_description(description)],
            ..Default::default()
        };
        scan(&corpus, &ScanRequest::rename("holt", "Holt", new_name), &RenameConfig::default())
            .unwrap()
            .matches
            .into_iter()
            .filter(|m| m.kind == MatchKind::Full)
            .collect()
    }

    #[test]
    fn widened_preview() {
        let matches = scan_one("She met a Holt at dawn.", "Ember");
        let line = render(
            &matches[0],
            Some(&MatchDecision::Accept),
            "Holt",
            "Ember",
            &GrammarPolicy::default(),
        );
        assert_eq!(line.before, "She met ");
        assert_eq!(line.original, "a Holt");
        assert_eq!(line.replacement.as_deref(), Some("an Ember"));
        assert_eq!(line.after, " at dawn.");
        assert_eq!(line.result(), "She met an Ember at dawn.");
    }

    #[test]
    fn rejected_preview_has_no_replacement() {
        let matches = scan_one("She met a Holt at dawn.", "Ember");
        let decision = MatchDecision::Reject;
        let line = render(&matches[0], Some(&decision), "Holt", "Ember", &GrammarPolicy::default());
        assert_eq!(line.original, "Holt");
        assert!(line.replacement.is_none());
        assert_eq!(line.result(), "She met a Holt at dawn.");
    }

    #[test]
    fn edit_preview_is_verbatim() {
        let matches = scan_one("She met a Holt at dawn.", "Ember");
        let decision = MatchDecision::Edit("old Ember".to_string());
        let line = render(&matches[0], Some(&decision), "Holt", "Ember", &GrammarPolicy::default());
        assert_eq!(line.result(), "She met a old Ember at dawn.");
    }

    #[test]
    fn metadata_preview_replaces_raw_span() {
        let corpus = Corpus {
            entities: vec![Entity::new("holt", "Holt", "npc")],
            chronicles: vec![ChronicleRecord::new("c1", "Tales of a Holt's Voyage", "")],
            ..Default::default()
        };
        let request = ScanRequest::rename("holt", "Holt", "Ellis");
        let result = scan(&corpus, &request, &RenameConfig::default()).unwrap();
        let title = result
            .matches
            .iter()
            .find(|m| m.source.id == "c1" && m.kind == MatchKind::Metadata)
            .unwrap();
        let decision = MatchDecision::Accept;
        let line = render(title, Some(&decision), "Holt", "Ellis", &GrammarPolicy::default());

        assert_eq!(line.before, "Tales of a ");
        assert_eq!(line.original, "Holt");
        assert_eq!(line.replacement.as_deref(), Some("Ellis"));
        assert_eq!(line.after, "'s Voyage");
        assert_eq!(line.result(), "Tales of a Ellis's Voyage");
    }
}
