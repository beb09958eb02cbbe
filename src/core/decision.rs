/// Decision model — the reviewer's verdict on each actionable match.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::scanner::{MatchId, MatchKind, RenameScanResult};

/// What to do with one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchDecision {
    Accept,
    Reject,
    /// Replace with this text verbatim instead of the default replacement.
    Edit(String),
}

impl MatchDecision {
    /// The decision a freshly scanned match starts with. Structural
    /// matches take no decision.
    pub fn default_for(kind: MatchKind) -> Option<MatchDecision> {
        match kind {
            MatchKind::Full | MatchKind::Metadata => Some(MatchDecision::Accept),
            MatchKind::Partial => Some(MatchDecision::Reject),
            MatchKind::Structural => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        !matches!(self, MatchDecision::Reject)
    }
}

/// Tally shown to the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub accepted: usize,
    pub rejected: usize,
    pub edited: usize,
}

/// Decisions keyed by match id. Only actionable matches have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMap {
    decisions: FxHashMap<MatchId, MatchDecision>,
}

impl DecisionMap {
    /// Every actionable match at its default decision.
    pub fn defaults_for(scan: &RenameScanResult) -> Self {
        let decisions = scan
            .matches
            .iter()
            .filter_map(|m| MatchDecision::default_for(m.kind).map(|d| (m.id, d)))
            .collect();
        Self { decisions }
    }

    pub fn get(&self, id: MatchId) -> Option<&MatchDecision> {
        self.decisions.get(&id)
    }

    /// Record a decision. Returns false, leaving the map untouched, if the
    /// id is unknown or belongs to a structural match.
    pub fn set(&mut self, id: MatchId, decision: MatchDecision) -> bool {
        match self.decisions.get_mut(&id) {
            Some(slot) => {
                *slot = decision;
                true
            }
            None => false,
        }
    }

    pub fn accept_all(&mut self) {
        for decision in self.decisions.values_mut() {
            *decision = MatchDecision::Accept;
        }
    }

    pub fn reject_all(&mut self) {
        for decision in self.decisions.values_mut() {
            *decision = MatchDecision::Reject;
        }
    }

    /// Accept or reject every match of one kind (e.g. all partials).
    pub fn set_kind(&mut self, scan: &RenameScanResult, kind: MatchKind, decision: MatchDecision) {
        for m in scan.matches.iter().filter(|m| m.kind == kind) {
            self.set(m.id, decision.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn counts(&self) -> DecisionCounts {
        let mut counts = DecisionCounts::default();
        for decision in self.decisions.values() {
            match decision {
                MatchDecision::Accept => counts.accepted += 1,
                MatchDecision::Reject => counts.rejected += 1,
                MatchDecision::Edit(_) => counts.edited += 1,
            }
        }
        counts
    }
}
