//! WASM bindings for lore-rename — drives the rename dialog in the browser.
//!
//! Everything crosses the boundary as JSON. The host keeps the scan result
//! and decision map between calls and hands them back for preview and patch
//! building.

use wasm_bindgen::prelude::*;

use lore_rename::config::RenameConfig;
use lore_rename::core::decision::{DecisionMap, MatchDecision};
use lore_rename::core::patch::PatchSet;
use lore_rename::core::scanner::{MatchId, MatchKind, RenameScanResult, ScanRequest};
use lore_rename::core::session::RenameEngine;
use lore_rename::schema::corpus::Corpus;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Deserialize)]
struct DecisionInput {
    match_id: u32,
    /// "accept", "reject" or "edit".
    action: String,
    text: Option<String>,
}

#[derive(serde::Serialize)]
struct PreviewInfo {
    match_id: u32,
    kind: MatchKind,
    field: String,
    before: String,
    original: String,
    replacement: Option<String>,
    after: String,
}

#[derive(serde::Serialize)]
struct ApplyInfo {
    entities: usize,
    chronicles: usize,
    events: usize,
    accepted: usize,
    applied: usize,
    skipped: usize,
}

fn js_err(context: &str, e: impl std::fmt::Display) -> JsError {
    JsError::new(&format!("{context}: {e}"))
}

fn parse_decision(input: DecisionInput) -> Result<(MatchId, MatchDecision), JsError> {
    let decision = match input.action.to_lowercase().as_str() {
        "accept" => MatchDecision::Accept,
        "reject" => MatchDecision::Reject,
        "edit" => match input.text {
            Some(text) => MatchDecision::Edit(text),
            None => return Err(JsError::new("edit decision needs a text")),
        },
        other => return Err(JsError::new(&format!("Unknown decision: {other}"))),
    };
    Ok((MatchId(input.match_id), decision))
}

// ---------------------------------------------------------------------------
// RenameDemo — the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct RenameDemo {
    engine: RenameEngine,
    corpus: Corpus,
}

#[wasm_bindgen]
impl RenameDemo {
    /// Create a demo over a JSON corpus. `config_ron` may be empty for the
    /// default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(corpus_json: &str, config_ron: &str, seed: u64) -> Result<RenameDemo, JsError> {
        let corpus: Corpus =
            serde_json::from_str(corpus_json).map_err(|e| js_err("Invalid corpus JSON", e))?;
        let config = if config_ron.trim().is_empty() {
            RenameConfig::default()
        } else {
            RenameConfig::parse_ron(config_ron).map_err(|e| js_err("Config parse error", e))?
        };
        let engine = RenameEngine::builder()
            .with_config(config)
            .seed(seed)
            .build()
            .map_err(|e| js_err("Engine build error", e))?;
        Ok(RenameDemo { engine, corpus })
    }

    /// Scan for a rename.
    ///
    /// Expected JSON shape:
    /// ```json
    /// { "entity_id": "mira-holt", "old_name": "Mira Holt", "new_name": "Mira Thale" }
    /// ```
    pub fn scan(&self, request_json: &str) -> Result<String, JsError> {
        let request: ScanRequest =
            serde_json::from_str(request_json).map_err(|e| js_err("Invalid request JSON", e))?;
        let result = self
            .engine
            .scan(&self.corpus, &request)
            .map_err(|e| js_err("Scan error", e))?;
        serde_json::to_string(&result).map_err(|e| js_err("Serialization error", e))
    }

    /// Default decisions for a scan result, as a JSON decision map.
    pub fn default_decisions(&self, scan_json: &str) -> Result<String, JsError> {
        let scan: RenameScanResult =
            serde_json::from_str(scan_json).map_err(|e| js_err("Invalid scan JSON", e))?;
        serde_json::to_string(&DecisionMap::defaults_for(&scan))
            .map_err(|e| js_err("Serialization error", e))
    }

    /// Apply a JSON array of `{ match_id, action, text? }` to a decision map
    /// and return the updated map.
    pub fn decide(&self, decisions_json: &str, updates_json: &str) -> Result<String, JsError> {
        let mut decisions: DecisionMap =
            serde_json::from_str(decisions_json).map_err(|e| js_err("Invalid decisions JSON", e))?;
        let updates: Vec<DecisionInput> =
            serde_json::from_str(updates_json).map_err(|e| js_err("Invalid update JSON", e))?;
        for update in updates {
            let (id, decision) = parse_decision(update)?;
            if !decisions.set(id, decision) {
                return Err(JsError::new(&format!("No actionable match {id}")));
            }
        }
        serde_json::to_string(&decisions).map_err(|e| js_err("Serialization error", e))
    }

    /// Preview lines for every actionable match. Returns a JSON array.
    pub fn preview(
        &self,
        scan_json: &str,
        decisions_json: &str,
        replacement: &str,
    ) -> Result<String, JsError> {
        let scan: RenameScanResult =
            serde_json::from_str(scan_json).map_err(|e| js_err("Invalid scan JSON", e))?;
        let decisions: DecisionMap =
            serde_json::from_str(decisions_json).map_err(|e| js_err("Invalid decisions JSON", e))?;
        let lines: Vec<PreviewInfo> = self
            .engine
            .preview(&scan, replacement, &decisions)
            .into_iter()
            .filter_map(|(id, line)| {
                let m = scan.get(id)?;
                Some(PreviewInfo {
                    match_id: id.0,
                    kind: m.kind,
                    field: m.field.to_string(),
                    before: line.before,
                    original: line.original,
                    replacement: line.replacement,
                    after: line.after,
                })
            })
            .collect();
        serde_json::to_string(&lines).map_err(|e| js_err("Serialization error", e))
    }

    /// Build patches against the demo's current corpus. Returns the patch set
    /// as JSON.
    pub fn build_patches(
        &self,
        scan_json: &str,
        decisions_json: &str,
        replacement: &str,
    ) -> Result<String, JsError> {
        let patches = self.patches_for(scan_json, decisions_json, replacement)?;
        serde_json::to_string(&patches).map_err(|e| js_err("Serialization error", e))
    }

    /// Build and apply patches to the demo's corpus in one step.
    pub fn apply(
        &mut self,
        scan_json: &str,
        decisions_json: &str,
        replacement: &str,
    ) -> Result<String, JsError> {
        let patches = self.patches_for(scan_json, decisions_json, replacement)?;
        let mut info = ApplyInfo {
            entities: 0,
            chronicles: 0,
            events: 0,
            accepted: patches.accepted,
            applied: patches.applied,
            skipped: patches.skipped.len(),
        };
        for patch in &patches.chronicle_patches {
            let found = self.corpus.chronicles.iter_mut().find(|c| c.id == patch.chronicle_id);
            if let Some(record) = found {
                patch.apply_to(record);
                info.chronicles += 1;
            }
        }
        for patch in &patches.entity_patches {
            if let Some(entity) = self.corpus.entity_mut(&patch.entity_id) {
                patch.apply_to(entity);
                info.entities += 1;
            }
        }
        for patch in &patches.event_patches {
            if let Some(event) = self.corpus.event_mut(&patch.event_id) {
                patch.apply_to(event);
                info.events += 1;
            }
        }
        serde_json::to_string(&info).map_err(|e| js_err("Serialization error", e))
    }

    /// The demo's corpus as JSON.
    pub fn corpus(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.corpus).map_err(|e| js_err("Serialization error", e))
    }

    /// A suggested replacement name for the given culture, or an empty
    /// string if none is available.
    pub fn suggest_name(&self, culture_id: &str) -> String {
        self.engine.suggest_name(&self.corpus, culture_id).unwrap_or_default()
    }
}

impl RenameDemo {
    fn patches_for(
        &self,
        scan_json: &str,
        decisions_json: &str,
        replacement: &str,
    ) -> Result<PatchSet, JsError> {
        let scan: RenameScanResult =
            serde_json::from_str(scan_json).map_err(|e| js_err("Invalid scan JSON", e))?;

        let decisions: DecisionMap =
            serde_json::from_str(decisions_json).map_err(|e| js_err("Invalid decisions JSON", e))?;
        Ok(self.engine.build_patches(&scan, replacement, &decisions, &self.corpus))
    }
}
