/// Rename workflow — the engine facade and the per-rename session state.
///
/// `RenameEngine` holds configuration and exposes the synchronous steps.
/// `RenameSession` walks one rename from input through review to apply,
/// talking to storage only through the collaborator traits.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RenameConfig};
use crate::core::apply::{ApplyFailure, ApplySummary, PatchApplier};
use crate::core::decision::{DecisionCounts, DecisionMap};
use crate::core::names::{MarkovNameGenerator, NameGenerator};
use crate::core::patch::{build_patches, PatchSet};
use crate::core::preview::{render, PreviewLine};
use crate::core::scanner::{scan, MatchId, RenameScanResult, ScanError, ScanRequest};
use crate::schema::corpus::Corpus;
use crate::schema::entity::{Entity, EntityId};
use crate::storage::{ChronicleStore, CorpusLoader, CorpusStore, EntitySource, StorageError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Apply(#[from] ApplyFailure),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("cannot {action} while {phase:?}")]
    InvalidPhase { action: &'static str, phase: SessionPhase },
}

/// Configured entry point for scanning, patch building and previews.
#[derive(Debug, Clone)]
pub struct RenameEngine {
    config: RenameConfig,
    seed: u64,
    names: MarkovNameGenerator,
}

/// Builder for constructing a `RenameEngine`.
#[derive(Debug, Default)]
pub struct RenameEngineBuilder {
    config: Option<RenameConfig>,
    config_path: Option<String>,
    seed: u64,
}

impl RenameEngine {
    pub fn builder() -> RenameEngineBuilder {
        RenameEngineBuilder::default()
    }

    pub fn config(&self) -> &RenameConfig {
        &self.config
    }

    pub fn scan(
        &self,
        corpus: &Corpus,
        request: &ScanRequest,
    ) -> Result<RenameScanResult, ScanError> {
        scan(corpus, request, &self.config)
    }

    pub fn build_patches(
        &self,
        result: &RenameScanResult,
        replacement: &str,
        decisions: &DecisionMap,
        corpus: &Corpus,
    ) -> PatchSet {
        build_patches(result, replacement, decisions, corpus, &self.config.grammar)
    }

    /// Preview every actionable match under its current decision, in scan
    /// order.
    pub fn preview(
        &self,
        result: &RenameScanResult,
        replacement: &str,
        decisions: &DecisionMap,
    ) -> Vec<(MatchId, PreviewLine)> {
        result
            .actionable()
            .map(|m| {
                let decision = decisions.get(m.id);
                let grammar = &self.config.grammar;
                (m.id, render(m, decision, &result.old_name, replacement, grammar))
            })
            .collect()
    }

    /// Suggest a fresh name for an entity of the given culture. Returns
    /// `None` when the culture is unknown or has no usable samples.
    pub fn suggest_name(&self, corpus: &Corpus, culture_id: &str) -> Option<String> {
        let culture = corpus.culture(culture_id)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.names.suggest(culture, &mut rng)
    }
}

impl RenameEngineBuilder {
    pub fn with_config(mut self, config: RenameConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from a RON file at build time. A config given
    /// with `with_config` takes precedence.
    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<RenameEngine, ConfigError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => RenameConfig::load_from_ron(Path::new(&path))?,
            (None, None) => RenameConfig::default(),
        };
        Ok(RenameEngine {
            config,
            seed: self.seed,
            names: MarkovNameGenerator::default(),
        })
    }
}

/// Where a rename session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Input,
    Scanning,
    Preview,
    Applying,
    Done,
    Failed,
}

/// Outcome of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub summary: ApplySummary,
    pub decisions: DecisionCounts,
    pub accepted: usize,
    pub applied: usize,
    pub skipped: Vec<MatchId>,
}

/// One rename, from request to written patches.
#[derive(Debug)]
pub struct RenameSession {
    engine: RenameEngine,
    run_id: String,
    phase: SessionPhase,
    scan: Option<RenameScanResult>,
    decisions: DecisionMap,
}

impl RenameSession {
    pub fn new(engine: RenameEngine, run_id: impl Into<String>) -> Self {
        Self {
            engine,
            run_id: run_id.into(),
            phase: SessionPhase::Input,
            scan: None,
            decisions: DecisionMap::default(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn scan_result(&self) -> Option<&RenameScanResult> {
        self.scan.as_ref()
    }

    pub fn decisions(&self) -> &DecisionMap {
        &self.decisions
    }

    /// Decisions are editable only while previewing.
    pub fn decisions_mut(&mut self) -> Result<&mut DecisionMap, SessionError> {
        self.expect_phase(SessionPhase::Preview, "edit decisions")?;
        Ok(&mut self.decisions)
    }

    /// Fetch the entity being renamed, with its current name and culture,
    /// before a request exists. Does not change the phase.
    pub async fn load_entity(
        &self,
        entities: &dyn EntitySource,
        entity_id: &EntityId,
    ) -> Result<Entity, SessionError> {
        let found = entities
            .get_entities_for_run(&self.run_id)
            .await?
            .into_iter()
            .find(|e| &e.id == entity_id);
        found.ok_or_else(|| ScanError::EntityNotFound(entity_id.clone()).into())
    }

    /// Load the run and scan it. A failed scan leaves the session back at
    /// `Input` with nothing retained.
    pub async fn scan(
        &mut self,
        loader: &dyn CorpusLoader,
        request: &ScanRequest,
    ) -> Result<&RenameScanResult, SessionError> {
        if !matches!(self.phase, SessionPhase::Input | SessionPhase::Preview) {
            return Err(SessionError::InvalidPhase { action: "scan", phase: self.phase });
        }
        self.phase = SessionPhase::Scanning;
        self.scan = None;

        let outcome = match loader.load_corpus(&self.run_id).await {
            Ok(corpus) => self.engine.scan(&corpus, request).map_err(SessionError::from),
            Err(e) => Err(SessionError::Scan(ScanError::Storage(e))),
        };
        match outcome {
            Ok(result) => {
                self.decisions = DecisionMap::defaults_for(&result);
                self.phase = SessionPhase::Preview;
                Ok(&*self.scan.insert(result))
            }
            Err(e) => {
                warn!(
                    run_id = %self.run_id,
                    entity = %request.entity_id,
                    error = %e,
                    "scan failed"
                );
                self.decisions = DecisionMap::default();
                self.phase = SessionPhase::Input;
                Err(e)
            }
        }
    }

    /// Drop the scan and decisions. Nothing has been written before apply,
    /// so there is nothing to undo.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Applying {
            return Err(SessionError::InvalidPhase { action: "cancel", phase: self.phase });
        }
        debug!(run_id = %self.run_id, "rename cancelled");
        self.scan = None;
        self.decisions = DecisionMap::default();
        self.phase = SessionPhase::Input;
        Ok(())
    }

    /// Build patches against a freshly loaded corpus and write them.
    ///
    /// The reload is what makes the stale guard meaningful: anything changed
    /// since the scan is skipped rather than overwritten.
    pub async fn apply(
        &mut self,
        loader: &dyn CorpusLoader,
        chronicles: &dyn ChronicleStore,
        corpus_store: &dyn CorpusStore,
        replacement: &str,
    ) -> Result<ApplyReport, SessionError> {
        self.expect_phase(SessionPhase::Preview, "apply")?;
        let Some(result) = self.scan.as_ref() else {
            return Err(SessionError::InvalidPhase { action: "apply", phase: self.phase });
        };
        self.phase = SessionPhase::Applying;

        let current = match loader.load_corpus(&self.run_id).await {
            Ok(corpus) => corpus,
            Err(e) => {
                self.phase = SessionPhase::Failed;
                return Err(e.into());
            }
        };
        let patches = self.engine.build_patches(result, replacement, &self.decisions, &current);

        match PatchApplier::new(chronicles, corpus_store).apply(&self.run_id, &patches).await {
            Ok(summary) => {
                self.phase = SessionPhase::Done;
                let report = ApplyReport {
                    summary,
                    decisions: self.decisions.counts(),
                    accepted: patches.accepted,
                    applied: patches.applied,
                    skipped: patches.skipped,
                };
                info!(
                    run_id = %self.run_id,
                    %summary,
                    skipped = report.skipped.len(),
                    "rename applied"
                );
                Ok(report)
            }
            Err(failure) => {
                self.phase = SessionPhase::Failed;
                Err(failure.into())
            }
        }
    }

    fn expect_phase(&self, wanted: SessionPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase { action, phase: self.phase })
        }
    }
}
