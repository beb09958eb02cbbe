/// Engine configuration — matching options and grammar policy, loadable from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// When a "the" directly before a match is folded into the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeterminerPolicy {
    /// Never touch a preceding "the".
    Keep,
    /// Absorb it only when the replacement brings its own leading "the".
    #[default]
    AbsorbDuplicate,
    /// Also absorb it before a capitalised replacement ("the Ashen Order" → "Mira").
    AbsorbBeforeProperNoun,
}

/// How a possessive suffix is written after the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PossessiveStyle {
    /// Always `'s`, even after a final s.
    Standard,
    /// A bare apostrophe after a final s, `'s` otherwise.
    #[default]
    BareApostropheAfterS,
}

/// Heuristics used by the grammar adjuster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarPolicy {
    #[serde(default = "default_true")]
    pub article_agreement: bool,
    #[serde(default)]
    pub determiner: DeterminerPolicy,
    #[serde(default)]
    pub possessive: PossessiveStyle,
    /// Vowel-initial prefixes that still take "a" ("a unicorn", "a one-eyed").
    #[serde(default = "default_consonant_sound_prefixes")]
    pub consonant_sound_prefixes: Vec<String>,
    /// Consonant-initial prefixes that take "an" ("an hour").
    #[serde(default = "default_vowel_sound_prefixes")]
    pub vowel_sound_prefixes: Vec<String>,
}

impl Default for GrammarPolicy {
    fn default() -> Self {
        Self {
            article_agreement: true,
            determiner: DeterminerPolicy::default(),
            possessive: PossessiveStyle::default(),
            consonant_sound_prefixes: default_consonant_sound_prefixes(),
            vowel_sound_prefixes: default_vowel_sound_prefixes(),
        }
    }
}

/// Top-level configuration for scanning and patch building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameConfig {
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// Bytes of context captured on each side of a match.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Name tokens shorter than this never produce partial matches.
    #[serde(default = "default_min_fragment_len")]
    pub min_fragment_len: usize,
    #[serde(default = "default_fragment_stopwords")]
    pub fragment_stopwords: Vec<String>,
    #[serde(default)]
    pub grammar: GrammarPolicy,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            context_window: default_context_window(),
            min_fragment_len: default_min_fragment_len(),
            fragment_stopwords: default_fragment_stopwords(),
            grammar: GrammarPolicy::default(),
        }
    }
}

impl RenameConfig {
    pub fn load_from_ron(path: &Path) -> Result<RenameConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<RenameConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.fragment_stopwords
            .iter()
            .any(|w| w.eq_ignore_ascii_case(token))
    }
}

fn default_true() -> bool {
    true
}

fn default_context_window() -> usize {
    80
}

fn default_min_fragment_len() -> usize {
    3
}

fn default_fragment_stopwords() -> Vec<String> {
    ["the", "of", "and", "a", "an", "in", "on", "at", "to", "von", "van", "de", "la", "le"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_consonant_sound_prefixes() -> Vec<String> {
    ["uni", "use", "usu", "uti", "ura", "eu", "ewe", "one", "once", "ouija"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_vowel_sound_prefixes() -> Vec<String> {
    ["hour", "honest", "honor", "honour", "heir"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
