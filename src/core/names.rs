/// Replacement name suggestions — a character-level Markov chain trained
/// on a culture's sample names.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::culture::Culture;

#[derive(Debug, Error)]
pub enum NameError {
    #[error("culture '{0}' has no sample names")]
    NoSamples(String),
    #[error("chain order must be 1-4, got {0}")]
    InvalidOrder(usize),
}

/// Padding symbol marking the start of a name.
const NAME_START: char = '\u{2}';
/// Symbol marking the end of a name.
const NAME_END: char = '\u{3}';

/// Produces candidate replacement names. Suggestions only; nothing in the
/// rename workflow depends on one being available.
pub trait NameGenerator {
    fn suggest(&self, culture: &Culture, rng: &mut StdRng) -> Option<String>;
}

/// Transition table over characters: prefix → [(next char, count)].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameModel {
    pub order: usize,
    pub transitions: FxHashMap<String, Vec<(char, u32)>>,
}

impl NameModel {
    /// Train on `names` with `order` characters of history.
    pub fn train(names: &[String], order: usize) -> Result<NameModel, NameError> {
        if !(1..=4).contains(&order) {
            return Err(NameError::InvalidOrder(order));
        }
        let mut transitions: FxHashMap<String, Vec<(char, u32)>> = FxHashMap::default();
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            let mut padded: Vec<char> = vec![NAME_START; order];
            padded.extend(name.chars());
            padded.push(NAME_END);
            for window in padded.windows(order + 1) {
                let prefix: String = window[..order].iter().collect();
                add_transition(&mut transitions, prefix, window[order]);
            }
        }
        Ok(NameModel { order, transitions })
    }

    /// Walk the chain once. Returns `None` if the walk dead-ends or runs
    /// past `max_len` characters.
    pub fn generate(&self, rng: &mut StdRng, max_len: usize) -> Option<String> {
        let mut state: Vec<char> = vec![NAME_START; self.order];
        let mut out = String::new();
        for _ in 0..=max_len {
            let prefix: String = state.iter().collect();
            let next = pick_next(self.transitions.get(&prefix)?, rng)?;
            if next == NAME_END {
                return (!out.trim().is_empty()).then(|| out.trim().to_string());
            }
            out.push(next);
            state.remove(0);
            state.push(next);
        }
        None
    }
}

fn add_transition(table: &mut FxHashMap<String, Vec<(char, u32)>>, prefix: String, next: char) {
    let entries = table.entry(prefix).or_default();
    if let Some(entry) = entries.iter_mut().find(|(c, _)| *c == next) {
        entry.1 += 1;
    } else {
        entries.push((next, 1));
    }
}

fn pick_next(options: &[(char, u32)], rng: &mut StdRng) -> Option<char> {
    let weights: Vec<u32> = options.iter().map(|(_, count)| *count).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(options[dist.sample(rng)].0)
}

/// Suggests names that read like a culture's samples without copying one.
#[derive(Debug, Clone)]
pub struct MarkovNameGenerator {
    pub order: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub attempts: usize,
}

impl Default for MarkovNameGenerator {
    fn default() -> Self {
        Self {
            order: 2,
            min_len: 3,
            max_len: 24,
            attempts: 64,
        }
    }
}

impl MarkovNameGenerator {
    pub fn try_suggest(
        &self,
        culture: &Culture,
        rng: &mut StdRng,
    ) -> Result<Option<String>, NameError> {
        if culture.sample_names.is_empty() {
            return Err(NameError::NoSamples(culture.id.clone()));
        }
        let model = NameModel::train(&culture.sample_names, self.order)?;
        let known: FxHashSet<&str> = culture.sample_names.iter().map(|n| n.trim()).collect();

        for _ in 0..self.attempts {
            let Some(name) = model.generate(rng, self.max_len) else {
                continue;
            };
            if name.chars().count() >= self.min_len && !known.contains(name.as_str()) {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }
}

impl NameGenerator for MarkovNameGenerator {
    fn suggest(&self, culture: &Culture, rng: &mut StdRng) -> Option<String> {
        self.try_suggest(culture, rng).ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn northmen() -> Culture {
        Culture {
            id: "northmen".to_string(),
            name: "Northmen".to_string(),
            sample_names: [
                "Mira Holt", "Oskar Venn", "Sigrun Vale", "Halvard Thale", "Maren Holm",
                "Ingrid Varn", "Torvald Hesk", "Astrid Morn", "Bjorn Helle", "Sven Marl",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    #[test]
    fn train_builds_start_transitions() {
        let model = NameModel::train(&["Ana".to_string(), "Ari".to_string()], 1).unwrap();
        let starts = &model.transitions[&NAME_START.to_string()];
        assert_eq!(starts, &vec![('A', 2)]);
        assert!(model.transitions.contains_key("A"));
    }

    #[test]
    fn invalid_order_rejected() {
        assert!(matches!(NameModel::train(&[], 0), Err(NameError::InvalidOrder(0))));
        assert!(matches!(NameModel::train(&[], 9), Err(NameError::InvalidOrder(9))));
    }

    #[test]
    fn suggestion_is_deterministic_per_seed() {
        let generator = MarkovNameGenerator::default();
        let a = generator.suggest(&northmen(), &mut StdRng::seed_from_u64(7));
        let b = generator.suggest(&northmen(), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn suggestion_is_novel_and_bounded() {
        let generator = MarkovNameGenerator::default();
        let culture = northmen();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            if let Some(name) = generator.suggest(&culture, &mut rng) {
                assert!(!culture.sample_names.contains(&name));
                assert!(name.chars().count() >= generator.min_len);
                assert!(name.chars().count() <= generator.max_len);
            }
        }
    }

    #[test]
    fn empty_culture_has_no_suggestion() {
        let culture = Culture {
            id: "void".to_string(),
            name: "Void".to_string(),
            sample_names: vec![],
        };

        let generator = MarkovNameGenerator::default();
        assert!(matches!(
            generator.try_suggest(&culture, &mut StdRng::seed_from_u64(1)),
            Err(NameError::NoSamples(_))
        ));
        assert!(generator.suggest(&culture, &mut StdRng::seed_from_u64(1)).is_none());
    }
}
