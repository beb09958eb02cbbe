use serde::{Deserialize, Serialize};

/// A naming culture: the sample names that replacement suggestions are
/// trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Culture {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sample_names: Vec<String>,
}
