use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::errors::{AnalysisError, Result};

/// Settings shared by every pipeline stage for one run.
///
/// Passed explicitly to the cleaner and both analyzers. Stored on disk as a
/// JSON object; any omitted field falls back to its default:
/// ```json
/// {
///   "allowed_categories": ["Movies", "Movies & TV"],
///   "top_n": 5,
///   "min_rating": 1.0,
///   "max_rating": 5.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub allowed_categories: BTreeSet<String>,
    pub top_n: usize,
    pub min_rating: f64,
    pub max_rating: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            allowed_categories: ["Movies", "Movies & TV"]
                .into_iter()
                .map(String::from)
                .collect(),
            top_n: 5,
            min_rating: 1.0,
            max_rating: 5.0,
        }
    }
}

impl AnalysisConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(AnalysisError::Config("top_n must be at least 1".into()));
        }
        if self.allowed_categories.is_empty() {
            return Err(AnalysisError::Config(
                "allowed_categories must not be empty".into(),
            ));
        }
        if !(self.min_rating.is_finite() && self.max_rating.is_finite())
            || self.min_rating > self.max_rating
        {
            return Err(AnalysisError::Config(format!(
                "invalid rating range [{}, {}]",
                self.min_rating, self.max_rating
            )));
        }
        Ok(())
    }

    pub fn is_allowed(&self, category: &str) -> bool {
        self.allowed_categories.contains(category)
    }
}
