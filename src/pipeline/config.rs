use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::clean::MissingValuePolicy;
use crate::error::{Error, Result};
use crate::ml::forest::ForestParams;
use crate::ml::trainer::TrainerConfig;

/// Settings for the cleaning and training stages.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// overrides:
///
/// ```json
/// { "impute_policy": "median", "impute_columns": ["stock_level"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub impute_policy: MissingValuePolicy,
    pub impute_columns: Vec<String>,
    pub date_column: String,
    /// strftime-style output format for `date_column`.
    pub date_format: String,
    pub category_column: String,
    pub test_fraction: f64,
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let forest = ForestParams::default();
        Self {
            impute_policy: MissingValuePolicy::Mean,
            impute_columns: vec![
                "stock_level".into(),
                "sales".into(),
                "reorder_point".into(),
            ],
            date_column: "last_updated".into(),
            date_format: "%Y-%m-%d".into(),
            category_column: "product_category".into(),
            test_fraction: 0.2,
            seed: forest.seed,
            n_estimators: forest.n_estimators,
            max_depth: forest.max_depth,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.n_estimators == 0 {
            return Err(Error::Config("n_estimators must be at least 1".into()));
        }
        Ok(())
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            test_fraction: self.test_fraction,
            seed: self.seed,
            forest: ForestParams {
                n_estimators: self.n_estimators,
                seed: self.seed,
                max_depth: self.max_depth,
                ..ForestParams::default()
            },
        }
    }
}
