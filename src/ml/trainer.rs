use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::features::{FeatureMatrix, Target};
use super::forest::{ForestParams, RandomForest};
use crate::error::{Error, Result};

/// Split and ensemble settings. The defaults give an 80/20 split and 100
/// trees, both seeded with 42.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            forest: ForestParams::default(),
        }
    }
}

/// A fitted model bound to the exact feature columns it was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    feature_columns: Vec<String>,
    target_column: String,
    forest: RandomForest,
}

impl TrainedModel {
    /// Feature columns in fit order.
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub(crate) fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

/// Held-out evaluation of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingReport {
    /// Mean squared error on the held-out rows.
    pub mse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Row counts of a seeded train/test split: `ceil(n * test_fraction)` rows
/// are held out.
pub fn split_sizes(n: usize, test_fraction: f64) -> (usize, usize) {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_test = n_test.min(n);
    (n - n_test, n_test)
}

/// Shuffle `0..n` with `seed` and cut it into (train, test) indices.
fn split_indices(n: usize, n_test: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = order.split_off(n_test);
    (train, order)
}

/// Fit the ensemble on a seeded training subset of `(x, y)` and score it
/// on the held-out rest.
pub fn train(
    x: &FeatureMatrix,
    y: &Target,
    config: &TrainerConfig,
) -> Result<(TrainedModel, TrainingReport)> {
    if !(config.test_fraction > 0.0 && config.test_fraction < 1.0) {
        return Err(Error::Config(format!(
            "test_fraction must be in (0, 1), got {}",
            config.test_fraction
        )));
    }
    if x.n_rows() != y.len() {
        return Err(Error::Fit(format!(
            "{} feature rows but {} targets",
            x.n_rows(),
            y.len()
        )));
    }

    let n = x.n_rows();
    let (n_train, n_test) = split_sizes(n, config.test_fraction);
    if n_train == 0 || n_test == 0 {
        return Err(Error::InsufficientData(format!(
            "{n} rows split into {n_train} training and {n_test} held-out rows"
        )));
    }

    let rows = x.numeric_rows().map_err(|e| Error::Fit(e.to_string()))?;
    let targets = y.numeric().map_err(|e| Error::Fit(e.to_string()))?;

    let (train_idx, test_idx) = split_indices(n, n_test, config.seed);
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
        idx.iter().map(|&i| (rows[i].clone(), targets[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    let forest = RandomForest::fit(&x_train, &y_train, &config.forest)?;
    let mse = x_test
        .iter()
        .zip(&y_test)
        .map(|(row, truth)| (forest.predict_row(row) - truth).powi(2))
        .sum::<f64>()
        / n_test as f64;

    let report = TrainingReport {
        mse,
        train_rows: n_train,
        test_rows: n_test,
    };
    log::debug!(
        "fitted {} trees on {n_train} rows, held-out MSE {mse}",
        forest.n_trees()
    );

    let model = TrainedModel {
        feature_columns: x.names().to_vec(),
        target_column: y.name.clone(),
        forest,
    };
    Ok((model, report))
}
