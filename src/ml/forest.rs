//! Bagged regression-tree ensemble.
//!
//! Each tree is a CART regressor grown on a bootstrap sample of the training
//! rows, splitting on the threshold that most reduces squared error. The
//! ensemble prediction is the mean of the tree predictions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Fixed hyperparameters of the ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    /// `None` grows until leaves are pure or minimal.
    pub max_depth: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            seed: 42,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Single tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Nodes live in an arena; index 0 is the root.
#[derive(Debug, Clone, PartialEq)]
struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, params: &ForestParams) -> Self {
        let mut nodes = vec![Node::Leaf(0.0)];
        // (node slot, rows reaching it, depth)
        let mut pending = vec![(0usize, sample, 0usize)];

        while let Some((slot, rows, depth)) = pending.pop() {
            let split = if rows.len() < params.min_samples_split
                || params.max_depth.is_some_and(|d| depth >= d)
            {
                None
            } else {
                best_split(x, y, &rows)
            };

            let Some(split) = split else {
                nodes[slot] = Node::Leaf(mean_of(y, &rows));
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| x[i][split.feature] <= split.threshold);
            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf(0.0));
            nodes.push(Node::Leaf(0.0));
            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            pending.push((left, left_rows, depth + 1));
            pending.push((right, right_rows, depth + 1));
        }

        Self { nodes }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf(v) => return v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len().max(1) as f64
}

/// Split maximising `sum_l²/n_l + sum_r²/n_r`, which is the split with the
/// lowest total squared error. Returns `None` when nothing improves on the
/// parent (pure node, or every feature constant).
fn best_split(x: &[Vec<f64>], y: &[f64], rows: &[usize]) -> Option<BestSplit> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&i| y[i]).sum();
    let parent_score = total * total / n as f64;
    let mut best: Option<BestSplit> = None;

    let n_features = x.first().map_or(0, Vec::len);
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);
    for feature in 0..n_features {
        pairs.clear();
        pairs.extend(rows.iter().map(|&i| (x[i][feature], y[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += pairs[k - 1].1;
            let (lo, hi) = (pairs[k - 1].0, pairs[k].0);
            if lo == hi {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            if best.as_ref().map_or(true, |b| score > b.score) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid >= hi { lo } else { mid };
                best = Some(BestSplit {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }

    best.filter(|b| b.score > parent_score + 1e-12 * parent_score.abs().max(1.0))
}

// ---------------------------------------------------------------------------
// Ensemble
// ---------------------------------------------------------------------------

/// Bootstrap-aggregated regression trees.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit on row-major `x` and targets `y`. Identical inputs and params
    /// always produce the same forest.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::Fit("no training rows".into()));
        }
        if x.len() != y.len() {
            return Err(Error::Fit(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(Error::Fit("n_estimators must be at least 1".into()));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(Error::Fit("no feature columns".into()));
        }
        for (i, row) in x.iter().enumerate() {
            if row.len() != n_features {
                return Err(Error::Fit(format!("row {i} has {} features", row.len())));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(Error::Fit(format!("row {i}, feature {j} is not finite")));
            }
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(Error::Fit(format!("target at row {i} is not finite")));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let sample: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, params)
            })
            .collect();

        Ok(Self { trees, n_features })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the tree predictions for one row of `n_features` values.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.n_features);
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}
