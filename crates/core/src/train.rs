//! Least-squares gradient boosting over regression trees.
//!
//! Trees grow leaf-wise: the leaf with the largest variance reduction is split
//! next, until `max_leaves` is reached or no split satisfies `max_depth` and
//! `min_samples_leaf`. The mean target is folded into the first tree so the
//! resulting [`GbdtModel`] predicts by summing tree outputs alone.

use tracing::{debug, info};

use crate::dataset::Sample;
use crate::metrics::{FEATURE_COUNT, FEATURE_NAMES};
use crate::model::{GbdtModel, Tree};
use crate::{Result, ScopeError};

/// `decision_type` for a numerical split, missing values treated as zero-valued input, default left.
const NUMERICAL_DEFAULT_LEFT: u8 = 2;

/// Boosting hyperparameters.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of boosting rounds (default: 100).
    pub n_estimators: usize,
    /// Shrinkage applied to every tree (default: 0.1).
    pub learning_rate: f64,
    /// Maximum depth of any leaf (default: 5).
    pub max_depth: usize,
    /// Maximum leaves per tree (default: 31).
    pub max_leaves: usize,
    /// Minimum rows on each side of a split (default: 20).
    pub min_samples_leaf: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { n_estimators: 100, learning_rate: 0.1, max_depth: 5, max_leaves: 31, min_samples_leaf: 20 }
    }
}

/// Best split found for a leaf.
#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A leaf under construction. `sorted[f]` holds its rows ordered by feature `f`.
struct GrowingLeaf {
    sorted: Vec<Vec<usize>>,
    depth: usize,
    /// Internal node that points at this leaf, and whether as its left child.
    parent: Option<(usize, bool)>,
    best: Option<Split>,
}

impl GrowingLeaf {
    fn rows(&self) -> &[usize] {
        &self.sorted[0]
    }
}

/// Trains an SEO regressor on `samples`.
pub fn train(samples: &[Sample], config: &TrainConfig) -> Result<GbdtModel> {
    if samples.is_empty() {
        return Err(ScopeError::ModelFormat("cannot train on an empty dataset".to_string()));
    }
    if config.n_estimators == 0 || config.max_leaves == 0 {
        return Err(ScopeError::ModelFormat("n_estimators and max_leaves must be positive".to_string()));
    }

    let features: Vec<[f64; FEATURE_COUNT]> = samples.iter().map(Sample::features).collect();
    let targets: Vec<f64> = samples.iter().map(Sample::target).collect();

    let base = targets.iter().sum::<f64>() / targets.len() as f64;
    let mut predictions = vec![base; samples.len()];

    let presorted: Vec<Vec<usize>> = (0..FEATURE_COUNT)
        .map(|f| {
            let mut rows: Vec<usize> = (0..samples.len()).collect();
            rows.sort_by(|&a, &b| features[a][f].total_cmp(&features[b][f]));
            rows
        })
        .collect();

    info!(
        rows = samples.len(),
        rounds = config.n_estimators,
        learning_rate = config.learning_rate,
        "training SEO model"
    );

    let mut trees = Vec::with_capacity(config.n_estimators);
    for round in 0..config.n_estimators {
        let residuals: Vec<f64> = targets.iter().zip(&predictions).map(|(y, p)| y - p).collect();
        let (mut tree, leaf_rows) = grow_tree(&features, &residuals, &presorted, config);

        for (leaf, rows) in leaf_rows.iter().enumerate() {
            for &row in rows {
                predictions[row] += tree.leaf_value[leaf];
            }
        }

        if round == 0 {
            for value in tree.leaf_value.iter_mut() {
                *value += base;
            }
        }

        if round % 10 == 9 {
            debug!(round = round + 1, rmse = rmse_of(&targets, &predictions), "boosting progress");
        }

        trees.push(tree);
    }

    let names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    Ok(GbdtModel::new(names, trees))
}

/// Grows one tree on the residuals. Returns the tree and the rows in each leaf.
fn grow_tree(
    features: &[[f64; FEATURE_COUNT]],
    residuals: &[f64],
    presorted: &[Vec<usize>],
    config: &TrainConfig,
) -> (Tree, Vec<Vec<usize>>) {
    let mut tree = Tree::constant(0.0);
    tree.leaf_value.clear();
    tree.shrinkage = config.learning_rate;

    let mut root = GrowingLeaf { sorted: presorted.to_vec(), depth: 0, parent: None, best: None };
    root.best = find_best_split(&root, features, residuals, config);
    let mut leaves = vec![root];

    while leaves.len() < config.max_leaves {
        let candidate = leaves
            .iter()
            .enumerate()
            .filter_map(|(i, leaf)| leaf.best.map(|s| (i, s)))
            .max_by(|(_, a), (_, b)| a.gain.total_cmp(&b.gain));

        let Some((leaf_index, split)) = candidate else {
            break;
        };

        let node = tree.split_feature.len();
        let new_leaf = leaves.len();

        tree.split_feature.push(split.feature);
        tree.threshold.push(split.threshold);
        tree.decision_type.push(NUMERICAL_DEFAULT_LEFT);
        tree.left_child.push(!(leaf_index as i32));
        tree.right_child.push(!(new_leaf as i32));

        if let Some((parent, is_left)) = leaves[leaf_index].parent {
            if is_left {
                tree.left_child[parent] = node as i32;
            } else {
                tree.right_child[parent] = node as i32;
            }
        }

        let goes_left = |row: usize| features[row][split.feature] <= split.threshold;
        let depth = leaves[leaf_index].depth + 1;

        let (left_sorted, right_sorted): (Vec<Vec<usize>>, Vec<Vec<usize>>) = leaves[leaf_index]
            .sorted
            .iter()
            .map(|rows| rows.iter().partition::<Vec<usize>, _>(|&&row| goes_left(row)))
            .unzip();

        let mut left = GrowingLeaf { sorted: left_sorted, depth, parent: Some((node, true)), best: None };
        let mut right = GrowingLeaf { sorted: right_sorted, depth, parent: Some((node, false)), best: None };
        left.best = find_best_split(&left, features, residuals, config);
        right.best = find_best_split(&right, features, residuals, config);

        leaves[leaf_index] = left;
        leaves.push(right);
    }

    let mut leaf_rows = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let rows = leaf.rows().to_vec();
        let mean = rows.iter().map(|&r| residuals[r]).sum::<f64>() / rows.len().max(1) as f64;
        tree.leaf_value.push(config.learning_rate * mean);
        leaf_rows.push(rows);
    }

    (tree, leaf_rows)
}

/// Exhaustive search for the split with the largest squared-error reduction.
fn find_best_split(
    leaf: &GrowingLeaf,
    features: &[[f64; FEATURE_COUNT]],
    residuals: &[f64],
    config: &TrainConfig,
) -> Option<Split> {
    let n = leaf.rows().len();
    let min_leaf = config.min_samples_leaf.max(1);
    if leaf.depth >= config.max_depth || n < 2 * min_leaf {
        return None;
    }

    let total: f64 = leaf.rows().iter().map(|&r| residuals[r]).sum();
    let parent_score = total * total / n as f64;

    let mut best: Option<Split> = None;
    for (feature, rows) in leaf.sorted.iter().enumerate() {
        let mut left_sum = 0.0;
        for i in 1..n {
            left_sum += residuals[rows[i - 1]];

            if i < min_leaf || n - i < min_leaf {
                continue;
            }

            let lo = features[rows[i - 1]][feature];
            let hi = features[rows[i]][feature];
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / i as f64 + right_sum * right_sum / (n - i) as f64 - parent_score;

            if gain > 1e-12 && best.is_none_or(|b| gain > b.gain) {
                best = Some(Split { feature, threshold: lo + (hi - lo) / 2.0, gain });
            }
        }
    }

    best
}

fn rmse_of(targets: &[f64], predictions: &[f64]) -> f64 {
    let mse = targets
        .iter()
        .zip(predictions)
        .map(|(y, p)| (y - p) * (y - p))
        .sum::<f64>()
        / targets.len().max(1) as f64;
    mse.sqrt()
}

/// Root mean squared error of `model` over `samples`.
pub fn rmse(model: &GbdtModel, samples: &[Sample]) -> Result<f64> {
    let targets: Vec<f64> = samples.iter().map(Sample::target).collect();
    let predictions = samples
        .iter()
        .map(|s| model.predict(&s.features()))
        .collect::<Result<Vec<f64>>>()?;
    Ok(rmse_of(&targets, &predictions))
}
