//! Gradient-boosted regression trees in the LightGBM text model format.
//!
//! Only what the SEO regressor needs is supported: a single regression output
//! built from numerical splits. Models produced by LightGBM's
//! `save_model()` and by [`crate::train`] load the same way.
//!
//! # Example
//!
//! ```rust
//! use storescope_core::model::GbdtModel;
//!
//! let text = "tree\nversion=v3\nmax_feature_idx=0\nobjective=regression\nfeature_names=x\n\n\
//!             Tree=0\nnum_leaves=2\nnum_cat=0\nsplit_feature=0\nthreshold=5\ndecision_type=2\n\
//!             left_child=-1\nright_child=-2\nleaf_value=1 3\nshrinkage=1\n\n\nend of trees\n";
//! let model = GbdtModel::from_text(text).unwrap();
//! assert_eq!(model.predict(&[4.0]).unwrap(), 1.0);
//! assert_eq!(model.predict(&[6.0]).unwrap(), 3.0);
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::metrics::{FEATURE_COUNT, FEATURE_NAMES, SeoMetrics};
use crate::{Result, ScopeError};

/// Default on-disk location of the trained SEO model.
pub const DEFAULT_MODEL_PATH: &str = "model/seo_model.txt";

const CATEGORICAL_MASK: u8 = 1;
const DEFAULT_LEFT_MASK: u8 = 2;
const ZERO_THRESHOLD: f64 = 1e-35;

/// How a split routes missing values, from bits 2-3 of `decision_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingType {
    None,
    Zero,
    NaN,
}

impl MissingType {
    fn from_decision_type(decision_type: u8) -> Self {
        match (decision_type >> 2) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        }
    }
}

/// One regression tree.
///
/// Internal nodes are indexed from 0. A negative child `c` points at leaf `!c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub split_feature: Vec<usize>,
    pub threshold: Vec<f64>,
    pub decision_type: Vec<u8>,
    pub left_child: Vec<i32>,
    pub right_child: Vec<i32>,
    pub leaf_value: Vec<f64>,
    pub shrinkage: f64,
}

impl Tree {
    /// A tree with no splits that always outputs `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            split_feature: Vec::new(),
            threshold: Vec::new(),
            decision_type: Vec::new(),
            left_child: Vec::new(),
            right_child: Vec::new(),
            leaf_value: vec![value],
            shrinkage: 1.0,
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.leaf_value.len()
    }

    /// Output of this tree for one feature row.
    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.split_feature.is_empty() {
            return self.leaf_value[0];
        }

        let mut node: i32 = 0;
        while node >= 0 {
            let n = node as usize;
            node = self.next_node(n, features[self.split_feature[n]]);
        }

        self.leaf_value[!node as usize]
    }

    fn next_node(&self, node: usize, value: f64) -> i32 {
        let decision_type = self.decision_type[node];
        let missing = MissingType::from_decision_type(decision_type);

        let mut value = value;
        if value.is_nan() && missing != MissingType::NaN {
            value = 0.0;
        }

        let is_missing = (missing == MissingType::Zero && value.abs() <= ZERO_THRESHOLD)
            || (missing == MissingType::NaN && value.is_nan());

        let go_left = if is_missing {
            decision_type & DEFAULT_LEFT_MASK != 0
        } else {
            value <= self.threshold[node]
        };

        if go_left { self.left_child[node] } else { self.right_child[node] }
    }

    fn validate(&self, index: usize, num_features: usize) -> Result<()> {
        let invalid = |msg: String| ScopeError::ModelFormat(format!("Tree={}: {}", index, msg));

        let leaves = self.leaf_value.len();
        if leaves == 0 {
            return Err(invalid("no leaf values".to_string()));
        }

        let internal = leaves - 1;
        for (name, len) in [
            ("split_feature", self.split_feature.len()),
            ("threshold", self.threshold.len()),
            ("decision_type", self.decision_type.len()),
            ("left_child", self.left_child.len()),
            ("right_child", self.right_child.len()),
        ] {
            if len != internal {
                return Err(invalid(format!("{} has {} entries, expected {}", name, len, internal)));
            }
        }

        let mut parents = vec![0usize; internal];
        for node in 0..internal {
            if self.decision_type[node] & CATEGORICAL_MASK != 0 {
                return Err(invalid("categorical splits are not supported".to_string()));
            }
            if self.split_feature[node] >= num_features {
                return Err(invalid(format!("split on unknown feature {}", self.split_feature[node])));
            }
            for child in [self.left_child[node], self.right_child[node]] {
                let in_range = if child < 0 { (!child as usize) < leaves } else { (child as usize) < internal };
                if !in_range {
                    return Err(invalid(format!("child {} out of range", child)));
                }
                if child >= 0 {
                    let child = child as usize;
                    if child <= node {
                        return Err(invalid(format!("node {} points back to node {}", node, child)));
                    }
                    parents[child] += 1;
                }
            }
        }

        // Every internal node except the root hangs under exactly one parent.
        if let Some(orphan) = (1..internal).find(|&n| parents[n] != 1) {
            return Err(invalid(format!("node {} is referenced {} times", orphan, parents[orphan])));
        }

        Ok(())
    }
}

/// A boosted ensemble of regression trees.
#[derive(Debug, Clone, PartialEq)]
pub struct GbdtModel {
    pub feature_names: Vec<String>,
    pub objective: String,
    pub trees: Vec<Tree>,
}

impl GbdtModel {
    pub fn new(feature_names: Vec<String>, trees: Vec<Tree>) -> Self {
        Self { feature_names, objective: "regression".to_string(), trees }
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Loads a model file.
    ///
    /// # Errors
    ///
    /// [`ScopeError::ModelNotFound`] when `path` does not exist,
    /// [`ScopeError::ModelFormat`] when its content is not a supported model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScopeError::ModelNotFound(path.to_path_buf()));
        }

        let text = fs::read_to_string(path)?;
        let model = Self::from_text(&text)?;
        info!(path = %path.display(), trees = model.trees.len(), "loaded model");
        Ok(model)
    }

    /// Parses the LightGBM text model format.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim);

        match lines.next() {
            Some("tree") => {}
            other => {
                return Err(ScopeError::ModelFormat(format!(
                    "expected 'tree' header, found {:?}",
                    other.unwrap_or_default()
                )));
            }
        }

        let mut header: HashMap<&str, &str> = HashMap::new();
        let mut blocks: Vec<HashMap<&str, &str>> = Vec::new();

        for line in lines {
            if line == "end of trees" {
                break;
            }
            if line.starts_with("Tree=") {
                blocks.push(HashMap::new());
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match blocks.last_mut() {
                Some(block) => block.insert(key, value),
                None => header.insert(key, value),
            };
        }

        let max_feature_idx: usize = parse_scalar(&header, "max_feature_idx")?;
        let num_features = max_feature_idx + 1;

        let feature_names: Vec<String> = match header.get("feature_names") {
            Some(names) => names.split_whitespace().map(str::to_string).collect(),
            None => (0..num_features).map(|i| format!("Column_{}", i)).collect(),
        };
        if feature_names.len() != num_features {
            return Err(ScopeError::ModelFormat(format!(
                "{} feature names for max_feature_idx={}",
                feature_names.len(),
                max_feature_idx
            )));
        }

        if let Some(num_class) = header.get("num_class")
            && num_class.trim() != "1"
        {
            return Err(ScopeError::ModelFormat("only single-output regression models are supported".to_string()));
        }

        let objective = header
            .get("objective")
            .and_then(|o| o.split_whitespace().next())
            .unwrap_or("regression")
            .to_string();

        let mut trees = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let tree = parse_tree(block)?;
            tree.validate(index, num_features)?;
            trees.push(tree);
        }

        if trees.is_empty() {
            return Err(ScopeError::ModelFormat("model contains no trees".to_string()));
        }

        Ok(Self { feature_names, objective, trees })
    }

    /// Serializes the model in the LightGBM text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("tree\nversion=v3\nnum_class=1\nnum_tree_per_iteration=1\nlabel_index=0\n");
        let _ = writeln!(out, "max_feature_idx={}", self.num_features().saturating_sub(1));
        let _ = writeln!(out, "objective={}", self.objective);
        let _ = writeln!(out, "feature_names={}", self.feature_names.join(" "));
        out.push('\n');

        for (index, tree) in self.trees.iter().enumerate() {
            let _ = writeln!(out, "Tree={}", index);
            let _ = writeln!(out, "num_leaves={}", tree.num_leaves());
            out.push_str("num_cat=0\n");
            if tree.num_leaves() > 1 {
                let _ = writeln!(out, "split_feature={}", join(&tree.split_feature));
                let _ = writeln!(out, "threshold={}", join(&tree.threshold));
                let _ = writeln!(out, "decision_type={}", join(&tree.decision_type));
                let _ = writeln!(out, "left_child={}", join(&tree.left_child));
                let _ = writeln!(out, "right_child={}", join(&tree.right_child));
            }
            let _ = writeln!(out, "leaf_value={}", join(&tree.leaf_value));
            let _ = writeln!(out, "shrinkage={}", tree.shrinkage);
            out.push_str("\n\n");
        }

        out.push_str("end of trees\n");
        out
    }

    /// Writes [`GbdtModel::to_text`] to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Predicts one row; the row length must equal the model's feature count.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.num_features() {
            return Err(ScopeError::ModelFormat(format!(
                "model expects {} features, got {}",
                self.num_features(),
                features.len()
            )));
        }

        Ok(self.trees.iter().map(|tree| tree.predict(features)).sum())
    }
}

fn parse_scalar<T: FromStr>(map: &HashMap<&str, &str>, key: &str) -> Result<T> {
    let raw = map
        .get(key)
        .ok_or_else(|| ScopeError::ModelFormat(format!("missing '{}'", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| ScopeError::ModelFormat(format!("invalid value for '{}': {}", key, raw)))
}

fn parse_list<T: FromStr>(map: &HashMap<&str, &str>, key: &str) -> Result<Vec<T>> {
    let Some(raw) = map.get(key) else {
        return Ok(Vec::new());
    };
    raw.split_whitespace()
        .map(|v| {
            v.parse()
                .map_err(|_| ScopeError::ModelFormat(format!("invalid entry '{}' in '{}'", v, key)))
        })
        .collect()
}

fn parse_tree(block: &HashMap<&str, &str>) -> Result<Tree> {
    let num_leaves: usize = parse_scalar(block, "num_leaves")?;
    let num_cat: usize = match block.get("num_cat") {
        Some(_) => parse_scalar(block, "num_cat")?,
        None => 0,
    };
    if num_cat > 0 {
        return Err(ScopeError::ModelFormat("categorical features are not supported".to_string()));
    }

    let tree = Tree {
        split_feature: parse_list(block, "split_feature")?,
        threshold: parse_list(block, "threshold")?,
        decision_type: parse_list(block, "decision_type")?,
        left_child: parse_list(block, "left_child")?,
        right_child: parse_list(block, "right_child")?,
        leaf_value: parse_list(block, "leaf_value")?,
        shrinkage: match block.get("shrinkage") {
            Some(_) => parse_scalar(block, "shrinkage")?,
            None => 1.0,
        },
    };

    if tree.leaf_value.len() != num_leaves {
        return Err(ScopeError::ModelFormat(format!(
            "num_leaves={} but {} leaf values",
            num_leaves,
            tree.leaf_value.len()
        )));
    }

    Ok(tree)
}

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// The SEO regressor: a [`GbdtModel`] over the five page metrics.
#[derive(Debug, Clone)]
pub struct SeoModel {
    model: GbdtModel,
}

impl SeoModel {
    /// Wraps a model, checking that it takes exactly the five SEO features in column order.
    pub fn new(model: GbdtModel) -> Result<Self> {
        if model.num_features() != FEATURE_COUNT {
            return Err(ScopeError::ModelFormat(format!(
                "SEO model must use {} features ({}), found {}",
                FEATURE_COUNT,
                FEATURE_NAMES.join(", "),
                model.num_features()
            )));
        }
        let mismatch = model.feature_names.iter().enumerate().find(|(i, name)| name.as_str() != FEATURE_NAMES[*i]);
        if let Some((i, found)) = mismatch {
            return Err(ScopeError::ModelFormat(format!(
                "SEO model feature {} is '{}', expected '{}'",
                i, found, FEATURE_NAMES[i]
            )));
        }
        Ok(Self { model })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(GbdtModel::load(path)?)
    }

    pub fn inner(&self) -> &GbdtModel {
        &self.model
    }

    /// Predicted SEO score for a page.
    pub fn predict(&self, metrics: &SeoMetrics) -> Result<f64> {
        self.model.predict(&metrics.features())
    }
}
