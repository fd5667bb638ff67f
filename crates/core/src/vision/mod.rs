//! Zero-shot product labelling of photos.
//!
//! A classifier scores an image against a list of text labels; the most
//! probable labels become web-search queries.

#[cfg(feature = "clip")]
mod clip;

#[cfg(feature = "clip")]
pub use clip::{CLIP_MEAN, CLIP_MODEL_ID, CLIP_MODEL_REVISION, CLIP_STD, ClipClassifier, load_image_tensor};

use std::cmp::Ordering;

use crate::{Result, ScopeError};

/// Product categories tried when the caller supplies none.
pub const DEFAULT_LABELS: [&str; 19] = [
    "engagement ring",
    "ring",
    "diamond ring",
    "gold ring",
    "necklace",
    "bracelet",
    "wrist watch",
    "handbag",
    "sneakers",
    "laptop",
    "smartphone",
    "headphones",
    "camera",
    "gaming console",
    "dress",
    "jeans",
    "t-shirt",
    "sunglasses",
    "perfume",
];

/// Text prompt the vision-language model compares the image against.
pub fn label_prompt(label: &str) -> String {
    format!("a photo of a {}", label)
}

pub fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}

/// Scores an image against candidate labels.
pub trait ImageClassifier: Send + Sync {
    /// Probability of each label (same order as `labels`), summing to 1.
    fn label_probabilities(&self, image: &[u8], labels: &[String]) -> Result<Vec<f32>>;
}

/// A label with its probability.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

/// All labels ranked by probability, most likely first.
///
/// An empty `labels` slice means [`DEFAULT_LABELS`].
pub fn rank_labels<C: ImageClassifier + ?Sized>(
    classifier: &C,
    image: &[u8],
    labels: &[String],
) -> Result<Vec<LabelScore>> {
    let defaults;
    let labels = if labels.is_empty() {
        defaults = default_labels();
        &defaults[..]
    } else {
        labels
    };

    let probabilities = classifier.label_probabilities(image, labels)?;
    if probabilities.len() != labels.len() {
        return Err(ScopeError::Vision(format!(
            "classifier returned {} scores for {} labels",
            probabilities.len(),
            labels.len()
        )));
    }

    let mut ranked: Vec<LabelScore> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, probability)| LabelScore { label: label.clone(), probability })
        .collect();

    ranked.sort_by(|a, b| b.probability.partial_cmp(&a.probability).unwrap_or(Ordering::Equal));
    Ok(ranked)
}

/// The `top_k` most probable labels; at least one label is always returned.
pub fn top_labels<C: ImageClassifier + ?Sized>(
    classifier: &C,
    image: &[u8],
    top_k: usize,
    labels: &[String],
) -> Result<Vec<String>> {
    let ranked = rank_labels(classifier, image, labels)?;
    Ok(ranked.into_iter().take(top_k.max(1)).map(|s| s.label).collect())
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
