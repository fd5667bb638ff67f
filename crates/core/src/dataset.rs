//! Synthetic SEO training data.
//!
//! Scores come from a fixed weighted formula over the five page metrics plus
//! Gaussian noise, so a trained model learns that formula back.

use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;
use crate::metrics::{FEATURE_COUNT, SeoMetrics, round2};

pub const DEFAULT_SAMPLES: usize = 10_000;
pub const DEFAULT_SEED: u64 = 42;

/// One CSV row: the five features plus the target score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Word_Count")]
    pub word_count: u32,
    #[serde(rename = "Keyword_Density")]
    pub keyword_density: f64,
    #[serde(rename = "Meta_Title_Length")]
    pub meta_title_length: u32,
    #[serde(rename = "Meta_Desc_Length")]
    pub meta_desc_length: u32,
    #[serde(rename = "Alt_Tag_Percent")]
    pub alt_tag_percent: u32,
    #[serde(rename = "SEO_Score")]
    pub seo_score: u32,
}

impl Sample {
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        self.metrics().features()
    }

    pub fn metrics(&self) -> SeoMetrics {
        SeoMetrics {
            word_count: self.word_count as usize,
            keyword_density: self.keyword_density,
            meta_title_length: self.meta_title_length as usize,
            meta_desc_length: self.meta_desc_length as usize,
            alt_tag_percent: self.alt_tag_percent as f64,
        }
    }

    pub fn target(&self) -> f64 {
        self.seo_score as f64
    }
}

/// Noise-free score for a set of metrics.
pub fn formula_score(word_count: f64, keyword_density: f64, title_len: f64, desc_len: f64, alt_percent: f64) -> f64 {
    0.2 * (word_count / 2500.0) * 100.0
        + 0.25 * (keyword_density / 3.0) * 100.0
        + 0.15 * (title_len / 70.0) * 100.0
        + 0.2 * (desc_len / 180.0) * 100.0
        + 0.2 * (alt_percent / 100.0) * 100.0
}

/// Generates `samples` rows deterministically from `seed`.
pub fn generate(samples: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..samples)
        .map(|_| {
            let word_count = rng.gen_range(300..=2500u32);
            let keyword_density = round2(rng.gen_range(0.5..3.0));
            let meta_title_length = rng.gen_range(30..=70u32);
            let meta_desc_length = rng.gen_range(70..=180u32);
            let alt_tag_percent = rng.gen_range(30..=100u32);

            let score = formula_score(
                word_count as f64,
                keyword_density,
                meta_title_length as f64,
                meta_desc_length as f64,
                alt_tag_percent as f64,
            ) + 5.0 * standard_normal(&mut rng);

            Sample {
                word_count,
                keyword_density,
                meta_title_length,
                meta_desc_length,
                alt_tag_percent,
                seo_score: score.clamp(0.0, 100.0) as u32,
            }
        })
        .collect()
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Writes samples as CSV with a header row, creating parent directories.
pub fn write_csv(path: impl AsRef<Path>, samples: &[Sample]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = samples.len(), "wrote dataset");
    Ok(())
}

/// Reads a dataset written by [`write_csv`] (or any CSV with the same columns).
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let samples = reader.deserialize().collect::<std::result::Result<Vec<Sample>, _>>()?;
    Ok(samples)
}

/// Shuffles `samples` with `seed` and holds out `test_fraction` of them.
///
/// Returns `(train, test)`. The test set is empty when the fraction rounds to zero rows.
pub fn train_test_split(samples: &[Sample], test_fraction: f64, seed: u64) -> (Vec<Sample>, Vec<Sample>) {
    let mut shuffled = samples.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_len = ((samples.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let train = shuffled.split_off(test_len);
    (train, shuffled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(generate(50, 7), generate(50, 7));
        assert_ne!(generate(50, 7), generate(50, 8));
    }

    #[test]
    fn test_generated_ranges() {
        for s in generate(2_000, DEFAULT_SEED) {
            assert!((300..=2500).contains(&s.word_count));
            assert!((0.5..=3.0).contains(&s.keyword_density));
            assert!((30..=70).contains(&s.meta_title_length));
            assert!((70..=180).contains(&s.meta_desc_length));
            assert!((30..=100).contains(&s.alt_tag_percent));
            assert!(s.seo_score <= 100);
        }
    }

    #[test]
    fn test_scores_track_formula() {
        let samples = generate(2_000, DEFAULT_SEED);
        let mean_abs_err: f64 = samples
            .iter()
            .map(|s| {
                let f = s.features();
                (formula_score(f[0], f[1], f[2], f[3], f[4]) - s.target()).abs()
            })
            .sum::<f64>()
            / samples.len() as f64;

        // E|N(0,5)| is about 4, truncation adds up to 1
        assert!(mean_abs_err < 6.0, "mean abs error {}", mean_abs_err);
    }

    #[test]
    fn test_formula_maximum() {
        assert!((formula_score(2500.0, 3.0, 70.0, 180.0, 100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_train_test_split() {
        let samples = generate(100, 3);
        let (train, test) = train_test_split(&samples, 0.2, DEFAULT_SEED);

        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        assert!(test.iter().all(|s| samples.contains(s)));
        assert_eq!(train_test_split(&samples, 0.2, DEFAULT_SEED).1, test);
        assert!(train_test_split(&samples[..2], 0.2, DEFAULT_SEED).1.is_empty());
    }

    #[test]
    fn test_csv_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("seo_dataset.csv");
        let samples = generate(20, 1);

        write_csv(&path, &samples).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "Word_Count,Keyword_Density,Meta_Title_Length,Meta_Desc_Length,Alt_Tag_Percent,SEO_Score"
        ));
        assert_eq!(read_csv(&path).unwrap(), samples);
    }
}
