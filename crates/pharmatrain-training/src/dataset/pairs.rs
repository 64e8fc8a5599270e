//! Labeled comparison pairs for verification-style training.

use crate::error::TrainingResult;
use rand::Rng;
use rand::seq::{IteratorRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Both items authentic.
pub const LABEL_SAME: u8 = 1;
/// Cross-class or both counterfeit.
pub const LABEL_SUSPICIOUS: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPair<T> {
    pub a: T,
    pub b: T,
    pub label: u8,
}

/// Draw `num_pairs / 4` authentic pairs, `num_pairs / 2` authentic-counterfeit
/// pairs and `num_pairs / 4` counterfeit pairs.
///
/// A draw whose pool is too small is skipped, so fewer than `num_pairs` pairs
/// may come back. Pairs are not deduplicated.
pub fn sample<T, R>(
    authentic: &[T],
    counterfeit: &[T],
    num_pairs: usize,
    rng: &mut R,
) -> Vec<ComparisonPair<T>>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let quarter = num_pairs / 4;
    let mut pairs = Vec::with_capacity(quarter * 2 + num_pairs / 2);

    for _ in 0..quarter {
        if let Some((a, b)) = draw_two(authentic, rng) {
            pairs.push(ComparisonPair { a, b, label: LABEL_SAME });
        }
    }

    for _ in 0..num_pairs / 2 {
        if let (Some(a), Some(b)) = (authentic.choose(rng), counterfeit.choose(rng)) {
            pairs.push(ComparisonPair { a: a.clone(), b: b.clone(), label: LABEL_SUSPICIOUS });
        }
    }

    for _ in 0..quarter {
        if let Some((a, b)) = draw_two(counterfeit, rng) {
            pairs.push(ComparisonPair { a, b, label: LABEL_SUSPICIOUS });
        }
    }

    pairs
}

/// Two distinct positions from `pool`, or `None` with fewer than two items.
fn draw_two<T: Clone, R: Rng + ?Sized>(pool: &[T], rng: &mut R) -> Option<(T, T)> {
    if pool.len() < 2 {
        return None;
    }
    let mut picked = pool.iter().choose_multiple(rng, 2);
    picked.shuffle(rng);
    Some((picked[0].clone(), picked[1].clone()))
}

/// Split pairs into parallel item and label vectors.
#[must_use]
pub fn unzip_labels<T>(pairs: Vec<ComparisonPair<T>>) -> (Vec<(T, T)>, Vec<u8>) {
    pairs.into_iter().map(|p| ((p.a, p.b), p.label)).unzip()
}

/// One JSON object per line: `{"a": ..., "b": ..., "label": 0|1}`.
pub fn write_pairs_jsonl<T: Serialize>(
    path: &Path,
    pairs: &[ComparisonPair<T>],
) -> TrainingResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::new();
    for pair in pairs {
        out.push_str(&serde_json::to_string(pair)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    info!(path = %path.display(), count = pairs.len(), "Comparison pairs written");
    Ok(())
}
