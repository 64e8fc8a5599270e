//! Stratified train/val/test partitioning.
//!
//! Each `(class, category)` group is shuffled and cut independently:
//! `floor(n * train)` items go to train, `floor(n * val)` to val, and the
//! rest to test, so test absorbs every rounding remainder.

use super::{DatasetItem, ImageClass, ItemsByCategory, discover_items};
use crate::error::{TrainingError, TrainingResult};
use crate::layout::ProjectLayout;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Allowed distance of the ratio sum from 1.0.
pub const RATIO_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    #[serde(rename = "validation")]
    pub val: f64,
    pub test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> TrainingResult<Self> {
        let ratios = Self { train, val, test };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> TrainingResult<()> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TrainingError::Validation(format!(
                    "{name} ratio must be within [0, 1], got {value}"
                )));
            }
        }
        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(TrainingError::Validation(format!("Ratios must sum to 1.0, got {sum}")));
        }
        Ok(())
    }

    /// `(train, val, test)` counts for `n` items.
    #[must_use]
    pub fn counts(&self, n: usize) -> (usize, usize, usize) {
        let n_train = ((n as f64 * self.train).floor() as usize).min(n);
        let n_val = ((n as f64 * self.val).floor() as usize).min(n - n_train);
        (n_train, n_val, n - n_train - n_val)
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self { train: 0.7, val: 0.2, test: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Self; 3] = [Self::Train, Self::Val, Self::Test];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

/// One category's items after the cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
    pub test: Vec<T>,
}

/// Shuffle `items` and cut them by `ratios`. Every item lands in exactly one split.
pub fn partition<T, R>(mut items: Vec<T>, ratios: &SplitRatios, rng: &mut R) -> Partition<T>
where
    R: Rng + ?Sized,
{
    items.shuffle(rng);
    let (n_train, n_val, _) = ratios.counts(items.len());
    let test = items.split_off(n_train + n_val);
    let val = items.split_off(n_train);
    Partition { train: items, val, test }
}

/// Every item of a split run mapped to its split.
#[derive(Debug, Clone, Default)]
pub struct SplitAssignment {
    assignments: Vec<(DatasetItem, Split)>,
}

impl SplitAssignment {
    pub fn iter(&self) -> impl Iterator<Item = &(DatasetItem, Split)> {
        self.assignments.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    #[must_use]
    pub fn split_of(&self, item: &DatasetItem) -> Option<Split> {
        self.assignments.iter().find(|(i, _)| i == item).map(|(_, s)| *s)
    }

    #[must_use]
    pub fn count(&self, split: Split, class: ImageClass) -> usize {
        self.assignments.iter().filter(|(i, s)| *s == split && i.class == class).count()
    }

    /// Per split, per class counts; every split and class is present.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Split, BTreeMap<ImageClass, usize>> {
        Split::ALL
            .into_iter()
            .map(|split| {
                let per_class = ImageClass::ALL
                    .into_iter()
                    .map(|class| (class, self.count(split, class)))
                    .collect();
                (split, per_class)
            })
            .collect()
    }
}

/// Assign every item to a split, per category. Ratios are checked first;
/// empty categories are skipped.
pub fn split<R>(
    items_by_category: &ItemsByCategory,
    ratios: &SplitRatios,
    rng: &mut R,
) -> TrainingResult<SplitAssignment>
where
    R: Rng + ?Sized,
{
    ratios.validate()?;
    let mut assignment = SplitAssignment::default();

    for ((class, category), items) in items_by_category {
        if items.is_empty() {
            debug!(class = %class, category = %category, "Skipping empty category");
            continue;
        }
        let Partition { train, val, test } = partition(items.clone(), ratios, rng);
        info!(
            "Split {category} ({class}): {} train, {} val, {} test",
            train.len(),
            val.len(),
            test.len()
        );
        for (split, part) in [(Split::Train, train), (Split::Val, val), (Split::Test, test)] {
            assignment.assignments.extend(part.into_iter().map(|item| (item, split)));
        }
    }

    Ok(assignment)
}

/// Target path of `item` under `processed_dir/<split>/<class>/<category>/`.
#[must_use]
pub fn target_path(processed_dir: &Path, item: &DatasetItem, split: Split) -> PathBuf {
    let file_name = item.path.file_name().map(PathBuf::from).unwrap_or_default();
    processed_dir
        .join(split.as_str())
        .join(item.class.as_str())
        .join(&item.category)
        .join(file_name)
}

/// Copy every assigned file into the split tree. Originals stay in place.
///
/// The `train`, `val` and `test` subtrees are cleared first so the tree
/// holds exactly this assignment.
pub fn materialize(assignment: &SplitAssignment, processed_dir: &Path) -> TrainingResult<()> {
    for split in Split::ALL {
        let split_dir = processed_dir.join(split.as_str());
        if split_dir.exists() {
            debug!(path = %split_dir.display(), "Clearing previous split");
            std::fs::remove_dir_all(&split_dir)?;
        }
        for class in ImageClass::ALL {
            std::fs::create_dir_all(split_dir.join(class.as_str()))?;
        }
    }
    for (item, split) in assignment.iter() {
        let target = target_path(processed_dir, item, *split);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&item.path, &target)?;
    }
    Ok(())
}

/// Persisted as `dataset_splits.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub split_ratios: SplitRatios,
    pub splits: BTreeMap<Split, BTreeMap<ImageClass, usize>>,
}

/// Partition the project's corpus and copy it under `data/processed/`.
///
/// Shuffling is unseeded: repeated runs give different assignments with the
/// same per-category counts.
pub fn split_dataset(layout: &ProjectLayout, ratios: &SplitRatios) -> TrainingResult<SplitSummary> {
    split_dataset_with_rng(layout, ratios, &mut rand::thread_rng())
}

pub fn split_dataset_with_rng<R>(
    layout: &ProjectLayout,
    ratios: &SplitRatios,
    rng: &mut R,
) -> TrainingResult<SplitSummary>
where
    R: Rng + ?Sized,
{
    ratios.validate()?;
    info!(train = ratios.train, val = ratios.val, test = ratios.test, "Splitting dataset");

    let items = discover_items(layout)?;
    let assignment = split(&items, ratios, rng)?;
    materialize(&assignment, &layout.processed_dir())?;

    let summary = SplitSummary { split_ratios: *ratios, splits: assignment.counts() };
    std::fs::write(layout.split_summary_path(), serde_json::to_string_pretty(&summary)?)?;
    info!("Dataset splitting completed");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::populate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_ten_items_split_seven_two_one() {
        let mut rng = StdRng::seed_from_u64(7);
        let part = partition((0..10).collect::<Vec<_>>(), &SplitRatios::default(), &mut rng);
        assert_eq!((part.train.len(), part.val.len(), part.test.len()), (7, 2, 1));
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let mut rng = StdRng::seed_from_u64(42);
        let ratios = [
            (0.7, 0.2, 0.1),
            (0.5, 0.25, 0.25),
            (1.0, 0.0, 0.0),
            (0.0, 0.0, 1.0),
            (0.33, 0.33, 0.34),
        ];
        for (a, b, c) in ratios {
            let ratios = SplitRatios::new(a, b, c).unwrap();
            for n in 0..60 {
                let part = partition((0..n).collect::<Vec<_>>(), &ratios, &mut rng);
                assert_eq!(part.train.len() + part.val.len() + part.test.len(), n);

                let all: HashSet<_> =
                    part.train.iter().chain(&part.val).chain(&part.test).collect();
                assert_eq!(all.len(), n);
            }
        }
    }

    #[test]
    fn test_test_split_absorbs_remainder() {
        let ratios = SplitRatios::default();
        assert_eq!(ratios.counts(7), (4, 1, 2));
        assert_eq!(ratios.counts(1), (0, 0, 1));
        assert_eq!(ratios.counts(0), (0, 0, 0));
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        assert!(matches!(SplitRatios::new(0.7, 0.2, 0.05), Err(TrainingError::Validation(_))));
        assert!(SplitRatios::new(0.7, 0.2, 0.1 + 5e-7).is_ok());
        assert!(SplitRatios::new(1.2, -0.1, -0.1).is_err());
    }

    #[test]
    fn test_bad_ratios_touch_nothing() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path().to_path_buf());
        populate(&layout, ImageClass::Authentic, "aspirin", 10);

        let ratios = SplitRatios { train: 0.7, val: 0.2, test: 0.05 };
        assert!(split_dataset(&layout, &ratios).is_err());
        assert!(!layout.processed_dir().exists());
    }

    #[test]
    fn test_split_dataset_copies_and_summarizes() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path().to_path_buf());
        populate(&layout, ImageClass::Authentic, "aspirin", 10);
        populate(&layout, ImageClass::Authentic, "metformin", 7);
        populate(&layout, ImageClass::Counterfeit, "aspirin", 5);
        std::fs::create_dir_all(layout.class_dir(ImageClass::Counterfeit).join("empty")).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let summary = split_dataset_with_rng(&layout, &SplitRatios::default(), &mut rng).unwrap();

        assert_eq!(summary.splits[&Split::Train][&ImageClass::Authentic], 7 + 4);
        assert_eq!(summary.splits[&Split::Val][&ImageClass::Authentic], 2 + 1);
        assert_eq!(summary.splits[&Split::Test][&ImageClass::Authentic], 1 + 2);
        assert_eq!(summary.splits[&Split::Train][&ImageClass::Counterfeit], 3);
        assert_eq!(summary.splits[&Split::Test][&ImageClass::Counterfeit], 1);

        // originals untouched
        let originals = layout.class_dir(ImageClass::Authentic).join("aspirin");
        assert_eq!(std::fs::read_dir(originals).unwrap().count(), 10);
        let copied = layout.processed_dir().join("train/authentic/aspirin");
        assert_eq!(std::fs::read_dir(copied).unwrap().count(), 7);

        let contents = std::fs::read_to_string(layout.split_summary_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["split_ratios"]["validation"], 0.2);
        assert_eq!(json["splits"]["val"]["counterfeit"], 1);
    }

    #[test]
    fn test_resplit_replaces_previous_tree() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path().to_path_buf());
        populate(&layout, ImageClass::Authentic, "aspirin", 10);

        let ratios = SplitRatios::default();
        split_dataset_with_rng(&layout, &ratios, &mut StdRng::seed_from_u64(1)).unwrap();
        split_dataset_with_rng(&layout, &ratios, &mut StdRng::seed_from_u64(2)).unwrap();

        let mut names = Vec::new();
        for split in Split::ALL {
            let dir = layout.processed_dir().join(split.as_str()).join("authentic/aspirin");
            names.extend(std::fs::read_dir(dir).unwrap().map(|e| e.unwrap().file_name()));
        }
        assert_eq!(names.len(), 10);
        assert_eq!(names.iter().collect::<HashSet<_>>().len(), 10);
        let originals = layout.class_dir(ImageClass::Authentic).join("aspirin");
        assert_eq!(std::fs::read_dir(originals).unwrap().count(), 10);
    }

    #[test]
    fn test_assignment_lookup() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path().to_path_buf());
        populate(&layout, ImageClass::Counterfeit, "omeprazole", 4);

        let items = discover_items(&layout).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let assignment = split(&items, &SplitRatios::default(), &mut rng).unwrap();
        assert_eq!(assignment.len(), 4);
        for item in items.values().flatten() {
            assert!(assignment.split_of(item).is_some());
        }
    }
}
