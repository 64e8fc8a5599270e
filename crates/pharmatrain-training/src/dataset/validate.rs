use super::{ImageClass, list_categories, list_images};
use crate::error::TrainingResult;
use crate::layout::ProjectLayout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Categories with fewer images than this are flagged.
pub const MIN_IMAGES_PER_CATEGORY: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
}

/// Image counts per class and category. Recomputed from disk on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub authentic: ClassStats,
    pub counterfeit: ClassStats,
    pub total_images: usize,
    pub issues: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn class(&self, class: ImageClass) -> &ClassStats {
        match class {
            ImageClass::Authentic => &self.authentic,
            ImageClass::Counterfeit => &self.counterfeit,
        }
    }

    fn class_mut(&mut self, class: ImageClass) -> &mut ClassStats {
        match class {
            ImageClass::Authentic => &mut self.authentic,
            ImageClass::Counterfeit => &mut self.counterfeit,
        }
    }
}

/// Scan the corpus. Read-only.
pub fn validate_dataset(layout: &ProjectLayout) -> TrainingResult<ValidationReport> {
    info!("Validating dataset structure");
    let mut report = ValidationReport::default();

    for class in ImageClass::ALL {
        let class_dir = layout.class_dir(class);
        if !class_dir.is_dir() {
            report.issues.push(format!("Missing {class} directory"));
            continue;
        }

        for (category, dir) in list_categories(&class_dir)? {
            let count = list_images(&dir)?.len();
            if count < MIN_IMAGES_PER_CATEGORY {
                report.issues.push(format!("Low image count for {class}/{category}: {count}"));
            }
            let stats = report.class_mut(class);
            stats.total += count;
            stats.categories.insert(category, count);
        }
    }

    report.total_images = report.authentic.total + report.counterfeit.total;

    info!(
        authentic = report.authentic.total,
        counterfeit = report.counterfeit.total,
        total = report.total_images,
        "Dataset statistics"
    );
    for issue in &report.issues {
        warn!("{issue}");
    }

    Ok(report)
}

pub fn write_validation_report(report: &ValidationReport, path: &Path) -> TrainingResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub project_root: PathBuf,
    pub data_directory: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Validation result plus advice on what the corpus is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub dataset_info: DatasetInfo,
    pub structure_validation: ValidationReport,
    pub recommendations: Vec<String>,
}

#[must_use]
pub fn recommendations(stats: &ValidationReport) -> Vec<String> {
    let mut out = Vec::new();
    if stats.total_images < 1000 {
        out.push(
            "Consider adding more training images. Minimum recommended: 1000+ images per class"
                .to_string(),
        );
    }
    if !stats.issues.is_empty() {
        out.push("Address dataset issues identified in validation".to_string());
    }
    if stats.authentic.total < 100 {
        out.push("Add more authentic pharmaceutical images for better classification".to_string());
    }
    if stats.counterfeit.total < 50 {
        out.push("Add counterfeit samples for authenticity verification training".to_string());
    }
    out
}

pub fn dataset_report(layout: &ProjectLayout, now: DateTime<Utc>) -> TrainingResult<DatasetReport> {
    let structure_validation = validate_dataset(layout)?;
    Ok(DatasetReport {
        dataset_info: DatasetInfo {
            project_root: layout.root().to_path_buf(),
            data_directory: layout.data_dir(),
            created_at: now,
        },
        recommendations: recommendations(&structure_validation),
        structure_validation,
    })
}

/// Writes `data/dataset_report_<timestamp>.json` and returns its path.
pub fn write_dataset_report(
    report: &DatasetReport,
    layout: &ProjectLayout,
) -> TrainingResult<PathBuf> {
    let stamp = report.dataset_info.created_at.format("%Y%m%d_%H%M%S");
    let path = layout.data_dir().join(format!("dataset_report_{stamp}.json"));
    std::fs::create_dir_all(layout.data_dir())?;
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    info!(path = %path.display(), "Dataset report saved");
    Ok(path)
}
