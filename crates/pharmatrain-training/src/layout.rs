use crate::dataset::ImageClass;
use std::path::{Path, PathBuf};

/// Filesystem layout of a training project.
///
/// ```text
/// <root>/training/{scripts,configs}/
/// <root>/models/<job>/<job>_training.log
/// <root>/data/pharmaceutical_images/{authentic,counterfeit}/<category>/
/// <root>/data/processed/<split>/<class>/<category>/
/// ```
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn training_dir(&self) -> PathBuf {
        self.root.join("training")
    }

    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.training_dir().join("scripts")
    }

    #[must_use]
    pub fn configs_dir(&self) -> PathBuf {
        self.training_dir().join("configs")
    }

    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Shared data root handed to every job.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir().join("pharmaceutical_images")
    }

    #[must_use]
    pub fn class_dir(&self, class: ImageClass) -> PathBuf {
        self.images_dir().join(class.as_str())
    }

    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir().join("processed")
    }

    #[must_use]
    pub fn split_summary_path(&self) -> PathBuf {
        self.processed_dir().join("dataset_splits.json")
    }

    #[must_use]
    pub fn validation_report_path(&self) -> PathBuf {
        self.data_dir().join("validation_report.json")
    }

    #[must_use]
    pub fn default_pairs_path(&self) -> PathBuf {
        self.processed_dir().join("pairs.jsonl")
    }

    #[must_use]
    pub fn job_output_dir(&self, job_name: &str) -> PathBuf {
        self.models_dir().join(job_name)
    }

    #[must_use]
    pub fn job_log_path(&self, job_name: &str) -> PathBuf {
        self.job_output_dir(job_name).join(format!("{job_name}_training.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = ProjectLayout::new(temp.path().to_path_buf());

        assert!(layout.scripts_dir().ends_with("training/scripts"));
        assert!(
            layout
                .class_dir(ImageClass::Counterfeit)
                .ends_with("pharmaceutical_images/counterfeit")
        );
        assert!(
            layout
                .job_log_path("pill_detector")
                .ends_with("models/pill_detector/pill_detector_training.log")
        );
    }
}
