//! Typed configuration artifacts handed to each training job.
//!
//! The orchestrator never interprets these beyond validation: the job
//! receives the file path and reads it itself. Every field has a default, so
//! an empty JSON object is a valid config. Unrecognized keys are rejected.

use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The kind of model a job trains; selects the config schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DrugClassifier,
    AuthenticityVerifier,
    PillDetector,
}

impl JobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrugClassifier => "drug_classifier",
            Self::AuthenticityVerifier => "authenticity_verifier",
            Self::PillDetector => "pill_detector",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image augmentation for the drug classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AugmentationConfig {
    /// Max random rotation in degrees.
    pub rotation_range: f64,
    /// Max horizontal shift as a fraction of width.
    pub width_shift_range: f64,
    /// Max vertical shift as a fraction of height.
    pub height_shift_range: f64,
    /// Brightness multiplier range `[low, high]`.
    pub brightness_range: [f64; 2],
    /// Max random zoom fraction.
    pub zoom_range: f64,
    /// Random horizontal flips.
    pub horizontal_flip: bool,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            rotation_range: 15.0,
            width_shift_range: 0.1,
            height_shift_range: 0.1,
            brightness_range: [0.8, 1.2],
            zoom_range: 0.1,
            horizontal_flip: true,
        }
    }
}

/// Augmentation for the authenticity verifier: milder than the classifier's, no flips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierAugmentationConfig {
    pub rotation_range: f64,
    pub width_shift_range: f64,
    pub height_shift_range: f64,
    pub brightness_range: [f64; 2],
    pub zoom_range: f64,
    pub horizontal_flip: bool,
}

impl Default for VerifierAugmentationConfig {
    fn default() -> Self {
        Self {
            rotation_range: 10.0,
            width_shift_range: 0.05,
            height_shift_range: 0.05,
            brightness_range: [0.9, 1.1],
            zoom_range: 0.05,
            horizontal_flip: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EarlyStoppingConfig {
    /// Epochs without improvement before training stops. Default 10.
    pub patience: u32,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self { patience: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReduceLrConfig {
    /// Epochs on plateau before the learning rate is reduced. Default 5.
    pub patience: u32,
    /// Multiplier applied to the learning rate on plateau. Default 0.5.
    pub factor: f64,
}

impl Default for ReduceLrConfig {
    fn default() -> Self {
        Self { patience: 5, factor: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelCheckpointConfig {
    /// Keep only the best checkpoint. Default true.
    pub save_best_only: bool,
}

impl Default for ModelCheckpointConfig {
    fn default() -> Self {
        Self { save_best_only: true }
    }
}

/// Training callbacks. A missing callback section disables that callback;
/// a missing `callbacks` key enables all three with stock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbacksConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stopping: Option<EarlyStoppingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce_lr: Option<ReduceLrConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_checkpoint: Option<ModelCheckpointConfig>,
}

impl Default for CallbacksConfig {
    fn default() -> Self {
        Self {
            early_stopping: Some(EarlyStoppingConfig::default()),
            reduce_lr: Some(ReduceLrConfig::default()),
            model_checkpoint: Some(ModelCheckpointConfig::default()),
        }
    }
}

/// `drug_classifier_config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrugClassifierConfig {
    pub model_name: String,
    /// Backbone network. Default `efficientnet_b3`.
    pub architecture: String,
    /// Input image `[height, width, channels]`. Default `[224, 224, 3]`.
    pub input_shape: [u32; 3],
    /// Number of drug classes. Default 50.
    pub num_classes: u32,
    pub batch_size: u32,
    pub epochs: u32,
    pub learning_rate: f64,
    pub optimizer: String,
    pub loss: String,
    pub metrics: Vec<String>,
    pub data_augmentation: AugmentationConfig,
    pub callbacks: CallbacksConfig,
}

impl Default for DrugClassifierConfig {
    fn default() -> Self {
        Self {
            model_name: "drug_classifier".to_string(),
            architecture: "efficientnet_b3".to_string(),
            input_shape: [224, 224, 3],
            num_classes: 50,
            batch_size: 32,
            epochs: 100,
            learning_rate: 0.001,
            optimizer: "adam".to_string(),
            loss: "categorical_crossentropy".to_string(),
            metrics: vec!["accuracy".to_string(), "top_k_categorical_accuracy".to_string()],
            data_augmentation: AugmentationConfig::default(),
            callbacks: CallbacksConfig::default(),
        }
    }
}

/// `authenticity_config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthenticityConfig {
    pub model_name: String,
    /// Siamese backbone. Default `resnet50_siamese`.
    pub architecture: String,
    /// Default `[256, 256, 3]`.
    pub input_shape: [u32; 3],
    /// Default 2 (authentic, counterfeit).
    pub num_classes: u32,
    pub batch_size: u32,
    pub epochs: u32,
    pub learning_rate: f64,
    pub optimizer: String,
    pub loss: String,
    pub metrics: Vec<String>,
    /// Contrastive margin between embeddings. Default 1.0.
    pub siamese_margin: f64,
    /// Comparison pairs requested from the pair sampler. Default 10000.
    pub num_pairs: usize,
    pub data_augmentation: VerifierAugmentationConfig,
}

impl Default for AuthenticityConfig {
    fn default() -> Self {
        Self {
            model_name: "authenticity_verifier".to_string(),
            architecture: "resnet50_siamese".to_string(),
            input_shape: [256, 256, 3],
            num_classes: 2,
            batch_size: 16,
            epochs: 75,
            learning_rate: 0.0001,
            optimizer: "adam".to_string(),
            loss: "binary_crossentropy".to_string(),
            metrics: vec!["accuracy".to_string(), "precision".to_string(), "recall".to_string()],
            siamese_margin: 1.0,
            num_pairs: 10_000,
            data_augmentation: VerifierAugmentationConfig::default(),
        }
    }
}

/// Detector augmentation, named the way YOLO trainers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionAugmentationConfig {
    pub hsv_h: f64,
    pub hsv_s: f64,
    pub hsv_v: f64,
    pub degrees: f64,
    pub translate: f64,
    pub scale: f64,
    pub shear: f64,
    pub perspective: f64,
    pub flipud: f64,
    pub fliplr: f64,
    pub mosaic: f64,
    pub mixup: f64,
}

impl Default for DetectionAugmentationConfig {
    fn default() -> Self {
        Self {
            hsv_h: 0.015,
            hsv_s: 0.7,
            hsv_v: 0.4,
            degrees: 10.0,
            translate: 0.1,
            scale: 0.5,
            shear: 2.0,
            perspective: 0.0,
            flipud: 0.0,
            fliplr: 0.5,
            mosaic: 1.0,
            mixup: 0.1,
        }
    }
}

/// `pill_detection_config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PillDetectionConfig {
    pub model_name: String,
    /// Detector size variant. Default `yolov8n`.
    pub architecture: String,
    /// Default `[640, 640, 3]`; the first entry is the training image size.
    pub input_shape: [u32; 3],
    /// Detection class names. Must not be empty.
    pub classes: Vec<String>,
    pub batch_size: u32,
    pub epochs: u32,
    pub learning_rate: f64,
    pub optimizer: String,
    /// Annotation format. Default `yolo`.
    pub data_format: String,
    pub augmentation: DetectionAugmentationConfig,
}

impl Default for PillDetectionConfig {
    fn default() -> Self {
        Self {
            model_name: "pill_detector".to_string(),
            architecture: "yolov8n".to_string(),
            input_shape: [640, 640, 3],
            classes: ["pill", "tablet", "capsule", "blister_pack"]
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
            batch_size: 16,
            epochs: 150,
            learning_rate: 0.01,
            optimizer: "SGD".to_string(),
            data_format: "yolo".to_string(),
            augmentation: DetectionAugmentationConfig::default(),
        }
    }
}

/// A parsed config artifact for one job kind.
#[derive(Debug, Clone, PartialEq)]
pub enum JobConfig {
    DrugClassifier(DrugClassifierConfig),
    AuthenticityVerifier(AuthenticityConfig),
    PillDetector(PillDetectionConfig),
}

impl JobConfig {
    #[must_use]
    pub fn default_for(kind: JobKind) -> Self {
        match kind {
            JobKind::DrugClassifier => Self::DrugClassifier(DrugClassifierConfig::default()),
            JobKind::AuthenticityVerifier => {
                Self::AuthenticityVerifier(AuthenticityConfig::default())
            }
            JobKind::PillDetector => Self::PillDetector(PillDetectionConfig::default()),
        }
    }

    /// Parse `contents` against the schema for `kind`.
    pub fn parse(kind: JobKind, contents: &str) -> Result<Self, String> {
        let parsed = match kind {
            JobKind::DrugClassifier => serde_json::from_str(contents).map(Self::DrugClassifier),
            JobKind::AuthenticityVerifier => {
                serde_json::from_str(contents).map(Self::AuthenticityVerifier)
            }
            JobKind::PillDetector => serde_json::from_str(contents).map(Self::PillDetector),
        };
        let config = parsed.map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(kind: JobKind, path: &Path) -> TrainingResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(kind, &contents).map_err(|reason| TrainingError::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            Self::DrugClassifier(_) => JobKind::DrugClassifier,
            Self::AuthenticityVerifier(_) => JobKind::AuthenticityVerifier,
            Self::PillDetector(_) => JobKind::PillDetector,
        }
    }

    pub fn to_json_pretty(&self) -> TrainingResult<String> {
        let json = match self {
            Self::DrugClassifier(c) => serde_json::to_string_pretty(c)?,
            Self::AuthenticityVerifier(c) => serde_json::to_string_pretty(c)?,
            Self::PillDetector(c) => serde_json::to_string_pretty(c)?,
        };
        Ok(json)
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::DrugClassifier(c) => {
                validate_common(c.input_shape, c.batch_size, c.epochs, c.learning_rate)?;
                if c.num_classes == 0 {
                    return Err("num_classes must be >= 1".to_string());
                }
            }
            Self::AuthenticityVerifier(c) => {
                validate_common(c.input_shape, c.batch_size, c.epochs, c.learning_rate)?;
                if !c.siamese_margin.is_finite() || c.siamese_margin < 0.0 {
                    return Err("siamese_margin must be >= 0".to_string());
                }
            }
            Self::PillDetector(c) => {
                validate_common(c.input_shape, c.batch_size, c.epochs, c.learning_rate)?;
                if c.classes.is_empty() {
                    return Err("classes must not be empty".to_string());
                }
            }
        }
        Ok(())
    }
}

fn validate_common(
    input_shape: [u32; 3],
    batch_size: u32,
    epochs: u32,
    learning_rate: f64,
) -> Result<(), String> {
    if input_shape.contains(&0) {
        return Err("input_shape entries must be >= 1".to_string());
    }
    if batch_size == 0 {
        return Err("batch_size must be >= 1".to_string());
    }
    if epochs == 0 {
        return Err("epochs must be >= 1".to_string());
    }
    if !learning_rate.is_finite() || learning_rate <= 0.0 {
        return Err("learning_rate must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = JobConfig::parse(JobKind::AuthenticityVerifier, "{}").unwrap();
        let JobConfig::AuthenticityVerifier(c) = config else { panic!("wrong kind") };
        assert_eq!(c.num_pairs, 10_000);
        assert_eq!(c.input_shape, [256, 256, 3]);
        assert!(!c.data_augmentation.horizontal_flip);
    }

    #[test]
    fn test_stock_classifier_config_parses() {
        let json = r#"{
            "model_name": "drug_classifier",
            "architecture": "efficientnet_b3",
            "input_shape": [224, 224, 3],
            "num_classes": 50,
            "batch_size": 32,
            "epochs": 100,
            "learning_rate": 0.001,
            "optimizer": "adam",
            "loss": "categorical_crossentropy",
            "metrics": ["accuracy", "top_k_categorical_accuracy"],
            "data_augmentation": {
                "rotation_range": 15,
                "width_shift_range": 0.1,
                "height_shift_range": 0.1,
                "brightness_range": [0.8, 1.2],
                "zoom_range": 0.1,
                "horizontal_flip": true
            },
            "callbacks": {
                "early_stopping": {"patience": 10},
                "reduce_lr": {"patience": 5, "factor": 0.5},
                "model_checkpoint": {"save_best_only": true}
            }
        }"#;
        let config = JobConfig::parse(JobKind::DrugClassifier, json).unwrap();
        assert_eq!(config, JobConfig::default_for(JobKind::DrugClassifier));
    }

    #[test]
    fn test_stock_authenticity_config_keeps_verifier_augmentation() {
        let json = r#"{
            "model_name": "authenticity_verifier",
            "architecture": "resnet50_siamese",
            "input_shape": [256, 256, 3],
            "num_classes": 2,
            "batch_size": 16,
            "epochs": 75,
            "learning_rate": 0.0001,
            "optimizer": "adam",
            "loss": "binary_crossentropy",
            "metrics": ["accuracy", "precision", "recall"],
            "siamese_margin": 1.0,
            "data_augmentation": {
                "rotation_range": 10,
                "width_shift_range": 0.05,
                "height_shift_range": 0.05,
                "brightness_range": [0.9, 1.1],
                "zoom_range": 0.05
            }
        }"#;
        let config = JobConfig::parse(JobKind::AuthenticityVerifier, json).unwrap();
        assert_eq!(config, JobConfig::default_for(JobKind::AuthenticityVerifier));

        let partial = r#"{"data_augmentation": {"rotation_range": 10}}"#;
        let parsed = JobConfig::parse(JobKind::AuthenticityVerifier, partial).unwrap();
        let JobConfig::AuthenticityVerifier(c) = parsed else {
            panic!("wrong kind")
        };
        assert!((c.data_augmentation.width_shift_range - 0.05).abs() < f64::EPSILON);
        assert!((c.data_augmentation.zoom_range - 0.05).abs() < f64::EPSILON);
        assert!(!c.data_augmentation.horizontal_flip);
    }

    #[test]
    fn test_omitted_callback_sections_are_disabled() {
        let json = r#"{"callbacks": {"early_stopping": {"patience": 3}}}"#;
        let parsed = JobConfig::parse(JobKind::DrugClassifier, json).unwrap();
        let JobConfig::DrugClassifier(c) = parsed else {
            panic!("wrong kind")
        };
        assert_eq!(c.callbacks.early_stopping, Some(EarlyStoppingConfig { patience: 3 }));
        assert!(c.callbacks.reduce_lr.is_none());
        assert!(c.callbacks.model_checkpoint.is_none());

        let parsed = JobConfig::parse(JobKind::DrugClassifier, "{}").unwrap();
        let JobConfig::DrugClassifier(c) = parsed else {
            panic!("wrong kind")
        };
        assert_eq!(c.callbacks, CallbacksConfig::default());
        assert!(c.callbacks.reduce_lr.is_some());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = JobConfig::parse(JobKind::PillDetector, r#"{"epochz": 3}"#).unwrap_err();
        assert!(err.contains("epochz"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(JobConfig::parse(JobKind::DrugClassifier, r#"{"epochs": 0}"#).is_err());
        assert!(JobConfig::parse(JobKind::DrugClassifier, r#"{"learning_rate": -1.0}"#).is_err());
        assert!(JobConfig::parse(JobKind::PillDetector, r#"{"classes": []}"#).is_err());
    }

    #[test]
    fn test_default_config_serializes_back() {
        let kinds = [JobKind::DrugClassifier, JobKind::AuthenticityVerifier, JobKind::PillDetector];
        for kind in kinds {
            let json = JobConfig::default_for(kind).to_json_pretty().unwrap();
            let parsed = JobConfig::parse(kind, &json).unwrap();
            assert_eq!(parsed.kind(), kind);
        }
    }
}
