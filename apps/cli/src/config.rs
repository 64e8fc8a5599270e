//! Operator settings file support.
//!
//! Settings come from TOML files and are merged in this order, later wins:
//! 1. Defaults
//! 2. Global config file (~/.pharmatrain/config.toml)
//! 3. Local config file (./pharmatrain.toml)
//!
//! Command-line flags override everything and are applied by the commands.

use anyhow::{Context, Result};
use pharmatrain_training::DEFAULT_INTERPRETER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Project root; the current directory when unset.
    pub project_root: Option<PathBuf>,

    /// Program that runs the job scripts.
    pub interpreter: Option<String>,

    /// Per-job timeout. Jobs run unbounded when unset.
    pub job_timeout_secs: Option<u64>,

    /// Jobs run by `train` when `--models` is not given.
    pub models: Option<Vec<String>>,

    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn default_global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".pharmatrain").join("config.toml"))
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from("pharmatrain.toml")
    }

    /// Load global then local settings. Missing files are skipped; a file
    /// that exists but does not parse is an error.
    pub fn discover_and_load() -> Result<Self> {
        let mut settings = Self::default();
        let candidates = Self::default_global_path()
            .into_iter()
            .chain(std::iter::once(Self::default_local_path()));
        for path in candidates {
            if path.is_file() {
                settings.merge(Self::load_from_file(&path)?);
            }
        }
        Ok(settings)
    }

    /// Values set in `other` replace those in `self`.
    pub fn merge(&mut self, other: Self) {
        if other.project_root.is_some() {
            self.project_root = other.project_root;
        }
        if other.interpreter.is_some() {
            self.interpreter = other.interpreter;
        }
        if other.job_timeout_secs.is_some() {
            self.job_timeout_secs = other.job_timeout_secs;
        }
        if other.models.is_some() {
            self.models = other.models;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
    }

    pub fn interpreter(&self) -> &str {
        self.interpreter.as_deref().unwrap_or(DEFAULT_INTERPRETER)
    }

    pub fn project_root(&self) -> Result<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to resolve current directory"),
        }
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}
