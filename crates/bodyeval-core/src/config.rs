//! Run configuration for an evaluation.
//!
//! Values come from an optional TOML file, then environment overrides, then
//! command-line flags (applied by the binary). [`RunConfig::validate`] is
//! called once everything is merged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{BodyEvalError, BodyEvalResult};
use crate::scoring::bleu::Smoothing;

pub const DEFAULT_NGRAM_SIZES: [usize; 2] = [5, 10];
pub const DEFAULT_WORKERS: usize = 4;

const ENV_INCLUDE_FAILED_PARSES: &str = "BODYEVAL_INCLUDE_FAILED_PARSES";
const ENV_WORKERS: &str = "BODYEVAL_WORKERS";

/// How a root directory maps to repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryLayout {
    /// The root itself is one repository.
    Single,
    /// Every first-level subdirectory of the root is a repository.
    #[default]
    Multi,
}

/// Serialization of the result dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON array of rows.
    #[default]
    Json,
    /// One JSON object per line.
    Jsonl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub gold_root: PathBuf,
    pub prediction_root: PathBuf,
    pub layout: RepositoryLayout,
    pub ngram_sizes: Vec<usize>,
    pub include_failed_parses_in_report: bool,
    /// Glob patterns (`*`, `?`) of files and directories to skip.
    pub exclude_patterns: Vec<String>,
    pub workers: usize,
    pub smoothing: Smoothing,
    pub output: PathBuf,
    pub output_format: OutputFormat,
    pub summary_output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gold_root: PathBuf::new(),
            prediction_root: PathBuf::new(),
            layout: RepositoryLayout::default(),
            ngram_sizes: DEFAULT_NGRAM_SIZES.to_vec(),
            include_failed_parses_in_report: false,
            exclude_patterns: Vec::new(),
            workers: DEFAULT_WORKERS,
            smoothing: Smoothing::default(),
            output: PathBuf::from("results.json"),
            output_format: OutputFormat::default(),
            summary_output: None,
        }
    }
}

impl RunConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> BodyEvalResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> BodyEvalResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `BODYEVAL_*` environment overrides.
    pub fn apply_env(&mut self) -> BodyEvalResult<()> {
        if let Some(flag) = env_flag(ENV_INCLUDE_FAILED_PARSES) {
            self.include_failed_parses_in_report = flag;
        }
        if let Ok(val) = std::env::var(ENV_WORKERS) {
            let trimmed = val.trim();
            if !trimmed.is_empty() {
                self.workers = trimmed.parse().map_err(|_| {
                    BodyEvalError::Config(format!("{ENV_WORKERS} must be an integer, got {val:?}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> BodyEvalResult<()> {
        if self.gold_root.as_os_str().is_empty() {
            return Err(BodyEvalError::Config("gold_root is not set".into()));
        }
        if self.prediction_root.as_os_str().is_empty() {
            return Err(BodyEvalError::Config("prediction_root is not set".into()));
        }
        if self.ngram_sizes.is_empty() {
            return Err(BodyEvalError::Config("ngram_sizes must not be empty".into()));
        }
        if self.ngram_sizes.contains(&0) {
            return Err(BodyEvalError::Config("ngram sizes must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(BodyEvalError::Config("workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Parse a boolean env flag. Unset or unrecognized values yield `None`.
fn env_flag(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.ngram_sizes, vec![5, 10]);
        assert_eq!(config.layout, RepositoryLayout::Multi);
        assert!(!config.include_failed_parses_in_report);
        assert_eq!(config.smoothing, Smoothing::None);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = RunConfig::from_toml(
            r#"
gold_root = "/data/repos"
prediction_root = "/data/output"
layout = "single"
ngram_sizes = [3, 5]
include_failed_parses_in_report = true
smoothing = "epsilon"
output_format = "jsonl"
"#,
        )
        .unwrap();
        assert_eq!(config.gold_root, PathBuf::from("/data/repos"));
        assert_eq!(config.layout, RepositoryLayout::Single);
        assert_eq!(config.ngram_sizes, vec![3, 5]);
        assert!(config.include_failed_parses_in_report);
        assert_eq!(config.smoothing, Smoothing::Epsilon);
        assert_eq!(config.output_format, OutputFormat::Jsonl);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_toml_rejects_unknown_layout() {
        assert!(RunConfig::from_toml("layout = \"forest\"").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = RunConfig {
            gold_root: "g".into(),
            prediction_root: "p".into(),
            ..RunConfig::default()
        };
        base.validate().unwrap();

        let missing = RunConfig::default();
        assert!(matches!(missing.validate(), Err(BodyEvalError::Config(_))));

        let zero = RunConfig {
            ngram_sizes: vec![5, 0],
            ..base.clone()
        };
        assert!(zero.validate().is_err());

        let empty = RunConfig {
            ngram_sizes: vec![],
            ..base.clone()
        };
        assert!(empty.validate().is_err());

        let no_workers = RunConfig { workers: 0, ..base };
        assert!(no_workers.validate().is_err());
    }
}
