//! Run configuration (`trustgate.yaml`)
//!
//! Engine thresholds, the policy table and run settings in one file.
//! Backend and model may be overridden from the environment.

use anyhow::{Context, Result};
use gates::PolicyTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trust::EngineConfig;

pub const ENV_BACKEND: &str = "TRUSTGATE_BACKEND";
pub const ENV_MODEL: &str = "TRUSTGATE_MODEL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub policy: PolicyTable,

    #[serde(default)]
    pub run: RunSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Scenario ids to run, in report order
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<String>,

    #[serde(default = "default_duration_days")]
    pub duration_days: u32,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Where run artifacts go; the standard runs directory when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Proposer backend (`mock`, `adversary`, `aligned`)
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Model label recorded in the audit trail; the proposer's own when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_proposer_timeout_ms")]
    pub proposer_timeout_ms: u64,
}

fn default_scenarios() -> Vec<String> {
    (1..=8).map(|i| format!("S{}", i)).collect()
}

fn default_duration_days() -> u32 {
    10
}

fn default_seed() -> u64 {
    42
}

fn default_backend() -> String {
    "mock".to_string()
}

fn default_proposer_timeout_ms() -> u64 {
    5000
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            scenarios: default_scenarios(),
            duration_days: default_duration_days(),
            seed: default_seed(),
            output_dir: None,
            backend: default_backend(),
            model: None,
            proposer_timeout_ms: default_proposer_timeout_ms(),
        }
    }
}

impl RunConfig {
    /// Load from YAML, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config from {:?}", path))?
        } else {
            Self::default()
        };
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write config to {:?}", path))?;
        Ok(())
    }

    /// Apply `TRUSTGATE_BACKEND` / `TRUSTGATE_MODEL`, which win over the file
    pub fn apply_env(&mut self) {
        self.apply_overrides(std::env::var(ENV_BACKEND).ok(), std::env::var(ENV_MODEL).ok());
    }

    fn apply_overrides(&mut self, backend: Option<String>, model: Option<String>) {
        if let Some(backend) = backend.filter(|b| !b.is_empty()) {
            self.run.backend = backend;
        }
        if let Some(model) = model.filter(|m| !m.is_empty()) {
            self.run.model = Some(model);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.policy.validate()?;
        if self.run.duration_days == 0 {
            anyhow::bail!("run.duration_days must be at least 1");
        }
        if self.run.proposer_timeout_ms == 0 {
            anyhow::bail!("run.proposer_timeout_ms must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = RunConfig::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.run.scenarios.len(), 8);
        assert_eq!(config.run.backend, "mock");
    }

    #[test]
    fn test_save_and_partial_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("trustgate.yaml");
        RunConfig::default().save_to(&path).unwrap();
        assert_eq!(RunConfig::load_from(&path).unwrap(), RunConfig::default());

        std::fs::write(&path, "run:\n  seed: 7\n  scenarios: [S2]\n").unwrap();
        let config = RunConfig::load_from(&path).unwrap();
        assert_eq!(config.run.seed, 7);
        assert_eq!(config.run.scenarios, vec!["S2".to_string()]);
        assert_eq!(config.run.duration_days, 10);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trustgate.yaml");
        std::fs::write(&path, "policy:\n  full_autonomy: [HOLD]\n").unwrap();
        assert!(RunConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RunConfig::default();
        config.apply_overrides(Some("adversary".into()), None);
        assert_eq!(config.run.backend, "adversary");
        assert_eq!(config.run.model, None);
        config.apply_overrides(Some(String::new()), Some("stress-v2".into()));
        assert_eq!(config.run.backend, "adversary");
        assert_eq!(config.run.model.as_deref(), Some("stress-v2"));
    }
}
