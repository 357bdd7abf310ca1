//! Sweep configuration.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides.

use crate::error::{Result, SweepError};
use crate::grid::ParamGrid;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Hyperparameter axes to sweep.
    #[serde(default)]
    pub grid: ParamGrid,
    /// Root directory for checkpoint slots and the results manifest.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Pre-trained embedding vectors file, passed through to the trainer.
    #[serde(default = "default_vectors_path")]
    pub vectors_path: PathBuf,
    /// Dataset root directory, passed through to the trainer.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// External trainer subprocess.
    #[serde(default)]
    pub trainer: TrainerConfig,
    /// Epochs per trial unless overridden on the command line.
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Compute device handed to the trainer (e.g. `cpu`, `cuda`).
    #[serde(default = "default_device")]
    pub device: String,
    /// Seed forwarded to the trainer for reproducible runs.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            checkpoint_dir: default_checkpoint_dir(),
            vectors_path: default_vectors_path(),
            data_dir: default_data_dir(),
            trainer: TrainerConfig::default(),
            epochs: default_epochs(),
            device: default_device(),
            seed: default_seed(),
        }
    }
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_vectors_path() -> PathBuf {
    PathBuf::from("wiki-news-300d-1M.vec")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/aclImdb")
}

fn default_epochs() -> u32 {
    5
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_seed() -> u64 {
    42
}

/// External trainer subprocess configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Program to spawn for each trial phase.
    #[serde(default = "default_trainer_command")]
    pub command: String,
    /// Leading arguments; the phase and checkpoint directory are appended.
    #[serde(default = "default_trainer_args")]
    pub args: Vec<String>,
    /// Maximum duration of one phase before the subprocess is stopped.
    #[serde(default = "default_trainer_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            command: default_trainer_command(),
            args: default_trainer_args(),
            timeout_secs: default_trainer_timeout(),
        }
    }
}

fn default_trainer_command() -> String {
    "python3".to_string()
}

fn default_trainer_args() -> Vec<String> {
    vec!["scripts/run_trial.py".to_string()]
}

fn default_trainer_timeout() -> u64 {
    3600
}

/// Load configuration with figment layering.
///
/// Later layers win: defaults, then the user-level config file, then
/// `gridsweep.toml` in the workspace, then `GRIDSWEEP_`-prefixed environment
/// variables (`GRIDSWEEP_TRAINER__COMMAND` etc.), then explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SweepConfig>,
) -> Result<SweepConfig> {
    let mut figment = Figment::from(Serialized::defaults(SweepConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "gridsweep", "gridsweep") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join("gridsweep.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("GRIDSWEEP_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment
        .extract()
        .map_err(|e| SweepError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_reference_sweep() {
        let config = SweepConfig::default();
        assert_eq!(config.grid.len(), 96);
        assert_eq!(config.checkpoint_dir, PathBuf::from("checkpoints"));
        assert_eq!(config.seed, 42);
        assert_eq!(config.trainer.timeout_secs, 3600);
    }

    #[test]
    fn workspace_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("gridsweep.toml"),
            r#"
device = "cuda"
epochs = 12

[grid]
hidden_size = [32]

[trainer]
command = "python"
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.device, "cuda");
        assert_eq!(config.epochs, 12);
        assert_eq!(config.grid.hidden_size, vec![32]);
        // Unset axes keep their defaults.
        assert_eq!(config.grid.lr, vec![1e-3, 1e-2, 1e-1]);
        assert_eq!(config.trainer.command, "python");
    }

    #[test]
    fn toml_roundtrip() {
        let config = SweepConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: SweepConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.grid.len(), config.grid.len());
        assert_eq!(parsed.device, config.device);
    }
}
