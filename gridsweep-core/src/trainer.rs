//! Trainer seam — the external train/test machinery behind a trait.
//!
//! The sweep never trains anything itself. [`Trainer`] is the boundary, and
//! [`CommandTrainer`] is the production implementation: it hands the trial to
//! a configured subprocess and reads metrics back from JSON files in the
//! claimed checkpoint directory. Model architecture, optimization, embedding
//! loading, and dataset splitting all live on the far side of this seam.

use crate::checkpoint::atomic_write_json;
use crate::config::TrainerConfig;
use crate::error::{Result, SweepError};
use crate::grid::TrialParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Everything the external trainer needs to run one trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialJob {
    pub params: TrialParams,
    pub epochs: u32,
    pub device: String,
    pub seed: u64,
    /// Pre-trained embedding vectors file, forwarded untouched.
    pub vectors_path: PathBuf,
    /// Dataset root directory, forwarded untouched.
    pub data_dir: PathBuf,
    /// The claimed slot; the trainer persists its model and metrics here.
    pub checkpoint_dir: PathBuf,
}

/// Final validation metrics from the training phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub val_loss: f64,
    pub val_acc: f64,
}

/// Held-out test metrics from the evaluation phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub test_loss: f64,
    pub test_acc: f64,
}

/// External training machinery.
#[async_trait]
pub trait Trainer: Send + Sync {
    /// Train one model. `Ok(None)` means the trial diverged and produced no
    /// usable loss; the sweep records nothing for it and moves on.
    async fn train(&self, job: &TrialJob) -> Result<Option<TrainOutcome>>;

    /// Evaluate the trained model on the test split.
    async fn evaluate(&self, job: &TrialJob) -> Result<EvalOutcome>;
}

/// Metrics file the training subprocess leaves in the checkpoint directory.
#[derive(Debug, Deserialize)]
struct TrainMetricsFile {
    #[serde(default)]
    diverged: bool,
    val_loss: Option<f64>,
    val_acc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TestMetricsFile {
    test_loss: Option<f64>,
    test_acc: Option<f64>,
}

/// Subprocess-backed [`Trainer`].
///
/// Protocol: the job is written as `trial.json` into the checkpoint
/// directory, then `<program> <args…> train <dir>` is spawned and expected
/// to leave `train_metrics.json` behind; evaluation runs
/// `<program> <args…> test <dir>` and reads `test_metrics.json`.
pub struct CommandTrainer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTrainer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &TrainerConfig) -> Self {
        Self::new(
            &config.command,
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn run_phase(&self, phase: &str, dir: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(phase)
            .arg(dir)
            .kill_on_drop(true);
        debug!(program = %self.program, phase, dir = %dir.display(), "spawning trainer subprocess");

        let status = tokio::time::timeout(self.timeout, cmd.status())
            .await
            .map_err(|_| SweepError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        if status.success() {
            Ok(())
        } else {
            let msg = format!("trainer subprocess {phase} phase exited with {status}");
            Err(match phase {
                "test" => SweepError::evaluation(msg),
                _ => SweepError::training(msg),
            })
        }
    }

    fn read_metrics<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(SweepError::training(format!(
                "trainer left no metrics file at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl Trainer for CommandTrainer {
    async fn train(&self, job: &TrialJob) -> Result<Option<TrainOutcome>> {
        atomic_write_json(&job.checkpoint_dir.join("trial.json"), job)?;
        self.run_phase("train", &job.checkpoint_dir).await?;

        let metrics: TrainMetricsFile =
            Self::read_metrics(&job.checkpoint_dir.join("train_metrics.json"))?;
        match (metrics.diverged, metrics.val_loss, metrics.val_acc) {
            (false, Some(val_loss), Some(val_acc)) => {
                Ok(Some(TrainOutcome { val_loss, val_acc }))
            }
            // Divergence and a missing loss both read as a bad trial.
            _ => Ok(None),
        }
    }

    async fn evaluate(&self, job: &TrialJob) -> Result<EvalOutcome> {
        self.run_phase("test", &job.checkpoint_dir).await?;

        let metrics: TestMetricsFile =
            Self::read_metrics(&job.checkpoint_dir.join("test_metrics.json"))?;
        match (metrics.test_loss, metrics.test_acc) {
            (Some(test_loss), Some(test_acc)) => Ok(EvalOutcome {
                test_loss,
                test_acc,
            }),
            _ => Err(SweepError::evaluation(
                "test metrics file is missing test_loss or test_acc",
            )),
        }
    }
}
