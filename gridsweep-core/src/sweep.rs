//! The sweep loop: enumerate the grid, claim slots, run trials, record results.

use crate::checkpoint::{CheckpointStore, SlotClaim, TrialResult};
use crate::config::SweepConfig;
use crate::error::Result;
use crate::grid::TrialParams;
use crate::trainer::{Trainer, TrialJob};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Summary of one sweep run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub total_trials: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_wall_secs: u64,
    /// Results recorded during this run, in trial order.
    pub results: Vec<TrialResult>,
}

impl SweepReport {
    /// Best completed trial of this run, by validation accuracy.
    pub fn best(&self) -> Option<&TrialResult> {
        best_by_val_acc(&self.results)
    }
}

/// Best trial by validation accuracy, for this run or a loaded manifest.
pub fn best_by_val_acc(results: &[TrialResult]) -> Option<&TrialResult> {
    results.iter().max_by(|a, b| {
        a.val_acc
            .partial_cmp(&b.val_acc)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Drives one full pass over the grid.
pub struct SweepRunner<T: Trainer> {
    config: SweepConfig,
    store: CheckpointStore,
    trainer: T,
}

impl<T: Trainer> SweepRunner<T> {
    pub fn new(config: SweepConfig, trainer: T) -> Self {
        let store = CheckpointStore::new(&config.checkpoint_dir);
        Self {
            config,
            store,
            trainer,
        }
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run every grid combination not yet attempted.
    ///
    /// Combinations whose slot directory already exists are skipped, so an
    /// interrupted sweep resumes where it left off. Bad trials (no usable
    /// loss) keep their claimed slot but record nothing. Trainer errors abort
    /// the sweep; the claimed slot means a rerun will not retry the
    /// combination.
    pub async fn run(&self, epochs: u32, device: &str) -> Result<SweepReport> {
        let points = self.config.grid.combinations();
        let total = points.len();
        let started = Instant::now();

        let mut report = SweepReport {
            total_trials: total,
            completed: 0,
            skipped: 0,
            failed: 0,
            total_wall_secs: 0,
            results: Vec::new(),
        };

        for (i, point) in points.iter().enumerate() {
            let trial_number = i + 1;
            let params = TrialParams::from(point);
            info!(trial = trial_number, total, ?params, "starting trial");

            let slot = match self.store.claim(&point.slot_key())? {
                SlotClaim::Claimed(slot) => slot,
                SlotClaim::AlreadyAttempted => {
                    info!(
                        trial = trial_number,
                        slot = %point.slot_key(),
                        "already attempted, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let trial_started = Instant::now();
            let job = TrialJob {
                params,
                epochs,
                device: device.to_string(),
                seed: self.config.seed,
                vectors_path: self.config.vectors_path.clone(),
                data_dir: self.config.data_dir.clone(),
                checkpoint_dir: slot,
            };

            let Some(outcome) = self.trainer.train(&job).await? else {
                warn!(trial = trial_number, "no usable loss, bad trial");
                report.failed += 1;
                continue;
            };
            let eval = self.trainer.evaluate(&job).await?;
            let wall_secs = trial_started.elapsed().as_secs();

            info!(
                trial = trial_number,
                total,
                test_loss = eval.test_loss,
                test_acc = eval.test_acc,
                wall_secs,
                "trial complete"
            );

            let result = TrialResult {
                trial_number,
                point: *point,
                params,
                val_loss: outcome.val_loss,
                val_acc: outcome.val_acc,
                test_loss: eval.test_loss,
                test_acc: eval.test_acc,
                wall_secs,
                recorded_at: Utc::now(),
            };
            self.store.append_result(&result)?;
            report.results.push(result);
            report.completed += 1;
        }

        report.total_wall_secs = started.elapsed().as_secs();
        info!(
            total,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed,
            total_wall_secs = report.total_wall_secs,
            "sweep finished"
        );
        Ok(report)
    }
}
