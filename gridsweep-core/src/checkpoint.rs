//! Checkpoint store — per-trial slot directories and the results manifest.
//!
//! A slot directory under `<root>/models/` is both where the external trainer
//! persists its model and the completion marker for resume: creating it
//! claims the combination, and an existing directory means the combination
//! was already attempted.

use crate::error::{Result, SweepError};
use crate::grid::{GridPoint, TrialParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Metrics recorded for one completed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_number: usize,
    pub point: GridPoint,
    pub params: TrialParams,
    pub val_loss: f64,
    pub val_acc: f64,
    pub test_loss: f64,
    pub test_acc: f64,
    pub wall_secs: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of trying to claim a checkpoint slot.
#[derive(Debug)]
pub enum SlotClaim {
    /// Fresh slot; the directory now exists and belongs to this trial.
    Claimed(PathBuf),
    /// The slot directory already existed, so the combination was attempted
    /// by an earlier (possibly interrupted) run.
    AlreadyAttempted,
}

/// Filesystem-backed store for checkpoint slots and the results manifest.
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join("results.json")
    }

    /// Claim the slot for `slot_key`.
    ///
    /// The `create_dir` call doubles as the claim: exactly one run can create
    /// the directory, and `AlreadyExists` maps to [`SlotClaim::AlreadyAttempted`].
    pub fn claim(&self, slot_key: &str) -> Result<SlotClaim> {
        let models = self.models_dir();
        std::fs::create_dir_all(&models)?;
        let slot = models.join(slot_key);
        match std::fs::create_dir(&slot) {
            Ok(()) => Ok(SlotClaim::Claimed(slot)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(SlotClaim::AlreadyAttempted),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the results manifest. Missing manifest reads as an empty sweep.
    pub fn load_results(&self) -> Result<Vec<TrialResult>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Append one result to the manifest, rewriting it atomically.
    pub fn append_result(&self, result: &TrialResult) -> Result<()> {
        let mut results = self.load_results()?;
        results.push(result.clone());
        atomic_write_json(&self.manifest_path(), &results)
    }
}

/// Write pretty-printed JSON to a `.tmp` sibling, then rename into place, so
/// a crash mid-write never leaves a truncated manifest.
pub(crate) fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_result(trial_number: usize) -> TrialResult {
        let point = GridPoint {
            hidden_size: 64,
            num_layers: 2,
            dropout: 0.5,
            bidirectional: true,
            batch_size: 64,
            lr: 0.001,
        };
        TrialResult {
            trial_number,
            point,
            params: TrialParams::from(&point),
            val_loss: 0.42,
            val_acc: 0.85,
            test_loss: 0.45,
            test_acc: 0.83,
            wall_secs: 17,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn claim_creates_slot_once() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path().join("checkpoints"));

        match store.claim("64_2_0.5_true_64_0.001").unwrap() {
            SlotClaim::Claimed(slot) => assert!(slot.is_dir()),
            SlotClaim::AlreadyAttempted => panic!("first claim must succeed"),
        }
        assert!(matches!(
            store.claim("64_2_0.5_true_64_0.001").unwrap(),
            SlotClaim::AlreadyAttempted
        ));
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::new(dir.path());

        assert!(store.load_results().unwrap().is_empty());

        store.append_result(&sample_result(1)).unwrap();
        store.append_result(&sample_result(2)).unwrap();

        let loaded = store.load_results().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].trial_number, 1);
        assert_eq!(loaded[1].trial_number, 2);

        // No .tmp leftover from the atomic write.
        assert!(!dir.path().join("results.tmp").exists());
    }
}
