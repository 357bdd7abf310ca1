//! # gridsweep-core
//!
//! Library for the gridsweep hyperparameter sweep driver: grid expansion,
//! checkpoint-slot bookkeeping, the external-trainer seam, and the sweep
//! loop that ties them together. The actual model training and evaluation
//! happen behind the [`trainer::Trainer`] trait.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod grid;
pub mod sweep;
pub mod trainer;

// Re-export commonly used types at the crate root.
pub use checkpoint::{CheckpointStore, SlotClaim, TrialResult};
pub use config::{load_config, SweepConfig, TrainerConfig};
pub use error::{Result, SweepError};
pub use grid::{GridPoint, ParamGrid, TrialParams};
pub use sweep::{best_by_val_acc, SweepReport, SweepRunner};
pub use trainer::{CommandTrainer, EvalOutcome, Trainer, TrainOutcome, TrialJob};
