//! gridsweep CLI — run hyperparameter sweeps and report on past runs.

use clap::Parser;
use gridsweep_core::{
    best_by_val_acc, load_config, CheckpointStore, CommandTrainer, SweepRunner, TrialResult,
};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Gridsweep: hyperparameter grid search for sentiment-classifier training
#[derive(Parser, Debug)]
#[command(name = "gridsweep", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (where gridsweep.toml is looked up)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the sweep, skipping combinations already attempted
    Run {
        /// Epochs per trial (defaults to the configured value)
        epochs: Option<u32>,

        /// Compute device handed to the trainer (defaults to the configured value)
        device: Option<String>,

        /// Override the checkpoint root directory
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,
    },
    /// Print recorded results and the best trial without training anything
    Report {
        /// Override the checkpoint root directory
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "gridsweep", "gridsweep")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "gridsweep.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| cli.workspace.clone());

    let mut config = load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    tracing::debug!(workspace = %workspace.display(), "configuration loaded");

    match cli.command {
        Commands::Run {
            epochs,
            device,
            checkpoint_dir,
        } => {
            if let Some(dir) = checkpoint_dir {
                config.checkpoint_dir = dir;
            }
            let epochs = epochs.unwrap_or(config.epochs);
            let device = device.unwrap_or_else(|| config.device.clone());

            let trainer = CommandTrainer::from_config(&config.trainer);
            let runner = SweepRunner::new(config, trainer);
            let report = runner.run(epochs, &device).await?;

            println!(
                "Sweep finished: {} completed, {} skipped, {} bad, {}s total",
                report.completed, report.skipped, report.failed, report.total_wall_secs
            );
            if let Some(best) = report.best() {
                print_trial("Best trial (this run)", best);
            }
        }
        Commands::Report { checkpoint_dir } => {
            if let Some(dir) = checkpoint_dir {
                config.checkpoint_dir = dir;
            }
            let store = CheckpointStore::new(&config.checkpoint_dir);
            let results = store.load_results()?;
            if results.is_empty() {
                println!("No recorded trials under {}", config.checkpoint_dir.display());
                return Ok(());
            }

            for result in &results {
                println!(
                    "trial {:>3}  {}  val_loss {:.4}  val_acc {:.4}  test_loss {:.4}  test_acc {:.4}  {}s",
                    result.trial_number,
                    result.point.slot_key(),
                    result.val_loss,
                    result.val_acc,
                    result.test_loss,
                    result.test_acc,
                    result.wall_secs,
                );
            }
            if let Some(best) = best_by_val_acc(&results) {
                print_trial("Best trial", best);
            }
        }
    }

    Ok(())
}

fn print_trial(label: &str, trial: &TrialResult) {
    println!(
        "{label}: #{} {:?}, val_acc {:.4}, test_acc {:.4}",
        trial.trial_number, trial.params, trial.val_acc, trial.test_acc
    );
}
