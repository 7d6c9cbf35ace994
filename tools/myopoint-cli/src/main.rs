//! Myopoint CLI: replay, simulate, and configure the pointer controller.
//!
//! Usage:
//!   myopoint replay <PATH>          Run a recorded sample stream through the engine
//!   myopoint simulate -o <PATH>     Generate a synthetic sample stream
//!   myopoint thresholds show|set    Inspect or update persisted click thresholds
//!   myopoint check                  Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use myopoint_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "myopoint",
    about = "Hands-free pointer control from forearm IMU and EMG",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded sample stream through the control engine
    Replay {
        /// Path to the JSONL sample stream
        path: PathBuf,

        /// Controller variant: accel, gyro_responsive, gyro_smooth
        #[arg(long)]
        variant: Option<String>,

        /// Hold pointer motion until the EMG envelope shows activation
        #[arg(long)]
        emg_gate: bool,

        /// Threshold record to use instead of the configured one
        #[arg(long)]
        thresholds: Option<PathBuf>,

        /// Write emitted intents to this JSONL file
        #[arg(long)]
        intents_out: Option<PathBuf>,

        /// Pace delivery by sample timestamps instead of as fast as possible
        #[arg(long)]
        realtime: bool,
    },

    /// Generate a synthetic sample stream
    Simulate {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Stream length in seconds
        #[arg(long, default_value = "8.0")]
        secs: f64,

        /// Inertial packet rate
        #[arg(long, default_value = "200")]
        rate_hz: u32,

        /// Variant the stream is meant for (sets the warm-up length)
        #[arg(long, default_value = "gyro_responsive")]
        variant: String,
    },

    /// Inspect or update persisted click thresholds
    Thresholds {
        /// Threshold record to use instead of the configured one
        #[arg(long, global = true)]
        path: Option<PathBuf>,

        #[command(subcommand)]
        action: ThresholdAction,
    },

    /// Show the effective configuration and controller presets
    Check,
}

#[derive(Subcommand)]
enum ThresholdAction {
    /// Print the stored thresholds
    Show,

    /// Update one or more stored thresholds
    Set {
        /// Left click level (µV)
        #[arg(long)]
        left: Option<f64>,

        /// Right click level (µV)
        #[arg(long)]
        right: Option<f64>,

        /// Drag toggle level (µV)
        #[arg(long)]
        hold: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = AppConfig::load();

    let mut logging = app.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if cli.json_logs {
        logging.json = true;
    }
    myopoint_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Replay {
            path,
            variant,
            emg_gate,
            thresholds,
            intents_out,
            realtime,
        } => {
            commands::replay::run(
                &app,
                commands::replay::ReplayOptions {
                    path,
                    variant,
                    emg_gate,
                    thresholds,
                    intents_out,
                    realtime,
                },
            )
            .await
        }
        Commands::Simulate {
            output,
            secs,
            rate_hz,
            variant,
        } => commands::simulate::run(output, secs, rate_hz, &variant),
        Commands::Thresholds { path, action } => {
            let path = path.unwrap_or_else(|| app.thresholds_path.clone());
            match action {
                ThresholdAction::Show => commands::thresholds::show(&path),
                ThresholdAction::Set { left, right, hold } => {
                    commands::thresholds::set(&path, left, right, hold)
                }
            }
        }
        Commands::Check => commands::check::run(&app),
    }
}
