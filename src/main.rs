// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use device_bridge::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "device-bridge")]
#[command(about = "QR scanning and biometric prompts from the command line")]
#[command(version = device_bridge::constants::app_info::version())]
struct Cli {
    /// Config file (default: <config dir>/device-bridge/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an image file for a QR code through the capture pipeline
    Scan {
        /// Image to feed as camera frames
        image: PathBuf,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "5")]
        timeout: u64,
    },

    /// Manage the backup PIN
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },

    /// Biometric prompt
    Biometric {
        #[command(subcommand)]
        action: BiometricAction,
    },
}

#[derive(Subcommand)]
enum PinAction {
    /// Save a new backup PIN
    Set { pin: String },
    /// Check a PIN against the saved one
    Verify { pin: String },
}

#[derive(Subcommand)]
enum BiometricAction {
    /// Report sensor availability
    Status,
    /// Show the prompt and print the result
    Auth,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=device_bridge=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    match cli.command {
        Commands::Scan { image, timeout } => cli::scan_image(&config, image, timeout).await,
        Commands::Pin { action } => match action {
            PinAction::Set { pin } => cli::set_pin(&config, &pin).await,
            PinAction::Verify { pin } => cli::verify_pin(&config, &pin).await,
        },
        Commands::Biometric { action } => match action {
            BiometricAction::Status => cli::biometric_status(&config),
            BiometricAction::Auth => cli::biometric_auth(&config).await,
        },
    }
}
