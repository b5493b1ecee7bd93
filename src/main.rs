// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use scanner::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "scanner")]
#[command(about = "Scan barcodes from camera frames, one decode at a time")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    /// Config file (default: ~/.config/scanner/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed images through the throttler as a simulated camera
    Scan {
        /// Image files, submitted in order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Delay between frames in milliseconds (overrides config)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Sensor rotation in degrees reported with each frame
        #[arg(short, long, default_value = "0")]
        rotation: i32,

        /// Print the final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a single image directly and list every candidate
    Decode {
        /// Image file
        image: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    // Set RUST_LOG to override the configured filter
    // Examples: RUST_LOG=debug, RUST_LOG=scanner=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    match cli.command {
        Commands::Scan {
            images,
            interval_ms,
            rotation,
            json,
        } => cli::scan_images(&config, &images, interval_ms, rotation, json)?,
        Commands::Decode { image } => cli::decode_image(&config, &image)?,
    }

    Ok(())
}
