// ============================================================
// Layer 1 — Command-Line Interface
// ============================================================
// Two subcommands:
//
//   train — run one WGAN-GP training job
//   scan  — check a data directory for missing simulation files
//
// Parsing lives in commands.rs; this module only dispatches.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::application::scan_use_case::ScanUseCase;
use crate::application::train_use_case::TrainUseCase;
use commands::{ScanArgs, TrainArgs};

/// Conditional super-resolution of 21-cm brightness temperature
/// cubes with a Wasserstein GAN.
#[derive(Parser)]
#[command(name = "t21-srgan", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the super-resolution GAN
    Train(TrainArgs),
    /// Report missing simulation files
    Scan(ScanArgs),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Train(args) => TrainUseCase::execute(args.into()),
            Command::Scan(args) => ScanUseCase::execute(args.data_dir, args.seeds, args.redshifts),
        }
    }
}
