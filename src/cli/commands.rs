// ============================================================
// Layer 1 — Command Definitions
// ============================================================
// Clap argument structs for the two subcommands. Defaults here
// mirror TrainConfig's defaults; the conversion below is the only
// place CLI types touch the application layer, so clap never
// leaks further down.

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::lowres::LowResStrategy;

/// CLI-facing mirror of [`LowResStrategy`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LowResArg {
    /// Keep every second lattice point per axis
    Decimate,
    /// Mean over each 2×2×2 block
    AveragePool,
}

impl From<LowResArg> for LowResStrategy {
    fn from(arg: LowResArg) -> Self {
        match arg {
            LowResArg::Decimate => LowResStrategy::Decimate,
            LowResArg::AveragePool => LowResStrategy::AveragePool,
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
/// Train the conditional super-resolution GAN.
#[derive(Debug, Args)]
pub struct TrainArgs {
    /// Directory holding the outputs/ and IC/ simulation files
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Directory receiving checkpoints, loss history, and config
    #[arg(long)]
    pub model_dir: PathBuf,

    /// Initial-condition seeds, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = 1000..1009)]
    pub seeds: Vec<u32>,

    /// Redshifts, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [10])]
    pub redshifts: Vec<u32>,

    /// Which (λ, learning rate) grid cell this job occupies
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Critic updates per generator update
    #[arg(long, default_value_t = 10)]
    pub n_critic: usize,

    /// Random symmetry variants per seed, on top of the identity
    #[arg(long, default_value_t = 9)]
    pub augments: usize,

    /// How the low-res generator input is derived from the target
    #[arg(long, value_enum, default_value_t = LowResArg::Decimate)]
    pub low_res: LowResArg,

    /// Continue from the newest checkpoint instead of starting fresh
    #[arg(long)]
    pub resume: bool,

    /// Gradient-penalty coefficients of the sweep grid
    #[arg(long, value_delimiter = ',', default_values_t = [10.0])]
    pub lambdas: Vec<f64>,

    /// Learning rates of the sweep grid
    #[arg(long, value_delimiter = ',', default_values_t = [1e-6])]
    pub learning_rates: Vec<f64>,

    /// Checkpoints retained before rotation deletes the oldest
    #[arg(long, default_value_t = 5)]
    pub max_checkpoints: usize,
}

impl From<TrainArgs> for TrainConfig {
    fn from(args: TrainArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            model_dir: args.model_dir,
            ic_seeds: args.seeds,
            redshifts: args.redshifts,
            index: args.index,
            epochs: args.epochs,
            batch_size: args.batch_size,
            n_critic: args.n_critic,
            augments: args.augments,
            low_res: args.low_res.into(),
            resume: args.resume,
            lambdas: args.lambdas,
            learning_rates: args.learning_rates,
            max_checkpoints: args.max_checkpoints,
        }
    }
}

// ─── scan ─────────────────────────────────────────────────────────────────────
/// Report missing simulation files without loading anything.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory holding the outputs/ and IC/ simulation files
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Initial-condition seeds, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = 1000..1009)]
    pub seeds: Vec<u32>,

    /// Redshifts, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [10])]
    pub redshifts: Vec<u32>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        train: TrainArgs,
    }

    #[test]
    fn test_defaults_match_the_production_run() {
        let h = Harness::parse_from(["t", "--data-dir", "/d", "--model-dir", "/m"]);
        let config: TrainConfig = h.train.into();
        assert_eq!(config.ic_seeds, (1000..1009).collect::<Vec<_>>());
        assert_eq!(config.redshifts, vec![10]);
        assert_eq!(config.epochs, 200);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.n_critic, 10);
        assert_eq!(config.augments, 9);
        assert_eq!(config.low_res, LowResStrategy::Decimate);
        assert!(!config.resume);
    }

    #[test]
    fn test_comma_separated_lists_parse() {
        let h = Harness::parse_from([
            "t",
            "--data-dir",
            "/d",
            "--model-dir",
            "/m",
            "--seeds",
            "1,2,3",
            "--lambdas",
            "1.0,10.0",
            "--learning-rates",
            "1e-5,1e-6",
            "--index",
            "3",
        ]);
        let config: TrainConfig = h.train.into();
        assert_eq!(config.ic_seeds, vec![1, 2, 3]);
        assert_eq!(config.grid_point().unwrap(), (10.0, 1e-6));
    }
}
