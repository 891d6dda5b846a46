// ============================================================
// Layer 2 — Train Use Case
// ============================================================
// Orchestrates one training run end to end: resolve the run's
// hyperparameter grid point, materialize the augmented dataset,
// persist the configuration next to the artifacts, and hand the
// dataset to the training loop.
//
// A "run index" selects one (λ, learning rate) cell out of the
// Cartesian grid of the configured lists, λ-major, so a sweep is
// launched as N identical jobs that differ only in `index`.

use std::{fs, path::PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::MatVolumeSource;
use crate::data::lowres::LowResStrategy;
use crate::data::manager::DataManager;
use crate::data::dataset::VolumeDataset;
use crate::ml::trainer;

const CONFIG_FILE: &str = "train_config.json";

// ─── TrainConfig ──────────────────────────────────────────────────────────────
/// Complete description of one training run. Saved as
/// train_config.json in the model directory so a finished run is
/// reproducible from its artifacts alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Directory holding the outputs/ and IC/ simulation files
    pub data_dir: PathBuf,
    /// Directory receiving checkpoints, loss history, and config
    pub model_dir: PathBuf,
    /// Initial-condition seeds to train on
    pub ic_seeds: Vec<u32>,
    /// Redshifts to train on
    pub redshifts: Vec<u32>,
    /// Which (λ, learning rate) grid cell this run occupies
    pub index: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Critic updates per generator update
    pub n_critic: usize,
    /// Random symmetry variants per seed, on top of the identity
    pub augments: usize,
    pub low_res: LowResStrategy,
    /// Continue from the newest checkpoint instead of starting fresh
    pub resume: bool,
    /// Gradient-penalty coefficients of the sweep grid
    pub lambdas: Vec<f64>,
    /// Learning rates of the sweep grid
    pub learning_rates: Vec<f64>,
    /// Checkpoints retained before rotation deletes the oldest
    pub max_checkpoints: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            model_dir: PathBuf::new(),
            ic_seeds: (1000..1009).collect(),
            redshifts: vec![10],
            index: 0,
            epochs: 200,
            batch_size: 4,
            n_critic: 10,
            augments: 9,
            low_res: LowResStrategy::Decimate,
            resume: false,
            lambdas: vec![10.0],
            learning_rates: vec![1e-6],
            max_checkpoints: 5,
        }
    }
}

impl TrainConfig {
    /// Resolve this run's (λ, learning rate) from its grid index,
    /// λ-major: index = λ_index · |learning_rates| + lr_index.
    pub fn grid_point(&self) -> Result<(f64, f64)> {
        ensure!(
            !self.lambdas.is_empty() && !self.learning_rates.is_empty(),
            "the hyperparameter grid must name at least one λ and one learning rate"
        );
        let cells = self.lambdas.len() * self.learning_rates.len();
        ensure!(
            self.index < cells,
            "run index {} is outside the {}×{} hyperparameter grid",
            self.index,
            self.lambdas.len(),
            self.learning_rates.len()
        );
        Ok((
            self.lambdas[self.index / self.learning_rates.len()],
            self.learning_rates[self.index % self.learning_rates.len()],
        ))
    }

    /// Persist the configuration into the model directory.
    pub fn save(&self) -> Result<()> {
        let path = self.model_dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("cannot write run config to '{}'", path.display()))?;
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase;

impl TrainUseCase {
    /// Run one training job from configuration to trained model.
    pub fn execute(config: TrainConfig) -> Result<()> {
        let (lbda, learning_rate) = config.grid_point()?;
        tracing::info!(
            "Run {}: λ = {lbda}, lr = {learning_rate}, {} seeds × {} redshifts, {} epochs",
            config.index,
            config.ic_seeds.len(),
            config.redshifts.len(),
            config.epochs
        );

        let manager = DataManager::new(
            &config.data_dir,
            config.redshifts.clone(),
            config.ic_seeds.clone(),
            MatVolumeSource,
        );
        let samples = manager.data(
            config.augments > 0,
            config.augments.max(1),
            config.low_res,
        )?;
        let dataset = VolumeDataset::new(samples);
        ensure!(
            dataset.sample_count() > 0,
            "the dataset is empty — nothing to train on"
        );

        fs::create_dir_all(&config.model_dir).with_context(|| {
            format!("cannot create model directory '{}'", config.model_dir.display())
        })?;
        config.save()?;

        trainer::run_training(&config, dataset)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_point_is_lambda_major() {
        let config = TrainConfig {
            lambdas: vec![5.0, 10.0],
            learning_rates: vec![1e-5, 1e-6, 1e-7],
            index: 4,
            ..TrainConfig::default()
        };
        // index 4 = λ row 1, lr column 1.
        assert_eq!(config.grid_point().unwrap(), (10.0, 1e-6));
    }

    #[test]
    fn test_grid_point_rejects_out_of_range_index() {
        let config = TrainConfig {
            lambdas: vec![10.0],
            learning_rates: vec![1e-6],
            index: 1,
            ..TrainConfig::default()
        };
        assert!(config.grid_point().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            model_dir: dir.path().to_path_buf(),
            index: 3,
            lambdas: vec![1.0, 10.0],
            ..TrainConfig::default()
        };
        config.save().unwrap();
        let json = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        let loaded: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.index, 3);
        assert_eq!(loaded.lambdas, vec![1.0, 10.0]);
    }
}
