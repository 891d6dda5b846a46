// ============================================================
// Layer 6 — Loss History
// ============================================================
// The persistent record of a training run: three sequences with
// exactly one value per epoch —
//
//   generator        — mean generator loss of the epoch
//   critic           — mean critic loss of the epoch
//   gradient_penalty — mean gradient penalty of the epoch
//
// The record is append-only: resuming a run reloads it and keeps
// appending, never rewriting earlier epochs. Stored as
// losses.json in the model directory so the loss curves survive
// the process and can be plotted later.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

const FILE_NAME: &str = "losses.json";

/// Per-epoch loss record of one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LossHistory {
    pub generator: Vec<f64>,
    pub critic: Vec<f64>,
    pub gradient_penalty: Vec<f64>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded epochs. The three sequences always grow
    /// in lockstep.
    pub fn epochs(&self) -> usize {
        debug_assert_eq!(self.generator.len(), self.critic.len());
        debug_assert_eq!(self.generator.len(), self.gradient_penalty.len());
        self.generator.len()
    }

    /// Append one epoch's mean losses.
    pub fn append_epoch(&mut self, generator: f64, critic: f64, gradient_penalty: f64) {
        self.generator.push(generator);
        self.critic.push(critic);
        self.gradient_penalty.push(gradient_penalty);
    }

    pub fn file_path(model_dir: &Path) -> PathBuf {
        model_dir.join(FILE_NAME)
    }

    pub fn exists(model_dir: &Path) -> bool {
        Self::file_path(model_dir).exists()
    }

    /// Write the record to `<model_dir>/losses.json`.
    pub fn save(&self, model_dir: &Path) -> Result<()> {
        let path = Self::file_path(model_dir);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write loss history to '{}'", path.display()))?;
        tracing::debug!("Saved loss history ({} epochs)", self.epochs());
        Ok(())
    }

    /// Load the record back, verifying the three sequences are in
    /// lockstep.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let path = Self::file_path(model_dir);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("cannot read loss history from '{}'", path.display()))?;
        let history: Self = serde_json::from_str(&json)?;
        ensure!(
            history.generator.len() == history.critic.len()
                && history.generator.len() == history.gradient_penalty.len(),
            "loss history in '{}' is corrupt: sequences have different lengths",
            path.display()
        );
        Ok(history)
    }
}
