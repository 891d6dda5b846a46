// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists and restores the full training state using Burn's
// named-MessagePack file recorder at full precision (the resume
// guard compares weight checksums, so restores must be
// bit-identical): generator weights, critic weights, and both
// Adam optimizers' moment state. One snapshot = four record
// files keyed by a monotonically increasing save counter:
//
//   <model_dir>/checkpoints/
//     ckpt-<n>-generator.mpk
//     ckpt-<n>-critic.mpk
//     ckpt-<n>-generator-optimizer.mpk
//     ckpt-<n>-critic-optimizer.mpk
//   <model_dir>/latest.json   ← counter of the newest snapshot
//
// Retention is bounded: once more than `max_keep` snapshots
// exist, the oldest is deleted after each save. Rotation matches
// files by their `ckpt-<n>-` name prefix rather than guessing
// the recorder's extension. A run owns its model directory
// exclusively for its lifetime — there are no concurrent writers
// to guard against.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    record::{DefaultFileRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};

type SnapshotRecorder = DefaultFileRecorder<FullPrecisionSettings>;

const GENERATOR: &str = "generator";
const CRITIC: &str = "critic";
const GENERATOR_OPTIMIZER: &str = "generator-optimizer";
const CRITIC_OPTIMIZER: &str = "critic-optimizer";

/// Saves and restores rotated training snapshots.
pub struct CheckpointManager {
    model_dir: PathBuf,
    max_keep: usize,
}

impl CheckpointManager {
    /// Create a manager for one run's model directory, creating
    /// the directory tree if needed.
    pub fn new(model_dir: impl Into<PathBuf>, max_keep: usize) -> Self {
        let model_dir = model_dir.into();
        fs::create_dir_all(model_dir.join("checkpoints")).ok();
        Self {
            model_dir,
            max_keep,
        }
    }

    fn latest_path(&self) -> PathBuf {
        self.model_dir.join("latest.json")
    }

    /// Record path for one part of one snapshot, without the
    /// extension the recorder appends.
    fn part_path(&self, counter: usize, part: &str) -> PathBuf {
        self.model_dir
            .join("checkpoints")
            .join(format!("ckpt-{counter}-{part}"))
    }

    /// True once at least one snapshot was saved.
    pub fn has_checkpoints(&self) -> bool {
        self.latest_path().exists()
    }

    /// Counter of the newest snapshot.
    pub fn latest(&self) -> Result<usize> {
        let s = fs::read_to_string(self.latest_path())
            .context("no checkpoint pointer found — has this run saved a snapshot yet?")?;
        Ok(serde_json::from_str(&s)?)
    }

    /// Save snapshot `counter` (all four records), update the
    /// latest pointer, and drop the oldest snapshot beyond the
    /// retention window.
    pub fn save<B, GM, CM, OG, OC>(
        &self,
        counter: usize,
        generator: &GM,
        critic: &CM,
        generator_optimizer: &OG,
        critic_optimizer: &OC,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        GM: AutodiffModule<B> + Clone,
        CM: AutodiffModule<B> + Clone,
        OG: Optimizer<GM, B>,
        OC: Optimizer<CM, B>,
    {
        let recorder = SnapshotRecorder::new();
        recorder
            .record(
                generator.clone().into_record(),
                self.part_path(counter, GENERATOR),
            )
            .with_context(|| format!("failed to save generator snapshot {counter}"))?;
        recorder
            .record(critic.clone().into_record(), self.part_path(counter, CRITIC))
            .with_context(|| format!("failed to save critic snapshot {counter}"))?;
        recorder
            .record(
                generator_optimizer.to_record(),
                self.part_path(counter, GENERATOR_OPTIMIZER),
            )
            .with_context(|| format!("failed to save generator optimizer snapshot {counter}"))?;
        recorder
            .record(
                critic_optimizer.to_record(),
                self.part_path(counter, CRITIC_OPTIMIZER),
            )
            .with_context(|| format!("failed to save critic optimizer snapshot {counter}"))?;

        fs::write(self.latest_path(), serde_json::to_string(&counter)?)
            .context("failed to update the latest-checkpoint pointer")?;
        tracing::debug!("Saved checkpoint {counter}");

        self.rotate(counter);
        Ok(())
    }

    /// Restore the newest snapshot into freshly built models and
    /// optimizers. The caller is responsible for the resume guard
    /// (verifying the weights actually changed).
    pub fn restore<B, GM, CM, OG, OC>(
        &self,
        generator: GM,
        critic: CM,
        generator_optimizer: OG,
        critic_optimizer: OC,
        device: &B::Device,
    ) -> Result<(GM, CM, OG, OC, usize)>
    where
        B: AutodiffBackend,
        GM: AutodiffModule<B>,
        CM: AutodiffModule<B>,
        OG: Optimizer<GM, B>,
        OC: Optimizer<CM, B>,
    {
        let counter = self.latest()?;
        tracing::info!("Restoring checkpoint {counter}");
        let recorder = SnapshotRecorder::new();

        let record = recorder
            .load(self.part_path(counter, GENERATOR), device)
            .with_context(|| format!("cannot load generator snapshot {counter}"))?;
        let generator = generator.load_record(record);

        let record = recorder
            .load(self.part_path(counter, CRITIC), device)
            .with_context(|| format!("cannot load critic snapshot {counter}"))?;
        let critic = critic.load_record(record);

        let record = recorder
            .load(self.part_path(counter, GENERATOR_OPTIMIZER), device)
            .with_context(|| format!("cannot load generator optimizer snapshot {counter}"))?;
        let generator_optimizer = generator_optimizer.load_record(record);

        let record = recorder
            .load(self.part_path(counter, CRITIC_OPTIMIZER), device)
            .with_context(|| format!("cannot load critic optimizer snapshot {counter}"))?;
        let critic_optimizer = critic_optimizer.load_record(record);

        Ok((generator, critic, generator_optimizer, critic_optimizer, counter))
    }

    /// Delete the snapshot that fell out of the retention window.
    /// Matching by the `ckpt-<n>-` prefix catches all four parts
    /// whatever extension the recorder appended. `ckpt-12-...`
    /// does not start with `ckpt-1-`, so only snapshot n goes.
    fn rotate(&self, counter: usize) {
        if counter <= self.max_keep {
            return;
        }
        let stale = counter - self.max_keep;
        let prefix = format!("ckpt-{stale}-");
        let Ok(entries) = fs::read_dir(self.model_dir.join("checkpoints")) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    tracing::warn!(
                        "Could not remove stale checkpoint '{}': {e}",
                        entry.path().display()
                    );
                }
            }
        }
        tracing::debug!("Rotated out checkpoint {stale}");
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::critic::CriticConfig;
    use crate::ml::generator::GeneratorConfig;
    use burn::optim::AdamConfig;

    type TestAutodiff = burn::backend::Autodiff<burn::backend::NdArray>;

    #[test]
    fn test_save_restore_round_trips_weights() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 5);

        let generator = GeneratorConfig::new().init::<TestAutodiff>(&device);
        let critic = CriticConfig::new(20).init::<TestAutodiff>(&device);
        let gen_optim = AdamConfig::new().init();
        let critic_optim = AdamConfig::new().init();
        let saved_checksum = generator.weight_checksum();

        manager
            .save(1, &generator, &critic, &gen_optim, &critic_optim)
            .unwrap();
        assert!(manager.has_checkpoints());
        assert_eq!(manager.latest().unwrap(), 1);

        // Restore into a freshly initialized (different) model.
        let fresh = GeneratorConfig::new().init::<TestAutodiff>(&device);
        assert_ne!(fresh.weight_checksum(), saved_checksum);
        let (restored, _, _, _, counter) = manager
            .restore(
                fresh,
                CriticConfig::new(20).init::<TestAutodiff>(&device),
                AdamConfig::new().init(),
                AdamConfig::new().init(),
                &device,
            )
            .unwrap();
        assert_eq!(counter, 1);
        assert_eq!(restored.weight_checksum(), saved_checksum);
    }

    #[test]
    fn test_rotation_drops_snapshots_beyond_window() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 2);

        let generator = GeneratorConfig::new().init::<TestAutodiff>(&device);
        let critic = CriticConfig::new(20).init::<TestAutodiff>(&device);
        let gen_optim = AdamConfig::new().init();
        let critic_optim = AdamConfig::new().init();

        for counter in 1..=4 {
            manager
                .save(counter, &generator, &critic, &gen_optim, &critic_optim)
                .unwrap();
        }

        let exists = |counter: usize| {
            let mut p = manager.part_path(counter, GENERATOR);
            p.set_extension("mpk");
            p.exists()
        };
        assert!(!exists(1));
        assert!(!exists(2));
        assert!(exists(3));
        assert!(exists(4));
        assert_eq!(manager.latest().unwrap(), 4);

        // Two retained snapshots of four parts each, nothing else.
        let on_disk = fs::read_dir(dir.path().join("checkpoints")).unwrap().count();
        assert_eq!(on_disk, 8);
    }

    #[test]
    fn test_restore_without_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 5);
        let result = manager.restore(
            GeneratorConfig::new().init::<TestAutodiff>(&device),
            CriticConfig::new(20).init::<TestAutodiff>(&device),
            AdamConfig::new().init(),
            AdamConfig::new().init(),
            &device,
        );
        assert!(result.is_err());
    }
}
