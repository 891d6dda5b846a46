// ============================================================
// Layer 5 — Training Loop
// ============================================================
// The adversarial schedule that ties the networks together:
//
//   every batch          → one critic update
//   every n_critic-th    → one generator update as well
//
// Both sides share one learning rate and Adam(β₁ = 0.5,
// β₂ = 0.999) — the low β₁ is standard for adversarial training,
// where stale momentum chases a moving objective.
//
// All mutable run state lives in one explicit TrainingState value
// that is loaded (or initialized) once, passed through each epoch
// by value, and saved at every epoch boundary — so a run can be
// killed and resumed at any epoch.
//
// Standardization happens here, per batch, not in the data
// pipeline: the target is standardized with the LOW-RES box's
// statistics so the generator is never asked to restore a mean
// or scale its input does not carry, the low-res input and vbv
// with their own statistics, and delta stays raw (an overdensity
// contrast is already centered on zero by construction).

use std::time::Instant;

use anyhow::{ensure, Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{VolumeBatch, VolumeBatcher};
use crate::data::dataset::VolumeDataset;
use crate::data::standardize::standardize;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::losses::LossHistory;
use crate::ml::critic::{Critic, CriticConfig};
use crate::ml::generator::{Generator, GeneratorConfig};
use crate::ml::shapes::{critic_input_extent, ensure_extents_consistent};

type AdamOptimizer<B, M> = OptimizerAdaptor<Adam, M, B>;

// ─── TrainingState ────────────────────────────────────────────────────────────
/// Everything a run mutates: both networks, both optimizers, the
/// loss history, and the checkpoint counter. Owned by the epoch
/// loop and passed through it by value; persistence is explicit
/// via `load_or_init` and `save`.
pub struct TrainingState<B: AutodiffBackend> {
    pub generator: Generator<B>,
    pub critic: Critic<B>,
    pub generator_optimizer: AdamOptimizer<B, Generator<B>>,
    pub critic_optimizer: AdamOptimizer<B, Critic<B>>,
    pub history: LossHistory,
    pub save_counter: usize,
}

impl<B: AutodiffBackend> TrainingState<B> {
    /// Build fresh state, or restore the newest checkpoint when
    /// the run resumes. Both directions guard against silent
    /// mistakes: a resume must find artifacts and must actually
    /// change the generator's weights; a fresh start must not
    /// find any artifacts to clobber.
    pub fn load_or_init(
        config: &TrainConfig,
        checkpoints: &CheckpointManager,
        target_edge: usize,
        lbda: f64,
        device: &B::Device,
    ) -> Result<Self> {
        let adam = AdamConfig::new()
            .with_beta_1(0.5)
            .with_beta_2(0.999)
            .with_epsilon(1e-8);
        let mut generator = GeneratorConfig::new().init(device);
        let mut critic = CriticConfig::new(critic_input_extent(target_edge))
            .with_lbda(lbda)
            .init(device);
        let mut generator_optimizer = adam.init();
        let mut critic_optimizer = adam.init();
        let mut history = LossHistory::new();
        let mut save_counter = 0;

        if config.resume {
            history = LossHistory::load(&config.model_dir)
                .context("resume requested but the loss history cannot be read")?;
            ensure!(
                checkpoints.has_checkpoints(),
                "resume requested but '{}' holds no checkpoint",
                config.model_dir.display()
            );
            let fresh_fingerprint = generator.weight_checksum();
            let (g, c, go, co, counter) = checkpoints.restore(
                generator,
                critic,
                generator_optimizer,
                critic_optimizer,
                device,
            )?;
            ensure!(
                g.weight_checksum() != fresh_fingerprint,
                "restoring the checkpoint did not change the generator weights — refusing to \
                 silently retrain from scratch"
            );
            tracing::info!(
                "Resumed after {} completed epochs (checkpoint {counter})",
                history.epochs()
            );
            generator = g;
            critic = c;
            generator_optimizer = go;
            critic_optimizer = co;
            save_counter = counter;
        } else {
            ensure!(
                !LossHistory::exists(&config.model_dir) && !checkpoints.has_checkpoints(),
                "'{}' already holds run artifacts; pass --resume or pick an empty model directory",
                config.model_dir.display()
            );
            history.save(&config.model_dir)?;
        }

        Ok(Self {
            generator,
            critic,
            generator_optimizer,
            critic_optimizer,
            history,
            save_counter,
        })
    }

    /// Persist one epoch boundary: the loss history and one
    /// rotated checkpoint of all four mutable components.
    pub fn save(&mut self, config: &TrainConfig, checkpoints: &CheckpointManager) -> Result<()> {
        self.history.save(&config.model_dir)?;
        self.save_counter += 1;
        checkpoints.save(
            self.save_counter,
            &self.generator,
            &self.critic,
            &self.generator_optimizer,
            &self.critic_optimizer,
        )
    }
}

// ─── Entry points ─────────────────────────────────────────────────────────────
/// Train on the GPU via wgpu. The generic loop below carries the
/// actual schedule; this picks the production backend.
pub fn run_training(config: &TrainConfig, dataset: VolumeDataset) -> Result<()> {
    type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
    let device = burn::backend::wgpu::WgpuDevice::default();
    train_loop::<TrainBackend>(config, dataset, &device)
}

/// Run the full WGAN-GP schedule on any autodiff backend.
pub fn train_loop<B: AutodiffBackend>(
    config: &TrainConfig,
    dataset: VolumeDataset,
    device: &B::Device,
) -> Result<()> {
    let (lbda, learning_rate) = config.grid_point()?;
    let (target_edge, low_res_edge) = dataset
        .edges()
        .context("cannot train on an empty dataset")?;
    ensure_extents_consistent(low_res_edge, target_edge, GeneratorConfig::new().upsampling)?;

    let checkpoints = CheckpointManager::new(&config.model_dir, config.max_checkpoints);
    let mut state = TrainingState::<B>::load_or_init(config, &checkpoints, target_edge, lbda, device)?;

    let dataloader = DataLoaderBuilder::new(VolumeBatcher)
        .batch_size(config.batch_size)
        .shuffle(42)
        .num_workers(1)
        .build(dataset);

    tracing::info!(
        "Training {} epochs at λ = {lbda}, lr = {learning_rate} (run index {})",
        config.epochs,
        config.index
    );

    for epoch in state.history.epochs()..config.epochs {
        let started = Instant::now();
        state = train_epoch(state, config, dataloader.iter(), learning_rate);
        state.save(config, &checkpoints)?;

        let last = state.history.epochs() - 1;
        println!(
            "epoch {:>4}/{} | G {:>10.4} | C {:>10.4} | GP {:>8.4} | {:.1?}",
            epoch + 1,
            config.epochs,
            state.history.generator[last],
            state.history.critic[last],
            state.history.gradient_penalty[last],
            started.elapsed()
        );
        tracing::debug!("Epoch {} took {:?}", epoch + 1, started.elapsed());
    }

    tracing::info!("Training complete after {} epochs", state.history.epochs());
    Ok(())
}

/// One pass over the shuffled loader: a critic step per batch, a
/// generator step every n_critic-th batch, epoch means appended
/// to the history. Takes and returns the state by value.
fn train_epoch<B: AutodiffBackend>(
    mut state: TrainingState<B>,
    config: &TrainConfig,
    batches: impl Iterator<Item = VolumeBatch<B>>,
    learning_rate: f64,
) -> TrainingState<B> {
    let mut generator_losses = Vec::new();
    let mut critic_losses = Vec::new();
    let mut penalties = Vec::new();

    for (i, batch) in batches.enumerate() {
        let step_started = Instant::now();
        let target = standardize(batch.target, batch.low_res.clone());
        let low_res = standardize(batch.low_res.clone(), batch.low_res);
        let vbv = standardize(batch.vbv.clone(), batch.vbv);
        let delta = batch.delta;

        let (critic, critic_loss, penalty) = state.critic.train_step(
            target.clone(),
            delta.clone(),
            vbv.clone(),
            low_res.clone(),
            learning_rate,
            &mut state.critic_optimizer,
            &state.generator,
        );
        state.critic = critic;
        critic_losses.push(critic_loss);
        penalties.push(penalty);

        if i % config.n_critic == 0 {
            let (generator, generator_loss) = state.generator.train_step(
                low_res,
                target,
                delta,
                vbv,
                learning_rate,
                &mut state.generator_optimizer,
                &state.critic,
            );
            state.generator = generator;
            generator_losses.push(generator_loss);
        }
        tracing::debug!("Batch {i} took {:?}", step_started.elapsed());
    }

    let mean = |values: &[f64]| {
        if values.is_empty() {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    state
        .history
        .append_epoch(mean(&generator_losses), mean(&critic_losses), mean(&penalties));
    state
}
