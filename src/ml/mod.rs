// ============================================================
// Layer 5 — Networks and Training
// ============================================================
// The adversarial pair and the loop that trains it:
//
//   shapes.rs    — all valid-padding extent arithmetic, in one
//                  place, with the 116-voxel reconciliation check
//   inception.rs — the four-branch 3D convolutional block both
//                  generator stages are built from
//   generator.rs — conditional super-resolution network
//   critic.rs    — Wasserstein critic with gradient penalty
//   trainer.rs   — the n_critic schedule, standardization,
//                  checkpointing, loss history
//
// Everything is generic over Burn's Backend; the production entry
// point instantiates Autodiff<Wgpu> and the tests Autodiff<NdArray>.

/// Extent arithmetic for valid-padded convolution stacks
pub mod shapes;

/// Four-branch Inception block with residual shortcut
pub mod inception;

/// Conditional super-resolution generator
pub mod generator;

/// Wasserstein critic and gradient-penalty loss
pub mod critic;

/// The WGAN-GP training schedule
pub mod trainer;
