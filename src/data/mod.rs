// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the simulation files on disk and the tensor
// batches the networks consume:
//
//   outputs/*.mat, IC/*.mat
//       │
//       ▼
//   DataManager       → indexes files by (seed, redshift), loads
//       │               volumes through a VolumeSource
//       ▼
//   VolumeAugmenter   → one of 24 cube symmetries per variant
//       │
//       ▼
//   LowResStrategy    → derives the 64³ generator input
//       │
//       ▼
//   VolumeDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   VolumeBatcher     → stacks samples into NCDHW tensors
//       │
//       ▼
//   standardize       → per-sample zero-mean/unit-std in the loop
//
// Each module is responsible for exactly one step, and the
// VolumeSource seam keeps all of it testable without a single
// real simulation file.

/// The 24 cube symmetries used for data augmentation
pub mod augment;

/// Reads volumes from MATLAB v5 containers via matfile
pub mod loader;

/// Derives the low-res generator input from the target
pub mod lowres;

/// File discovery, eager loading, and lazy sample streaming
pub mod manager;

/// Implements Burn's Dataset trait over materialized samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Per-sample spatial standardization of batch tensors
pub mod standardize;
