// ============================================================
// Layer 3 — Domain Types
// ============================================================
// The vocabulary of the whole system, free of any framework:
//
//   volume.rs — a cubic 3D scalar lattice (64³ or 128³ voxels)
//   sample.rs — one co-registered training tuple
//               (high-res target, delta, vbv, low-res input)
//   traits.rs — the VolumeSource seam between the data pipeline
//               and the on-disk simulation file format
//
// Nothing in this layer imports burn, clap, or matfile — a
// Volume is just an edge length and a Vec<f32>, so every other
// layer can be tested against plain values.

/// Cubic 3D scalar lattice with a fixed edge length
pub mod volume;

/// One (target, delta, vbv, low-res) training tuple
pub mod sample;

/// Abstractions over on-disk volume storage
pub mod traits;
