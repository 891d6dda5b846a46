// ============================================================
// Layer 6 — Infrastructure
// ============================================================
// Run persistence: everything a training run leaves on disk and
// needs back after a restart.
//
//   losses.rs     — per-epoch loss record (losses.json)
//   checkpoint.rs — rotated model + optimizer snapshots

/// Append-only per-epoch loss record
pub mod losses;

/// Rotated full-precision training snapshots
pub mod checkpoint;
