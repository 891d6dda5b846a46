// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The simulation outputs live in a third-party scientific matrix
// container. The pipeline only ever needs one thing from it:
// "open this file and give me the 3D array stored under a key".
//
// Programming against VolumeSource instead of a concrete parser
// means:
//   - MatVolumeSource reads the real MATLAB v5 files
//   - Tests inject a synthetic in-memory source and exercise the
//     whole DataManager without a single file of simulation data
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::volume::Volume;

// ─── VolumeSource ─────────────────────────────────────────────────────────────
/// Any component that can open a named-array container and return
/// the cubic 3D array stored under `key`.
///
/// Implementations:
///   - MatVolumeSource → MATLAB v5 files via the matfile crate
///   - (tests) synthetic sources that fabricate volumes on demand
pub trait VolumeSource {
    /// Load the cubic volume stored under `key` in the file at `path`.
    /// Malformed or missing data is a hard error — simulation inputs
    /// are assumed complete, nothing here is retried.
    fn load_volume(&self, path: &Path, key: &str) -> Result<Volume>;
}
