// ============================================================
// Layer 2 — Use Cases
// ============================================================
// One module per thing a user can ask the binary to do. Use
// cases wire the data pipeline to the networks; they hold no
// logic of their own beyond orchestration.

/// Run one training job from configuration to trained model
pub mod train_use_case;

/// Report missing simulation files before a run is submitted
pub mod scan_use_case;
