// ============================================================
// Layer 2 — Scan Use Case
// ============================================================
// Pre-flight check for a data directory: index the simulation
// files the same way training would and report every (seed,
// redshift) slot that has no file. Cheap — nothing is loaded,
// only file names are parsed.

use std::path::PathBuf;

use anyhow::Result;

use crate::data::loader::MatVolumeSource;
use crate::data::manager::DataManager;

pub struct ScanUseCase;

impl ScanUseCase {
    /// Index the directory and print a completeness report.
    /// Returns an error when any slot is unfilled, so the scan can
    /// gate a batch submission script.
    pub fn execute(data_dir: PathBuf, seeds: Vec<u32>, redshifts: Vec<u32>) -> Result<()> {
        let manager = DataManager::new(data_dir, redshifts, seeds, MatVolumeSource);
        let index = manager.get_file_lists()?;

        let slots = manager.seeds().len() * (manager.redshifts().len() + 2);
        let gaps = index.missing(manager.seeds(), manager.redshifts());
        println!(
            "{} of {slots} expected files present ({} seeds × {} redshifts)",
            slots - gaps.len(),
            manager.seeds().len(),
            manager.redshifts().len()
        );

        if gaps.is_empty() {
            println!("data directory is complete");
            Ok(())
        } else {
            for gap in &gaps {
                println!("missing: {gap}");
            }
            anyhow::bail!("{} file(s) missing", gaps.len())
        }
    }
}
