// ============================================================
// Layer 3 — VolumeSample
// ============================================================
// One training tuple, all four boxes co-registered to the same
// initial-condition seed and redshift:
//
//   target  — high-res 21-cm brightness-temperature cube (128³)
//   delta   — matter overdensity initial condition  (128³)
//   vbv     — baryon-dark-matter velocity initial condition (128³)
//   low_res — decimated/pooled copy of the target (64³), the
//             generator's input
//
// The constructor enforces the co-registration invariants so the
// network layers never have to re-check shapes per batch.

use anyhow::{ensure, Result};

use crate::domain::volume::Volume;

/// One co-registered (target, delta, vbv, low-res) tuple.
#[derive(Debug, Clone)]
pub struct VolumeSample {
    pub target: Volume,
    pub delta: Volume,
    pub vbv: Volume,
    pub low_res: Volume,
}

impl VolumeSample {
    /// Bundle four volumes, checking the shape invariants:
    /// delta and vbv live on the target grid, and the low-res
    /// edge divides the target edge by the upsampling factor.
    pub fn new(target: Volume, delta: Volume, vbv: Volume, low_res: Volume) -> Result<Self> {
        ensure!(
            delta.edge() == target.edge() && vbv.edge() == target.edge(),
            "conditioning fields must match the target grid: target {}³, delta {}³, vbv {}³",
            target.edge(),
            delta.edge(),
            vbv.edge()
        );
        ensure!(
            low_res.edge() > 0 && target.edge() % low_res.edge() == 0,
            "low-res edge {} does not divide target edge {}",
            low_res.edge(),
            target.edge()
        );
        Ok(Self {
            target,
            delta,
            vbv,
            low_res,
        })
    }

    /// The integer upsampling factor between input and target grid.
    pub fn upsampling(&self) -> usize {
        self.target.edge() / self.low_res.edge()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matched_volumes() {
        let s = VolumeSample::new(
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(4),
        )
        .unwrap();
        assert_eq!(s.upsampling(), 2);
    }

    #[test]
    fn test_rejects_mismatched_conditioning_grid() {
        let r = VolumeSample::new(
            Volume::zeros(8),
            Volume::zeros(6),
            Volume::zeros(8),
            Volume::zeros(4),
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_rejects_non_dividing_low_res_edge() {
        let r = VolumeSample::new(
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(3),
        );
        assert!(r.is_err());
    }
}
