// ============================================================
// Layer 4 — Low-Resolution Derivation
// ============================================================
// The generator's input is a low-res version of the high-res
// target, derived on the fly rather than stored on disk. Two
// strategies exist and the choice is a run-level configuration:
//
//   Decimate    — keep every second lattice point per axis.
//                 The production default.
//   AveragePool — mean over each 2×2×2 block. Smoother, loses
//                 small-scale power.
//
// A learned strided convolution with a Gaussian blur was also
// considered upstream but is intentionally not carried here.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::domain::volume::Volume;

/// Downsampling factor between the high-res and low-res grid.
pub const FACTOR: usize = 2;

/// Strategy for deriving the generator's low-res input from the
/// high-res target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowResStrategy {
    Decimate,
    AveragePool,
}

impl LowResStrategy {
    /// Downsample a high-res volume to edge / 2.
    pub fn downsample(&self, volume: &Volume) -> Result<Volume> {
        let edge = volume.edge();
        ensure!(
            edge % FACTOR == 0 && edge > 0,
            "cannot downsample a {edge}³ volume by {FACTOR}"
        );
        let low_edge = edge / FACTOR;
        let mut out = Volume::zeros(low_edge);

        for x in 0..low_edge {
            for y in 0..low_edge {
                for z in 0..low_edge {
                    let value = match self {
                        LowResStrategy::Decimate => {
                            volume.get(x * FACTOR, y * FACTOR, z * FACTOR)
                        }
                        LowResStrategy::AveragePool => {
                            let mut sum = 0.0;
                            for dx in 0..FACTOR {
                                for dy in 0..FACTOR {
                                    for dz in 0..FACTOR {
                                        sum += volume.get(
                                            x * FACTOR + dx,
                                            y * FACTOR + dy,
                                            z * FACTOR + dz,
                                        );
                                    }
                                }
                            }
                            sum / (FACTOR * FACTOR * FACTOR) as f32
                        }
                    };
                    out.set(x, y, z, value);
                }
            }
        }
        Ok(out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(edge: usize) -> Volume {
        let data = (0..edge * edge * edge).map(|i| i as f32).collect();
        Volume::from_data(edge, data).unwrap()
    }

    #[test]
    fn test_decimate_keeps_every_second_point() {
        let v = ramp(4);
        let low = LowResStrategy::Decimate.downsample(&v).unwrap();
        assert_eq!(low.edge(), 2);
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    assert_eq!(low.get(x, y, z), v.get(2 * x, 2 * y, 2 * z));
                }
            }
        }
    }

    #[test]
    fn test_average_pool_is_block_mean() {
        let v = ramp(2);
        let low = LowResStrategy::AveragePool.downsample(&v).unwrap();
        assert_eq!(low.edge(), 1);
        let mean: f32 = v.data().iter().sum::<f32>() / 8.0;
        assert_eq!(low.get(0, 0, 0), mean);
    }

    #[test]
    fn test_odd_edge_fails() {
        let v = ramp(3);
        assert!(LowResStrategy::Decimate.downsample(&v).is_err());
    }
}
