// ============================================================
// Layer 4 — Simulation Volume Loader
// ============================================================
// Reads one cubic 3D array out of a MATLAB v5 container using
// the matfile crate. The simulation pipeline stores each box as
// a named array:
//
//   outputs/T21_cube_*.mat → key "Tlin"  (brightness temperature)
//   IC/delta<seed>.mat     → key "delta" (matter overdensity)
//   IC/vbv<seed>.mat       → key "vbv"   (relative velocity)
//
// MATLAB arrays are column-major (first index fastest); Volume
// is row-major, so the copy below transposes the layout instead
// of memcpy'ing the buffer.
//
// Reference: matfile crate documentation

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{anyhow, bail, ensure, Context, Result};
use matfile::{MatFile, NumericData};

use crate::domain::traits::VolumeSource;
use crate::domain::volume::Volume;

/// Loads cubic volumes from MATLAB v5 files.
pub struct MatVolumeSource;

impl VolumeSource for MatVolumeSource {
    fn load_volume(&self, path: &Path, key: &str) -> Result<Volume> {
        let file = File::open(path)
            .with_context(|| format!("cannot open volume file '{}'", path.display()))?;
        let mat = MatFile::parse(BufReader::new(file))
            .map_err(|e| anyhow!("malformed MAT file '{}': {e}", path.display()))?;

        let array = mat.find_by_name(key).ok_or_else(|| {
            anyhow!("no array named '{key}' in '{}'", path.display())
        })?;

        let dims = array.size();
        ensure!(
            dims.len() == 3 && dims[0] == dims[1] && dims[1] == dims[2],
            "array '{key}' in '{}' is not a cubic 3D volume (dims {:?})",
            path.display(),
            dims
        );
        let edge = dims[0];

        let raw: Vec<f32> = match array.data() {
            NumericData::Double { real, .. } => real.iter().map(|&v| v as f32).collect(),
            NumericData::Single { real, .. } => real.clone(),
            other => bail!(
                "array '{key}' in '{}' has unsupported element type {:?}",
                path.display(),
                other
            ),
        };
        ensure!(
            raw.len() == edge * edge * edge,
            "array '{key}' in '{}' has {} elements, expected {}",
            path.display(),
            raw.len(),
            edge * edge * edge
        );

        // Column-major (x fastest) → row-major (z fastest).
        let mut data = vec![0.0f32; raw.len()];
        for z in 0..edge {
            for y in 0..edge {
                for x in 0..edge {
                    data[(x * edge + y) * edge + z] = raw[x + y * edge + z * edge * edge];
                }
            }
        }
        Volume::from_data(edge, data)
    }
}
