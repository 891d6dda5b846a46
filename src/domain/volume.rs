// ============================================================
// Layer 3 — Volume
// ============================================================
// A cubic 3D scalar lattice. Everything the pipeline moves
// around — 21-cm brightness boxes, density and velocity initial
// conditions, derived low-res inputs — is one of these.
//
// Storage is a flat row-major Vec<f32>: voxel (x, y, z) lives at
// x·edge² + y·edge + z. Cubic shape is an invariant enforced at
// construction; downstream code may rely on edge³ == data.len().

use anyhow::{ensure, Result};

/// One cubic single-channel volume of simulation data.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    edge: usize,
    data: Vec<f32>,
}

impl Volume {
    /// Create a volume filled with zeros.
    pub fn zeros(edge: usize) -> Self {
        Self {
            edge,
            data: vec![0.0; edge * edge * edge],
        }
    }

    /// Wrap an existing flat row-major buffer.
    /// Fails if the buffer is not exactly edge³ values.
    pub fn from_data(edge: usize, data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == edge * edge * edge,
            "volume buffer has {} values, expected {}³ = {}",
            data.len(),
            edge,
            edge * edge * edge
        );
        Ok(Self { edge, data })
    }

    pub fn edge(&self) -> usize {
        self.edge
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.edge && y < self.edge && z < self.edge);
        (x * self.edge + y) * self.edge + z
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let i = self.index(x, y, z);
        self.data[i] = value;
    }
}
