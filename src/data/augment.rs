// ============================================================
// Layer 4 — Volume Augmenter
// ============================================================
// Applies one of the 24 cube symmetries (axis permutations
// composed with axis reflections, identity included) to a cubic
// volume. Simulation boxes are statistically isotropic, so every
// symmetry of a box is another equally valid box — 24× more
// training data from the same simulations.
//
// Each table entry is (permutation, flips): the volume is first
// transposed by the permutation, then the flagged axes of the
// transposed volume are reversed. Index 23 is the identity.
//
// The transform is a pure function of the index — applying the
// same index to the target, delta, vbv, and low-res boxes of one
// sample keeps all channels spatially co-registered.

use anyhow::{ensure, Result};

use crate::domain::volume::Volume;

/// The augmentation index of the identity transform.
pub const IDENTITY: usize = 23;

/// Number of cube symmetries, identity included.
pub const SYMMETRY_COUNT: usize = 24;

// (axis permutation, per-axis reflection after the permutation)
const SYMMETRIES: [([usize; 3], [bool; 3]); SYMMETRY_COUNT] = [
    ([0, 1, 2], [true, true, false]),
    ([0, 1, 2], [true, false, true]),
    ([0, 1, 2], [false, true, true]),
    ([1, 0, 2], [true, false, false]),
    ([1, 0, 2], [true, false, true]),
    ([1, 0, 2], [false, true, false]),
    ([1, 0, 2], [false, true, true]),
    ([2, 1, 0], [true, false, false]),
    ([2, 1, 0], [true, true, false]),
    ([2, 1, 0], [false, false, true]),
    ([2, 1, 0], [false, true, true]),
    ([0, 2, 1], [false, true, false]),
    ([0, 2, 1], [true, true, false]),
    ([0, 2, 1], [false, false, true]),
    ([0, 2, 1], [true, false, true]),
    ([1, 2, 0], [true, true, false]),
    ([1, 2, 0], [false, true, true]),
    ([1, 2, 0], [true, false, true]),
    ([1, 2, 0], [true, true, true]),
    ([2, 0, 1], [true, true, false]),
    ([2, 0, 1], [true, false, true]),
    ([2, 0, 1], [false, true, true]),
    ([2, 0, 1], [true, true, true]),
    ([0, 1, 2], [false, false, false]),
];

/// Return the symmetry-transformed copy of `volume` selected by
/// `index` in [0, 24). Index 23 returns the volume unchanged.
pub fn augment(volume: &Volume, index: usize) -> Result<Volume> {
    ensure!(
        index < SYMMETRY_COUNT,
        "augmentation index {index} out of range [0, {SYMMETRY_COUNT})"
    );
    let (perm, flips) = SYMMETRIES[index];
    let n = volume.edge();
    let mut out = Volume::zeros(n);

    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                // Reflections act on the transposed volume, so undo
                // them on the output coordinate first...
                let mut c = [x, y, z];
                for axis in 0..3 {
                    if flips[axis] {
                        c[axis] = n - 1 - c[axis];
                    }
                }
                // ...then invert the permutation to find the source
                // voxel: output axis a reads from source axis perm[a].
                let mut src = [0usize; 3];
                for axis in 0..3 {
                    src[perm[axis]] = c[axis];
                }
                out.set(x, y, z, volume.get(src[0], src[1], src[2]));
            }
        }
    }
    Ok(out)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// A volume with no accidental symmetry: every voxel value is
    /// its own flat index.
    fn asymmetric(edge: usize) -> Volume {
        let data = (0..edge * edge * edge).map(|i| i as f32).collect();
        Volume::from_data(edge, data).unwrap()
    }

    #[test]
    fn test_index_23_is_identity() {
        let v = asymmetric(4);
        assert_eq!(augment(&v, IDENTITY).unwrap(), v);
    }

    #[test]
    fn test_out_of_range_index_fails() {
        let v = asymmetric(3);
        assert!(augment(&v, 24).is_err());
    }

    #[test]
    fn test_all_24_transforms_are_distinct() {
        let v = asymmetric(3);
        let transformed: Vec<Volume> = (0..SYMMETRY_COUNT)
            .map(|i| augment(&v, i).unwrap())
            .collect();
        for i in 0..SYMMETRY_COUNT {
            for j in (i + 1)..SYMMETRY_COUNT {
                assert_ne!(
                    transformed[i], transformed[j],
                    "symmetries {i} and {j} coincide on an asymmetric volume"
                );
            }
        }
    }

    #[test]
    fn test_transforms_are_permutations_of_voxels() {
        // Every symmetry rearranges voxels, never invents values.
        let v = asymmetric(3);
        for i in 0..SYMMETRY_COUNT {
            let mut values: Vec<f32> = augment(&v, i).unwrap().into_data();
            values.sort_by(f32::total_cmp);
            let expected: Vec<f32> = (0..27).map(|k| k as f32).collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_channels_stay_co_registered() {
        // Tag each voxel of a second channel with its source index
        // offset by 1000; after any shared transform the offset must
        // survive voxel-for-voxel.
        let a = asymmetric(3);
        let b = Volume::from_data(3, (0..27).map(|i| 1000.0 + i as f32).collect()).unwrap();
        for index in [0, 5, 9, 14, 18, 22] {
            let ta = augment(&a, index).unwrap();
            let tb = augment(&b, index).unwrap();
            for (va, vb) in ta.data().iter().zip(tb.data()) {
                assert_eq!(*vb, 1000.0 + *va);
            }
        }
    }
}
