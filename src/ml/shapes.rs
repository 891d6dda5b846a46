// ============================================================
// Layer 5 — Shape Arithmetic
// ============================================================
// Every convolution in this system uses valid padding, so every
// layer shrinks its volume. All of that arithmetic lives here,
// in pure functions, and every crop elsewhere in the crate is
// computed from these — never re-derived at a call site.
//
// The one identity the whole design hangs on:
//
//   generator output edge = low_res_edge·upsampling − 2·6  (two
//     serial Inception stages: the three conditioning blocks run
//     in parallel, then one fusion block — 6 voxels each)
//   critic input edge     = target_edge − 2·CRITIC_MARGIN
//
// For the production grids (64³ → 128³) both come out at 116,
// and `ensure_extents_consistent` refuses to build a model where
// they differ.

use anyhow::{ensure, Result};
use burn::prelude::*;

/// Branch kernel sizes of an InceptionBlock, largest first.
pub const INCEPTION_KERNELS: [usize; 4] = [7, 5, 3, 1];

/// Spatial shrinkage of one InceptionBlock per axis
/// (largest kernel − 1).
pub const INCEPTION_SHRINK: usize = INCEPTION_KERNELS[0] - 1;

/// Serial Inception depth of the generator: one conditioning
/// stage (three parallel blocks) plus one fusion stage.
pub const GENERATOR_STAGES: usize = 2;

/// Critic convolution stack: kernel sizes, strides, channels.
pub const CRITIC_KERNELS: [usize; 4] = [7, 5, 3, 1];
pub const CRITIC_STRIDES: [usize; 4] = [2, 1, 2, 1];
pub const CRITIC_CHANNELS: [usize; 4] = [8, 16, 32, 64];

/// Voxels cropped from each side of the real/conditioning boxes
/// before they enter the critic (largest kernel − 1).
pub const CRITIC_MARGIN: usize = CRITIC_KERNELS[0] - 1;

/// Output extent of one valid convolution along one axis.
pub fn conv_extent(extent: usize, kernel: usize, stride: usize) -> usize {
    (extent - kernel) / stride + 1
}

/// Output extent of one InceptionBlock along one axis.
pub fn inception_extent(extent: usize) -> usize {
    extent - INCEPTION_SHRINK
}

/// Output extent of the generator given its low-res input edge.
pub fn generator_extent(low_res_edge: usize, upsampling: usize) -> usize {
    low_res_edge * upsampling - GENERATOR_STAGES * INCEPTION_SHRINK
}

/// Edge of the volumes the critic scores, given the target edge.
pub fn critic_input_extent(target_edge: usize) -> usize {
    target_edge - 2 * CRITIC_MARGIN
}

/// Flattened feature count after the critic's convolution stack.
pub fn critic_flat_features(input_extent: usize) -> usize {
    let mut extent = input_extent;
    for (kernel, stride) in CRITIC_KERNELS.into_iter().zip(CRITIC_STRIDES) {
        extent = conv_extent(extent, kernel, stride);
    }
    extent * extent * extent * CRITIC_CHANNELS[3]
}

/// Check that the generator's output and the critic's cropped
/// input land on the same extent, so real and generated volumes
/// are scored on identical grids.
pub fn ensure_extents_consistent(
    low_res_edge: usize,
    target_edge: usize,
    upsampling: usize,
) -> Result<()> {
    ensure!(
        low_res_edge * upsampling == target_edge,
        "low-res edge {low_res_edge} × upsampling {upsampling} does not reach the target edge {target_edge}"
    );
    let generated = generator_extent(low_res_edge, upsampling);
    let cropped = critic_input_extent(target_edge);
    ensure!(
        generated == cropped,
        "generator output extent {generated} does not match the critic's cropped input extent {cropped}"
    );
    Ok(())
}

/// Crop `margin` voxels from each side of every spatial axis.
pub fn crop<B: Backend>(x: Tensor<B, 5>, margin: usize) -> Tensor<B, 5> {
    if margin == 0 {
        return x;
    }
    let [b, c, d, h, w] = x.dims();
    x.slice([
        0..b,
        0..c,
        margin..d - margin,
        margin..h - margin,
        margin..w - margin,
    ])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_conv_extents() {
        assert_eq!(conv_extent(116, 7, 2), 55);
        assert_eq!(conv_extent(55, 5, 1), 51);
        assert_eq!(conv_extent(51, 3, 2), 25);
        assert_eq!(conv_extent(25, 1, 1), 25);
    }

    #[test]
    fn test_inception_shrinks_by_six() {
        assert_eq!(inception_extent(128), 122);
        assert_eq!(inception_extent(122), 116);
    }

    #[test]
    fn test_production_extents_reconcile_at_116() {
        assert_eq!(generator_extent(64, 2), 116);
        assert_eq!(critic_input_extent(128), 116);
        assert!(ensure_extents_consistent(64, 128, 2).is_ok());
    }

    #[test]
    fn test_inconsistent_extents_rejected() {
        assert!(ensure_extents_consistent(64, 120, 2).is_err());
    }

    #[test]
    fn test_critic_flat_features() {
        // 20 → 7 → 3 → 1 → 1, times 64 channels.
        assert_eq!(critic_flat_features(20), 64);
        // Production: 116 → 55 → 51 → 25 → 25.
        assert_eq!(critic_flat_features(116), 25 * 25 * 25 * 64);
    }

    #[test]
    fn test_crop_tensor() {
        type TestBackend = burn::backend::NdArray;
        let x = Tensor::<TestBackend, 5>::zeros([1, 1, 8, 8, 8], &Default::default());
        assert_eq!(crop(x, 2).dims(), [1, 1, 4, 4, 4]);
    }
}
