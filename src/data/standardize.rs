// ============================================================
// Layer 4 — Standardization
// ============================================================
// Per-sample, per-channel normalization to zero mean and unit
// standard deviation over the spatial axes.
//
// The statistics may come from a different tensor than the one
// being standardized: the training loop standardizes the high-res
// target with the low-res box's statistics so that the generator
// never sees information its input does not contain.
//
// Degenerate case: a constant-zero volume (mean 0, variance 0)
// must pass through unchanged, so its variance is substituted
// with 1 instead of dividing by zero. This really happens — very
// high redshift boxes are all zeros before reionization begins.

use burn::prelude::*;

/// Standardize `data` using the per-sample spatial statistics of
/// `stats`. Shapes are NCDHW and must agree on batch and channel.
pub fn standardize<B: Backend>(data: Tensor<B, 5>, stats: Tensor<B, 5>) -> Tensor<B, 5> {
    let mean = stats.clone().mean_dim(2).mean_dim(3).mean_dim(4);
    let var = stats
        .sub(mean.clone())
        .powf_scalar(2.0)
        .mean_dim(2)
        .mean_dim(3)
        .mean_dim(4);

    // mean == 0 and var == 0 → substitute var = 1 (var is ≥ 0, so
    // |mean| + var == 0 identifies exactly the all-zero samples).
    let degenerate = mean.clone().abs().add(var.clone()).lower_elem(1e-12);
    let ones = var.ones_like();
    let std = var.mask_where(degenerate, ones).sqrt();

    data.sub(mean).div(std)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn tensor(values: Vec<f32>, edge: usize) -> Tensor<TestBackend, 5> {
        Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &Default::default())
            .reshape([1, 1, edge, edge, edge])
    }

    #[test]
    fn test_output_has_zero_mean_unit_std() {
        let values: Vec<f32> = (0..64).map(|i| (i as f32) * 0.37 - 3.0).collect();
        let x = tensor(values, 4);
        let out = standardize(x.clone(), x);

        let mean: f32 = out.clone().mean().into_scalar();
        let var: f32 = out.powf_scalar(2.0).mean().into_scalar();
        assert!(mean.abs() < 1e-5, "mean = {mean}");
        assert!((var - 1.0).abs() < 1e-4, "var = {var}");
    }

    #[test]
    fn test_all_zero_volume_passes_through() {
        let x = tensor(vec![0.0; 27], 3);
        let out = standardize(x.clone(), x);
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stats_can_come_from_another_tensor() {
        // Standardizing with foreign stats applies the foreign
        // mean/std, not the data's own.
        let data = tensor(vec![4.0; 8], 2);
        let stats = tensor(
            vec![0.0, 0.0, 0.0, 0.0, 4.0, 4.0, 4.0, 4.0],
            2,
        );
        // stats: mean 2, var 4 → (4 − 2) / 2 = 1
        let out = standardize(data, stats);
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        for v in values {
            assert!((v - 1.0).abs() < 1e-6);
        }
    }
}
