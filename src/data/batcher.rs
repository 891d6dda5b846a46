// ============================================================
// Layer 4 — Volume Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<VolumeSample>
// into the four NCDHW tensors one training step consumes. The
// dataloader hands the target device to every `batch` call, so
// the batcher itself is stateless.
//
// Every volume in a sample is single-channel, so each tensor is
// [batch, 1, edge, edge, edge]: the target, delta, and vbv share
// the high-res edge, the low-res input is half that per axis.
// All samples in one dataset share their edges (the DataManager
// only ever mixes volumes from one grid), so flatten-then-reshape
// is enough — no padding, no ragged batches.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::sample::VolumeSample;
use crate::domain::volume::Volume;

// ─── VolumeBatch ──────────────────────────────────────────────────────────────
/// A batch of co-registered volumes ready for the networks.
/// All tensors are NCDHW with batch_size as the first dimension.
#[derive(Debug, Clone)]
pub struct VolumeBatch<B: Backend> {
    /// High-res targets — [batch, 1, 128, 128, 128]
    pub target: Tensor<B, 5>,
    /// Overdensity conditioning — [batch, 1, 128, 128, 128]
    pub delta: Tensor<B, 5>,
    /// Velocity conditioning — [batch, 1, 128, 128, 128]
    pub vbv: Tensor<B, 5>,
    /// Generator inputs — [batch, 1, 64, 64, 64]
    pub low_res: Tensor<B, 5>,
}

// ─── VolumeBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Default, Debug)]
pub struct VolumeBatcher;

/// Stack one channel of every sample into a [batch, 1, e, e, e]
/// tensor. Mixed edges inside a batch are a precondition
/// violation and fail fast.
fn stack<'a, B: Backend>(
    volumes: impl Iterator<Item = &'a Volume> + Clone,
    device: &B::Device,
) -> Tensor<B, 5> {
    let edge = volumes
        .clone()
        .next()
        .expect("batch must not be empty")
        .edge();
    let flat: Vec<f32> = volumes
        .inspect(|v| assert_eq!(v.edge(), edge, "mixed volume edges in one batch"))
        .flat_map(|v| v.data().iter().copied())
        .collect();
    let batch = flat.len() / (edge * edge * edge);
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([batch, 1, edge, edge, edge])
}

impl<B: Backend> Batcher<B, VolumeSample, VolumeBatch<B>> for VolumeBatcher {
    fn batch(&self, items: Vec<VolumeSample>, device: &B::Device) -> VolumeBatch<B> {
        VolumeBatch {
            target: stack(items.iter().map(|s| &s.target), device),
            delta: stack(items.iter().map(|s| &s.delta), device),
            vbv: stack(items.iter().map(|s| &s.vbv), device),
            low_res: stack(items.iter().map(|s| &s.low_res), device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let sample = VolumeSample::new(
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(8),
            Volume::zeros(4),
        )
        .unwrap();
        let batch: VolumeBatch<TestBackend> =
            VolumeBatcher.batch(vec![sample.clone(), sample], &Default::default());
        assert_eq!(batch.target.dims(), [2, 1, 8, 8, 8]);
        assert_eq!(batch.low_res.dims(), [2, 1, 4, 4, 4]);
    }

    #[test]
    fn test_batch_preserves_voxel_order() {
        let mut target = Volume::zeros(2);
        target.set(1, 0, 1, 3.5);
        let sample = VolumeSample::new(
            target,
            Volume::zeros(2),
            Volume::zeros(2),
            Volume::zeros(1),
        )
        .unwrap();
        let batch: VolumeBatch<TestBackend> = VolumeBatcher.batch(vec![sample], &Default::default());
        let values: Vec<f32> = batch.target.into_data().to_vec().unwrap();
        // Row-major (x, y, z) = (1, 0, 1) → index 1·4 + 0·2 + 1 = 5
        assert_eq!(values[5], 3.5);
    }
}
