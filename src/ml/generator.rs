// ============================================================
// Layer 5 — Generator
// ============================================================
// The conditional super-resolution network. Three conditioning
// branches in parallel, then one fusion stage:
//
//   low_res ─ upsample ×2 ─ InceptionBlock ─ tanh ──┐
//   delta ──────────────── InceptionBlock ─ lrelu ──┼─ concat
//   vbv ────────────────── InceptionBlock ─ tanh ───┘    │
//                                    InceptionBlock ─ tanh
//                                    1×1×1 conv → 1 ─ tanh
//
// The delta branch keeps a leaky rectifier: overdensity is the
// one unstandardized input and its dynamic range responds better
// to an unbounded activation. Everything else is tanh, matching
// the critic.
//
// With valid convolutions the two serial Inception stages cost 6
// voxels per axis each, so the output edge is 2·64 − 12 = 116 —
// exactly the extent the critic crops the real boxes to (see
// ml::shapes).

use burn::{
    nn::conv::Conv3d,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::activation::{leaky_relu, tanh},
    tensor::backend::AutodiffBackend,
};

use crate::ml::critic::Critic;
use crate::ml::inception::{conv3d, InceptionBlock, InceptionBlockConfig};
use crate::ml::shapes::{crop, CRITIC_MARGIN};

/// Negative slope of the delta branch's leaky rectifier.
const LEAKY_SLOPE: f64 = 0.1;

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Integer upsampling factor between the low-res and high-res grid
    #[config(default = 2)]
    pub upsampling: usize,

    /// Filters per InceptionBlock branch
    #[config(default = 6)]
    pub branch_filters: usize,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let branch = InceptionBlockConfig::new(1).with_branch_filters(self.branch_filters);
        let fused_channels = 3 * branch.out_channels();
        let fusion =
            InceptionBlockConfig::new(fused_channels).with_branch_filters(self.branch_filters);
        Generator {
            t21_block: branch.init(device),
            delta_block: branch.init(device),
            vbv_block: branch.init(device),
            fusion_block: fusion.init(device),
            project_out: conv3d(fusion.out_channels(), 1, 1, 1, device),
            upsampling: self.upsampling,
        }
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    t21_block: InceptionBlock<B>,
    delta_block: InceptionBlock<B>,
    vbv_block: InceptionBlock<B>,
    fusion_block: InceptionBlock<B>,
    project_out: Conv3d<B>,
    upsampling: usize,
}

impl<B: Backend> Generator<B> {
    /// Generate a candidate high-res box from a low-res input and
    /// the two conditioning fields. Output extent = conditioning
    /// extent − 12 per axis, one channel.
    pub fn forward(
        &self,
        low_res: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
    ) -> Tensor<B, 5> {
        let t21 = upsample_nearest(low_res, self.upsampling);
        let t21 = tanh(self.t21_block.forward(t21));
        let delta = leaky_relu(self.delta_block.forward(delta), LEAKY_SLOPE);
        let vbv = tanh(self.vbv_block.forward(vbv));

        let fused = Tensor::cat(vec![t21, delta, vbv], 1);
        let fused = tanh(self.fusion_block.forward(fused));
        tanh(self.project_out.forward(fused))
    }

    /// Cheap fingerprint of the weights, used by the resume guard
    /// to verify that restoring a checkpoint actually changed the
    /// model.
    pub fn weight_checksum(&self) -> f32 {
        self.project_out.weight.val().abs().sum().into_scalar().elem()
    }
}

impl<B: AutodiffBackend> Generator<B> {
    /// Adversarial generator loss: the negative mean critic score
    /// of the generated boxes, conditioned on the cropped fields.
    /// The real boxes are not scored here; the parameter mirrors
    /// the critic loss so both sides crop identically.
    pub fn generator_loss(
        critic: &Critic<B>,
        target: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
        generated: Tensor<B, 5>,
    ) -> Tensor<B, 1> {
        let _target = crop(target, CRITIC_MARGIN);
        let delta = crop(delta, CRITIC_MARGIN);
        let vbv = crop(vbv, CRITIC_MARGIN);

        let w_gen = critic.forward(generated, delta, vbv);
        w_gen.mean().neg()
    }

    /// One generator update: forward, loss, gradients with respect
    /// to the generator's weights only, one optimizer step.
    /// Returns the updated generator and the scalar loss.
    pub fn train_step<O: Optimizer<Self, B>>(
        self,
        low_res: Tensor<B, 5>,
        target: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
        learning_rate: f64,
        optimizer: &mut O,
        critic: &Critic<B>,
    ) -> (Self, f64) {
        let generated = self.forward(low_res, delta.clone(), vbv.clone());
        let loss = Self::generator_loss(critic, target, delta, vbv, generated);
        let value: f64 = loss.clone().into_scalar().elem();

        let grads = loss.backward();
        // from_grads keyed on the generator keeps the critic frozen
        // even though the score flowed through it.
        let grads = GradientsParams::from_grads(grads, &self);
        let updated = optimizer.step(learning_rate, self, grads);
        (updated, value)
    }
}

/// Nearest-neighbor upsampling of an NCDHW volume: every voxel is
/// replicated factor³ times.
fn upsample_nearest<B: Backend>(x: Tensor<B, 5>, factor: usize) -> Tensor<B, 5> {
    if factor == 1 {
        return x;
    }
    let [b, c, d, h, w] = x.dims();
    let x = x
        .reshape([b, c, d, 1, h * w])
        .repeat_dim(3, factor)
        .reshape([b, c, d * factor, h, w]);
    let x = x
        .reshape([b, c, d * factor, h, 1, w])
        .repeat_dim(4, factor)
        .reshape([b, c, d * factor, h * factor, w]);
    x.reshape([b, c, d * factor, h * factor, w, 1])
        .repeat_dim(5, factor)
        .reshape([b, c, d * factor, h * factor, w * factor])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_upsample_replicates_voxels() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &device)
            .reshape([1, 1, 2, 2, 2]);
        let up = upsample_nearest(x, 2);
        assert_eq!(up.dims(), [1, 1, 4, 4, 4]);
        let values: Vec<f32> = up.into_data().to_vec().unwrap();
        // Voxel (0,0,0) = 1.0 fills the leading 2×2×2 corner.
        assert_eq!(values[0], 1.0); // (0,0,0)
        assert_eq!(values[1], 1.0); // (0,0,1)
        assert_eq!(values[4], 1.0); // (0,1,0)
        assert_eq!(values[16], 1.0); // (1,0,0)
        // Voxel (0,0,1) = 2.0 starts at output z = 2.
        assert_eq!(values[2], 2.0);
    }

    #[test]
    fn test_generator_output_extent() {
        let device = Default::default();
        let generator = GeneratorConfig::new().init::<TestBackend>(&device);
        let low_res = Tensor::zeros([1, 1, 16, 16, 16], &device);
        let delta = Tensor::zeros([1, 1, 32, 32, 32], &device);
        let vbv = Tensor::zeros([1, 1, 32, 32, 32], &device);
        let out = generator.forward(low_res, delta, vbv);
        // 16 × 2 − 12 = 20 per axis, single channel.
        assert_eq!(out.dims(), [1, 1, 20, 20, 20]);
    }

    #[test]
    fn test_output_is_bounded_by_tanh() {
        let device = Default::default();
        let generator = GeneratorConfig::new().init::<TestBackend>(&device);
        let low_res = Tensor::random(
            [1, 1, 16, 16, 16],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let delta = Tensor::random(
            [1, 1, 32, 32, 32],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let vbv = Tensor::random(
            [1, 1, 32, 32, 32],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let values: Vec<f32> = generator
            .forward(low_res, delta, vbv)
            .into_data()
            .to_vec()
            .unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
