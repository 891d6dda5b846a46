// ============================================================
// Layer 5 — Critic
// ============================================================
// The Wasserstein critic: scores how plausible a (candidate,
// delta, vbv) triple is with a single unbounded real number.
// Four valid 3D convolutions (kernels 7/5/3/1, strides 2/1/2/1,
// channels 8→16→32→64), tanh after each, flatten, linear head.
// No normalization layer — layer normalization is a known future
// improvement, deliberately not implemented.
//
// The loss is the gradient-penalty Wasserstein objective of
// Gulrajani et al. (2017): mean(W_gen − W_real + λ·(‖∇‖₂ − 1)²)
// with the gradient taken at per-sample random interpolates
// between real and generated boxes. The interpolate gradient
// ∇D(x̂) is written out analytically as the adjoint of the
// critic's own layer stack, so the penalty is an ordinary
// differentiable expression of the weights and its contribution
// reaches the update through the single backward pass.
// Real and conditioning boxes are cropped by CRITIC_MARGIN per
// side first so that the critic scores real and generated volumes
// on identical grids.
//
// Reference: Arjovsky et al. (2017) Wasserstein GAN
//            Gulrajani et al. (2017) Improved Training of WGANs

use burn::{
    nn::{conv::Conv3d, Initializer, Linear, LinearConfig},
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::activation::tanh,
    tensor::backend::AutodiffBackend,
    tensor::module::conv_transpose3d,
    tensor::ops::ConvTransposeOptions,
    tensor::Distribution,
};

use crate::ml::generator::Generator;
use crate::ml::inception::conv3d;
use crate::ml::shapes::{
    crop, critic_flat_features, CRITIC_CHANNELS, CRITIC_KERNELS, CRITIC_MARGIN, CRITIC_STRIDES,
};

/// Channels entering the first convolution: candidate + delta + vbv.
const INPUT_CHANNELS: usize = 3;

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct CriticConfig {
    /// Edge of the (already cropped) volumes the critic scores —
    /// target edge − 2·CRITIC_MARGIN
    pub input_extent: usize,

    /// Gradient-penalty coefficient λ
    #[config(default = 10.0)]
    pub lbda: f64,
}

impl CriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Critic<B> {
        let [k1, k2, k3, k4] = CRITIC_KERNELS;
        let [s1, s2, s3, s4] = CRITIC_STRIDES;
        let [c1, c2, c3, c4] = CRITIC_CHANNELS;
        let mut score = LinearConfig::new(critic_flat_features(self.input_extent), 1)
            .with_initializer(Initializer::Normal {
                mean: 0.0,
                std: 0.1,
            })
            .init(device);
        score.bias = Some(Initializer::Constant { value: 0.1 }.init([1], device));
        Critic {
            conv_1: conv3d(INPUT_CHANNELS, c1, k1, s1, device),
            conv_2: conv3d(c1, c2, k2, s2, device),
            conv_3: conv3d(c2, c3, k3, s3, device),
            conv_4: conv3d(c3, c4, k4, s4, device),
            score,
            lbda: self.lbda,
        }
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    conv_1: Conv3d<B>,
    conv_2: Conv3d<B>,
    conv_3: Conv3d<B>,
    conv_4: Conv3d<B>,
    score: Linear<B>,
    lbda: f64,
}

impl<B: Backend> Critic<B> {
    /// Score one batch of (candidate, delta, vbv) triples.
    /// Returns one unbounded scalar per sample.
    pub fn forward(
        &self,
        candidate: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
    ) -> Tensor<B, 1> {
        let x = Tensor::cat(vec![candidate, delta, vbv], 1);
        let x = tanh(self.conv_1.forward(x));
        let x = tanh(self.conv_2.forward(x));
        let x = tanh(self.conv_3.forward(x));
        let x = tanh(self.conv_4.forward(x));
        let x = x.flatten::<2>(1, 4);
        self.score.forward(x).flatten::<1>(0, 1)
    }

    /// Gradient of the critic score with respect to the candidate
    /// channel, written out as tensor ops: the linear head's
    /// weight column, then tanh′ = 1 − tanh² and the adjoint of
    /// each valid convolution, walked back to the input. The
    /// result stays on the autodiff graph, so a penalty built
    /// from it backpropagates into the critic's weights.
    fn input_gradient(
        &self,
        candidate: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
    ) -> Tensor<B, 5> {
        let x = Tensor::cat(vec![candidate, delta, vbv], 1);
        let a1 = tanh(self.conv_1.forward(x.clone()));
        let a2 = tanh(self.conv_2.forward(a1.clone()));
        let a3 = tanh(self.conv_3.forward(a2.clone()));
        let a4 = tanh(self.conv_4.forward(a3.clone()));

        // d(score)/d(a4) is the head's weight column, laid out
        // exactly like the flatten that feeds it.
        let [batch, c4, e4, _, _] = a4.dims();
        let [s1, s2, s3, s4] = CRITIC_STRIDES;
        let head = self.score.weight.val().reshape([1, c4, e4, e4, e4]);

        let g = head.mul(tanh_prime(a4));
        let g = conv_input_grad(g, &self.conv_4, s4, a3.dims()[2]);
        let g = g.mul(tanh_prime(a3));
        let g = conv_input_grad(g, &self.conv_3, s3, a2.dims()[2]);
        let g = g.mul(tanh_prime(a2));
        let g = conv_input_grad(g, &self.conv_2, s2, a1.dims()[2]);
        let g = g.mul(tanh_prime(a1));
        let g = conv_input_grad(g, &self.conv_1, s1, x.dims()[2]);

        // Only the candidate channel of the concat enters the norm.
        let [_, _, d, h, w] = g.dims();
        g.slice([0..batch, 0..1, 0..d, 0..h, 0..w])
    }

    /// Wasserstein loss with gradient penalty.
    ///
    /// Crops the real target and both conditioning fields by
    /// CRITIC_MARGIN per side, scores the real and generated
    /// triples, and penalizes the critic's gradient norm at random
    /// interpolates between them. Returns the differentiable loss
    /// and the mean penalty so the penalty can be logged on its
    /// own. The penalty is λ·(‖∇‖₂ − 1)² ≥ 0, zero exactly when
    /// the gradient norm is 1.
    pub fn critic_loss(
        &self,
        target: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
        generated: Tensor<B, 5>,
    ) -> (Tensor<B, 1>, f64) {
        let target = crop(target, CRITIC_MARGIN);
        let delta = crop(delta, CRITIC_MARGIN);
        let vbv = crop(vbv, CRITIC_MARGIN);

        let w_real = self.forward(target.clone(), delta.clone(), vbv.clone());
        let w_gen = self.forward(generated.clone(), delta.clone(), vbv.clone());

        // Per-sample interpolation coefficient ε ~ U[0, 1].
        let [batch, _, _, _, _] = target.dims();
        let epsilon = Tensor::<B, 5>::random(
            [batch, 1, 1, 1, 1],
            Distribution::Uniform(0.0, 1.0),
            &target.device(),
        );
        let x_hat = target
            .mul(epsilon.clone())
            .add(generated.mul(epsilon.neg().add_scalar(1.0)));

        let gradient = self.input_gradient(x_hat, delta, vbv);

        // Per-sample Euclidean norm over channel + spatial axes.
        let norm = gradient
            .flatten::<2>(1, 4)
            .powf_scalar(2.0)
            .sum_dim(1)
            .sqrt()
            .flatten::<1>(0, 1);
        let penalty = norm.sub_scalar(1.0).powf_scalar(2.0).mul_scalar(self.lbda);

        let loss = w_gen.sub(w_real).add(penalty.clone()).mean();
        let mean_penalty: f64 = penalty.mean().into_scalar().elem();
        (loss, mean_penalty)
    }
}

impl<B: AutodiffBackend> Critic<B> {
    /// One critic update: generate a candidate (generator weights
    /// frozen), compute the loss, apply one optimizer step on the
    /// critic's weights. Returns (critic, loss, penalty).
    pub fn train_step<O: Optimizer<Self, B>>(
        self,
        target: Tensor<B, 5>,
        delta: Tensor<B, 5>,
        vbv: Tensor<B, 5>,
        low_res: Tensor<B, 5>,
        learning_rate: f64,
        optimizer: &mut O,
        generator: &Generator<B>,
    ) -> (Self, f64, f64) {
        // No gradient flows into the generator here.
        let generated = generator
            .forward(low_res, delta.clone(), vbv.clone())
            .detach();
        let (loss, penalty) = self.critic_loss(target, delta, vbv, generated);
        let value: f64 = loss.clone().into_scalar().elem();

        let grads = GradientsParams::from_grads(loss.backward(), &self);
        let updated = optimizer.step(learning_rate, self, grads);
        (updated, value, penalty)
    }
}

fn tanh_prime<B: Backend>(a: Tensor<B, 5>) -> Tensor<B, 5> {
    a.powf_scalar(2.0).neg().add_scalar(1.0)
}

/// Adjoint of one valid convolution: routes a gradient from the
/// conv's output extent back to its input extent. A strided valid
/// conv discards trailing rows when (extent − kernel) is not a
/// stride multiple; padding_out restores them. The bias never
/// touches the input gradient.
fn conv_input_grad<B: Backend>(
    g: Tensor<B, 5>,
    conv: &Conv3d<B>,
    stride: usize,
    input_extent: usize,
) -> Tensor<B, 5> {
    let weight = conv.weight.val();
    let kernel = weight.dims()[2];
    let pad_out = (input_extent - kernel) % stride;
    conv_transpose3d(
        g,
        weight,
        None,
        ConvTransposeOptions::new([stride; 3], [0; 3], [pad_out; 3], [1; 3], 1),
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::generator::GeneratorConfig;
    use crate::ml::shapes::critic_input_extent;

    type TestAutodiff = burn::backend::Autodiff<burn::backend::NdArray>;

    const TARGET_EDGE: usize = 32;

    fn random_box(edge: usize, device: &<TestAutodiff as Backend>::Device) -> Tensor<TestAutodiff, 5> {
        Tensor::random(
            [2, 1, edge, edge, edge],
            Distribution::Normal(0.0, 1.0),
            device,
        )
    }

    #[test]
    fn test_forward_scores_one_scalar_per_sample() {
        let device = Default::default();
        let extent = critic_input_extent(TARGET_EDGE);
        let critic = CriticConfig::new(extent).init::<TestAutodiff>(&device);
        let scores = critic.forward(
            random_box(extent, &device),
            random_box(extent, &device),
            random_box(extent, &device),
        );
        assert_eq!(scores.dims(), [2]);
    }

    #[test]
    fn test_gradient_penalty_is_non_negative_and_loss_finite() {
        let device = Default::default();
        let extent = critic_input_extent(TARGET_EDGE);
        let critic = CriticConfig::new(extent).with_lbda(10.0).init::<TestAutodiff>(&device);

        let generated = random_box(extent, &device);
        let (loss, penalty) = critic.critic_loss(
            random_box(TARGET_EDGE, &device),
            random_box(TARGET_EDGE, &device),
            random_box(TARGET_EDGE, &device),
            generated,
        );

        let loss_value: f64 = loss.into_scalar().elem();
        assert!(loss_value.is_finite());
        assert!(penalty >= 0.0);
    }

    #[test]
    fn test_input_gradient_matches_backward_pass() {
        let device = Default::default();
        let extent = critic_input_extent(TARGET_EDGE);
        let critic = CriticConfig::new(extent).init::<TestAutodiff>(&device);

        let candidate = random_box(extent, &device).require_grad();
        let delta = random_box(extent, &device);
        let vbv = random_box(extent, &device);

        let grads = critic
            .forward(candidate.clone(), delta.clone(), vbv.clone())
            .sum()
            .backward();
        let expected: Vec<f32> = candidate
            .grad(&grads)
            .unwrap()
            .into_data()
            .to_vec()
            .unwrap();
        let analytic: Vec<f32> = critic
            .input_gradient(candidate, delta, vbv)
            .into_data()
            .to_vec()
            .unwrap();

        let scale = expected.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(scale > 0.0, "degenerate gradient");
        for (a, e) in analytic.iter().zip(&expected) {
            assert!(
                (a - e).abs() <= 1e-5 + 1e-3 * scale,
                "analytic {a} vs autodiff {e}"
            );
        }
    }

    #[test]
    fn test_penalty_reaches_critic_weights() {
        // Two critics with identical weights but different λ must
        // diverge after one update on identical data: the penalty
        // has to contribute to the weight gradients, not only to
        // the reported loss value.
        let device = Default::default();
        let extent = critic_input_extent(TARGET_EDGE);

        <TestAutodiff as Backend>::seed(&device, 7);
        let critic_lo = CriticConfig::new(extent)
            .with_lbda(0.0)
            .init::<TestAutodiff>(&device);
        <TestAutodiff as Backend>::seed(&device, 7);
        let critic_hi = CriticConfig::new(extent)
            .with_lbda(1e6)
            .init::<TestAutodiff>(&device);

        let generator = GeneratorConfig::new().init::<TestAutodiff>(&device);
        let target = random_box(TARGET_EDGE, &device);
        let delta = random_box(TARGET_EDGE, &device);
        let vbv = random_box(TARGET_EDGE, &device);
        let low_res = random_box(TARGET_EDGE / 2, &device);

        let mut optim_lo = burn::optim::AdamConfig::new().init();
        let mut optim_hi = burn::optim::AdamConfig::new().init();

        // Same ε draw on both sides.
        <TestAutodiff as Backend>::seed(&device, 11);
        let (updated_lo, _, penalty_lo) = critic_lo.train_step(
            target.clone(),
            delta.clone(),
            vbv.clone(),
            low_res.clone(),
            1e-3,
            &mut optim_lo,
            &generator,
        );
        <TestAutodiff as Backend>::seed(&device, 11);
        let (updated_hi, _, penalty_hi) =
            critic_hi.train_step(target, delta, vbv, low_res, 1e-3, &mut optim_hi, &generator);

        assert_eq!(penalty_lo, 0.0);
        assert!(penalty_hi > 0.0);
        let weights_lo: Vec<f32> = updated_lo.score.weight.val().into_data().to_vec().unwrap();
        let weights_hi: Vec<f32> = updated_hi.score.weight.val().into_data().to_vec().unwrap();
        assert_ne!(weights_lo, weights_hi);
    }
}
