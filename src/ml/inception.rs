// ============================================================
// Layer 5 — Inception Block
// ============================================================
// The reusable 3D convolutional building block of the generator:
// four parallel receptive fields (7³, 5³, 3³, 1³), each preceded
// by a 1×1×1 channel projection (except the 1×1×1 branch, which
// is its own projection), fused by channel concatenation and a
// residual shortcut.
//
// Valid padding means the branches shrink by different amounts,
// so the smaller-kernel outputs are cropped to the 7³ branch's
// extent before concatenation. The shortcut is the raw input
// cropped the same way and matched in channel count — tiled when
// the input is narrower than the output, 1×1×1-projected when it
// is wider (the fusion stage, where three branches concatenate
// into 72 channels against a 24-channel output).
//
// Net effect per block: extent − 6 per axis, channels = sum of
// the four branch filter counts.
//
// Reference: Szegedy et al. (2015) Going Deeper with Convolutions

use burn::{
    nn::{
        conv::{Conv3d, Conv3dConfig},
        Initializer, PaddingConfig3d,
    },
    prelude::*,
};

use crate::ml::shapes::{crop, INCEPTION_KERNELS};

/// Build one valid-padded 3D convolution with the stack's usual
/// initialization: weights Normal(0, 0.1), biases a constant 0.1.
/// The config carries a single initializer for both, so the bias
/// is overridden after init.
pub(crate) fn conv3d<B: Backend>(
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    stride: usize,
    device: &B::Device,
) -> Conv3d<B> {
    let mut conv = Conv3dConfig::new([in_channels, out_channels], [kernel, kernel, kernel])
        .with_stride([stride, stride, stride])
        .with_padding(PaddingConfig3d::Valid)
        .with_initializer(Initializer::Normal {
            mean: 0.0,
            std: 0.1,
        })
        .init(device);
    conv.bias = Some(Initializer::Constant { value: 0.1 }.init([out_channels], device));
    conv
}

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct InceptionBlockConfig {
    /// Channels of the block's input volume
    pub in_channels: usize,

    /// Filters produced by each of the four branches
    #[config(default = 6)]
    pub branch_filters: usize,

    /// Filters of the 1×1×1 projections in front of the 7³/5³/3³
    /// branches
    #[config(default = 6)]
    pub projection_filters: usize,
}

impl InceptionBlockConfig {
    pub fn out_channels(&self) -> usize {
        4 * self.branch_filters
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> InceptionBlock<B> {
        let out_channels = self.out_channels();
        assert!(
            self.in_channels > out_channels || out_channels % self.in_channels == 0,
            "tiled shortcut needs out channels ({out_channels}) divisible by in channels ({})",
            self.in_channels
        );
        let [k7, k5, k3, k1] = INCEPTION_KERNELS;
        InceptionBlock {
            proj_7: conv3d(self.in_channels, self.projection_filters, k1, 1, device),
            conv_7: conv3d(self.projection_filters, self.branch_filters, k7, 1, device),
            proj_5: conv3d(self.in_channels, self.projection_filters, k1, 1, device),
            conv_5: conv3d(self.projection_filters, self.branch_filters, k5, 1, device),
            proj_3: conv3d(self.in_channels, self.projection_filters, k1, 1, device),
            conv_3: conv3d(self.projection_filters, self.branch_filters, k3, 1, device),
            conv_1: conv3d(self.in_channels, self.branch_filters, k1, 1, device),
            shortcut_proj: conv3d(self.in_channels, out_channels, k1, 1, device),
            in_channels: self.in_channels,
            out_channels,
        }
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct InceptionBlock<B: Backend> {
    proj_7: Conv3d<B>,
    conv_7: Conv3d<B>,
    proj_5: Conv3d<B>,
    conv_5: Conv3d<B>,
    proj_3: Conv3d<B>,
    conv_3: Conv3d<B>,
    conv_1: Conv3d<B>,
    /// Channel projection of the shortcut; only exercised when the
    /// input is wider than the output.
    shortcut_proj: Conv3d<B>,
    in_channels: usize,
    out_channels: usize,
}

impl<B: Backend> InceptionBlock<B> {
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Forward pass. Output extent = input extent − 6 per axis.
    pub fn forward(&self, x: Tensor<B, 5>) -> Tensor<B, 5> {
        let b7 = self.conv_7.forward(self.proj_7.forward(x.clone()));
        let b5 = crop(self.conv_5.forward(self.proj_5.forward(x.clone())), 1);
        let b3 = crop(self.conv_3.forward(self.proj_3.forward(x.clone())), 2);
        let b1 = crop(self.conv_1.forward(x.clone()), 3);
        let fused = Tensor::cat(vec![b7, b5, b3, b1], 1);

        let shortcut = crop(x, 3);
        let shortcut = if self.in_channels > self.out_channels {
            self.shortcut_proj.forward(shortcut)
        } else {
            shortcut.repeat_dim(1, self.out_channels / self.in_channels)
        };

        fused + shortcut
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_output_extent_and_channels() {
        let device = Default::default();
        let block = InceptionBlockConfig::new(1).init::<TestBackend>(&device);
        let x = Tensor::zeros([2, 1, 9, 9, 9], &device);
        let out = block.forward(x);
        // Extent − 6, channels = 4 branches × 6 filters.
        assert_eq!(out.dims(), [2, 24, 3, 3, 3]);
    }

    #[test]
    fn test_conv_bias_starts_at_constant() {
        let device = Default::default();
        let conv = conv3d::<TestBackend>(2, 6, 3, 1, &device);
        let bias: Vec<f32> = conv.bias.unwrap().val().into_data().to_vec().unwrap();
        assert_eq!(bias, vec![0.1; 6]);
    }

    #[test]
    fn test_wide_input_uses_projected_shortcut() {
        let device = Default::default();
        // 72 input channels > 24 output channels → projection path.
        let block = InceptionBlockConfig::new(72).init::<TestBackend>(&device);
        let x = Tensor::zeros([1, 72, 8, 8, 8], &device);
        assert_eq!(block.forward(x).dims(), [1, 24, 2, 2, 2]);
    }
}
