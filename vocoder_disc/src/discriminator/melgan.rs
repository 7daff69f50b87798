//! MelGAN discriminator: strided weight-normed convs over a spectrogram.

use candle_core::Tensor;
use candle_nn::{Module, VarBuilder};

use super::DiscriminatorOutput;
use crate::config::MelGanDiscriminatorConfig;
use crate::error::{check_ncl, DiscriminatorError, Result};
use crate::nn::{WeightNormConv1d, LEAKY_RELU_SLOPE};

// ---------------------------------------------------------------------------
// MelGanLayer
// ---------------------------------------------------------------------------

/// One conv, optionally followed by LeakyReLU(0.2).
#[derive(Debug, Clone)]
struct MelGanLayer {
    conv: WeightNormConv1d,
    activate: bool,
}

impl MelGanLayer {
    /// Conv + LeakyReLU, stored as `Sequential(conv, act)` so the conv sits
    /// under `.0`.
    fn activated(
        in_ch: usize,
        out_ch: usize,
        stride: usize,
        padding: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let conv = WeightNormConv1d::new(in_ch, out_ch, 3, stride, padding, vb.pp("0"))?;
        Ok(Self {
            conv,
            activate: true,
        })
    }

    fn plain(
        in_ch: usize,
        out_ch: usize,
        padding: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let conv = WeightNormConv1d::new(in_ch, out_ch, 3, 1, padding, vb)?;
        Ok(Self {
            conv,
            activate: false,
        })
    }
}

impl Module for MelGanLayer {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.conv.forward(xs)?;
        if self.activate {
            candle_nn::ops::leaky_relu(&h, LEAKY_RELU_SLOPE)
        } else {
            Ok(h)
        }
    }
}

// ---------------------------------------------------------------------------
// MelGanDiscriminator
// ---------------------------------------------------------------------------

/// Unconditioned spectrogram discriminator.
///
/// Layout (`n = n_layers`):
/// - `layer_0`: input_dim → ndf, k=3 s=1 p=0
/// - `layer_1..=n`: k=3 s=2 p=1, channels double up to `disc_out`
/// - `layer_{n+1}`: → disc_out, k=3 s=1 p=2
/// - `layer_{n+2}`: disc_out → 1, k=3 s=1 p=1, no activation
#[derive(Debug, Clone)]
pub struct MelGanDiscriminator {
    layers: Vec<MelGanLayer>,
    input_dim: usize,
}

impl MelGanDiscriminator {
    pub fn new(config: &MelGanDiscriminatorConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let vb = vb.pp("discriminator");
        let mut layers = Vec::with_capacity(config.n_layers + 3);

        layers.push(MelGanLayer::activated(
            config.input_dim,
            config.ndf,
            1,
            0,
            vb.pp("layer_0"),
        )?);

        let mut nf = config.ndf;
        for (i, (in_ch, out_ch)) in config.strided_channels().into_iter().enumerate() {
            let layer_vb = vb.pp(format!("layer_{}", i + 1));
            layers.push(MelGanLayer::activated(in_ch, out_ch, 2, 1, layer_vb)?);
            nf = out_ch;
        }

        let n = config.n_layers;
        layers.push(MelGanLayer::activated(
            nf,
            config.disc_out,
            1,
            2,
            vb.pp(format!("layer_{}", n + 1)),
        )?);
        let head_vb = vb.pp(format!("layer_{}", n + 2));
        layers.push(MelGanLayer::plain(config.disc_out, 1, 1, head_vb)?);

        tracing::debug!(
            input_dim = config.input_dim,
            ndf = config.ndf,
            n_layers = config.n_layers,
            disc_out = config.disc_out,
            "built MelGAN discriminator"
        );

        Ok(Self {
            layers,
            input_dim: config.input_dim,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Output time length for an input of `len` frames, `None` when some
    /// layer would get fewer frames than its kernel needs.
    pub fn output_len(&self, len: usize) -> Option<usize> {
        self.layers
            .iter()
            .try_fold(len, |l, layer| layer.conv.output_len(l))
    }

    /// Score a spectrogram.
    ///
    /// - x: (batch, input_dim, time), time >= 3
    ///
    /// `features` holds every layer output but the last; `score` is the last
    /// layer output, shape (batch, 1, time').
    pub fn forward(&self, x: &Tensor) -> Result<DiscriminatorOutput> {
        check_ncl(x, self.input_dim, "spectrogram")?;
        if self.output_len(x.dim(2)?).is_none() {
            return Err(DiscriminatorError::ShapeMismatch {
                expected: format!(
                    "spectrogram of shape (batch, {}, time) with at least 3 frames",
                    self.input_dim
                ),
                actual: x.dims().to_vec(),
            });
        }
        let mut features = Vec::with_capacity(self.layers.len());
        let mut h = x.clone();
        for layer in &self.layers {
            h = layer.forward(&h)?;
            features.push(h.clone());
        }
        // Non-empty: the constructor always builds n_layers + 3 layers.
        let score = features.pop().unwrap_or(h);
        Ok(DiscriminatorOutput { features, score })
    }
}
