//! MSG discriminator: spectrogram + condition streams through stacked Dblocks.

use candle_core::Tensor;
use candle_nn::{Module, VarBuilder};

use super::dblock::Dblock;
use super::DiscriminatorOutput;
use crate::config::MsgDiscriminatorConfig;
use crate::error::Result;
use crate::nn::WeightNormConv1d;

/// Conditioned discriminator scoring a spectrogram per frame.
///
/// Layer `n` (1-based) widens the spectrogram stream from `nf·2^(n-1)` to
/// `nf·2^n` channels. Two k=3 heads project the final spectrogram and
/// condition streams to one channel each; their sum is the score.
#[derive(Debug, Clone)]
pub struct MsgDiscriminator {
    layers: Vec<Dblock>,
    disc_spec: WeightNormConv1d,
    disc_cond: WeightNormConv1d,
}

impl MsgDiscriminator {
    pub fn new(config: &MsgDiscriminatorConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let layers_vb = vb.pp("discriminator");

        // Checked by validate(), so the doublings below cannot overflow.
        let final_channels = config.final_channels()?;

        let mut nf = config.nf;
        let mut layers = Vec::with_capacity(config.n_layers);
        for n in 1..=config.n_layers {
            let layer = Dblock::new(
                nf,
                nf * 2,
                config.hidden_dim,
                layers_vb.pp(format!("layer_{}", n)),
            )?;
            nf = layer.output_dim();
            layers.push(layer);
        }
        debug_assert_eq!(nf, final_channels);

        let disc_spec = WeightNormConv1d::new(nf, 1, 3, 1, 1, vb.pp("disc_spec"))?;
        let disc_cond =
            WeightNormConv1d::new(config.hidden_dim, 1, 3, 1, 1, vb.pp("disc_cond"))?;

        tracing::debug!(
            nf = config.nf,
            n_layers = config.n_layers,
            hidden_dim = config.hidden_dim,
            final_channels,
            "built MSG discriminator"
        );

        Ok(Self {
            layers,
            disc_spec,
            disc_cond,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Score a spectrogram under its condition.
    ///
    /// - x: (batch, nf, time) spectrogram, time >= 1
    /// - y: (batch, hidden_dim, time) condition with the same batch and time
    ///
    /// `features` holds the spectrogram stream after every Dblock; `score`
    /// is (batch, time) with no sigmoid (least-squares GAN).
    pub fn forward(&self, x: &Tensor, y: &Tensor) -> Result<DiscriminatorOutput> {
        let mut features = Vec::with_capacity(self.layers.len());
        let mut x = x.clone();
        let mut y = y.clone();
        for layer in &self.layers {
            (x, y) = layer.forward(&x, &y)?;
            features.push(x.clone());
        }
        let out = (self.disc_spec.forward(&x)? + self.disc_cond.forward(&y)?)?;
        let score = out.flatten_from(1)?;
        Ok(DiscriminatorOutput { features, score })
    }
}
