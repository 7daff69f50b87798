//! Multi-scale ensembles: one discriminator per average-pooled resolution.

use candle_core::{DType, Device, Tensor};
use candle_nn::{Module, VarBuilder, VarMap};

use super::melgan::MelGanDiscriminator;
use super::msg::MsgDiscriminator;
use super::DiscriminatorOutput;
use crate::config::{MultiMsgDiscriminatorConfig, MultiScaleDiscriminatorConfig};
use crate::error::Result;
use crate::nn::{weights_init, AvgPool1d};

// ---------------------------------------------------------------------------
// Downsample
// ---------------------------------------------------------------------------

/// Pooling between scales: kernel `downsampling_factor`, stride 2, padding 1,
/// padding excluded from the average.
#[derive(Debug, Clone, Copy)]
pub struct Downsample {
    pool: AvgPool1d,
}

impl Downsample {
    pub fn new(downsampling_factor: usize) -> Result<Self> {
        Ok(Self {
            pool: AvgPool1d::new(downsampling_factor, 2, 1)?,
        })
    }

    pub fn output_len(&self, len: usize) -> Option<usize> {
        self.pool.output_len(len)
    }
}

impl Module for Downsample {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.pool.forward(xs)
    }
}

/// Split ensemble outputs into per-scale feature lists.
pub fn features(outputs: &[DiscriminatorOutput]) -> Vec<Vec<Tensor>> {
    outputs.iter().map(|o| o.features.clone()).collect()
}

/// Split ensemble outputs into per-scale scores.
pub fn scores(outputs: &[DiscriminatorOutput]) -> Vec<Tensor> {
    outputs.iter().map(|o| o.score.clone()).collect()
}

// ---------------------------------------------------------------------------
// MultiMsgDiscriminator
// ---------------------------------------------------------------------------

/// MSG discriminators applied to the spectrogram and condition at
/// `num_d` resolutions. Members live under `model.disc_{i}`.
#[derive(Debug, Clone)]
pub struct MultiMsgDiscriminator {
    discriminators: Vec<MsgDiscriminator>,
    downsample: Downsample,
}

impl MultiMsgDiscriminator {
    pub fn new(config: &MultiMsgDiscriminatorConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let member = config.discriminator();
        let discriminators = (0..config.num_d)
            .map(|i| MsgDiscriminator::new(&member, vb.pp(format!("model.disc_{}", i))))
            .collect::<Result<Vec<_>>>()?;
        let downsample = Downsample::new(config.downsampling_factor)?;

        tracing::debug!(
            num_d = config.num_d,
            downsampling_factor = config.downsampling_factor,
            "built multi-scale MSG discriminator"
        );

        Ok(Self {
            discriminators,
            downsample,
        })
    }

    /// Build on `varmap` and apply `weights_init` to every conv.
    pub fn fresh(
        config: &MultiMsgDiscriminatorConfig,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let model = Self::new(config, vb)?;
        weights_init(varmap)?;
        Ok(model)
    }

    pub fn num_scales(&self) -> usize {
        self.discriminators.len()
    }

    /// Score a spectrogram/condition pair at every scale.
    ///
    /// - x: (batch, ndf, time)
    /// - y: (batch, hidden_dim, time)
    ///
    /// Scale `i + 1` sees both inputs pooled once more than scale `i`.
    pub fn forward(&self, x: &Tensor, y: &Tensor) -> Result<Vec<DiscriminatorOutput>> {
        let mut outputs = Vec::with_capacity(self.discriminators.len());
        let mut x = x.clone();
        let mut y = y.clone();
        for (i, disc) in self.discriminators.iter().enumerate() {
            if i > 0 {
                x = self.downsample.forward(&x)?;
                y = self.downsample.forward(&y)?;
            }
            let frames = x.dim(2)?;
            tracing::trace!(scale = i, frames, "MSG scale");
            outputs.push(disc.forward(&x, &y)?);
        }
        Ok(outputs)
    }
}

// ---------------------------------------------------------------------------
// MultiScaleDiscriminator
// ---------------------------------------------------------------------------

/// MelGAN discriminators applied at `num_d` resolutions of the spectrogram.
#[derive(Debug, Clone)]
pub struct MultiScaleDiscriminator {
    discriminators: Vec<MelGanDiscriminator>,
    downsample: Downsample,
}

impl MultiScaleDiscriminator {
    pub fn new(config: &MultiScaleDiscriminatorConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let member = config.discriminator();
        let discriminators = (0..config.num_d)
            .map(|i| MelGanDiscriminator::new(&member, vb.pp(format!("model.disc_{}", i))))
            .collect::<Result<Vec<_>>>()?;
        let downsample = Downsample::new(config.downsampling_factor)?;

        tracing::debug!(
            num_d = config.num_d,
            downsampling_factor = config.downsampling_factor,
            "built multi-scale MelGAN discriminator"
        );

        Ok(Self {
            discriminators,
            downsample,
        })
    }

    /// Build on `varmap` and apply `weights_init` to every conv.
    pub fn fresh(
        config: &MultiScaleDiscriminatorConfig,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let model = Self::new(config, vb)?;
        weights_init(varmap)?;
        Ok(model)
    }

    pub fn num_scales(&self) -> usize {
        self.discriminators.len()
    }

    /// Score a spectrogram at every scale.
    ///
    /// - x: (batch, input_dim, time)
    pub fn forward(&self, x: &Tensor) -> Result<Vec<DiscriminatorOutput>> {
        let mut outputs = Vec::with_capacity(self.discriminators.len());
        let mut x = x.clone();
        for (i, disc) in self.discriminators.iter().enumerate() {
            if i > 0 {
                x = self.downsample.forward(&x)?;
            }
            let frames = x.dim(2)?;
            tracing::trace!(scale = i, frames, "MelGAN scale");
            outputs.push(disc.forward(&x)?);
        }
        Ok(outputs)
    }
}
