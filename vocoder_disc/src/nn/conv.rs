//! Weight-normalized 1D convolution.
//!
//! Every convolution in the discriminators is weight-normalized:
//! `W = g * (v / ||v||)`, with the norm taken per output channel over
//! `(in_channels, kernel)`. The effective weight is recomputed from `g`
//! and `v` on every forward pass so gradients reach both.

use candle_core::{Result, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Init, Module, VarBuilder};

/// Prefix used by `torch.nn.utils.parametrizations.weight_norm` checkpoints.
const PARAMETRIZATION_PREFIX: &str = "parametrizations.weight";

/// Weight-normalized `Conv1d` in NCL layout.
#[derive(Debug, Clone)]
pub struct WeightNormConv1d {
    weight_g: Tensor,
    weight_v: Tensor,
    bias: Option<Tensor>,
    config: Conv1dConfig,
    kernel_size: usize,
}

impl WeightNormConv1d {
    /// Build a conv with bias.
    ///
    /// Reads `weight_g`/`weight_v`/`bias` under `vb`, or the
    /// `parametrizations.weight.original0/original1` pair when present.
    /// A freshly created `weight_g` is set to `||weight_v||`, so the initial
    /// effective kernel is exactly the drawn `weight_v`.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let config = Conv1dConfig {
            padding,
            stride,
            dilation: 1,
            groups: 1,
            ..Default::default()
        };
        let fan_in = in_channels * kernel_size;
        let bound = 1.0 / (fan_in as f64).sqrt();
        let v_init = Init::Uniform {
            lo: -bound,
            up: bound,
        };

        let v_shape = (out_channels, in_channels, kernel_size);
        let parametrized = format!("{PARAMETRIZATION_PREFIX}.original0");
        let (weight_g, weight_v) = if vb.contains_tensor(&parametrized) {
            let pvb = vb.pp(PARAMETRIZATION_PREFIX);
            (
                pvb.get((out_channels, 1, 1), "original0")?,
                pvb.get(v_shape, "original1")?,
            )
        } else {
            let fresh = !vb.contains_tensor("weight_g");
            let weight_v = vb.get_with_hints(v_shape, "weight_v", v_init)?;
            let weight_g = vb.get_with_hints((out_channels, 1, 1), "weight_g", Init::Const(1.0))?;
            if fresh {
                // Writes through to the backing variable.
                weight_g.slice_set(&l2_norm_per_channel(&weight_v)?, 0, 0)?;
            }
            (weight_g, weight_v)
        };
        let bias = vb.get_with_hints(out_channels, "bias", v_init)?;

        Ok(Self {
            weight_g,
            weight_v,
            bias: Some(bias),
            config,
            kernel_size,
        })
    }

    /// Effective kernel `g * v / ||v||`, shape `(out, in, k)`.
    pub fn weight(&self) -> Result<Tensor> {
        let norm = l2_norm_per_channel(&self.weight_v)?;
        self.weight_v
            .broadcast_div(&norm)?
            .broadcast_mul(&self.weight_g)
    }

    pub fn in_channels(&self) -> usize {
        self.weight_v.dims()[1]
    }

    pub fn out_channels(&self) -> usize {
        self.weight_v.dims()[0]
    }

    /// Output length for an input of `len` frames, `None` when the input is
    /// empty or shorter than the dilated kernel.
    pub fn output_len(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let c = &self.config;
        let span = c.dilation * self.kernel_size.saturating_sub(1) + 1;
        (len + 2 * c.padding)
            .checked_sub(span)
            .map(|n| n / c.stride + 1)
    }
}

impl Module for WeightNormConv1d {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let len = xs.dim(candle_core::D::Minus1)?;
        if self.output_len(len).is_none() {
            candle_core::bail!(
                "conv1d: input of {} frames is shorter than kernel {} with padding {}",
                len,
                self.kernel_size,
                self.config.padding
            );
        }
        let conv = Conv1d::new(self.weight()?, self.bias.clone(), self.config);
        conv.forward(xs)
    }
}

/// `||v||` over every dim but the first, kept as `(out, 1, 1)`.
pub fn l2_norm_per_channel(v: &Tensor) -> Result<Tensor> {
    v.sqr()?.sum_keepdim((1, 2))?.sqrt()
}
