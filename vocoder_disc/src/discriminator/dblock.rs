//! Dblock: one spectrogram/condition stage of the MSG discriminator.

use candle_core::Tensor;
use candle_nn::{Module, VarBuilder};

use crate::error::{check_aligned, check_ncl, Result};
use crate::nn::{WeightNormConv1d, LEAKY_RELU_SLOPE};

// ---------------------------------------------------------------------------
// LeakyConv
// ---------------------------------------------------------------------------

/// LeakyReLU(0.2) followed by a weight-normed k=3 conv.
///
/// Parameters live under `<prefix>.1`, matching a
/// `Sequential(LeakyReLU, Conv1d)`.
#[derive(Debug, Clone)]
pub struct LeakyConv {
    conv: WeightNormConv1d,
}

impl LeakyConv {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let conv = WeightNormConv1d::new(in_channels, out_channels, 3, 1, 1, vb.pp("1"))?;
        Ok(Self { conv })
    }
}

impl Module for LeakyConv {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let h = candle_nn::ops::leaky_relu(xs, LEAKY_RELU_SLOPE)?;
        self.conv.forward(&h)
    }
}

// ---------------------------------------------------------------------------
// Dblock
// ---------------------------------------------------------------------------

/// Two-stream residual block.
///
/// The spectrogram stream widens from `input_dim` to `output_dim`; the
/// condition stream keeps `hidden_dim` channels and is mixed into the
/// spectrogram stream at the input of every block.
#[derive(Debug, Clone)]
pub struct Dblock {
    input_spec: WeightNormConv1d,
    input_cond: WeightNormConv1d,
    output_spec: LeakyConv,
    output_cond: LeakyConv,
    input_dim: usize,
    output_dim: usize,
    hidden_dim: usize,
}

impl Dblock {
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        hidden_dim: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let input_spec =
            WeightNormConv1d::new(input_dim, output_dim, 3, 1, 1, vb.pp("input_spec"))?;
        let input_cond =
            WeightNormConv1d::new(hidden_dim, output_dim, 3, 1, 1, vb.pp("input_cond"))?;
        let output_spec = LeakyConv::new(output_dim, output_dim, vb.pp("output_spec"))?;
        let output_cond = LeakyConv::new(output_dim, hidden_dim, vb.pp("output_cond"))?;

        Ok(Self {
            input_spec,
            input_cond,
            output_spec,
            output_cond,
            input_dim,
            output_dim,
            hidden_dim,
        })
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Run one block.
    ///
    /// - spec: (batch, input_dim, time)
    /// - cond: (batch, hidden_dim, time), same batch and time as `spec`
    ///
    /// Returns `(spec', cond')` with shapes (batch, output_dim, time) and
    /// (batch, hidden_dim, time).
    pub fn forward(&self, spec: &Tensor, cond: &Tensor) -> Result<(Tensor, Tensor)> {
        check_ncl(spec, self.input_dim, "spectrogram")?;
        check_ncl(cond, self.hidden_dim, "condition")?;
        check_aligned(spec, cond)?;

        let x1 = self.input_spec.forward(spec)?;
        let y1 = self.input_cond.forward(cond)?;
        let x = (&x1 + &y1)?;

        let out_spec = (self.output_spec.forward(&x)? + &x1)?;
        let out_cond = (self.output_cond.forward(&y1)? + cond)?;
        Ok((out_spec, out_cond))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscriminatorError;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn init_dblock(
        varmap: &VarMap,
        input_dim: usize,
        output_dim: usize,
        hidden_dim: usize,
    ) -> Result<Dblock> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        Dblock::new(input_dim, output_dim, hidden_dim, vb)
    }

    #[test]
    fn test_dblock_shapes() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let block = init_dblock(&varmap, 80, 160, 256)?;
        let x = Tensor::randn(0f32, 1.0, (4, 80, 300), &device)?;
        let cond = Tensor::ones((4, 256, 300), DType::F32, &device)?;
        let (spec, cond) = block.forward(&x, &cond)?;
        assert_eq!(spec.dims(), &[4, 160, 300]);
        assert_eq!(cond.dims(), &[4, 256, 300]);
        Ok(())
    }

    #[test]
    fn test_dblock_parameter_names() -> Result<()> {
        let varmap = VarMap::new();
        let _ = init_dblock(&varmap, 8, 16, 4)?;
        let data = varmap.data().lock().unwrap();
        assert_eq!(data["input_spec.weight_v"].dims(), &[16, 8, 3]);
        assert_eq!(data["input_cond.weight_v"].dims(), &[16, 4, 3]);
        assert_eq!(data["output_spec.1.weight_v"].dims(), &[16, 16, 3]);
        assert_eq!(data["output_cond.1.weight_v"].dims(), &[4, 16, 3]);
        assert_eq!(data.len(), 4 * 3);
        Ok(())
    }

    #[test]
    fn test_dblock_residual_paths() -> Result<()> {
        // With every weight and bias zeroed the block reduces to its skips:
        // spec' = x1 = 0 and cond' = cond.
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let block = init_dblock(&varmap, 2, 4, 3)?;
        for (name, var) in varmap.data().lock().unwrap().iter() {
            if name.ends_with("weight_g") || name.ends_with("bias") {
                var.set(&var.zeros_like()?)?;
            }
        }
        let x = Tensor::randn(0f32, 1.0, (1, 2, 7), &device)?;
        let cond = Tensor::randn(0f32, 1.0, (1, 3, 7), &device)?;
        let (spec_out, cond_out) = block.forward(&x, &cond)?;

        let spec_max = spec_out.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert!(spec_max < 1e-6, "spec' = {spec_max}");
        let cond_diff = (cond_out - &cond)?.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert!(cond_diff < 1e-6, "cond' - cond = {cond_diff}");
        Ok(())
    }

    #[test]
    fn test_dblock_rejects_wrong_condition_width() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let block = init_dblock(&varmap, 8, 16, 4)?;
        let x = Tensor::zeros((1, 8, 10), DType::F32, &device)?;
        let cond = Tensor::zeros((1, 5, 10), DType::F32, &device)?;
        assert!(matches!(
            block.forward(&x, &cond),
            Err(DiscriminatorError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_dblock_rejects_misaligned_condition() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let block = init_dblock(&varmap, 8, 16, 4)?;
        assert_eq!(block.output_dim(), 16);

        let x = Tensor::zeros((1, 8, 10), DType::F32, &device)?;
        let cond = Tensor::zeros((1, 4, 12), DType::F32, &device)?;
        match block.forward(&x, &cond) {
            Err(DiscriminatorError::ShapeMismatch { actual, .. }) => {
                assert_eq!(actual, vec![1, 4, 12])
            }
            other => panic!("expected a shape mismatch, got {other:?}"),
        }
        Ok(())
    }
}
