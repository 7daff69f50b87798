//! Average pooling over time that does not count padding.

use candle_core::{DType, Result, Tensor};
use candle_nn::Module;

/// `AvgPool1d` with `count_include_pad = false`.
///
/// Padded frames add zero to each window sum and are left out of the
/// divisor, so windows at the edges average only real frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvgPool1d {
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

impl AvgPool1d {
    pub fn new(kernel_size: usize, stride: usize, padding: usize) -> Result<Self> {
        if kernel_size == 0 || stride == 0 {
            candle_core::bail!("avg_pool1d: kernel_size and stride must be > 0");
        }
        if 2 * padding > kernel_size {
            candle_core::bail!(
                "avg_pool1d: padding {} must be at most half of kernel_size {}",
                padding,
                kernel_size
            );
        }
        Ok(Self {
            kernel_size,
            stride,
            padding,
        })
    }

    /// Output length for an input of `len` frames, `None` when no window fits
    /// or the input is empty.
    pub fn output_len(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        (len + 2 * self.padding)
            .checked_sub(self.kernel_size)
            .map(|n| n / self.stride + 1)
    }

    /// Number of real (non-padding) frames in every output window, `(1, 1, out_len)`.
    fn window_counts(
        &self,
        len: usize,
        dtype: DType,
        device: &candle_core::Device,
    ) -> Result<Tensor> {
        let ones = Tensor::ones((1, 1, len), dtype, device)?;
        let kernel = Tensor::ones((1, 1, self.kernel_size), dtype, device)?;
        ones.conv1d(&kernel, self.padding, self.stride, 1, 1)
    }
}

impl Module for AvgPool1d {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (_batch, channels, len) = xs.dims3()?;
        if self.output_len(len).is_none() {
            candle_core::bail!(
                "avg_pool1d: input of {} frames is shorter than kernel {}",
                len,
                self.kernel_size
            );
        }
        // Depthwise ones kernel: one window sum per channel.
        let kernel = Tensor::ones((channels, 1, self.kernel_size), xs.dtype(), xs.device())?;
        let sums = xs.conv1d(&kernel, self.padding, self.stride, 1, channels)?;
        let counts = self.window_counts(len, xs.dtype(), xs.device())?;
        sums.broadcast_div(&counts)
    }
}
