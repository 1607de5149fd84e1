use super::config::LayerConfig;
use crate::{
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
};

/// Convolution as a matrix product: the input is rearranged into one row per output
/// position (im2col) and multiplied with the `(C*k*k) x F` filter matrix.
pub struct ConvLayer {
    pub(crate) in_channels: usize,
    pub(crate) filters: usize,
    pub(crate) filter_size: usize,
    pub(crate) batch_size: usize,
    input_size: usize,
    output_size: usize,
    update_shift: u32,
    /// Rows of the im2col matrix, `None` reads the zero padding.
    col_indices: Vec<Option<usize>>,
    col_to_nchw: Vec<Option<usize>>,
    nchw_to_col: Vec<Option<usize>>,
    pub(crate) weights: VecShare<u64>,
    pub(crate) bias: VecShare<u64>,
    input_cols: Option<VecShare<u64>>,
}

impl ConvLayer {
    pub fn new(config: &LayerConfig, batch_size: usize, update_shift: u32) -> Result<Self, Error> {
        let LayerConfig::Convolution {
            image_height: h,
            image_width: w,
            in_channels: c,
            filter_size: k,
            filters: f,
            stride,
            padding,
        } = *config
        else {
            return Err(Error::ConfigError(format!(
                "expected a Convolution layer, got {}",
                config.name()
            )));
        };
        let (oh, ow) = config.output_hw().ok_or_else(|| {
            Error::ConfigError(format!("invalid convolution shape {:?}", config))
        })?;

        let positions = oh * ow;
        let patch = c * k * k;
        let rows = batch_size * positions;

        let mut col_indices = Vec::with_capacity(rows * patch);
        for b in 0..batch_size {
            for oy in 0..oh {
                for ox in 0..ow {
                    for ch in 0..c {
                        for fy in 0..k {
                            for fx in 0..k {
                                let iy = (oy * stride + fy) as isize - padding as isize;
                                let ix = (ox * stride + fx) as isize - padding as isize;
                                if iy < 0 || ix < 0 || iy >= h as isize || ix >= w as isize {
                                    col_indices.push(None);
                                } else {
                                    col_indices.push(Some(
                                        b * c * h * w + ch * h * w + iy as usize * w + ix as usize,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut col_to_nchw = vec![None; rows * f];
        let mut nchw_to_col = vec![None; rows * f];
        for b in 0..batch_size {
            for filter in 0..f {
                for pos in 0..positions {
                    let nchw = b * f * positions + filter * positions + pos;
                    let col = (b * positions + pos) * f + filter;
                    col_to_nchw[nchw] = Some(col);
                    nchw_to_col[col] = Some(nchw);
                }
            }
        }

        Ok(Self {
            in_channels: c,
            filters: f,
            filter_size: k,
            batch_size,
            input_size: config.input_size(),
            output_size: config.output_size(),
            update_shift,
            col_indices,
            col_to_nchw,
            nchw_to_col,
            weights: VecShare::zero(patch * f),
            bias: VecShare::zero(f),
            input_cols: None,
        })
    }

    pub(crate) fn input_size(&self) -> usize {
        self.input_size
    }

    pub(crate) fn output_size(&self) -> usize {
        self.output_size
    }

    fn patch(&self) -> usize {
        self.in_channels * self.filter_size * self.filter_size
    }

    fn rows(&self) -> usize {
        self.col_indices.len() / self.patch()
    }

    pub fn set_weights(&mut self, weights: VecShare<u64>, bias: VecShare<u64>) -> Result<(), Error> {
        if weights.len() != self.patch() * self.filters || bias.len() != self.filters {
            return Err(Error::InvalidSizeError);
        }
        self.weights = weights;
        self.bias = bias;
        Ok(())
    }

    pub async fn forward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        if input.len() != self.batch_size * self.input_size {
            return Err(Error::InvalidSizeError);
        }
        let (rows, patch) = (self.rows(), self.patch());
        let cols = input.gather(&self.col_indices);
        let mut out_cols = ctx
            .matmul_fixed(&cols, &self.weights, rows, patch, self.filters)
            .await?;
        out_cols.add_row_broadcast(&self.bias, rows)?;
        self.input_cols = Some(cols);
        Ok(out_cols.gather(&self.col_to_nchw))
    }

    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let cols = self
            .input_cols
            .take()
            .ok_or_else(|| Error::Other("backward without forward".to_owned()))?;
        if delta.len() != self.batch_size * self.output_size {
            return Err(Error::InvalidSizeError);
        }
        let (rows, patch, f) = (self.rows(), self.patch(), self.filters);
        let delta_cols = delta.gather(&self.nchw_to_col);

        // col2im of dY * W^T
        let weights_t = self.weights.transpose(patch, f);
        let grad_cols = ctx.matmul(&delta_cols, &weights_t, rows, f, patch).await?;
        let mut prev_delta = VecShare::zero(self.batch_size * self.input_size);
        grad_cols.scatter_add(&self.col_indices, &mut prev_delta);
        let prev_delta = ctx.truncate(&prev_delta, ctx.frac_bits()).await?;

        let cols_t = cols.transpose(rows, patch);
        let weight_grad = ctx.matmul(&cols_t, &delta_cols, patch, rows, f).await?;
        let weight_grad = ctx
            .truncate(&weight_grad, ctx.frac_bits() + self.update_shift)
            .await?;
        let bias_grad = ctx
            .truncate(&delta_cols.sum_rows(rows), self.update_shift)
            .await?;

        self.weights = self.weights.sub(&weight_grad)?;
        self.bias = self.bias.sub(&bias_grad)?;
        Ok(prev_delta)
    }
}
