use crate::{
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
};

/// `Y = X * W + b` over a batch, `W` is `input_dim x output_dim`.
pub struct FcLayer {
    pub(crate) input_dim: usize,
    pub(crate) output_dim: usize,
    pub(crate) batch_size: usize,
    update_shift: u32,
    pub(crate) weights: VecShare<u64>,
    pub(crate) bias: VecShare<u64>,
    input: Option<VecShare<u64>>,
}

impl FcLayer {
    pub fn new(input_dim: usize, output_dim: usize, batch_size: usize, update_shift: u32) -> Self {
        Self {
            input_dim,
            output_dim,
            batch_size,
            update_shift,
            weights: VecShare::zero(input_dim * output_dim),
            bias: VecShare::zero(output_dim),
            input: None,
        }
    }

    pub fn set_weights(&mut self, weights: VecShare<u64>, bias: VecShare<u64>) -> Result<(), Error> {
        if weights.len() != self.input_dim * self.output_dim || bias.len() != self.output_dim {
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
        if input.len() != self.batch_size * self.input_dim {
            return Err(Error::InvalidSizeError);
        }
        let mut out = ctx
            .matmul_fixed(
                input,
                &self.weights,
                self.batch_size,
                self.input_dim,
                self.output_dim,
            )
            .await?;
        out.add_row_broadcast(&self.bias, self.batch_size)?;
        self.input = Some(input.to_owned());
        Ok(out)
    }

    /// Returns the gradient w.r.t. the input and applies one SGD step.
    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let input = self
            .input
            .take()
            .ok_or_else(|| Error::Other("backward without forward".to_owned()))?;
        if delta.len() != self.batch_size * self.output_dim {
            return Err(Error::InvalidSizeError);
        }
        let (b, i, o) = (self.batch_size, self.input_dim, self.output_dim);

        // dX = dY * W^T
        let weights_t = self.weights.transpose(i, o);
        let prev_delta = ctx.matmul_fixed(delta, &weights_t, b, o, i).await?;

        // dW = X^T * dY, db = sum over the batch
        let input_t = input.transpose(b, i);
        let weight_grad = ctx.matmul(&input_t, delta, i, b, o).await?;
        let weight_grad = ctx
            .truncate(&weight_grad, ctx.frac_bits() + self.update_shift)
            .await?;
        let bias_grad = ctx.truncate(&delta.sum_rows(b), self.update_shift).await?;

        self.weights = self.weights.sub(&weight_grad)?;
        self.bias = self.bias.sub(&bias_grad)?;
        Ok(prev_delta)
    }
}
