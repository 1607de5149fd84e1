use crate::{
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
};

pub struct ReluLayer {
    pub(crate) size: usize,
    pub(crate) batch_size: usize,
    relu_prime: Option<VecShare<u64>>,
}

impl ReluLayer {
    pub fn new(size: usize, batch_size: usize) -> Self {
        Self {
            size,
            batch_size,
            relu_prime: None,
        }
    }

    pub async fn forward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        if input.len() != self.size * self.batch_size {
            return Err(Error::InvalidSizeError);
        }
        let (out, relu_prime) = ctx.relu(input).await?;
        self.relu_prime = Some(relu_prime);
        Ok(out)
    }

    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let relu_prime = self
            .relu_prime
            .take()
            .ok_or_else(|| Error::Other("backward without forward".to_owned()))?;
        // bits are 0/1, the product keeps the scale of delta
        ctx.mul(delta, &relu_prime).await
    }
}
