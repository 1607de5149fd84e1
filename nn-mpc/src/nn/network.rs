use super::{config::NeuralNetConfig, Layer};
use crate::{
    data::SharedWeights,
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
};

/// An ordered sequence of layers. Holds no randomness of its own; every secure
/// operation goes through the [`Context`] passed in.
pub struct NeuralNetwork {
    config: NeuralNetConfig,
    layers: Vec<Layer>,
}

impl NeuralNetwork {
    pub fn new(config: NeuralNetConfig) -> Result<Self, Error> {
        config.check_network()?;
        let update_shift = config.update_shift();
        let layers = config
            .layers
            .iter()
            .map(|layer| Layer::new(layer, config.batch_size, update_shift))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, layers })
    }

    pub fn config(&self) -> &NeuralNetConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Party 0 samples small uniform weights and shares them; biases start at zero.
    pub async fn initialize_weights<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
    ) -> Result<(), Error> {
        for layer in self.layers.iter_mut() {
            let Some((weights, bias)) = layer.weights() else {
                continue;
            };
            let (weights_len, bias_len) = (weights.len(), bias.len());
            let fan_in = weights_len / bias_len.max(1);
            let bound = 1.0 / (fan_in.max(1) as f64).sqrt();
            let weights = ctx.random_fixed(weights_len, bound).await?;
            layer.set_weights(weights, ctx.zeros(bias_len))?;
        }
        tracing::debug!(
            "party {}: initialized weights of {} layers",
            ctx.get_id(),
            self.layers.len()
        );
        Ok(())
    }

    /// Replaces the weights of layer `index` with already shared values.
    pub fn load_weights(
        &mut self,
        index: usize,
        weights: VecShare<u64>,
        bias: VecShare<u64>,
    ) -> Result<(), Error> {
        let layer = self.layers.get_mut(index).ok_or_else(|| {
            Error::ConfigError(format!("network has no layer {}", index))
        })?;
        layer.set_weights(weights, bias)
    }

    /// Loads a dealt model into every weighted layer.
    pub fn load_shared_weights(&mut self, weights: SharedWeights) -> Result<(), Error> {
        weights.check(&self.config)?;
        let count = weights.layers.len();
        for layer in weights.layers {
            self.load_weights(layer.layer, layer.weights, layer.bias)?;
        }
        tracing::debug!(
            "loaded {} weighted layers of {}/{}",
            count,
            weights.network,
            weights.dataset
        );
        Ok(())
    }

    pub async fn forward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        let mut activation = input.to_owned();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            tracing::trace!("party {}: forward layer {} ({})", ctx.get_id(), i, layer.kind());
            activation = layer.forward(ctx, &activation).await?;
        }
        Ok(activation)
    }

    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<(), Error> {
        let mut delta = delta.to_owned();
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            tracing::trace!("party {}: backward layer {} ({})", ctx.get_id(), i, layer.kind());
            delta = layer.backward(ctx, &delta).await?;
        }
        Ok(())
    }

    /// One SGD step on a mini-batch; `labels` are shared one-hot fixed-point rows.
    pub async fn train<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
        labels: &VecShare<u64>,
    ) -> Result<(), Error> {
        let output = self.forward(ctx, input).await?;
        let delta = output.sub(labels)?;
        self.backward(ctx, &delta).await
    }

    /// Runs inference and opens the argmax of each sample.
    pub async fn predict<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<Vec<usize>, Error> {
        let output = self.forward(ctx, input).await?;
        let values = ctx.reconstruct_fixed(&output).await?;
        let classes = self.config.output_size();
        Ok(values
            .chunks(classes.max(1))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::MIN), |best, (i, v)| if *v > best.1 { (i, *v) } else { best })
                    .0
            })
            .collect())
    }
}
