pub mod config;
pub mod conv;
pub mod fc;
pub mod maxpool;
pub mod network;
pub mod relu;

use self::{
    config::LayerConfig, conv::ConvLayer, fc::FcLayer, maxpool::MaxPoolLayer, relu::ReluLayer,
};
use crate::{
    error::Error,
    rep3::{protocol::Context, vecshare::VecShare},
    traits::network_trait::NetworkTrait,
};

pub enum Layer {
    FullyConnected(FcLayer),
    Convolution(ConvLayer),
    Relu(ReluLayer),
    MaxPool(MaxPoolLayer),
}

impl Layer {
    pub fn new(config: &LayerConfig, batch_size: usize, update_shift: u32) -> Result<Self, Error> {
        let layer = match *config {
            LayerConfig::FullyConnected {
                input_dim,
                output_dim,
            } => Self::FullyConnected(FcLayer::new(
                input_dim,
                output_dim,
                batch_size,
                update_shift,
            )),
            LayerConfig::Convolution { .. } => {
                Self::Convolution(ConvLayer::new(config, batch_size, update_shift)?)
            }
            LayerConfig::Relu { size } => Self::Relu(ReluLayer::new(size, batch_size)),
            LayerConfig::MaxPool { .. } => Self::MaxPool(MaxPoolLayer::new(config, batch_size)?),
        };
        Ok(layer)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::FullyConnected(_) => "FullyConnected",
            Self::Convolution(_) => "Convolution",
            Self::Relu(_) => "Relu",
            Self::MaxPool(_) => "MaxPool",
        }
    }

    /// Values per sample consumed by the layer.
    pub fn input_size(&self) -> usize {
        match self {
            Self::FullyConnected(layer) => layer.input_dim,
            Self::Convolution(layer) => layer.input_size(),
            Self::Relu(layer) => layer.size,
            Self::MaxPool(layer) => layer.input_size(),
        }
    }

    /// Values per sample produced by the layer.
    pub fn output_size(&self) -> usize {
        match self {
            Self::FullyConnected(layer) => layer.output_dim,
            Self::Convolution(layer) => layer.output_size(),
            Self::Relu(layer) => layer.size,
            Self::MaxPool(layer) => layer.output_size(),
        }
    }

    pub async fn forward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        input: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        match self {
            Self::FullyConnected(layer) => layer.forward(ctx, input).await,
            Self::Convolution(layer) => layer.forward(ctx, input).await,
            Self::Relu(layer) => layer.forward(ctx, input).await,
            Self::MaxPool(layer) => layer.forward(ctx, input).await,
        }
    }

    /// Takes the gradient of the output and returns the gradient of the input.
    /// Layers with weights also apply their update.
    pub async fn backward<N: NetworkTrait>(
        &mut self,
        ctx: &mut Context<N>,
        delta: &VecShare<u64>,
    ) -> Result<VecShare<u64>, Error> {
        match self {
            Self::FullyConnected(layer) => layer.backward(ctx, delta).await,
            Self::Convolution(layer) => layer.backward(ctx, delta).await,
            Self::Relu(layer) => layer.backward(ctx, delta).await,
            Self::MaxPool(layer) => layer.backward(ctx, delta).await,
        }
    }

    /// Weights and bias of layers that have them.
    pub fn weights(&self) -> Option<(&VecShare<u64>, &VecShare<u64>)> {
        match self {
            Self::FullyConnected(layer) => Some((&layer.weights, &layer.bias)),
            Self::Convolution(layer) => Some((&layer.weights, &layer.bias)),
            Self::Relu(_) | Self::MaxPool(_) => None,
        }
    }

    pub fn set_weights(&mut self, weights: VecShare<u64>, bias: VecShare<u64>) -> Result<(), Error> {
        match self {
            Self::FullyConnected(layer) => layer.set_weights(weights, bias),
            Self::Convolution(layer) => layer.set_weights(weights, bias),
            Self::Relu(_) | Self::MaxPool(_) => Err(Error::Other(format!(
                "{} layer has no weights",
                self.kind()
            ))),
        }
    }
}
