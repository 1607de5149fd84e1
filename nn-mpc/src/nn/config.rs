use crate::{error::Error, types::fixed_point::FRAC_BITS};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ITERATIONS: usize = 1;
pub const DEFAULT_BATCH_SIZE: usize = 128;
pub const DEFAULT_LOG_LEARNING_RATE: u32 = 5;
/// Gradient updates truncate by fewer bits than this.
const MAX_TRUNCATION: u64 = 63;

/// Shape parameters of one layer, per sample. Tensors are NCHW.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerConfig {
    FullyConnected {
        input_dim: usize,
        output_dim: usize,
    },
    Convolution {
        image_height: usize,
        image_width: usize,
        in_channels: usize,
        filter_size: usize,
        filters: usize,
        stride: usize,
        padding: usize,
    },
    Relu {
        size: usize,
    },
    MaxPool {
        image_height: usize,
        image_width: usize,
        channels: usize,
        pool_size: usize,
        stride: usize,
    },
}

impl LayerConfig {
    pub fn conv(
        (image_height, image_width, in_channels): (usize, usize, usize),
        filter_size: usize,
        filters: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        Self::Convolution {
            image_height,
            image_width,
            in_channels,
            filter_size,
            filters,
            stride,
            padding,
        }
    }

    pub fn maxpool(
        (image_height, image_width, channels): (usize, usize, usize),
        pool_size: usize,
        stride: usize,
    ) -> Self {
        Self::MaxPool {
            image_height,
            image_width,
            channels,
            pool_size,
            stride,
        }
    }

    pub fn fc(input_dim: usize, output_dim: usize) -> Self {
        Self::FullyConnected {
            input_dim,
            output_dim,
        }
    }

    pub fn relu(size: usize) -> Self {
        Self::Relu { size }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FullyConnected { .. } => "FullyConnected",
            Self::Convolution { .. } => "Convolution",
            Self::Relu { .. } => "Relu",
            Self::MaxPool { .. } => "MaxPool",
        }
    }

    /// Output height and width of a sliding window, if the window fits exactly.
    fn window_output(
        height: usize,
        width: usize,
        window: usize,
        stride: usize,
        padding: usize,
    ) -> Option<(usize, usize)> {
        let h = height + 2 * padding;
        let w = width + 2 * padding;
        if window == 0 || stride == 0 || window > h || window > w {
            return None;
        }
        if (h - window) % stride != 0 || (w - window) % stride != 0 {
            return None;
        }
        Some(((h - window) / stride + 1, (w - window) / stride + 1))
    }

    /// `(height, width)` of each output channel of a windowed layer.
    pub fn output_hw(&self) -> Option<(usize, usize)> {
        match *self {
            Self::Convolution {
                image_height,
                image_width,
                filter_size,
                stride,
                padding,
                ..
            } => Self::window_output(image_height, image_width, filter_size, stride, padding),
            Self::MaxPool {
                image_height,
                image_width,
                pool_size,
                stride,
                ..
            } => Self::window_output(image_height, image_width, pool_size, stride, 0),
            _ => None,
        }
    }

    /// Lengths of the weight and bias vectors of layers that have them.
    pub fn weight_shape(&self) -> Option<(usize, usize)> {
        match *self {
            Self::FullyConnected {
                input_dim,
                output_dim,
            } => Some((input_dim * output_dim, output_dim)),
            Self::Convolution {
                in_channels,
                filter_size,
                filters,
                ..
            } => Some((in_channels * filter_size * filter_size * filters, filters)),
            Self::Relu { .. } | Self::MaxPool { .. } => None,
        }
    }

    pub fn input_size(&self) -> usize {
        match *self {
            Self::FullyConnected { input_dim, .. } => input_dim,
            Self::Convolution {
                image_height,
                image_width,
                in_channels,
                ..
            } => image_height * image_width * in_channels,
            Self::Relu { size } => size,
            Self::MaxPool {
                image_height,
                image_width,
                channels,
                ..
            } => image_height * image_width * channels,
        }
    }

    pub fn output_size(&self) -> usize {
        match *self {
            Self::FullyConnected { output_dim, .. } => output_dim,
            Self::Convolution { filters, .. } => {
                self.output_hw().map_or(0, |(h, w)| h * w * filters)
            }
            Self::Relu { size } => size,
            Self::MaxPool { channels, .. } => {
                self.output_hw().map_or(0, |(h, w)| h * w * channels)
            }
        }
    }

    fn check(&self) -> Result<(), Error> {
        if self.input_size() == 0 {
            return Err(Error::ConfigError(format!(
                "{} layer has an empty input",
                self.name()
            )));
        }
        match self {
            Self::Convolution { filters: 0, .. } => Err(Error::ConfigError(
                "Convolution layer without filters".to_owned(),
            )),
            Self::Convolution { .. } | Self::MaxPool { .. } if self.output_hw().is_none() => {
                Err(Error::ConfigError(format!(
                    "{} window does not tile the input: {:?}",
                    self.name(),
                    self
                )))
            }
            _ if self.output_size() == 0 => Err(Error::ConfigError(format!(
                "{} layer has an empty output",
                self.name()
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuralNetConfig {
    pub batch_size: usize,
    pub iterations: usize,
    /// Learning rate is `2^-log_learning_rate`.
    pub log_learning_rate: u32,
    pub layers: Vec<LayerConfig>,
}

impl NeuralNetConfig {
    pub fn new(batch_size: usize, iterations: usize) -> Self {
        Self {
            batch_size,
            iterations,
            log_learning_rate: DEFAULT_LOG_LEARNING_RATE,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: LayerConfig) {
        self.layers.push(layer);
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            Error::ConfigError(format!("cannot open {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_reader(file)
            .map_err(|e| Error::ConfigError(format!("cannot parse {}: {}", path.display(), e)))?;
        config.check_network()?;
        Ok(config)
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, LayerConfig::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, LayerConfig::output_size)
    }

    /// Shift applied to weight gradients: learning rate and batch averaging.
    pub fn update_shift(&self) -> u32 {
        self.log_learning_rate
            .saturating_add(self.batch_size.next_power_of_two().trailing_zeros())
    }

    /// Every layer is well formed and consumes what its predecessor produces.
    pub fn check_network(&self) -> Result<(), Error> {
        if self.batch_size == 0 {
            return Err(Error::ConfigError("batch size must be positive".to_owned()));
        }
        if self.layers.is_empty() {
            return Err(Error::ConfigError("network has no layers".to_owned()));
        }
        let shift = FRAC_BITS as u64 + self.update_shift() as u64;
        if shift >= MAX_TRUNCATION {
            return Err(Error::ConfigError(format!(
                "gradient truncation by {} bits does not fit the ring, lower log_learning_rate ({}) or the batch size ({})",
                shift, self.log_learning_rate, self.batch_size
            )));
        }
        for layer in self.layers.iter() {
            layer.check()?;
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(Error::ConfigError(format!(
                    "layer {} ({}) produces {} values, layer {} ({}) expects {}",
                    i,
                    pair[0].name(),
                    pair[0].output_size(),
                    i + 1,
                    pair[1].name(),
                    pair[1].input_size()
                )));
            }
        }
        Ok(())
    }
}

/// Appends `layer` and the ReLU over its output.
fn add_with_relu(config: &mut NeuralNetConfig, layer: LayerConfig) {
    let size = layer.output_size();
    config.add_layer(layer);
    config.add_layer(LayerConfig::relu(size));
}

/// Five blocks of 3x3 same-padded convolutions, each closed by a 2x2 pool, then three
/// fully connected layers.
fn vgg16(config: &mut NeuralNetConfig, side: usize, hidden: usize, classes: usize) {
    let blocks: [&[usize]; 5] = [&[64, 64], &[128, 128], &[256; 3], &[512; 3], &[512; 3]];
    let (mut side, mut channels) = (side, 3);
    for block in blocks {
        for &filters in block {
            add_with_relu(config, LayerConfig::conv((side, side, channels), 3, filters, 1, 1));
            channels = filters;
        }
        add_with_relu(config, LayerConfig::maxpool((side, side, channels), 2, 2));
        side /= 2;
    }
    add_with_relu(config, LayerConfig::fc(side * side * channels, hidden));
    add_with_relu(config, LayerConfig::fc(hidden, hidden));
    add_with_relu(config, LayerConfig::fc(hidden, classes));
}

/// Names accepted by [`select_network`].
pub const NETWORKS: [(&str, &str); 8] = [
    ("SecureML", "MNIST"),
    ("Sarda", "MNIST"),
    ("MiniONN", "MNIST"),
    ("LeNet", "MNIST"),
    ("AlexNet", "CIFAR10"),
    ("AlexNet", "ImageNet"),
    ("VGG16", "CIFAR10"),
    ("VGG16", "ImageNet"),
];

/// Topologies known by name.
pub fn select_network(
    network: &str,
    dataset: &str,
    batch_size: usize,
    iterations: usize,
) -> Result<NeuralNetConfig, Error> {
    let mut config = NeuralNetConfig::new(batch_size, iterations);
    match (network, dataset) {
        ("SecureML", "MNIST") => {
            config.add_layer(LayerConfig::fc(784, 128));
            config.add_layer(LayerConfig::relu(128));
            config.add_layer(LayerConfig::fc(128, 128));
            config.add_layer(LayerConfig::relu(128));
            config.add_layer(LayerConfig::fc(128, 10));
            config.add_layer(LayerConfig::relu(10));
        }
        ("Sarda", "MNIST") => {
            config.add_layer(LayerConfig::conv((28, 28, 1), 2, 5, 2, 0));
            config.add_layer(LayerConfig::relu(980));
            config.add_layer(LayerConfig::fc(980, 100));
            config.add_layer(LayerConfig::relu(100));
            config.add_layer(LayerConfig::fc(100, 10));
            config.add_layer(LayerConfig::relu(10));
        }
        ("MiniONN", "MNIST") => {
            config.add_layer(LayerConfig::conv((28, 28, 1), 5, 16, 1, 0));
            config.add_layer(LayerConfig::maxpool((24, 24, 16), 2, 2));
            config.add_layer(LayerConfig::relu(12 * 12 * 16));
            config.add_layer(LayerConfig::conv((12, 12, 16), 5, 16, 1, 0));
            config.add_layer(LayerConfig::maxpool((8, 8, 16), 2, 2));
            config.add_layer(LayerConfig::relu(4 * 4 * 16));
            config.add_layer(LayerConfig::fc(256, 100));
            config.add_layer(LayerConfig::relu(100));
            config.add_layer(LayerConfig::fc(100, 10));
            config.add_layer(LayerConfig::relu(10));
        }
        ("LeNet", "MNIST") => {
            config.add_layer(LayerConfig::conv((28, 28, 1), 5, 20, 1, 0));
            config.add_layer(LayerConfig::maxpool((24, 24, 20), 2, 2));
            config.add_layer(LayerConfig::relu(12 * 12 * 20));
            config.add_layer(LayerConfig::conv((12, 12, 20), 5, 50, 1, 0));
            config.add_layer(LayerConfig::maxpool((8, 8, 50), 2, 2));
            config.add_layer(LayerConfig::relu(4 * 4 * 50));
            config.add_layer(LayerConfig::fc(800, 500));
            config.add_layer(LayerConfig::relu(500));
            config.add_layer(LayerConfig::fc(500, 10));
            config.add_layer(LayerConfig::relu(10));
        }
        ("AlexNet", "CIFAR10") => {
            config.add_layer(LayerConfig::conv((33, 33, 3), 11, 96, 4, 9));
            add_with_relu(&mut config, LayerConfig::maxpool((11, 11, 96), 3, 2));
            config.add_layer(LayerConfig::conv((5, 5, 96), 5, 256, 1, 1));
            add_with_relu(&mut config, LayerConfig::maxpool((3, 3, 256), 3, 2));
            add_with_relu(&mut config, LayerConfig::conv((1, 1, 256), 3, 384, 1, 1));
            add_with_relu(&mut config, LayerConfig::conv((1, 1, 384), 3, 384, 1, 1));
            add_with_relu(&mut config, LayerConfig::conv((1, 1, 384), 3, 256, 1, 1));
            add_with_relu(&mut config, LayerConfig::fc(256, 256));
            add_with_relu(&mut config, LayerConfig::fc(256, 256));
            add_with_relu(&mut config, LayerConfig::fc(256, 10));
        }
        ("AlexNet", "ImageNet") => {
            config.add_layer(LayerConfig::conv((56, 56, 3), 7, 64, 1, 3));
            add_with_relu(&mut config, LayerConfig::maxpool((56, 56, 64), 2, 2));
            config.add_layer(LayerConfig::conv((28, 28, 64), 5, 128, 1, 2));
            add_with_relu(&mut config, LayerConfig::maxpool((28, 28, 128), 2, 2));
            add_with_relu(&mut config, LayerConfig::conv((14, 14, 128), 3, 256, 1, 1));
            config.add_layer(LayerConfig::conv((14, 14, 256), 3, 256, 1, 1));
            add_with_relu(&mut config, LayerConfig::maxpool((14, 14, 256), 2, 2));
            add_with_relu(&mut config, LayerConfig::fc(7 * 7 * 256, 1024));
            add_with_relu(&mut config, LayerConfig::fc(1024, 1024));
            add_with_relu(&mut config, LayerConfig::fc(1024, 200));
        }
        ("VGG16", "CIFAR10") => vgg16(&mut config, 32, 256, 10),
        ("VGG16", "ImageNet") => vgg16(&mut config, 64, 1024, 200),
        (network, dataset) => {
            return Err(Error::ConfigError(format!(
                "unknown network/dataset combination {:?}/{:?}",
                network, dataset
            )))
        }
    }
    config.check_network()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks_are_consistent() {
        for (network, dataset) in NETWORKS {
            let config = select_network(network, dataset, 4, 1).unwrap();
            let (input, output) = match (network, dataset) {
                (_, "MNIST") => (784, 10),
                ("AlexNet", "CIFAR10") => (33 * 33 * 3, 10),
                ("VGG16", "CIFAR10") => (32 * 32 * 3, 10),
                ("AlexNet", "ImageNet") => (56 * 56 * 3, 200),
                _ => (64 * 64 * 3, 200),
            };
            assert_eq!(config.input_size(), input, "{}/{}", network, dataset);
            assert_eq!(config.output_size(), output, "{}/{}", network, dataset);
        }
    }

    #[test]
    fn deep_topologies() {
        let vgg = select_network("VGG16", "CIFAR10", 4, 1).unwrap();
        let convs = vgg.layers.iter().filter(|l| l.name() == "Convolution").count();
        let fcs = vgg.layers.iter().filter(|l| l.name() == "FullyConnected").count();
        assert_eq!((convs, fcs), (13, 3));
        assert_eq!(vgg.layers[vgg.layers.len() - 6], LayerConfig::fc(512, 256));

        let vgg = select_network("VGG16", "ImageNet", 4, 1).unwrap();
        assert!(vgg.layers.contains(&LayerConfig::fc(2 * 2 * 512, 1024)));

        let alex = select_network("AlexNet", "ImageNet", 4, 1).unwrap();
        assert!(alex.layers.contains(&LayerConfig::fc(12544, 1024)));
        assert_eq!(alex.layers.iter().filter(|l| l.name() == "MaxPool").count(), 3);
    }

    #[test]
    fn weight_shapes() {
        assert_eq!(LayerConfig::fc(784, 128).weight_shape(), Some((784 * 128, 128)));
        assert_eq!(
            LayerConfig::conv((28, 28, 1), 5, 20, 1, 0).weight_shape(),
            Some((25 * 20, 20))
        );
        assert_eq!(LayerConfig::relu(10).weight_shape(), None);
        assert_eq!(LayerConfig::maxpool((4, 4, 2), 2, 2).weight_shape(), None);
    }

    #[test]
    fn unknown_combinations_are_config_errors() {
        assert!(matches!(
            select_network("AlexNet", "MNIST", 4, 1),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            select_network("VGG16", "MNIST", 4, 1),
            Err(Error::ConfigError(_))
        ));
        assert!(matches!(
            select_network("LeNet", "CIFAR10", 4, 1),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut config = NeuralNetConfig::new(4, 1);
        config.add_layer(LayerConfig::fc(10, 5));
        config.add_layer(LayerConfig::relu(6));
        assert!(matches!(config.check_network(), Err(Error::ConfigError(_))));

        let mut config = NeuralNetConfig::new(4, 1);
        config.add_layer(LayerConfig::conv((5, 5, 1), 2, 1, 2, 0));
        assert!(config.check_network().is_err());

        let mut config = NeuralNetConfig::new(0, 1);
        config.add_layer(LayerConfig::relu(6));
        assert!(config.check_network().is_err());
    }

    #[test]
    fn update_shift_must_fit_the_ring() {
        let mut config = select_network("SecureML", "MNIST", 128, 1).unwrap();
        assert_eq!(config.update_shift(), DEFAULT_LOG_LEARNING_RATE + 7);
        config.log_learning_rate = 60;
        assert!(matches!(config.check_network(), Err(Error::ConfigError(_))));
        // 13 fractional bits + 42 + 7 = 62 still fits
        config.log_learning_rate = 42;
        assert!(config.check_network().is_ok());
        config.log_learning_rate = 43;
        assert!(config.check_network().is_err());
        config.log_learning_rate = u32::MAX;
        assert!(config.check_network().is_err());
    }

    #[test]
    fn conv_shapes() {
        let conv = LayerConfig::conv((28, 28, 1), 5, 20, 1, 0);
        assert_eq!(conv.output_hw(), Some((24, 24)));
        assert_eq!(conv.output_size(), 24 * 24 * 20);
        let padded = LayerConfig::conv((4, 4, 2), 3, 3, 1, 1);
        assert_eq!(padded.output_size(), 4 * 4 * 3);
    }

    #[test]
    fn yaml_layers() {
        let yaml = "batch_size: 2\niterations: 1\nlog_learning_rate: 3\nlayers:\n  - type: FullyConnected\n    input_dim: 4\n    output_dim: 2\n  - type: Relu\n    size: 2\n";
        let config: NeuralNetConfig = serde_yaml::from_str(yaml).unwrap();
        config.check_network().unwrap();
        assert_eq!(config.update_shift(), 4);
    }
}
