use crate::{
    error::Error,
    nn::config::NeuralNetConfig,
    rep3::{protocol::share_plain, vecshare::VecShare},
    types::fixed_point,
};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::ConfigError(format!("cannot open {}: {}", path.display(), e)))?;
    Ok(bincode::deserialize_from(std::io::BufReader::new(file))?)
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let file = std::fs::File::create(path)
        .map_err(|e| Error::Other(format!("cannot create {}: {}", path.display(), e)))?;
    bincode::serialize_into(std::io::BufWriter::new(file), value)?;
    Ok(())
}

/// Row-major one-hot encoding of class indices.
pub fn one_hot(labels: &[usize], classes: usize) -> Result<Vec<f64>, Error> {
    let mut rows = vec![0.0; labels.len() * classes];
    for (row, label) in labels.iter().enumerate() {
        if *label >= classes {
            return Err(Error::ConfigError(format!(
                "label {} of sample {} is not one of {} classes",
                label, row, classes
            )));
        }
        rows[row * classes + label] = 1.0;
    }
    Ok(rows)
}

/// One party's share of an input batch as written by the dealer. `shares` holds
/// `rows x cols` fixed-point values and `labels` the `rows x classes` one-hot
/// targets, both row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedInput {
    pub party: usize,
    pub rows: usize,
    pub cols: usize,
    pub classes: usize,
    pub shares: VecShare<u64>,
    pub labels: VecShare<u64>,
}

impl SharedInput {
    /// Shares samples and their one-hot labels for the three parties.
    pub fn deal<R: Rng>(
        values: &[f64],
        labels: &[usize],
        cols: usize,
        classes: usize,
        rng: &mut R,
    ) -> Result<[Self; 3], Error> {
        let rows = labels.len();
        if values.len() != rows * cols {
            return Err(Error::InvalidSizeError);
        }
        let shares = share_plain(&fixed_point::encode_slice(values), rng);
        let targets = share_plain(&fixed_point::encode_slice(&one_hot(labels, classes)?), rng);
        let [s0, s1, s2] = shares;
        let [t0, t1, t2] = targets;
        Ok([(0, s0, t0), (1, s1, t1), (2, s2, t2)].map(|(party, shares, labels)| Self {
            party,
            rows,
            cols,
            classes,
            shares,
            labels,
        }))
    }

    pub fn check(&self) -> Result<(), Error> {
        if self.shares.len() != self.rows * self.cols {
            return Err(Error::ConfigError(format!(
                "input holds {} shares, expected {} x {}",
                self.shares.len(),
                self.rows,
                self.cols
            )));
        }
        if self.classes == 0 || self.labels.len() != self.rows * self.classes {
            return Err(Error::ConfigError(format!(
                "input holds {} label shares for {} rows of {} classes",
                self.labels.len(),
                self.rows,
                self.classes
            )));
        }
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let input: Self = read_bincode(path.as_ref())?;
        input.check()?;
        Ok(input)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_bincode(path.as_ref(), self)
    }
}

/// Plaintext class indices of a batch. Only read to score predictions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub labels: Vec<usize>,
}

impl GroundTruth {
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        read_bincode(path.as_ref())
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_bincode(path.as_ref(), self)
    }
}

/// Shared weights and bias of the layer at position `layer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShares {
    pub layer: usize,
    pub weights: VecShare<u64>,
    pub bias: VecShare<u64>,
}

/// One party's share of a trained model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWeights {
    pub party: usize,
    pub network: String,
    pub dataset: String,
    pub layers: Vec<LayerShares>,
}

impl SharedWeights {
    /// Samples weights uniform in `+-1/sqrt(fan_in)` and zero biases, then shares them.
    pub fn deal<R: Rng>(
        config: &NeuralNetConfig,
        network: &str,
        dataset: &str,
        rng: &mut R,
    ) -> Result<[Self; 3], Error> {
        config.check_network()?;
        let mut parties: [Self; 3] = std::array::from_fn(|party| Self {
            party,
            network: network.to_owned(),
            dataset: dataset.to_owned(),
            layers: Vec::new(),
        });
        for (layer, shape) in config.layers.iter().enumerate() {
            let Some((weights_len, bias_len)) = shape.weight_shape() else {
                continue;
            };
            let bound = 1.0 / ((weights_len / bias_len.max(1)).max(1) as f64).sqrt();
            let weights: Vec<f64> = (0..weights_len)
                .map(|_| rng.gen_range(-bound..bound))
                .collect();
            let weights = share_plain(&fixed_point::encode_slice(&weights), rng);
            let bias = share_plain(&fixed_point::encode_slice(&vec![0.0; bias_len]), rng);
            for ((party, weights), bias) in parties.iter_mut().zip(weights).zip(bias) {
                party.layers.push(LayerShares {
                    layer,
                    weights,
                    bias,
                });
            }
        }
        Ok(parties)
    }

    /// Every weighted layer of `config` is covered once with matching lengths.
    pub fn check(&self, config: &NeuralNetConfig) -> Result<(), Error> {
        let expected: Vec<_> = config
            .layers
            .iter()
            .enumerate()
            .filter_map(|(i, layer)| layer.weight_shape().map(|shape| (i, shape)))
            .collect();
        let found: Vec<_> = self
            .layers
            .iter()
            .map(|l| (l.layer, (l.weights.len(), l.bias.len())))
            .collect();
        if expected != found {
            return Err(Error::ConfigError(format!(
                "weights for {}/{} do not match the network: expected {:?}, found {:?}",
                self.network, self.dataset, expected, found
            )));
        }
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        read_bincode(path.as_ref())
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        write_bincode(path.as_ref(), self)
    }
}
