pub use super::data::{GroundTruth, LayerShares, SharedInput, SharedWeights};
pub use super::error::Error;
pub use super::nn::Layer;
pub use super::nn::config::{select_network, LayerConfig, NeuralNetConfig, NETWORKS};
pub use super::nn::network::NeuralNetwork;
pub use super::rep3::comm::{Comm, ConnectionState};
pub use super::rep3::id::PartyID;
pub use super::rep3::network::Rep3Network;
pub use super::rep3::precompute::{BatchConfig, PoolStats, Precompute};
pub use super::rep3::protocol::{share_plain, Context, SecurityLevel};
pub use super::rep3::random::prf::{AesRng, PartyKeys, PrfSeed};
pub use super::rep3::share::Share;
pub use super::rep3::vecshare::VecShare;
pub use super::traits::network_trait::{LinkStats, NetworkTrait};
pub use super::traits::test_network::{PartyTestNetwork, TestNetwork3p};
pub use super::types::fixed_point::{self, FRAC_BITS};
pub use super::types::ring_element::RingElement;
