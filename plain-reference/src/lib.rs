//! Plaintext reference for the secure layers and the metrics that are computed on
//! reconstructed predictions.

pub mod layers;
pub mod metrics;

pub use metrics::ConfusionMatrix;
