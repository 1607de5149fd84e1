use std::io::ErrorKind;
use thiserror::Error;

/// An Error enum capturing the errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid network, dataset or security configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    /// A peer is unreachable, refused the handshake or closed its channel
    #[error("Connection error: {0}")]
    ConnectionError(String),
    /// A precompute pool holds fewer items than requested. Only used inside the
    /// precompute engine, which answers it with a refill.
    #[error("Randomness exhausted: requested {requested}, available {available}")]
    RandomnessExhaustion { requested: usize, available: usize },
    /// Malicious security check failed
    #[error("Consistency check failed: {0}")]
    ConsistencyCheckFailure(&'static str),
    /// Received data does not match the expected round
    #[error("Protocol desync: {0}")]
    ProtocolDesync(String),
    /// Local operands do not have matching sizes
    #[error("Size is invalid")]
    InvalidSizeError,
    /// Invalid party id provided
    #[error("Invalid Party id {0}")]
    IdError(usize),
    /// Invalid number of parties
    #[error("Invalid number of parties {0}")]
    NumPartyError(usize),
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Some other error has occurred.
    #[error("Err: {0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::UnexpectedEof | ErrorKind::InvalidData => {
                Self::ProtocolDesync(err.to_string())
            }
            _ => Self::ConnectionError(err.to_string()),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<String> for Error {
    fn from(mes: String) -> Self {
        Self::Other(mes)
    }
}

impl From<&str> for Error {
    fn from(mes: &str) -> Self {
        Self::Other(mes.to_owned())
    }
}
