//! Error types for etcd coordination operations.
//!
//! Benign store answers (a missing nodes directory, a lock held by someone
//! else) are not errors; they come back as values. What remains here is either
//! fatal for the exchange or a problem decoding what the store returned.

use reqwest::StatusCode;
use thiserror::Error;

/// Top-level error type for the etcd-coordination crate.
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// The store answered with a status the operation does not recognize.
    #[error("unexpected status code: {0}")]
    UnexpectedStatusCode(StatusCode),

    /// The listing body, a node key or a serialized node could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A node could not be turned into a key segment or entry value.
    #[error("codec error: {0}")]
    Codec(String),

    /// Connection or transport-level failure, passed through from the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// A lock was requested with a zero TTL.
    #[error("lock ttl must be greater than zero")]
    InvalidTtl,

    /// Configuration error (e.g. an invalid prefix or cluster name).
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoordinationError {
    /// Returns the status code carried by an `UnexpectedStatusCode` error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CoordinationError::UnexpectedStatusCode(status) => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the store answered with an unrecognized status.
    pub fn is_unexpected_status(&self) -> bool {
        matches!(self, CoordinationError::UnexpectedStatusCode(_))
    }

    /// Returns true if this error came from decoding store data.
    pub fn is_decode(&self) -> bool {
        matches!(self, CoordinationError::Decode(_))
    }

    /// Returns true if a node could not be encoded for the store.
    pub fn is_codec(&self) -> bool {
        matches!(self, CoordinationError::Codec(_))
    }

    /// Returns true if this error came from the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, CoordinationError::Transport(_))
    }
}

/// Shorthand result alias for coordination operations.
pub type CoordinationResult<T> = Result<T, CoordinationError>;
