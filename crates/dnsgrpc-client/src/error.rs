//! Client error types.

use thiserror::Error;

use crate::connection::AddressError;

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the DNS client.
///
/// Failures after a watch is established never surface here; they end the
/// watch's result sequence instead (see [`crate::watch::WatchSession`]).
#[derive(Error, Debug)]
pub enum ClientError {
    /// DNS message could not be packed or unpacked.
    #[error("DNS encoding error: {0}")]
    Encoding(#[from] hickory_proto::error::ProtoError),

    /// gRPC transport error (connection failed, TLS error, etc.).
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// gRPC status error (the call or stream failed).
    #[error("gRPC status error: {0}")]
    RpcStatus(#[from] tonic::Status),

    /// The watch stream is already torn down.
    #[error("Stream closed: {0}")]
    StreamClosed(String),

    /// Server sent a response that does not fit the watch protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid server address.
    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Reading TLS material failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns true for failures of the underlying connection, call or stream.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RpcStatus(_) | Self::StreamClosed(_) | Self::Io(_)
        )
    }

    /// Returns true for malformed or out-of-sequence server responses.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

impl From<figment::Error> for ClientError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
