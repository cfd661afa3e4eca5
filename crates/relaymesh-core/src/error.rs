//! Shared error type across relaymesh crates.

use thiserror::Error;

/// Error classes used for logging and metrics labels (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed frame, oversized message, invalid identifier syntax.
    Protocol,
    /// Unknown identifier, unauthorized gateway route.
    Routing,
    /// Outbound queue full.
    Backpressure,
    /// Payload did not match the registered argument shape.
    Decode,
    /// Socket failure or closed connection.
    Transport,
    /// Configuration or internal failure.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Protocol => "protocol",
            ErrorClass::Routing => "routing",
            ErrorClass::Backpressure => "backpressure",
            ErrorClass::Decode => "decode",
            ErrorClass::Transport => "transport",
            ErrorClass::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Frame header or length outside the accepted range.
    /// `resync` is false when the stream position can no longer be trusted.
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String, resync: bool },
    #[error("message too large: {0} bytes")]
    MessageTooLarge(usize),
    #[error("send queue full")]
    Backpressure,
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("invalid message id: {0}")]
    InvalidIdentifier(String),
    #[error("gateway try to route invalid service: {0}")]
    InvalidRoute(String),
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("io: {0}")]
    Io(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RelayError {
    /// Map the error to its handling class.
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::InvalidFrame { .. }
            | RelayError::MessageTooLarge(_)
            | RelayError::InvalidIdentifier(_) => ErrorClass::Protocol,
            RelayError::InvalidRoute(_) | RelayError::UnknownMessage(_) => ErrorClass::Routing,
            RelayError::Backpressure => ErrorClass::Backpressure,
            RelayError::Decode(_) => ErrorClass::Decode,
            RelayError::ConnectionClosed | RelayError::Io(_) => ErrorClass::Transport,
            RelayError::Config(_) | RelayError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Whether the reader loop must tear the connection down.
    ///
    /// Only failures of the underlying read, and frames after which the
    /// stream is no longer aligned on a header, are fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            RelayError::InvalidFrame { resync, .. } => !resync,
            RelayError::Io(_) | RelayError::ConnectionClosed => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Decode(e.to_string())
    }
}
