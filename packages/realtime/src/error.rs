use api::ApiError;
use thiserror::Error;

/// Failures of the underlying socket.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("could not open socket: {0}")]
    Open(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("socket is not open")]
    NotOpen,
}

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("no authentication reply from server")]
    AuthTimeout,

    #[error("gave up after {attempts} connection attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("connection closed by server")]
    Closed,

    #[error("could not encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("not connected")]
    NotConnected,

    #[error("socket dropped before the frame was written")]
    NotDelivered,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl RealtimeError {
    /// Errors after which reconnecting cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RealtimeError::AuthRejected(_) | RealtimeError::ReconnectExhausted { .. }
        )
    }
}
