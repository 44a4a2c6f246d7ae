//! Gateway error types

use itx_rest::RestError;

use crate::protocol::CloseCode;

/// Errors of a single websocket connection
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("Socket is not connected")]
    NotConnected,

    #[error("Socket is already connected")]
    AlreadyConnected,

    #[error("Connection closed by peer (code {code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("Websocket transport error: {0}")]
    Transport(String),

    #[error("Invalid gateway payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SocketError {
    /// Close code the gateway ended the connection with, if it was a terminal one
    #[must_use]
    pub fn terminal_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Closed {
                code: Some(code), ..
            } => CloseCode::from_u16(*code).filter(|code| code.is_terminal()),
            _ => None,
        }
    }
}

/// Errors surfaced out of shard and manager lifecycles
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Shard {shard_id} closed by gateway: {code}")]
    TerminalClose { shard_id: u16, code: CloseCode },

    #[error("Shard manager has already been started")]
    AlreadyStarted,

    #[error("Failed to fetch gateway configuration: {0}")]
    Fetch(#[from] RestError),
}
