//! Error types for the remote tool protocol client

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur when talking to a remote tool server
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to connect to tool server '{server}': {message}")]
    Handshake { server: String, message: String },

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Tool server '{0}' is unavailable")]
    ServerFailed(String),

    #[error("Tool server '{server}' is not ready (state: {state})")]
    NotReady { server: String, state: &'static str },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether the failure happened on the channel rather than in the server's
    /// handling of the request. Only these trigger a reconnect.
    ///
    /// A malformed or uncorrelated reply is not one of them: the server has
    /// already processed the request, so resending it would run it twice.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Transport(_) | ProtocolError::SessionExpired
        )
    }
}

impl From<reqwest::Error> for ProtocolError {
    fn from(e: reqwest::Error) -> Self {
        ProtocolError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_response_is_not_transport() {
        assert!(ProtocolError::Transport("reset".into()).is_transport());
        assert!(ProtocolError::SessionExpired.is_transport());
        assert!(!ProtocolError::InvalidResponse("missing field".into()).is_transport());
        assert!(
            !ProtocolError::Rpc {
                code: -32602,
                message: "bad".into()
            }
            .is_transport()
        );
    }
}
