//! Batching client errors
//!
//! A [`TransportError`] concerns a whole batch and is handed to every call in
//! it. A procedure failure concerns one call only.

use scrap_contracts::RpcError;
use serde::{Deserialize, Serialize};

/// The batch as a whole could not be exchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TransportError {
    #[error("Network timeout after {duration_ms}ms")]
    NetworkTimeout { duration_ms: u64 },

    #[error("Request failed: {message}")]
    Request { message: String },

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Undecodable batch response: {message}")]
    Decode { message: String },

    #[error("Batch response has {received} results for {expected} calls")]
    LengthMismatch { expected: usize, received: usize },
}

impl TransportError {
    /// Build from a non-2xx response. `body` is used as the message, preferring
    /// the `error` field of a JSON error body.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        Self::Status { status, message }
    }
}

/// Failure of a single client call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The procedure ran and failed.
    #[error("{procedure} failed: {error}")]
    Procedure { procedure: String, error: RpcError },

    #[error("Unexpected output of {procedure}: {message}")]
    Decode { procedure: String, message: String },

    /// The client was dropped before the call's batch was sent.
    #[error("Batch client shut down before the call was sent")]
    Dropped,
}

impl ClientError {
    /// The procedure's error, if the call reached it.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::Procedure { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
