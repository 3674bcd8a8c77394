// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Client error type for cluster API operations
#[derive(Error, Debug, Diagnostic)]
pub enum ClientError {
    /// The API server could not be reached or answered with a server error
    #[error("Cluster API unavailable: {message}")]
    #[diagnostic(
        code(strew::client::unavailable),
        help("Check that the API server is running and reachable. Retries may succeed")
    )]
    Unavailable { message: String },

    /// The server rejected a binding because one already exists
    #[error("Binding conflict for pod {pod}")]
    #[diagnostic(
        code(strew::client::conflict),
        help("Another actor bound the pod first. This is a benign race, not a failure")
    )]
    Conflict { pod: String },

    /// The server answered with a status the client has no handling for
    #[error("Unexpected status {status}: {message}")]
    #[diagnostic(
        code(strew::client::unexpected_status),
        help("Check the request against the API server's supported resources and verbs")
    )]
    UnexpectedStatus { status: u16, message: String },

    /// A response body could not be decoded
    #[error("Failed to decode API response: {message}")]
    #[diagnostic(
        code(strew::client::decode),
        help("The server may be speaking an incompatible API version")
    )]
    Decode { message: String },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Whether a retry of the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Create an Unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(pod: impl Into<String>) -> Self {
        Self::Conflict { pod: pod.into() }
    }

    /// Create an UnexpectedStatus error
    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
