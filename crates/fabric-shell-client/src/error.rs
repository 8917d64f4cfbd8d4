//! Client error types.

use std::time::Duration;

use fabric_shell_types::{CredentialKind, NodeStatus};
use thiserror::Error;

/// Result type for cluster client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by a cluster client.
///
/// Every variant carries owned data so a captured error can be stored
/// and handed to another task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never reached a gateway.
    #[error("transport error talking to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The operation did not finish within its budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The cluster rejected the presented credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The addressed entity (usually a node) could not be resolved.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The looked-up name does not exist.
    #[error("name does not exist")]
    NameNotFound,

    /// An operation failed because the named node does not exist.
    #[error("node '{node}' does not exist in the cluster")]
    NodeNotFound {
        node: String,
        #[source]
        source: Box<ClientError>,
    },

    /// An operation failed because the named node is not up.
    #[error("node '{node}' is not up (status: {status})")]
    NodeNotUp {
        node: String,
        status: NodeStatus,
        #[source]
        source: Box<ClientError>,
    },

    /// The client cannot authenticate with this kind of credential.
    #[error("credential type '{0}' is not supported by this client")]
    UnsupportedCredential(CredentialKind),

    /// The gateway answered with something that could not be decoded.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The gateway reported an error code.
    #[error("gateway error {code}: {message}")]
    Gateway { code: String, message: String },

    /// No endpoint was configured.
    #[error("no cluster endpoints configured")]
    NoEndpoints,
}

impl ClientError {
    /// Creates a transport error for the given endpoint.
    pub fn transport(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// True when the error indicates an address that did not resolve to a node.
    pub fn is_invalid_address(&self) -> bool {
        matches!(self, ClientError::InvalidAddress(_))
    }
}
