//! Builder error types

use fabric_shell_types::X509FindType;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Certificate find type {0:?} cannot identify a cluster client certificate; use FindByThumbprint or FindBySubjectName")]
    InvalidFindType(X509FindType),

    #[error("Invalid client setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Token provider failed: {0}")]
    TokenProvider(String),

    #[error("Failed to create cluster client: {0}")]
    Client(#[from] fabric_shell_client::ClientError),
}
