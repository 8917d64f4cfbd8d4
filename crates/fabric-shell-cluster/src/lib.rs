//! # fabric-shell-cluster
//!
//! Cluster connection for fabric-shell.
//!
//! A [`ClusterConnection`] owns a [`ClusterClient`](fabric_shell_client::ClusterClient),
//! the endpoints, credentials, and settings it was built from, and the
//! session state the client reports back: the bound gateway and, for
//! claims-secured clusters, the identity-provider metadata.
//!
//! # Metadata probe
//!
//! [`ClusterConnection::initialize_metadata_probe`] starts a throwaway name
//! lookup in the background and waits on a [`CompletionSignal`] for the
//! first of two events:
//!
//! - the claims callback delivers identity-provider metadata, or
//! - the lookup fails.
//!
//! The wait never outlasts the caller's timeout. The lookup is left running
//! when the wait gives up, and anything it reports afterwards is dropped.
//!
//! ```ignore
//! let connection = ConnectionBuilder::new(endpoints)
//!     .credentials(ClaimsCredentialsBuilder::new().build()?)
//!     .get_metadata(true)
//!     .build_http()?;
//!
//! connection.initialize_metadata_probe(Duration::from_secs(10)).await?;
//! if let Some(metadata) = connection.identity_provider_metadata() {
//!     println!("sign in at {}", metadata.authority);
//! }
//! ```

mod builders;
mod connection;
mod error;
mod probe;
mod session;
mod signal;
mod validate;

pub use builders::{
    ClaimsCredentialsBuilder, ClientSettingsBuilder, ConnectionBuilder, FRIENDLY_NAME_PREFIX,
    TokenProvider, TransportCredentialsBuilder, X509CredentialsBuilder,
};
pub use connection::{ClusterConnection, DEFAULT_OPERATION_TIMEOUT};
pub use error::{BuildError, BuildResult};
pub use probe::{ProbeOutcome, ProbeState};
pub use session::INVALID_CLAIMS_TOKEN;
pub use signal::CompletionSignal;
pub use validate::validate_node_name_on_failure;
