//! Cluster client seam for fabric-shell.
//!
//! A [`ClusterClient`] is the collaborator every connection delegates to:
//! - [`HttpClusterClient`] talks to the cluster's HTTP gateway
//! - `MockClusterClient` (feature `mock`) replays scripted behavior for tests
//!
//! Clients report connection lifecycle and claims handshakes through a
//! registered [`ConnectionEventHandler`].

pub mod client;
pub mod error;
pub mod events;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::ClusterClient;
pub use error::{ClientError, ClientResult};
pub use events::{ConnectionEventHandler, EventHandlerSlot};
pub use http::HttpClusterClient;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockClusterClient, ProbeScript, ProbeStep};
