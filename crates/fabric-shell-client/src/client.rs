//! The cluster client seam.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fabric_shell_types::{FabricName, NodeInfo};

use crate::error::ClientResult;
use crate::events::ConnectionEventHandler;

/// Operations a cluster connection delegates to.
///
/// Every operation takes its own timeout; implementations are expected to
/// honor it. Cancellation is expressed by dropping the returned future.
pub trait ClusterClient: Send + Sync + 'static {
    /// Registers the observer for connect, disconnect, and claims callbacks.
    fn set_event_handler(&self, handler: Arc<dyn ConnectionEventHandler>);

    /// Checks whether a name exists in the cluster's naming service.
    fn name_exists(
        &self,
        name: &FabricName,
        timeout: Duration,
    ) -> impl Future<Output = ClientResult<bool>> + Send;

    /// Lists cluster nodes, optionally restricted to a single node name.
    fn get_node_list(
        &self,
        node_name_filter: Option<&str>,
        timeout: Duration,
    ) -> impl Future<Output = ClientResult<Vec<NodeInfo>>> + Send;

    /// Restarts a node. `instance_id` of `None` restarts whatever instance is current.
    fn restart_node(
        &self,
        node_name: &str,
        instance_id: Option<u64>,
        timeout: Duration,
    ) -> impl Future<Output = ClientResult<()>> + Send;
}
