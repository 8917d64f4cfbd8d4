//! Scripted in-memory cluster client for tests.
//!
//! The mock plays back a [`ProbeScript`] for every `name_exists` call,
//! serves a canned node list, and records every call so tests can verify
//! what a connection forwarded.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fabric_shell_types::{FabricName, GatewayInformation, IdentityProviderMetadata, NodeInfo};

use crate::client::ClusterClient;
use crate::error::{ClientError, ClientResult};
use crate::events::{ConnectionEventHandler, EventHandlerSlot};

/// One step of a scripted `name_exists` call.
#[derive(Debug, Clone)]
pub enum ProbeStep {
    /// Wait on the tokio clock.
    Sleep(Duration),
    /// Surface identity-provider metadata through the claims callback.
    Claims(IdentityProviderMetadata),
    /// Fire the connected callback.
    Connect(GatewayInformation),
    /// Finish the call with an error.
    Fail(ClientError),
    /// Finish the call with a result.
    Return(bool),
    /// Never finish.
    Hang,
}

/// Sequence of steps replayed on every `name_exists` call.
///
/// A script that runs out of steps returns `Ok(false)`.
#[derive(Debug, Clone, Default)]
pub struct ProbeScript {
    steps: Vec<ProbeStep>,
}

impl ProbeScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(ProbeStep::Sleep(duration));
        self
    }

    pub fn claims(mut self, metadata: IdentityProviderMetadata) -> Self {
        self.steps.push(ProbeStep::Claims(metadata));
        self
    }

    pub fn connect(mut self, gateway: GatewayInformation) -> Self {
        self.steps.push(ProbeStep::Connect(gateway));
        self
    }

    pub fn fail(mut self, error: ClientError) -> Self {
        self.steps.push(ProbeStep::Fail(error));
        self
    }

    pub fn returns(mut self, exists: bool) -> Self {
        self.steps.push(ProbeStep::Return(exists));
        self
    }

    pub fn hang(mut self) -> Self {
        self.steps.push(ProbeStep::Hang);
        self
    }
}

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    NameExists {
        name: FabricName,
        timeout: Duration,
    },
    GetNodeList {
        node_name_filter: Option<String>,
    },
    RestartNode {
        node_name: String,
        instance_id: Option<u64>,
    },
}

/// In-memory [`ClusterClient`].
#[derive(Debug, Default)]
pub struct MockClusterClient {
    events: EventHandlerSlot,
    probe: ProbeScript,
    nodes: Vec<NodeInfo>,
    node_list_error: Option<ClientError>,
    restart_error: Option<ClientError>,
    calls: Mutex<Vec<MockCall>>,
    claims_tokens: Mutex<Vec<Option<String>>>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(mut self, script: ProbeScript) -> Self {
        self.probe = script;
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<NodeInfo>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_node_list_error(mut self, error: ClientError) -> Self {
        self.node_list_error = Some(error);
        self
    }

    pub fn with_restart_error(mut self, error: ClientError) -> Self {
        self.restart_error = Some(error);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tokens returned by the claims callback, one entry per `Claims` step.
    pub fn claims_tokens(&self) -> Vec<Option<String>> {
        self.claims_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fires the connected callback as if the client bound to `gateway`.
    pub fn emit_connected(&self, gateway: GatewayInformation) {
        self.events.connected(gateway);
    }

    /// Fires the disconnected callback as if the client lost `gateway`.
    pub fn emit_disconnected(&self, gateway: GatewayInformation) {
        self.events.disconnected(gateway);
    }

    fn record(&self, call: MockCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl ClusterClient for MockClusterClient {
    fn set_event_handler(&self, handler: Arc<dyn ConnectionEventHandler>) {
        self.events.set(handler);
    }

    async fn name_exists(&self, name: &FabricName, timeout: Duration) -> ClientResult<bool> {
        self.record(MockCall::NameExists {
            name: name.clone(),
            timeout,
        });

        for step in self.probe.steps.clone() {
            match step {
                ProbeStep::Sleep(duration) => tokio::time::sleep(duration).await,
                ProbeStep::Claims(metadata) => {
                    let token = self.events.claims_retrieval(metadata);
                    self.claims_tokens
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(token);
                }
                ProbeStep::Connect(gateway) => self.events.connected(gateway),
                ProbeStep::Fail(error) => return Err(error),
                ProbeStep::Return(exists) => return Ok(exists),
                ProbeStep::Hang => std::future::pending::<()>().await,
            }
        }

        Ok(false)
    }

    async fn get_node_list(
        &self,
        node_name_filter: Option<&str>,
        _timeout: Duration,
    ) -> ClientResult<Vec<NodeInfo>> {
        self.record(MockCall::GetNodeList {
            node_name_filter: node_name_filter.map(str::to_string),
        });

        if let Some(error) = &self.node_list_error {
            return Err(error.clone());
        }

        Ok(self
            .nodes
            .iter()
            .filter(|node| node_name_filter.is_none_or(|name| node.name == name))
            .cloned()
            .collect())
    }

    async fn restart_node(
        &self,
        node_name: &str,
        instance_id: Option<u64>,
        _timeout: Duration,
    ) -> ClientResult<()> {
        self.record(MockCall::RestartNode {
            node_name: node_name.to_string(),
            instance_id,
        });

        match &self.restart_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_shell_types::{HealthState, NodeStatus};

    fn node(name: &str) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            address: "10.0.0.4".to_string(),
            id: format!("id-{name}"),
            instance_id: 1,
            status: NodeStatus::Up,
            health_state: HealthState::Ok,
            is_seed_node: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn script_runs_in_order() {
        let client = MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(Duration::from_secs(1))
                .fail(ClientError::NameNotFound),
        );

        let started = tokio::time::Instant::now();
        let result = client
            .name_exists(&FabricName::probe_placeholder(), Duration::from_secs(5))
            .await;

        assert_eq!(result, Err(ClientError::NameNotFound));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(
            client.calls(),
            vec![MockCall::NameExists {
                name: FabricName::probe_placeholder(),
                timeout: Duration::from_secs(5),
            }]
        );
    }

    #[tokio::test]
    async fn empty_script_reports_missing_name() {
        let client = MockClusterClient::new();
        let exists = client
            .name_exists(&FabricName::probe_placeholder(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn node_list_honors_filter() {
        let client = MockClusterClient::new().with_nodes(vec![node("a"), node("b")]);

        let all = client.get_node_list(None, Duration::from_secs(1)).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = client
            .get_node_list(Some("b"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(filtered, vec![node("b")]);
    }

    #[tokio::test]
    async fn claims_step_without_handler_records_no_token() {
        let client = MockClusterClient::new().with_probe(
            ProbeScript::new().claims(IdentityProviderMetadata::default()),
        );
        client
            .name_exists(&FabricName::probe_placeholder(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(client.claims_tokens(), vec![None]);
    }
}
