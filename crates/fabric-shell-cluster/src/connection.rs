//! A logical session to a cluster.

use std::sync::Arc;
use std::time::Duration;

use fabric_shell_client::{ClientResult, ClusterClient};
use fabric_shell_types::{
    ClientSettings, FabricName, GatewayInformation, IdentityProviderMetadata, NodeInfo,
    SecurityCredentials,
};
use tracing::{debug, instrument, warn};

use crate::probe::{ProbeOutcome, ProbeState};
use crate::session::SessionState;
use crate::validate::validate_node_name_on_failure;

/// Timeout applied to forwarded operations when the caller does not give one.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection to a cluster through a [`ClusterClient`].
///
/// The connection registers itself as the client's event handler, so
/// gateway information tracks connect/disconnect transitions and, when
/// constructed with `get_metadata`, claims handshakes capture the cluster's
/// identity-provider metadata.
pub struct ClusterConnection<C: ClusterClient> {
    client: Arc<C>,
    endpoints: Vec<String>,
    credentials: SecurityCredentials,
    settings: ClientSettings,
    session: Arc<SessionState>,
}

impl<C: ClusterClient> ClusterConnection<C> {
    pub fn new(
        client: Arc<C>,
        endpoints: Vec<String>,
        credentials: SecurityCredentials,
        settings: ClientSettings,
        get_metadata: bool,
    ) -> Self {
        let session = Arc::new(SessionState::new(get_metadata));
        client.set_event_handler(session.clone());

        Self {
            client,
            endpoints,
            credentials,
            settings,
            session,
        }
    }

    /// Asks the cluster how to obtain a claims token, waiting at most `timeout`.
    ///
    /// A placeholder name lookup runs in the background with half of
    /// `timeout`. It is expected to be rejected, but the handshake it starts
    /// surfaces identity-provider metadata through the claims callback.
    /// The lookup is not cancelled when the wait gives up.
    ///
    /// Returns the lookup's error only when it failed and no metadata was
    /// captured. Returning `Ok` with no metadata means none was available in
    /// time.
    #[instrument(skip(self), fields(credential = %self.credentials.kind()))]
    pub async fn initialize_metadata_probe(&self, timeout: Duration) -> ClientResult<()> {
        let attempt = self.session.begin_probe();
        let inner = timeout / 2;

        let client = Arc::clone(&self.client);
        let background = Arc::clone(&attempt);
        tokio::spawn(async move {
            match client
                .name_exists(&FabricName::probe_placeholder(), inner)
                .await
            {
                Ok(exists) => debug!(exists, "metadata probe lookup finished"),
                Err(err) => {
                    if !background.record(ProbeOutcome::Failed(err.clone())) {
                        warn!(error = %err, "metadata probe lookup failed after completion");
                    }
                }
            }
        });

        let signalled = attempt.signal().wait(timeout).await;
        attempt.finish();
        debug!(signalled, "metadata probe wait returned");

        if self.session.metadata().is_some() {
            return Ok(());
        }
        match attempt.outcome() {
            Some(ProbeOutcome::Failed(err)) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    /// The gateway the client is currently bound to.
    pub fn gateway_information(&self) -> Option<GatewayInformation> {
        self.session.gateway()
    }

    pub fn identity_provider_metadata(&self) -> Option<&IdentityProviderMetadata> {
        self.session.metadata()
    }

    /// State of the most recent metadata probe.
    pub fn probe_state(&self) -> ProbeState {
        self.session.probe_state()
    }

    pub fn captures_metadata(&self) -> bool {
        self.session.captures_metadata()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn credentials(&self) -> &SecurityCredentials {
        &self.credentials
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub async fn name_exists(
        &self,
        name: &FabricName,
        timeout: Option<Duration>,
    ) -> ClientResult<bool> {
        self.client
            .name_exists(name, timeout.unwrap_or(DEFAULT_OPERATION_TIMEOUT))
            .await
    }

    pub async fn get_node_list(
        &self,
        node_name_filter: Option<&str>,
        timeout: Option<Duration>,
    ) -> ClientResult<Vec<NodeInfo>> {
        self.client
            .get_node_list(node_name_filter, timeout.unwrap_or(DEFAULT_OPERATION_TIMEOUT))
            .await
    }

    /// Restarts a node, explaining address failures by looking the node up.
    pub async fn restart_node(
        &self,
        node_name: &str,
        instance_id: Option<u64>,
        timeout: Option<Duration>,
    ) -> ClientResult<()> {
        let timeout = timeout.unwrap_or(DEFAULT_OPERATION_TIMEOUT);
        validate_node_name_on_failure(node_name, self.client.as_ref(), timeout, || {
            self.client.restart_node(node_name, instance_id, timeout)
        })
        .await
    }
}

impl<C: ClusterClient> std::fmt::Debug for ClusterConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("endpoints", &self.endpoints)
            .field("credentials", &self.credentials.kind())
            .field("gateway", &self.session.gateway())
            .field("probe_state", &self.session.probe_state())
            .finish_non_exhaustive()
    }
}
