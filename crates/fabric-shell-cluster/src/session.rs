//! Session state populated by client callbacks.

use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use fabric_shell_client::ConnectionEventHandler;
use fabric_shell_types::{GatewayInformation, IdentityProviderMetadata};
use tracing::{debug, info};

use crate::probe::{ProbeAttempt, ProbeOutcome, ProbeState};

/// Non-empty placeholder returned from the claims callback so the client
/// skips its own token acquisition. The cluster rejects it.
pub const INVALID_CLAIMS_TOKEN: &str = "_Invalid_";

#[derive(Debug)]
pub(crate) struct SessionState {
    capture_metadata: bool,
    gateway: RwLock<Option<GatewayInformation>>,
    metadata: OnceLock<IdentityProviderMetadata>,
    probe: Mutex<Option<Arc<ProbeAttempt>>>,
}

impl SessionState {
    pub(crate) fn new(capture_metadata: bool) -> Self {
        Self {
            capture_metadata,
            gateway: RwLock::new(None),
            metadata: OnceLock::new(),
            probe: Mutex::new(None),
        }
    }

    pub(crate) fn captures_metadata(&self) -> bool {
        self.capture_metadata
    }

    pub(crate) fn gateway(&self) -> Option<GatewayInformation> {
        self.gateway
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn metadata(&self) -> Option<&IdentityProviderMetadata> {
        self.metadata.get()
    }

    /// Installs a fresh probe run, replacing any previous one.
    pub(crate) fn begin_probe(&self) -> Arc<ProbeAttempt> {
        let attempt = Arc::new(ProbeAttempt::new());
        *self.probe.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&attempt));
        attempt
    }

    pub(crate) fn probe_state(&self) -> ProbeState {
        self.probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(ProbeState::Idle, |attempt| attempt.state())
    }

    fn current_probe(&self) -> Option<Arc<ProbeAttempt>> {
        self.probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConnectionEventHandler for SessionState {
    fn on_connected(&self, gateway: GatewayInformation) {
        info!(gateway = %gateway.node_address, "connected to cluster gateway");
        *self.gateway.write().unwrap_or_else(PoisonError::into_inner) = Some(gateway);
    }

    fn on_disconnected(&self, gateway: GatewayInformation) {
        info!(gateway = %gateway.node_address, "disconnected from cluster gateway");
        *self.gateway.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn on_claims_retrieval(&self, metadata: IdentityProviderMetadata) -> Option<String> {
        if !self.capture_metadata {
            return None;
        }

        if self.metadata.set(metadata).is_err() {
            debug!("identity-provider metadata already captured");
        }
        if let Some(attempt) = self.current_probe() {
            attempt.record(ProbeOutcome::MetadataObtained);
        }

        Some(INVALID_CLAIMS_TOKEN.to_string())
    }
}
