//! Connection event observer.

use std::sync::{Arc, PoisonError, RwLock};

use fabric_shell_types::{GatewayInformation, IdentityProviderMetadata};

/// Receives connection lifecycle callbacks from a [`crate::ClusterClient`].
///
/// Callbacks run on whatever task drives the client, so implementations
/// must not block.
pub trait ConnectionEventHandler: Send + Sync {
    /// The client bound to a gateway.
    fn on_connected(&self, gateway: GatewayInformation) {
        let _ = gateway;
    }

    /// The client lost its gateway.
    fn on_disconnected(&self, gateway: GatewayInformation) {
        let _ = gateway;
    }

    /// The cluster requires a claims token and advertised how to get one.
    ///
    /// The returned string is presented as the bearer token. `None` means
    /// no token is available and the request fails as unauthorized.
    fn on_claims_retrieval(&self, metadata: IdentityProviderMetadata) -> Option<String> {
        let _ = metadata;
        None
    }
}

/// Holds the handler registered with a client and dispatches to it.
#[derive(Default)]
pub struct EventHandlerSlot {
    handler: RwLock<Option<Arc<dyn ConnectionEventHandler>>>,
}

impl EventHandlerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registered handler.
    pub fn set(&self, handler: Arc<dyn ConnectionEventHandler>) {
        *self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    pub fn is_registered(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // Cloned out so no lock is held while the callback runs.
    fn current(&self) -> Option<Arc<dyn ConnectionEventHandler>> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn connected(&self, gateway: GatewayInformation) {
        if let Some(handler) = self.current() {
            handler.on_connected(gateway);
        }
    }

    pub fn disconnected(&self, gateway: GatewayInformation) {
        if let Some(handler) = self.current() {
            handler.on_disconnected(gateway);
        }
    }

    pub fn claims_retrieval(&self, metadata: IdentityProviderMetadata) -> Option<String> {
        self.current()
            .and_then(|handler| handler.on_claims_retrieval(metadata))
    }
}

impl std::fmt::Debug for EventHandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlerSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}
