//! Builders for credentials, client settings, and connections.

use std::sync::Arc;
use std::time::Duration;

use fabric_shell_client::{ClientResult, ClusterClient, HttpClusterClient};
use fabric_shell_types::{
    ClaimsCredentials, ClientSettings, DEFAULT_STORE_NAME, SecurityCredentials, StoreLocation,
    TransportCredentials, X509Credentials, X509FindType,
};
use tracing::debug;
use uuid::Uuid;

use crate::connection::ClusterConnection;
use crate::error::{BuildError, BuildResult};

/// Prefix of generated client friendly names.
pub const FRIENDLY_NAME_PREFIX: &str = "FabricShell";

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransportCredentialsBuilder {
    remote_spn: Option<String>,
}

impl TransportCredentialsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote_spn(mut self, spn: impl Into<String>) -> Self {
        self.remote_spn = Some(spn.into());
        self
    }

    pub fn build(self) -> SecurityCredentials {
        SecurityCredentials::Transport(TransportCredentials {
            remote_spn: self.remote_spn.unwrap_or_default(),
        })
    }
}

/// Builds certificate credentials.
///
/// The store location defaults to `LocalMachine` and the store name to `My`.
#[derive(Debug, Clone)]
pub struct X509CredentialsBuilder {
    find_type: X509FindType,
    find_value: String,
    remote_cert_thumbprints: Vec<String>,
    remote_common_names: Vec<String>,
    store_location: Option<StoreLocation>,
    store_name: Option<String>,
}

impl X509CredentialsBuilder {
    /// Fails for find types that cannot select a client certificate.
    pub fn new(find_type: X509FindType, find_value: impl Into<String>) -> BuildResult<Self> {
        if !find_type.is_supported_for_connection() {
            return Err(BuildError::InvalidFindType(find_type));
        }

        Ok(Self {
            find_type,
            find_value: find_value.into(),
            remote_cert_thumbprints: Vec::new(),
            remote_common_names: Vec::new(),
            store_location: None,
            store_name: None,
        })
    }

    pub fn remote_cert_thumbprints(mut self, thumbprints: Vec<String>) -> Self {
        self.remote_cert_thumbprints = thumbprints;
        self
    }

    pub fn remote_common_names(mut self, names: Vec<String>) -> Self {
        self.remote_common_names = names;
        self
    }

    pub fn store_location(mut self, location: StoreLocation) -> Self {
        self.store_location = Some(location);
        self
    }

    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    pub fn build(self) -> SecurityCredentials {
        SecurityCredentials::X509(X509Credentials {
            remote_cert_thumbprints: self.remote_cert_thumbprints,
            remote_common_names: self.remote_common_names,
            find_type: self.find_type,
            find_value: self.find_value,
            store_location: self.store_location.unwrap_or_default(),
            store_name: self
                .store_name
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
        })
    }
}

/// Supplies a claims token from somewhere other than the cluster handshake,
/// such as a directory-service proxy.
pub trait TokenProvider {
    fn fetch_token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Result<String, Box<dyn std::error::Error + Send + Sync>>,
{
    fn fetch_token(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self()
    }
}

#[derive(Default)]
pub struct ClaimsCredentialsBuilder {
    server_common_names: Vec<String>,
    server_thumbprints: Vec<String>,
    token: Option<String>,
    provider: Option<Box<dyn TokenProvider>>,
}

impl ClaimsCredentialsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_common_names(mut self, names: Vec<String>) -> Self {
        self.server_common_names = names;
        self
    }

    pub fn server_thumbprints(mut self, thumbprints: Vec<String>) -> Self {
        self.server_thumbprints = thumbprints;
        self
    }

    /// Presents `token` directly. Takes precedence over a token provider.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Without a token or provider the credentials carry no local claims and
    /// the cluster must be asked for identity-provider metadata.
    pub fn build(self) -> BuildResult<SecurityCredentials> {
        let local_claims = match (self.token, self.provider) {
            (Some(token), _) => Some(token),
            (None, Some(provider)) => Some(
                provider
                    .fetch_token()
                    .map_err(|e| BuildError::TokenProvider(e.to_string()))?,
            ),
            (None, None) => None,
        };

        Ok(SecurityCredentials::Claims(ClaimsCredentials {
            local_claims: local_claims.filter(|token| !token.is_empty()),
            server_common_names: self.server_common_names,
            server_thumbprints: self.server_thumbprints,
        }))
    }
}

impl std::fmt::Debug for ClaimsCredentialsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsCredentialsBuilder")
            .field("server_common_names", &self.server_common_names)
            .field("server_thumbprints", &self.server_thumbprints)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

// ============================================================================
// Client Settings
// ============================================================================

/// Overrides for [`ClientSettings`]. Options left unset keep their defaults.
///
/// Intervals are given in seconds.
#[derive(Debug, Clone, Default)]
pub struct ClientSettingsBuilder {
    pub connection_initialization_timeout: Option<f64>,
    pub health_operation_timeout: Option<f64>,
    pub health_report_send_interval: Option<f64>,
    pub keep_alive_interval: Option<f64>,
    pub service_change_poll_interval: Option<f64>,
    pub partition_location_cache_limit: Option<i64>,
    pub health_report_retry_send_interval: Option<f64>,
    pub auth_token_buffer_size: Option<i64>,
}

impl ClientSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&self) -> BuildResult<ClientSettings> {
        let mut settings = ClientSettings::default();

        override_secs(
            &mut settings.connection_initialization_timeout,
            self.connection_initialization_timeout,
            "connection_initialization_timeout",
        )?;
        override_secs(
            &mut settings.health_operation_timeout,
            self.health_operation_timeout,
            "health_operation_timeout",
        )?;
        override_secs(
            &mut settings.health_report_send_interval,
            self.health_report_send_interval,
            "health_report_send_interval",
        )?;
        override_secs(
            &mut settings.keep_alive_interval,
            self.keep_alive_interval,
            "keep_alive_interval",
        )?;
        override_secs(
            &mut settings.service_change_poll_interval,
            self.service_change_poll_interval,
            "service_change_poll_interval",
        )?;
        override_secs(
            &mut settings.health_report_retry_send_interval,
            self.health_report_retry_send_interval,
            "health_report_retry_send_interval",
        )?;
        override_count(
            &mut settings.partition_location_cache_limit,
            self.partition_location_cache_limit,
            "partition_location_cache_limit",
        )?;
        override_count(
            &mut settings.auth_token_buffer_size,
            self.auth_token_buffer_size,
            "auth_token_buffer_size",
        )?;

        settings.client_friendly_name = format!("{FRIENDLY_NAME_PREFIX}-{}", Uuid::new_v4());
        Ok(settings)
    }
}

fn override_secs(slot: &mut Duration, secs: Option<f64>, name: &'static str) -> BuildResult<()> {
    if let Some(secs) = secs {
        *slot = Duration::try_from_secs_f64(secs).map_err(|e| BuildError::InvalidSetting {
            name,
            reason: format!("{secs} seconds: {e}"),
        })?;
    }
    Ok(())
}

fn override_count(slot: &mut i64, value: Option<i64>, name: &'static str) -> BuildResult<()> {
    if let Some(value) = value {
        if value < 0 {
            return Err(BuildError::InvalidSetting {
                name,
                reason: format!("{value} is negative"),
            });
        }
        *slot = value;
    }
    Ok(())
}

// ============================================================================
// Connection
// ============================================================================

/// Assembles a [`ClusterConnection`] from endpoints, credentials, and settings.
#[derive(Debug, Clone, Default)]
pub struct ConnectionBuilder {
    endpoints: Vec<String>,
    credentials: SecurityCredentials,
    settings: ClientSettings,
    get_metadata: bool,
}

impl ConnectionBuilder {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    pub fn credentials(mut self, credentials: SecurityCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Capture identity-provider metadata from claims handshakes.
    pub fn get_metadata(mut self, enabled: bool) -> Self {
        self.get_metadata = enabled;
        self
    }

    /// Builds the connection around a client created by `factory`.
    pub fn build_with<C, F>(self, factory: F) -> BuildResult<ClusterConnection<C>>
    where
        C: ClusterClient,
        F: FnOnce(&[String], &SecurityCredentials, &ClientSettings) -> ClientResult<C>,
    {
        let client = factory(&self.endpoints, &self.credentials, &self.settings)?;
        debug!(
            endpoints = self.endpoints.len(),
            credential = %self.credentials.kind(),
            get_metadata = self.get_metadata,
            "cluster connection built"
        );

        Ok(ClusterConnection::new(
            Arc::new(client),
            self.endpoints,
            self.credentials,
            self.settings,
            self.get_metadata,
        ))
    }

    /// Builds the connection over the cluster's HTTP gateway.
    pub fn build_http(self) -> BuildResult<ClusterConnection<HttpClusterClient>> {
        self.build_with(|endpoints, credentials, settings| {
            HttpClusterClient::new(endpoints, credentials.clone(), settings)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_shell_client::{ClientError, MockClusterClient};
    use fabric_shell_types::CredentialKind;
    use test_case::test_case;

    #[test]
    fn transport_defaults_to_empty_spn() {
        assert_eq!(
            TransportCredentialsBuilder::new().build(),
            SecurityCredentials::Transport(TransportCredentials::default())
        );
    }

    #[test]
    fn x509_defaults_store() {
        let creds = X509CredentialsBuilder::new(X509FindType::FindByThumbprint, "ab12")
            .unwrap()
            .build();

        let SecurityCredentials::X509(x509) = creds else {
            panic!("expected x509 credentials");
        };
        assert_eq!(x509.store_location, StoreLocation::LocalMachine);
        assert_eq!(x509.store_name, "My");
        assert_eq!(x509.find_value, "ab12");
    }

    #[test_case(X509FindType::FindByIssuerName ; "issuer name")]
    #[test_case(X509FindType::FindBySerialNumber ; "serial number")]
    #[test_case(X509FindType::FindByKeyUsage ; "key usage")]
    fn x509_rejects_unsupported_find_type(find_type: X509FindType) {
        let err = X509CredentialsBuilder::new(find_type, "value").unwrap_err();
        assert!(matches!(err, BuildError::InvalidFindType(t) if t == find_type));
    }

    #[test]
    fn claims_without_token_requires_metadata() {
        let creds = ClaimsCredentialsBuilder::new()
            .server_common_names(vec!["cluster.example".to_string()])
            .build()
            .unwrap();
        assert!(creds.requires_metadata());
    }

    #[test]
    fn claims_token_provider_supplies_local_claims() {
        let creds = ClaimsCredentialsBuilder::new()
            .token_provider(|| Ok::<_, Box<dyn std::error::Error + Send + Sync>>("from-proxy".to_string()))
            .build()
            .unwrap();

        assert_eq!(creds.kind(), CredentialKind::Claims);
        assert!(!creds.requires_metadata());
    }

    #[test]
    fn claims_token_provider_failure_is_reported() {
        let err = ClaimsCredentialsBuilder::new()
            .token_provider(|| Err::<String, Box<dyn std::error::Error + Send + Sync>>("proxy down".into()))
            .build()
            .unwrap_err();

        assert!(matches!(err, BuildError::TokenProvider(msg) if msg == "proxy down"));
    }

    #[test]
    fn settings_only_override_given_options() {
        let settings = ClientSettingsBuilder {
            health_operation_timeout: Some(30.5),
            auth_token_buffer_size: Some(8192),
            ..Default::default()
        }
        .build()
        .unwrap();

        let defaults = ClientSettings::default();
        assert_eq!(settings.health_operation_timeout, Duration::from_millis(30_500));
        assert_eq!(settings.auth_token_buffer_size, 8192);
        assert_eq!(
            settings.connection_initialization_timeout,
            defaults.connection_initialization_timeout
        );
        assert!(settings.client_friendly_name.starts_with("FabricShell-"));
    }

    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn settings_reject_invalid_seconds(secs: f64) {
        let err = ClientSettingsBuilder {
            keep_alive_interval: Some(secs),
            ..Default::default()
        }
        .build()
        .unwrap_err();

        assert!(matches!(
            err,
            BuildError::InvalidSetting { name: "keep_alive_interval", .. }
        ));
    }

    #[test]
    fn friendly_names_are_unique() {
        let a = ClientSettingsBuilder::new().build().unwrap();
        let b = ClientSettingsBuilder::new().build().unwrap();
        assert_ne!(a.client_friendly_name, b.client_friendly_name);
    }

    #[test]
    fn connection_builder_passes_configuration_to_factory() {
        let connection = ConnectionBuilder::new(vec!["http://node-0:19080".to_string()])
            .credentials(ClaimsCredentialsBuilder::new().build().unwrap())
            .get_metadata(true)
            .build_with(|endpoints, credentials, _| {
                assert_eq!(endpoints, ["http://node-0:19080".to_string()]);
                assert_eq!(credentials.kind(), CredentialKind::Claims);
                Ok(MockClusterClient::new())
            })
            .unwrap();

        assert_eq!(connection.endpoints(), ["http://node-0:19080".to_string()]);
        assert!(connection.captures_metadata());
    }

    #[test]
    fn connection_builder_surfaces_client_errors() {
        let err = ConnectionBuilder::new(Vec::new())
            .build_http()
            .unwrap_err();
        assert!(matches!(err, BuildError::Client(ClientError::NoEndpoints)));
    }
}
