//! Resolves configuration plus global flags into a cluster connection.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use fabric_shell_client::HttpClusterClient;
use fabric_shell_cluster::{
    ClaimsCredentialsBuilder, ClientSettingsBuilder, ClusterConnection, ConnectionBuilder,
    TransportCredentialsBuilder, X509CredentialsBuilder,
};
use fabric_shell_config::{ClientConfig, FabricShellConfig, SecurityConfig};
use fabric_shell_types::{ClientSettings, CredentialKind, SecurityCredentials, X509FindType};
use tracing::debug;

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub project: PathBuf,
    pub endpoints: Vec<String>,
    pub timeout_sec: Option<u64>,
    pub no_color: bool,
}

/// Loads configuration for `options.project` and layers the flags on top.
pub fn load_config(options: &GlobalOptions) -> Result<FabricShellConfig> {
    let mut config = FabricShellConfig::load_from_dir(&options.project)
        .with_context(|| format!("Failed to load configuration from {}", options.project.display()))?;

    if !options.endpoints.is_empty() {
        config.connection.endpoints.clone_from(&options.endpoints);
    }
    if let Some(timeout) = options.timeout_sec {
        config.connection.operation_timeout_secs = timeout;
    }
    if options.no_color {
        config.output.no_color = true;
    }

    Ok(config)
}

pub struct ShellContext {
    pub config: FabricShellConfig,
}

impl ShellContext {
    pub fn new(config: FabricShellConfig) -> Self {
        Self { config }
    }

    pub fn operation_timeout(&self) -> Duration {
        self.config.connection.operation_timeout()
    }

    /// Builds a connection over the HTTP gateway.
    ///
    /// `aad_token` replaces any token from configuration.
    pub fn connect(
        &self,
        get_metadata: bool,
        aad_token: Option<String>,
    ) -> Result<ClusterConnection<HttpClusterClient>> {
        self.config
            .validate()
            .context("Configuration is not usable")?;

        let credentials = credentials_from_config(&self.config.security, aad_token)?;
        let settings = settings_from_config(&self.config.client)?;
        debug!(
            endpoints = ?self.config.connection.endpoints,
            credential = %credentials.kind(),
            "building cluster connection"
        );

        ConnectionBuilder::new(self.config.connection.endpoints.clone())
            .credentials(credentials)
            .settings(settings)
            .get_metadata(get_metadata)
            .build_http()
            .context("Failed to create cluster connection")
    }
}

pub fn credentials_from_config(
    security: &SecurityConfig,
    aad_token: Option<String>,
) -> Result<SecurityCredentials> {
    let credentials = match security.mode {
        CredentialKind::None => SecurityCredentials::None,
        CredentialKind::Transport => TransportCredentialsBuilder::new()
            .remote_spn(&security.remote_spn)
            .build(),
        CredentialKind::X509 => {
            let find_type: X509FindType = security
                .find_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            X509CredentialsBuilder::new(find_type, &security.find_value)?
                .remote_cert_thumbprints(security.remote_cert_thumbprints.clone())
                .remote_common_names(security.remote_common_names.clone())
                .store_location(security.store_location)
                .store_name(&security.store_name)
                .build()
        }
        CredentialKind::Claims => {
            let mut builder = ClaimsCredentialsBuilder::new()
                .server_common_names(security.server_common_names.clone())
                .server_thumbprints(security.server_thumbprints.clone());
            if let Some(token) = aad_token.or_else(|| security.aad_token.clone()) {
                builder = builder.token(token);
            }
            builder.build()?
        }
    };

    Ok(credentials)
}

pub fn settings_from_config(client: &ClientConfig) -> Result<ClientSettings> {
    let builder = ClientSettingsBuilder {
        connection_initialization_timeout: client.connection_initialization_timeout_secs,
        health_operation_timeout: client.health_operation_timeout_secs,
        health_report_send_interval: client.health_report_send_interval_secs,
        keep_alive_interval: client.keep_alive_interval_secs,
        service_change_poll_interval: client.service_change_poll_interval_secs,
        partition_location_cache_limit: client.partition_location_cache_limit,
        health_report_retry_send_interval: client.health_report_retry_send_interval_secs,
        auth_token_buffer_size: client.auth_token_buffer_size,
    };

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_shell_types::StoreLocation;

    #[test]
    fn claims_flag_token_overrides_config() {
        let security = SecurityConfig {
            mode: CredentialKind::Claims,
            aad_token: Some("from-config".to_string()),
            ..Default::default()
        };

        let SecurityCredentials::Claims(claims) =
            credentials_from_config(&security, Some("from-flag".to_string())).unwrap()
        else {
            panic!("expected claims credentials");
        };
        assert_eq!(claims.local_claims.as_deref(), Some("from-flag"));
    }

    #[test]
    fn claims_without_token_requires_metadata() {
        let security = SecurityConfig {
            mode: CredentialKind::Claims,
            ..Default::default()
        };
        assert!(
            credentials_from_config(&security, None)
                .unwrap()
                .requires_metadata()
        );
    }

    #[test]
    fn x509_uses_configured_store() {
        let security = SecurityConfig {
            mode: CredentialKind::X509,
            find_type: "FindBySubjectName".to_string(),
            find_value: "CN=client".to_string(),
            store_location: StoreLocation::CurrentUser,
            ..Default::default()
        };

        let SecurityCredentials::X509(x509) = credentials_from_config(&security, None).unwrap()
        else {
            panic!("expected x509 credentials");
        };
        assert_eq!(x509.find_type, X509FindType::FindBySubjectName);
        assert_eq!(x509.store_location, StoreLocation::CurrentUser);
        assert_eq!(x509.store_name, "My");
    }

    #[test]
    fn flags_override_loaded_config() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("fabric-shell.toml"),
            "[connection]\nendpoints = [\"http://from-file:19080\"]\n",
        )
        .unwrap();

        let config = load_config(&GlobalOptions {
            project: temp.path().to_path_buf(),
            endpoints: vec!["http://from-flag:19080".to_string()],
            timeout_sec: Some(12),
            no_color: true,
        })
        .unwrap();

        assert_eq!(config.connection.endpoints, vec!["http://from-flag:19080"]);
        assert_eq!(config.connection.operation_timeout_secs, 12);
        assert!(config.output.no_color);
    }

    #[test]
    fn settings_pass_overrides_through() {
        let settings = settings_from_config(&ClientConfig {
            health_operation_timeout_secs: Some(10.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.health_operation_timeout, Duration::from_secs(10));
    }
}
