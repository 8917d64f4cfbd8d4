//! Configuration management for fabric-shell
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (FSH__SECTION__KEY)
//! 3. fabric-shell.local.toml (gitignored, local overrides)
//! 4. fabric-shell.toml (git-tracked, project config)
//! 5. ~/.config/fabric-shell/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use fabric_shell_types::{CredentialKind, DEFAULT_STORE_NAME, StoreLocation, X509FindType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main fabric-shell configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricShellConfig {
    pub connection: ConnectionConfig,
    pub security: SecurityConfig,
    pub client: ClientConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Gateway endpoints, tried in order.
    pub endpoints: Vec<String>,
    pub operation_timeout_secs: u64,
    pub metadata_probe_timeout_secs: u64,
    /// Capture identity-provider metadata when connecting with claims.
    pub get_metadata: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:19080".to_string()],
            operation_timeout_secs: 300,
            metadata_probe_timeout_secs: 120,
            get_metadata: false,
        }
    }
}

impl ConnectionConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn metadata_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_probe_timeout_secs)
    }
}

/// Credential settings. Only the fields of the selected `mode` are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub mode: CredentialKind,

    // transport
    pub remote_spn: String,

    // x509
    pub find_type: String,
    pub find_value: String,
    pub store_location: StoreLocation,
    pub store_name: String,
    pub remote_cert_thumbprints: Vec<String>,
    pub remote_common_names: Vec<String>,

    // claims
    pub server_common_names: Vec<String>,
    pub server_thumbprints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_token: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            mode: CredentialKind::None,
            remote_spn: String::new(),
            find_type: "FindByThumbprint".to_string(),
            find_value: String::new(),
            store_location: StoreLocation::default(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            remote_cert_thumbprints: Vec::new(),
            remote_common_names: Vec::new(),
            server_common_names: Vec::new(),
            server_thumbprints: Vec::new(),
            aad_token: None,
        }
    }
}

/// Client tuning overrides in seconds. Unset values keep the client defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_initialization_timeout_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_operation_timeout_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_report_send_interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive_interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_change_poll_interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_location_cache_limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_report_retry_send_interval_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token_buffer_size: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

impl FabricShellConfig {
    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Checks settings that deserialize fine but cannot produce a working connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(problems.join("; ")))
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let connection = &self.connection;
        let security = &self.security;

        if connection.endpoints.is_empty() {
            problems.push("connection.endpoints must list at least one gateway".to_string());
        }
        if connection.endpoints.iter().any(|e| e.trim().is_empty()) {
            problems.push("connection.endpoints contains an empty entry".to_string());
        }
        if connection.operation_timeout_secs == 0 {
            problems.push("connection.operation_timeout_secs must be positive".to_string());
        }

        match security.mode {
            CredentialKind::X509 => {
                match security.find_type.parse::<X509FindType>() {
                    Ok(find_type) if !find_type.is_supported_for_connection() => problems.push(
                        format!(
                            "security.find_type {} cannot select a client certificate",
                            security.find_type
                        ),
                    ),
                    Ok(_) => {}
                    Err(e) => problems.push(format!("security.find_type: {e}")),
                }
                if security.find_value.is_empty() {
                    problems.push("security.find_value is required for x509".to_string());
                }
            }
            CredentialKind::Claims => {
                if connection.get_metadata && connection.metadata_probe_timeout_secs == 0 {
                    problems.push(
                        "connection.metadata_probe_timeout_secs must be positive to get metadata"
                            .to_string(),
                    );
                }
            }
            CredentialKind::None | CredentialKind::Transport => {}
        }

        let client = &self.client;
        for (name, secs) in [
            (
                "connection_initialization_timeout_secs",
                client.connection_initialization_timeout_secs,
            ),
            (
                "health_operation_timeout_secs",
                client.health_operation_timeout_secs,
            ),
            (
                "health_report_send_interval_secs",
                client.health_report_send_interval_secs,
            ),
            ("keep_alive_interval_secs", client.keep_alive_interval_secs),
            (
                "service_change_poll_interval_secs",
                client.service_change_poll_interval_secs,
            ),
            (
                "health_report_retry_send_interval_secs",
                client.health_report_retry_send_interval_secs,
            ),
        ] {
            if let Some(secs) = secs
                && !(secs.is_finite() && secs >= 0.0)
            {
                problems.push(format!("client.{name} must be a non-negative number"));
            }
        }
        for (name, value) in [
            (
                "partition_location_cache_limit",
                client.partition_location_cache_limit,
            ),
            ("auth_token_buffer_size", client.auth_token_buffer_size),
        ] {
            if value.is_some_and(|v| v < 0) {
                problems.push(format!("client.{name} must not be negative"));
            }
        }

        problems
    }
}
