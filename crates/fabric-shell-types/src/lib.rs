//! # fabric-shell-types: Core types for `fabric-shell`
//!
//! This crate contains shared types used across the `fabric-shell` system:
//! - Cluster names ([`FabricName`])
//! - Credential descriptors ([`SecurityCredentials`], [`CredentialKind`])
//! - Session-derived state ([`GatewayInformation`], [`IdentityProviderMetadata`])
//! - Client tuning ([`ClientSettings`])
//! - Node descriptors ([`NodeInfo`], [`NodeStatus`], [`HealthState`])

use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Cluster Names
// ============================================================================

/// URI scheme every cluster name carries.
pub const FABRIC_SCHEME: &str = "fabric:/";

/// Name looked up by the metadata probe. It is never expected to exist.
const PROBE_PLACEHOLDER: &str = "fabric:/DummyUri";

/// Errors produced when parsing a [`FabricName`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name '{0}' does not use the fabric:/ scheme")]
    MissingScheme(String),

    #[error("name '{0}' has an empty path")]
    EmptyPath(String),
}

/// A validated cluster name such as `fabric:/MyApp/MyService`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FabricName(String);

impl FabricName {
    /// Parses a cluster name, requiring the `fabric:/` scheme and a non-empty path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fabric_shell_types::FabricName;
    /// let name = FabricName::parse("fabric:/App/Svc").unwrap();
    /// assert_eq!(name.path(), "App/Svc");
    /// assert!(FabricName::parse("http://App").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let Some(path) = raw.strip_prefix(FABRIC_SCHEME) else {
            return Err(NameError::MissingScheme(raw.to_string()));
        };
        if path.trim_matches('/').is_empty() {
            return Err(NameError::EmptyPath(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// The placeholder name used for cheap existence checks.
    pub fn probe_placeholder() -> Self {
        Self(PROBE_PLACEHOLDER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part of the name after the scheme, without surrounding slashes.
    pub fn path(&self) -> &str {
        self.0[FABRIC_SCHEME.len()..].trim_matches('/')
    }
}

impl Display for FabricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FabricName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FabricName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FabricName> for String {
    fn from(name: FabricName) -> Self {
        name.0
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Default certificate store name.
pub const DEFAULT_STORE_NAME: &str = "My";

/// Discriminant of a [`SecurityCredentials`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    None,
    Transport,
    X509,
    Claims,
}

impl Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialKind::None => "none",
            CredentialKind::Transport => "transport",
            CredentialKind::X509 => "x509",
            CredentialKind::Claims => "claims",
        };
        f.write_str(s)
    }
}

/// How the client authenticates to the cluster. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SecurityCredentials {
    /// Unsecured cluster.
    #[default]
    None,
    /// Mutual trust through the operating-system identity.
    Transport(TransportCredentials),
    /// Client certificate located in a certificate store.
    X509(X509Credentials),
    /// Bearer token obtained interactively or from a directory service.
    Claims(ClaimsCredentials),
}

impl SecurityCredentials {
    pub fn kind(&self) -> CredentialKind {
        match self {
            SecurityCredentials::None => CredentialKind::None,
            SecurityCredentials::Transport(_) => CredentialKind::Transport,
            SecurityCredentials::X509(_) => CredentialKind::X509,
            SecurityCredentials::Claims(_) => CredentialKind::Claims,
        }
    }

    /// True when the cluster must be asked how to obtain a token.
    pub fn requires_metadata(&self) -> bool {
        matches!(self, SecurityCredentials::Claims(c) if c.local_claims.is_none())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportCredentials {
    /// Service principal name of the cluster; empty when unspecified.
    pub remote_spn: String,
}

/// Certificate lookup criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum X509FindType {
    FindByThumbprint,
    FindBySubjectName,
    FindBySubjectDistinguishedName,
    FindByIssuerName,
    FindByIssuerDistinguishedName,
    FindBySerialNumber,
    FindByTimeValid,
    FindByTemplateName,
    FindByExtension,
    FindByKeyUsage,
    FindBySubjectKeyIdentifier,
}

impl X509FindType {
    /// Only thumbprint and subject-name lookups identify a cluster client certificate.
    pub fn is_supported_for_connection(self) -> bool {
        matches!(
            self,
            X509FindType::FindByThumbprint | X509FindType::FindBySubjectName
        )
    }
}

impl FromStr for X509FindType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "findbythumbprint" | "thumbprint" => Ok(X509FindType::FindByThumbprint),
            "findbysubjectname" | "subjectname" => Ok(X509FindType::FindBySubjectName),
            "findbysubjectdistinguishedname" => Ok(X509FindType::FindBySubjectDistinguishedName),
            "findbyissuername" => Ok(X509FindType::FindByIssuerName),
            "findbyissuerdistinguishedname" => Ok(X509FindType::FindByIssuerDistinguishedName),
            "findbyserialnumber" => Ok(X509FindType::FindBySerialNumber),
            "findbytimevalid" => Ok(X509FindType::FindByTimeValid),
            "findbytemplatename" => Ok(X509FindType::FindByTemplateName),
            "findbyextension" => Ok(X509FindType::FindByExtension),
            "findbykeyusage" => Ok(X509FindType::FindByKeyUsage),
            "findbysubjectkeyidentifier" => Ok(X509FindType::FindBySubjectKeyIdentifier),
            _ => Err(format!("unknown certificate find type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreLocation {
    CurrentUser,
    #[default]
    LocalMachine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Credentials {
    pub remote_cert_thumbprints: Vec<String>,
    pub remote_common_names: Vec<String>,
    pub find_type: X509FindType,
    pub find_value: String,
    pub store_location: StoreLocation,
    pub store_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsCredentials {
    /// Bearer token presented to the cluster, if one is already known.
    pub local_claims: Option<String>,
    pub server_common_names: Vec<String>,
    pub server_thumbprints: Vec<String>,
}

// ============================================================================
// Session State
// ============================================================================

/// The cluster endpoint a session is currently bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInformation {
    pub node_address: String,
    pub node_id: Option<String>,
    pub node_instance_id: Option<u64>,
    pub node_name: Option<String>,
}

impl GatewayInformation {
    pub fn for_address(node_address: impl Into<String>) -> Self {
        Self {
            node_address: node_address.into(),
            node_id: None,
            node_instance_id: None,
            node_name: None,
        }
    }
}

/// Describes where and how to obtain a token for a claims-secured cluster.
///
/// Field names follow the gateway's `GetAadMetadata` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderMetadata {
    #[serde(default)]
    pub authority: String,
    #[serde(default, rename = "tenant")]
    pub tenant_id: String,
    #[serde(default, rename = "cluster")]
    pub cluster_application: String,
    #[serde(default, rename = "client")]
    pub client_application: String,
    #[serde(default, rename = "redirect")]
    pub client_redirect: String,
    #[serde(default)]
    pub login: String,
}

// ============================================================================
// Client Settings
// ============================================================================

/// Tuning knobs handed to the cluster client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub connection_initialization_timeout: Duration,
    pub health_operation_timeout: Duration,
    pub health_report_send_interval: Duration,
    pub keep_alive_interval: Duration,
    pub service_change_poll_interval: Duration,
    pub partition_location_cache_limit: i64,
    pub health_report_retry_send_interval: Duration,
    pub auth_token_buffer_size: i64,
    pub client_friendly_name: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connection_initialization_timeout: Duration::from_secs(2),
            health_operation_timeout: Duration::from_secs(120),
            health_report_send_interval: Duration::ZERO,
            keep_alive_interval: Duration::ZERO,
            service_change_poll_interval: Duration::from_secs(120),
            partition_location_cache_limit: 100_000,
            health_report_retry_send_interval: Duration::from_secs(30),
            auth_token_buffer_size: 4096,
            client_friendly_name: String::new(),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Invalid,
    Up,
    Down,
    Enabling,
    Disabling,
    Disabled,
    Unknown,
    Removed,
}

impl From<&str> for NodeStatus {
    fn from(value: &str) -> Self {
        match value {
            "Invalid" => NodeStatus::Invalid,
            "Up" => NodeStatus::Up,
            "Down" => NodeStatus::Down,
            "Enabling" => NodeStatus::Enabling,
            "Disabling" => NodeStatus::Disabling,
            "Disabled" => NodeStatus::Disabled,
            "Removed" => NodeStatus::Removed,
            _ => NodeStatus::Unknown,
        }
    }
}

impl Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    Invalid,
    Ok,
    Warning,
    Error,
    Unknown,
}

impl From<&str> for HealthState {
    fn from(value: &str) -> Self {
        match value {
            "Invalid" => HealthState::Invalid,
            "Ok" => HealthState::Ok,
            "Warning" => HealthState::Warning,
            "Error" => HealthState::Error,
            _ => HealthState::Unknown,
        }
    }
}

impl Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A cluster node as reported by a node-list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub address: String,
    pub id: String,
    pub instance_id: u64,
    pub status: NodeStatus,
    pub health_state: HealthState,
    pub is_seed_node: bool,
}
