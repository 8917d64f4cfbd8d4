//! Cluster client backed by the cluster's HTTP gateway.
//!
//! Endpoints are tried in order. The first one that answers becomes the
//! bound gateway and stays bound until a request to it fails at the
//! transport level, at which point the next endpoint is tried.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use fabric_shell_types::{
    ClientSettings, FabricName, GatewayInformation, HealthState, IdentityProviderMetadata,
    NodeInfo, NodeStatus, SecurityCredentials,
};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::client::ClusterClient;
use crate::error::{ClientError, ClientResult};
use crate::events::{ConnectionEventHandler, EventHandlerSlot};

const API_VERSION: (&str, &str) = ("api-version", "6.0");
const METADATA_API_VERSION: (&str, &str) = ("api-version", "1.0");

/// Gateway error codes with a dedicated [`ClientError`] variant.
const NAME_DOES_NOT_EXIST: &str = "FABRIC_E_NAME_DOES_NOT_EXIST";
const INVALID_ADDRESS: &str = "FABRIC_E_INVALID_ADDRESS";
const NODE_NOT_FOUND: &str = "FABRIC_E_NODE_NOT_FOUND";

/// HTTP gateway client.
pub struct HttpClusterClient {
    http: reqwest::Client,
    endpoints: Vec<Url>,
    credentials: SecurityCredentials,
    events: EventHandlerSlot,
    /// Index into `endpoints` of the bound gateway.
    bound: Mutex<Option<usize>>,
    /// Token obtained through the claims callback.
    retrieved_token: Mutex<Option<String>>,
}

impl HttpClusterClient {
    /// Creates a client for the given gateway endpoints.
    ///
    /// Endpoints without a scheme use `https` for secured clusters and
    /// `http` otherwise.
    pub fn new(
        endpoints: &[String],
        credentials: SecurityCredentials,
        settings: &ClientSettings,
    ) -> ClientResult<Self> {
        if endpoints.is_empty() {
            return Err(ClientError::NoEndpoints);
        }

        match &credentials {
            SecurityCredentials::Transport(_) | SecurityCredentials::X509(_) => {
                return Err(ClientError::UnsupportedCredential(credentials.kind()));
            }
            SecurityCredentials::None | SecurityCredentials::Claims(_) => {}
        }

        let default_scheme = match credentials {
            SecurityCredentials::None => "http",
            _ => "https",
        };
        let endpoints = endpoints
            .iter()
            .map(|raw| parse_endpoint(raw, default_scheme))
            .collect::<ClientResult<Vec<_>>>()?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connection_initialization_timeout.max(Duration::from_millis(1)));
        if !settings.client_friendly_name.is_empty() {
            builder = builder.user_agent(settings.client_friendly_name.clone());
        }
        if !settings.keep_alive_interval.is_zero() {
            builder = builder.tcp_keepalive(settings.keep_alive_interval);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::transport("<client>", error_chain(&e)))?;

        Ok(Self {
            http,
            endpoints,
            credentials,
            events: EventHandlerSlot::new(),
            bound: Mutex::new(None),
            retrieved_token: Mutex::new(None),
        })
    }

    /// The gateway the client is currently bound to, if any.
    pub fn bound_gateway(&self) -> Option<GatewayInformation> {
        let bound = *self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        bound.map(|index| self.gateway(index))
    }

    fn gateway(&self, index: usize) -> GatewayInformation {
        GatewayInformation::for_address(self.endpoints[index].as_str().trim_end_matches('/'))
    }

    fn bind(&self, index: usize) {
        let previous = {
            let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
            bound.replace(index)
        };
        if previous != Some(index) {
            debug!(endpoint = %self.endpoints[index], "bound to gateway");
            if let Some(previous) = previous {
                self.events.disconnected(self.gateway(previous));
            }
            self.events.connected(self.gateway(index));
        }
    }

    fn unbind(&self, index: usize) {
        let was_bound = {
            let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
            if *bound == Some(index) {
                *bound = None;
                true
            } else {
                false
            }
        };
        if was_bound {
            debug!(endpoint = %self.endpoints[index], "lost gateway");
            self.events.disconnected(self.gateway(index));
        }
    }

    fn retrieved_token(&self) -> Option<String> {
        self.retrieved_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_retrieved_token(&self, token: Option<String>) {
        *self
            .retrieved_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Resolves the bearer token to present to `base`, running the claims
    /// handshake when no token is known yet.
    async fn bearer_token(&self, base: &Url, timeout: Duration) -> ClientResult<Option<String>> {
        let SecurityCredentials::Claims(claims) = &self.credentials else {
            return Ok(None);
        };
        if let Some(token) = &claims.local_claims {
            return Ok(Some(token.clone()));
        }
        if let Some(token) = self.retrieved_token() {
            return Ok(Some(token));
        }

        let metadata = self.fetch_claims_metadata(base, timeout).await?;
        match self.events.claims_retrieval(metadata) {
            Some(token) if !token.is_empty() => Ok(Some(token)),
            _ => Err(ClientError::Unauthorized(
                "no claims token available for this cluster".to_string(),
            )),
        }
    }

    async fn fetch_claims_metadata(
        &self,
        base: &Url,
        timeout: Duration,
    ) -> ClientResult<IdentityProviderMetadata> {
        #[derive(Deserialize)]
        struct ClaimsMetadataResponse {
            #[serde(rename = "type", default)]
            kind: String,
            #[serde(default)]
            metadata: Option<IdentityProviderMetadata>,
        }

        let url = build_url(base, &["$", "GetAadMetadata"], &[METADATA_API_VERSION])?;
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(base, &e, timeout))?;
        let response = check(response).await?;
        let body: ClaimsMetadataResponse = decode(response).await?;

        match body.metadata {
            Some(metadata) if body.kind.eq_ignore_ascii_case("aad") => Ok(metadata),
            _ => Err(ClientError::Unauthorized(
                "cluster does not advertise an identity provider".to_string(),
            )),
        }
    }

    /// Sends a request to the bound gateway, failing over across endpoints
    /// on transport errors. Authentication failures are not retried.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> ClientResult<Response> {
        let deadline = Instant::now() + timeout;
        let start = (*self.bound.lock().unwrap_or_else(PoisonError::into_inner)).unwrap_or(0);
        let mut last_error = None;

        for offset in 0..self.endpoints.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout(timeout));
            }

            let index = (start + offset) % self.endpoints.len();
            let base = &self.endpoints[index];
            let url = build_url(base, segments, query)?;

            let token = match self.bearer_token(base, remaining).await {
                Ok(token) => token,
                Err(err @ (ClientError::Transport { .. } | ClientError::Timeout(_))) => {
                    self.unbind(index);
                    last_error = Some(err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut request = self.http.request(method.clone(), url).timeout(remaining);
            if let Some(token) = &token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    self.bind(index);
                    let status = response.status();
                    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                        self.set_retrieved_token(None);
                        return Err(ClientError::Unauthorized(format!(
                            "gateway {base} answered {status}"
                        )));
                    }
                    if self.credentials.requires_metadata() {
                        self.set_retrieved_token(token);
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let mapped = map_send_error(base, &err, timeout);
                    warn!(endpoint = %base, error = %mapped, "gateway request failed");
                    self.unbind(index);
                    last_error = Some(mapped);
                }
            }
        }

        Err(last_error.unwrap_or(ClientError::NoEndpoints))
    }
}

impl ClusterClient for HttpClusterClient {
    fn set_event_handler(&self, handler: Arc<dyn ConnectionEventHandler>) {
        self.events.set(handler);
    }

    async fn name_exists(&self, name: &FabricName, timeout: Duration) -> ClientResult<bool> {
        let mut segments = vec!["Names"];
        segments.extend(name.path().split('/'));

        let response = self
            .send(Method::GET, &segments, &[API_VERSION], None, timeout)
            .await?;
        match check(response).await {
            Ok(_) => Ok(true),
            Err(ClientError::NameNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_node_list(
        &self,
        node_name_filter: Option<&str>,
        timeout: Duration,
    ) -> ClientResult<Vec<NodeInfo>> {
        if let Some(name) = node_name_filter {
            let response = self
                .send(Method::GET, &["Nodes", name], &[API_VERSION], None, timeout)
                .await?;
            if matches!(
                response.status(),
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
            ) {
                return Ok(Vec::new());
            }
            return match check(response).await {
                Ok(response) => {
                    let node: WireNode = decode(response).await?;
                    Ok(vec![node.into()])
                }
                Err(ClientError::InvalidAddress(_)) => Ok(Vec::new()),
                Err(e) => Err(e),
            };
        }

        let mut nodes = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut query = vec![API_VERSION];
            if let Some(token) = &continuation {
                query.push(("ContinuationToken", token.as_str()));
            }

            let response = self
                .send(Method::GET, &["Nodes"], &query, None, timeout)
                .await?;
            let page: WireNodePage = decode(check(response).await?).await?;
            nodes.extend(page.items.into_iter().map(NodeInfo::from));

            if page.continuation_token.is_empty()
                || continuation.as_deref() == Some(page.continuation_token.as_str())
            {
                break;
            }
            continuation = Some(page.continuation_token);
        }

        Ok(nodes)
    }

    async fn restart_node(
        &self,
        node_name: &str,
        instance_id: Option<u64>,
        timeout: Duration,
    ) -> ClientResult<()> {
        let body = json!({
            "NodeInstanceId": instance_id.unwrap_or(0).to_string(),
            "CreateFabricDump": "False",
        });
        let response = self
            .send(
                Method::POST,
                &["Nodes", node_name, "$", "Restart"],
                &[API_VERSION],
                Some(&body),
                timeout,
            )
            .await?;
        check(response).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClusterClient")
            .field("endpoints", &self.endpoints)
            .field("credentials", &self.credentials.kind())
            .field("bound", &self.bound_gateway())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Wire helpers
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireNodePage {
    #[serde(default)]
    continuation_token: String,
    #[serde(default)]
    items: Vec<WireNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireNode {
    name: String,
    #[serde(rename = "IpAddressOrFQDN", default)]
    ip_address_or_fqdn: String,
    #[serde(default)]
    id: Option<WireNodeId>,
    #[serde(default)]
    instance_id: String,
    #[serde(default)]
    node_status: String,
    #[serde(default)]
    health_state: String,
    #[serde(default)]
    is_seed_node: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireNodeId {
    id: String,
}

impl From<WireNode> for NodeInfo {
    fn from(node: WireNode) -> Self {
        NodeInfo {
            name: node.name,
            address: node.ip_address_or_fqdn,
            id: node.id.map(|id| id.id).unwrap_or_default(),
            instance_id: node.instance_id.parse().unwrap_or(0),
            status: NodeStatus::from(node.node_status.as_str()),
            health_state: HealthState::from(node.health_state.as_str()),
            is_seed_node: node.is_seed_node,
        }
    }
}

fn parse_endpoint(raw: &str, default_scheme: &str) -> ClientResult<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{default_scheme}://{raw}")
    };
    Url::parse(&with_scheme)
        .map_err(|e| ClientError::InvalidAddress(format!("endpoint '{raw}': {e}")))
}

fn build_url(base: &Url, segments: &[&str], query: &[(&str, &str)]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidAddress(format!("endpoint '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Passes successful responses through and decodes gateway errors.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(gateway_error(status, &body))
}

fn gateway_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => match error.code.as_str() {
            NAME_DOES_NOT_EXIST => ClientError::NameNotFound,
            INVALID_ADDRESS | NODE_NOT_FOUND => ClientError::InvalidAddress(error.message),
            _ => ClientError::Gateway {
                code: error.code,
                message: error.message,
            },
        },
        Err(_) => ClientError::Gateway {
            code: status.as_u16().to_string(),
            message: body.to_string(),
        },
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::InvalidResponse(error_chain(&e)))
}

fn map_send_error(base: &Url, err: &reqwest::Error, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(timeout)
    } else {
        ClientError::transport(base.as_str(), error_chain(err))
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_shell_types::{ClaimsCredentials, TransportCredentials};

    #[test]
    fn endpoints_without_scheme_get_default() {
        let url = parse_endpoint("node-0:19080", "http").unwrap();
        assert_eq!(url.as_str(), "http://node-0:19080/");

        let url = parse_endpoint("https://node-0:19080", "http").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn urls_keep_dollar_segments() {
        let base = Url::parse("http://node-0:19080/").unwrap();
        let url = build_url(&base, &["Nodes", "_Node_0", "$", "Restart"], &[API_VERSION]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://node-0:19080/Nodes/_Node_0/$/Restart?api-version=6.0"
        );
    }

    #[test]
    fn gateway_errors_map_to_variants() {
        let body = r#"{"Error":{"Code":"FABRIC_E_NAME_DOES_NOT_EXIST","Message":"Name does not exist."}}"#;
        assert_eq!(
            gateway_error(StatusCode::NOT_FOUND, body),
            ClientError::NameNotFound
        );

        let body = r#"{"Error":{"Code":"FABRIC_E_NODE_NOT_FOUND","Message":"Node not found"}}"#;
        assert!(gateway_error(StatusCode::BAD_REQUEST, body).is_invalid_address());

        let err = gateway_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(
            err,
            ClientError::Gateway {
                code: "500".to_string(),
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn rejects_credentials_without_http_support() {
        let err = HttpClusterClient::new(
            &["localhost:19080".to_string()],
            SecurityCredentials::Transport(TransportCredentials::default()),
            &ClientSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedCredential(_)));
    }

    #[test]
    fn rejects_empty_endpoint_list() {
        let err = HttpClusterClient::new(
            &[],
            SecurityCredentials::Claims(ClaimsCredentials::default()),
            &ClientSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, ClientError::NoEndpoints);
    }

    #[test]
    fn wire_node_conversion() {
        let json = r#"{
            "Name": "_Node_0",
            "IpAddressOrFQDN": "10.0.0.4",
            "Id": {"Id": "abc123"},
            "InstanceId": "131",
            "NodeStatus": "Up",
            "HealthState": "Ok",
            "IsSeedNode": true
        }"#;
        let node: NodeInfo = serde_json::from_str::<WireNode>(json).unwrap().into();
        assert_eq!(node.name, "_Node_0");
        assert_eq!(node.address, "10.0.0.4");
        assert_eq!(node.id, "abc123");
        assert_eq!(node.instance_id, 131);
        assert_eq!(node.status, NodeStatus::Up);
        assert_eq!(node.health_state, HealthState::Ok);
        assert!(node.is_seed_node);
    }
}
