//! Re-interpretation of address failures on node operations.

use std::future::Future;
use std::time::Duration;

use fabric_shell_client::{ClientError, ClientResult, ClusterClient};
use fabric_shell_types::NodeStatus;
use tracing::debug;

/// Runs `op` and, if it fails with [`ClientError::InvalidAddress`], looks the
/// node up to explain the failure.
///
/// A missing node becomes [`ClientError::NodeNotFound`], a node that is not up
/// becomes [`ClientError::NodeNotUp`]. In every other case, including a
/// failed lookup, the original error is returned unchanged.
pub async fn validate_node_name_on_failure<C, F, Fut, T>(
    node_name: &str,
    client: &C,
    timeout: Duration,
    op: F,
) -> ClientResult<T>
where
    C: ClusterClient,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let err = match op().await {
        Ok(value) => return Ok(value),
        Err(err) if err.is_invalid_address() => err,
        Err(err) => return Err(err),
    };

    let nodes = match client.get_node_list(Some(node_name), timeout).await {
        Ok(nodes) => nodes,
        Err(lookup) => {
            debug!(node = node_name, error = %lookup, "node lookup failed, keeping original error");
            return Err(err);
        }
    };

    match nodes.into_iter().find(|node| node.name == node_name) {
        None => Err(ClientError::NodeNotFound {
            node: node_name.to_string(),
            source: Box::new(err),
        }),
        Some(node) if node.status != NodeStatus::Up => Err(ClientError::NodeNotUp {
            node: node_name.to_string(),
            status: node.status,
            source: Box::new(err),
        }),
        Some(_) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_shell_client::{MockCall, MockClusterClient};
    use fabric_shell_types::{HealthState, NodeInfo};
    use test_case::test_case;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn node(name: &str, status: NodeStatus) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            address: "10.0.0.4".to_string(),
            id: format!("id-{name}"),
            instance_id: 7,
            status,
            health_state: HealthState::Ok,
            is_seed_node: false,
        }
    }

    fn invalid_address() -> ClientError {
        ClientError::InvalidAddress("_Node_1".to_string())
    }

    #[tokio::test]
    async fn success_skips_lookup() {
        let client = MockClusterClient::new();
        let value = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Ok::<_, ClientError>(3)
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_node_is_node_not_found() {
        let client = MockClusterClient::new().with_nodes(vec![node("_Node_0", NodeStatus::Up)]);
        let err = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Err::<(), _>(invalid_address())
        })
        .await
        .unwrap_err();

        assert_eq!(
            err,
            ClientError::NodeNotFound {
                node: "_Node_1".to_string(),
                source: Box::new(invalid_address()),
            }
        );
        assert_eq!(
            client.calls(),
            vec![MockCall::GetNodeList {
                node_name_filter: Some("_Node_1".to_string()),
            }]
        );
    }

    #[test_case(NodeStatus::Down ; "down")]
    #[test_case(NodeStatus::Disabled ; "disabled")]
    #[test_case(NodeStatus::Removed ; "removed")]
    #[tokio::test]
    async fn node_not_up(status: NodeStatus) {
        let client = MockClusterClient::new().with_nodes(vec![node("_Node_1", status)]);
        let err = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Err::<(), _>(invalid_address())
        })
        .await
        .unwrap_err();

        assert!(
            matches!(&err, ClientError::NodeNotUp { node, status: s, .. } if node == "_Node_1" && *s == status),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn up_node_keeps_original_error() {
        let client = MockClusterClient::new().with_nodes(vec![node("_Node_1", NodeStatus::Up)]);
        let err = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Err::<(), _>(invalid_address())
        })
        .await
        .unwrap_err();

        assert_eq!(err, invalid_address());
    }

    #[tokio::test]
    async fn failed_lookup_keeps_original_error() {
        let client = MockClusterClient::new()
            .with_node_list_error(ClientError::transport("http://node-0:19080", "reset"));
        let err = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Err::<(), _>(invalid_address())
        })
        .await
        .unwrap_err();

        assert_eq!(err, invalid_address());
    }

    #[tokio::test]
    async fn other_errors_pass_through_without_lookup() {
        let client = MockClusterClient::new();
        let err = validate_node_name_on_failure("_Node_1", &client, TIMEOUT, || async {
            Err::<(), _>(ClientError::Timeout(TIMEOUT))
        })
        .await
        .unwrap_err();

        assert_eq!(err, ClientError::Timeout(TIMEOUT));
        assert!(client.calls().is_empty());
    }
}
