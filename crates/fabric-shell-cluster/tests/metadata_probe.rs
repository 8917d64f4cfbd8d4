//! Metadata probe timing and outcome tests on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use fabric_shell_client::{ClientError, MockCall, MockClusterClient, ProbeScript};
use fabric_shell_cluster::{
    ClusterConnection, DEFAULT_OPERATION_TIMEOUT, INVALID_CLAIMS_TOKEN, ProbeState,
};
use fabric_shell_types::{
    ClaimsCredentials, ClientSettings, FabricName, GatewayInformation, HealthState,
    IdentityProviderMetadata, NodeInfo, NodeStatus, SecurityCredentials,
};
use test_case::test_case;
use tokio::time::Instant;

fn metadata() -> IdentityProviderMetadata {
    IdentityProviderMetadata {
        authority: "https://login.example/tenant-1".to_string(),
        tenant_id: "tenant-1".to_string(),
        cluster_application: "cluster-app".to_string(),
        client_application: "client-app".to_string(),
        client_redirect: "urn:ietf:wg:oauth:2.0:oob".to_string(),
        login: "https://login.example".to_string(),
    }
}

fn refused() -> ClientError {
    ClientError::transport("https://node-0:19080", "connection refused")
}

fn connect(client: MockClusterClient, get_metadata: bool) -> ClusterConnection<MockClusterClient> {
    ClusterConnection::new(
        Arc::new(client),
        vec!["https://node-0:19080".to_string()],
        SecurityCredentials::Claims(ClaimsCredentials::default()),
        ClientSettings::default(),
        get_metadata,
    )
}

#[tokio::test(start_paused = true)]
async fn metadata_arrives_before_timeout() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(Duration::from_secs(1))
                .claims(metadata())
                .hang(),
        ),
        true,
    );

    let started = Instant::now();
    connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(1));
    assert_eq!(connection.identity_provider_metadata(), Some(&metadata()));
    assert_eq!(connection.probe_state(), ProbeState::Done);
    assert_eq!(
        connection.client().claims_tokens(),
        vec![Some(INVALID_CLAIMS_TOKEN.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn lookup_failure_without_metadata_is_raised() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(Duration::from_millis(500))
                .fail(refused()),
        ),
        true,
    );

    let started = Instant::now();
    let err = connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_millis(500));
    assert_eq!(err, refused());
    assert!(connection.identity_provider_metadata().is_none());
}

#[tokio::test(start_paused = true)]
async fn hanging_lookup_returns_quietly_at_timeout() {
    let connection = connect(
        MockClusterClient::new().with_probe(ProbeScript::new().hang()),
        true,
    );

    let started = Instant::now();
    connection
        .initialize_metadata_probe(Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert!(connection.identity_provider_metadata().is_none());
    assert_eq!(connection.probe_state(), ProbeState::Done);
}

#[tokio::test(start_paused = true)]
async fn late_failure_after_metadata_is_dropped() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(Duration::from_secs(5))
                .claims(metadata())
                .sleep(Duration::from_millis(4_900))
                .fail(refused()),
        ),
        true,
    );

    let started = Instant::now();
    connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(5));

    // Let the background lookup reach its failure.
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(connection.identity_provider_metadata(), Some(&metadata()));
    assert_eq!(connection.probe_state(), ProbeState::Done);
}

#[tokio::test(start_paused = true)]
async fn metadata_wins_over_immediate_failure() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .claims(metadata())
                .fail(ClientError::Unauthorized("invalid token".to_string())),
        ),
        true,
    );

    connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(connection.identity_provider_metadata(), Some(&metadata()));
}

#[test_case(100 ; "100ms")]
#[test_case(1_000 ; "1s")]
#[test_case(7_500 ; "7.5s")]
#[tokio::test(start_paused = true)]
async fn wait_never_exceeds_timeout(timeout_ms: u64) {
    let timeout = Duration::from_millis(timeout_ms);
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(timeout * 3)
                .claims(metadata()),
        ),
        true,
    );

    let started = Instant::now();
    connection.initialize_metadata_probe(timeout).await.unwrap();

    assert_eq!(started.elapsed(), timeout);
    assert!(connection.identity_provider_metadata().is_none());
}

#[tokio::test(start_paused = true)]
async fn lookup_uses_placeholder_and_half_budget() {
    let connection = connect(
        MockClusterClient::new().with_probe(ProbeScript::new().hang()),
        true,
    );

    connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(
        connection.client().calls(),
        vec![MockCall::NameExists {
            name: FabricName::probe_placeholder(),
            timeout: Duration::from_secs(5),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn without_get_metadata_the_rejection_is_raised() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .claims(metadata())
                .fail(ClientError::Unauthorized("no token".to_string())),
        ),
        false,
    );

    let err = connection
        .initialize_metadata_probe(Duration::from_secs(10))
        .await
        .unwrap_err();

    assert_eq!(err, ClientError::Unauthorized("no token".to_string()));
    assert!(connection.identity_provider_metadata().is_none());
    assert_eq!(connection.client().claims_tokens(), vec![None]);
}

#[tokio::test(start_paused = true)]
async fn each_probe_waits_on_a_fresh_signal() {
    let connection = connect(
        MockClusterClient::new().with_probe(
            ProbeScript::new()
                .sleep(Duration::from_secs(1))
                .fail(refused()),
        ),
        true,
    );
    assert_eq!(connection.probe_state(), ProbeState::Idle);

    for _ in 0..2 {
        let started = Instant::now();
        let err = connection
            .initialize_metadata_probe(Duration::from_secs(10))
            .await
            .unwrap_err();
        assert_eq!(err, refused());
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }
}

#[tokio::test]
async fn gateway_tracks_connect_and_disconnect() {
    let connection = connect(MockClusterClient::new(), false);
    assert!(connection.gateway_information().is_none());

    let gateway = GatewayInformation {
        node_name: Some("_Node_0".to_string()),
        ..GatewayInformation::for_address("https://node-0:19080")
    };
    connection.client().emit_connected(gateway.clone());
    assert_eq!(connection.gateway_information(), Some(gateway.clone()));

    connection.client().emit_disconnected(gateway);
    assert!(connection.gateway_information().is_none());
}

#[tokio::test]
async fn forwarded_calls_default_the_timeout() {
    let connection = connect(MockClusterClient::new(), false);

    connection
        .name_exists(&FabricName::parse("fabric:/App").unwrap(), None)
        .await
        .unwrap();

    assert_eq!(
        connection.client().calls(),
        vec![MockCall::NameExists {
            name: FabricName::parse("fabric:/App").unwrap(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }]
    );
}

#[tokio::test]
async fn restart_of_unknown_node_is_explained() {
    let connection = connect(
        MockClusterClient::new()
            .with_nodes(vec![NodeInfo {
                name: "_Node_0".to_string(),
                address: "10.0.0.4".to_string(),
                id: "n0".to_string(),
                instance_id: 3,
                status: NodeStatus::Up,
                health_state: HealthState::Ok,
                is_seed_node: true,
            }])
            .with_restart_error(ClientError::InvalidAddress("_Node_7".to_string())),
        false,
    );

    let err = connection
        .restart_node("_Node_7", Some(1), None)
        .await
        .unwrap_err();

    assert!(
        matches!(&err, ClientError::NodeNotFound { node, .. } if node == "_Node_7"),
        "got {err:?}"
    );
    assert_eq!(
        connection.client().calls(),
        vec![
            MockCall::RestartNode {
                node_name: "_Node_7".to_string(),
                instance_id: Some(1),
            },
            MockCall::GetNodeList {
                node_name_filter: Some("_Node_7".to_string()),
            },
        ]
    );
}
