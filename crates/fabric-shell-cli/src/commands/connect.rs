//! Connect command: reach the cluster or fetch its identity-provider metadata.

use anyhow::{Context, Result};
use fabric_shell_client::HttpClusterClient;
use fabric_shell_cluster::ClusterConnection;

use crate::context::ShellContext;
use crate::style::{self, colors::SemanticStyle};

pub async fn run(ctx: &ShellContext, get_metadata: bool, aad_token: Option<String>) -> Result<()> {
    let get_metadata = get_metadata || ctx.config.connection.get_metadata;
    let connection = ctx.connect(get_metadata, aad_token)?;

    if get_metadata {
        if connection.credentials().requires_metadata() {
            return fetch_metadata(ctx, &connection).await;
        }
        style::print_warn(
            "Identity-provider metadata is only available for claims security without a token",
        );
    }

    let endpoints = connection.endpoints().join(", ");
    let spinner = style::create_spinner(&format!("Connecting to {endpoints}..."));
    let nodes = match connection
        .get_node_list(None, Some(ctx.operation_timeout()))
        .await
    {
        Ok(nodes) => nodes,
        Err(e) => {
            style::finish_error(&spinner, "Connection failed");
            return Err(e).context("Failed to connect to cluster");
        }
    };
    style::finish_success(&spinner, "Connected to cluster");

    let gateway = connection.gateway_information();
    style::print_info_table(&[
        (
            "Gateway",
            gateway.map_or_else(|| "unknown".to_string(), |g| g.node_address),
        ),
        ("Credential", connection.credentials().kind().to_string()),
        ("Nodes", nodes.len().to_string()),
    ]);

    Ok(())
}

async fn fetch_metadata(
    ctx: &ShellContext,
    connection: &ClusterConnection<HttpClusterClient>,
) -> Result<()> {
    let timeout = ctx.config.connection.metadata_probe_timeout();
    let spinner = style::create_spinner("Retrieving identity-provider metadata...");

    if let Err(e) = connection.initialize_metadata_probe(timeout).await {
        style::finish_error(&spinner, "Metadata retrieval failed");
        return Err(e).context("Failed to retrieve identity-provider metadata");
    }

    let Some(metadata) = connection.identity_provider_metadata() else {
        spinner.finish_and_clear();
        style::print_warn(&format!(
            "Cluster did not provide identity-provider metadata within {}s",
            timeout.as_secs()
        ));
        style::print_hint("Pass --aad-token to connect with a token you already have");
        return Ok(());
    };

    style::finish_success(&spinner, "Retrieved identity-provider metadata");
    style::print_info_table(&[
        ("Authority", metadata.authority.clone()),
        ("Tenant", metadata.tenant_id.clone()),
        ("Cluster application", metadata.cluster_application.clone()),
        ("Client application", metadata.client_application.clone()),
        ("Client redirect", metadata.client_redirect.clone()),
        ("Login", metadata.login.clone()),
    ]);
    println!(
        "{}",
        "Sign in with these values, then reconnect with --aad-token.".muted()
    );

    Ok(())
}
