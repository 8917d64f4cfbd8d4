//! Node commands.

use anyhow::{Context, Result};

use crate::context::ShellContext;
use crate::style;

/// List cluster nodes, optionally a single node by name.
pub async fn list(ctx: &ShellContext, name: Option<&str>) -> Result<()> {
    let connection = ctx.connect(false, None)?;

    let spinner = style::create_spinner("Querying nodes...");
    let result = connection
        .get_node_list(name, Some(ctx.operation_timeout()))
        .await;
    spinner.finish_and_clear();

    let nodes = result.context("Failed to list nodes")?;
    style::print_node_table(&nodes);
    Ok(())
}

/// Restart a node. Address failures are explained by looking the node up.
pub async fn restart(ctx: &ShellContext, name: &str, instance_id: Option<u64>) -> Result<()> {
    let connection = ctx.connect(false, None)?;

    let spinner = style::create_spinner(&format!("Restarting {name}..."));
    match connection
        .restart_node(name, instance_id, Some(ctx.operation_timeout()))
        .await
    {
        Ok(()) => {
            style::finish_success(&spinner, &format!("Restart requested for {name}"));
            Ok(())
        }
        Err(e) => {
            style::finish_error(&spinner, &format!("Could not restart {name}"));
            Err(e).with_context(|| format!("Failed to restart node {name}"))
        }
    }
}
