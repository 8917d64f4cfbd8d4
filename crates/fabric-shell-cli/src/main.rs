//! fabric-shell: cluster management from the command line.
//!
//! # Quick Start
//!
//! ```bash
//! # Check that the cluster answers
//! fabric-shell --endpoint http://localhost:19080 connect
//!
//! # Ask a claims-secured cluster how to sign in
//! fabric-shell --endpoint https://cluster.example:19080 connect --get-metadata
//!
//! # Inspect and restart nodes
//! fabric-shell node list
//! fabric-shell node restart _Node_1
//! ```

mod commands;
mod context;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigFormat;
use context::{GlobalOptions, ShellContext};

/// fabric-shell - manage a cluster through its HTTP gateway.
#[derive(Parser)]
#[command(name = "fabric-shell")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Gateway endpoint; repeat to list several. Overrides configuration.
    #[arg(long = "endpoint", global = true, value_name = "URL")]
    endpoints: Vec<String>,

    /// Directory holding fabric-shell.toml.
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Operation timeout in seconds. Overrides configuration.
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout_sec: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Connect to the cluster and report the gateway.
    Connect {
        /// Only retrieve the identity-provider metadata of a claims-secured cluster.
        #[arg(long)]
        get_metadata: bool,

        /// Claims token to present instead of asking the cluster.
        #[arg(long, value_name = "TOKEN")]
        aad_token: Option<String>,
    },

    /// Node commands.
    #[command(subcommand)]
    Node(NodeCommands),

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum NodeCommands {
    /// List cluster nodes.
    List {
        /// Only show the node with this name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Restart a node.
    Restart {
        /// Node name.
        name: String,

        /// Only restart this instance of the node.
        #[arg(long)]
        instance_id: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Output format.
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Validate the effective configuration.
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `config show` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        project: cli.project,
        endpoints: cli.endpoints,
        timeout_sec: cli.timeout_sec,
        no_color: cli.no_color,
    };
    style::set_no_color(options.no_color);

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&options, format),
            ConfigCommands::Validate => commands::config::validate(&options),
        },
        Commands::Connect {
            get_metadata,
            aad_token,
        } => {
            let ctx = shell_context(&options)?;
            commands::connect::run(&ctx, get_metadata, aad_token).await
        }
        Commands::Node(cmd) => {
            let ctx = shell_context(&options)?;
            match cmd {
                NodeCommands::List { name } => commands::node::list(&ctx, name.as_deref()).await,
                NodeCommands::Restart { name, instance_id } => {
                    commands::node::restart(&ctx, &name, instance_id).await
                }
            }
        }
    }
}

fn shell_context(options: &GlobalOptions) -> Result<ShellContext> {
    let config = context::load_config(options)?;
    if config.output.no_color {
        style::set_no_color(true);
    }
    Ok(ShellContext::new(config))
}
