//! Configuration commands.

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::context::{self, GlobalOptions};
use crate::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

/// Show the effective configuration after every layer and flag is applied.
pub fn show(options: &GlobalOptions, format: ConfigFormat) -> Result<()> {
    let config = context::load_config(options)?;

    let rendered = match format {
        ConfigFormat::Toml => {
            toml::to_string_pretty(&config).context("Failed to render configuration as TOML")?
        }
        ConfigFormat::Json => serde_json::to_string_pretty(&config)
            .context("Failed to render configuration as JSON")?,
    };
    println!("{rendered}");
    Ok(())
}

/// Validate the effective configuration.
pub fn validate(options: &GlobalOptions) -> Result<()> {
    let config = context::load_config(options)?;

    match config.validate() {
        Ok(()) => {
            style::print_success("Configuration is valid");
            Ok(())
        }
        Err(e) => {
            style::print_error("Configuration validation failed");
            Err(e.into())
        }
    }
}
