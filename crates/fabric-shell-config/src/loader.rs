//! Configuration loader with multi-source merging

use crate::{ConfigError, FabricShellConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable prefix; variables look like `FSH__CONNECTION__ENDPOINTS`.
const ENV_PREFIX: &str = "FSH";

/// Keys whose environment values are comma-separated lists.
const LIST_KEYS: &[&str] = &[
    "connection.endpoints",
    "security.remote_cert_thumbprints",
    "security.remote_common_names",
    "security.server_common_names",
    "security.server_thumbprints",
];

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    include_user_config: bool,
    env_source: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            include_user_config: true,
            env_source: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Skip ~/.config/fabric-shell/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    #[cfg(test)]
    fn with_env_source(mut self, vars: &[(&str, &str)]) -> Self {
        self.env_source = Some(
            vars.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<FabricShellConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = FabricShellConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/fabric-shell/config.toml)
        if self.include_user_config
            && let Ok(user_config_file) = Paths::new().user_config_file()
        {
            builder = add_file(builder, user_config_file)?;
        }

        // 3. Project config (fabric-shell.toml)
        builder = add_file(builder, Paths::project_config_file(&self.project_dir))?;

        // 4. Local config (fabric-shell.local.toml, gitignored)
        builder = add_file(builder, Paths::local_config_file(&self.project_dir))?;

        // 5. Environment variables (FSH__SECTION__KEY)
        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .try_parsing(true)
            .source(self.env_source);
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }
        builder = builder.add_source(environment);

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Adds `path` as a TOML source if it exists, checking it parses first so
/// errors name the offending file.
fn add_file(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    path: PathBuf,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    if !path.exists() {
        return Ok(builder);
    }

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
        path: path.clone(),
        source,
    })?;
    toml::from_str::<toml::Table>(&contents).map_err(|source| ConfigError::ParseError {
        path: path.clone(),
        source,
    })?;

    Ok(builder.add_source(
        config::File::from(path)
            .required(false)
            .format(config::FileFormat::Toml),
    ))
}
