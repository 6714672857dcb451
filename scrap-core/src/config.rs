//! Configuration for the scrapbook RPC server and client.
//!
//! Layering: defaults → file → env → CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::Role;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub batch: BatchConfig,
    pub auth: AuthConfig,
    pub feeds: FeedsConfig,
}

/// HTTP listener and the batch endpoint path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rpc_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            rpc_path: "/rpc".to_string(),
        }
    }
}

/// Client-side batching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Flush as soon as this many calls are pending.
    pub max_batch_size: usize,
    /// How long the first call of a batch waits for company. `0` means
    /// "until the current task yields".
    pub max_wait_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            max_wait_ms: 0,
        }
    }
}

/// Credential extraction and the development session table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub session_cookie: String,
    /// Static token table used by the built-in resolver. Token issuance is
    /// owned by the authentication provider; this exists for local runs.
    pub sessions: Vec<StaticSession>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: "scrap_session".to_string(),
            sessions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticSession {
    pub token: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedsConfig {
    pub sources: Vec<FeedSourceConfig>,
    pub fetch_timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            fetch_timeout_secs: 10,
        }
    }
}

/// A feed source registered at startup. `owner` absent means public.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub owner: Option<String>,
}

/// Overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub rpc_path: Option<String>,
}

impl Config {
    /// Load configuration from all sources with proper layering.
    /// Order: defaults → explicit file, else project config, else global
    /// config → env vars → CLI (CLI applied separately).
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        let home = dirs::home_dir();
        Self::load_from_with_env(explicit, &cwd, home.as_deref(), |key| {
            std::env::var(key).ok()
        })
        .await
    }

    /// Load config like [`Config::load`], with explicit directories and
    /// environment provider.
    ///
    /// This exists primarily to make tests deterministic without mutating the process-wide
    /// environment (which is unsafe in multi-threaded programs on Unix).
    #[doc(hidden)]
    pub async fn load_from_with_env<F>(
        explicit: Option<&Path>,
        start_dir: &Path,
        home_dir: Option<&Path>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => match Self::find_project_config_from(start_dir).await {
                Some(path) => Some(path),
                None => match home_dir.map(|home| home.join(".scrap/config.toml")) {
                    Some(global) if tokio::fs::try_exists(&global).await.unwrap_or(false) => {
                        Some(global)
                    }
                    _ => None,
                },
            },
        };

        let mut config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_file(&path).await?
            }
            None => Self::default(),
        };
        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Find project config by walking up directories (.scrap/config.toml)
    async fn find_project_config_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();
        loop {
            let config_path = current.join(".scrap").join("config.toml");
            if tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Parse a TOML file; missing sections keep their defaults.
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `SCRAP_*` overrides read through `env`.
    pub fn apply_env_overrides_from<F>(&mut self, mut env: F) -> Result<(), ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(host) = env("SCRAP_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env("SCRAP_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("SCRAP_PORT={port}")))?;
        }
        if let Some(path) = env("SCRAP_RPC_PATH") {
            self.server.rpc_path = path;
        }
        if let Some(cookie) = env("SCRAP_SESSION_COOKIE") {
            self.auth.session_cookie = cookie;
        }
        Ok(())
    }

    /// Apply CLI argument overrides
    pub fn apply_cli_overrides(&mut self, cli: CliOverrides) {
        if let Some(host) = cli.host {
            self.server.host = host;
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(path) = cli.rpc_path {
            self.server.rpc_path = path;
        }
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.rpc_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "server.rpc_path must start with '/': {}",
                self.server.rpc_path
            )));
        }
        if self.server.rpc_path == "/health" {
            return Err(ConfigError::InvalidValue(
                "server.rpc_path collides with the health route".to_string(),
            ));
        }
        if self.batch.max_batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "batch.max_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.auth.session_cookie.is_empty() {
            return Err(ConfigError::MissingField("auth.session_cookie".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}
