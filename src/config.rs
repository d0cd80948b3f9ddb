//! Configuration management for mm-importer
//!
//! Loads settings from TOML file at ~/.mm-importer/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Mattermost connection used as the host API
    #[serde(default)]
    pub mattermost: MattermostConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 19480)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Path prefix for the import API (default: /api/v1)
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Maximum request body size in megabytes (default: 64).
    /// Base64 attachments are about a third larger than the file itself.
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_port() -> u16 {
    19480
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_path() -> String {
    "/api/v1".to_string()
}

fn default_max_body_mb() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            base_path: default_base_path(),
            max_body_mb: default_max_body_mb(),
        }
    }
}

impl ServerConfig {
    /// Base path with a leading slash and no trailing slash
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        format!("/{}", trimmed)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

/// Mattermost server connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MattermostConfig {
    /// Server URL, e.g. "http://localhost:8065"
    #[serde(default)]
    pub url: Option<String>,

    /// Personal access token of a system admin
    #[serde(default)]
    pub token: Option<String>,

    /// Timeout for a single Mattermost request in seconds (default: 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for MattermostConfig {
    fn default() -> Self {
        MattermostConfig {
            url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MattermostConfig {
    /// URL and token, when both are set and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().filter(|u| !u.trim().is_empty())?;
        let token = self.token.as_deref().filter(|t| !t.trim().is_empty())?;
        Some((url, token))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".mm-importer").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".mm-importer/config.toml"))
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("MM_IMPORTER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("MM_IMPORTER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MM_IMPORTER_PORT: {}", port),
            }
        }
        if let Some(base_path) = var("MM_IMPORTER_BASE_PATH") {
            self.server.base_path = base_path;
        }
        if let Some(url) = var("MM_URL") {
            self.mattermost.url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(token) = var("MM_TOKEN") {
            self.mattermost.token = if token.is_empty() { None } else { Some(token) };
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# mm-importer configuration

[server]
# Port to listen on (default: 19480)
port = 19480

# Host to bind to
# "127.0.0.1" = localhost only (recommended)
host = "127.0.0.1"

# Path prefix for the import endpoints
base_path = "/api/v1"

# Maximum request body size in megabytes
max_body_mb = 64

[mattermost]
# Without url and token the server runs with no host attached:
# authorization is skipped and host-backed endpoints fail.
# url = "http://localhost:8065"
# token = "system-admin-personal-access-token"
timeout_secs = 60
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
