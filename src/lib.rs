//! mm-importer - REST bridge that replays imported Slack content into Mattermost
//!
//! This crate provides:
//! - An admin-only HTTP API for posts, reactions, attachments and channels
//! - Channel name normalization to Mattermost's naming rules
//! - A Mattermost REST client implementing the host API
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use mm_importer::{Config, Core};
//!
//! let config = Config::from_file("~/.mm-importer/config.toml").unwrap();
//! let core = Core::new(config).unwrap();
//! // core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! mm-importer --config ~/.mm-importer/config.toml
//! ```

pub mod api;
pub mod channel_name;
pub mod config;
pub mod error;
pub mod host;

// Re-export main types for convenience
pub use config::Config;
pub use error::{CoreError, Result};
pub use host::{HostApi, HostError, MattermostClient};

use std::sync::Arc;

/// Core service that wires the host API into the HTTP server
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Host messaging API (None when no Mattermost server is configured)
    host: Option<Arc<dyn HostApi>>,
}

impl Core {
    /// Create a new Core instance, connecting to Mattermost if credentials are configured
    pub fn new(config: Config) -> Result<Self> {
        let host = match config.mattermost.credentials() {
            Some((url, token)) => {
                let client = MattermostClient::new(url, token, config.mattermost.timeout())?;
                tracing::info!("Using Mattermost host at {}", url);
                Some(Arc::new(client) as Arc<dyn HostApi>)
            }
            None => None,
        };

        Ok(Core { config, host })
    }

    /// Create a Core instance with an existing host (for embedding and tests)
    pub fn with_host(config: Config, host: Option<Arc<dyn HostApi>>) -> Self {
        Core { config, host }
    }

    /// Get the attached host API
    pub fn host(&self) -> Option<&Arc<dyn HostApi>> {
        self.host.as_ref()
    }

    /// Check that the configured token belongs to a system admin.
    ///
    /// Imports set timestamps and act for other users, which Mattermost only
    /// allows for admins. Returns `Ok(false)` when no host is attached.
    pub async fn verify_host(&self) -> Result<bool> {
        let Some(host) = &self.host else {
            return Ok(false);
        };

        let me = host.current_user().await?;
        if me.is_system_admin() {
            tracing::info!("Authenticated to Mattermost as {}", me.username);
            Ok(true)
        } else {
            Err(CoreError::Config(format!(
                "Mattermost user {} is not a system admin",
                me.username
            )))
        }
    }

    /// Start the HTTP API server
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        api::serve(addr, &self.config, self.host.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    #[test]
    fn test_new_without_credentials_has_no_host() {
        let core = Core::new(Config::default()).unwrap();
        assert!(core.host().is_none());
    }

    #[test]
    fn test_new_with_credentials_attaches_host() {
        let mut config = Config::default();
        config.mattermost.url = Some("http://localhost:8065".to_string());
        config.mattermost.token = Some("token".to_string());

        let core = Core::new(config).unwrap();
        assert!(core.host().is_some());
    }

    #[tokio::test]
    async fn test_verify_host() {
        let core = Core::with_host(Config::default(), None);
        assert!(!core.verify_host().await.unwrap());

        let admin: Arc<dyn HostApi> = Arc::new(MockHost::new().with_admin("me"));
        let core = Core::with_host(Config::default(), Some(admin));
        assert!(core.verify_host().await.unwrap());

        let user: Arc<dyn HostApi> = Arc::new(MockHost::new().with_user("me", "system_user"));
        let core = Core::with_host(Config::default(), Some(user));
        assert!(matches!(
            core.verify_host().await,
            Err(CoreError::Config(_))
        ));

        let missing: Arc<dyn HostApi> = Arc::new(MockHost::new());
        let core = Core::with_host(Config::default(), Some(missing));
        assert!(matches!(core.verify_host().await, Err(CoreError::Host(_))));
    }
}
