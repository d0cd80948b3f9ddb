//! Host messaging API
//!
//! Every endpoint translates into exactly one call on a [`HostApi`]. The
//! handle is injected into the HTTP layer at construction, so tests can
//! swap in a substitute and production wires in [`MattermostClient`].

pub mod mattermost;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use mattermost::MattermostClient;
pub use types::{Channel, ChannelType, FileInfo, Post, Reaction, User};

use async_trait::async_trait;
use thiserror::Error;

/// Error reported by the host. The message is surfaced to API callers as-is.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
    /// HTTP status of the failed host call, when there was one
    pub status: Option<u16>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        HostError {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Length of every Mattermost object id
pub const ID_LEN: usize = 26;

/// Check that `id` has the shape of a Mattermost id: 26 lowercase ASCII
/// letters or digits. Anything else (`me`, paths, empty) is rejected.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Operations the importer needs from the messaging platform
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Look a user up by id. Ids that are not well formed are rejected.
    async fn get_user(&self, user_id: &str) -> HostResult<User>;

    /// The user the host acts as
    async fn current_user(&self) -> HostResult<User>;

    async fn create_post(&self, post: Post) -> HostResult<Post>;

    async fn add_reaction(&self, reaction: Reaction) -> HostResult<Reaction>;

    /// Upload raw file content into a channel. The file becomes visible once
    /// a post references its id.
    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        filename: &str,
    ) -> HostResult<FileInfo>;

    /// Look a channel up by its normalized name. `Ok(None)` means it does not exist.
    async fn get_channel_by_name(&self, name: &str, team_id: &str) -> HostResult<Option<Channel>>;

    async fn create_channel(&self, channel: Channel) -> HostResult<Channel>;

    async fn add_channel_member(&self, channel_id: &str, user_id: &str) -> HostResult<()>;

    /// Archive (soft-delete) a channel
    async fn archive_channel(&self, channel_id: &str) -> HostResult<()>;

    /// Get or create the direct channel between two users
    async fn get_direct_channel(&self, user_a: &str, user_b: &str) -> HostResult<Channel>;

    /// Get or create the group channel for a set of users
    async fn get_group_channel(&self, user_ids: &[String]) -> HostResult<Channel>;
}
