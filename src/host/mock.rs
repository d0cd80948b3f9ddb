//! In-memory host used by handler tests

use super::{Channel, ChannelType, FileInfo, HostApi, HostError, HostResult, Post, Reaction, User};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockHost {
    users: HashMap<String, User>,
    channels: HashMap<(String, String), Channel>,
    failing_members: HashSet<String>,
    failure: Option<String>,

    pub posts: Mutex<Vec<Post>>,
    pub reactions: Mutex<Vec<Reaction>>,
    pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub created_channels: Mutex<Vec<Channel>>,
    pub archived: Mutex<Vec<String>>,
    pub group_requests: Mutex<Vec<Vec<String>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, roles: &str) -> Self {
        self.users.insert(
            id.to_string(),
            User {
                id: id.to_string(),
                username: format!("user-{}", id),
                roles: roles.to_string(),
            },
        );
        self
    }

    pub fn with_admin(self, id: &str) -> Self {
        self.with_user(id, "system_user system_admin")
    }

    /// Register an admin that the host returns under a different id than requested
    pub fn with_aliased_admin(mut self, requested: &str, actual: &str) -> Self {
        self.users.insert(
            requested.to_string(),
            User {
                id: actual.to_string(),
                username: format!("user-{}", actual),
                roles: "system_user system_admin".to_string(),
            },
        );
        self
    }

    pub fn with_channel(mut self, team_id: &str, name: &str, id: &str) -> Self {
        self.channels.insert(
            (team_id.to_string(), name.to_string()),
            Channel {
                id: id.to_string(),
                team_id: team_id.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        );
        self
    }

    /// Make `add_channel_member` fail for this user
    pub fn with_failing_member(mut self, user_id: &str) -> Self {
        self.failing_members.insert(user_id.to_string());
        self
    }

    /// Make every write operation fail with `message`
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    fn check_failure(&self) -> HostResult<()> {
        match &self.failure {
            Some(message) => Err(HostError::with_status(message.clone(), 500)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HostApi for MockHost {
    async fn get_user(&self, user_id: &str) -> HostResult<User> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| HostError::with_status("user not found", 404))
    }

    async fn current_user(&self) -> HostResult<User> {
        self.get_user("me").await
    }

    async fn create_post(&self, mut post: Post) -> HostResult<Post> {
        self.check_failure()?;
        let mut posts = self.posts.lock().unwrap();
        post.id = format!("post-{}", posts.len() + 1);
        posts.push(post.clone());
        Ok(post)
    }

    async fn add_reaction(&self, reaction: Reaction) -> HostResult<Reaction> {
        self.check_failure()?;
        self.reactions.lock().unwrap().push(reaction.clone());
        Ok(reaction)
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        filename: &str,
    ) -> HostResult<FileInfo> {
        self.check_failure()?;
        let size = data.len() as i64;
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((channel_id.to_string(), filename.to_string(), data));
        Ok(FileInfo {
            id: format!("file-{}", uploads.len()),
            name: filename.to_string(),
            size,
        })
    }

    async fn get_channel_by_name(&self, name: &str, team_id: &str) -> HostResult<Option<Channel>> {
        Ok(self
            .channels
            .get(&(team_id.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_channel(&self, mut channel: Channel) -> HostResult<Channel> {
        self.check_failure()?;
        let mut created = self.created_channels.lock().unwrap();
        channel.id = format!("channel-{}", created.len() + 1);
        created.push(channel.clone());
        Ok(channel)
    }

    async fn add_channel_member(&self, channel_id: &str, user_id: &str) -> HostResult<()> {
        if self.failing_members.contains(user_id) {
            return Err(HostError::new(format!(
                "cannot add {} to {}",
                user_id, channel_id
            )));
        }
        Ok(())
    }

    async fn archive_channel(&self, channel_id: &str) -> HostResult<()> {
        self.check_failure()?;
        self.archived.lock().unwrap().push(channel_id.to_string());
        Ok(())
    }

    async fn get_direct_channel(&self, user_a: &str, user_b: &str) -> HostResult<Channel> {
        self.check_failure()?;
        Ok(Channel {
            id: format!("dm-{}-{}", user_a, user_b),
            name: format!("{}__{}", user_a, user_b),
            channel_type: ChannelType::Direct,
            ..Default::default()
        })
    }

    async fn get_group_channel(&self, user_ids: &[String]) -> HostResult<Channel> {
        self.check_failure()?;
        self.group_requests.lock().unwrap().push(user_ids.to_vec());
        Ok(Channel {
            id: format!("gm-{}", user_ids.len()),
            name: user_ids.join("-"),
            channel_type: ChannelType::Group,
            ..Default::default()
        })
    }
}
