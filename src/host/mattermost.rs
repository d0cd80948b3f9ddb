//! Mattermost REST API v4 host
//!
//! Authenticates with a personal access token (or bot token) that belongs to
//! a system admin. The REST API creates posts and reactions as the token
//! owner, so this host only accepts posts and reactions authored by that
//! user and rejects the rest before anything is written.

use super::{
    is_valid_id, Channel, FileInfo, HostApi, HostError, HostResult, Post, Reaction, User,
};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Error document returned by Mattermost on non-2xx responses
#[derive(Debug, Deserialize)]
struct AppError {
    #[serde(default)]
    id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    file_infos: Vec<FileInfo>,
}

/// HostApi backed by a Mattermost server
#[derive(Clone)]
pub struct MattermostClient {
    client: Client,
    api_base: Url,
    token: String,
    /// Token owner, fetched on first use
    owner: Arc<OnceCell<User>>,
}

impl MattermostClient {
    /// Create a client for the server at `url` (e.g. `http://localhost:8065`)
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CoreError::Config("Mattermost URL is empty".to_string()));
        }
        let api_base = Url::parse(&format!("{}/api/v4", url.trim_end_matches('/')))
            .map_err(|e| CoreError::Config(format!("Invalid Mattermost URL {}: {}", url, e)))?;
        if api_base.cannot_be_a_base() {
            return Err(CoreError::Config(format!("Invalid Mattermost URL {}", url)));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(MattermostClient {
            client,
            api_base,
            token: token.to_string(),
            owner: Arc::new(OnceCell::new()),
        })
    }

    /// Build an API url from path segments. Each segment is percent-encoded,
    /// so an id containing `/` stays a single segment.
    fn url(&self, segments: &[&str]) -> HostResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| HostError::new("Mattermost URL cannot hold a path"))?
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> HostResult<RequestBuilder> {
        let url = self.url(segments)?;
        Ok(self.client.request(method, url).bearer_auth(&self.token))
    }

    fn get(&self, segments: &[&str]) -> HostResult<RequestBuilder> {
        self.request(Method::GET, segments)
    }

    fn post(&self, segments: &[&str]) -> HostResult<RequestBuilder> {
        self.request(Method::POST, segments)
    }

    fn delete(&self, segments: &[&str]) -> HostResult<RequestBuilder> {
        self.request(Method::DELETE, segments)
    }

    /// Send a request and decode the JSON body of a successful response
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> HostResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| HostError::new(format!("Invalid response from Mattermost: {}", e)))
    }

    /// Send a request, turning transport failures and non-2xx statuses into HostError
    async fn send(&self, request: RequestBuilder) -> HostResult<reqwest::Response> {
        let response = request.send().await.map_err(|e| HostError::new(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<AppError>(&body) {
            Ok(app_err) => {
                tracing::debug!("Mattermost error {} ({}): {}", status, app_err.id, app_err.message);
                app_err.message
            }
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        Err(HostError::with_status(message, status.as_u16()))
    }

    async fn owner(&self) -> HostResult<&User> {
        if let Some(owner) = self.owner.get() {
            return Ok(owner);
        }
        let request = self.get(&["users", "me"])?;
        self.owner
            .get_or_try_init(|| self.send_json::<User>(request))
            .await
    }

    /// Fail unless `user_id` is the token owner, the only author the REST API writes as
    async fn check_author(&self, user_id: &str) -> HostResult<()> {
        let owner = self.owner().await?;
        if owner.id == user_id {
            return Ok(());
        }
        Err(HostError::with_status(
            format!(
                "Mattermost REST host can only act as token owner {}, not user {}",
                owner.id, user_id
            ),
            403,
        ))
    }
}

fn check_id(kind: &str, id: &str) -> HostResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(HostError::with_status(format!("Invalid {} id {:?}", kind, id), 400))
    }
}

#[async_trait]
impl HostApi for MattermostClient {
    async fn get_user(&self, user_id: &str) -> HostResult<User> {
        check_id("user", user_id)?;
        self.send_json(self.get(&["users", user_id])?).await
    }

    async fn current_user(&self) -> HostResult<User> {
        self.owner().await.cloned()
    }

    async fn create_post(&self, post: Post) -> HostResult<Post> {
        self.check_author(&post.user_id).await?;
        let created: Post = self.send_json(self.post(&["posts"])?.json(&post)).await?;
        if created.user_id != post.user_id {
            return Err(HostError::new(format!(
                "Mattermost created post {} as user {} instead of {}",
                created.id, created.user_id, post.user_id
            )));
        }
        Ok(created)
    }

    async fn add_reaction(&self, reaction: Reaction) -> HostResult<Reaction> {
        self.check_author(&reaction.user_id).await?;
        self.send_json(self.post(&["reactions"])?.json(&reaction))
            .await
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        filename: &str,
    ) -> HostResult<FileInfo> {
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("channel_id", channel_id.to_string())
            .part("files", part);

        let uploaded: UploadResponse =
            self.send_json(self.post(&["files"])?.multipart(form)).await?;
        uploaded
            .file_infos
            .into_iter()
            .next()
            .ok_or_else(|| HostError::new("Mattermost returned no file info for upload"))
    }

    async fn get_channel_by_name(&self, name: &str, team_id: &str) -> HostResult<Option<Channel>> {
        let request = self.get(&["teams", team_id, "channels", "name", name])?;
        match self.send_json(request).await {
            Ok(channel) => Ok(Some(channel)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_channel(&self, channel: Channel) -> HostResult<Channel> {
        self.send_json(self.post(&["channels"])?.json(&channel))
            .await
    }

    async fn add_channel_member(&self, channel_id: &str, user_id: &str) -> HostResult<()> {
        let body = serde_json::json!({ "user_id": user_id });
        self.send(self.post(&["channels", channel_id, "members"])?.json(&body))
            .await?;
        Ok(())
    }

    async fn archive_channel(&self, channel_id: &str) -> HostResult<()> {
        self.send(self.delete(&["channels", channel_id])?).await?;
        Ok(())
    }

    async fn get_direct_channel(&self, user_a: &str, user_b: &str) -> HostResult<Channel> {
        self.send_json(self.post(&["channels", "direct"])?.json(&[user_a, user_b]))
            .await
    }

    async fn get_group_channel(&self, user_ids: &[String]) -> HostResult<Channel> {
        self.send_json(self.post(&["channels", "group"])?.json(user_ids))
            .await
    }
}
