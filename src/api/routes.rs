//! HTTP route handlers for the API
//!
//! Each handler reads its body, validates the fields it needs, makes one
//! host call and answers with the resulting id. Bodies are read as raw bytes
//! and parsed here so that malformed input gets the same `{"error": ...}`
//! shape as every other failure.

use super::{ApiError, AppState};
use crate::channel_name;
use crate::host::{Channel, ChannelType, Post, Reaction};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, rejection::BytesRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Parse a JSON request body
fn parse_json<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let body = body.map_err(|e| {
        tracing::debug!("Failed to read request body: {}", e);
        ApiError::bad_request("Failed to read body")
    })?;
    serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))
}

fn empty_object() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn hello() -> &'static str {
    "Hello, world!"
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportPostRequest {
    pub user_id: String,
    pub channel_id: String,
    pub message: String,
    pub create_at: i64,
    pub root_id: String,
    pub file_ids: Vec<String>,
    pub props: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct ImportPostResponse {
    pub post_id: String,
}

pub async fn import_post(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ImportPostResponse> {
    let req: ImportPostRequest = parse_json(body)?;
    if req.user_id.is_empty() || req.channel_id.is_empty() || req.message.is_empty() {
        return Err(ApiError::bad_request(
            "user_id, channel_id, and message are required",
        ));
    }

    let post = Post {
        id: String::new(),
        user_id: req.user_id,
        channel_id: req.channel_id,
        message: req.message,
        create_at: req.create_at,
        root_id: req.root_id,
        file_ids: req.file_ids,
        props: req.props,
    };

    let created = state.host()?.create_post(post).await?;
    tracing::debug!("Imported post {} into channel {}", created.id, created.channel_id);

    Ok(Json(ImportPostResponse {
        post_id: created.id,
    }))
}

// ============================================================================
// Reactions
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportReactionRequest {
    pub user_id: String,
    pub post_id: String,
    pub emoji_name: String,
    pub create_at: i64,
}

pub async fn import_reaction(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<serde_json::Value> {
    let req: ImportReactionRequest = parse_json(body)?;
    if req.user_id.is_empty() || req.post_id.is_empty() || req.emoji_name.is_empty() {
        return Err(ApiError::bad_request(
            "user_id, post_id, and emoji_name are required",
        ));
    }

    let reaction = Reaction {
        user_id: req.user_id,
        post_id: req.post_id,
        emoji_name: req.emoji_name,
        create_at: req.create_at,
    };
    state.host()?.add_reaction(reaction).await?;

    Ok(empty_object())
}

// ============================================================================
// Attachments
// ============================================================================

/// Filename used when a multipart upload names neither the field nor the part
const DEFAULT_UPLOAD_NAME: &str = "upload.bin";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadAttachmentRequest {
    pub channel_id: String,
    pub filename: String,
    pub content_base64: String,
    /// Accepted for compatibility; uploads are owned by the token's user
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UploadAttachmentResponse {
    pub file_id: String,
}

pub async fn upload_attachment(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<UploadAttachmentResponse> {
    let req: UploadAttachmentRequest = parse_json(body)?;
    if req.channel_id.is_empty() || req.filename.is_empty() || req.content_base64.is_empty() {
        return Err(ApiError::bad_request(
            "channel_id, filename and content_base64 are required",
        ));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(req.content_base64.as_bytes())
        .map_err(|_| ApiError::bad_request("Invalid base64 content"))?;

    // The file only becomes downloadable once a post references it
    let info = state
        .host()?
        .upload_file(data, &req.channel_id, &req.filename)
        .await?;
    tracing::debug!("Uploaded {} ({} bytes) as {}", req.filename, info.size, info.id);

    Ok(Json(UploadAttachmentResponse { file_id: info.id }))
}

/// Accepts multipart/form-data with fields:
/// - `channel_id` (required)
/// - `filename` (optional; falls back to the uploaded part's file name)
/// - `file` (required) the binary content
pub async fn upload_attachment_multipart(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadAttachmentResponse> {
    let invalid_form = || ApiError::bad_request("Invalid multipart form");
    let mut multipart = multipart.map_err(|_| invalid_form())?;

    let mut channel_id = String::new();
    let mut filename = String::new();
    let mut file: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|_| invalid_form())? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("channel_id") => channel_id = field.text().await.map_err(|_| invalid_form())?,
            Some("filename") => filename = field.text().await.map_err(|_| invalid_form())?,
            Some("file") => {
                let part_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read file"))?;
                file = Some((part_name, data));
            }
            _ => {}
        }
    }

    if channel_id.is_empty() {
        return Err(ApiError::bad_request("channel_id is required"));
    }
    let Some((part_name, data)) = file else {
        return Err(ApiError::bad_request("file is required"));
    };

    if filename.is_empty() {
        filename = part_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
    }

    let info = state
        .host()?
        .upload_file(data.to_vec(), &channel_id, &filename)
        .await?;
    tracing::debug!("Uploaded {} ({} bytes) as {}", filename, info.size, info.id);

    Ok(Json(UploadAttachmentResponse { file_id: info.id }))
}

// ============================================================================
// Channels
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateOrGetChannelRequest {
    pub team_id: String,
    pub name: String,
    pub display_name: String,
    /// "O" (open) or "P" (private)
    #[serde(rename = "type")]
    pub channel_type: String,
    pub header: String,
    pub purpose: String,
}

#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub channel_id: String,
}

/// Return the channel with the normalized name in the team, creating it if absent
pub async fn create_or_get_channel(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ChannelResponse> {
    let req: CreateOrGetChannelRequest = parse_json(body)?;
    let channel_type = match ChannelType::parse_creatable(&req.channel_type) {
        Some(t) if !req.team_id.is_empty() && !req.name.is_empty() => t,
        _ => {
            return Err(ApiError::bad_request(
                "team_id, name and valid type are required",
            ))
        }
    };

    let host = state.host()?;
    let name = channel_name::normalize(&req.name);
    if !channel_name::is_deterministic(&req.name) {
        tracing::warn!(
            "Channel name {:?} normalized to generated name {}; repeating this request creates another channel",
            req.name,
            name
        );
    } else if !channel_name::is_valid_channel_name(&req.name) {
        tracing::debug!("Normalized channel name {:?} to {}", req.name, name);
    }

    match host.get_channel_by_name(&name, &req.team_id).await {
        Ok(Some(existing)) => {
            tracing::debug!("Channel {} already exists as {}", name, existing.id);
            return Ok(Json(ChannelResponse {
                channel_id: existing.id,
            }));
        }
        Ok(None) => {}
        Err(e) => tracing::debug!("Lookup of channel {} failed, creating it: {}", name, e),
    }

    let display_name = if req.display_name.trim().is_empty() {
        req.name.trim().to_string()
    } else {
        req.display_name
    };

    let channel = Channel {
        id: String::new(),
        team_id: req.team_id,
        name,
        display_name,
        channel_type,
        header: req.header,
        purpose: req.purpose,
    };
    let created = host.create_channel(channel).await?;
    tracing::info!(
        "Created {} channel {} ({})",
        created.channel_type,
        created.name,
        created.id
    );

    Ok(Json(ChannelResponse {
        channel_id: created.id,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddChannelMembersRequest {
    pub channel_id: String,
    pub user_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddChannelMembersResponse {
    pub added: Vec<String>,
}

/// Add each user to the channel independently.
///
/// Not atomic: failures are logged and left out of `added`, and the request
/// still succeeds.
pub async fn add_channel_members(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<AddChannelMembersResponse> {
    let req: AddChannelMembersRequest = parse_json(body)?;
    if req.channel_id.is_empty() || req.user_ids.is_empty() {
        return Err(ApiError::bad_request("channel_id and user_ids are required"));
    }

    let host = state.host()?;
    let mut added = Vec::with_capacity(req.user_ids.len());

    for user_id in req.user_ids.into_iter().filter(|id| !id.is_empty()) {
        match host.add_channel_member(&req.channel_id, &user_id).await {
            Ok(()) => added.push(user_id),
            Err(e) => tracing::warn!(
                channel_id = %req.channel_id,
                user_id = %user_id,
                "AddChannelMember failed: {}",
                e
            ),
        }
    }

    Ok(Json(AddChannelMembersResponse { added }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveChannelRequest {
    pub channel_id: String,
}

pub async fn archive_channel(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<serde_json::Value> {
    let req: ArchiveChannelRequest = parse_json(body)?;
    if req.channel_id.is_empty() {
        return Err(ApiError::bad_request("channel_id is required"));
    }

    state.host()?.archive_channel(&req.channel_id).await?;
    tracing::info!("Archived channel {}", req.channel_id);

    Ok(empty_object())
}

// ============================================================================
// Direct and Group Messages
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserIdsRequest {
    pub user_ids: Vec<String>,
}

pub async fn create_direct_channel(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ChannelResponse> {
    let req: UserIdsRequest = parse_json(body)?;
    let [user_a, user_b] = req.user_ids.as_slice() else {
        return Err(ApiError::bad_request("user_ids must contain exactly 2 ids"));
    };

    let channel = state.host()?.get_direct_channel(user_a, user_b).await?;

    Ok(Json(ChannelResponse {
        channel_id: channel.id,
    }))
}

pub async fn create_group_channel(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<ChannelResponse> {
    let req: UserIdsRequest = parse_json(body)?;
    if req.user_ids.len() < 3 {
        return Err(ApiError::bad_request("user_ids must contain at least 3 ids"));
    }

    let channel = state.host()?.get_group_channel(&req.user_ids).await?;

    Ok(Json(ChannelResponse {
        channel_id: channel.id,
    }))
}
