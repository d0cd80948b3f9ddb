//! Authorization middleware for admin-only import routes

use super::error::ApiError;
use super::AppState;
use crate::host::is_valid_id;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the id of the authenticated Mattermost user
pub const USER_ID_HEADER: &str = "Mattermost-User-ID";

/// Authorization middleware
///
/// Requires `Mattermost-User-ID` to be a well-formed id naming a user the
/// host knows, and that user to be a system admin. Aliases such as `me`
/// never reach the host.
///
/// If no host is attached, all requests are allowed (test harness mode).
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(host) = &state.host else {
        return next.run(request).await;
    };

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.trim().to_string())
        .unwrap_or_default();

    if user_id.is_empty() {
        return ApiError::Unauthorized.into_response();
    }

    if !is_valid_id(&user_id) {
        tracing::warn!("Rejected malformed user id {:?}", user_id);
        return ApiError::Forbidden("Forbidden").into_response();
    }

    match host.get_user(&user_id).await {
        Ok(user) if user.id != user_id => {
            tracing::warn!("Host resolved user {} as {}", user_id, user.id);
            ApiError::Forbidden("Forbidden").into_response()
        }
        Ok(user) if user.is_system_admin() => next.run(request).await,
        Ok(user) => {
            tracing::warn!("Rejected non-admin user {} ({})", user.username, user.id);
            ApiError::Forbidden("Admin required").into_response()
        }
        Err(e) => {
            tracing::warn!("Could not resolve user {}: {}", user_id, e);
            ApiError::Forbidden("Forbidden").into_response()
        }
    }
}
