//! HTTP API module for mm-importer
//!
//! Provides the REST endpoints the importer backend uses to replay posts,
//! reactions, attachments and channels into Mattermost.

mod auth;
mod error;
pub mod routes;

pub use auth::USER_ID_HEADER;
pub use error::ApiError;

use crate::config::Config;
use crate::error::Result;
use crate::host::HostApi;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Host messaging API (None in the unauthenticated test harness configuration)
    pub host: Option<Arc<dyn HostApi>>,
}

impl AppState {
    pub fn new(host: Option<Arc<dyn HostApi>>) -> Self {
        AppState { host }
    }

    /// The attached host, or an upstream error when running without one
    pub fn host(&self) -> std::result::Result<&Arc<dyn HostApi>, ApiError> {
        self.host
            .as_ref()
            .ok_or_else(|| ApiError::Upstream("Host API unavailable".to_string()))
    }
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, config: &Config, host: Option<Arc<dyn HostApi>>) -> Result<()> {
    if host.is_none() {
        tracing::warn!(
            "No Mattermost host configured: authorization is disabled and import endpoints will fail"
        );
    }

    let state = AppState::new(host);
    let base_path = config.server.normalized_base_path();
    let app = create_router(state, &base_path, config.server.max_body_bytes());

    tracing::info!("Listening on http://{}{}", addr, base_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| crate::error::CoreError::Api(e.to_string()))?;

    Ok(())
}

/// Create the API router with all routes
///
/// Import routes live under `base_path` behind the admin gate and default to
/// a JSON content type. The gate only runs on matched routes, so unknown paths
/// and wrong methods get their 404/405 first. `/health` stays public at the root.
pub fn create_router(state: AppState, base_path: &str, max_body_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/hello", get(routes::hello))
        // Posts and reactions
        .route("/import", post(routes::import_post))
        .route("/reaction", post(routes::import_reaction))
        // Attachments
        .route("/attachment", post(routes::upload_attachment))
        .route(
            "/attachment_multipart",
            post(routes::upload_attachment_multipart),
        )
        // Channels
        .route("/channel", post(routes::create_or_get_channel))
        .route("/channel/members", post(routes::add_channel_members))
        .route("/channel/archive", post(routes::archive_channel))
        // Direct and group messages
        .route("/dm", post(routes::create_direct_channel))
        .route("/gdm", post(routes::create_group_channel))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth_middleware,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ));

    let router = Router::new().route("/health", get(routes::health));
    let router = if base_path.trim_matches('/').is_empty() {
        router.merge(api_routes)
    } else {
        router.nest(base_path, api_routes)
    };

    router
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use crate::host::mock::MockHost;
    use tower::ServiceExt;

    fn gated_app() -> Router {
        let host: Arc<dyn HostApi> =
            Arc::new(MockHost::new().with_admin("adminadminadminadminadmin1"));
        create_router(AppState::new(Some(host)), "/api/v1", 1024)
    }

    #[tokio::test]
    async fn test_custom_base_path() {
        let app = create_router(AppState::new(None), "/plugins/mm-importer/api/v1", 1024);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/plugins/mm-importer/api/v1/hello")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_base_path() {
        let app = create_router(AppState::new(None), "/", 1024);
        let response = app
            .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let app = create_router(AppState::new(None), "/api/v1", 1024);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/import")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_bad_request() {
        let app = create_router(AppState::new(None), "/api/v1", 16);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/channel/archive")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"channel_id": "a-very-long-channel-id"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unmatched_requests_skip_the_gate() {
        let response = gated_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/import")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = gated_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/nothing-here")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_matched_route_still_gated() {
        let response = gated_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/import")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
