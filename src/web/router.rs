//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    abandon_upload, complete_upload, create_folder, create_owner, delete_file, delete_folder,
    download_archive, download_file, generate_key, get_file, init_upload, lock, me,
    mobile_upload, rename_folder, retrieve, unlock, upload_chunk, upload_files, upload_progress,
    view_folder, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Multipart framing allowance on top of the largest accepted payload.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
    max_body_size: u64,
) -> Router {
    let owner_routes = Router::new()
        .route("/owners", post(create_owner))
        .route("/owners/me", get(me));

    let lock_routes = Router::new()
        .route("/key", post(generate_key))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .route("/retrieve", post(retrieve));

    let folder_routes = Router::new()
        .route("/folders", post(create_folder))
        .route(
            "/folders/:id",
            get(view_folder).put(rename_folder).delete(delete_folder),
        )
        .route("/folders/:id/archive", get(download_archive))
        .route("/folders/:id/files", post(upload_files));

    let file_routes = Router::new()
        .route("/files/:id", get(get_file).delete(delete_file))
        .route("/files/:id/download", get(download_file))
        .route("/mobile-upload/:owner_id", post(mobile_upload));

    let upload_routes = Router::new()
        .route("/upload/init", post(init_upload))
        .route("/upload/chunk/:upload_id", post(upload_chunk))
        .route(
            "/upload/:upload_id",
            get(upload_progress).delete(abandon_upload),
        )
        .route("/upload/:upload_id/complete", post(complete_upload));

    let api_routes = Router::new()
        .merge(owner_routes)
        .merge(lock_routes)
        .merge(folder_routes)
        .merge(file_routes)
        .merge(upload_routes);

    let body_limit = usize::try_from(max_body_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    // Clone jwt_state for the middleware closure
    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
