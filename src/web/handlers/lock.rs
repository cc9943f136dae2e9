//! Key, lock and retrieval handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::lock::LockService;
use crate::web::dto::{
    ApiResponse, KeyRequest, KeyResponse, OwnerResponse, SessionResponse, VisibilityResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthOwner;

/// POST /api/key - Generate a new owner key.
///
/// Any earlier key stops working. The returned token opens locked folders.
pub async fn generate_key(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
) -> Result<Json<ApiResponse<KeyResponse>>, ApiError> {
    let key = LockService::new(&state.db)
        .generate_key(auth.owner_id())
        .await?;
    let access_token = state.generate_access_token(auth.owner_id(), true)?;

    Ok(Json(ApiResponse::new(KeyResponse {
        key: key.as_str().to_string(),
        access_token,
    })))
}

/// POST /api/lock - Hide the caller's whole tree.
pub async fn lock(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Json(req): Json<KeyRequest>,
) -> Result<Json<ApiResponse<VisibilityResponse>>, ApiError> {
    let updated = LockService::new(&state.db)
        .lock(auth.owner_id(), &req.key)
        .await?;
    let access_token = state.generate_access_token(auth.owner_id(), true)?;

    Ok(Json(ApiResponse::new(VisibilityResponse {
        locked: true,
        folders_updated: updated,
        access_token,
    })))
}

/// POST /api/unlock - Reveal the caller's whole tree.
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Json(req): Json<KeyRequest>,
) -> Result<Json<ApiResponse<VisibilityResponse>>, ApiError> {
    let updated = LockService::new(&state.db)
        .unlock(auth.owner_id(), &req.key)
        .await?;
    let access_token = state.generate_access_token(auth.owner_id(), true)?;

    Ok(Json(ApiResponse::new(VisibilityResponse {
        locked: false,
        folders_updated: updated,
        access_token,
    })))
}

/// POST /api/retrieve - Take over a tree from another device by its key.
///
/// No token is required; the key is the credential.
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let owner = LockService::new(&state.db).retrieve(&req.key).await?;
    let root = state.tree().ensure_root(owner.id).await?;
    let access_token = state.generate_access_token(owner.id, true)?;

    Ok(Json(ApiResponse::new(SessionResponse {
        access_token,
        expires_in: state.access_token_expiry,
        has_key: true,
        owner: OwnerResponse::new(&owner, &root),
    })))
}
