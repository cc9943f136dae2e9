//! Owner and session handlers.

use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::config::NewFolderVisibility;
use crate::db::{NewOwner, OwnerRepository};
use crate::file::{FileStorage, FolderTree};
use crate::upload::UploadService;
use crate::web::dto::{ApiResponse, OwnerResponse, SessionResponse};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthOwner, OwnerClaims};
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Permanent file storage.
    pub storage: FileStorage,
    /// Chunked upload service.
    pub uploads: UploadService,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Maximum size of a direct upload in bytes.
    pub max_upload_size: u64,
    /// Visibility policy for new folders.
    pub new_folder_visibility: NewFolderVisibility,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Database,
        storage: FileStorage,
        uploads: UploadService,
        jwt_secret: &str,
        access_expiry: u64,
    ) -> Self {
        Self {
            db,
            storage,
            uploads,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
            max_upload_size: crate::file::DEFAULT_MAX_FILE_SIZE,
            new_folder_visibility: NewFolderVisibility::default(),
        }
    }

    /// Set the maximum direct upload size in bytes.
    pub fn with_max_upload_size(mut self, max_size: u64) -> Self {
        self.max_upload_size = max_size;
        self
    }

    /// Set the visibility policy for new folders.
    pub fn with_new_folder_visibility(mut self, policy: NewFolderVisibility) -> Self {
        self.new_folder_visibility = policy;
        self
    }

    /// A folder tree service configured from this state.
    pub fn tree(&self) -> FolderTree<'_> {
        FolderTree::new(&self.db, &self.storage)
            .with_new_folder_visibility(self.new_folder_visibility)
            .with_max_file_size(self.max_upload_size)
    }

    /// Generate an access token for an owner.
    pub fn generate_access_token(&self, owner_id: i64, has_key: bool) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = OwnerClaims {
            sub: owner_id,
            has_key,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }
}

/// POST /api/owners - Create an anonymous owner with an empty root folder.
pub async fn create_owner(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let owner = OwnerRepository::new(state.db.pool())
        .create(&NewOwner::anonymous())
        .await?;
    let root = state.tree().ensure_root(owner.id).await?;

    let access_token = state.generate_access_token(owner.id, false)?;
    tracing::info!(owner_id = owner.id, root_id = root.id, "Created owner");

    let response = SessionResponse {
        access_token,
        expires_in: state.access_token_expiry,
        has_key: false,
        owner: OwnerResponse::new(&owner, &root),
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// GET /api/owners/me - Current owner information.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
) -> Result<Json<ApiResponse<OwnerResponse>>, ApiError> {
    let owner = OwnerRepository::new(state.db.pool())
        .get_by_id(auth.owner_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Owner not found"))?;
    let root = state.tree().ensure_root(owner.id).await?;

    Ok(Json(ApiResponse::new(OwnerResponse::new(&owner, &root))))
}
