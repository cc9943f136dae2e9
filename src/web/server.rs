//! Web server for filelock.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::FileStorage;
use crate::upload::{spawn_sweeper, ChunkStore, UploadService};
use crate::{Database, FilelockError, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// CORS allowed origins.
    cors_origins: Vec<String>,
    /// Largest request body accepted.
    max_body_size: u64,
    /// Idle time before an upload session expires.
    session_ttl: Duration,
    /// Interval between expiry sweeps.
    sweep_interval: Duration,
}

impl WebServer {
    /// Create a new web server from configuration and an opened database.
    pub fn new(config: &Config, db: Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FilelockError::Config(format!("invalid server address: {e}")))?;

        let storage = FileStorage::new(&config.storage.files_path)?;
        let chunks = ChunkStore::new(&config.storage.staging_path)?;
        tracing::info!("File storage initialized at: {}", config.storage.files_path);

        let max_upload_size = config.storage.max_upload_size();
        let max_chunk_size = config.upload.max_chunk_size();
        let uploads = UploadService::new(db.clone(), storage.clone(), chunks)
            .with_max_upload_size(max_upload_size)
            .with_max_chunk_size(max_chunk_size);

        let app_state = AppState::new(
            db,
            storage,
            uploads,
            &config.server.jwt_secret,
            config.server.access_token_expiry_secs,
        )
        .with_max_upload_size(max_upload_size)
        .with_new_folder_visibility(config.upload.new_folder_visibility);

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&config.server.jwt_secret)),
            cors_origins: config.server.cors_origins.clone(),
            max_body_size: max_upload_size.max(max_chunk_size),
            session_ttl: config.upload.session_ttl(),
            sweep_interval: Duration::from_secs(config.upload.sweep_interval_secs),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete application router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
            self.max_body_size,
        )
        .merge(create_health_router())
    }

    async fn bind(self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;

        // Start the sweeper only after a successful bind
        spawn_sweeper(
            self.app_state.uploads.clone(),
            self.session_ttl,
            self.sweep_interval,
        );
        tracing::info!(
            ttl_secs = self.session_ttl.as_secs(),
            interval_secs = self.sweep_interval.as_secs(),
            "Upload sweeper started"
        );

        tracing::info!("Web server listening on http://{}", listener.local_addr()?);
        Ok((listener, router))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
