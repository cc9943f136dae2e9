//! Test helpers for web API integration tests.
//!
//! Provides a TestApp wrapping an in-memory database, temporary storage and
//! an axum-test server, plus helpers for the common request shapes.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use filelock::file::FileStorage;
use filelock::upload::{ChunkStore, UploadService};
use filelock::web::handlers::AppState;
use filelock::web::middleware::JwtState;
use filelock::web::router::create_router;
use filelock::Database;

/// JWT secret used by every test server.
pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

/// Upload size limit used by every test server.
pub const TEST_MAX_UPLOAD: u64 = 1024 * 1024;

/// A running test application.
pub struct TestApp {
    /// The HTTP test server.
    pub server: TestServer,
    /// The database behind it.
    pub db: Database,
    /// Permanent file storage.
    pub storage: FileStorage,
    _dir: TempDir,
}

/// An owner created through the API.
#[derive(Debug, Clone)]
pub struct TestOwner {
    /// Owner ID.
    pub id: i64,
    /// Root folder ID.
    pub root_id: i64,
    /// Access token without key privileges.
    pub token: String,
}

/// Create a test application with an in-memory database.
pub async fn create_test_app() -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");

    let storage = FileStorage::new(dir.path().join("files")).expect("Failed to create storage");
    let chunks = ChunkStore::new(dir.path().join("staging")).expect("Failed to create staging");
    let uploads = UploadService::new(db.clone(), storage.clone(), chunks)
        .with_max_upload_size(TEST_MAX_UPLOAD);

    let app_state = Arc::new(
        AppState::new(db.clone(), storage.clone(), uploads, TEST_SECRET, 900)
            .with_max_upload_size(TEST_MAX_UPLOAD),
    );
    let jwt_state = Arc::new(JwtState::new(TEST_SECRET));

    let router = create_router(app_state, jwt_state, &[], TEST_MAX_UPLOAD);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        db,
        storage,
        _dir: dir,
    }
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token header"),
    )
}

/// Create an anonymous owner.
pub async fn create_owner(server: &TestServer) -> TestOwner {
    let response = server.post("/api/owners").await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body = response.json::<Value>();
    TestOwner {
        id: body["data"]["owner"]["id"].as_i64().unwrap(),
        root_id: body["data"]["owner"]["rootFolderId"].as_i64().unwrap(),
        token: body["data"]["accessToken"].as_str().unwrap().to_string(),
    }
}

/// Generate a key; returns the key and a key-holding token.
pub async fn generate_key(server: &TestServer, token: &str) -> (String, String) {
    let (name, value) = bearer(token);
    let response = server.post("/api/key").add_header(name, value).await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    (
        body["data"]["key"].as_str().unwrap().to_string(),
        body["data"]["accessToken"].as_str().unwrap().to_string(),
    )
}

/// Create a folder and return its ID.
pub async fn create_folder(server: &TestServer, token: &str, parent_id: i64, name: &str) -> i64 {
    let (header, value) = bearer(token);
    let response = server
        .post("/api/folders")
        .add_header(header, value)
        .json(&json!({ "parentId": parent_id, "name": name }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["id"].as_i64().unwrap()
}

/// Upload one file directly into a folder and return its ID.
pub async fn upload_file(
    server: &TestServer,
    token: &str,
    folder_id: i64,
    filename: &str,
    content: &[u8],
) -> i64 {
    let (header, value) = bearer(token);
    let form = MultipartForm::new()
        .add_part("file", Part::bytes(content.to_vec()).file_name(filename.to_string()));

    let response = server
        .post(&format!("/api/folders/{}/files", folder_id))
        .add_header(header, value)
        .multipart(form)
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"]["files"][0]["id"]
        .as_i64()
        .unwrap()
}

/// Send one chunk of a chunked upload.
pub async fn send_chunk(
    server: &TestServer,
    token: &str,
    upload_id: &str,
    index: i64,
    bytes: &[u8],
) -> axum_test::TestResponse {
    let (header, value) = bearer(token);
    let form = MultipartForm::new()
        .add_text("chunkIndex", index.to_string())
        .add_part("chunk", Part::bytes(bytes.to_vec()).file_name("blob"));

    server
        .post(&format!("/api/upload/chunk/{}", upload_id))
        .add_header(header, value)
        .multipart(form)
        .await
}
