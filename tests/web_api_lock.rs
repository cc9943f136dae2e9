//! Web API Lock Tests
//!
//! Integration tests for key generation, lock, unlock and retrieval.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{bearer, create_folder, create_owner, create_test_app, generate_key, upload_file};
use filelock::file::FolderRepository;

async fn post_key(
    server: &axum_test::TestServer,
    path: &str,
    token: &str,
    key: &str,
) -> axum_test::TestResponse {
    let (header, value) = bearer(token);
    server
        .post(path)
        .add_header(header, value)
        .json(&json!({ "key": key }))
        .await
}

async fn visibility(app: &common::TestApp, folder_id: i64) -> bool {
    FolderRepository::new(app.db.pool())
        .get_by_id(folder_id)
        .await
        .unwrap()
        .unwrap()
        .is_visible
}

// ============================================================================
// Key Tests
// ============================================================================

#[tokio::test]
async fn test_generate_key() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let (key, key_token) = generate_key(&app.server, &owner.token).await;
    assert_eq!(key.len(), 128);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!key_token.is_empty());

    let (header, value) = bearer(&owner.token);
    let response = app.server.get("/api/owners/me").add_header(header, value).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["hasKey"], true);
}

#[tokio::test]
async fn test_regenerated_key_replaces_old_one() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let (old_key, _) = generate_key(&app.server, &owner.token).await;
    let (new_key, _) = generate_key(&app.server, &owner.token).await;
    assert_ne!(old_key, new_key);

    let response = post_key(&app.server, "/api/lock", &owner.token, &old_key).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = post_key(&app.server, "/api/lock", &owner.token, &new_key).await;
    response.assert_status_ok();
}

// ============================================================================
// Lock / Unlock Tests
// ============================================================================

#[tokio::test]
async fn test_lock_unlock_round_trip() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    let deep = create_folder(&app.server, &owner.token, docs, "Deep").await;
    let (key, key_token) = generate_key(&app.server, &owner.token).await;

    let response = post_key(&app.server, "/api/lock", &owner.token, &key).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["locked"], true);
    assert_eq!(body["data"]["foldersUpdated"], 3);
    assert!(body["data"]["accessToken"].is_string());

    for id in [owner.root_id, docs, deep] {
        assert!(!visibility(&app, id).await);
    }

    // Without the key nothing opens
    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    // With the key the folder opens and shows its hidden child
    let (header, value) = bearer(&key_token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["folder"]["isVisible"], false);
    assert_eq!(body["data"]["subfolders"][0]["id"], deep);

    let response = post_key(&app.server, "/api/unlock", &owner.token, &key).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["locked"], false);
    assert_eq!(body["data"]["foldersUpdated"], 3);

    for id in [owner.root_id, docs, deep] {
        assert!(visibility(&app, id).await);
    }

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_wrong_key_leaves_tree_unchanged() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    let (key, _) = generate_key(&app.server, &owner.token).await;

    // Well-formed but different
    let wrong: String = key
        .chars()
        .map(|c| if c == '0' { '1' } else { '0' })
        .collect();

    let response = post_key(&app.server, "/api/lock", &owner.token, &wrong).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(visibility(&app, owner.root_id).await);
    assert!(visibility(&app, docs).await);
}

#[tokio::test]
async fn test_malformed_key_rejected() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    generate_key(&app.server, &owner.token).await;

    let response = post_key(&app.server, "/api/lock", &owner.token, "abc123").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .post("/api/lock")
        .add_header(header, value)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lock_without_generated_key_forbidden() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let response = post_key(&app.server, "/api/lock", &owner.token, &"a".repeat(128)).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(visibility(&app, owner.root_id).await);
}

#[tokio::test]
async fn test_other_owners_key_does_not_lock() {
    let app = create_test_app().await;
    let alice = create_owner(&app.server).await;
    let bob = create_owner(&app.server).await;
    generate_key(&app.server, &alice.token).await;
    let (bob_key, _) = generate_key(&app.server, &bob.token).await;

    let response = post_key(&app.server, "/api/lock", &alice.token, &bob_key).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(visibility(&app, alice.root_id).await);
    assert!(visibility(&app, bob.root_id).await);
}

// ============================================================================
// Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_retrieve_by_key() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let (key, _) = generate_key(&app.server, &owner.token).await;

    // Another device has no token at all
    let response = app
        .server
        .post("/api/retrieve")
        .json(&json!({ "key": key }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["owner"]["id"], owner.id);
    assert_eq!(body["data"]["owner"]["rootFolderId"], owner.root_id);
    assert_eq!(body["data"]["hasKey"], true);

    let token = body["data"]["accessToken"].as_str().unwrap();
    let (header, value) = bearer(token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", owner.root_id))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_retrieve_unknown_key() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    generate_key(&app.server, &owner.token).await;

    let response = app
        .server
        .post("/api/retrieve")
        .json(&json!({ "key": "f".repeat(128) }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .post("/api/retrieve")
        .json(&json!({ "key": "short" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_key_must_match_exactly() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let (key, _) = generate_key(&app.server, &owner.token).await;

    let response = app
        .server
        .post("/api/retrieve")
        .json(&json!({ "key": key.to_uppercase() }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = post_key(&app.server, "/api/lock", &owner.token, &format!(" {key}")).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = post_key(&app.server, "/api/lock", &owner.token, &key.to_uppercase()).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert!(visibility(&app, owner.root_id).await);
}

// ============================================================================
// Download Gate Tests
// ============================================================================

#[tokio::test]
async fn test_locked_file_download_requires_key() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let file_id = upload_file(&app.server, &owner.token, owner.root_id, "secret.txt", b"hidden").await;
    let (key, key_token) = generate_key(&app.server, &owner.token).await;

    post_key(&app.server, "/api/lock", &owner.token, &key)
        .await
        .assert_status_ok();

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/files/{}/download", file_id))
        .add_header(header, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (header, value) = bearer(&key_token);
    let response = app
        .server
        .get(&format!("/api/files/{}/download", file_id))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().to_vec(), b"hidden".to_vec());

    // Query token works for plain links
    let response = app
        .server
        .get(&format!("/api/files/{}/download?token={}", file_id, key_token))
        .await;
    response.assert_status_ok();
}
