//! Web API Folder/File Tests
//!
//! Integration tests for folder browsing, deletion, archives and uploads.

mod common;

use std::io::{Cursor, Read};

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

use common::{bearer, create_folder, create_owner, create_test_app, upload_file};

// ============================================================================
// Owner Tests
// ============================================================================

#[tokio::test]
async fn test_create_owner_with_root() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", owner.root_id))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["folder"]["name"], "Root");
    assert!(body["data"]["folder"]["parentId"].is_null());
    assert_eq!(body["data"]["subfolders"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = create_test_app().await;

    let response = app.server.get("/api/owners/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (header, value) = bearer("garbage");
    let response = app.server.get("/api/owners/me").add_header(header, value).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Folder Tests
// ============================================================================

#[tokio::test]
async fn test_create_folder_defaults_to_root() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .post("/api/folders")
        .add_header(header, value)
        .json(&json!({ "name": "Photos" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["data"]["parentId"], owner.root_id);
    assert_eq!(body["data"]["isVisible"], true);
}

#[tokio::test]
async fn test_create_folder_validation() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .post("/api/folders")
        .add_header(header, value)
        .json(&json!({ "parentId": owner.root_id, "name": "   " }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["name"].is_array());
}

#[tokio::test]
async fn test_view_folder_path_and_contents() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    let work = create_folder(&app.server, &owner.token, docs, "Work").await;
    upload_file(&app.server, &owner.token, docs, "notes.TXT", b"hello").await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();

    let path: Vec<i64> = body["data"]["path"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();
    assert_eq!(path, vec![owner.root_id, docs]);
    assert_eq!(body["data"]["subfolders"][0]["id"], work);
    assert_eq!(body["data"]["files"][0]["name"], "notes.TXT");
    assert_eq!(body["data"]["files"][0]["fileType"], "txt");
    assert_eq!(body["data"]["files"][0]["size"], 5);
}

#[tokio::test]
async fn test_rename_folder() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .put(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .json(&json!({ "name": "Papers" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["name"], "Papers");
}

#[tokio::test]
async fn test_other_owners_folder_forbidden() {
    let app = create_test_app().await;
    let alice = create_owner(&app.server).await;
    let bob = create_owner(&app.server).await;

    let (header, value) = bearer(&bob.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", alice.root_id))
        .add_header(header, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (header, value) = bearer(&bob.token);
    let response = app
        .server
        .get("/api/folders/999999")
        .add_header(header, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_folder_recursively() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    let work = create_folder(&app.server, &owner.token, docs, "Work").await;
    let old = create_folder(&app.server, &owner.token, work, "Old").await;
    upload_file(&app.server, &owner.token, docs, "a.txt", b"a").await;
    let nested = upload_file(&app.server, &owner.token, old, "b.txt", b"b").await;
    let kept = upload_file(&app.server, &owner.token, owner.root_id, "c.txt", b"c").await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .delete(&format!("/api/folders/{}", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["foldersDeleted"], 3);
    assert_eq!(body["data"]["filesDeleted"], 2);

    for id in [docs, work, old] {
        let (header, value) = bearer(&owner.token);
        app.server
            .get(&format!("/api/folders/{}", id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    let (header, value) = bearer(&owner.token);
    app.server
        .get(&format!("/api/files/{}", nested))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let (header, value) = bearer(&owner.token);
    app.server
        .get(&format!("/api/files/{}", kept))
        .add_header(header, value)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_delete_root_conflict() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    upload_file(&app.server, &owner.token, owner.root_id, "keep.txt", b"k").await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .delete(&format!("/api/folders/{}", owner.root_id))
        .add_header(header, value)
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}", owner.root_id))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_file() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let file_id = upload_file(&app.server, &owner.token, owner.root_id, "gone.txt", b"x").await;

    let (header, value) = bearer(&owner.token);
    app.server
        .delete(&format!("/api/files/{}", file_id))
        .add_header(header, value)
        .await
        .assert_status_ok();

    let (header, value) = bearer(&owner.token);
    app.server
        .get(&format!("/api/files/{}/download", file_id))
        .add_header(header, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// ============================================================================
// Archive Tests
// ============================================================================

#[tokio::test]
async fn test_download_folder_archive() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    let work = create_folder(&app.server, &owner.token, docs, "Work").await;
    upload_file(&app.server, &owner.token, docs, "a.txt", b"alpha").await;
    upload_file(&app.server, &owner.token, work, "b.txt", b"beta").await;

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}/archive", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/zip");
    assert_eq!(response.header("x-archive-skipped"), "0");
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .contains("Docs.zip"));

    let mut archive = zip::ZipArchive::new(Cursor::new(response.as_bytes().to_vec())).unwrap();
    assert_eq!(archive.len(), 2);

    let mut content = String::new();
    archive
        .by_name("Docs/a.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "alpha");

    let mut content = String::new();
    archive
        .by_name("Docs/Work/b.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "beta");
}

#[tokio::test]
async fn test_archive_skips_missing_content() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;
    let docs = create_folder(&app.server, &owner.token, owner.root_id, "Docs").await;
    upload_file(&app.server, &owner.token, docs, "present.txt", b"here").await;
    let lost = upload_file(&app.server, &owner.token, docs, "lost.txt", b"gone").await;

    let file = filelock::file::FileRepository::new(app.db.pool())
        .get_by_id(lost)
        .await
        .unwrap()
        .unwrap();
    app.storage.delete(&file.stored_name).await.unwrap();

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .get(&format!("/api/folders/{}/archive", docs))
        .add_header(header, value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-archive-skipped"), "1");

    let archive = zip::ZipArchive::new(Cursor::new(response.as_bytes().to_vec())).unwrap();
    assert_eq!(archive.len(), 1);
}

// ============================================================================
// Direct Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_multiple_files() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let form = MultipartForm::new()
        .add_part("file", Part::bytes(b"one".to_vec()).file_name("one.txt"))
        .add_part("file", Part::bytes(b"two".to_vec()).file_name("two.txt"));

    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .post(&format!("/api/folders/{}/files", owner.root_id))
        .add_header(header, value)
        .multipart(form)
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["data"]["files"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_upload_without_file_rejected() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let form = MultipartForm::new().add_text("note", "nothing here");
    let (header, value) = bearer(&owner.token);
    let response = app
        .server
        .post(&format!("/api/folders/{}/files", owner.root_id))
        .add_header(header, value)
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mobile_upload_into_root() {
    let app = create_test_app().await;
    let owner = create_owner(&app.server).await;

    let form = MultipartForm::new()
        .add_text("auto_backup", "true")
        .add_part("file", Part::bytes(b"photo".to_vec()).file_name("IMG_0001.jpg"));

    let response = app
        .server
        .post(&format!("/api/mobile-upload/{}", owner.id))
        .multipart(form)
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Auto-backup completed"));
    assert_eq!(body["data"]["files"][0]["folderId"], owner.root_id);
    assert_eq!(body["data"]["files"][0]["fileType"], "jpg");
}

#[tokio::test]
async fn test_mobile_upload_unknown_owner() {
    let app = create_test_app().await;

    let form = MultipartForm::new()
        .add_part("file", Part::bytes(b"photo".to_vec()).file_name("IMG_0001.jpg"));
    let response = app
        .server
        .post("/api/mobile-upload/424242")
        .multipart(form)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
