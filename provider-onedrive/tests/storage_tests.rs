//! Storage driver behaviour against a scripted executor

mod common;

use std::sync::Arc;

use bridge_traits::http::HttpMethod;
use bridge_traits::storage::{MemoryPathStore, Visibility};
use chrono::Utc;
use common::{file, folder, upload_session, ScriptedHttpClient, ROOT_FOLDER};
use core_runtime::config::DriveConfig;
use provider_onedrive::{OneDriveError, OneDriveStorage, StorageResultExt, WriteOptions};

const NOT_FOUND: &str = r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#;

fn public_file(name: &str) -> String {
    format!(
        r#"{{"id":"{name}-id","name":"{name}","size":5,"lastModifiedDateTime":"2024-01-01T00:00:00Z","file":{{"mimeType":"text/plain"}},
            "permissions":[{{"id":"anon","roles":["read"],"link":{{"type":"view","scope":"anonymous","webUrl":"https://1drv.ms/t/{name}"}}}}]}}"#
    )
}

const LINK_CREATED: &str =
    r#"{"id":"anon","roles":["read"],"link":{"type":"view","scope":"anonymous","webUrl":"https://1drv.ms/t/x"}}"#;

fn storage(http: &Arc<ScriptedHttpClient>) -> (OneDriveStorage, Arc<MemoryPathStore>) {
    let store = Arc::new(MemoryPathStore::new());
    let config = DriveConfig::builder()
        .http_client(http.clone())
        .path_store(store.clone())
        .build()
        .unwrap();
    (OneDriveStorage::new(config), store)
}

#[tokio::test]
async fn test_metadata_of_deleted_path_is_file_not_found() {
    let http = ScriptedHttpClient::new();
    http.respond_json(404, NOT_FOUND);
    let (storage, _) = storage(&http);

    let result = storage.get_metadata("gone.txt").await;

    assert!(matches!(result, Err(OneDriveError::FileNotFound { ref path }) if path == "gone.txt"));
    assert_eq!(
        http.requests()[0].url,
        "/me/drive/root:/gone.txt?expand=permissions"
    );
}

#[tokio::test]
async fn test_other_backend_failures_keep_operation_context() {
    let http = ScriptedHttpClient::new();
    http.respond_json(403, r#"{"error":{"code":"accessDenied","message":"Nope"}}"#);
    let (storage, _) = storage(&http);

    let error = storage.get_metadata("secret.txt").await.unwrap_err();

    assert!(matches!(error, OneDriveError::Storage { operation: "get metadata", .. }));
    assert_eq!(error.status(), Some(403));
}

#[tokio::test]
async fn test_publish_then_unpublish_round_trip() {
    let http = ScriptedHttpClient::new();
    http.respond_json(201, LINK_CREATED)
        .respond_json(200, &public_file("a.txt"))
        .respond_json(
            200,
            r#"{"value":[{"id":"anon","roles":["read"],"link":{"scope":"anonymous"}}]}"#,
        )
        .respond_json(204, "")
        .respond_json(200, &file("a.txt", 5));
    let (storage, _) = storage(&http);

    storage
        .set_visibility("a.txt", Visibility::Public)
        .await
        .unwrap();
    let published = storage.get_metadata("a.txt").await.unwrap();
    assert_eq!(published.visibility, Visibility::Public);
    assert_eq!(published.share_link.as_deref(), Some("https://1drv.ms/t/a.txt"));

    storage
        .set_visibility("a.txt", Visibility::Private)
        .await
        .unwrap();
    let unpublished = storage.get_metadata("a.txt").await.unwrap();
    assert_eq!(unpublished.visibility, Visibility::Private);
    assert_eq!(unpublished.share_link, None);

    let requests = http.requests();
    assert_eq!(requests[0].url, "/me/drive/root:/a.txt:/createLink");
    assert_eq!(requests[3].method, HttpMethod::Delete);
    assert_eq!(requests[3].url, "/me/drive/root:/a.txt:/permissions/anon");
}

#[tokio::test]
async fn test_unknown_visibility_rejected_without_requests() {
    let http = ScriptedHttpClient::new();
    let (storage, _) = storage(&http);

    let result = storage.set_visibility_str("a.txt", "unlisted").await;

    assert!(matches!(result, Err(OneDriveError::InvalidVisibility(_))));
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn test_delete_maps_not_found() {
    let http = ScriptedHttpClient::new();
    http.respond_json(404, NOT_FOUND);
    let (storage, _) = storage(&http);

    let result = storage.delete("gone.txt").await;

    assert!(matches!(result, Err(OneDriveError::FileNotFound { .. })));
    assert!(!storage.delete_directory("/").await.succeeded());
    assert_eq!(http.request_count(), 1);
}

#[tokio::test]
async fn test_create_directory_over_file_fails() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &file("report", 10));
    let (storage, _) = storage(&http);

    let error = storage.create_directory("report").await.unwrap_err();

    match error {
        OneDriveError::Storage {
            operation, message, ..
        } => {
            assert_eq!(operation, "create directory");
            assert!(message.contains("File already exists"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_copy_carries_source_visibility() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &folder("backup"))
        .respond_json(202, "")
        .respond_json(200, &public_file("a.txt"))
        .respond_json(201, LINK_CREATED);
    let (storage, _) = storage(&http);

    storage.copy("a.txt", "backup/a.txt").await.unwrap();

    let requests = http.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].url, "/me/drive/root:/backup");
    assert_eq!(requests[1].url, "/me/drive/root:/a.txt:/copy");
    assert_eq!(requests[2].url, "/me/drive/root:/a.txt?expand=permissions");
    assert_eq!(requests[3].url, "/me/drive/root:/backup/a.txt:/createLink");
}

#[tokio::test]
async fn test_write_applies_visibility_option() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, ROOT_FOLDER)
        .respond_json(200, &upload_session("https://up.example.com/s/9"))
        .respond_json(201, &file("notes.txt", 5))
        .respond_json(201, LINK_CREATED);
    let (storage, _) = storage(&http);

    storage
        .write(
            "notes.txt",
            &b"hello"[..],
            WriteOptions::with_visibility(Visibility::Public),
        )
        .await
        .unwrap();

    let requests = http.requests();
    assert_eq!(requests[2].headers["Content-Range"], "bytes 0-4/5");
    assert_eq!(requests[3].url, "/me/drive/root:/notes.txt:/createLink");
}

#[tokio::test]
async fn test_write_rejects_reserved_characters_before_network() {
    let http = ScriptedHttpClient::new();
    let (storage, _) = storage(&http);

    let result = storage
        .write("what?.txt", &b"x"[..], WriteOptions::default())
        .await;

    assert!(matches!(
        result,
        Err(OneDriveError::InvalidPath { character: '?', .. })
    ));
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn test_metadata_cache_write_through_and_invalidation() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &file("a.txt", 5))
        .respond_json(204, "")
        .respond_json(404, NOT_FOUND);
    let (storage, store) = storage(&http);

    storage.get_metadata("docs/../a.txt").await.unwrap();
    assert_eq!(store.len(), 1);

    let cached = storage.cached_metadata("/a.txt").await.unwrap();
    assert_eq!(cached.file_size, 5);
    assert_eq!(http.request_count(), 1);

    storage.delete("a.txt").await.unwrap();
    assert!(store.is_empty());

    let result = storage.cached_metadata("a.txt").await;
    assert!(matches!(result, Err(OneDriveError::FileNotFound { .. })));
    assert_eq!(http.request_count(), 3);
}

#[tokio::test]
async fn test_existence_checks() {
    let http = ScriptedHttpClient::new();
    http.respond_json(404, NOT_FOUND)
        .respond_json(200, &folder("docs"))
        .respond_json(200, &folder("docs"));
    let (storage, _) = storage(&http);

    assert!(!storage.file_exists("missing.txt").await.unwrap());
    assert!(storage.directory_exists("docs").await.unwrap());
    assert!(!storage.file_exists("docs").await.unwrap());
}

#[tokio::test]
async fn test_temporary_url() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &file("a.bin", 1))
        .respond_json(200, &folder("docs"));
    let (storage, _) = storage(&http);
    let expires = Utc::now() + chrono::Duration::hours(1);

    assert_eq!(
        storage.temporary_url("a.bin", expires).await.unwrap(),
        "https://dl.example.com/a.bin"
    );
    assert_eq!(storage.temporary_url("docs", expires).await.unwrap(), "");
}

#[tokio::test]
async fn test_read_returns_content() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, "file body");
    let (storage, _) = storage(&http);

    let bytes = storage.read("notes.txt").await.unwrap();

    assert_eq!(&bytes[..], b"file body");
    assert_eq!(http.requests()[0].url, "/me/drive/root:/notes.txt:/content");
}

#[tokio::test]
async fn test_move_into_new_folder() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &folder("archive"))
        .respond_json(200, &file("old.txt", 5));
    let (storage, _) = storage(&http);

    storage.move_item("old.txt", "archive/old.txt").await.unwrap();

    let requests = http.requests();
    assert_eq!(requests[0].method, HttpMethod::Patch);
    assert_eq!(requests[0].url, "/me/drive/root:/archive");
    assert_eq!(requests[1].url, "/me/drive/root:/old.txt");
}

#[tokio::test]
async fn test_delete_targets_name_with_hash() {
    let http = ScriptedHttpClient::new();
    http.respond_json(204, "");
    let (storage, _) = storage(&http);

    storage.delete("reports/q1#final.pdf").await.unwrap();

    let requests = http.requests();
    assert_eq!(requests[0].method, HttpMethod::Delete);
    assert_eq!(requests[0].url, "/me/drive/root:/reports/q1%23final.pdf");
}

#[tokio::test]
async fn test_move_encodes_parent_reference() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &folder("my docs"))
        .respond_json(200, &file("50% off.txt", 5));
    let (storage, _) = storage(&http);

    storage
        .move_item("x#y.txt", "my docs/50% off.txt")
        .await
        .unwrap();

    let requests = http.requests();
    assert_eq!(requests[0].url, "/me/drive/root:/my%20docs");
    assert_eq!(requests[1].url, "/me/drive/root:/x%23y.txt");
    let body: serde_json::Value =
        serde_json::from_slice(requests[1].body.as_ref().unwrap()).unwrap();
    assert_eq!(body["name"], "50% off.txt");
    assert_eq!(body["parentReference"]["path"], "/me/drive/root:/my%20docs");
}

#[tokio::test]
async fn test_delete_directory_invalidates_cached_descendants() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &file("b.txt", 5))
        .respond_json(204, "")
        .respond_json(404, NOT_FOUND);
    let (storage, store) = storage(&http);

    storage.get_metadata("dir/b.txt").await.unwrap();
    storage.delete_directory("dir").await.unwrap();
    assert!(store.is_empty());

    let result = storage.cached_metadata("dir/b.txt").await;
    assert!(matches!(result, Err(OneDriveError::FileNotFound { .. })));
    assert_eq!(http.request_count(), 3);
}

#[tokio::test]
async fn test_move_invalidates_cached_descendants() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &file("b.txt", 5))
        .respond_json(200, &file("keep.txt", 1))
        .respond_json(200, &folder("archive"))
        .respond_json(200, &folder("dir"))
        .respond_json(404, NOT_FOUND);
    let (storage, store) = storage(&http);

    storage.get_metadata("dir/b.txt").await.unwrap();
    storage.get_metadata("dir2/keep.txt").await.unwrap();
    storage.move_item("dir", "archive/dir").await.unwrap();
    assert_eq!(store.len(), 1);

    let result = storage.cached_metadata("dir/b.txt").await;
    assert!(matches!(result, Err(OneDriveError::FileNotFound { .. })));
    assert_eq!(http.request_count(), 5);
}

#[tokio::test]
async fn test_copy_of_private_source_skips_visibility_update() {
    let http = ScriptedHttpClient::new();
    http.respond_json(200, &folder("backup"))
        .respond_json(202, "")
        .respond_json(200, &file("a.txt", 5))
        // the copy is still in flight, so the destination is not there yet
        .respond_json(404, NOT_FOUND);
    let (storage, _) = storage(&http);

    storage.copy("a.txt", "backup/a.txt").await.unwrap();

    assert_eq!(http.request_count(), 3);
    assert_eq!(http.remaining(), 1);
}
