//! Integration tests for PhotosUploadClient: token lifecycle, album
//! resolution, and the UploadOutcome each failure maps to

use albumcam_core::{domain::UploadOutcome, ports::IUploadClient};
use albumcam_photos::{credentials::CredentialStore, provider::AlbumTarget};
use chrono::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_upload_with_valid_token_succeeds() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_20250101_090000.jpg");

    common::mount_album_list(&server, serde_json::json!([{"id": "album-1", "title": "Garden"}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("upload-token-1"))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_batch_create(&server, "media-1").await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    let outcome = client.upload(&image).await;

    assert_eq!(outcome, UploadOutcome::success("media-1"));
}

#[tokio::test]
async fn test_album_is_resolved_once() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));

    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "albums": [{"id": "album-1", "title": "Garden"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_upload(&server, "upload-token-1").await;
    common::mount_batch_create(&server, "media-1").await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    for name in ["camera_1.jpg", "camera_2.jpg"] {
        let image = common::write_image(dir.path(), name);
        assert!(matches!(
            client.upload(&image).await,
            UploadOutcome::Success { .. }
        ));
    }
}

#[tokio::test]
async fn test_known_album_id_skips_lookup() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    common::mount_upload(&server, "upload-token-1").await;
    common::mount_batch_create(&server, "media-1").await;

    let album = AlbumTarget {
        title: "Garden".into(),
        id: Some("album-known".into()),
    };
    let client = common::upload_client(&server, store, album);
    assert_eq!(client.upload(&image).await, UploadOutcome::success("media-1"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_persisted() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::minutes(-10));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_token_refresh(&server, "fresh-token").await;
    common::mount_album_list(&server, serde_json::json!([{"id": "album-1", "title": "Garden"}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("upload-token-1"))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_batch_create(&server, "media-1").await;

    let client = common::upload_client(&server, store.clone(), AlbumTarget::titled("Garden"));
    assert_eq!(client.upload(&image).await, UploadOutcome::success("media-1"));

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.token.as_deref(), Some("fresh-token"));
    assert_eq!(saved.refresh_token.as_deref(), Some("stored-refresh"));
    assert!(saved.expiry.unwrap() > chrono::Utc::now());
}

#[tokio::test]
async fn test_invalid_grant_is_auth_expired_without_upload() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::minutes(-10));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_token_error(&server, 400, "invalid_grant").await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    let outcome = client.upload(&image).await;

    assert!(outcome.is_auth_expired(), "got {outcome}");
}

#[tokio::test]
async fn test_invalid_client_is_auth_expired() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::minutes(-10));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_token_error(&server, 401, "invalid_client").await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    assert!(client.upload(&image).await.is_auth_expired());
}

#[tokio::test]
async fn test_token_endpoint_outage_is_transient() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::minutes(-10));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    let outcome = client.upload(&image).await;

    assert!(
        matches!(outcome, UploadOutcome::TransientFailure { .. }),
        "got {outcome}"
    );
}

#[tokio::test]
async fn test_missing_credentials_is_auth_expired() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(albumcam_photos::credentials::FileCredentialStore::new(
        dir.path().join("absent.json"),
    ));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    assert!(client.upload(&image).await.is_auth_expired());
}

#[tokio::test]
async fn test_corrupt_credentials_is_auth_expired() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    std::fs::write(&token_path, r#"{"refresh_token":"x"}"#).unwrap();
    let store = std::sync::Arc::new(albumcam_photos::credentials::FileCredentialStore::new(
        token_path,
    ));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    for _ in 0..3 {
        let outcome = client.upload(&image).await;
        assert!(outcome.is_auth_expired(), "got {outcome}");
    }
}

#[tokio::test]
async fn test_rejected_token_refreshes_once_then_succeeds() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_token_refresh(&server, "fresh-token").await;
    Mock::given(method("GET"))
        .and(path("/albums"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/albums"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "albums": [{"id": "album-1", "title": "Garden"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_upload(&server, "upload-token-1").await;
    common::mount_batch_create(&server, "media-1").await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    assert_eq!(client.upload(&image).await, UploadOutcome::success("media-1"));
}

#[tokio::test]
async fn test_persistent_401_is_auth_expired() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_token_refresh(&server, "fresh-token").await;
    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    assert!(client.upload(&image).await.is_auth_expired());
}

#[tokio::test]
async fn test_forbidden_is_auth_expired() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_album_list(&server, serde_json::json!([{"id": "album-1", "title": "Garden"}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {"code": 403, "message": "Request had insufficient authentication scopes.", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    assert!(client.upload(&image).await.is_auth_expired());
}

#[tokio::test]
async fn test_server_outage_is_transient_after_retries() {
    let (server, _) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let store = common::write_credentials(&server, dir.path(), Duration::hours(1));
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_album_list(&server, serde_json::json!([{"id": "album-1", "title": "Garden"}]))
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = common::upload_client(&server, store, AlbumTarget::titled("Garden"));
    let outcome = client.upload(&image).await;

    assert!(matches!(outcome, UploadOutcome::TransientFailure { .. }));
}
