//! Shared test helpers for Photos Library integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server. The token
//! endpoint lives on the same server under `/token`.

use std::{path::Path, sync::Arc, time::Duration};

use albumcam_photos::{
    client::PhotosClient,
    credentials::{CredentialStore, Credentials, FileCredentialStore},
    provider::{AlbumTarget, PhotosUploadClient},
    retry::RetryPolicy,
    tokens::TokenManager,
};
use chrono::Utc;
use wiremock::{
    matchers::{method, path, query_param_is_missing},
    Mock, MockServer, ResponseTemplate,
};

/// Retry policy that keeps tests fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(10))
}

/// Starts a mock server and returns a client pointing at it
pub async fn setup_photos_mock() -> (MockServer, PhotosClient) {
    let server = MockServer::start().await;
    let client = PhotosClient::with_base_url("test-access-token", server.uri())
        .with_retry_policy(fast_retry());
    (server, client)
}

/// Writes credentials into `dir` whose access token expires in `valid_for`
///
/// A negative duration produces an already-expired token.
pub fn write_credentials(
    server: &MockServer,
    dir: &Path,
    valid_for: chrono::Duration,
) -> Arc<FileCredentialStore> {
    let store = Arc::new(FileCredentialStore::new(dir.join("token.json")));
    store
        .save(&Credentials {
            token: Some("stored-token".into()),
            refresh_token: Some("stored-refresh".into()),
            token_uri: format!("{}/token", server.uri()),
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            scopes: vec!["https://www.googleapis.com/auth/photoslibrary.appendonly".into()],
            expiry: Some(Utc::now() + valid_for),
        })
        .expect("write credentials");
    store
}

/// Builds an upload client against `server` using `store`
pub fn upload_client(
    server: &MockServer,
    store: Arc<FileCredentialStore>,
    album: AlbumTarget,
) -> PhotosUploadClient {
    let client = PhotosClient::with_base_url("", server.uri()).with_retry_policy(fast_retry());
    PhotosUploadClient::new(client, TokenManager::new(store), album)
}

/// Writes a small fake JPEG and returns its path
pub fn write_image(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]).expect("write image");
    path
}

/// Mounts a single-page album listing
pub async fn mount_album_list(server: &MockServer, albums: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/albums"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "albums": albums
        })))
        .mount(server)
        .await;
}

/// Mounts `POST /uploads` returning `upload_token`
pub async fn mount_upload(server: &MockServer, upload_token: &str) {
    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_string(upload_token))
        .mount(server)
        .await;
}

/// Mounts `POST /mediaItems:batchCreate` returning a media item with `media_id`
pub async fn mount_batch_create(server: &MockServer, media_id: &str) {
    Mock::given(method("POST"))
        .and(path("/mediaItems:batchCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "newMediaItemResults": [{
                "uploadToken": "upload-token-1",
                "status": {"message": "Success"},
                "mediaItem": {
                    "id": media_id,
                    "filename": "camera_20250101_090000.jpg",
                    "productUrl": format!("https://photos.google.com/lr/photo/{media_id}")
                }
            }]
        })))
        .mount(server)
        .await;
}

/// Mounts a successful token refresh issuing `access_token`
pub async fn mount_token_refresh(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/photoslibrary.appendonly"
        })))
        .mount(server)
        .await;
}

/// Mounts a failing token refresh with an OAuth error code
pub async fn mount_token_error(server: &MockServer, status: u16, error: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": error,
            "error_description": "Token has been expired or revoked."
        })))
        .mount(server)
        .await;
}
