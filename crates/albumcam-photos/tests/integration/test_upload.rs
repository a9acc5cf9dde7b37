//! Integration tests for the two-step upload and request retries

use albumcam_photos::{upload, PhotosError};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_upload_image_sends_raw_bytes_then_batch_creates() {
    let (server, client) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let image = common::write_image(dir.path(), "camera_20250101_090000.jpg");

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(header("X-Goog-Upload-Protocol", "raw"))
        .and(header("X-Goog-Upload-Content-Type", "image/jpeg"))
        .and(header("X-Goog-Upload-File-Name", "camera_20250101_090000.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("upload-token-1"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mediaItems:batchCreate"))
        .and(body_json(serde_json::json!({
            "albumId": "album-1",
            "newMediaItems": [{
                "simpleMediaItem": {
                    "uploadToken": "upload-token-1",
                    "fileName": "camera_20250101_090000.jpg"
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "newMediaItemResults": [{
                "uploadToken": "upload-token-1",
                "status": {"message": "Success"},
                "mediaItem": {"id": "media-1"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = upload::upload_image(&client, "album-1", &image)
        .await
        .expect("upload");
    assert_eq!(item.id, "media-1");
}

#[tokio::test]
async fn test_upload_retries_server_errors() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    common::mount_upload(&server, "token-after-retry").await;

    let token = upload::upload_bytes(&client, "a.jpg", "image/jpeg", vec![1, 2, 3].into())
        .await
        .expect("upload after retry");
    assert_eq!(token, "token-after-retry");
}

#[tokio::test]
async fn test_upload_gives_up_after_max_attempts() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(3)
        .mount(&server)
        .await;

    let err = upload::upload_bytes(&client, "a.jpg", "image/jpeg", vec![1].into())
        .await
        .unwrap_err();
    assert!(matches!(err, PhotosError::ServerError(_)));
    assert!(!err.is_auth_expired());
}

#[tokio::test]
async fn test_upload_honours_retry_after() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_upload(&server, "token-after-429").await;

    let token = upload::upload_bytes(&client, "a.jpg", "image/jpeg", vec![1].into())
        .await
        .expect("upload after 429");
    assert_eq!(token, "token-after-429");
}

#[tokio::test]
async fn test_upload_does_not_retry_client_errors() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = upload::upload_bytes(&client, "a.jpg", "image/jpeg", vec![1].into())
        .await
        .unwrap_err();
    assert!(matches!(err, PhotosError::UnexpectedStatus { .. }));
}

#[tokio::test]
async fn test_rejected_media_item_is_invalid_response() {
    let (server, client) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();
    let image = common::write_image(dir.path(), "camera_1.jpg");

    common::mount_upload(&server, "upload-token-1").await;
    Mock::given(method("POST"))
        .and(path("/mediaItems:batchCreate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "newMediaItemResults": [{
                "uploadToken": "upload-token-1",
                "status": {"code": 3, "message": "Failed: There was an error while trying to create this media item."}
            }]
        })))
        .mount(&server)
        .await;

    let err = upload::upload_image(&client, "album-1", &image)
        .await
        .unwrap_err();
    assert!(matches!(err, PhotosError::InvalidResponse(ref m) if m.contains("rejected")));
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let (_server, client) = common::setup_photos_mock().await;
    let dir = tempfile::tempdir().unwrap();

    let err = upload::upload_image(&client, "album-1", &dir.path().join("missing.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, PhotosError::Io(_)));
}
