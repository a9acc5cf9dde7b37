//! Media uploads
//!
//! Uploading is two requests:
//! 1. `POST /uploads` with the raw bytes returns an opaque upload token.
//! 2. `POST /mediaItems:batchCreate` turns the token into a media item in
//!    the target album.
//!
//! Both go through [`PhotosClient::execute`], so transient failures are
//! retried per request.

use std::path::Path;

use hyper::body::Bytes;
use reqwest::{header::CONTENT_TYPE, Method};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{client::PhotosClient, PhotosError};

/// A media item created in the library
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateRequest<'a> {
    album_id: &'a str,
    new_media_items: Vec<NewMediaItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItem<'a> {
    simple_media_item: SimpleMediaItem<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleMediaItem<'a> {
    upload_token: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateResponse {
    #[serde(default)]
    new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItemResult {
    #[serde(default)]
    status: Option<ItemStatus>,
    #[serde(default)]
    media_item: Option<MediaItem>,
}

/// `google.rpc.Status`; a missing or zero code means OK
#[derive(Debug, Deserialize)]
struct ItemStatus {
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    message: String,
}

/// Guesses the MIME type from the file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Uploads raw bytes and returns the upload token
pub async fn upload_bytes(
    client: &PhotosClient,
    file_name: &str,
    mime_type: &str,
    data: Bytes,
) -> Result<String, PhotosError> {
    debug!(file_name, size = data.len(), "Uploading bytes");

    let response = client
        .execute(|| {
            client
                .request(Method::POST, "/uploads")
                .header(CONTENT_TYPE, "application/octet-stream")
                .header("X-Goog-Upload-Content-Type", mime_type)
                .header("X-Goog-Upload-File-Name", file_name)
                .header("X-Goog-Upload-Protocol", "raw")
                .body(data.clone())
        })
        .await?;

    let token = response.text().await?.trim().to_string();
    if token.is_empty() {
        return Err(PhotosError::InvalidResponse(
            "upload returned an empty upload token".to_string(),
        ));
    }
    Ok(token)
}

/// Creates a media item from an upload token inside `album_id`
pub async fn create_media_item(
    client: &PhotosClient,
    album_id: &str,
    upload_token: &str,
    file_name: &str,
) -> Result<MediaItem, PhotosError> {
    let request = BatchCreateRequest {
        album_id,
        new_media_items: vec![NewMediaItem {
            simple_media_item: SimpleMediaItem {
                upload_token,
                file_name,
            },
        }],
    };

    let response: BatchCreateResponse = client
        .post_json("/mediaItems:batchCreate", &request)
        .await?;

    let result = response
        .new_media_item_results
        .into_iter()
        .next()
        .ok_or_else(|| PhotosError::InvalidResponse("batchCreate returned no results".into()))?;

    if let Some(status) = &result.status {
        if status.code.is_some_and(|code| code != 0) {
            return Err(PhotosError::InvalidResponse(format!(
                "media item rejected: {}",
                status.message
            )));
        }
    }

    result
        .media_item
        .ok_or_else(|| PhotosError::InvalidResponse("batchCreate result has no media item".into()))
}

/// Uploads the image at `path` into `album_id`
pub async fn upload_image(
    client: &PhotosClient,
    album_id: &str,
    path: &Path,
) -> Result<MediaItem, PhotosError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image.jpg")
        .to_string();
    let data = Bytes::from(tokio::fs::read(path).await?);

    let upload_token = upload_bytes(client, &file_name, mime_type_for(path), data).await?;
    let item = create_media_item(client, album_id, &upload_token, &file_name).await?;

    info!(
        path = %path.display(),
        media_item = %item.id,
        "Uploaded image to photo library"
    );
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a/camera_1.jpg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("b.JPEG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("c.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_batch_create_request_shape() {
        let request = BatchCreateRequest {
            album_id: "album-1",
            new_media_items: vec![NewMediaItem {
                simple_media_item: SimpleMediaItem {
                    upload_token: "tok",
                    file_name: "camera_1.jpg",
                },
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "albumId": "album-1",
                "newMediaItems": [
                    {"simpleMediaItem": {"uploadToken": "tok", "fileName": "camera_1.jpg"}}
                ]
            })
        );
    }

    #[test]
    fn test_batch_create_response_with_ok_status() {
        let json = r#"{"newMediaItemResults": [{
            "uploadToken": "tok",
            "status": {"message": "Success"},
            "mediaItem": {"id": "media-1", "filename": "camera_1.jpg"}
        }]}"#;
        let response: BatchCreateResponse = serde_json::from_str(json).unwrap();
        let result = &response.new_media_item_results[0];
        assert!(result.status.as_ref().unwrap().code.is_none());
        assert_eq!(result.media_item.as_ref().unwrap().id, "media-1");
    }
}
