//! Integration tests for album listing, lookup and creation

use albumcam_photos::{albums, PhotosError};
use wiremock::{
    matchers::{body_json, method, path, query_param, query_param_is_missing},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_list_albums_follows_pagination() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("GET"))
        .and(path("/albums"))
        .and(query_param("pageSize", "50"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "albums": [{"id": "a1", "title": "Garden"}],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/albums"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "albums": [{"id": "a2", "title": "Porch"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let albums = albums::list_albums(&client).await.expect("list albums");
    let ids: Vec<_> = albums.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}

#[tokio::test]
async fn test_list_albums_empty_library() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let albums = albums::list_albums(&client).await.expect("list albums");
    assert!(albums.is_empty());
}

#[tokio::test]
async fn test_ensure_album_finds_existing() {
    let (server, client) = common::setup_photos_mock().await;
    common::mount_album_list(
        &server,
        serde_json::json!([{"id": "a1", "title": "Porch"}, {"id": "a2", "title": "Garden"}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (album, created) = albums::ensure_album(&client, "Garden").await.unwrap();
    assert_eq!(album.id, "a2");
    assert!(!created);
}

#[tokio::test]
async fn test_ensure_album_creates_missing() {
    let (server, client) = common::setup_photos_mock().await;
    common::mount_album_list(&server, serde_json::json!([])).await;

    Mock::given(method("POST"))
        .and(path("/albums"))
        .and(body_json(serde_json::json!({"album": {"title": "Garden"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "new-album",
            "title": "Garden",
            "isWriteable": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (album, created) = albums::ensure_album(&client, "Garden").await.unwrap();
    assert_eq!(album.id, "new-album");
    assert!(created);
}

#[tokio::test]
async fn test_list_albums_unauthorized() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {
                "code": 401,
                "message": "Request had invalid authentication credentials.",
                "status": "UNAUTHENTICATED"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = albums::list_albums(&client).await.unwrap_err();
    assert!(matches!(err, PhotosError::Unauthorized(ref m) if m.contains("UNAUTHENTICATED")));
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_malformed_album_list_is_invalid_response() {
    let (server, client) = common::setup_photos_mock().await;

    Mock::given(method("GET"))
        .and(path("/albums"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = albums::list_albums(&client).await.unwrap_err();
    assert!(matches!(err, PhotosError::InvalidResponse(_)));
}
