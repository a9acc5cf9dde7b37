//! Album operations
//!
//! Google Photos only lets an app list and write albums the app created
//! itself, so the target album is looked up among app-created albums by
//! title and created if missing.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::{client::PhotosClient, PhotosError};

/// Albums requested per page
const ALBUM_PAGE_SIZE: &str = "50";

/// A Photos album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub product_url: Option<String>,
    /// Sent by the API as a string
    #[serde(default)]
    pub media_items_count: Option<String>,
    #[serde(default)]
    pub is_writeable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumListResponse {
    #[serde(default)]
    albums: Vec<Album>,
    next_page_token: Option<String>,
}

/// Lists every album, following `nextPageToken` until exhausted
pub async fn list_albums(client: &PhotosClient) -> Result<Vec<Album>, PhotosError> {
    let mut albums = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page: AlbumListResponse = {
            let mut query = vec![("pageSize", ALBUM_PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            client.get_json("/albums", &query).await?
        };
        debug!(count = page.albums.len(), "Fetched album page");
        albums.extend(page.albums);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    Ok(albums)
}

/// Finds the first album whose title matches exactly
pub async fn find_album(client: &PhotosClient, title: &str) -> Result<Option<Album>, PhotosError> {
    Ok(list_albums(client)
        .await?
        .into_iter()
        .find(|album| album.title == title))
}

/// Creates a new album
pub async fn create_album(client: &PhotosClient, title: &str) -> Result<Album, PhotosError> {
    let album: Album = client
        .post_json("/albums", &json!({ "album": { "title": title } }))
        .await?;
    if album.id.is_empty() {
        return Err(PhotosError::InvalidResponse(
            "album creation returned an empty id".to_string(),
        ));
    }
    info!(id = %album.id, title = %album.title, "Created album");
    Ok(album)
}

/// Returns the album titled `title`, creating it if it does not exist
///
/// # Returns
/// The album and whether it was created by this call
pub async fn ensure_album(client: &PhotosClient, title: &str) -> Result<(Album, bool), PhotosError> {
    if let Some(album) = find_album(client, title).await? {
        debug!(id = %album.id, title, "Found existing album");
        return Ok((album, false));
    }
    info!(title, "Album not found, creating it");
    Ok((create_album(client, title).await?, true))
}
