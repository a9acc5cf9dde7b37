//! PhotosUploadClient - IUploadClient implementation for Google Photos
//!
//! Combines the [`TokenManager`], album resolution and the two-step upload,
//! and turns the result into the typed [`UploadOutcome`] the containment
//! controller consumes. This is the only place where a [`PhotosError`]
//! is classified as fatal or transient.
//!
//! ## Design Notes
//!
//! - The client sits behind a `tokio::sync::Mutex` because
//!   [`IUploadClient::upload`] takes `&self` while the access token and the
//!   cached album id change over time.
//! - A 401 from the API triggers one forced token refresh and a single
//!   retry. If the refresh fails permanently, or the retry is rejected
//!   again, the outcome is `AuthExpired`.

use std::{path::Path, sync::Arc, time::Duration};

use albumcam_core::{
    config::{GooglePhotosConfig, TokenStorageKind},
    domain::UploadOutcome,
    ports::IUploadClient,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    albums,
    client::PhotosClient,
    credentials::{CredentialStore, FileCredentialStore, KeyringCredentialStore},
    retry::RetryPolicy,
    tokens::TokenManager,
    upload::{self, MediaItem},
    PhotosError,
};

/// Which album uploads go to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumTarget {
    /// Looked up (and created if missing) when no id is known
    pub title: String,
    /// Known album id; skips the lookup
    pub id: Option<String>,
}

impl AlbumTarget {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: None,
        }
    }
}

/// Mutable per-client state, guarded together
struct UploadState {
    client: PhotosClient,
    album_id: Option<String>,
}

/// Upload client that delegates to the Photos Library API
pub struct PhotosUploadClient {
    state: Mutex<UploadState>,
    tokens: TokenManager,
    album_title: String,
}

/// Builds the credential store selected in the config
pub fn credential_store(config: &GooglePhotosConfig) -> Arc<dyn CredentialStore> {
    match config.token_storage {
        TokenStorageKind::File => Arc::new(FileCredentialStore::new(config.token_path.clone())),
        TokenStorageKind::Keyring => Arc::new(KeyringCredentialStore),
    }
}

impl PhotosUploadClient {
    pub fn new(client: PhotosClient, tokens: TokenManager, album: AlbumTarget) -> Self {
        Self {
            state: Mutex::new(UploadState {
                client,
                album_id: album.id.filter(|id| !id.is_empty()),
            }),
            tokens,
            album_title: album.title,
        }
    }

    /// Builds a production client from the `google_photos` config section
    pub fn from_config(config: &GooglePhotosConfig) -> Self {
        let client = PhotosClient::new(String::new())
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_retry_policy(RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_delay_secs),
            ));
        let tokens = TokenManager::new(credential_store(config));
        let album = AlbumTarget {
            title: config.album_title.clone(),
            id: config.album_id.clone(),
        };
        Self::new(client, tokens, album)
    }

    /// Uploads `image_path`, returning the created media item
    pub async fn try_upload(&self, image_path: &Path) -> Result<MediaItem, PhotosError> {
        let mut state = self.state.lock().await;

        let token = self.tokens.access_token().await?;
        state.client.set_access_token(token);

        match self.upload_once(&mut state, image_path).await {
            Err(PhotosError::Unauthorized(message)) => {
                warn!(%message, "Access token rejected, refreshing once");
                let token = self.tokens.force_refresh().await?;
                state.client.set_access_token(token);
                self.upload_once(&mut state, image_path).await
            }
            other => other,
        }
    }

    /// Resolves the album id (looking it up or creating it) without uploading
    pub async fn resolve_album(&self) -> Result<String, PhotosError> {
        let mut state = self.state.lock().await;
        let token = self.tokens.access_token().await?;
        state.client.set_access_token(token);
        self.album_id(&mut state).await
    }

    async fn upload_once(
        &self,
        state: &mut UploadState,
        image_path: &Path,
    ) -> Result<MediaItem, PhotosError> {
        let album_id = self.album_id(state).await?;
        upload::upload_image(&state.client, &album_id, image_path).await
    }

    async fn album_id(&self, state: &mut UploadState) -> Result<String, PhotosError> {
        if let Some(id) = &state.album_id {
            return Ok(id.clone());
        }
        let (album, _created) = albums::ensure_album(&state.client, &self.album_title).await?;
        debug!(id = %album.id, title = %self.album_title, "Resolved target album");
        state.album_id = Some(album.id.clone());
        Ok(album.id)
    }
}

/// Maps an upload error onto the outcome seen by the controller
pub fn classify_error(error: &PhotosError) -> UploadOutcome {
    if error.is_auth_expired() {
        UploadOutcome::auth_expired(error.to_string())
    } else {
        UploadOutcome::transient(error.to_string())
    }
}

#[async_trait::async_trait]
impl IUploadClient for PhotosUploadClient {
    async fn upload(&self, image_path: &Path) -> UploadOutcome {
        match self.try_upload(image_path).await {
            Ok(item) => UploadOutcome::success(item.id),
            Err(e) => {
                debug!(error = %e, path = %image_path.display(), "Upload failed");
                classify_error(&e)
            }
        }
    }
}
