//! Access token lifecycle
//!
//! [`TokenManager`] hands out a valid access token, refreshing it through
//! the credential's `token_uri` when it is missing or about to expire.
//!
//! Refresh failures are classified from the OAuth `error` code in the
//! token endpoint's response:
//!
//! | outcome | mapped to |
//! |---|---|
//! | `invalid_grant`, `invalid_client`, `unauthorized_client`, `invalid_scope` | [`PhotosError::CredentialsExpired`] |
//! | no refresh token stored | [`PhotosError::CredentialsExpired`] |
//! | any other OAuth error, transport or parse failure | [`PhotosError::TokenRefresh`] |

use std::sync::Arc;

use chrono::Utc;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType},
    ClientId, ClientSecret, HttpClientError, RefreshToken, RequestTokenError, TokenResponse,
    TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    credentials::{CredentialStore, CredentialStoreError, Credentials},
    PhotosError,
};

/// Access token lifetime assumed when the server does not send one
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

type RefreshError = RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

/// HTTP client for token endpoint calls
///
/// Redirects are disabled, as the `oauth2` crate recommends for token
/// requests.
pub(crate) fn oauth_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build OAuth HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Exchanges the refresh token in `credentials` for a new access token
///
/// # Returns
/// Updated credentials. The refresh token is kept unless the server rotated it.
pub async fn refresh_credentials(
    http_client: &reqwest::Client,
    credentials: &Credentials,
) -> Result<Credentials, PhotosError> {
    let refresh_token = credentials
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PhotosError::CredentialsExpired("no refresh token stored".to_string()))?;

    let token_url = TokenUrl::new(credentials.token_uri.clone())
        .map_err(|e| PhotosError::CredentialsExpired(format!("invalid token_uri: {e}")))?;

    let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
        .set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
        .set_token_uri(token_url);

    debug!(token_uri = %credentials.token_uri, "Refreshing access token");
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(http_client)
        .await
        .map_err(|e| classify_refresh_error(&e))?;

    let lifetime = response
        .expires_in()
        .and_then(|d| chrono::Duration::from_std(d).ok())
        .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

    let mut refreshed = credentials.clone();
    refreshed.token = Some(response.access_token().secret().to_string());
    refreshed.expiry = Some(Utc::now() + lifetime);
    if let Some(rotated) = response.refresh_token() {
        refreshed.refresh_token = Some(rotated.secret().to_string());
    }
    Ok(refreshed)
}

/// Maps a token endpoint failure onto a typed error
pub fn classify_refresh_error(error: &RefreshError) -> PhotosError {
    match error {
        RequestTokenError::ServerResponse(response) => {
            let description = response
                .error_description()
                .map(|d| format!("{}: {}", response.error(), d))
                .unwrap_or_else(|| response.error().to_string());
            if is_permanent_oauth_error(response.error()) {
                PhotosError::CredentialsExpired(description)
            } else {
                PhotosError::TokenRefresh(description)
            }
        }
        RequestTokenError::Request(e) => PhotosError::TokenRefresh(format!("request failed: {e}")),
        RequestTokenError::Parse(e, _) => {
            PhotosError::TokenRefresh(format!("unparseable token response: {e}"))
        }
        RequestTokenError::Other(message) => PhotosError::TokenRefresh(message.clone()),
    }
}

/// OAuth error codes after which the refresh token is unusable
fn is_permanent_oauth_error(code: &BasicErrorResponseType) -> bool {
    matches!(
        code,
        BasicErrorResponseType::InvalidGrant
            | BasicErrorResponseType::InvalidClient
            | BasicErrorResponseType::UnauthorizedClient
            | BasicErrorResponseType::InvalidScope
    )
}

/// Supplies valid access tokens, refreshing and persisting as needed
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    http_client: reqwest::Client,
    cached: Mutex<Option<Credentials>>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            http_client: oauth_http_client(),
            cached: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Returns a valid access token, refreshing first if needed
    pub async fn access_token(&self) -> Result<String, PhotosError> {
        self.token(false).await
    }

    /// Refreshes unconditionally, e.g. after the API rejected the current token
    pub async fn force_refresh(&self) -> Result<String, PhotosError> {
        self.token(true).await
    }

    async fn token(&self, force: bool) -> Result<String, PhotosError> {
        let mut cached = self.cached.lock().await;

        if cached.is_none() {
            let loaded = self
                .store
                .load()
                .map_err(|e| match e {
                    CredentialStoreError::Parse { .. } => {
                        PhotosError::CredentialsExpired(e.to_string())
                    }
                    _ => PhotosError::Storage(e.to_string()),
                })?
                .ok_or(PhotosError::CredentialsMissing)?;
            debug!(store = %self.store.describe(), "Loaded stored credentials");
            *cached = Some(loaded);
        }
        let current = cached.as_ref().ok_or(PhotosError::CredentialsMissing)?;

        if !force && !current.needs_refresh(Utc::now()) {
            if let Some(token) = &current.token {
                return Ok(token.clone());
            }
        }

        let refreshed = refresh_credentials(&self.http_client, current).await?;
        info!(expiry = ?refreshed.expiry, "Refreshed access token");

        if let Err(e) = self.store.save(&refreshed) {
            warn!(error = %format!("{e:#}"), "Failed to persist refreshed credentials");
        }

        let token = refreshed
            .token
            .clone()
            .ok_or_else(|| PhotosError::InvalidResponse("refresh returned no access token".into()))?;
        *cached = Some(refreshed);
        Ok(token)
    }
}
