//! albumcam Photos - Google Photos Library API client
//!
//! Provides an async client for:
//! - OAuth2 authentication (Authorization Code with PKCE) and token refresh
//! - Album lookup and creation
//! - Two-step media uploads (raw bytes, then `mediaItems:batchCreate`)
//!
//! ## Modules
//!
//! - [`credentials`] - Authorized-user credentials and where they are stored
//! - [`auth`] - Interactive login and loopback callback server
//! - [`tokens`] - Access token refresh and failure classification
//! - [`client`] - Photos Library HTTP client with status mapping and retries
//! - [`albums`] - Album listing, lookup by title, creation
//! - [`upload`] - Image upload into an album
//! - [`provider`] - [`IUploadClient`](albumcam_core::ports::IUploadClient)
//!   implementation that classifies failures into `UploadOutcome`

pub mod albums;
pub mod auth;
pub mod client;
pub mod credentials;
pub mod provider;
pub mod retry;
pub mod tokens;
pub mod upload;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the Google Photos Library API
#[derive(Debug, Error)]
pub enum PhotosError {
    /// The API rejected the access token (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The credential lacks permission for the request (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// No stored credentials were found
    #[error("No stored credentials, run `albumcam auth login`")]
    CredentialsMissing,

    /// The refresh token can no longer be used (expired, revoked, wrong client)
    #[error("Credentials expired: {0}")]
    CredentialsExpired(String),

    /// Refreshing the access token failed for a reason that may go away
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Reading or writing credentials failed
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhotosError {
    /// Returns true when the stored credential needs human re-authorisation
    ///
    /// This is the only class of error that is fatal to the daemon.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            PhotosError::Unauthorized(_)
                | PhotosError::Forbidden(_)
                | PhotosError::CredentialsMissing
                | PhotosError::CredentialsExpired(_)
        )
    }

    /// Returns true when repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PhotosError::TooManyRequests { .. }
                | PhotosError::ServerError(_)
                | PhotosError::NetworkError(_)
        )
    }
}
