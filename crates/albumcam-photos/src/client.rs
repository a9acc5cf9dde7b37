//! Google Photos Library API client
//!
//! Provides a typed HTTP client for the Photos Library API. Handles the
//! bearer header, endpoint construction, status mapping into
//! [`PhotosError`], and retries of transient failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use albumcam_photos::{albums, client::PhotosClient};
//!
//! # async fn example() -> Result<(), albumcam_photos::PhotosError> {
//! let client = PhotosClient::new("access-token-here");
//! for album in albums::list_albums(&client).await? {
//!     println!("{} ({})", album.title, album.id);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    retry::{parse_retry_after, RetryPolicy},
    PhotosError,
};

/// Base URL for the Photos Library API v1
pub const PHOTOS_BASE_URL: &str = "https://photoslibrary.googleapis.com/v1";

/// Google API error envelope
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// HTTP client for Photos Library API calls
pub struct PhotosClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Current OAuth2 access token
    access_token: String,
    /// How transient failures are retried
    retry: RetryPolicy,
}

impl PhotosClient {
    /// Creates a client against the production API
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(access_token, PHOTOS_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Sets a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                Client::new()
            });
        self
    }

    /// Sets the retry policy for transient failures
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated PhotosClient access token");
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for `path` relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request, retrying transient failures per the retry policy
    ///
    /// `build` is called once per attempt since a `RequestBuilder` cannot
    /// be reused after sending.
    ///
    /// # Returns
    /// The successful response, or the last error once attempts run out
    pub async fn execute<F>(&self, build: F) -> Result<Response, PhotosError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = match build().send().await {
                Ok(response) => self.error_for_status(response).await,
                Err(e) => Err(PhotosError::NetworkError(e)),
            };

            match result {
                Ok(response) => {
                    if attempt > 1 {
                        info!(attempt, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let wait = match &e {
                        PhotosError::TooManyRequests { retry_after } => *retry_after,
                        _ => self.retry.delay,
                    };
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!(attempt, error = %e, "Request failed after retries");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// GETs `path` and decodes the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PhotosError> {
        let response = self
            .execute(|| self.request(Method::GET, path).query(query))
            .await?;
        decode_json(response, path).await
    }

    /// POSTs `body` as JSON to `path` and decodes the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, PhotosError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(|| self.request(Method::POST, path).json(body))
            .await?;
        decode_json(response, path).await
    }

    /// Maps a non-success status onto a typed error
    async fn error_for_status(&self, response: Response) -> Result<Response, PhotosError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, self.retry.delay))
                .unwrap_or(self.retry.delay);
            return Err(PhotosError::TooManyRequests { retry_after });
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!(status = %status, message = %message, "API returned error status");

        Err(match status {
            StatusCode::UNAUTHORIZED => PhotosError::Unauthorized(message),
            StatusCode::FORBIDDEN => PhotosError::Forbidden(message),
            StatusCode::NOT_FOUND => PhotosError::NotFound(message),
            s if s.is_server_error() => PhotosError::ServerError(format!("{s}: {message}")),
            s => PhotosError::UnexpectedStatus {
                status: s,
                body: message,
            },
        })
    }
}

/// Decodes a JSON response body, naming `path` on failure
async fn decode_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, PhotosError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PhotosError::InvalidResponse(format!("{path}: {e}")))
}

/// Extracts the human-readable message from a Google API error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{} ({})", parsed.error.message, status),
            None => parsed.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let client = PhotosClient::new("test-token");
        let request = client.request(Method::GET, "/albums").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://photoslibrary.googleapis.com/v1/albums"
        );
        let auth_header = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth_header, "Bearer test-token");
    }

    #[test]
    fn test_custom_base_url_strips_trailing_slash() {
        let client = PhotosClient::with_base_url("token", "http://localhost:8080/");
        let request = client.request(Method::GET, "/albums").build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/albums");
    }

    #[test]
    fn test_set_access_token() {
        let mut client = PhotosClient::new("old-token");
        client.set_access_token("new-token");
        assert_eq!(client.access_token(), "new-token");
    }

    #[test]
    fn test_error_message_from_google_envelope() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        assert_eq!(
            error_message(body),
            "Request had invalid authentication credentials. (UNAUTHENTICATED)"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body() {
        assert_eq!(error_message("  upstream timeout \n"), "upstream timeout");
    }
}
