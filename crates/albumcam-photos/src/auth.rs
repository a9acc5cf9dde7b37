//! Interactive OAuth2 login for the Photos Library API
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for an
//! installed application, using a loopback redirect.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client registration, endpoints and scopes
//! - [`PKCEFlow`] - Challenge generation and code exchange
//! - [`LocalCallbackServer`] - One-shot HTTP server for the redirect
//! - [`PhotosAuthAdapter`] / [`PendingLogin`] - Orchestrate a full login
//!
//! The login is split into [`PhotosAuthAdapter::begin`], which yields the
//! URL to visit, and [`PendingLogin::complete`], which waits for the
//! browser to come back. The caller decides how to show the URL (print
//! it, open a browser, or both), since the capture device is usually
//! headless.

use std::{convert::Infallible, net::SocketAddr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use http_body_util::Full;
use hyper::{
    body::{Bytes, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::credentials::{ClientSecrets, Credentials};

/// Scopes needed to create albums and upload into them
pub const PHOTOS_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/photoslibrary.appendonly",
    "https://www.googleapis.com/auth/photoslibrary.readonly.appcreateddata",
    "https://www.googleapis.com/auth/photoslibrary.edit.appcreateddata",
];

/// How long [`PendingLogin::complete`] waits for the browser by default
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Access token lifetime assumed when the server does not send one
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 PKCE flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Builds a config from a client secrets file and a redirect URI
    pub fn from_secrets(secrets: &ClientSecrets, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            auth_uri: secrets.auth_uri.clone(),
            token_uri: secrets.token_uri.clone(),
            redirect_uri: redirect_uri.into(),
            scopes: PHOTOS_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

// ============================================================================
// PKCEFlow
// ============================================================================

/// OAuth2 PKCE flow implementation using the `oauth2` crate
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    config: OAuth2Config,
}

impl PKCEFlow {
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_uri.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_uri.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Requests offline access with a forced consent prompt so Google
    /// always returns a refresh token.
    ///
    /// # Returns
    /// A tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);
        for scope in &self.config.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for credentials
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Credentials> {
        info!("Exchanging authorization code for tokens");

        let http_client = crate::tokens::oauth_http_client();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let lifetime = token_result
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

        let scopes = token_result
            .scopes()
            .map(|granted| granted.iter().map(|s| s.to_string()).collect())
            .unwrap_or_else(|| self.config.scopes.clone());

        let refresh_token = token_result.refresh_token().map(|t| t.secret().to_string());
        if refresh_token.is_none() {
            warn!("Authorization server returned no refresh token");
        }

        info!("Successfully obtained OAuth tokens");
        Ok(Credentials {
            token: Some(token_result.access_token().secret().to_string()),
            refresh_token,
            token_uri: self.config.token_uri.clone(),
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
            scopes,
            expiry: Some(Utc::now() + lifetime),
        })
    }
}

// ============================================================================
// LocalCallbackServer
// ============================================================================

/// Parameters extracted from the OAuth2 callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

/// Minimal HTTP server on the loopback interface that waits for the OAuth redirect
///
/// Binding happens up front so the redirect URI (which embeds the port)
/// is known before the authorization URL is generated.
pub struct LocalCallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LocalCallbackServer {
    /// Binds to `127.0.0.1:port`; port `0` picks a free port
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("Failed to bind callback server to 127.0.0.1:{port}"))?;
        let addr = listener
            .local_addr()
            .context("Failed to read callback server address")?;
        info!(%addr, "OAuth callback server listening");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The redirect URI to register in the authorization request
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.addr.port())
    }

    /// Serves connections until a request carries a code or an error
    ///
    /// Requests without either (favicon lookups, preconnects) get a 404
    /// and the server keeps waiting.
    pub async fn wait(self) -> Result<CallbackParams> {
        let (tx, mut rx) = mpsc::channel::<Result<CallbackParams>>(1);

        loop {
            tokio::select! {
                Some(result) = rx.recv() => {
                    if result.is_ok() {
                        info!("Received OAuth callback with authorization code");
                    }
                    return result;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.context("Failed to accept callback connection")?;
                    debug!(%peer, "Callback connection accepted");
                    tokio::spawn(serve_callback_connection(stream, tx.clone()));
                }
            }
        }
    }
}

async fn serve_callback_connection(stream: TcpStream, tx: mpsc::Sender<Result<CallbackParams>>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let tx = tx.clone();
        async move {
            let uri = req.uri().to_string();
            debug!("Callback server received request: {}", uri);

            let response = match parse_callback(&uri) {
                Some(Ok(params)) => {
                    let _ = tx.try_send(Ok(params));
                    html_response(StatusCode::OK, success_html())
                }
                Some(Err(error)) => {
                    let html = error_html(&format!("Authorization was not granted: {error}"));
                    let _ = tx.try_send(Err(anyhow!("Authorization was not granted: {error}")));
                    html_response(StatusCode::BAD_REQUEST, html)
                }
                None => html_response(
                    StatusCode::NOT_FOUND,
                    error_html("Missing authorization code in callback"),
                ),
            };
            Ok::<_, Infallible>(response)
        }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        warn!("Callback server connection error: {}", e);
    }
}

/// Parses the callback query
///
/// Returns `None` when the request carries neither `code` nor `error`,
/// `Some(Err(error))` when the user denied access.
fn parse_callback(uri: &str) -> Option<Result<CallbackParams, String>> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            "error" => error = Some(value.to_string()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(error));
    }
    Some(Ok(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    }))
}

fn html_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>albumcam - Authorization Complete</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Complete</h1>
    <p>albumcam can now upload to Google Photos.</p>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>albumcam - Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authorization Error</h1>
    <p>{}</p>
    <p>Please close this window and run <code>albumcam auth login</code> again.</p>
</body>
</html>"#,
        message
    )
}

// ============================================================================
// PhotosAuthAdapter
// ============================================================================

/// Drives the interactive login against a client secrets registration
pub struct PhotosAuthAdapter {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    port: u16,
}

impl PhotosAuthAdapter {
    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            secrets,
            scopes: PHOTOS_SCOPES.iter().map(|s| s.to_string()).collect(),
            port: 0,
        }
    }

    /// Uses a fixed callback port (useful when tunnelling to a headless device)
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Starts the callback server and prepares the authorization URL
    pub async fn begin(&self) -> Result<PendingLogin> {
        info!("Starting OAuth2 PKCE login flow");

        let server = LocalCallbackServer::bind(self.port).await?;
        let config = OAuth2Config::from_secrets(&self.secrets, server.redirect_uri())
            .with_scopes(self.scopes.clone());
        let flow = PKCEFlow::new(&config)?;
        let (auth_url, csrf, verifier) = flow.generate_auth_url();

        Ok(PendingLogin {
            flow,
            server,
            csrf,
            verifier,
            auth_url,
        })
    }
}

/// A login waiting for the user to approve access in a browser
pub struct PendingLogin {
    flow: PKCEFlow,
    server: LocalCallbackServer,
    csrf: CsrfToken,
    verifier: PkceCodeVerifier,
    auth_url: String,
}

impl PendingLogin {
    /// The URL the user must open
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn redirect_uri(&self) -> String {
        self.server.redirect_uri()
    }

    /// Waits for the redirect, checks the CSRF state, and exchanges the code
    pub async fn complete(self, timeout: Duration) -> Result<Credentials> {
        let callback = tokio::time::timeout(timeout, self.server.wait())
            .await
            .map_err(|_| anyhow!("Timed out after {}s waiting for authorization", timeout.as_secs()))??;

        if callback.state != *self.csrf.secret() {
            bail!("OAuth state mismatch, refusing the authorization code");
        }

        let credentials = self.flow.exchange_code(callback.code, self.verifier).await?;
        info!("OAuth2 PKCE login completed successfully");
        Ok(credentials)
    }
}
