//! Auth commands - Login, Logout, and Status for Google Photos
//!
//! 1. `login`  - Runs the OAuth2 PKCE flow against the client secrets file,
//!    stores the credentials, and resolves (or creates) the target album to
//!    prove they work.
//! 2. `logout` - Removes the stored credentials.
//! 3. `status` - Shows whether credentials are stored and usable.
//!
//! `login` is also how an operator recovers a halted daemon: renew the
//! credential, then restart `albumcamd`.

use std::time::Duration;

use albumcam_photos::{
    auth::{PhotosAuthAdapter, DEFAULT_LOGIN_TIMEOUT},
    credentials::{ClientSecrets, Credentials},
    provider::{credential_store, PhotosUploadClient},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use tracing::{info, warn};

use super::CommandContext;
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorise albumcam to upload to Google Photos
    Login {
        /// Fixed port for the local redirect listener (default: any free port)
        #[arg(long)]
        port: Option<u16>,
        /// Print the authorisation URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
        /// Seconds to wait for the browser redirect
        #[arg(long, default_value_t = DEFAULT_LOGIN_TIMEOUT.as_secs())]
        timeout: u64,
    },
    /// Remove stored credentials
    Logout,
    /// Check authorisation status
    Status,
}

/// State of the stored credential as seen from the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    NotFound,
    /// No refresh token: the daemon halts on its first upload
    NoRefreshToken,
    /// Access token expired or about to; the daemon refreshes it
    NeedsRefresh,
    Valid,
}

impl TokenStatus {
    pub fn of(credentials: Option<&Credentials>, now: DateTime<Utc>) -> Self {
        match credentials {
            None => TokenStatus::NotFound,
            Some(c) if c.refresh_token.as_deref().map_or(true, str::is_empty) => {
                TokenStatus::NoRefreshToken
            }
            Some(c) if c.needs_refresh(now) => TokenStatus::NeedsRefresh,
            Some(_) => TokenStatus::Valid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::NotFound => "not_found",
            TokenStatus::NoRefreshToken => "no_refresh_token",
            TokenStatus::NeedsRefresh => "needs_refresh",
            TokenStatus::Valid => "valid",
        }
    }
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let fmt = ctx.formatter();
        match self {
            AuthCommand::Login {
                port,
                no_browser,
                timeout,
            } => {
                self.execute_login(ctx, &*fmt, *port, *no_browser, Duration::from_secs(*timeout))
                    .await
            }
            AuthCommand::Logout => self.execute_logout(ctx, &*fmt),
            AuthCommand::Status => self.execute_status(ctx, &*fmt),
        }
    }

    /// Execute the login flow:
    /// 1. Load client secrets from the config
    /// 2. Run OAuth2 PKCE with a loopback redirect
    /// 3. Store the credentials
    /// 4. Resolve the album to verify them
    async fn execute_login(
        &self,
        ctx: &CommandContext,
        fmt: &dyn OutputFormatter,
        port: Option<u16>,
        no_browser: bool,
        timeout: Duration,
    ) -> Result<()> {
        let config = ctx.load_config()?;
        let photos = &config.google_photos;

        let secrets = ClientSecrets::from_file(&photos.client_secrets_path).with_context(|| {
            format!(
                "Failed to read client secrets from {}",
                photos.client_secrets_path.display()
            )
        })?;

        let mut adapter = PhotosAuthAdapter::new(secrets);
        if let Some(port) = port {
            adapter = adapter.with_port(port);
        }
        let pending = adapter.begin().await.context("Failed to start login")?;
        info!(redirect_uri = %pending.redirect_uri(), "Waiting for OAuth2 redirect");

        let opened = !no_browser && webbrowser::open(pending.auth_url()).is_ok();
        if opened {
            fmt.info("Opening browser for Google login...");
        } else {
            // Shown on stderr in JSON mode as well; the URL is required to proceed.
            eprintln!("Open this URL in a browser to authorise albumcam:");
            eprintln!();
            eprintln!("  {}", pending.auth_url());
            eprintln!();
        }

        let credentials = pending.complete(timeout).await.context("OAuth2 login failed")?;

        let store = credential_store(photos);
        store
            .save(&credentials)
            .context("Failed to store credentials")?;
        info!(store = %store.describe(), "Stored credentials");

        fmt.info("Checking access to the album...");
        let uploader = PhotosUploadClient::from_config(photos);
        let album_id = uploader
            .resolve_album()
            .await
            .context("Credentials were stored but the album could not be resolved")?;

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "credentials": store.describe(),
                "album_title": photos.album_title,
                "album_id": album_id,
            }));
        } else {
            fmt.success("Authorised albumcam for Google Photos");
            fmt.field("Credentials", &store.describe());
            fmt.field("Album", &format!("{} ({})", photos.album_title, album_id));
            fmt.info("Restart albumcamd if it halted on an expired credential.");
        }
        Ok(())
    }

    fn execute_logout(&self, ctx: &CommandContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let config = ctx.load_config()?;
        let store = credential_store(&config.google_photos);

        store.clear().context("Failed to remove credentials")?;
        info!(store = %store.describe(), "Logged out");

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "success": true,
                "credentials": store.describe(),
            }));
        } else {
            fmt.success("Logged out successfully");
            fmt.info(&format!("Removed credentials from {}", store.describe()));
        }
        Ok(())
    }

    fn execute_status(&self, ctx: &CommandContext, fmt: &dyn OutputFormatter) -> Result<()> {
        let config = ctx.load_config()?;
        let store = credential_store(&config.google_photos);

        let credentials = match store.load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to read credentials");
                fmt.error(&format!("Failed to read credentials: {e:#}"));
                None
            }
        };
        let status = TokenStatus::of(credentials.as_ref(), Utc::now());

        if ctx.is_json() {
            fmt.print_json(&serde_json::json!({
                "authenticated": matches!(status, TokenStatus::Valid | TokenStatus::NeedsRefresh),
                "token_status": status.as_str(),
                "credentials": store.describe(),
                "expiry": credentials.as_ref().and_then(|c| c.expiry).map(|t| t.to_rfc3339()),
                "scopes": credentials.as_ref().map(|c| c.scopes.clone()).unwrap_or_default(),
                "upload_enabled": config.google_photos.enabled,
            }));
            return Ok(());
        }

        match status {
            TokenStatus::NotFound => {
                fmt.info("Authorisation status: Not configured");
                fmt.info("Run 'albumcam auth login' to authorise uploads");
                return Ok(());
            }
            TokenStatus::NoRefreshToken => {
                fmt.warn("Stored credentials have no refresh token");
                fmt.info("Run 'albumcam auth login' again to grant offline access");
            }
            TokenStatus::NeedsRefresh | TokenStatus::Valid => {
                fmt.success("Authorised for Google Photos");
            }
        }

        fmt.field("Credentials", &store.describe());
        if let Some(credentials) = &credentials {
            match credentials.expiry {
                Some(expiry) => fmt.field(
                    "Access token",
                    &format!(
                        "{} (expires {})",
                        status.as_str(),
                        expiry.format("%Y-%m-%d %H:%M:%S UTC")
                    ),
                ),
                None => fmt.field("Access token", status.as_str()),
            }
            for scope in &credentials.scopes {
                fmt.field("Scope", scope);
            }
        }
        if !config.google_photos.enabled {
            fmt.warn("google_photos.use is false; the daemon will not upload");
        }
        Ok(())
    }
}
