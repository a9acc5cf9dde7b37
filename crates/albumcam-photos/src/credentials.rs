//! Stored OAuth credentials
//!
//! Credentials use Google's "authorized user" JSON layout, so a token file
//! written by other Google tooling can be reused as-is:
//!
//! ```json
//! {
//!   "token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "token_uri": "https://oauth2.googleapis.com/token",
//!   "client_id": "1234.apps.googleusercontent.com",
//!   "client_secret": "GOCSPX-...",
//!   "scopes": ["https://www.googleapis.com/auth/photoslibrary.appendonly"],
//!   "expiry": "2025-01-01T12:00:00Z"
//! }
//! ```
//!
//! They are kept either in a file or in the system keyring, behind the
//! [`CredentialStore`] trait.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default Google OAuth2 token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default Google OAuth2 authorization endpoint
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Keyring service name for storing credentials
const KEYRING_SERVICE: &str = "albumcam";

/// Keyring username for the Google Photos credential
const KEYRING_USER: &str = "google-photos";

/// Access tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN_MINUTES: i64 = 5;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

/// OAuth credentials for one Google account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Current access token
    #[serde(default)]
    pub token: Option<String>,
    /// Long-lived refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When `token` expires
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Returns true when the access token is missing or about to expire
    ///
    /// A token without an expiry is treated as valid.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(expiry)) => expiry - Duration::minutes(EXPIRY_MARGIN_MINUTES) <= now,
        }
    }

    /// Loads credentials from an authorized-user JSON file
    pub fn from_file(path: &Path) -> Result<Self, CredentialStoreError> {
        let location = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|reason| CredentialStoreError::Io {
            location: location.clone(),
            reason,
        })?;
        serde_json::from_str(&content)
            .map_err(|reason| CredentialStoreError::Parse { location, reason })
    }
}

/// Why stored credentials could not be loaded
///
/// `Parse` means the store holds something that will never authenticate
/// until a user signs in again; the other variants may clear up on their own.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("Failed to parse credentials in {location}: {reason}")]
    Parse {
        location: String,
        reason: serde_json::Error,
    },

    #[error("Failed to read credentials from {location}: {reason}")]
    Io {
        location: String,
        reason: std::io::Error,
    },

    #[error("Keyring error: {0}")]
    Backend(#[from] keyring::Error),
}

/// OAuth client registration downloaded from the Google Cloud console
///
/// The file wraps the fields in an `installed` (desktop app) or `web` key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses a `client_secrets.json` document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).context("Failed to parse client secrets")?;
        file.installed
            .or(file.web)
            .context("Client secrets must contain an \"installed\" or \"web\" section")
    }

    /// Loads a `client_secrets.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secrets from {}", path.display()))?;
        Self::from_json(&content)
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Where credentials are persisted between runs
pub trait CredentialStore: Send + Sync {
    /// Returns the stored credentials, or `None` if nothing is stored
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError>;

    /// Replaces the stored credentials
    fn save(&self, credentials: &Credentials) -> Result<()>;

    /// Removes the stored credentials; succeeds if nothing was stored
    fn clear(&self) -> Result<()>;

    /// Human-readable location, for logs and CLI output
    fn describe(&self) -> String;
}

/// Stores credentials as a JSON file
///
/// The file is written with mode `0600` on Unix.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No credentials file");
            return Ok(None);
        }
        Credentials::from_file(&self.path).map(Some)
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(credentials).context("Failed to serialize credentials")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict permissions on {}", tmp.display()))?;
        }

        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Stored credentials");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Removed stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove {}", self.path.display()))),
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Stores credentials in the system keyring (Secret Service)
#[derive(Debug, Clone, Default)]
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    fn entry() -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).context("Failed to create keyring entry")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(json) => {
                let credentials: Credentials =
                    serde_json::from_str(&json).map_err(|reason| CredentialStoreError::Parse {
                        location: self.describe(),
                        reason,
                    })?;
                debug!("Loaded credentials from keyring");
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No credentials found in keyring");
                Ok(None)
            }
            Err(e) => Err(CredentialStoreError::Backend(e)),
        }
    }

    fn save(&self, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(credentials).context("Failed to serialize credentials")?;
        Self::entry()?
            .set_password(&json)
            .context("Failed to store credentials in keyring")?;
        debug!("Stored credentials in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) => {
                info!("Cleared credentials from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }

    fn describe(&self) -> String {
        format!("keyring service \"{KEYRING_SERVICE}\"")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> Credentials {
        Credentials {
            token: Some("ya29.token".into()),
            refresh_token: Some("1//refresh".into()),
            token_uri: GOOGLE_TOKEN_URI.into(),
            client_id: "id.apps.googleusercontent.com".into(),
            client_secret: "secret".into(),
            scopes: vec!["https://www.googleapis.com/auth/photoslibrary.appendonly".into()],
            expiry: Some(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let creds = sample();
        let expiry = creds.expiry.unwrap();
        assert!(!creds.needs_refresh(expiry - Duration::minutes(10)));
        assert!(creds.needs_refresh(expiry - Duration::minutes(4)));
        assert!(creds.needs_refresh(expiry + Duration::minutes(1)));
    }

    #[test]
    fn test_needs_refresh_without_token_or_expiry() {
        let mut creds = sample();
        creds.expiry = None;
        assert!(!creds.needs_refresh(Utc::now()));
        creds.token = None;
        assert!(creds.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_parses_authorized_user_json() {
        let json = r#"{
            "token": "ya29.abc",
            "refresh_token": "1//xyz",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "cid",
            "client_secret": "csecret",
            "scopes": ["https://www.googleapis.com/auth/photoslibrary.appendonly"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2025-03-01T10:20:30.123456Z"
        }"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.token.as_deref(), Some("ya29.abc"));
        assert_eq!(creds.refresh_token.as_deref(), Some("1//xyz"));
        assert_eq!(creds.client_id, "cid");
        assert!(creds.expiry.is_some());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{"client_id": "cid", "client_secret": "s", "refresh_token": "r"}"#;
        let creds: Credentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.token_uri, GOOGLE_TOKEN_URI);
        assert!(creds.token.is_none());
        assert!(creds.scopes.is_empty());
    }

    #[test]
    fn test_client_secrets_installed_and_web() {
        let installed = r#"{"installed": {"client_id": "a", "client_secret": "b",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]}}"#;
        let secrets = ClientSecrets::from_json(installed).unwrap();
        assert_eq!(secrets.client_id, "a");
        assert_eq!(secrets.token_uri, GOOGLE_TOKEN_URI);

        let web = r#"{"web": {"client_id": "c", "client_secret": "d"}}"#;
        assert_eq!(ClientSecrets::from_json(web).unwrap().client_id, "c");

        assert!(ClientSecrets::from_json(r#"{"other": {}}"#).is_err());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("token.json"));

        assert!(store.load().unwrap().is_none());

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileCredentialStore::new(path).load().unwrap_err();
        assert!(matches!(err, CredentialStoreError::Parse { .. }), "got {err}");
    }

    #[test]
    fn test_file_store_incomplete_credentials_are_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"refresh_token": "x"}"#).unwrap();
        let err = FileCredentialStore::new(path).load().unwrap_err();
        assert!(matches!(err, CredentialStoreError::Parse { .. }));
        assert!(err.to_string().contains("client_id"), "got {err}");
    }

    #[test]
    fn test_file_store_unreadable_path_is_io() {
        let dir = tempfile::tempdir().unwrap();
        // A directory exists but cannot be read as a file
        let err = FileCredentialStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, CredentialStoreError::Io { .. }), "got {err}");
    }
}
