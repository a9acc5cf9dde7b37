//! Configuration module for albumcam.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The configuration is read once at startup and never changes afterwards.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Schedule};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for albumcam.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub google_photos: GooglePhotosConfig,
    pub notifications: NotificationsConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// Camera and capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Whether the daemon captures at all.
    #[serde(rename = "use")]
    pub enabled: bool,
    /// Directory where captured images are written.
    pub photo_dir: PathBuf,
    /// Video device passed to the capture program as `{device}`.
    pub device: String,
    /// Capture program to run for each tick.
    pub program: String,
    /// Program arguments. Supports `{device}`, `{width}`, `{height}`,
    /// `{fps}`, `{fourcc}` and `{output}` placeholders.
    pub args: Vec<String>,
    /// Seconds before a hanging capture program is killed.
    pub timeout_secs: u64,
    pub settings: CameraSettings,
    pub scheduler: SchedulerConfig,
}

/// Capture format requested from the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Four-character pixel format code, e.g. `MJPG` or `YUYV`.
    pub fourcc: String,
}

/// A YAML value that may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        match self {
            StringList::One(value) => std::slice::from_ref(value),
            StringList::Many(values) => values,
        }
    }
}

/// When captures happen.
///
/// Exactly one of `interval_minutes` or `day_of_week` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Capture every N minutes.
    pub interval_minutes: Option<u32>,
    /// Weekday names (`monday`, `tue`, ...) or `day` for every day.
    pub day_of_week: Option<StringList>,
    /// Local times of day (`HH:MM` or `HH:MM:SS`); defaults to midnight.
    pub at_time: Option<StringList>,
}

impl SchedulerConfig {
    /// Converts the config section into a [`Schedule`].
    pub fn to_schedule(&self) -> Result<Schedule, DomainError> {
        match (self.interval_minutes, &self.day_of_week) {
            (Some(_), Some(_)) => Err(DomainError::InvalidSchedule(
                "set either interval_minutes or day_of_week, not both".to_string(),
            )),
            (Some(minutes), None) => Schedule::interval(minutes),
            (None, Some(days)) => {
                let times = self
                    .at_time
                    .as_ref()
                    .map(StringList::as_slice)
                    .unwrap_or_default();
                Schedule::weekly(days.as_slice(), times)
            }
            (None, None) => Err(DomainError::InvalidSchedule(
                "one of interval_minutes or day_of_week is required".to_string(),
            )),
        }
    }
}

/// Where the OAuth credentials are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStorageKind {
    /// Plain JSON file at `token_path`
    #[default]
    File,
    /// System keyring (Secret Service)
    Keyring,
}

/// Google Photos upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GooglePhotosConfig {
    /// Whether captured images are uploaded.
    #[serde(rename = "use")]
    pub enabled: bool,
    /// OAuth client secrets downloaded from the Google Cloud console.
    pub client_secrets_path: PathBuf,
    /// Stored user credentials (when `token_storage` is `file`).
    pub token_path: PathBuf,
    pub token_storage: TokenStorageKind,
    /// Album to upload into; created if it does not exist.
    pub album_title: String,
    /// Known album ID. Skips the title lookup when set.
    pub album_id: Option<String>,
    /// Attempts per request on transient errors.
    pub max_retries: u32,
    /// Seconds between retry attempts.
    pub retry_delay_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// HTTP webhook target for alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

/// Local command target for alerts. The message body is written to stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    /// Arguments; `{subject}` is replaced with the alert subject.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Operator alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    #[serde(rename = "use")]
    pub enabled: bool,
    pub subject: String,
    pub message_body: String,
    pub webhook: Option<WebhookConfig>,
    pub command: Option<CommandConfig>,
}

/// Bounded retention of images whose upload failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum failed images kept on disk; `0` deletes them immediately.
    pub max_failed_images: usize,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file.
    pub file: PathBuf,
    /// Maximum size of a single log file (in MiB) before rotation.
    pub max_size_mb: u64,
    /// Maximum number of rotated log files to keep.
    pub max_files: u32,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/albumcam/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        config_dir().join("config.yaml")
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("albumcam")
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default alert subject.
pub const DEFAULT_ALERT_SUBJECT: &str = "albumcam: Google Photos credential expired";

/// Default alert body.
pub const DEFAULT_ALERT_BODY: &str = "The Google Photos credential used by albumcam has expired \
or been revoked. Capture and upload have stopped and local images were removed. \
Run `albumcam auth login` on the device, then restart albumcamd.";

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            photo_dir: PathBuf::from("./photos"),
            device: "/dev/video0".to_string(),
            program: "fswebcam".to_string(),
            args: [
                "--device",
                "{device}",
                "--resolution",
                "{width}x{height}",
                "--fps",
                "{fps}",
                "--skip",
                "5",
                "--no-banner",
                "--jpeg",
                "90",
                "{output}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_secs: 30,
            settings: CameraSettings::default(),
            scheduler: SchedulerConfig {
                interval_minutes: Some(10),
                ..SchedulerConfig::default()
            },
        }
    }
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            fourcc: "MJPG".to_string(),
        }
    }
}

impl Default for GooglePhotosConfig {
    fn default() -> Self {
        let dir = config_dir();
        Self {
            enabled: true,
            client_secrets_path: dir.join("client_secrets.json"),
            token_path: dir.join("token.json"),
            token_storage: TokenStorageKind::File,
            album_title: "albumcam".to_string(),
            album_id: None,
            max_retries: 3,
            retry_delay_secs: 3,
            request_timeout_secs: 300,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            subject: DEFAULT_ALERT_SUBJECT.to_string(),
            message_body: DEFAULT_ALERT_BODY.to_string(),
            webhook: None,
            command: None,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_failed_images: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("albumcam");
        Self {
            level: "info".to_string(),
            file: data_dir.join("albumcamd.log"),
            max_size_mb: 10,
            max_files: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"camera.scheduler.at_time"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- camera ---
        if self.camera.program.trim().is_empty() {
            errors.push(ValidationError::new("camera.program", "must not be empty"));
        }
        if self.camera.photo_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new("camera.photo_dir", "must not be empty"));
        }
        if self.camera.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "camera.timeout_secs",
                "must be greater than 0",
            ));
        }
        if !self.camera.args.iter().any(|a| a.contains("{output}")) {
            errors.push(ValidationError::new(
                "camera.args",
                "must contain the {output} placeholder",
            ));
        }
        let settings = &self.camera.settings;
        for (name, value) in [
            ("width", settings.width),
            ("height", settings.height),
            ("fps", settings.fps),
        ] {
            if value == 0 {
                errors.push(ValidationError::new(
                    format!("camera.settings.{name}"),
                    "must be greater than 0",
                ));
            }
        }
        if settings.fourcc.len() != 4 {
            errors.push(ValidationError::new(
                "camera.settings.fourcc",
                format!("must be 4 characters, got '{}'", settings.fourcc),
            ));
        }
        if let Err(e) = self.camera.scheduler.to_schedule() {
            errors.push(ValidationError::new(schedule_field(&e), e.to_string()));
        }

        // --- google_photos ---
        let photos = &self.google_photos;
        if photos.enabled {
            let has_title = !photos.album_title.trim().is_empty();
            let has_id = photos
                .album_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty());
            if !has_title && !has_id {
                errors.push(ValidationError::new(
                    "google_photos.album_title",
                    "an album title or album_id is required when uploading is enabled",
                ));
            }
            if photos.max_retries == 0 {
                errors.push(ValidationError::new(
                    "google_photos.max_retries",
                    "must be greater than 0",
                ));
            }
            if photos.request_timeout_secs == 0 {
                errors.push(ValidationError::new(
                    "google_photos.request_timeout_secs",
                    "must be greater than 0",
                ));
            }
        }

        // --- notifications ---
        let notifications = &self.notifications;
        if notifications.enabled {
            if notifications.webhook.is_none() && notifications.command.is_none() {
                errors.push(ValidationError::new(
                    "notifications",
                    "a webhook or command target is required when notifications are enabled",
                ));
            }
            if notifications.subject.trim().is_empty() {
                errors.push(ValidationError::new(
                    "notifications.subject",
                    "must not be empty",
                ));
            }
        }
        if let Some(webhook) = &notifications.webhook {
            if !(webhook.url.starts_with("http://") || webhook.url.starts_with("https://")) {
                errors.push(ValidationError::new(
                    "notifications.webhook.url",
                    format!("must be an http(s) URL, got '{}'", webhook.url),
                ));
            }
        }
        if let Some(command) = &notifications.command {
            if command.program.trim().is_empty() {
                errors.push(ValidationError::new(
                    "notifications.command.program",
                    "must not be empty",
                ));
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }
        if self.logging.max_size_mb == 0 {
            errors.push(ValidationError::new(
                "logging.max_size_mb",
                "must be greater than 0",
            ));
        }
        if self.logging.max_files == 0 {
            errors.push(ValidationError::new(
                "logging.max_files",
                "must be greater than 0",
            ));
        }

        errors
    }
}

/// Maps a schedule error onto the config field that caused it.
fn schedule_field(error: &DomainError) -> &'static str {
    match error {
        DomainError::InvalidWeekday(_) => "camera.scheduler.day_of_week",
        DomainError::InvalidTime(_) => "camera.scheduler.at_time",
        _ => "camera.scheduler",
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use albumcam_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .camera_photo_dir(PathBuf::from("/var/lib/albumcam/photos"))
///     .schedule_weekly(&["monday", "friday"], &["09:00"])
///     .album_title("Garden")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- camera ---

    pub fn camera_enabled(mut self, enabled: bool) -> Self {
        self.config.camera.enabled = enabled;
        self
    }

    pub fn camera_photo_dir(mut self, dir: PathBuf) -> Self {
        self.config.camera.photo_dir = dir;
        self
    }

    pub fn camera_device(mut self, device: impl Into<String>) -> Self {
        self.config.camera.device = device.into();
        self
    }

    pub fn camera_program(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.config.camera.program = program.into();
        self.config.camera.args = args;
        self
    }

    pub fn camera_resolution(mut self, width: u32, height: u32) -> Self {
        self.config.camera.settings.width = width;
        self.config.camera.settings.height = height;
        self
    }

    pub fn schedule_interval(mut self, minutes: u32) -> Self {
        self.config.camera.scheduler = SchedulerConfig {
            interval_minutes: Some(minutes),
            ..SchedulerConfig::default()
        };
        self
    }

    pub fn schedule_weekly(mut self, days: &[&str], times: &[&str]) -> Self {
        let to_owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        self.config.camera.scheduler = SchedulerConfig {
            interval_minutes: None,
            day_of_week: Some(StringList::Many(to_owned(days))),
            at_time: Some(StringList::Many(to_owned(times))),
        };
        self
    }

    // --- google_photos ---

    pub fn upload_enabled(mut self, enabled: bool) -> Self {
        self.config.google_photos.enabled = enabled;
        self
    }

    pub fn album_title(mut self, title: impl Into<String>) -> Self {
        self.config.google_photos.album_title = title.into();
        self
    }

    pub fn album_id(mut self, id: impl Into<String>) -> Self {
        self.config.google_photos.album_id = Some(id.into());
        self
    }

    pub fn token_storage(mut self, storage: TokenStorageKind) -> Self {
        self.config.google_photos.token_storage = storage;
        self
    }

    // --- notifications ---

    pub fn notify_webhook(mut self, url: impl Into<String>) -> Self {
        self.config.notifications.enabled = true;
        self.config.notifications.webhook = Some(WebhookConfig {
            url: url.into(),
            bearer_token: None,
        });
        self
    }

    pub fn notify_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.config.notifications.enabled = true;
        self.config.notifications.command = Some(CommandConfig {
            program: program.into(),
            args,
        });
        self
    }

    pub fn alert_message(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.config.notifications.subject = subject.into();
        self.config.notifications.message_body = body.into();
        self
    }

    // --- retention ---

    pub fn max_failed_images(mut self, n: usize) -> Self {
        self.config.retention.max_failed_images = n;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = file;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
