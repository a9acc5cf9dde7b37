//! Config command - View and manage albumcam configuration
//!
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Prints the config file location
//! 3. Writes a default configuration file
//! 4. Sets individual configuration values via dot-notation keys
//! 5. Validates the configuration file and reports errors

use std::path::PathBuf;

use albumcam_core::config::{Config, StringList, TokenStorageKind};
use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "camera.scheduler.interval_minutes")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("camera.use", "true|false"),
    ("camera.photo_dir", "Directory for captured images"),
    ("camera.device", "Video device, e.g. /dev/video0"),
    ("camera.program", "Capture program"),
    ("camera.timeout_secs", "Seconds before a capture is killed"),
    ("camera.settings.width", "Capture width"),
    ("camera.settings.height", "Capture height"),
    ("camera.settings.fps", "Capture frame rate"),
    ("camera.settings.fourcc", "Pixel format, e.g. MJPG"),
    ("camera.scheduler.interval_minutes", "Minutes between captures"),
    ("camera.scheduler.day_of_week", "Comma-separated weekdays or 'day'"),
    ("camera.scheduler.at_time", "Comma-separated HH:MM times"),
    ("google_photos.use", "true|false"),
    ("google_photos.client_secrets_path", "OAuth client secrets file"),
    ("google_photos.token_path", "Credentials file"),
    ("google_photos.token_storage", "file|keyring"),
    ("google_photos.album_title", "Album to upload into"),
    ("google_photos.album_id", "Known album id, or 'none'"),
    ("notifications.use", "true|false"),
    ("notifications.subject", "Alert subject"),
    ("notifications.message_body", "Alert body"),
    ("retention.max_failed_images", "Failed images kept for retry"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.file", "Log file path"),
    ("logging.max_size_mb", "Max log file size (MiB)"),
    ("logging.max_files", "Max rotated log files"),
];

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();
        let config = ctx.load_config()?;

        info!(config_path = %config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");
            for line in config.to_yaml()?.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &CommandContext) -> Result<()> {
        let config_path = ctx.config_path();
        if ctx.is_json() {
            ctx.formatter().print_json(&serde_json::json!({
                "config_path": config_path.display().to_string(),
                "exists": config_path.exists(),
            }));
        } else {
            println!("{}", config_path.display());
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &CommandContext, force: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();

        if config_path.exists() && !force {
            formatter.error(&format!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ));
            return Ok(());
        }

        save_config(&Config::default(), &config_path)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote {}", config_path.display()));
        }
        Ok(())
    }

    /// Set a configuration value using dot-notation
    fn execute_set(&self, ctx: &CommandContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();
        let mut config = ctx.load_config()?;

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<38} - {help}"));
                }
            }
            return Ok(());
        }

        // Validate the new config before saving
        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    errors.join("; ")
                ));
            }
            return Ok(());
        }

        save_config(&config, &config_path)?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }
        Ok(())
    }

    /// Validate configuration file
    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = ctx.config_path();

        // Load the file explicitly; defaults are not validated.
        let config = match Config::load(&config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {e:#}")
                } else {
                    "Configuration file not found".to_string()
                };
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                    formatter.info("Run 'albumcam config init' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
            if let Ok(schedule) = config.camera.scheduler.to_schedule() {
                formatter.info(&format!("Schedule: {schedule}"));
            }
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

fn save_config(config: &Config, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?).context("Failed to write configuration file")?;
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => anyhow::bail!("Expected true or false, got '{}'", value),
    }
}

fn parse_list(value: &str) -> StringList {
    let items: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    StringList::Many(items)
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- camera ---
        "camera.use" => config.camera.enabled = parse_bool(value)?,
        "camera.photo_dir" => config.camera.photo_dir = PathBuf::from(value),
        "camera.device" => config.camera.device = value.to_string(),
        "camera.program" => config.camera.program = value.to_string(),
        "camera.timeout_secs" => {
            config.camera.timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "camera.settings.width" => {
            config.camera.settings.width =
                value.parse::<u32>().context("Expected a positive integer")?;
        }
        "camera.settings.height" => {
            config.camera.settings.height =
                value.parse::<u32>().context("Expected a positive integer")?;
        }
        "camera.settings.fps" => {
            config.camera.settings.fps =
                value.parse::<u32>().context("Expected a positive integer")?;
        }
        "camera.settings.fourcc" => config.camera.settings.fourcc = value.to_string(),

        // --- camera.scheduler: interval and weekly modes are exclusive ---
        "camera.scheduler.interval_minutes" => {
            let minutes = value
                .parse::<u32>()
                .context("Expected a positive integer for camera.scheduler.interval_minutes")?;
            let scheduler = &mut config.camera.scheduler;
            scheduler.interval_minutes = Some(minutes);
            scheduler.day_of_week = None;
            scheduler.at_time = None;
        }
        "camera.scheduler.day_of_week" => {
            let scheduler = &mut config.camera.scheduler;
            scheduler.day_of_week = Some(parse_list(value));
            scheduler.interval_minutes = None;
        }
        "camera.scheduler.at_time" => {
            config.camera.scheduler.at_time = Some(parse_list(value));
        }

        // --- google_photos ---
        "google_photos.use" => config.google_photos.enabled = parse_bool(value)?,
        "google_photos.client_secrets_path" => {
            config.google_photos.client_secrets_path = PathBuf::from(value);
        }
        "google_photos.token_path" => config.google_photos.token_path = PathBuf::from(value),
        "google_photos.token_storage" => {
            config.google_photos.token_storage = match value {
                "file" => TokenStorageKind::File,
                "keyring" => TokenStorageKind::Keyring,
                other => anyhow::bail!("Expected file or keyring, got '{}'", other),
            };
        }
        "google_photos.album_title" => config.google_photos.album_title = value.to_string(),
        "google_photos.album_id" => config.google_photos.album_id = optional(value),

        // --- notifications ---
        "notifications.use" => config.notifications.enabled = parse_bool(value)?,
        "notifications.subject" => config.notifications.subject = value.to_string(),
        "notifications.message_body" => config.notifications.message_body = value.to_string(),

        // --- retention ---
        "retention.max_failed_images" => {
            config.retention.max_failed_images = value
                .parse::<usize>()
                .context("Expected a non-negative integer")?;
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = PathBuf::from(value),
        "logging.max_size_mb" => {
            config.logging.max_size_mb = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "logging.max_files" => {
            config.logging.max_files = value
                .parse::<u32>()
                .context("Expected a positive integer")?;
        }

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }

    Ok(())
}
