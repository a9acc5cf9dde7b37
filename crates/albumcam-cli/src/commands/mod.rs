//! CLI subcommands

pub mod auth;
pub mod capture;
pub mod completions;
pub mod config;
pub mod notify;
pub mod upload;

use std::path::PathBuf;

use albumcam_core::config::Config;
use anyhow::Result;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    /// `--config`, when given
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.is_json())
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(Config::default_path)
    }

    /// Loads the configuration
    ///
    /// A file passed with `--config` must exist; a missing default file
    /// yields the built-in defaults.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        if self.config_path.is_some() || path.exists() {
            Config::load(&path)
        } else {
            Ok(Config::default())
        }
    }
}
