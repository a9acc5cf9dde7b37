//! Notify command - sends a test alert through the configured targets

use albumcam_notify::build_notifier;
use anyhow::{Context, Result};
use clap::Subcommand;

use super::CommandContext;

#[derive(Debug, Subcommand)]
pub enum NotifyCommand {
    /// Send the configured alert now
    Test {
        /// Override the subject
        #[arg(long)]
        subject: Option<String>,
    },
}

impl NotifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let NotifyCommand::Test { subject } = self;
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let notifications = &config.notifications;

        let subject = subject
            .clone()
            .unwrap_or_else(|| format!("[test] {}", notifications.subject));
        let notifier =
            build_notifier(notifications).context("Failed to set up notifications")?;

        notifier
            .notify(&subject, &notifications.message_body)
            .await
            .context("Test alert was not delivered")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "subject": subject,
            }));
        } else {
            formatter.success(&format!("Sent test alert '{subject}'"));
        }
        Ok(())
    }
}
