//! albumcam Notify - operator alert adapters
//!
//! Implementations of [`INotifier`](albumcam_core::ports::INotifier):
//!
//! - [`WebhookNotifier`] - POSTs a JSON alert to an HTTP relay
//! - [`CommandNotifier`] - pipes the alert into a local program such as `mail`
//! - [`DisabledNotifier`] - used when notifications are turned off
//! - [`FanoutNotifier`] - delivers to several targets, succeeding if any does
//!
//! [`build_notifier`] assembles the right combination from the
//! `notifications` config section.

pub mod command;
pub mod disabled;
pub mod fanout;
pub mod webhook;

use std::{sync::Arc, time::Duration};

use albumcam_core::{
    config::NotificationsConfig,
    ports::{INotifier, NotifyError},
};

pub use command::CommandNotifier;
pub use disabled::DisabledNotifier;
pub use fanout::FanoutNotifier;
pub use webhook::WebhookNotifier;

/// Upper bound on a single delivery attempt
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the notifier described by `config`
///
/// Returns a [`DisabledNotifier`] when notifications are off or no target
/// is configured, the single target when there is one, and a
/// [`FanoutNotifier`] otherwise.
pub fn build_notifier(config: &NotificationsConfig) -> Result<Arc<dyn INotifier>, NotifyError> {
    if !config.enabled {
        return Ok(Arc::new(DisabledNotifier));
    }

    let mut targets: Vec<Arc<dyn INotifier>> = Vec::new();
    if let Some(webhook) = &config.webhook {
        targets.push(Arc::new(WebhookNotifier::from_config(webhook)?));
    }
    if let Some(command) = &config.command {
        targets.push(Arc::new(CommandNotifier::from_config(command)));
    }

    Ok(match targets.len() {
        0 => Arc::new(DisabledNotifier),
        1 => targets.remove(0),
        _ => Arc::new(FanoutNotifier::new(targets)),
    })
}
