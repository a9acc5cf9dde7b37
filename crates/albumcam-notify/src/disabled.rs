//! Notifier used when alerts are turned off

use albumcam_core::ports::{INotifier, NotifyError};
use tracing::error;

/// Drops every alert and reports [`NotifyError::Disabled`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl INotifier for DisabledNotifier {
    async fn notify(&self, subject: &str, _body: &str) -> Result<(), NotifyError> {
        error!(subject, "Notifications are disabled; operator alert not sent");
        Err(NotifyError::Disabled)
    }
}
