//! Notification port (driven/secondary port)
//!
//! Sends the operator alert raised when the upload credential expires.
//! Subject and body are operator-configured strings; the caller passes
//! them through unchanged.
//!
//! ## Design Notes
//!
//! - Delivery failure is reported, never retried by the caller. The halt
//!   decision does not depend on whether the alert went out.

use thiserror::Error;

/// Errors that can occur when delivering a notification
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Notifications are turned off in the configuration
    #[error("Notifications are disabled")]
    Disabled,

    /// The delivery target rejected the message
    #[error("Notification rejected by {target}: {reason}")]
    Rejected { target: String, reason: String },

    /// The delivery target could not be reached
    #[error("Notification transport error: {0}")]
    Transport(String),

    /// Every configured target failed
    #[error("All notification targets failed: {0}")]
    AllFailed(String),
}

/// Port trait for delivering the operator alert
#[async_trait::async_trait]
pub trait INotifier: Send + Sync {
    /// Sends one notification
    ///
    /// # Arguments
    /// * `subject` - Short subject line
    /// * `body` - Message body
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}
