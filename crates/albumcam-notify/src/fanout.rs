//! Delivery to several alert targets

use std::sync::Arc;

use albumcam_core::ports::{INotifier, NotifyError};
use tracing::warn;

/// Sends each alert to every target
///
/// Succeeds if at least one target accepted the alert. Targets are tried
/// in order and all of them are attempted.
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn INotifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn INotifier>>) -> Self {
        Self { targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait::async_trait]
impl INotifier for FanoutNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.targets.is_empty() {
            return Err(NotifyError::Disabled);
        }

        let mut delivered = false;
        let mut failures = Vec::new();
        for target in &self.targets {
            match target.notify(subject, body).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    warn!(error = %e, "Alert target failed");
                    failures.push(e.to_string());
                }
            }
        }

        if delivered {
            Ok(())
        } else {
            Err(NotifyError::AllFailed(failures.join("; ")))
        }
    }
}
