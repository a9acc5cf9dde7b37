//! Containment controller
//!
//! Runs one scheduled tick: capture, upload, classify. Transient capture
//! and upload failures are absorbed locally. An expired credential is the
//! single fatal outcome: the controller deletes local images, sends one
//! alert, and moves to [`ContainmentState::Halted`], after which every
//! tick is a no-op.
//!
//! ## Flow
//!
//! ```text
//! tick ──→ capture ──err──→ warn, Running
//!             │
//!           upload ──Success──────────→ delete image, flush backlog, Running
//!             ├────TransientFailure──→ retention queue (bounded), Running
//!             └────AuthExpired────────→ delete images, notify once, Halted
//! ```
//!
//! The controller takes `&mut self` for a tick, so two ticks can never
//! run against the same state at once.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, error, info, warn};

use super::retention::{remove_image, RetentionQueue};
use crate::{
    domain::{ContainmentState, UploadOutcome},
    ports::{ICaptureProvider, INotifier, IUploadClient},
};

/// Exit status used when the process stops because the credential expired
///
/// `EX_NOPERM` from sysexits.h. Supervisors can treat it as "do not
/// restart until a human refreshed the credential".
pub const HALT_EXIT_CODE: u8 = 77;

/// Operator-configured alert sent when the credential expires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// What happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The controller is halted; nothing was attempted
    Skipped,
    /// The camera failed; nothing was uploaded
    CaptureFailed { reason: String },
    /// Uploading is disabled; the image stays in the photo directory
    CaptureOnly { image_path: PathBuf },
    /// The image was uploaded and deleted locally
    Uploaded {
        remote_id: String,
        /// Previously retained images uploaded after this one
        backlog_uploaded: usize,
    },
    /// The upload failed transiently and the image went to the retention queue
    Retained { reason: String, retained: usize },
    /// The credential expired and the controller halted
    Halted {
        /// Whether the alert was delivered
        notified: bool,
    },
}

/// Result of a tick: the state after it and what happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub state: ContainmentState,
    pub outcome: TickOutcome,
}

impl TickReport {
    /// Returns true when the scheduler must stop issuing ticks
    pub fn should_halt(&self) -> bool {
        self.state.is_halted()
    }
}

/// Result of re-submitting retained images
enum BacklogFlush {
    Done(usize),
    AuthExpired(String),
}

/// Drives capture and upload for each tick and owns the containment state
pub struct ContainmentController {
    capture: Arc<dyn ICaptureProvider>,
    uploader: Option<Arc<dyn IUploadClient>>,
    notifier: Arc<dyn INotifier>,
    alert: AlertMessage,
    retention: RetentionQueue,
    state: ContainmentState,
}

impl ContainmentController {
    /// Creates a controller in the `Running` state
    ///
    /// # Arguments
    /// * `capture` - Camera adapter
    /// * `uploader` - Photo library adapter, `None` for capture-only mode
    /// * `notifier` - Alert delivery adapter
    /// * `alert` - Subject and body sent when the credential expires
    /// * `retention` - Queue for images whose upload failed transiently
    pub fn new(
        capture: Arc<dyn ICaptureProvider>,
        uploader: Option<Arc<dyn IUploadClient>>,
        notifier: Arc<dyn INotifier>,
        alert: AlertMessage,
        retention: RetentionQueue,
    ) -> Self {
        Self {
            capture,
            uploader,
            notifier,
            alert,
            retention,
            state: ContainmentState::Running,
        }
    }

    pub fn state(&self) -> ContainmentState {
        self.state
    }

    pub fn retention(&self) -> &RetentionQueue {
        &self.retention
    }

    /// Adopts images left in `photo_dir` by an earlier run into the retention queue
    ///
    /// Skipped in capture-only mode, where the directory is the archive.
    pub async fn recover_leftovers(&mut self, photo_dir: &Path) -> std::io::Result<usize> {
        if self.uploader.is_none() {
            return Ok(0);
        }
        self.retention.adopt_existing(photo_dir).await
    }

    /// Runs one capture/upload cycle
    pub async fn on_tick(&mut self) -> TickReport {
        if self.state.is_halted() {
            debug!("Tick ignored, controller is halted");
            return self.report(TickOutcome::Skipped);
        }

        let capture = match self.capture.capture().await {
            Ok(capture) => capture,
            Err(e) => {
                warn!(error = %e, "Capture failed, skipping this tick");
                return self.report(TickOutcome::CaptureFailed {
                    reason: e.to_string(),
                });
            }
        };
        let image_path = capture.image_path;

        let Some(uploader) = self.uploader.clone() else {
            info!(path = %image_path.display(), "Upload disabled, keeping captured image");
            return self.report(TickOutcome::CaptureOnly { image_path });
        };

        match uploader.upload(&image_path).await {
            UploadOutcome::Success { remote_id } => {
                remove_image(&image_path).await;
                info!(
                    path = %image_path.display(),
                    remote_id = %remote_id,
                    "Uploaded image and removed local copy"
                );
                match self.flush_backlog(uploader.as_ref()).await {
                    BacklogFlush::Done(backlog_uploaded) => self.report(TickOutcome::Uploaded {
                        remote_id,
                        backlog_uploaded,
                    }),
                    BacklogFlush::AuthExpired(reason) => self.halt(None, &reason).await,
                }
            }
            UploadOutcome::TransientFailure { reason } => {
                self.retention.retain(image_path.clone()).await;
                warn!(
                    path = %image_path.display(),
                    reason = %reason,
                    retained = self.retention.len(),
                    capacity = self.retention.capacity(),
                    "Upload failed transiently, image retained"
                );
                let retained = self.retention.len();
                self.report(TickOutcome::Retained { reason, retained })
            }
            UploadOutcome::AuthExpired { reason } => self.halt(Some(&image_path), &reason).await,
        }
    }

    /// Re-submits retained images, oldest first, after a successful upload
    ///
    /// Stops at the first transient failure and puts that image back.
    async fn flush_backlog(&mut self, uploader: &dyn IUploadClient) -> BacklogFlush {
        let mut uploaded = 0;

        while let Some(path) = self.retention.pop_oldest() {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "Retained image vanished, dropping it");
                continue;
            }

            match uploader.upload(&path).await {
                UploadOutcome::Success { remote_id } => {
                    remove_image(&path).await;
                    info!(
                        path = %path.display(),
                        remote_id = %remote_id,
                        "Uploaded retained image"
                    );
                    uploaded += 1;
                }
                UploadOutcome::TransientFailure { reason } => {
                    warn!(
                        path = %path.display(),
                        reason = %reason,
                        "Retained image upload failed again, keeping it"
                    );
                    self.retention.restore_oldest(path);
                    break;
                }
                UploadOutcome::AuthExpired { reason } => {
                    remove_image(&path).await;
                    return BacklogFlush::AuthExpired(reason);
                }
            }
        }

        BacklogFlush::Done(uploaded)
    }

    /// Terminal path: clean up, alert once, halt
    async fn halt(&mut self, image_path: Option<&Path>, reason: &str) -> TickReport {
        let halted = match self.state.halt() {
            Ok(next) => next,
            Err(e) => {
                debug!(error = %e, "Already halted, not alerting again");
                return self.report(TickOutcome::Skipped);
            }
        };

        if let Some(path) = image_path {
            remove_image(path).await;
        }
        self.retention.purge().await;

        let notified = match self
            .notifier
            .notify(&self.alert.subject, &self.alert.body)
            .await
        {
            Ok(()) => {
                info!(subject = %self.alert.subject, "Credential-expired notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to send credential-expired notification");
                false
            }
        };

        self.state = halted;
        error!(
            critical = true,
            reason = %reason,
            exit_code = HALT_EXIT_CODE,
            "Upload credential expired; halting capture and upload"
        );

        self.report(TickOutcome::Halted { notified })
    }

    fn report(&self, outcome: TickOutcome) -> TickReport {
        TickReport {
            state: self.state,
            outcome,
        }
    }
}
