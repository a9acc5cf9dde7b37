//! Capture provider port (driven/secondary port)
//!
//! Implementations drive a camera and write one image per call. Every
//! [`CaptureError`] is transient from the controller's point of view: the
//! camera may be busy or unplugged and the next tick tries again.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::CaptureResult;

/// Errors that can occur while capturing an image
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture program could not be started
    #[error("Failed to start capture program '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The capture program exited unsuccessfully
    #[error("Capture program exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The capture did not finish in time
    #[error("Capture timed out after {0:?}")]
    Timeout(Duration),

    /// The program reported success but no usable image was written
    #[error("Capture produced no image at {0}")]
    MissingOutput(PathBuf),

    /// An I/O error occurred preparing the output location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port trait for taking a photo
#[async_trait::async_trait]
pub trait ICaptureProvider: Send + Sync {
    /// Captures one image and returns where it was written
    async fn capture(&self) -> Result<CaptureResult, CaptureError>;
}
