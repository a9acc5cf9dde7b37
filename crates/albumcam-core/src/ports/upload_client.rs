//! Upload client port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - Returns an [`UploadOutcome`] instead of a `Result`. The adapter owns
//!   the mapping from upstream error codes to outcome variants, so the
//!   containment logic only ever matches on three cases.
//! - The adapter may retry transient failures internally; the outcome
//!   reports the final classification for this image.

use std::path::Path;

use crate::domain::UploadOutcome;

/// Port trait for submitting an image to the photo library
#[async_trait::async_trait]
pub trait IUploadClient: Send + Sync {
    /// Uploads the image at `image_path` into the configured album
    async fn upload(&self, image_path: &Path) -> UploadOutcome;
}
