//! Upload command - sends one image to the configured album
//!
//! Goes through the same client and outcome classification as the daemon,
//! without the containment state machine: an expired credential is
//! reported, nothing is deleted.

use std::path::PathBuf;

use albumcam_photos::provider::{classify_error, PhotosUploadClient};
use anyhow::{Context, Result};
use tracing::info;

use super::CommandContext;

#[derive(Debug, clap::Args)]
pub struct UploadCommand {
    /// Image file to upload
    pub path: PathBuf,
}

impl UploadCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        anyhow::ensure!(
            self.path.is_file(),
            "{} is not a file",
            self.path.display()
        );

        info!(path = %self.path.display(), "Uploading image");
        let client = PhotosUploadClient::from_config(&config.google_photos);

        match client.try_upload(&self.path).await {
            Ok(item) => {
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "media_item_id": item.id,
                        "filename": item.filename,
                        "product_url": item.product_url,
                    }));
                } else {
                    formatter.success(&format!("Uploaded {}", self.path.display()));
                    formatter.field("Media item", &item.id);
                    if let Some(url) = &item.product_url {
                        formatter.field("URL", url);
                    }
                }
                Ok(())
            }
            Err(e) => {
                let outcome = classify_error(&e);
                if outcome.is_auth_expired() {
                    formatter.error("Google Photos credential expired or missing");
                    formatter.info("Run 'albumcam auth login' to renew it");
                }
                Err(e).context(format!("Upload failed ({outcome})"))
            }
        }
    }
}
