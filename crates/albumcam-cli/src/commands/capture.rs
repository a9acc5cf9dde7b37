//! Capture command - takes one picture with the configured camera
//!
//! Useful for checking device, resolution and program arguments before
//! starting the daemon. The image stays in `camera.photo_dir` unless
//! `--discard` is given.

use albumcam_camera::CommandCaptureProvider;
use albumcam_core::ports::ICaptureProvider;
use anyhow::{Context, Result};

use super::CommandContext;

#[derive(Debug, clap::Args)]
pub struct CaptureCommand {
    /// Delete the image after reporting it
    #[arg(long)]
    pub discard: bool,
}

impl CaptureCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let provider = CommandCaptureProvider::from_config(&config.camera);

        formatter.info(&format!(
            "Capturing from {} with {}...",
            config.camera.device, config.camera.program
        ));
        let capture = provider.capture().await.context("Capture failed")?;
        let size = std::fs::metadata(&capture.image_path)
            .map(|m| m.len())
            .unwrap_or(0);

        if self.discard {
            std::fs::remove_file(&capture.image_path).with_context(|| {
                format!("Failed to remove {}", capture.image_path.display())
            })?;
        }

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "path": capture.image_path.display().to_string(),
                "bytes": size,
                "captured_at": capture.captured_at.to_rfc3339(),
                "kept": !self.discard,
            }));
        } else {
            formatter.success(&format!("Captured {}", capture.image_path.display()));
            formatter.field("Size", &format!("{size} bytes"));
            if self.discard {
                formatter.info("Image discarded");
            }
        }
        Ok(())
    }
}
