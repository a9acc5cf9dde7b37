//! Adapter wiring for the daemon

use std::sync::Arc;

use albumcam_camera::CommandCaptureProvider;
use albumcam_core::{
    config::Config,
    ports::IUploadClient,
    usecases::{AlertMessage, ContainmentController, RetentionQueue},
};
use albumcam_notify::build_notifier;
use albumcam_photos::provider::PhotosUploadClient;
use anyhow::{Context, Result};
use tracing::info;

/// Builds the containment controller described by `config`
///
/// Uploading is optional: with `google_photos.use: false` the controller
/// runs capture-only and images stay in `camera.photo_dir`.
pub fn build_controller(config: &Config) -> Result<ContainmentController> {
    let capture = Arc::new(CommandCaptureProvider::from_config(&config.camera));

    let uploader: Option<Arc<dyn IUploadClient>> = if config.google_photos.enabled {
        info!(
            album = %config.google_photos.album_title,
            token_storage = ?config.google_photos.token_storage,
            "Uploading to Google Photos"
        );
        Some(Arc::new(PhotosUploadClient::from_config(
            &config.google_photos,
        )))
    } else {
        info!(photo_dir = %config.camera.photo_dir.display(), "Uploading disabled, keeping images locally");
        None
    };

    let notifier =
        build_notifier(&config.notifications).context("Failed to set up notifications")?;
    let alert = AlertMessage::new(
        config.notifications.subject.clone(),
        config.notifications.message_body.clone(),
    );
    let retention = RetentionQueue::new(config.retention.max_failed_images);

    Ok(ContainmentController::new(
        capture, uploader, notifier, alert, retention,
    ))
}

#[cfg(test)]
mod tests {
    use albumcam_core::{config::ConfigBuilder, domain::ContainmentState};

    use super::*;

    #[test]
    fn test_build_capture_only_controller() {
        let config = ConfigBuilder::new()
            .upload_enabled(false)
            .max_failed_images(2)
            .build();

        let controller = build_controller(&config).unwrap();
        assert_eq!(controller.state(), ContainmentState::Running);
        assert_eq!(controller.retention().capacity(), 2);
    }

    #[tokio::test]
    async fn test_capture_only_controller_skips_recovery() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("camera_20260101_000000.jpg"), b"x").unwrap();
        let config = ConfigBuilder::new().upload_enabled(false).build();

        let mut controller = build_controller(&config).unwrap();
        let adopted = controller.recover_leftovers(dir.path()).await.unwrap();
        assert_eq!(adopted, 0);
    }
}
