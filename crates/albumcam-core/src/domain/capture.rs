//! Captured image handle
//!
//! A [`CaptureResult`] points at an image file written by the capture
//! provider. It lives for one tick: the containment controller either
//! deletes the file, hands it to the retention queue, or (capture-only
//! mode) leaves it in the photo directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// File name prefix used for every captured image
pub const CAPTURE_FILE_PREFIX: &str = "camera_";

/// A successfully captured image on local disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Where the capture provider wrote the image
    pub image_path: PathBuf,
    /// When the image was taken
    pub captured_at: DateTime<Utc>,
}

impl CaptureResult {
    /// Creates a capture result stamped with the current time
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            captured_at: Utc::now(),
        }
    }

    /// Creates a capture result with an explicit timestamp
    pub fn with_timestamp(image_path: impl Into<PathBuf>, captured_at: DateTime<Utc>) -> Self {
        Self {
            image_path: image_path.into(),
            captured_at,
        }
    }

    /// File name of the image, used as the media item file name upstream
    pub fn file_name(&self) -> Option<&str> {
        self.image_path.file_name().and_then(|n| n.to_str())
    }
}

/// Builds the path of the next capture inside `photo_dir`
///
/// Uses local time so file names match the operator's wall clock:
/// `camera_20260119_093000.jpg`.
pub fn capture_path(photo_dir: &Path, at: DateTime<Local>) -> PathBuf {
    photo_dir.join(format!(
        "{}{}.jpg",
        CAPTURE_FILE_PREFIX,
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Returns true if `path` looks like an image written by albumcam
pub fn is_capture_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
        .unwrap_or(false);
    name.starts_with(CAPTURE_FILE_PREFIX) && ext_ok
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_capture_path_format() {
        let at = Local.with_ymd_and_hms(2026, 1, 19, 9, 30, 5).unwrap();
        let path = capture_path(Path::new("/var/lib/albumcam"), at);
        assert_eq!(
            path,
            PathBuf::from("/var/lib/albumcam/camera_20260119_093005.jpg")
        );
    }

    #[test]
    fn test_file_name() {
        let capture = CaptureResult::new("/photos/camera_20260119_093005.jpg");
        assert_eq!(capture.file_name(), Some("camera_20260119_093005.jpg"));
    }

    #[test]
    fn test_is_capture_file() {
        assert!(is_capture_file(Path::new("/p/camera_20260119_093005.jpg")));
        assert!(is_capture_file(Path::new("/p/camera_x.PNG")));
        assert!(!is_capture_file(Path::new("/p/holiday.jpg")));
        assert!(!is_capture_file(Path::new("/p/camera_notes.txt")));
        assert!(!is_capture_file(Path::new("/p/camera_noext")));
    }
}
