//! albumcam Camera - capture adapter
//!
//! Implements [`ICaptureProvider`] by running an external capture program
//! (`fswebcam` by default) once per tick. The program's arguments are
//! templates; these placeholders are substituted before each run:
//!
//! | placeholder | value |
//! |---|---|
//! | `{device}` | `camera.device` |
//! | `{width}`, `{height}`, `{fps}` | `camera.settings` |
//! | `{fourcc}` | `camera.settings.fourcc` |
//! | `{output}` | `{photo_dir}/camera_{YYYYmmdd_HHMMSS}.jpg` |
//!
//! A capture succeeds only if the program exits with status 0 within the
//! timeout and leaves a non-empty file at `{output}`.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use albumcam_core::{
    config::CameraConfig,
    domain::{capture::capture_path, CaptureResult},
    ports::{CaptureError, ICaptureProvider},
};
use chrono::Local;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr excerpt kept in a [`CaptureError::Failed`]
const MAX_STDERR_CHARS: usize = 512;

/// Capture format requested from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub fourcc: String,
}

/// Capture provider that shells out to a capture program
#[derive(Debug, Clone)]
pub struct CommandCaptureProvider {
    program: String,
    args: Vec<String>,
    photo_dir: PathBuf,
    settings: CaptureSettings,
    timeout: Duration,
}

impl CommandCaptureProvider {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        photo_dir: impl Into<PathBuf>,
        settings: CaptureSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            photo_dir: photo_dir.into(),
            settings,
            timeout,
        }
    }

    /// Builds a provider from the `camera` config section
    pub fn from_config(config: &CameraConfig) -> Self {
        let settings = CaptureSettings {
            device: config.device.clone(),
            width: config.settings.width,
            height: config.settings.height,
            fps: config.settings.fps,
            fourcc: config.settings.fourcc.clone(),
        };
        Self::new(
            config.program.clone(),
            config.args.clone(),
            config.photo_dir.clone(),
            settings,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    /// Substitutes placeholders in the configured arguments
    pub fn render_args(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        let width = self.settings.width.to_string();
        let height = self.settings.height.to_string();
        let fps = self.settings.fps.to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{device}", &self.settings.device)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
                    .replace("{fps}", &fps)
                    .replace("{fourcc}", &self.settings.fourcc)
                    .replace("{output}", &output)
            })
            .collect()
    }

    async fn run(&self, output: &Path) -> Result<(), CaptureError> {
        let args = self.render_args(output);
        debug!(program = %self.program, ?args, "Running capture program");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout(self.timeout))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CaptureError::Failed {
                status: result.status.to_string(),
                stderr: tail(stderr.trim(), MAX_STDERR_CHARS),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
            _ => Err(CaptureError::MissingOutput(output.to_path_buf())),
        }
    }
}

/// Keeps the last `max` characters of `s`
fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        return s.to_string();
    }
    s.chars().skip(count - max).collect()
}

#[async_trait::async_trait]
impl ICaptureProvider for CommandCaptureProvider {
    async fn capture(&self) -> Result<CaptureResult, CaptureError> {
        tokio::fs::create_dir_all(&self.photo_dir).await?;

        let output = capture_path(&self.photo_dir, Local::now());
        match self.run(&output).await {
            Ok(()) => {
                info!(path = %output.display(), "Captured image");
                Ok(CaptureResult::new(output))
            }
            Err(e) => {
                // Do not leave partial files for the retention scan to adopt.
                if let Err(remove_err) = tokio::fs::remove_file(&output).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %output.display(), error = %remove_err, "Failed to remove partial capture");
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CaptureSettings {
        CaptureSettings {
            device: "/dev/video0".into(),
            width: 1280,
            height: 720,
            fps: 30,
            fourcc: "MJPG".into(),
        }
    }

    fn shell(dir: &Path, script: &str, timeout: Duration) -> CommandCaptureProvider {
        CommandCaptureProvider::new(
            "sh",
            vec![
                "-c".into(),
                script.into(),
                "sh".into(),
                "{output}".into(),
            ],
            dir,
            settings(),
            timeout,
        )
    }

    #[test]
    fn test_render_args_substitutes_placeholders() {
        let provider = CommandCaptureProvider::new(
            "fswebcam",
            vec![
                "--device".into(),
                "{device}".into(),
                "--resolution".into(),
                "{width}x{height}".into(),
                "--fps".into(),
                "{fps}".into(),
                "--palette".into(),
                "{fourcc}".into(),
                "{output}".into(),
            ],
            "/tmp/photos",
            settings(),
            Duration::from_secs(5),
        );

        let args = provider.render_args(Path::new("/tmp/photos/camera_1.jpg"));
        assert_eq!(
            args,
            vec![
                "--device",
                "/dev/video0",
                "--resolution",
                "1280x720",
                "--fps",
                "30",
                "--palette",
                "MJPG",
                "/tmp/photos/camera_1.jpg",
            ]
        );
    }

    #[test]
    fn test_from_config_uses_camera_section() {
        let config = CameraConfig::default();
        let provider = CommandCaptureProvider::from_config(&config);
        assert_eq!(provider.program, "fswebcam");
        assert_eq!(provider.timeout, Duration::from_secs(config.timeout_secs));
        let args = provider.render_args(Path::new("out.jpg"));
        assert!(args.contains(&"/dev/video0".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.jpg"));
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_writes_image_into_new_dir() {
        let dir = tempfile::tempdir().unwrap();
        let photo_dir = dir.path().join("photos");
        let provider = shell(&photo_dir, "printf 'jpeg' > \"$1\"", Duration::from_secs(10));

        let result = provider.capture().await.expect("capture");

        assert!(result.image_path.starts_with(&photo_dir));
        assert!(result.file_name().unwrap().starts_with("camera_"));
        assert_eq!(std::fs::read(&result.image_path).unwrap(), b"jpeg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_reports_failure_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let provider = shell(
            dir.path(),
            "printf partial > \"$1\"; echo 'device busy' >&2; exit 3",
            Duration::from_secs(10),
        );

        let err = provider.capture().await.unwrap_err();

        match err {
            CaptureError::Failed { stderr, .. } => assert_eq!(stderr, "device busy"),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_without_output_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let provider = shell(dir.path(), "exit 0", Duration::from_secs(10));

        let err = provider.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::MissingOutput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_empty_output_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let provider = shell(dir.path(), ": > \"$1\"", Duration::from_secs(10));

        let err = provider.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::MissingOutput(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = shell(dir.path(), "sleep 5", Duration::from_millis(100));

        let err = provider.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_capture_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CommandCaptureProvider::new(
            "/nonexistent/albumcam-capture",
            vec!["{output}".into()],
            dir.path(),
            settings(),
            Duration::from_secs(1),
        );

        let err = provider.capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }
}
