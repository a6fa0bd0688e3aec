use std::{future::Future, path::PathBuf, time::Duration};

use crate::{
    client::{InferenceReport, InfernumClient},
    navigation::CarMovementCommand,
};

#[cfg(feature = "camera")]
pub use camera::CameraSource;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("camera error: {0}")]
    Camera(String),

    #[error("no frame available yet")]
    NoFrame,
}

/// Trait for anything that can produce one encoded image per call.
///
/// Sources own their device for their whole lifetime and release it when
/// dropped.
pub trait FrameSource {
    /// Captures one image and returns it encoded (JPEG or PNG bytes).
    fn grab(&mut self) -> Result<Vec<u8>, CaptureError>;
}

/// Reads the image file again on every grab.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for FileSource {
    fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
        std::fs::read(&self.path).map_err(|source| CaptureError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(feature = "camera")]
mod camera {
    use kornia_image::ImageSize;
    use kornia_io::{
        jpegturbo::JpegTurboEncoder,
        stream::{StreamCapture, V4L2CameraConfig},
    };

    use super::{CaptureError, FrameSource};
    use crate::config::ImageResolution;

    fn camera_error(e: impl std::fmt::Display) -> CaptureError {
        CaptureError::Camera(e.to_string())
    }

    /// V4L2 camera, opened once and closed when dropped.
    pub struct CameraSource {
        capture: StreamCapture,
        encoder: JpegTurboEncoder,
    }

    impl CameraSource {
            /// Opens and starts the camera, failing if the device is unavailable.
        pub fn open(
            camera_id: u32,
            fps: u32,
            resolution: ImageResolution,
        ) -> Result<Self, CaptureError> {
            let mut capture = V4L2CameraConfig::new()
                .with_camera_id(camera_id)
                .with_fps(fps)
                .with_size(ImageSize {
                    width: resolution.width,
                    height: resolution.height,
                })
                .build()
                .map_err(camera_error)?;
            capture.start().map_err(camera_error)?;
            log::info!("Camera {camera_id} opened at {resolution}");

            let encoder = JpegTurboEncoder::new().map_err(camera_error)?;
            Ok(Self { capture, encoder })
        }
    }

    impl FrameSource for CameraSource {
        fn grab(&mut self) -> Result<Vec<u8>, CaptureError> {
            let Some(image) = self.capture.grab().map_err(camera_error)? else {
                return Err(CaptureError::NoFrame);
            };
            self.encoder.encode_rgb8(&image).map_err(camera_error)
        }
    }

    impl Drop for CameraSource {
        fn drop(&mut self) {
            match self.capture.close() {
                Ok(()) => log::info!("Camera released"),
                Err(e) => log::warn!("Failed to release the camera: {e}"),
            }
        }
    }
}

/// Counters of a finished capture loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Cycles that captured, sent and logged an image.
    pub succeeded: usize,
    /// Cycles that ended early on a capture, transport or parse error.
    pub failed: usize,
}

impl LoopStats {
    /// All completed cycles, successful or not.
    pub fn cycles(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Settings of [`capture_loop`].
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause after each cycle.
    pub interval: Duration,
    /// Prompt sent with every image, the service default when `None`.
    pub prompt: Option<String>,
    /// Parse every response as a car movement command.
    pub navigate: bool,
}

async fn run_cycle<S: FrameSource>(
    client: &InfernumClient,
    source: &mut S,
    settings: &LoopSettings,
) -> bool {
    let image = match source.grab() {
        Ok(image) => image,
        Err(e) => {
            log::error!("Error capturing image: {e}");
            return false;
        }
    };

    let response = match client.infer(&image, settings.prompt.as_deref()).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Error during API call: {e}");
            return false;
        }
    };

    let report = InferenceReport::from(&response);
    log::info!("Response received:\n{}", report.to_pretty_json());

    if settings.navigate {
        match CarMovementCommand::parse(&response.response) {
            Ok(command) => log::info!(
                "Command: {} speed={} turn={} duration={}s",
                command.m.as_str(),
                command.s,
                command.t,
                command.d
            ),
            Err(e) => {
                log::error!("Invalid movement command: {e}");
                return false;
            }
        }
    }
    true
}

/// Captures, sends and logs one image per interval until `shutdown` resolves.
///
/// Cycles never overlap and failures only end the current cycle. The source
/// is dropped before returning, however the loop ends.
pub async fn capture_loop<S, F>(
    client: &InfernumClient,
    mut source: S,
    settings: LoopSettings,
    shutdown: F,
) -> LoopStats
where
    S: FrameSource,
    F: Future<Output = ()>,
{
    let mut stats = LoopStats::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            ok = run_cycle(client, &mut source, &settings) => {
                if ok {
                    stats.succeeded += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }

    log::info!(
        "Capture loop stopped after {} cycles ({} failed)",
        stats.cycles(),
        stats.failed
    );
    drop(source);
    stats
}
