// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::effects::EffectKind;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices
    #[default]
    V4l2,
    /// Generated test pattern, no hardware required
    Synthetic,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Which way a camera faces, when the device reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraLocation {
    /// Faces the user
    Front,
    /// Faces away from the user
    Back,
    /// Separate device (e.g. USB webcam)
    External,
}

impl CameraLocation {
    /// Parse a location string ("front", "back", "external")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => Some(CameraLocation::Front),
            "back" | "rear" | "environment" | "world" => Some(CameraLocation::Back),
            "external" => Some(CameraLocation::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for CameraLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraLocation::Front => write!(f, "front"),
            CameraLocation::Back => write!(f, "back"),
            CameraLocation::External => write!(f, "external"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Backend-specific identifier (device path for V4L2)
    pub id: String,
    pub name: String,
    /// Enclosure location, if known
    pub location: Option<CameraLocation>,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: CameraLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_front_facing(&self) -> bool {
        self.location == Some(CameraLocation::Front)
    }
}

/// Media endpoints reported by an initialized capture object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Video device actually opened (empty if none)
    pub video_device_id: String,
    /// Audio device opened alongside the camera (empty if none)
    pub audio_device_id: String,
}

impl CaptureSettings {
    /// True if the capture object reports at least one usable media path.
    ///
    /// Either path is enough. V4L2 capture never opens an audio device, so
    /// requiring both would reject every camera.
    pub fn has_media_path(&self) -> bool {
        !self.video_device_id.is_empty() || !self.audio_device_id.is_empty()
    }
}

/// Stream an effect is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Live preview stream
    VideoPreview,
    /// Recorded stream
    VideoRecord,
}

/// A single preview frame (RGBA, effect already applied)
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub image: RgbaImage,
    /// Frame counter since preview start
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
    /// Effect applied to this frame, if any
    pub effect: Option<EffectKind>,
}

impl CameraFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Mean BT.601 luminance in 0-255
    pub fn mean_luma(&self) -> f32 {
        let count = (self.image.width() as u64 * self.image.height() as u64).max(1);
        let sum: f64 = self
            .image
            .pixels()
            .map(|p| 0.299 * p.0[0] as f64 + 0.587 * p.0[1] as f64 + 0.114 * p.0[2] as f64)
            .sum();
        (sum / count as f64) as f32
    }
}

/// Frame receiver type for preview streams
pub type FrameReceiver = futures::channel::mpsc::Receiver<CameraFrame>;

/// Frame sender type for preview streams
pub type FrameSender = futures::channel::mpsc::Sender<CameraFrame>;

/// Asynchronous device failure raised by a capture object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    /// Generation of the capture object that raised the failure
    pub generation: u64,
    pub message: String,
}

/// Handle given to a capture object for reporting device failures.
///
/// Failures travel over a channel to the owning session; the capture
/// object never touches session state itself.
#[derive(Debug, Clone)]
pub struct FailureNotifier {
    generation: u64,
    sender: UnboundedSender<CaptureFailure>,
}

impl FailureNotifier {
    pub fn new(generation: u64, sender: UnboundedSender<CaptureFailure>) -> Self {
        Self { generation, sender }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report a failure; safe to call from any thread
    pub fn notify(&self, message: impl Into<String>) {
        let failure = CaptureFailure {
            generation: self.generation,
            message: message.into(),
        };
        if self.sender.send(failure).is_err() {
            debug!(
                generation = self.generation,
                "Capture failure dropped, session is gone"
            );
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Access to the device was denied
    AccessDenied(String),
    /// Failed to initialize the device
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Effect identifier not known to this backend
    EffectNotSupported(String),
    /// Operation requires a running preview
    NotStreaming,
    /// No recording in progress
    NoRecordingInProgress,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl BackendError {
    /// Map an I/O error from opening a device node
    pub fn from_open_error(path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                BackendError::AccessDenied(format!("{}: {}", path, err))
            }
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(path.to_string()),
            _ if err.raw_os_error() == Some(libc::EBUSY) => {
                BackendError::InitializationFailed(format!("{} is busy", path))
            }
            _ => BackendError::IoError(format!("{}: {}", path, err)),
        }
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::EffectNotSupported(id) => write!(f, "Effect not supported: {}", id),
            BackendError::NotStreaming => write!(f, "Preview is not running"),
            BackendError::NoRecordingInProgress => write!(f, "No recording in progress"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        assert_eq!(CameraLocation::parse("Front"), Some(CameraLocation::Front));
        assert_eq!(CameraLocation::parse("rear"), Some(CameraLocation::Back));
        assert_eq!(CameraLocation::parse("external"), Some(CameraLocation::External));
        assert_eq!(CameraLocation::parse("sideways"), None);
    }

    #[test]
    fn test_media_path() {
        assert!(!CaptureSettings::default().has_media_path());
        let settings = CaptureSettings {
            video_device_id: "/dev/video0".to_string(),
            audio_device_id: String::new(),
        };
        assert!(settings.has_media_path());
    }

    #[test]
    fn test_open_error_mapping() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            BackendError::from_open_error("/dev/video0", &denied),
            BackendError::AccessDenied(_)
        ));
        let busy = std::io::Error::from_raw_os_error(libc::EBUSY);
        assert!(matches!(
            BackendError::from_open_error("/dev/video0", &busy),
            BackendError::InitializationFailed(_)
        ));
    }

    #[test]
    fn test_failure_notifier_tags_generation() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = FailureNotifier::new(7, tx);
        notifier.notify("unplugged");
        assert_eq!(
            rx.try_recv().unwrap(),
            CaptureFailure {
                generation: 7,
                message: "unplugged".to_string()
            }
        );
    }

    #[test]
    fn test_mean_luma() {
        let frame = CameraFrame {
            image: RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255])),
            sequence: 0,
            captured_at: Instant::now(),
            effect: None,
        };
        assert!((frame.mean_luma() - 255.0).abs() < 0.01);
    }
}
