// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraSession      │  ← Lifecycle state machine, effect binding
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CaptureBackend trait│  ← Device enumeration, opening
//! │ CaptureObject trait │  ← One open camera and its streams
//! └──────────┬──────────┘
//!            │
//!       ┌────┴──────┐
//!       ▼           ▼
//!   ┌──────┐   ┌─────────┐
//!   │ V4L2 │   │Synthetic│
//!   └──────┘   └─────────┘
//! ```

pub mod format_converters;
pub mod preview;
pub mod selection;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use selection::select_camera;
pub use synthetic::{SyntheticBackend, SyntheticBehavior, SyntheticCapture};
pub use types::*;
pub use v4l2::{V4l2Backend, V4l2Capture};

use crate::config::Config;
use crate::effects::EffectDefinition;
use std::future::Future;

/// Device enumeration and opening
pub trait CaptureBackend: Send {
    /// Capture object produced by [`open`](Self::open)
    type Capture: CaptureObject;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Enumerate video capture devices
    fn enumerate_devices(&self) -> impl Future<Output = BackendResult<Vec<CameraDevice>>> + Send;

    /// Create a capture object bound to `device`.
    ///
    /// Nothing is streamed until the object is initialized and a preview is
    /// started.
    fn open(&self, device: &CameraDevice) -> BackendResult<Self::Capture>;
}

/// One open camera device and its streams
pub trait CaptureObject: Send {
    /// Open the device. May fail with [`BackendError::AccessDenied`].
    fn initialize(&mut self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Media endpoints in use; empty before a successful initialize
    fn settings(&self) -> CaptureSettings;

    /// Register where asynchronous device failures are reported
    fn set_failure_notifier(&mut self, notifier: FailureNotifier);

    /// Start the preview stream and return its frame receiver
    fn start_preview(&mut self) -> impl Future<Output = BackendResult<FrameReceiver>> + Send;

    /// Stop the preview stream
    fn stop_preview(&mut self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Stop an active recording
    fn stop_recording(&mut self) -> impl Future<Output = BackendResult<()>> + Send;

    /// Attach an effect to a stream
    fn add_effect(
        &mut self,
        stream: StreamType,
        definition: EffectDefinition,
    ) -> impl Future<Output = BackendResult<()>> + Send;

    /// Detach all effects from a stream
    fn clear_effects(&mut self, stream: StreamType) -> impl Future<Output = BackendResult<()>> + Send;

    /// Release the device. Never fails.
    fn dispose(self);
}

/// Backend chosen at runtime from configuration or the command line
#[derive(Debug, Clone)]
pub enum SystemBackend {
    V4l2(V4l2Backend),
    Synthetic(SyntheticBackend),
}

impl SystemBackend {
    /// Build the backend described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.backend,
            config.preview_width,
            config.preview_height,
            config.framerate,
        )
    }

    pub fn new(backend_type: CameraBackendType, width: u32, height: u32, framerate: u32) -> Self {
        match backend_type {
            CameraBackendType::V4l2 => SystemBackend::V4l2(V4l2Backend::new(width, height, framerate)),
            CameraBackendType::Synthetic => SystemBackend::Synthetic(
                SyntheticBackend::default().with_format(width, height, framerate),
            ),
        }
    }
}

/// Capture object of a [`SystemBackend`]
pub enum SystemCapture {
    V4l2(V4l2Capture),
    Synthetic(SyntheticCapture),
}

impl CaptureBackend for SystemBackend {
    type Capture = SystemCapture;

    fn backend_type(&self) -> CameraBackendType {
        match self {
            SystemBackend::V4l2(b) => b.backend_type(),
            SystemBackend::Synthetic(b) => b.backend_type(),
        }
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        match self {
            SystemBackend::V4l2(b) => b.enumerate_devices().await,
            SystemBackend::Synthetic(b) => b.enumerate_devices().await,
        }
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<SystemCapture> {
        match self {
            SystemBackend::V4l2(b) => b.open(device).map(SystemCapture::V4l2),
            SystemBackend::Synthetic(b) => b.open(device).map(SystemCapture::Synthetic),
        }
    }
}

impl CaptureObject for SystemCapture {
    async fn initialize(&mut self) -> BackendResult<()> {
        match self {
            SystemCapture::V4l2(c) => c.initialize().await,
            SystemCapture::Synthetic(c) => c.initialize().await,
        }
    }

    fn settings(&self) -> CaptureSettings {
        match self {
            SystemCapture::V4l2(c) => c.settings(),
            SystemCapture::Synthetic(c) => c.settings(),
        }
    }

    fn set_failure_notifier(&mut self, notifier: FailureNotifier) {
        match self {
            SystemCapture::V4l2(c) => c.set_failure_notifier(notifier),
            SystemCapture::Synthetic(c) => c.set_failure_notifier(notifier),
        }
    }

    async fn start_preview(&mut self) -> BackendResult<FrameReceiver> {
        match self {
            SystemCapture::V4l2(c) => c.start_preview().await,
            SystemCapture::Synthetic(c) => c.start_preview().await,
        }
    }

    async fn stop_preview(&mut self) -> BackendResult<()> {
        match self {
            SystemCapture::V4l2(c) => c.stop_preview().await,
            SystemCapture::Synthetic(c) => c.stop_preview().await,
        }
    }

    async fn stop_recording(&mut self) -> BackendResult<()> {
        match self {
            SystemCapture::V4l2(c) => c.stop_recording().await,
            SystemCapture::Synthetic(c) => c.stop_recording().await,
        }
    }

    async fn add_effect(&mut self, stream: StreamType, definition: EffectDefinition) -> BackendResult<()> {
        match self {
            SystemCapture::V4l2(c) => c.add_effect(stream, definition).await,
            SystemCapture::Synthetic(c) => c.add_effect(stream, definition).await,
        }
    }

    async fn clear_effects(&mut self, stream: StreamType) -> BackendResult<()> {
        match self {
            SystemCapture::V4l2(c) => c.clear_effects(stream).await,
            SystemCapture::Synthetic(c) => c.clear_effects(stream).await,
        }
    }

    fn dispose(self) {
        match self {
            SystemCapture::V4l2(c) => c.dispose(),
            SystemCapture::Synthetic(c) => c.dispose(),
        }
    }
}
