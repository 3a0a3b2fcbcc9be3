// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Produces a moving colour test pattern without any hardware. The device
//! list and failure behaviour are configurable so the full session lifecycle
//! (missing camera, denied access, device loss) can be exercised on any
//! machine.

use super::preview::{EffectSlot, PreviewWorker, deliver_frame, ensure_preview_stream};
use super::types::*;
use super::{CaptureBackend, CaptureObject};
use crate::constants::preview;
use crate::effects::EffectDefinition;
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Failure behaviour of synthetic devices
#[derive(Debug, Clone, Default)]
pub struct SyntheticBehavior {
    /// `initialize` fails with [`BackendError::AccessDenied`]
    pub deny_access: bool,
    /// `initialize` fails with this message
    pub fail_initialize: Option<String>,
    /// Report no media paths after initialize
    pub hide_media_paths: bool,
    /// Raise a device failure after this many preview frames
    pub fail_after_frames: Option<u64>,
}

/// Backend producing test-pattern cameras
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    devices: Vec<CameraDevice>,
    behavior: SyntheticBehavior,
    width: u32,
    height: u32,
    framerate: u32,
    /// Shared with every capture opened by this backend
    disconnect: Arc<AtomicBool>,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(vec![
            CameraDevice::new("synthetic:0", "Synthetic Front Camera")
                .with_location(CameraLocation::Front),
            CameraDevice::new("synthetic:1", "Synthetic Rear Camera")
                .with_location(CameraLocation::Back),
        ])
    }
}

impl SyntheticBackend {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            behavior: SyntheticBehavior::default(),
            width: preview::DEFAULT_WIDTH,
            height: preview::DEFAULT_HEIGHT,
            framerate: preview::DEFAULT_FRAMERATE,
            disconnect: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_behavior(mut self, behavior: SyntheticBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_format(mut self, width: u32, height: u32, framerate: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self.framerate = framerate.max(1);
        self
    }

    /// Simulate unplugging: running previews raise a device failure
    pub fn disconnect(&self) {
        info!("Simulating synthetic camera disconnect");
        self.disconnect.store(true, Ordering::SeqCst);
    }

    /// Undo [`disconnect`](Self::disconnect) for subsequent previews
    pub fn reconnect(&self) {
        self.disconnect.store(false, Ordering::SeqCst);
    }
}

impl CaptureBackend for SyntheticBackend {
    type Capture = SyntheticCapture;

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        debug!(count = self.devices.len(), "Enumerated synthetic cameras");
        Ok(self.devices.clone())
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<SyntheticCapture> {
        if !self.devices.iter().any(|d| d.id == device.id) {
            return Err(BackendError::DeviceNotFound(device.id.clone()));
        }

        Ok(SyntheticCapture {
            device: device.clone(),
            behavior: self.behavior.clone(),
            width: self.width,
            height: self.height,
            framerate: self.framerate,
            disconnect: self.disconnect.clone(),
            initialized: false,
            notifier: Arc::new(Mutex::new(None)),
            effects: EffectSlot::new(),
            worker: None,
            frames_produced: Arc::new(AtomicU64::new(0)),
        })
    }
}

/// An open synthetic camera
pub struct SyntheticCapture {
    device: CameraDevice,
    behavior: SyntheticBehavior,
    width: u32,
    height: u32,
    framerate: u32,
    disconnect: Arc<AtomicBool>,
    initialized: bool,
    notifier: Arc<Mutex<Option<FailureNotifier>>>,
    effects: EffectSlot,
    worker: Option<PreviewWorker>,
    frames_produced: Arc<AtomicU64>,
}

impl SyntheticCapture {
    /// Effect currently attached to the preview
    pub fn attached_effect(&self) -> Option<EffectDefinition> {
        self.effects.definition()
    }

    pub fn is_previewing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced.load(Ordering::Relaxed)
    }
}

impl CaptureObject for SyntheticCapture {
    async fn initialize(&mut self) -> BackendResult<()> {
        if self.behavior.deny_access {
            return Err(BackendError::AccessDenied(self.device.id.clone()));
        }
        if let Some(msg) = &self.behavior.fail_initialize {
            return Err(BackendError::InitializationFailed(msg.clone()));
        }

        info!(device = %self.device.name, width = self.width, height = self.height, "Synthetic camera initialized");
        self.initialized = true;
        Ok(())
    }

    fn settings(&self) -> CaptureSettings {
        if !self.initialized || self.behavior.hide_media_paths {
            return CaptureSettings::default();
        }
        CaptureSettings {
            video_device_id: self.device.id.clone(),
            audio_device_id: "synthetic:audio".to_string(),
        }
    }

    fn set_failure_notifier(&mut self, notifier: FailureNotifier) {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = Some(notifier);
    }

    async fn start_preview(&mut self) -> BackendResult<FrameReceiver> {
        if !self.initialized {
            return Err(BackendError::InitializationFailed(
                "capture is not initialized".to_string(),
            ));
        }
        if let Some(previous) = self.worker.take() {
            previous.stop()?;
        }

        let (mut sender, receiver) = futures::channel::mpsc::channel(preview::FRAME_CHANNEL_CAPACITY);
        let effects = self.effects.clone();
        let notifier = self.notifier.clone();
        let disconnect = self.disconnect.clone();
        let frames_produced = self.frames_produced.clone();
        let fail_after = self.behavior.fail_after_frames;
        let (width, height) = (self.width, self.height);
        let interval = Duration::from_secs_f64(1.0 / self.framerate as f64);

        let worker = PreviewWorker::spawn("synthetic-capture", move |running| {
            let mut sequence = 0u64;
            while running.load(Ordering::SeqCst) {
                let lost = disconnect.load(Ordering::SeqCst)
                    || fail_after.is_some_and(|limit| sequence >= limit);
                if lost {
                    warn!(frame = sequence, "Synthetic camera lost");
                    if let Some(notifier) = notifier.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
                        notifier.notify("The camera was disconnected");
                    }
                    break;
                }

                let captured_at = Instant::now();
                let image = test_pattern(width, height, sequence);
                deliver_frame(&mut sender, &effects, image, sequence, captured_at);
                frames_produced.fetch_add(1, Ordering::Relaxed);
                sequence += 1;

                std::thread::sleep(interval.saturating_sub(captured_at.elapsed()));
            }
            debug!(frames = sequence, "Synthetic capture loop ended");
        })?;

        self.worker = Some(worker);
        info!(device = %self.device.name, "Synthetic preview started");
        Ok(receiver)
    }

    async fn stop_preview(&mut self) -> BackendResult<()> {
        match self.worker.take() {
            Some(worker) => worker.stop(),
            None => Err(BackendError::NotStreaming),
        }
    }

    async fn stop_recording(&mut self) -> BackendResult<()> {
        Err(BackendError::NoRecordingInProgress)
    }

    async fn add_effect(&mut self, stream: StreamType, definition: EffectDefinition) -> BackendResult<()> {
        ensure_preview_stream(stream)?;
        let kind = self.effects.attach(definition)?;
        debug!(effect = %kind, "Synthetic effect attached");
        Ok(())
    }

    async fn clear_effects(&mut self, stream: StreamType) -> BackendResult<()> {
        ensure_preview_stream(stream)?;
        self.effects.clear();
        Ok(())
    }

    fn dispose(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop();
        }
        info!(device = %self.device.name, "Synthetic camera released");
    }
}

/// Diagonal colour bands scrolling one pixel per frame
pub fn test_pattern(width: u32, height: u32, sequence: u64) -> RgbaImage {
    const BANDS: [[u8; 3]; 6] = [
        [220, 60, 60],
        [230, 180, 40],
        [70, 190, 90],
        [50, 170, 210],
        [80, 90, 220],
        [190, 80, 190],
    ];
    let band_width = (width / 8).max(1) as u64;

    RgbaImage::from_fn(width, height, |x, y| {
        let position = (x as u64 + y as u64 + sequence) / band_width;
        let [r, g, b] = BANDS[(position % BANDS.len() as u64) as usize];
        Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{EffectDescriptor, EffectKind};
    use futures::StreamExt;

    fn backend() -> SyntheticBackend {
        SyntheticBackend::default().with_format(32, 24, 120)
    }

    #[tokio::test]
    async fn test_preview_delivers_frames_with_effect() {
        let backend = backend();
        let devices = backend.enumerate_devices().await.unwrap();
        let mut capture = backend.open(&devices[0]).unwrap();
        capture.initialize().await.unwrap();
        capture
            .add_effect(
                StreamType::VideoPreview,
                EffectDescriptor::with_parameter("Vignette", "Amount", 1.0).to_definition(),
            )
            .await
            .unwrap();

        let mut frames = capture.start_preview().await.unwrap();
        let frame = frames.next().await.unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
        assert_eq!(frame.effect, Some(EffectKind::Vignette));

        capture.stop_preview().await.unwrap();
        capture.dispose();
    }

    #[tokio::test]
    async fn test_denied_access() {
        let backend = backend().with_behavior(SyntheticBehavior {
            deny_access: true,
            ..Default::default()
        });
        let devices = backend.enumerate_devices().await.unwrap();
        let mut capture = backend.open(&devices[0]).unwrap();
        assert!(matches!(
            capture.initialize().await,
            Err(BackendError::AccessDenied(_))
        ));
        assert!(!capture.settings().has_media_path());
    }

    #[tokio::test]
    async fn test_disconnect_notifies() {
        let backend = backend();
        let devices = backend.enumerate_devices().await.unwrap();
        let mut capture = backend.open(&devices[0]).unwrap();
        capture.initialize().await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        capture.set_failure_notifier(FailureNotifier::new(3, tx));
        let _frames = capture.start_preview().await.unwrap();

        backend.disconnect();
        let failure = rx.recv().await.unwrap();
        assert_eq!(failure.generation, 3);
        capture.dispose();
    }

    #[tokio::test]
    async fn test_record_stream_rejects_effects() {
        let backend = backend();
        let devices = backend.enumerate_devices().await.unwrap();
        let mut capture = backend.open(&devices[0]).unwrap();
        capture.initialize().await.unwrap();
        let result = capture
            .add_effect(StreamType::VideoRecord, EffectDescriptor::new("Sepia").to_definition())
            .await;
        assert!(result.is_err());
        assert!(capture.attached_effect().is_none());
    }

    #[test]
    fn test_pattern_moves() {
        let a = test_pattern(16, 16, 0);
        let b = test_pattern(16, 16, 1);
        assert_ne!(a, b);
    }
}
