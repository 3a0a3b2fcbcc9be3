// SPDX-License-Identifier: GPL-3.0-only

//! Recording mock backend shared by the integration tests

#![allow(dead_code)]

use effect_cam::backends::camera::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraLocation, CaptureBackend,
    CaptureObject, CaptureSettings, FailureNotifier, FrameReceiver, FrameSender, StreamType,
};
use effect_cam::effects::EffectDefinition;
use std::sync::{Arc, Mutex};

/// Backend call, in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Enumerate,
    Open(String),
    Initialize,
    SetNotifier(u64),
    StartPreview,
    StopPreview,
    StopRecording,
    AddEffect(StreamType, String),
    ClearEffects(StreamType),
    Dispose,
}

/// Failures the mock injects
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    pub deny_access: bool,
    pub fail_initialize: Option<String>,
    pub fail_start_preview: bool,
    pub fail_stop_preview: bool,
    pub reject_effects: bool,
    pub fail_clear: bool,
    pub no_media_path: bool,
}

#[derive(Default)]
struct Shared {
    calls: Vec<Call>,
    open_captures: usize,
    attached: Option<EffectDefinition>,
    notifier: Option<FailureNotifier>,
}

#[derive(Clone)]
pub struct MockBackend {
    devices: Vec<CameraDevice>,
    options: MockOptions,
    shared: Arc<Mutex<Shared>>,
}

impl MockBackend {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            options: MockOptions::default(),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// One front-facing camera
    pub fn single() -> Self {
        Self::new(vec![
            CameraDevice::new("/dev/video0", "Front").with_location(CameraLocation::Front),
        ])
    }

    pub fn with_options(mut self, options: MockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Capture objects opened and not yet disposed
    pub fn open_captures(&self) -> usize {
        self.shared.lock().unwrap().open_captures
    }

    /// Definition currently attached to the preview stream
    pub fn attached(&self) -> Option<EffectDefinition> {
        self.shared.lock().unwrap().attached.clone()
    }

    /// Notifier registered by the most recent capture object
    pub fn notifier(&self) -> Option<FailureNotifier> {
        self.shared.lock().unwrap().notifier.clone()
    }

    fn record(&self, call: Call) {
        self.shared.lock().unwrap().calls.push(call);
    }
}

impl CaptureBackend for MockBackend {
    type Capture = MockCapture;

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        self.record(Call::Enumerate);
        Ok(self.devices.clone())
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<MockCapture> {
        self.record(Call::Open(device.id.clone()));
        self.shared.lock().unwrap().open_captures += 1;
        Ok(MockCapture {
            backend: self.clone(),
            device: device.clone(),
            initialized: false,
            frames: None,
        })
    }
}

pub struct MockCapture {
    backend: MockBackend,
    device: CameraDevice,
    initialized: bool,
    /// Held so the preview stream stays open
    frames: Option<FrameSender>,
}

impl CaptureObject for MockCapture {
    async fn initialize(&mut self) -> BackendResult<()> {
        self.backend.record(Call::Initialize);
        let options = &self.backend.options;
        if options.deny_access {
            return Err(BackendError::AccessDenied(self.device.id.clone()));
        }
        if let Some(msg) = &options.fail_initialize {
            return Err(BackendError::InitializationFailed(msg.clone()));
        }
        self.initialized = true;
        Ok(())
    }

    fn settings(&self) -> CaptureSettings {
        if !self.initialized || self.backend.options.no_media_path {
            return CaptureSettings::default();
        }
        CaptureSettings {
            video_device_id: self.device.id.clone(),
            audio_device_id: String::new(),
        }
    }

    fn set_failure_notifier(&mut self, notifier: FailureNotifier) {
        self.backend.record(Call::SetNotifier(notifier.generation()));
        self.backend.shared.lock().unwrap().notifier = Some(notifier);
    }

    async fn start_preview(&mut self) -> BackendResult<FrameReceiver> {
        self.backend.record(Call::StartPreview);
        if self.backend.options.fail_start_preview {
            return Err(BackendError::FormatNotSupported("no usable format".to_string()));
        }
        let (sender, receiver) = futures::channel::mpsc::channel(1);
        self.frames = Some(sender);
        Ok(receiver)
    }

    async fn stop_preview(&mut self) -> BackendResult<()> {
        self.backend.record(Call::StopPreview);
        self.frames = None;
        if self.backend.options.fail_stop_preview {
            return Err(BackendError::IoError("stream stuck".to_string()));
        }
        Ok(())
    }

    async fn stop_recording(&mut self) -> BackendResult<()> {
        self.backend.record(Call::StopRecording);
        Err(BackendError::NoRecordingInProgress)
    }

    async fn add_effect(&mut self, stream: StreamType, definition: EffectDefinition) -> BackendResult<()> {
        self.backend
            .record(Call::AddEffect(stream, definition.effect_id.clone()));
        if self.backend.options.reject_effects {
            return Err(BackendError::EffectNotSupported(definition.effect_id));
        }
        self.backend.shared.lock().unwrap().attached = Some(definition);
        Ok(())
    }

    async fn clear_effects(&mut self, stream: StreamType) -> BackendResult<()> {
        self.backend.record(Call::ClearEffects(stream));
        if self.backend.options.fail_clear {
            return Err(BackendError::IoError("clear failed".to_string()));
        }
        self.backend.shared.lock().unwrap().attached = None;
        Ok(())
    }

    fn dispose(self) {
        self.backend.record(Call::Dispose);
        let mut shared = self.backend.shared.lock().unwrap();
        shared.open_captures -= 1;
        shared.attached = None;
    }
}
