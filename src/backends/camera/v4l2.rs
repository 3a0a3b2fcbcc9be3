// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Enumerates `/dev/video*` capture nodes and streams preview frames with
//! memory-mapped buffers on a dedicated thread. YUYV/UYVY frames are
//! converted to RGBA; MJPEG frames are decoded.

use super::format_converters::{PackedYuv, mjpeg_to_rgba, packed_yuv_to_rgba};
use super::preview::{EffectSlot, PreviewWorker, deliver_frame, ensure_preview_stream};
use super::types::*;
use super::{CaptureBackend, CaptureObject};
use crate::constants::{preview, v4l2 as tuning};
use crate::effects::EffectDefinition;
use image::RgbaImage;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Pixel encodings we can turn into RGBA, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"YUYV", b"UYVY", b"MJPG"];

/// Backend for Video4Linux2 capture devices
#[derive(Debug, Clone)]
pub struct V4l2Backend {
    width: u32,
    height: u32,
    framerate: u32,
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new(
            preview::DEFAULT_WIDTH,
            preview::DEFAULT_HEIGHT,
            preview::DEFAULT_FRAMERATE,
        )
    }
}

impl V4l2Backend {
    pub fn new(width: u32, height: u32, framerate: u32) -> Self {
        Self {
            width,
            height,
            framerate,
        }
    }
}

impl CaptureBackend for V4l2Backend {
    type Capture = V4l2Capture;

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<CameraDevice>> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        let mut devices = Vec::new();
        for node in nodes {
            let path = node.path().to_string_lossy().to_string();
            let fallback_name = node.name().unwrap_or_else(|| path.clone());

            match Device::with_path(node.path()) {
                Ok(dev) => match dev.query_caps() {
                    // Skip metadata and output nodes that share the driver
                    Ok(caps) if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) => {
                        debug!(path, "Skipping node without video capture capability");
                    }
                    Ok(caps) => devices.push(build_device(&path, &caps.card)),
                    Err(e) => {
                        debug!(path, error = %e, "VIDIOC_QUERYCAP failed, skipping node");
                    }
                },
                // Listed anyway so initialize can report the permission problem
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    warn!(path, "No permission to open camera node");
                    devices.push(build_device(&path, &fallback_name));
                }
                Err(e) => {
                    debug!(path, error = %e, "Cannot open video node");
                }
            }
        }

        info!(count = devices.len(), "Enumerated V4L2 cameras");
        Ok(devices)
    }

    fn open(&self, device: &CameraDevice) -> BackendResult<V4l2Capture> {
        if !Path::new(&device.id).exists() {
            return Err(BackendError::DeviceNotFound(device.id.clone()));
        }

        Ok(V4l2Capture {
            device: device.clone(),
            width: self.width,
            height: self.height,
            framerate: self.framerate,
            negotiated: None,
            notifier: Arc::new(Mutex::new(None)),
            effects: EffectSlot::new(),
            worker: None,
        })
    }
}

fn build_device(path: &str, card: &str) -> CameraDevice {
    let device = CameraDevice::new(path, card.trim());
    match location_from_name(card) {
        Some(location) => device.with_location(location),
        None => device,
    }
}

/// Guess which way a camera faces from its V4L2 card name
pub fn location_from_name(name: &str) -> Option<CameraLocation> {
    let name = name.to_ascii_lowercase();
    if name.contains("front") || name.contains("user facing") {
        Some(CameraLocation::Front)
    } else if name.contains("rear") || name.contains("back") || name.contains("world facing") {
        Some(CameraLocation::Back)
    } else {
        None
    }
}

/// Layout of frames agreed with the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameEncoding {
    Packed(PackedYuv),
    Mjpeg,
}

#[derive(Debug, Clone, Copy)]
struct NegotiatedFormat {
    width: u32,
    height: u32,
    stride: u32,
    fourcc: [u8; 4],
    encoding: FrameEncoding,
}

impl NegotiatedFormat {
    fn from_v4l(format: &Format) -> Option<Self> {
        let encoding = match &format.fourcc.repr {
            b"YUYV" => FrameEncoding::Packed(PackedYuv::Yuyv),
            b"UYVY" => FrameEncoding::Packed(PackedYuv::Uyvy),
            b"MJPG" => FrameEncoding::Mjpeg,
            _ => return None,
        };
        Some(Self {
            width: format.width,
            height: format.height,
            stride: format.stride,
            fourcc: format.fourcc.repr,
            encoding,
        })
    }

    fn to_v4l(self) -> Format {
        Format::new(self.width, self.height, FourCC::new(&self.fourcc))
    }

    fn decode(&self, data: &[u8]) -> BackendResult<RgbaImage> {
        match self.encoding {
            FrameEncoding::Packed(order) => {
                packed_yuv_to_rgba(data, self.width, self.height, self.stride, order)
            }
            FrameEncoding::Mjpeg => mjpeg_to_rgba(data),
        }
    }
}

/// Ask the driver for each preferred encoding until one sticks
fn negotiate_format(dev: &Device, width: u32, height: u32) -> BackendResult<NegotiatedFormat> {
    for fourcc in PREFERRED_FOURCCS {
        let requested = Format::new(width, height, FourCC::new(fourcc));
        match dev.set_format(&requested) {
            Ok(actual) => {
                if let Some(negotiated) = NegotiatedFormat::from_v4l(&actual)
                    && actual.fourcc == requested.fourcc
                {
                    info!(
                        width = actual.width,
                        height = actual.height,
                        fourcc = %actual.fourcc,
                        "Negotiated V4L2 preview format"
                    );
                    return Ok(negotiated);
                }
                debug!(requested = %requested.fourcc, got = %actual.fourcc, "Driver substituted format");
            }
            Err(e) => debug!(fourcc = %requested.fourcc, error = %e, "Format rejected"),
        }
    }

    Err(BackendError::FormatNotSupported(
        "device offers none of YUYV, UYVY or MJPG".to_string(),
    ))
}

/// An open V4L2 camera
pub struct V4l2Capture {
    device: CameraDevice,
    width: u32,
    height: u32,
    framerate: u32,
    negotiated: Option<NegotiatedFormat>,
    notifier: Arc<Mutex<Option<FailureNotifier>>>,
    effects: EffectSlot,
    worker: Option<PreviewWorker>,
}

impl CaptureObject for V4l2Capture {
    async fn initialize(&mut self) -> BackendResult<()> {
        let path = self.device.id.clone();
        info!(device = %self.device.name, path, "Opening V4L2 device");

        let dev = Device::with_path(&path).map_err(|e| BackendError::from_open_error(&path, &e))?;
        let caps = dev
            .query_caps()
            .map_err(|e| BackendError::InitializationFailed(format!("{}: {}", path, e)))?;
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            return Err(BackendError::InitializationFailed(format!(
                "{} is not a video capture device",
                path
            )));
        }

        let negotiated = negotiate_format(&dev, self.width, self.height)?;
        if let Err(e) = dev.set_params(&v4l::video::capture::Parameters::with_fps(self.framerate)) {
            warn!(error = %e, fps = self.framerate, "Could not set framerate, using driver default");
        }

        self.negotiated = Some(negotiated);
        Ok(())
    }

    fn settings(&self) -> CaptureSettings {
        match self.negotiated {
            Some(_) => CaptureSettings {
                video_device_id: self.device.id.clone(),
                audio_device_id: String::new(),
            },
            None => CaptureSettings::default(),
        }
    }

    fn set_failure_notifier(&mut self, notifier: FailureNotifier) {
        *self.notifier.lock().unwrap_or_else(|e| e.into_inner()) = Some(notifier);
    }

    async fn start_preview(&mut self) -> BackendResult<FrameReceiver> {
        let format = self.negotiated.ok_or_else(|| {
            BackendError::InitializationFailed("capture is not initialized".to_string())
        })?;
        if let Some(previous) = self.worker.take() {
            previous.stop()?;
        }

        let (sender, receiver) = futures::channel::mpsc::channel(preview::FRAME_CHANNEL_CAPACITY);
        let path = self.device.id.clone();
        let effects = self.effects.clone();
        let notifier = self.notifier.clone();

        let worker = PreviewWorker::spawn("v4l2-capture", move |running| {
            if let Err(e) = capture_loop(&path, format, sender, &effects, &running) {
                error!(path, error = %e, "V4L2 capture loop failed");
                // A stop request racing with the failure is not a device failure
                if running.load(Ordering::SeqCst)
                    && let Some(notifier) = notifier.lock().unwrap_or_else(|e| e.into_inner()).as_ref()
                {
                    notifier.notify(e.to_string());
                }
            }
        })?;

        self.worker = Some(worker);
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
        self.effects.attach(definition)?;
        Ok(())
    }

    async fn clear_effects(&mut self, stream: StreamType) -> BackendResult<()> {
        ensure_preview_stream(stream)?;
        self.effects.clear();
        Ok(())
    }

    fn dispose(mut self) {
        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.stop()
        {
            warn!(error = %e, "Capture thread did not stop cleanly");
        }
        info!(device = %self.device.name, "V4L2 device released");
    }
}

/// Main capture loop running in a separate thread
fn capture_loop(
    path: &str,
    format: NegotiatedFormat,
    mut sender: FrameSender,
    effects: &EffectSlot,
    running: &AtomicBool,
) -> BackendResult<()> {
    let mut dev = Device::with_path(path).map_err(|e| BackendError::from_open_error(path, &e))?;
    dev.set_format(&format.to_v4l())
        .map_err(|e| BackendError::FormatNotSupported(format!("{}: {}", path, e)))?;

    let mut stream = MmapStream::with_buffers(&mut dev, Type::VideoCapture, tuning::BUFFER_COUNT)
        .map_err(|e| BackendError::IoError(format!("failed to create buffer stream: {}", e)))?;

    info!(path, "V4L2 preview stream started");

    let mut sequence = 0u64;
    let mut consecutive_errors = 0u32;

    while running.load(Ordering::SeqCst) {
        let captured_at = Instant::now();

        match stream.next() {
            Ok((buf, _meta)) => {
                consecutive_errors = 0;
                match format.decode(buf) {
                    Ok(image) => {
                        deliver_frame(&mut sender, effects, image, sequence, captured_at);
                        sequence += 1;
                    }
                    Err(e) => debug!(frame = sequence, error = %e, "Dropping undecodable frame"),
                }
            }
            Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                return Err(BackendError::DeviceNotFound(format!("{} was disconnected", path)));
            }
            Err(e) => {
                consecutive_errors += 1;
                warn!(error = %e, consecutive_errors, "Failed to capture frame");
                if consecutive_errors >= tuning::MAX_CONSECUTIVE_ERRORS {
                    return Err(BackendError::IoError(format!("{}: {}", path, e)));
                }
                // Brief sleep before retry
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    info!(path, frames = sequence, "V4L2 capture loop ended");
    Ok(())
}
