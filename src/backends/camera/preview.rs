// SPDX-License-Identifier: GPL-3.0-only

//! Preview plumbing shared by capture backends
//!
//! - [`EffectSlot`]: the effect attached to the preview stream, read by the
//!   capture thread on every frame
//! - [`PreviewWorker`]: a capture thread with a stop flag

use super::types::*;
use crate::effects::{EffectDefinition, EffectKind, processing};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct AttachedDefinition {
    kind: EffectKind,
    definition: EffectDefinition,
}

/// Effect attached to the preview stream.
///
/// Cloned into the capture thread; attach/clear from the owning capture
/// object are seen by the next frame.
#[derive(Debug, Clone, Default)]
pub struct EffectSlot {
    attached: Arc<Mutex<Option<AttachedDefinition>>>,
}

impl EffectSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an effect, replacing any previous one
    pub fn attach(&self, definition: EffectDefinition) -> BackendResult<EffectKind> {
        let kind = EffectKind::from_id(&definition.effect_id)
            .ok_or_else(|| BackendError::EffectNotSupported(definition.effect_id.clone()))?;

        let mut attached = self.attached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = attached.as_ref() {
            debug!(previous = %previous.kind, "Replacing attached effect");
        }
        *attached = Some(AttachedDefinition { kind, definition });
        Ok(kind)
    }

    pub fn clear(&self) {
        self.attached.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Currently attached effect kind
    pub fn kind(&self) -> Option<EffectKind> {
        self.attached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|a| a.kind)
    }

    /// Currently attached definition
    pub fn definition(&self) -> Option<EffectDefinition> {
        self.attached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|a| a.definition.clone())
    }

    /// Run the attached effect (if any) over a frame
    pub fn process(&self, image: &mut RgbaImage) -> Option<EffectKind> {
        // Clone out so the lock is not held while processing
        let attached = self
            .attached
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;
        processing::apply_definition(image, attached.kind, &attached.definition);
        Some(attached.kind)
    }
}

/// Reject effect operations on streams other than the preview
pub fn ensure_preview_stream(stream: StreamType) -> BackendResult<()> {
    match stream {
        StreamType::VideoPreview => Ok(()),
        StreamType::VideoRecord => Err(BackendError::Other(
            "record stream is not available".to_string(),
        )),
    }
}

/// Apply the slot's effect to a raw frame and push it to the preview channel.
///
/// Frames are dropped when the channel is full or the receiver is gone.
pub fn deliver_frame(
    sender: &mut FrameSender,
    effects: &EffectSlot,
    mut image: RgbaImage,
    sequence: u64,
    captured_at: Instant,
) {
    let effect = effects.process(&mut image);
    let frame = CameraFrame {
        image,
        sequence,
        captured_at,
        effect,
    };

    if let Err(e) = sender.try_send(frame)
        && sequence % 30 == 0
    {
        debug!(frame = sequence, full = e.is_full(), "Preview frame dropped");
    }
}

/// A capture thread that runs until its stop flag is cleared
pub struct PreviewWorker {
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl PreviewWorker {
    /// Spawn `body` on a named thread; it must return once the flag reads false
    pub fn spawn<F>(name: &str, body: F) -> BackendResult<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let thread_handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(running_clone))
            .map_err(|e| BackendError::IoError(format!("failed to spawn capture thread: {}", e)))?;

        Ok(Self {
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self
                .thread_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread to stop and wait for it
    pub fn stop(mut self) -> BackendResult<()> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked");
                return Err(BackendError::Other("capture thread panicked".to_string()));
            }
            info!("Capture thread stopped");
        }

        Ok(())
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        // Don't wait for the thread here; it exits on its next iteration
        self.running.store(false, Ordering::SeqCst);
    }
}
