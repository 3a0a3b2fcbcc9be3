// SPDX-License-Identifier: GPL-3.0-only

//! Camera session controller
//!
//! [`CameraSession`] owns at most one open capture object and drives it
//! through initialize → preview → dispose. It also binds a single effect to
//! the preview stream. The capture object only exists inside the
//! `Previewing`/`Recording` phases, so effect operations can reach it only
//! while a preview is running.
//!
//! Device failures raised by the capture thread arrive as
//! [`CaptureFailure`] messages; the owner polls them with
//! [`next_failure`](CameraSession::next_failure) or
//! [`try_next_failure`](CameraSession::try_next_failure) and passes them to
//! [`handle_failure`](CameraSession::handle_failure).

pub mod state;

pub use state::{SessionEvent, SessionState, TransitionError};

use crate::backends::camera::{
    BackendError, CameraDevice, CaptureBackend, CaptureFailure, CaptureObject, FailureNotifier,
    FrameReceiver, StreamType, select_camera,
};
use crate::effects::{EffectDefinition, EffectDescriptor};
use crate::errors::{SessionError, SessionResult};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, error, info, warn};

/// An effect attached to the preview stream
#[derive(Debug, Clone)]
struct AttachedEffect {
    descriptor: EffectDescriptor,
    definition: EffectDefinition,
}

enum Phase<C> {
    NotInitialized,
    Previewing {
        capture: C,
        effect: Option<AttachedEffect>,
    },
    Recording {
        capture: C,
        effect: Option<AttachedEffect>,
    },
    Stopped,
}

impl<C> Phase<C> {
    fn state(&self) -> SessionState {
        match self {
            Phase::NotInitialized => SessionState::NotInitialized,
            Phase::Previewing { .. } => SessionState::Previewing,
            Phase::Recording { .. } => SessionState::Recording,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    fn effect(&self) -> Option<&AttachedEffect> {
        match self {
            Phase::Previewing { effect, .. } | Phase::Recording { effect, .. } => effect.as_ref(),
            _ => None,
        }
    }

    fn effect_mut(&mut self) -> Option<&mut AttachedEffect> {
        match self {
            Phase::Previewing { effect, .. } | Phase::Recording { effect, .. } => effect.as_mut(),
            _ => None,
        }
    }

    fn into_capture(self) -> Option<C> {
        match self {
            Phase::Previewing { capture, .. } | Phase::Recording { capture, .. } => Some(capture),
            _ => None,
        }
    }
}

/// Map a backend error raised while opening a camera
fn initialize_error(err: BackendError) -> SessionError {
    match err {
        BackendError::AccessDenied(_) => SessionError::AuthorizationDenied,
        other => SessionError::InitializeFailed(other.to_string()),
    }
}

fn effect_error(err: BackendError) -> SessionError {
    SessionError::EffectFailed(err.to_string())
}

/// Lifecycle controller for one camera
pub struct CameraSession<B: CaptureBackend> {
    backend: B,
    phase: Phase<B::Capture>,
    device: Option<CameraDevice>,
    /// Incremented whenever a capture object is opened or released
    generation: u64,
    failure_tx: UnboundedSender<CaptureFailure>,
    failure_rx: UnboundedReceiver<CaptureFailure>,
    preview: Option<FrameReceiver>,
}

impl<B: CaptureBackend> CameraSession<B> {
    pub fn new(backend: B) -> Self {
        let (failure_tx, failure_rx) = unbounded_channel();
        Self {
            backend,
            phase: Phase::NotInitialized,
            device: None,
            generation: 0,
            failure_tx,
            failure_rx,
            preview: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        self.phase.state()
    }

    /// Device of the open capture object
    pub fn device(&self) -> Option<&CameraDevice> {
        self.device.as_ref()
    }

    pub fn has_capture(&self) -> bool {
        self.state().holds_capture()
    }

    /// Descriptor of the attached effect, with its current parameter value
    pub fn attached_effect(&self) -> Option<&EffectDescriptor> {
        self.phase.effect().map(|attached| &attached.descriptor)
    }

    /// Configuration handed to the backend for the attached effect
    pub fn attached_definition(&self) -> Option<&EffectDefinition> {
        self.phase.effect().map(|attached| &attached.definition)
    }

    /// Take the frame receiver of the running preview.
    ///
    /// Returns `None` if there is no preview or it was already taken.
    pub fn take_preview_stream(&mut self) -> Option<FrameReceiver> {
        self.preview.take()
    }

    fn set_phase(&mut self, event: SessionEvent, phase: Phase<B::Capture>) {
        let from = self.state();
        let to = phase.state();
        match from.transition(event) {
            Ok(next) if next == to => debug!(%from, %to, "Session state changed"),
            Ok(next) => error!(%from, %to, expected = %next, "Session entered unexpected state"),
            Err(e) => error!(error = %e, "Invalid session transition"),
        }
        self.phase = phase;
    }

    /// Release the capture object without stopping its streams first
    fn release(&mut self) {
        let phase = std::mem::replace(&mut self.phase, Phase::NotInitialized);
        if let Some(capture) = phase.into_capture() {
            info!("Releasing previous capture object");
            capture.dispose();
        }
        self.preview = None;
        self.device = None;
        self.generation += 1;
    }

    /// Open the preferred camera and start its preview.
    ///
    /// Legal from any state. On failure the capture object is released and
    /// the session is left `NotInitialized`.
    pub async fn initialize(&mut self) -> SessionResult<()> {
        self.release();
        self.set_phase(SessionEvent::InitializeRequested, Phase::NotInitialized);

        let devices = self
            .backend
            .enumerate_devices()
            .await
            .map_err(initialize_error)?;
        let Some(device) = select_camera(&devices).cloned() else {
            warn!("No camera devices found");
            return Err(SessionError::NoCameraFound);
        };
        info!(
            device = %device.name,
            id = %device.id,
            backend = %self.backend.backend_type(),
            "Initializing camera"
        );

        let mut capture = self.backend.open(&device).map_err(initialize_error)?;

        if let Err(e) = capture.initialize().await {
            warn!(error = %e, "Camera initialization failed");
            capture.dispose();
            return Err(initialize_error(e));
        }

        let settings = capture.settings();
        if settings.has_media_path() {
            capture.set_failure_notifier(FailureNotifier::new(
                self.generation,
                self.failure_tx.clone(),
            ));
        } else {
            debug!("Capture reports no media path, device failures will not be reported");
        }

        match capture.start_preview().await {
            Ok(frames) => {
                self.preview = Some(frames);
                self.device = Some(device);
                self.set_phase(
                    SessionEvent::PreviewStarted,
                    Phase::Previewing {
                        capture,
                        effect: None,
                    },
                );
                info!(generation = self.generation, "Camera preview started");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to start preview");
                capture.dispose();
                Err(initialize_error(e))
            }
        }
    }

    /// Stop any running stream and release the camera.
    ///
    /// Legal from any state and always ends `Stopped` with no capture
    /// object. A failure to stop is reported after the release happened.
    pub async fn dispose(&mut self) -> SessionResult<()> {
        let from = self.state();
        let phase = std::mem::replace(&mut self.phase, Phase::Stopped);

        let stopped = match phase {
            Phase::Recording { mut capture, .. } => {
                let result = capture.stop_recording().await;
                Some((capture, result))
            }
            Phase::Previewing { mut capture, .. } => {
                let result = capture.stop_preview().await;
                Some((capture, result))
            }
            Phase::NotInitialized | Phase::Stopped => None,
        };

        self.preview = None;
        self.device = None;
        self.generation += 1;

        let outcome = match stopped {
            Some((capture, result)) => {
                capture.dispose();
                result.map_err(|e| {
                    warn!(error = %e, "Error stopping capture during dispose");
                    SessionError::DisposeFailed(e.to_string())
                })
            }
            None => Ok(()),
        };

        match from.transition(SessionEvent::Disposed) {
            Ok(to) => debug!(%from, %to, "Session state changed"),
            Err(e) => error!(error = %e, "Invalid session transition"),
        }
        info!("Camera session disposed");
        outcome
    }

    /// Attach an effect to the preview stream.
    ///
    /// Any attached effect is detached first. Requires `Previewing`.
    pub async fn apply(&mut self, descriptor: EffectDescriptor) -> SessionResult<()> {
        let state = self.state();
        let Phase::Previewing { capture, effect } = &mut self.phase else {
            warn!(effect = %descriptor.effect_id, %state, "Preview stream unavailable");
            return Err(SessionError::StreamUnavailable);
        };

        // The previous effect stays recorded until the backend detached it
        if let Some(previous) = effect.as_ref() {
            debug!(effect = %previous.descriptor.effect_id, "Detaching previous effect");
            capture
                .clear_effects(StreamType::VideoPreview)
                .await
                .map_err(effect_error)?;
            *effect = None;
        }

        let definition = descriptor.to_definition();
        capture
            .add_effect(StreamType::VideoPreview, definition.clone())
            .await
            .map_err(effect_error)?;

        info!(
            effect = %descriptor.effect_id,
            parameter = ?descriptor.parameter_name(),
            value = ?descriptor.parameter_value(),
            "Effect applied"
        );
        *effect = Some(AttachedEffect {
            descriptor,
            definition,
        });
        Ok(())
    }

    /// Detach the attached effect, if any
    pub async fn clear(&mut self) -> SessionResult<()> {
        match &mut self.phase {
            Phase::Previewing { capture, effect } | Phase::Recording { capture, effect } => {
                if effect.is_some() {
                    capture
                        .clear_effects(StreamType::VideoPreview)
                        .await
                        .map_err(effect_error)?;
                    if let Some(previous) = effect.take() {
                        debug!(effect = %previous.descriptor.effect_id, "Effect cleared");
                    }
                }
                Ok(())
            }
            Phase::NotInitialized | Phase::Stopped => Ok(()),
        }
    }

    /// Change the attached effect's parameter without reattaching it.
    ///
    /// Returns `false` if no effect with a parameter is attached.
    pub fn update_parameter(&mut self, value: f32) -> bool {
        let Some(attached) = self.phase.effect_mut() else {
            return false;
        };
        let Some(parameter) = attached.descriptor.parameter.as_mut() else {
            return false;
        };

        parameter.value = value;
        if let Some(properties) = &attached.definition.properties {
            properties.insert(&parameter.name, value);
        }
        debug!(parameter = %parameter.name, value, "Effect parameter updated");
        true
    }

    /// Wait for the next device failure
    pub async fn next_failure(&mut self) -> Option<CaptureFailure> {
        self.failure_rx.recv().await
    }

    /// Next queued device failure, without waiting
    pub fn try_next_failure(&mut self) -> Option<CaptureFailure> {
        self.failure_rx.try_recv().ok()
    }

    /// React to a device failure.
    ///
    /// Failures raised by the current capture object dispose the session and
    /// return [`SessionError::CaptureFailed`]. Failures from a capture object
    /// that was already released are ignored.
    pub async fn handle_failure(&mut self, failure: CaptureFailure) -> SessionResult<()> {
        if failure.generation != self.generation || !self.has_capture() {
            debug!(
                failure_generation = failure.generation,
                generation = self.generation,
                "Ignoring stale capture failure"
            );
            return Ok(());
        }

        error!(message = %failure.message, "Camera device failed");
        if let Err(e) = self.dispose().await {
            warn!(error = %e, "Dispose after device failure reported an error");
        }
        Err(SessionError::CaptureFailed(failure.message))
    }
}

impl<B: CaptureBackend> Drop for CameraSession<B> {
    fn drop(&mut self) {
        let phase = std::mem::replace(&mut self.phase, Phase::Stopped);
        if let Some(capture) = phase.into_capture() {
            capture.dispose();
        }
    }
}

#[cfg(test)]
impl<B: CaptureBackend> CameraSession<B> {
    /// Enter `Recording` without a real recorder
    fn begin_recording(&mut self) {
        let from = self.state();
        let phase = std::mem::replace(&mut self.phase, Phase::Stopped);
        self.phase = match phase {
            Phase::Previewing { capture, effect } => {
                assert_eq!(
                    from.transition(SessionEvent::RecordingStarted),
                    Ok(SessionState::Recording)
                );
                Phase::Recording { capture, effect }
            }
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{SyntheticBackend, SyntheticBehavior};

    fn backend() -> SyntheticBackend {
        SyntheticBackend::default().with_format(16, 12, 60)
    }

    #[tokio::test]
    async fn test_dispose_while_recording_reports_stop_error_after_release() {
        let mut session = CameraSession::new(backend());
        session.initialize().await.unwrap();
        session.begin_recording();
        assert_eq!(session.state(), SessionState::Recording);

        // The synthetic backend has no recorder, so stopping fails
        let result = session.dispose().await;
        assert!(matches!(result, Err(SessionError::DisposeFailed(_))));
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!session.has_capture());
    }

    #[tokio::test]
    async fn test_clear_while_recording() {
        let mut session = CameraSession::new(backend());
        session.initialize().await.unwrap();
        session
            .apply(EffectDescriptor::with_parameter("Sepia", "Intensity", 0.5))
            .await
            .unwrap();
        session.begin_recording();

        // Effects cannot be applied once recording started, only cleared
        assert_eq!(
            session.apply(EffectDescriptor::new("Vignette")).await,
            Err(SessionError::StreamUnavailable)
        );
        session.clear().await.unwrap();
        assert!(session.attached_effect().is_none());
        let _ = session.dispose().await;
    }

    #[tokio::test]
    async fn test_failed_initialize_keeps_generation_fresh() {
        let failing = backend().with_behavior(SyntheticBehavior {
            fail_initialize: Some("busy".to_string()),
            ..Default::default()
        });
        let mut session = CameraSession::new(failing);
        let before = session.generation;
        assert_eq!(
            session.initialize().await,
            Err(SessionError::InitializeFailed(
                "Initialization failed: busy".to_string()
            ))
        );
        assert!(session.generation > before);
        assert_eq!(session.state(), SessionState::NotInitialized);
    }
}
