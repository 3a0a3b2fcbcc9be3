// SPDX-License-Identifier: GPL-3.0-only

//! Camera session lifecycle states and their transition table

use std::fmt;

/// Lifecycle state of a camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No capture object is held
    #[default]
    NotInitialized,
    /// The preview stream is running
    Previewing,
    /// A recording is in progress (preview keeps running)
    Recording,
    /// The session was disposed; `initialize` starts over
    Stopped,
}

impl SessionState {
    /// True in the states that hold a capture object
    pub fn holds_capture(&self) -> bool {
        matches!(self, SessionState::Previewing | SessionState::Recording)
    }

    /// Apply `event` to this state
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            // Any held capture is released before a new initialize
            (_, InitializeRequested) => Ok(NotInitialized),
            (NotInitialized, PreviewStarted) => Ok(Previewing),
            (Previewing, RecordingStarted) => Ok(Recording),
            (Recording, RecordingStopped) => Ok(Previewing),
            (_, Disposed) => Ok(Stopped),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotInitialized => write!(f, "not initialized"),
            SessionState::Previewing => write!(f, "previewing"),
            SessionState::Recording => write!(f, "recording"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Events driving the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    InitializeRequested,
    PreviewStarted,
    RecordingStarted,
    RecordingStopped,
    Disposed,
}

/// An event that is not allowed in the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SessionState,
    pub event: SessionEvent,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not allowed while {}", self.event, self.from)
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 4] = [
        SessionState::NotInitialized,
        SessionState::Previewing,
        SessionState::Recording,
        SessionState::Stopped,
    ];

    #[test]
    fn test_initialize_and_dispose_from_any_state() {
        for state in ALL_STATES {
            assert_eq!(
                state.transition(SessionEvent::InitializeRequested),
                Ok(SessionState::NotInitialized)
            );
            assert_eq!(
                state.transition(SessionEvent::Disposed),
                Ok(SessionState::Stopped)
            );
        }
    }

    #[test]
    fn test_preview_only_starts_after_initialize() {
        assert_eq!(
            SessionState::NotInitialized.transition(SessionEvent::PreviewStarted),
            Ok(SessionState::Previewing)
        );
        for state in [SessionState::Previewing, SessionState::Recording, SessionState::Stopped] {
            assert_eq!(
                state.transition(SessionEvent::PreviewStarted),
                Err(TransitionError {
                    from: state,
                    event: SessionEvent::PreviewStarted
                })
            );
        }
    }

    #[test]
    fn test_recording_round_trip() {
        let recording = SessionState::Previewing
            .transition(SessionEvent::RecordingStarted)
            .unwrap();
        assert_eq!(recording, SessionState::Recording);
        assert_eq!(
            recording.transition(SessionEvent::RecordingStopped),
            Ok(SessionState::Previewing)
        );
        assert!(
            SessionState::Stopped
                .transition(SessionEvent::RecordingStarted)
                .is_err()
        );
    }

    #[test]
    fn test_holds_capture() {
        assert!(SessionState::Previewing.holds_capture());
        assert!(SessionState::Recording.holds_capture());
        assert!(!SessionState::NotInitialized.holds_capture());
        assert!(!SessionState::Stopped.holds_capture());
    }
}
