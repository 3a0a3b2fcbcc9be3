// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera session and application

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera session errors
    Session(SessionError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors reported by the camera session.
///
/// None of these are fatal: after any of them the session is either
/// `NotInitialized` or `Stopped` and holds no capture object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No video capture device is connected
    NoCameraFound,
    /// The user or system denied access to the camera (or microphone)
    AuthorizationDenied,
    /// Initialization failed for any other reason
    InitializeFailed(String),
    /// Stopping the preview or recording failed while disposing
    DisposeFailed(String),
    /// An effect was applied while no preview stream is running
    StreamUnavailable,
    /// The backend rejected an effect configuration
    EffectFailed(String),
    /// The capture device failed while streaming
    CaptureFailed(String),
}

impl SessionError {
    /// Text shown to the user when this error is reported
    pub fn user_message(&self) -> String {
        match self {
            SessionError::NoCameraFound => {
                "There are no cameras connected, please connect a camera and try again.".to_string()
            }
            SessionError::AuthorizationDenied => "Camera access was denied. Check that this user \
                 may open the camera device (e.g. membership of the 'video' group) and try again."
                .to_string(),
            SessionError::StreamUnavailable => {
                "The preview stream is not available. Effect not applied.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "Camera session error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoCameraFound => write!(f, "No camera devices found"),
            SessionError::AuthorizationDenied => write!(f, "Camera access denied"),
            SessionError::InitializeFailed(msg) => write!(f, "Initialization failed: {}", msg),
            SessionError::DisposeFailed(msg) => write!(f, "Error disposing capture: {}", msg),
            SessionError::StreamUnavailable => write!(f, "Preview stream is not available"),
            SessionError::EffectFailed(msg) => write!(f, "Effect not applied: {}", msg),
            SessionError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
