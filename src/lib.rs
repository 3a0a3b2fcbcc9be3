// SPDX-License-Identifier: GPL-3.0-only

//! Effect Cam - live camera preview with selectable video effects
//!
//! This library provides the camera session lifecycle, the effect catalog
//! and the capture backends used by the `effect-cam` binary.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: Camera session state machine and effect binding
//! - [`effects`]: Effect descriptors, catalog, selection and processing
//! - [`backends`]: Camera backend abstraction (V4L2 and synthetic)
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal front end
//!
//! # Example
//!
//! ```no_run
//! use effect_cam::backends::camera::SyntheticBackend;
//! use effect_cam::effects::EffectDescriptor;
//! use effect_cam::session::CameraSession;
//!
//! # async fn demo() -> Result<(), effect_cam::errors::SessionError> {
//! let mut session = CameraSession::new(SyntheticBackend::default());
//! session.initialize().await?;
//! session
//!     .apply(EffectDescriptor::with_parameter("Sepia", "Intensity", 0.5))
//!     .await?;
//! session.update_parameter(0.8);
//! session.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod effects;
pub mod errors;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use effects::catalog::{EffectCatalog, EffectCatalogEntry, EffectSelection};
pub use effects::{EffectDescriptor, EffectKind};
pub use errors::{AppError, AppResult, SessionError, SessionResult};
pub use session::{CameraSession, SessionState};
