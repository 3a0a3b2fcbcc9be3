// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! - [`camera`]: device enumeration, capture objects and preview streams
//!   for V4L2 devices and the synthetic test camera

pub mod camera;
