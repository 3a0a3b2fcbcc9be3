// SPDX-License-Identifier: GPL-3.0-only

//! Camera selection policy

use super::types::CameraDevice;

/// Pick the camera to open from an enumerated device list.
///
/// - no devices: `None`
/// - one device: that device
/// - several: the first front-facing device, otherwise the first device
pub fn select_camera(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    match devices {
        [] => None,
        [only] => Some(only),
        _ => devices
            .iter()
            .find(|d| d.is_front_facing())
            .or_else(|| devices.first()),
    }
}
