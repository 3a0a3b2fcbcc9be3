// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for camera selection and the effect selection model

use effect_cam::backends::camera::{CameraDevice, CameraLocation, select_camera};
use effect_cam::effects::catalog::EffectSelection;

fn device(id: &str, location: Option<CameraLocation>) -> CameraDevice {
    let device = CameraDevice::new(id, id);
    match location {
        Some(location) => device.with_location(location),
        None => device,
    }
}

#[test]
fn test_select_camera_empty() {
    assert!(select_camera(&[]).is_none());
}

#[test]
fn test_select_camera_single_device_regardless_of_location() {
    let devices = [device("d1", Some(CameraLocation::Back))];
    assert_eq!(select_camera(&devices).map(|d| d.id.as_str()), Some("d1"));
}

#[test]
fn test_select_camera_prefers_front() {
    let devices = [
        device("d1", Some(CameraLocation::Back)),
        device("d2", Some(CameraLocation::Front)),
    ];
    assert_eq!(select_camera(&devices).map(|d| d.id.as_str()), Some("d2"));
}

#[test]
fn test_select_camera_falls_back_to_first() {
    let devices = [
        device("d1", Some(CameraLocation::Back)),
        device("d2", Some(CameraLocation::Back)),
    ];
    assert_eq!(select_camera(&devices).map(|d| d.id.as_str()), Some("d1"));

    let unknown = [device("d1", None), device("d2", Some(CameraLocation::External))];
    assert_eq!(select_camera(&unknown).map(|d| d.id.as_str()), Some("d1"));
}

#[test]
fn test_select_camera_first_of_several_front() {
    let devices = [
        device("d1", None),
        device("d2", Some(CameraLocation::Front)),
        device("d3", Some(CameraLocation::Front)),
    ];
    assert_eq!(select_camera(&devices).map(|d| d.id.as_str()), Some("d2"));
}

#[test]
fn test_effect_selection_builds_descriptor() {
    let mut selection = EffectSelection::default();
    assert!(selection.descriptor().is_none());

    let entry = selection.select_id("Vignette").unwrap();
    assert_eq!(entry.parameter_name, "Amount");

    let descriptor = selection.descriptor().unwrap();
    assert_eq!(descriptor.effect_id, "Vignette");
    assert_eq!(descriptor.parameter_name(), Some("Amount"));
    assert_eq!(descriptor.parameter_value(), Some(0.5));
}

#[test]
fn test_effect_selection_clamps_values() {
    let mut selection = EffectSelection::default();
    assert_eq!(selection.set_value(0.7), None);

    selection.select_id("Saturation").unwrap();
    assert_eq!(selection.set_value(1.7), Some(1.0));
    assert_eq!(selection.set_value(-0.2), Some(0.0));
    assert_eq!(selection.set_value(0.25), Some(0.25));
    assert_eq!(selection.descriptor().unwrap().parameter_value(), Some(0.25));

    // Reselecting restores the default
    selection.select_id("Saturation").unwrap();
    assert_eq!(selection.value(), Some(0.5));

    selection.clear();
    assert!(selection.selected().is_none());
}
