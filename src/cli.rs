// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Listing the effect catalog
//! - Running a headless preview with an effect applied

use effect_cam::backends::camera::{CaptureBackend, SystemBackend, select_camera};
use effect_cam::constants::PREVIEW_REPORT_INTERVAL;
use effect_cam::effects::catalog::{EffectCatalog, EffectSelection};
use effect_cam::errors::{AppError, AppResult};
use effect_cam::session::CameraSession;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// List all available cameras, marking the one a session would open
pub fn list_cameras(backend: SystemBackend) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let cameras = rt.block_on(backend.enumerate_devices())?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let preferred = select_camera(&cameras).map(|device| device.id.clone());

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if preferred.as_deref() == Some(camera.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} [{}] {}", marker, index, camera.name);
        println!("      Device: {}", camera.id);
        if let Some(location) = camera.location {
            println!("      Location: {}", location);
        }
    }
    println!();
    println!("* opened by default");

    Ok(())
}

/// List the effects offered by the catalog
pub fn list_effects() -> Result<(), Box<dyn std::error::Error>> {
    let catalog = EffectCatalog::default();

    println!("Available effects:");
    println!();
    for entry in catalog.entries() {
        println!(
            "  {:<14} {} (default {:.2}, range {:.2}-{:.2})",
            entry.display_name,
            entry.parameter_name,
            entry.default_value,
            entry.min_value,
            entry.max_value
        );
    }

    Ok(())
}

/// Run the preview without a UI, printing frame statistics
pub fn run_preview(
    backend: SystemBackend,
    effect: Option<String>,
    value: Option<f32>,
    duration: u64,
) -> AppResult<()> {
    let mut selection = EffectSelection::default();
    if let Some(effect_id) = effect.as_deref() {
        if selection.select_id(effect_id).is_none() {
            return Err(format!(
                "Unknown effect '{}' (see 'effect-cam effects')",
                effect_id
            )
            .into());
        }
        if let Some(value) = value {
            selection.set_value(value);
        }
    }

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Other(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut session = CameraSession::new(backend);
        session.initialize().await?;

        if let Some(device) = session.device() {
            println!("Using camera: {}", device.name);
        }
        if let Some(descriptor) = selection.descriptor() {
            println!(
                "Effect: {} ({} = {:.2})",
                descriptor.effect_id,
                descriptor.parameter_name().unwrap_or("-"),
                descriptor.parameter_value().unwrap_or_default()
            );
            session.apply(descriptor).await?;
        }

        let mut frames = session
            .take_preview_stream()
            .ok_or("Preview stream is not available")?;

        println!("Previewing for {} seconds (press Ctrl+C to stop early)", duration);
        println!();

        let start = Instant::now();
        let target_duration = Duration::from_secs(duration);
        let mut report = tokio::time::interval(PREVIEW_REPORT_INTERVAL);
        let mut frame_count = 0u64;
        let mut last_luma = 0.0f32;
        let mut last_size = (0, 0);

        while start.elapsed() < target_duration {
            if stop_flag.load(Ordering::SeqCst) {
                println!();
                println!("Stopping early...");
                break;
            }

            tokio::select! {
                frame = frames.next() => {
                    let Some(frame) = frame else {
                        println!();
                        // A failing capture thread closes the stream after reporting
                        if let Some(failure) = session.try_next_failure() {
                            session.handle_failure(failure).await?;
                        }
                        println!("Preview stream ended");
                        break;
                    };
                    frame_count += 1;
                    last_luma = frame.mean_luma();
                    last_size = (frame.width(), frame.height());
                }
                Some(failure) = session.next_failure() => {
                    println!();
                    // Drop the session's hold on the camera before reporting
                    session.handle_failure(failure).await?;
                }
                _ = report.tick() => {
                    let elapsed = start.elapsed().as_secs_f64().max(0.001);
                    print!(
                        "\rFrames: {:>6}  {:>5.1} fps  {}x{}  mean luma {:>5.1}",
                        frame_count,
                        frame_count as f64 / elapsed,
                        last_size.0,
                        last_size.1,
                        last_luma
                    );
                    std::io::stdout().flush()?;
                }
            }
        }
        println!();

        session.clear().await?;
        session.dispose().await?;
        println!("Captured {} frames", frame_count);

        Ok::<_, AppError>(())
    })
}
