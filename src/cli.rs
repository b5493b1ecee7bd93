// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanning
//!
//! This module provides command-line functionality for:
//! - Feeding image files through the throttler as a simulated camera
//! - Decoding a single image directly

use scanner::constants::IDLE_POLL_INTERVAL;
use scanner::frame_processor::{BarcodeDecoder, FrameThrottler, QrDecoder, ScanPayload};
use scanner::{AppResult, Config, Frame, SensorRotation, SubmitOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Submit each image as a camera frame, printing payloads as they arrive
pub fn scan_images(
    config: &Config,
    images: &[PathBuf],
    interval_ms: Option<u64>,
    rotation_degrees: i32,
    json_stats: bool,
) -> AppResult<()> {
    let interval = interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.feed.interval());
    let rotation = SensorRotation::from_degrees(rotation_degrees);

    let rt = tokio::runtime::Runtime::new()?;
    let decoder = QrDecoder::with_max_dimension(config.decoder.max_dimension);
    let throttler = FrameThrottler::new(
        decoder,
        |value: String| {
            let payload = ScanPayload::parse(&value);
            println!("  -> {}: {}", payload.label(), value);
        },
        rt.handle().clone(),
    );

    println!(
        "Scanning {} image(s), one every {} ms",
        images.len(),
        interval.as_millis()
    );

    for path in images {
        let frame = match Frame::open(path) {
            Ok(frame) => frame.with_rotation(rotation),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable image");
                continue;
            }
        };

        let name = path.display().to_string();
        let outcome = throttler.submit(frame, move || {
            debug!(frame = %name, "Frame released");
        });

        match outcome {
            SubmitOutcome::Dispatched => println!("{}: decoding", path.display()),
            SubmitOutcome::Dropped => println!("{}: dropped, decoder busy", path.display()),
        }

        std::thread::sleep(interval);
    }

    while !throttler.is_idle() {
        std::thread::sleep(IDLE_POLL_INTERVAL);
    }

    let stats = throttler.stats();
    if json_stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!();
    println!(
        "Submitted: {}  Dispatched: {}  Dropped: {}",
        stats.submitted, stats.dispatched, stats.dropped
    );
    println!(
        "Decoded: {}  Failed: {}  Released: {}",
        stats.decoded, stats.failed, stats.released
    );

    Ok(())
}

/// Run the decoder on one image without throttling
pub fn decode_image(config: &Config, path: &Path) -> AppResult<()> {
    let frame = Frame::open(path)?;
    println!("{}: {}x{}", path.display(), frame.width, frame.height);

    let decoder = QrDecoder::with_max_dimension(config.decoder.max_dimension);
    let candidates = decoder.decode(&frame)?;

    if candidates.is_empty() {
        println!("No codes found.");
        return Ok(());
    }

    for (index, barcode) in candidates.iter().enumerate() {
        let value = barcode.raw_value.as_deref().unwrap_or("");
        println!("  [{}] {}: {}", index, ScanPayload::parse(value).label(), value);
        if let Some(bounds) = &barcode.bounds {
            println!(
                "      at x={:.2} y={:.2} w={:.2} h={:.2}",
                bounds.x, bounds.y, bounds.width, bounds.height
            );
        }
    }

    Ok(())
}
