// SPDX-License-Identifier: GPL-3.0-only

//! QR decoder tests against rendered codes

use qrcode::{Color, EcLevel, QrCode, Version};
use scanner::frame_processor::{BarcodeDecoder, FrameRegion, FrameThrottler, QrDecoder};
use scanner::{DecodeError, Frame, PixelFormat, SubmitOutcome};
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

const PAYLOAD: &str = "rtmp://ingest.example.com/live/key";

/// Gray8 canvas with the code's top-left corner at `origin`
fn render(
    code: &QrCode,
    module_px: usize,
    (width, height): (usize, usize),
    (left, top): (usize, usize),
) -> Vec<u8> {
    let modules = code.width();
    let colors = code.to_colors();
    let mut pixels = vec![255u8; width * height];

    for my in 0..modules {
        for mx in 0..modules {
            if colors[my * modules + mx] != Color::Dark {
                continue;
            }
            for y in 0..module_px {
                let row = (top + my * module_px + y) * width;
                let start = row + left + mx * module_px;
                pixels[start..start + module_px].fill(0);
            }
        }
    }

    pixels
}

fn gray_to_rgba(pixels: &[u8]) -> Vec<u8> {
    pixels.iter().flat_map(|&v| [v, v, v, 255]).collect()
}

fn assert_region_near(actual: &FrameRegion, expected: (f32, f32, f32, f32)) {
    let tolerance = 0.03;
    let (x, y, width, height) = expected;
    assert!((actual.x - x).abs() < tolerance, "x {} != {}", actual.x, x);
    assert!((actual.y - y).abs() < tolerance, "y {} != {}", actual.y, y);
    assert!((actual.width - width).abs() < tolerance, "width {} != {}", actual.width, width);
    assert!((actual.height - height).abs() < tolerance, "height {} != {}", actual.height, height);
}

#[test]
fn test_decodes_code_at_native_size() {
    let code = QrCode::new(PAYLOAD).unwrap();
    let side = code.width() * 6;
    let pixels = render(&code, 6, (300, 260), (60, 40));
    let frame = Frame::packed(300, 260, PixelFormat::Rgba, gray_to_rgba(&pixels));

    let barcodes = QrDecoder::new().decode(&frame).unwrap();

    assert_eq!(barcodes.len(), 1);
    assert_eq!(barcodes[0].raw_value.as_deref(), Some(PAYLOAD));
    let bounds = barcodes[0].bounds.as_ref().unwrap();
    assert_region_near(
        bounds,
        (
            60.0 / 300.0,
            40.0 / 260.0,
            side as f32 / 300.0,
            side as f32 / 260.0,
        ),
    );
}

#[test]
fn test_downscaled_frame_reports_original_coordinates() {
    let code = QrCode::new(PAYLOAD).unwrap();
    let side = code.width() * 20;
    let pixels = render(&code, 20, (1600, 1200), (500, 300));
    let frame = Frame::packed(1600, 1200, PixelFormat::Gray8, pixels);

    let decoder = QrDecoder::with_max_dimension(640);
    assert!(frame.width > decoder.max_dimension());
    let barcodes = decoder.decode(&frame).unwrap();

    assert_eq!(barcodes.len(), 1);
    assert_eq!(barcodes[0].raw_value.as_deref(), Some(PAYLOAD));
    let bounds = barcodes[0].bounds.as_ref().unwrap();
    assert_region_near(
        bounds,
        (
            500.0 / 1600.0,
            300.0 / 1200.0,
            side as f32 / 1600.0,
            side as f32 / 1200.0,
        ),
    );
}

#[test]
fn test_damaged_code_is_backend_error() {
    // Version 1 has no alignment pattern, so the grid still fits from the
    // finder and timing patterns after the data area is overwritten
    let code = QrCode::with_version(b"rtmp://cam/live", Version::Normal(1), EcLevel::L).unwrap();
    let module_px = 8;
    let origin = 32;
    let canvas = code.width() * module_px + 2 * origin;
    let mut pixels = render(&code, module_px, (canvas, canvas), (origin, origin));

    for my in 9..code.width() {
        for mx in 9..code.width() {
            let value = if (mx + my) % 2 == 0 { 0 } else { 255 };
            for y in 0..module_px {
                let start = (origin + my * module_px + y) * canvas + origin + mx * module_px;
                pixels[start..start + module_px].fill(value);
            }
        }
    }

    let frame = Frame::packed(canvas as u32, canvas as u32, PixelFormat::Gray8, pixels);
    let result = QrDecoder::new().decode(&frame);

    assert!(
        matches!(result, Err(DecodeError::Backend(_))),
        "unexpected result: {:?}",
        result
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_throttler_forwards_decoded_code() {
    let code = QrCode::new(PAYLOAD).unwrap();
    let pixels = render(&code, 6, (300, 260), (60, 40));
    let frame = Frame::packed(300, 260, PixelFormat::Gray8, pixels);

    let (payload_tx, mut payload_rx) = unbounded_channel();
    let throttler = FrameThrottler::new(
        QrDecoder::new(),
        move |value: String| {
            let _ = payload_tx.send(value);
        },
        tokio::runtime::Handle::current(),
    );

    assert_eq!(throttler.submit(frame, || {}), SubmitOutcome::Dispatched);

    let payload = tokio::time::timeout(Duration::from_secs(5), payload_rx.recv())
        .await
        .unwrap();
    assert_eq!(payload.as_deref(), Some(PAYLOAD));
}
