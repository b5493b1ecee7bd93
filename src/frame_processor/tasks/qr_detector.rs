// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding task
//!
//! This module implements [`BarcodeDecoder`] using the rqrr crate.
//! Camera frames are converted to 8-bit luma, downscaled for speed and
//! searched for QR grids. Each decoded grid becomes a [`Barcode`] whose
//! bounds are mapped back to the original frame.

use super::BarcodeDecoder;
use crate::constants::DEFAULT_MAX_DECODE_DIMENSION;
use crate::errors::DecodeError;
use crate::frame::{Frame, PixelFormat};
use crate::frame_processor::types::{Barcode, FrameRegion};
use tracing::{debug, trace};

/// QR code decoder
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDecoder {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DECODE_DIMENSION,
        }
    }

    /// Create a QR decoder with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, frame: &Frame) -> Result<Vec<Barcode>, DecodeError> {
        decode_sync(frame, self.max_dimension)
    }
}

/// Packed 8-bit luma image
struct LumaImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl LumaImage {
    fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }
}

fn decode_sync(frame: &Frame, max_dimension: u32) -> Result<Vec<Barcode>, DecodeError> {
    frame.validate().map_err(DecodeError::InvalidFrame)?;

    let start = std::time::Instant::now();
    let luma = luma_without_stride(frame);

    let (image, scale) = if frame.width > max_dimension || frame.height > max_dimension {
        let scale = (frame.width as f32 / max_dimension as f32)
            .max(frame.height as f32 / max_dimension as f32);
        let new_width = ((frame.width as f32 / scale) as usize).max(1);
        let new_height = ((frame.height as f32 / scale) as usize).max(1);
        (downscale_luma(&luma, new_width, new_height), scale)
    } else {
        (luma, 1.0)
    };

    trace!(
        proc_width = image.width,
        proc_height = image.height,
        scale,
        rotation = %frame.rotation,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luma image"
    );

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(image.width, image.height, |x, y| {
            image.get(x, y)
        });
    let grids = prepared.detect_grids();

    let mut barcodes = Vec::with_capacity(grids.len());
    let mut first_error = None;

    for grid in &grids {
        let content = match grid.decode() {
            Ok((_meta, content)) => content,
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR grid");
                first_error.get_or_insert_with(|| format!("{:?}", e));
                continue;
            }
        };

        let min_x = grid.bounds.iter().map(|p| p.x).min().unwrap_or(0).max(0) as f32;
        let max_x = grid.bounds.iter().map(|p| p.x).max().unwrap_or(0).max(0) as f32;
        let min_y = grid.bounds.iter().map(|p| p.y).min().unwrap_or(0).max(0) as f32;
        let max_y = grid.bounds.iter().map(|p| p.y).max().unwrap_or(0).max(0) as f32;

        let max_x = max_x.min(image.width as f32);
        let max_y = max_y.min(image.height as f32);

        // Back to original frame coordinates (sensor orientation)
        let region = FrameRegion::from_pixels(
            (min_x * scale) as u32,
            (min_y * scale) as u32,
            ((max_x - min_x).max(0.0) * scale) as u32,
            ((max_y - min_y).max(0.0) * scale) as u32,
            frame.width,
            frame.height,
        );

        debug!(
            content = %content,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "Decoded QR code"
        );

        barcodes.push(Barcode::new(content).with_bounds(region));
    }

    // Every grid that was found failed to decode
    if barcodes.is_empty()
        && let Some(error) = first_error
    {
        return Err(DecodeError::Backend(format!(
            "{} QR grid(s) found, none decoded: {}",
            grids.len(),
            error
        )));
    }

    trace!(
        count = barcodes.len(),
        total_ms = start.elapsed().as_millis(),
        "QR decode complete"
    );

    Ok(barcodes)
}

/// Copy visible pixels as luma, dropping stride padding
fn luma_without_stride(frame: &Frame) -> LumaImage {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let bpp = frame.format.bytes_per_pixel();

    let mut pixels = Vec::with_capacity(width * height);

    for y in 0..height {
        let row_start = y * stride;
        let row = &frame.data[row_start..row_start + width * bpp];
        match frame.format {
            PixelFormat::Gray8 => pixels.extend_from_slice(row),
            PixelFormat::Rgba | PixelFormat::Rgb24 => {
                pixels.extend(row.chunks_exact(bpp).map(|px| luma(px[0], px[1], px[2])));
            }
        }
    }

    LumaImage {
        width,
        height,
        pixels,
    }
}

/// BT.601 luma
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Downscale luma image using bilinear interpolation
fn downscale_luma(src: &LumaImage, dst_width: usize, dst_height: usize) -> LumaImage {
    let mut pixels = Vec::with_capacity(dst_width * dst_height);

    let x_ratio = src.width as f32 / dst_width as f32;
    let y_ratio = src.height as f32 / dst_height as f32;

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = (src_x as usize).min(src.width - 1);
            let y0 = (src_y as usize).min(src.height - 1);
            let x1 = (x0 + 1).min(src.width - 1);
            let y1 = (y0 + 1).min(src.height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let p00 = src.get(x0, y0) as f32;
            let p01 = src.get(x1, y0) as f32;
            let p10 = src.get(x0, y1) as f32;
            let p11 = src.get(x1, y1) as f32;

            let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                + p01 * x_frac * (1.0 - y_frac)
                + p10 * (1.0 - x_frac) * y_frac
                + p11 * x_frac * y_frac;

            pixels.push(value as u8);
        }
    }

    LumaImage {
        width: dst_width,
        height: dst_height,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn rgba_frame(width: u32, height: u32, stride: u32, data: Vec<u8>) -> Frame {
        let mut frame = Frame::packed(width, height, PixelFormat::Rgba, data);
        frame.stride = stride;
        frame
    }

    #[test]
    fn test_luma_without_stride() {
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // White pixel
            0, 0, 0, 255,       // Black pixel
            9, 9,               // stride padding
            0, 0, 0, 255,       // Black pixel
            255, 255, 255, 255, // White pixel
            9, 9,               // stride padding
        ];

        let frame = rgba_frame(2, 2, 10, data);
        let luma = luma_without_stride(&frame);

        assert_eq!(luma.pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_gray_frame_copied_verbatim() {
        let mut frame = Frame::packed(3, 2, PixelFormat::Gray8, vec![1u8, 2, 3, 0, 4, 5, 6]);
        frame.stride = 4;
        let luma = luma_without_stride(&frame);
        assert_eq!(luma.pixels, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_downscale_luma() {
        // 4x2 gradient
        let src = LumaImage {
            width: 4,
            height: 2,
            pixels: vec![0, 85, 170, 255, 0, 85, 170, 255],
        };

        let result = downscale_luma(&src, 2, 1);
        assert_eq!(result.pixels.len(), 2);
        assert!(result.pixels[0] < 100);
        assert!(result.pixels[1] > 150);
    }

    #[test]
    fn test_blank_frame_has_no_candidates() {
        let frame = Frame::packed(64, 48, PixelFormat::Rgba, vec![255u8; 64 * 48 * 4]);
        let result = QrDecoder::new().decode(&frame);
        assert_eq!(result, Ok(Vec::new()));
    }

    #[test]
    fn test_large_blank_frame_is_downscaled() {
        let frame = Frame::packed(1280, 720, PixelFormat::Gray8, vec![128u8; 1280 * 720]);
        let result = QrDecoder::with_max_dimension(320).decode(&frame);
        assert_eq!(result, Ok(Vec::new()));
    }

    #[test]
    fn test_short_buffer_is_invalid_frame() {
        let frame = Frame {
            data: Arc::from(vec![0u8; 10]),
            ..Frame::packed(8, 8, PixelFormat::Rgb24, Vec::<u8>::new())
        };
        assert!(matches!(
            QrDecoder::new().decode(&frame),
            Err(DecodeError::InvalidFrame(_))
        ));
    }
}
