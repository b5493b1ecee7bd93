// SPDX-License-Identifier: GPL-3.0-only

//! Camera frame handle passed through the scanner
//!
//! A [`Frame`] is an opaque view of one captured image. The pixel bytes are
//! reference counted, so handing a frame to a decode worker never copies the
//! image. Releasing the underlying camera buffer is the job of the
//! [`ReleaseHandle`](crate::frame_processor::ReleaseHandle) submitted with it.

use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Pixel layouts the decoders understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
    /// RGB24 - 24-bit RGB without alpha
    Rgb24,
    /// Gray8 - 8-bit luma, also the Y plane of NV12/I420 buffers
    Gray8,
}

impl PixelFormat {
    /// Bytes used by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Sensor rotation in degrees (clockwise)
///
/// Camera sensors are often mounted at 90° or 270° relative to the display.
/// Decoders receive the rotation alongside the pixels so results can be
/// mapped to the display orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One captured image
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Pixel bytes, row-major, `stride` bytes per row
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Sensor rotation reported by the camera
    pub rotation: SensorRotation,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl Frame {
    /// Create a tightly packed frame (stride = width * bytes per pixel)
    ///
    /// A row too wide for a `u32` stride gets `u32::MAX`, which
    /// [`validate`](Self::validate) rejects.
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            stride: u32::try_from(u64::from(width) * format.bytes_per_pixel() as u64)
                .unwrap_or(u32::MAX),
            rotation: SensorRotation::None,
            captured_at: Instant::now(),
        }
    }

    /// Load an image file as an RGBA frame
    pub fn open(path: &Path) -> AppResult<Self> {
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::packed(width, height, PixelFormat::Rgba, image.into_raw()))
    }

    /// Set the sensor rotation
    pub fn with_rotation(mut self, rotation: SensorRotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Bytes of visible pixels in one row (stride excluded)
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Check that the buffer covers every visible row
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("empty frame {}x{}", self.width, self.height));
        }
        let row_bytes = self.row_bytes();
        let stride = self.stride as usize;
        if stride < row_bytes {
            return Err(format!("stride {} shorter than row ({} bytes)", stride, row_bytes));
        }
        let required = stride * (self.height as usize - 1) + row_bytes;
        if self.data.len() < required {
            return Err(format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                self.data.len(),
                self.width,
                self.height,
                self.format,
                required
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("stride", &self.stride)
            .field("rotation", &self.rotation)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_degrees_normalises() {
        assert_eq!(SensorRotation::from_degrees(-90), SensorRotation::Rotate270);
        assert_eq!(SensorRotation::from_degrees(450), SensorRotation::Rotate90);
        assert_eq!(SensorRotation::from_degrees(45), SensorRotation::None);
        assert_eq!(SensorRotation::Rotate270.degrees(), 270);
    }

    #[test]
    fn test_packed_frame_validates() {
        let frame = Frame::packed(4, 2, PixelFormat::Rgba, vec![0u8; 32]);
        assert_eq!(frame.stride, 16);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_buffer() {
        let frame = Frame::packed(4, 2, PixelFormat::Rgb24, vec![0u8; 20]);
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_validate_allows_unpadded_last_row() {
        // Last row needs no trailing stride padding
        let mut frame = Frame::packed(2, 2, PixelFormat::Gray8, vec![0u8; 6]);
        frame.stride = 4;
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_open_png_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::GrayImage::from_pixel(3, 2, image::Luma([200u8]))
            .save(&path)
            .unwrap();

        let frame = Frame::open(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.format, PixelFormat::Rgba);
        assert_eq!(frame.data.len(), 3 * 2 * 4);
        assert_eq!(&frame.data[0..4], &[200, 200, 200, 255]);
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(Frame::open(Path::new("/nonexistent/frame.png")).is_err());
    }

    #[test]
    fn test_oversized_row_saturates_stride() {
        let frame = Frame::packed(1 << 30, 1, PixelFormat::Rgba, Vec::<u8>::new());
        assert_eq!(frame.stride, u32::MAX);
        assert!(frame.validate().unwrap_err().contains("stride"));
    }

    #[test]
    fn test_validate_rejects_empty_frame() {
        let frame = Frame::packed(0, 10, PixelFormat::Gray8, Vec::<u8>::new());
        assert!(frame.validate().is_err());
    }
}
