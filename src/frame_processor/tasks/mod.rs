// SPDX-License-Identifier: GPL-3.0-only

//! Frame decoding tasks
//!
//! This module contains the decoder abstraction the throttler dispatches to,
//! and the QR code implementation of it.

pub mod qr_detector;

pub use qr_detector::QrDecoder;

use crate::errors::DecodeError;
use crate::frame::Frame;
use crate::frame_processor::types::Barcode;

/// Decoder capability
///
/// Given a frame's pixels and rotation metadata, return every candidate
/// found, or a failure. Implementations run on a blocking worker thread and
/// may take as long as they need; the throttler never calls `decode` while
/// another call is outstanding.
pub trait BarcodeDecoder: Send + Sync + 'static {
    fn decode(&self, frame: &Frame) -> Result<Vec<Barcode>, DecodeError>;
}

impl<F> BarcodeDecoder for F
where
    F: Fn(&Frame) -> Result<Vec<Barcode>, DecodeError> + Send + Sync + 'static,
{
    fn decode(&self, frame: &Frame) -> Result<Vec<Barcode>, DecodeError> {
        self(frame)
    }
}
