// SPDX-License-Identifier: GPL-3.0-only

//! Scanner - single-flight barcode scanning for camera frame pipelines
//!
//! A camera delivers frames far faster than a barcode decoder can read them.
//! This crate puts a [`FrameThrottler`] between the two: one frame is decoded
//! at a time, frames arriving meanwhile are released straight back to the
//! camera, and every decoded payload is forwarded to a sink.
//!
//! # Architecture
//!
//! - [`frame`]: the frame handle passed from the camera
//! - [`frame_processor`]: the throttler, decoder trait, QR decoder and result types
//! - [`config`]: user configuration handling
//! - [`errors`]: error types
//!
//! # Example
//!
//! ```ignore
//! let throttler = FrameThrottler::new(
//!     QrDecoder::new(),
//!     |value: String| println!("scanned {value}"),
//!     tokio::runtime::Handle::current(),
//! );
//! throttler.submit(frame, move || camera.requeue(buffer));
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod frame_processor;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult, DecodeError};
pub use frame::{Frame, PixelFormat, SensorRotation};
pub use frame_processor::{
    Barcode, BarcodeDecoder, BarcodeSink, DecodeOutcome, FrameThrottler, QrDecoder, ScanPayload,
    SubmitOutcome, ThrottlerStats,
};
