// SPDX-License-Identifier: GPL-3.0-only

//! Frame processor module for barcode scanning
//!
//! Frames from the camera go through a [`FrameThrottler`], which keeps a
//! single decode in flight and drops everything that arrives meanwhile.
//! Decoders live in [`tasks`]; result types in [`types`].

pub mod tasks;
pub mod throttler;
pub mod types;

pub use tasks::{BarcodeDecoder, QrDecoder};
pub use throttler::{
    BarcodeSink, DecodeGate, Dispatch, FrameThrottler, PendingDecode, ReleaseHandle,
    SubmitOutcome, ThrottlerStats,
};
pub use types::{Barcode, DecodeOutcome, FrameRegion, ScanPayload, WifiSecurity};
