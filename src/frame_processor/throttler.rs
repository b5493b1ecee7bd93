// SPDX-License-Identifier: GPL-3.0-only

//! Single-flight frame throttling
//!
//! Camera pipelines produce frames much faster than a barcode decoder can
//! consume them. The throttler keeps at most one decode in flight: a frame
//! that arrives while the decoder is busy is released straight back to the
//! camera without being looked at.
//!
//! The protocol has two phases. [`DecodeGate::begin`] either drops the frame
//! or hands back a [`PendingDecode`] that owns the frame, its release action
//! and the busy flag. [`DecodeGate::complete`] consumes that token, forwards
//! the payload to the sink, clears the busy flag and releases the frame.
//! [`FrameThrottler`] drives both phases with a decoder on tokio's blocking
//! pool.
//!
//! Every submitted frame is released exactly once. The release action lives
//! in a [`ReleaseHandle`] which is consumed on release and releases on drop,
//! so a panicking decoder or sink still returns the frame and frees the gate.

use crate::errors::DecodeError;
use crate::frame::Frame;
use crate::frame_processor::tasks::BarcodeDecoder;
use crate::frame_processor::types::{Barcode, DecodeOutcome};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Consumer of decoded payloads
pub trait BarcodeSink: Send + Sync + 'static {
    fn on_barcode(&self, value: String);
}

impl<F> BarcodeSink for F
where
    F: Fn(String) + Send + Sync + 'static,
{
    fn on_barcode(&self, value: String) {
        self(value)
    }
}

/// Release action for one frame, run exactly once
///
/// Dropping an unreleased handle runs the action.
pub struct ReleaseHandle {
    action: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseHandle {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Give the frame back to its producer
    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseHandle")
            .field("released", &self.action.is_none())
            .finish()
    }
}

/// Ownership of the busy flag; clears it on drop
struct FlightToken {
    busy: Arc<AtomicBool>,
}

impl FlightToken {
    fn acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                busy: Arc::clone(busy),
            })
    }
}

impl Drop for FlightToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// A dispatched frame awaiting its decode result
///
/// Holding this value is what keeps the gate busy.
pub struct PendingDecode {
    sequence: u64,
    frame: Frame,
    // Field order matters: on drop the gate is freed before the frame is released
    token: FlightToken,
    release: ReleaseHandle,
}

impl PendingDecode {
    /// Frame to hand to the decoder
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Submission number of this frame, starting at 0
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::fmt::Debug for PendingDecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDecode")
            .field("sequence", &self.sequence)
            .field("frame", &self.frame)
            .finish()
    }
}

/// Result of the first phase
#[derive(Debug)]
pub enum Dispatch {
    /// The gate was idle; decode the frame and pass the token to `complete`
    Accepted(PendingDecode),
    /// A decode was already in flight; the frame has been released
    Dropped,
}

/// What `submit` did with a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Dispatched,
    Dropped,
}

/// Snapshot of throttler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThrottlerStats {
    pub submitted: u64,
    pub dropped: u64,
    pub dispatched: u64,
    /// Payloads forwarded to the sink
    pub decoded: u64,
    /// Decodes that reported a failure
    pub failed: u64,
    pub released: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    dispatched: AtomicU64,
    decoded: AtomicU64,
    failed: AtomicU64,
    released: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed)
    }

    fn snapshot(&self) -> ThrottlerStats {
        ThrottlerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
        }
    }
}

/// Single-flight gate between a frame producer and a decoder
///
/// Cloning is cheap; clones share the busy flag, sink and counters.
#[derive(Clone)]
pub struct DecodeGate {
    busy: Arc<AtomicBool>,
    sink: Arc<dyn BarcodeSink>,
    counters: Arc<Counters>,
}

impl DecodeGate {
    pub fn new(sink: impl BarcodeSink) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(sink),
            counters: Arc::new(Counters::default()),
        }
    }

    /// First phase: claim the decoder for `frame`, or drop it
    ///
    /// Never blocks. A dropped frame is released before this returns.
    pub fn begin(&self, frame: Frame, release: impl FnOnce() + Send + 'static) -> Dispatch {
        let sequence = Counters::bump(&self.counters.submitted);

        let counters = Arc::clone(&self.counters);
        let release = ReleaseHandle::new(move || {
            Counters::bump(&counters.released);
            release();
        });

        match FlightToken::acquire(&self.busy) {
            Some(token) => {
                Counters::bump(&self.counters.dispatched);
                trace!(sequence, ?frame, "Dispatching frame to decoder");
                Dispatch::Accepted(PendingDecode {
                    sequence,
                    frame,
                    token,
                    release,
                })
            }
            None => {
                Counters::bump(&self.counters.dropped);
                trace!(sequence, "Decoder busy, dropping frame");
                drop(frame);
                release.release();
                Dispatch::Dropped
            }
        }
    }

    /// Second phase: apply the decode result for a dispatched frame
    ///
    /// The first candidate's payload, if non-empty, goes to the sink. Decode
    /// failures and sink panics are logged, counted as failed and absorbed.
    /// The gate is freed, then the frame released.
    pub fn complete(&self, pending: PendingDecode, result: Result<Vec<Barcode>, DecodeError>) {
        let PendingDecode {
            sequence,
            frame,
            token,
            release,
        } = pending;

        match result {
            Ok(candidates) => {
                let count = candidates.len();
                match DecodeOutcome::from_candidates(candidates) {
                    DecodeOutcome::Present(value) => {
                        debug!(sequence, candidates = count, value = %value, "Barcode decoded");
                        // Contained so the gate still frees before the release runs
                        let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| {
                            self.sink.on_barcode(value)
                        }));
                        match delivered {
                            Ok(()) => {
                                Counters::bump(&self.counters.decoded);
                            }
                            Err(panic) => {
                                Counters::bump(&self.counters.failed);
                                warn!(sequence, panic = %panic_message(&*panic), "Barcode sink panicked");
                            }
                        }
                    }
                    DecodeOutcome::Absent => {
                        trace!(sequence, candidates = count, "No payload in frame");
                    }
                }
            }
            Err(e) => {
                Counters::bump(&self.counters.failed);
                warn!(sequence, error = %e, "Barcode decode failed");
            }
        }

        drop(frame);
        drop(token);
        release.release();
    }

    /// True while a decode is outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// True once no decode is outstanding and every submitted frame is released
    ///
    /// The busy flag clears just before the dispatched frame's release runs,
    /// so `!is_busy()` alone can briefly report a frame as unreleased.
    pub fn is_idle(&self) -> bool {
        let stats = self.stats();
        !self.is_busy() && stats.released == stats.submitted
    }

    pub fn stats(&self) -> ThrottlerStats {
        self.counters.snapshot()
    }
}

/// Drops frames while a decode is in flight, decodes the rest
///
/// Decoding runs on the tokio blocking pool of the given runtime, so
/// [`submit`](Self::submit) can be called from a camera callback thread.
#[derive(Clone)]
pub struct FrameThrottler {
    gate: DecodeGate,
    decoder: Arc<dyn BarcodeDecoder>,
    runtime: Handle,
}

impl FrameThrottler {
    pub fn new(decoder: impl BarcodeDecoder, sink: impl BarcodeSink, runtime: Handle) -> Self {
        Self {
            gate: DecodeGate::new(sink),
            decoder: Arc::new(decoder),
            runtime,
        }
    }

    /// Submit a frame with the action that returns it to the camera
    ///
    /// If a decode is in flight the frame is released immediately.
    /// Otherwise it is decoded in the background and released once the
    /// result has been handled.
    pub fn submit(&self, frame: Frame, release: impl FnOnce() + Send + 'static) -> SubmitOutcome {
        let pending = match self.gate.begin(frame, release) {
            Dispatch::Accepted(pending) => pending,
            Dispatch::Dropped => return SubmitOutcome::Dropped,
        };

        let gate = self.gate.clone();
        let decoder = Arc::clone(&self.decoder);
        self.runtime.spawn_blocking(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                decoder.decode(pending.frame())
            }))
            .unwrap_or_else(|panic| Err(DecodeError::WorkerPanicked(panic_message(&*panic))));
            gate.complete(pending, result);
        });

        SubmitOutcome::Dispatched
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// See [`DecodeGate::is_idle`]
    pub fn is_idle(&self) -> bool {
        self.gate.is_idle()
    }

    pub fn stats(&self) -> ThrottlerStats {
        self.gate.stats()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
