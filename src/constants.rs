// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Frames are downscaled so their larger side fits this before QR detection.
/// QR codes held up to a camera are large enough to survive 640px.
pub const DEFAULT_MAX_DECODE_DIMENSION: u32 = 640;

/// Smallest downscale target accepted from configuration
pub const MIN_DECODE_DIMENSION: u32 = 64;

/// Delay between frames when the CLI simulates a camera (~30 fps)
pub const DEFAULT_FEED_INTERVAL: Duration = Duration::from_millis(33);

/// How often the CLI polls for the throttler to become idle before exit
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Log filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "scanner";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// URI schemes recognised as live-stream ingest endpoints
pub const STREAM_SCHEMES: [&str; 4] = ["rtmp", "rtmps", "srt", "rtsp"];
