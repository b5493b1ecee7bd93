// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame decoding results
//!
//! Decoders produce [`Barcode`] candidates. The throttler reduces the
//! candidate list of a frame to a single [`DecodeOutcome`], and consumers
//! may classify the payload with [`ScanPayload::parse`].

use crate::constants::STREAM_SCHEMES;
use serde::{Deserialize, Serialize};

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions,
/// so they can be mapped to screen space regardless of display scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }
}

/// One candidate found by a decoder
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Barcode {
    /// Decoded payload, if the symbol carried one
    pub raw_value: Option<String>,
    /// Location of the symbol in normalized frame coordinates
    pub bounds: Option<FrameRegion>,
}

impl Barcode {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Self {
            raw_value: Some(raw_value.into()),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: FrameRegion) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Result of decoding one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// A non-empty payload was found
    Present(String),
    /// Nothing decodable in the frame
    Absent,
}

impl DecodeOutcome {
    /// Reduce a candidate list to an outcome
    ///
    /// Only the first candidate is considered; a frame is expected to hold a
    /// single code. An empty or missing payload on that candidate is `Absent`
    /// even if later candidates carry one.
    pub fn from_candidates(candidates: Vec<Barcode>) -> Self {
        match candidates.into_iter().next().and_then(|b| b.raw_value) {
            Some(value) if !value.is_empty() => Self::Present(value),
            _ => Self::Absent,
        }
    }
}

/// WiFi security type parsed from a QR code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiSecurity {
    None,
    Wep,
    /// WPA/WPA2 Personal
    Wpa,
    Wpa3,
}

impl WifiSecurity {
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "WEP" => Self::Wep,
            "WPA3" | "SAE" => Self::Wpa3,
            "NOPASS" | "" => Self::None,
            _ => Self::Wpa,
        }
    }
}

/// What a decoded payload is for
///
/// Streaming setups hand out ingest endpoints as QR codes, so those are
/// recognised separately from ordinary links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanPayload {
    /// Live-stream ingest endpoint (rtmp, rtmps, srt, rtsp)
    StreamEndpoint { scheme: String, url: String },
    /// Web link
    Url(String),
    /// WiFi network credentials
    Wifi {
        ssid: String,
        password: Option<String>,
        security: WifiSecurity,
        hidden: bool,
    },
    /// Anything else
    Text(String),
}

impl ScanPayload {
    /// Classify decoded content
    pub fn parse(content: &str) -> Self {
        let trimmed = content.trim();

        if let Some((scheme, _)) = trimmed.split_once("://") {
            let scheme = scheme.to_ascii_lowercase();
            if STREAM_SCHEMES.contains(&scheme.as_str()) {
                return Self::StreamEndpoint {
                    scheme,
                    url: trimmed.to_string(),
                };
            }
            if scheme == "http" || scheme == "https" {
                return Self::Url(trimmed.to_string());
            }
        }

        if trimmed.starts_with("WIFI:") {
            return Self::parse_wifi(trimmed);
        }

        // Bare domain names
        if !trimmed.contains(' ')
            && trimmed.len() < 256
            && (trimmed.starts_with("www.")
                || [".com", ".org", ".net", ".io", ".tv"]
                    .iter()
                    .any(|tld| trimmed.ends_with(tld)))
        {
            return Self::Url(format!("https://{}", trimmed));
        }

        Self::Text(trimmed.to_string())
    }

    /// Parse `WIFI:T:WPA;S:network;P:password;H:true;;`
    fn parse_wifi(content: &str) -> Self {
        let mut ssid = String::new();
        let mut password = None;
        let mut security = WifiSecurity::None;
        let mut hidden = false;

        let content = content.strip_prefix("WIFI:").unwrap_or(content);
        let content = content.trim_end_matches(';');

        for part in split_unescaped(content) {
            if let Some((key, value)) = part.split_once(':') {
                let value = value
                    .replace("\\;", ";")
                    .replace("\\:", ":")
                    .replace("\\,", ",")
                    .replace("\\\\", "\\");

                match key {
                    "S" => ssid = value,
                    "P" => password = Some(value),
                    "T" => security = WifiSecurity::parse(&value),
                    "H" => hidden = value.eq_ignore_ascii_case("true"),
                    _ => {}
                }
            }
        }

        Self::Wifi {
            ssid,
            password,
            security,
            hidden,
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::StreamEndpoint { .. } => "Stream endpoint",
            Self::Url(_) => "Link",
            Self::Wifi { .. } => "WiFi network",
            Self::Text(_) => "Text",
        }
    }
}

/// Split on `;` that is not preceded by a backslash
fn split_unescaped(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ';' if !escaped => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_takes_first_candidate() {
        let outcome = DecodeOutcome::from_candidates(vec![Barcode::new("X123"), Barcode::new("Y456")]);
        assert_eq!(outcome, DecodeOutcome::Present("X123".to_string()));
    }

    #[test]
    fn test_outcome_absent_for_empty_list() {
        assert_eq!(DecodeOutcome::from_candidates(Vec::new()), DecodeOutcome::Absent);
    }

    #[test]
    fn test_outcome_ignores_later_candidates_when_first_is_empty() {
        let candidates = vec![Barcode::new(""), Barcode::new("later")];
        assert_eq!(DecodeOutcome::from_candidates(candidates), DecodeOutcome::Absent);

        let candidates = vec![Barcode::default(), Barcode::new("later")];
        assert_eq!(DecodeOutcome::from_candidates(candidates), DecodeOutcome::Absent);
    }

    #[test]
    fn test_parse_stream_endpoint() {
        match ScanPayload::parse("rtmp://live.example.com/app/stream-key") {
            ScanPayload::StreamEndpoint { scheme, url } => {
                assert_eq!(scheme, "rtmp");
                assert_eq!(url, "rtmp://live.example.com/app/stream-key");
            }
            other => panic!("Expected StreamEndpoint, got {:?}", other),
        }
        assert!(matches!(
            ScanPayload::parse("SRT://10.0.0.2:9000"),
            ScanPayload::StreamEndpoint { .. }
        ));
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            ScanPayload::parse("https://example.com"),
            ScanPayload::Url("https://example.com".to_string())
        );
        assert_eq!(
            ScanPayload::parse("www.example.org"),
            ScanPayload::Url("https://www.example.org".to_string())
        );
    }

    #[test]
    fn test_parse_wifi() {
        match ScanPayload::parse("WIFI:S:My\\;Net;T:WPA;P:secret;H:true;;") {
            ScanPayload::Wifi {
                ssid,
                password,
                security,
                hidden,
            } => {
                assert_eq!(ssid, "My;Net");
                assert_eq!(password, Some("secret".to_string()));
                assert_eq!(security, WifiSecurity::Wpa);
                assert!(hidden);
            }
            other => panic!("Expected Wifi, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(
            ScanPayload::parse("  X123 "),
            ScanPayload::Text("X123".to_string())
        );
    }

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(100, 50, 200, 100, 1000, 500);
        assert!((region.x - 0.1).abs() < 0.001);
        assert!((region.y - 0.1).abs() < 0.001);
        assert!((region.width - 0.2).abs() < 0.001);
        assert!((region.height - 0.2).abs() < 0.001);
    }
}
