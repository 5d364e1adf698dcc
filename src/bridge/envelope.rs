//! Bridge message envelopes.
//!
//! Two message shapes share the injected channel, discriminated by the
//! `from` origin tag:
//!
//! | Tag | Shape | Direction | Response |
//! |-----|-------|-----------|----------|
//! | `ive-injected` | [`InboundMessage::Telemetry`] | page → host | never |
//! | `iveplay` | [`InboundMessage::Command`] | page → host | exactly one |
//! | `ive-extension` | [`BridgeResponse`] | host → page | - |
//!
//! Response envelopes are shaped so in-page script cannot tell them apart
//! from the real ive browser extension's replies.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identifiers::CorrelationId;

// ============================================================================
// VideoEvent
// ============================================================================

/// Fixed vocabulary of video telemetry events.
///
/// Mirrors the HTML media event names, prefixed on the wire with `video:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoEvent {
    /// Videos detected on the page, none tracked yet.
    #[serde(rename = "video:available")]
    Available,
    /// A video was selected for tracking.
    #[serde(rename = "video:found")]
    Found,
    /// The tracked video left the DOM or shrank below the size threshold.
    #[serde(rename = "video:lost")]
    Lost,
    /// Playback was requested.
    #[serde(rename = "video:play")]
    Play,
    /// Playback was paused.
    #[serde(rename = "video:pause")]
    Pause,
    /// A seek started.
    #[serde(rename = "video:seeking")]
    Seeking,
    /// A seek completed.
    #[serde(rename = "video:seeked")]
    Seeked,
    /// The playback rate changed.
    #[serde(rename = "video:ratechange")]
    RateChange,
    /// Periodic position update.
    #[serde(rename = "video:timeupdate")]
    TimeUpdate,
    /// The duration became known or changed.
    #[serde(rename = "video:durationchange")]
    DurationChange,
    /// Volume or mute state changed.
    #[serde(rename = "video:volumechange")]
    VolumeChange,
    /// Playback stalled waiting for data.
    #[serde(rename = "video:waiting")]
    Waiting,
    /// Playback resumed after start/stall.
    #[serde(rename = "video:playing")]
    Playing,
    /// Playback reached the end.
    #[serde(rename = "video:ended")]
    Ended,
}

// ============================================================================
// VideoPayload
// ============================================================================

/// Normalized snapshot of the tracked element's state.
///
/// Times are always milliseconds; the instrumentation layer converts from
/// the element's native seconds before posting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPayload {
    /// Current position in milliseconds.
    pub current_time_ms: u64,
    /// Duration in milliseconds (0 while unknown).
    pub duration_ms: u64,
    /// Playback rate (1.0 = normal).
    pub playback_rate: f64,
    /// Volume in `[0.0, 1.0]`.
    pub volume: f64,
    /// Whether the element is muted.
    pub muted: bool,
    /// Whether the element is paused.
    pub paused: bool,
}

impl Default for VideoPayload {
    fn default() -> Self {
        Self {
            current_time_ms: 0,
            duration_ms: 0,
            playback_rate: 1.0,
            volume: 1.0,
            muted: false,
            paused: true,
        }
    }
}

// ============================================================================
// CommandMessage
// ============================================================================

/// A correlated command request from page script.
///
/// Extra fields beyond the envelope header are kept as raw JSON; each
/// command kind knows which ones it expects.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    /// Page-chosen correlation id, echoed in the response.
    pub id: CorrelationId,
    /// Command kind, e.g. `ive:ivedb:ping`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form command fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CommandMessage {
    /// Returns a string field, if present.
    #[inline]
    #[must_use]
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns a raw field value, if present.
    #[inline]
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Any message arriving from the page, discriminated by origin tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "from")]
pub enum InboundMessage {
    /// Video telemetry from the instrumentation layer. Never answered.
    #[serde(rename = "ive-injected")]
    Telemetry {
        /// Event kind.
        #[serde(rename = "type")]
        kind: VideoEvent,
        /// Element state snapshot.
        payload: VideoPayload,
    },

    /// Command request from ive-play. Always answered exactly once.
    #[serde(rename = "iveplay")]
    Command(CommandMessage),
}

/// Parses a raw channel payload.
///
/// Returns `None` for anything malformed - unknown tags, missing fields,
/// invalid JSON. Malformed payloads are dropped silently by policy.
#[must_use]
pub fn parse_envelope(raw: &str) -> Option<InboundMessage> {
    serde_json::from_str(raw).ok()
}

// ============================================================================
// BridgeResponse
// ============================================================================

/// Origin tag stamped on every host response.
const RESPONSE_ORIGIN: &str = "ive-extension";

/// The single correlated response to a [`CommandMessage`].
#[derive(Debug, Clone, Serialize)]
pub struct BridgeResponse {
    /// Always `ive-extension`.
    pub from: &'static str,
    /// Correlation id echoed from the request.
    pub id: CorrelationId,
    /// Result data (`null` on error or empty results).
    pub data: Value,
    /// Page-facing error string, `null` on success.
    pub error: Option<String>,
}

impl BridgeResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn ok(id: CorrelationId, data: Value) -> Self {
        Self {
            from: RESPONSE_ORIGIN,
            id,
            data,
            error: None,
        }
    }

    /// Creates an error response with `null` data.
    #[inline]
    #[must_use]
    pub fn err(id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            from: RESPONSE_ORIGIN,
            id,
            data: Value::Null,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
