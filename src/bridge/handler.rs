//! Message dispatch between page channels and host logic.
//!
//! One handler serves every session. Each raw channel payload is parsed,
//! policy-checked and routed:
//!
//! - telemetry from the focused session is surfaced to the caller (the
//!   shell owns playback state and decides what the event means),
//! - telemetry from any other session is dropped,
//! - commands are origin-checked, then processed on a spawned task so
//!   device I/O never blocks message dispatch; the single response is
//!   injected back into the originating session.
//!
//! Malformed payloads and disallowed origins are dropped without a
//! response. A page that never receives an answer behaves as if no
//! extension is installed, which is the correct fallback.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::identifiers::SessionId;
use crate::inject::build_response_script;

use super::commands::CommandProcessor;
use super::envelope::{InboundMessage, VideoEvent, VideoPayload, parse_envelope};
use super::origin::is_allowed_page;

// ============================================================================
// PageSink
// ============================================================================

/// Host-side primitive for running a script inside a session's page.
///
/// The shell implements this over whatever rendering surface it drives;
/// injection into an already-evicted session must be a silent no-op.
pub trait PageSink: Send + Sync {
    /// Evaluates `script` in the session's page context.
    fn inject(&self, session_id: SessionId, script: String);
}

// ============================================================================
// BridgeHandler
// ============================================================================

/// Routes raw page messages to telemetry or command processing.
pub struct BridgeHandler {
    /// Executes command semantics.
    processor: Arc<CommandProcessor>,
    /// Delivers responses back into pages.
    sink: Arc<dyn PageSink>,
}

impl BridgeHandler {
    /// Creates a handler over the shared processor and injection sink.
    #[must_use]
    pub fn new(processor: Arc<CommandProcessor>, sink: Arc<dyn PageSink>) -> Self {
        Self { processor, sink }
    }

    /// Handles one raw payload from a session's page channel.
    ///
    /// Returns the telemetry event when the payload was a video event from
    /// the focused session; the caller applies it to playback state.
    /// Commands complete asynchronously and always return `None`.
    pub fn handle_raw(
        &self,
        session_id: SessionId,
        focused: bool,
        page_url: &str,
        raw: &str,
    ) -> Option<(VideoEvent, VideoPayload)> {
        let message = match parse_envelope(raw) {
            Some(message) => message,
            None => {
                trace!(session_id = %session_id, "Dropping malformed page message");
                return None;
            }
        };

        match message {
            InboundMessage::Telemetry { kind, payload } => {
                if !focused {
                    trace!(
                        session_id = %session_id,
                        event = ?kind,
                        "Dropping telemetry from unfocused session"
                    );
                    return None;
                }
                Some((kind, payload))
            }

            InboundMessage::Command(command) => {
                if !is_allowed_page(page_url) {
                    warn!(
                        session_id = %session_id,
                        page_url,
                        kind = %command.kind,
                        "Dropping command from disallowed origin"
                    );
                    return None;
                }

                debug!(
                    session_id = %session_id,
                    kind = %command.kind,
                    correlation_id = %command.id,
                    "Dispatching bridge command"
                );

                let processor = Arc::clone(&self.processor);
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    let response = processor.process(command).await;
                    if let Some(script) = build_response_script(&response) {
                        sink.inject(session_id, script);
                    }
                });
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
