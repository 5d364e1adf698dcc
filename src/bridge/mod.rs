//! The page/host message bridge.
//!
//! Pages talk to the host over a single string channel per session. This
//! module owns everything about that channel: envelope shapes
//! ([`envelope`]), the origin allow-list for commands ([`origin`]), the
//! command table ([`commands`]) and the dispatcher that ties them together
//! ([`handler`]).
//!
//! Two traffic classes share the channel and never mix:
//!
//! - **telemetry** (`from: "ive-injected"`) - video state from the
//!   instrumentation layer; accepted only from the focused session and
//!   never answered,
//! - **commands** (`from: "iveplay"`) - correlated requests from ive-play
//!   pages; origin-checked and answered exactly once with an
//!   `ive-extension` envelope.

// ============================================================================
// Submodules
// ============================================================================

/// Bridge command semantics: the fixed command table.
pub mod commands;

/// Wire envelopes for both directions of the channel.
pub mod envelope;

/// Message dispatch and response injection.
pub mod handler;

/// Origin allow-list for command messages.
pub mod origin;

// ============================================================================
// Re-exports
// ============================================================================

pub use commands::{BRIDGE_VERSION, CommandProcessor};
pub use envelope::{
    BridgeResponse, CommandMessage, InboundMessage, VideoEvent, VideoPayload, parse_envelope,
};
pub use handler::{BridgeHandler, PageSink};
pub use origin::{is_allowed_origin, is_allowed_page};
