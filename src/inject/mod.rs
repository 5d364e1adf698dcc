//! Instrumentation layer: scripts injected into page content.
//!
//! The rendering surface exposes exactly two primitives - "run this script
//! on page load" and "run this script now" - and everything the host knows
//! about a page flows through the JavaScript in this module:
//!
//! - video detection and telemetry ([`scripts::VIDEO_DETECTION_JS`])
//! - bridge relay for ive-play commands ([`scripts::BRIDGE_RELAY_JS`])
//! - ad filtering ([`adblock`])
//! - background-tab media control ([`scripts::PAUSE_ALL_MEDIA_JS`] and
//!   friends)
//!
//! All scripts are self-contained ES5 IIFEs guarded against
//! double-injection. They talk to the host through `window.__iveHost`
//! (installed by the surface) and receive command responses through
//! `window.__ive_bridge_respond` (installed by the relay).

// ============================================================================
// Submodules
// ============================================================================

/// Declarative ad filter list and the scripts compiled from it.
pub mod adblock;

/// Instrumentation script sources and response injection.
pub mod scripts;

// ============================================================================
// Re-exports
// ============================================================================

pub use scripts::{
    BRIDGE_RELAY_JS, PAUSE_ALL_MEDIA_JS, RESUME_AUDIO_CONTEXTS_JS, TRACK_AUDIO_CONTEXTS_JS,
    VIDEO_DETECTION_JS, build_response_script, instrumentation_bundle,
};
