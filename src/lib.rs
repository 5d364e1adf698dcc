//! iveview - Embedded browser core for device-synced video playback.
//!
//! This library is the platform-independent core of a mobile in-app
//! browser that pairs web video with an external Handy device. The
//! embedding platform supplies the rendering surfaces (web views); this
//! crate supplies everything behind them.
//!
//! # Architecture
//!
//! The core is event-driven around a single string channel per page:
//!
//! - **Injected scripts** instrument each page (video detection, bridge
//!   relay, ad filtering) and post JSON envelopes to the host
//! - **The shell** owns all state: sessions, focus, playback projection,
//!   the device link and its resync schedule
//! - **The bridge** routes envelopes: telemetry folds into playback state,
//!   commands are answered exactly once with an extension-shaped response
//!
//! Key design principles:
//!
//! - Playback state is scoped to the focused session; background telemetry
//!   is dropped at dispatch
//! - Only the top-N recently focused sessions keep a live surface (render
//!   budget); evicted handles are returned for explicit teardown
//! - Device calls are fire-and-forget: a missing or failing device never
//!   breaks browsing
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use iveview::{DeviceLink, HandyTransport, PageSink, SessionId, Shell};
//!
//! # fn transport() -> Arc<dyn HandyTransport> { unimplemented!() }
//! # struct Sink;
//! # impl PageSink for Sink {
//! #     fn inject(&self, _session_id: SessionId, _script: String) {}
//! # }
//! #[tokio::main]
//! async fn main() {
//!     let device = Arc::new(DeviceLink::new(transport()));
//!     let shell: Shell<()> = Shell::new("https://iveplay.io", device, Arc::new(Sink));
//!
//!     // Platform callbacks drive the shell:
//!     let focused = shell.focused_id();
//!     shell.on_page_message(focused, "https://iveplay.io/", r#"{"from": "..."}"#);
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Page/host message bridge: envelopes, origin policy, commands |
//! | [`device`] | Device link, transport trait and resync scheduling |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`inject`] | Injected instrumentation scripts and ad filtering |
//! | [`playback`] | Playback state machine for the focused session |
//! | [`session`] | Session set, focus, render budget and surface ownership |
//! | [`shell`] | The facade tying everything together |
//! | [`store`] | Persisted settings and favorites |

// ============================================================================
// Modules
// ============================================================================

/// Page/host message bridge.
///
/// Envelope shapes, the origin allow-list, the command table and the
/// dispatcher that routes raw page messages.
pub mod bridge;

/// Device link and resync scheduling.
///
/// The physical transport is abstracted behind [`HandyTransport`].
pub mod device;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for sessions and bridge messages.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Injected instrumentation scripts.
///
/// Video detection, bridge relay, background media control and ad
/// filtering, all as self-contained ES5 sources.
pub mod inject;

/// Playback state machine.
///
/// Projects video telemetry from the focused session into one snapshot.
pub mod playback;

/// Session lifecycle and surface ownership.
pub mod session;

/// The browser shell facade.
pub mod shell;

/// Persisted host state: settings, favorites, device configuration.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    BRIDGE_VERSION, BridgeHandler, BridgeResponse, CommandProcessor, PageSink, VideoEvent,
    VideoPayload,
};

// Device types
pub use device::{DeviceInfo, DeviceLink, HandyTransport, LinkState, ScriptSource, SyncController};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CorrelationId, SessionId};

// Playback types
pub use playback::PlaybackState;

// Session types
pub use session::{DEFAULT_RENDER_BUDGET, Session, SessionManager, SessionUpdate, SurfaceRegistry};

// Shell
pub use shell::Shell;

// Store types
pub use store::{DeviceSettings, Favorites, SearchEngine, Settings, build_search_url};
