//! The browser shell: one facade over sessions, playback and the device.
//!
//! The shell owns every piece of long-lived state and is the only writer
//! to all of it:
//!
//! - the session set and focus ([`SessionManager`] behind a lock),
//! - live surface handles ([`SurfaceRegistry`]),
//! - the focused session's playback projection ([`PlaybackState`]),
//! - the device link and its resync schedule ([`SyncController`]).
//!
//! The embedding platform drives it with surface callbacks (navigation,
//! load start, page messages, window-open requests) and UI actions
//! (create/close/focus/reload). Every mutation that can change the
//! materialized set ends with a reconciliation pass that evicts surfaces
//! outside the render budget and hands their handles back for teardown.
//!
//! Playback state is scoped to the focused session by construction:
//! telemetry from any other session is dropped at dispatch, and focus
//! switches and page loads reset the projection before new telemetry can
//! arrive.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::bridge::{BridgeHandler, CommandProcessor, PageSink, VideoEvent};
use crate::device::{DeviceLink, SyncController};
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::inject::{PAUSE_ALL_MEDIA_JS, RESUME_AUDIO_CONTEXTS_JS};
use crate::playback::PlaybackState;
use crate::session::{DEFAULT_RENDER_BUDGET, Session, SessionManager, SessionUpdate, SurfaceRegistry};

// ============================================================================
// Shell
// ============================================================================

/// Process-wide browser core, generic over the platform surface handle.
pub struct Shell<S> {
    /// Session set, focus and render budget.
    sessions: RwLock<SessionManager>,
    /// Live surface handles by session.
    surfaces: Mutex<SurfaceRegistry<S>>,
    /// Playback projection for the focused session.
    playback: Mutex<PlaybackState>,
    /// Device connection, shared with the command processor.
    device: Arc<DeviceLink>,
    /// Device resync schedule.
    sync: SyncController,
    /// Page message dispatch.
    bridge: BridgeHandler,
    /// Script injection into pages.
    sink: Arc<dyn PageSink>,
}

impl<S> std::fmt::Debug for Shell<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("sessions", &self.sessions.read().len())
            .field("playback", &*self.playback.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Shell - Construction & Accessors
// ============================================================================

impl<S> Shell<S> {
    /// Creates a shell with one initial session and the default budget.
    #[must_use]
    pub fn new(home_url: &str, device: Arc<DeviceLink>, sink: Arc<dyn PageSink>) -> Self {
        Self::with_budget(home_url, DEFAULT_RENDER_BUDGET, device, sink)
    }

    /// Creates a shell with an explicit render budget.
    #[must_use]
    pub fn with_budget(
        home_url: &str,
        budget: usize,
        device: Arc<DeviceLink>,
        sink: Arc<dyn PageSink>,
    ) -> Self {
        let processor = Arc::new(CommandProcessor::new(Arc::clone(&device)));
        let bridge = BridgeHandler::new(processor, Arc::clone(&sink));
        let sync = SyncController::new(Arc::clone(&device));

        Self {
            sessions: RwLock::new(SessionManager::with_budget(home_url, budget)),
            surfaces: Mutex::new(SurfaceRegistry::new()),
            playback: Mutex::new(PlaybackState::new()),
            device,
            sync,
            bridge,
            sink,
        }
    }

    /// Snapshot of all sessions in UI order.
    #[must_use]
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.read().sessions().to_vec()
    }

    /// The focused session's ID.
    #[inline]
    #[must_use]
    pub fn focused_id(&self) -> SessionId {
        self.sessions.read().focused_id()
    }

    /// Looks up a session by ID.
    ///
    /// # Errors
    ///
    /// [`Error::SessionNotFound`] when the ID does not reference a live
    /// session (closed, or never created here).
    pub fn session(&self, id: SessionId) -> Result<Session> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::session_not_found(id))
    }

    /// Snapshot of the focused session's playback projection.
    #[inline]
    #[must_use]
    pub fn playback(&self) -> PlaybackState {
        *self.playback.lock()
    }

    /// The shared device link.
    #[inline]
    #[must_use]
    pub fn device(&self) -> &Arc<DeviceLink> {
        &self.device
    }

    /// The sync controller, for settings-driven manual control.
    #[inline]
    #[must_use]
    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    /// The session IDs that should currently hold a surface.
    #[must_use]
    pub fn materialized(&self) -> Vec<SessionId> {
        self.sessions.read().materialized()
    }
}

// ============================================================================
// Shell - Session Lifecycle
// ============================================================================

impl<S> Shell<S> {
    /// Creates and focuses a new session; returns the evicted surfaces.
    pub fn create_session(&self, seed_url: Option<&str>) -> (SessionId, Vec<(SessionId, S)>) {
        let previous = self.focused_id();
        let id = self.sessions.write().create(seed_url);
        info!(session_id = %id, "Session opened");

        let evicted = self.after_focus_change(previous);
        (id, evicted)
    }

    /// Closes a session; returns the evicted surfaces.
    ///
    /// Closing the sole session clears it in place, keeping its surface.
    pub fn close_session(&self, id: SessionId) -> Vec<(SessionId, S)> {
        let previous = self.focused_id();
        self.sessions.write().close(id);
        info!(session_id = %id, "Session closed");

        let mut evicted = self.after_focus_change(previous);

        // The closed session's surface goes too, unless the close was the
        // sole-session clear (the entry then still exists).
        if self.sessions.read().get(id).is_none() {
            if let Some(surface) = self.surfaces.lock().remove(id) {
                evicted.push((id, surface));
            }
        }

        evicted
    }

    /// Focuses a session; returns the evicted surfaces.
    pub fn focus_session(&self, id: SessionId) -> Vec<(SessionId, S)> {
        let previous = self.focused_id();
        self.sessions.write().focus(id);
        self.after_focus_change(previous)
    }

    /// Requests a reload of the focused session; returns the new token.
    pub fn reload_focused(&self) -> u64 {
        self.sessions.write().reload_focused()
    }

    /// Registers a surface handle for a materialized session.
    ///
    /// Returns the displaced handle if the session already held one.
    pub fn attach_surface(&self, id: SessionId, surface: S) -> Option<S> {
        self.surfaces.lock().insert(id, surface)
    }

    /// Whether a session currently holds a live surface.
    #[must_use]
    pub fn has_surface(&self, id: SessionId) -> bool {
        self.surfaces.lock().contains(id)
    }

    /// Reconciles state after a possible focus change.
    ///
    /// Resets playback and the resync schedule when focus actually moved,
    /// silences the page losing focus, wakes the one gaining it, and
    /// evicts surfaces that fell out of the render budget.
    fn after_focus_change(&self, previous: SessionId) -> Vec<(SessionId, S)> {
        let (focused, materialized) = {
            let sessions = self.sessions.read();
            (sessions.focused_id(), sessions.materialized())
        };

        if focused != previous {
            debug!(from = %previous, to = %focused, "Focus changed");
            self.playback.lock().reset();
            self.sync.cancel();

            self.sink.inject(previous, PAUSE_ALL_MEDIA_JS.to_string());
            self.sink.inject(focused, RESUME_AUDIO_CONTEXTS_JS.to_string());
        }

        self.surfaces.lock().retain_materialized(&materialized)
    }
}

// ============================================================================
// Shell - Surface Callbacks
// ============================================================================

impl<S> Shell<S> {
    /// Handles a navigation state change reported by a surface.
    pub fn on_navigation(&self, id: SessionId, update: SessionUpdate) {
        self.sessions.write().update(id, update);
    }

    /// Handles the start of a page load.
    ///
    /// A load in the focused session invalidates the playback projection
    /// and the device schedule before any telemetry from the new page.
    pub fn on_load_start(&self, id: SessionId) {
        if !self.sessions.read().is_focused(id) {
            return;
        }
        debug!(session_id = %id, "Focused page load, playback reset");
        self.playback.lock().reset();
        self.sync.on_stopped();
    }

    /// Handles a page's request to open a new window.
    ///
    /// Popups become ordinary focused sessions; there are no child windows.
    pub fn on_open_window(&self, url: &str) -> (SessionId, Vec<(SessionId, S)>) {
        debug!(url, "Window open request");
        self.create_session(Some(url))
    }

    /// Handles one raw message from a session's page channel.
    ///
    /// Commands are dispatched asynchronously by the bridge; telemetry from
    /// the focused session is folded into playback state here, driving the
    /// device schedule on the play/stop/rate edges.
    pub fn on_page_message(&self, id: SessionId, page_url: &str, raw: &str) {
        let focused = self.sessions.read().is_focused(id);

        let Some((event, payload)) = self.bridge.handle_raw(id, focused, page_url, raw) else {
            return;
        };

        let (was_playing, was_rate, now) = {
            let mut playback = self.playback.lock();
            let was_playing = playback.playing;
            let was_rate = playback.rate;
            playback.apply(event, &payload);
            (was_playing, was_rate, *playback)
        };

        self.sync.note_position(now.position_ms);

        match (was_playing, now.playing) {
            (false, true) => self.sync.on_playing(now.position_ms, now.rate),
            (true, false) => self.sync.on_stopped(),
            (true, true) if event == VideoEvent::RateChange && now.rate != was_rate => {
                self.sync.on_rate_changed(now.rate);
            }
            _ => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
