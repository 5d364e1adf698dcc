//! Ownership table for live rendering surface handles.
//!
//! Surfaces (platform web views and their instrumentation hooks) are owned
//! explicitly, keyed by session ID. Entries are inserted when a session is
//! materialized and removed when it is closed or evicted; nothing is pruned
//! implicitly. Evicted handles are handed back to the caller so teardown
//! (dropping the view, cancelling resync timers) happens at the call site.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifiers::SessionId;

// ============================================================================
// SurfaceRegistry
// ============================================================================

/// Explicit `SessionId -> handle` ownership table.
///
/// Generic over the handle type so the embedding platform decides what a
/// "surface" is; tests use plain markers.
#[derive(Debug)]
pub struct SurfaceRegistry<S> {
    /// Live handles by session.
    handles: FxHashMap<SessionId, S>,
}

impl<S> Default for SurfaceRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SurfaceRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handles: FxHashMap::default(),
        }
    }

    /// Registers a handle for a newly materialized session.
    ///
    /// Returns the previous handle if one was still registered, so the
    /// caller can tear it down (a session must never hold two surfaces).
    pub fn insert(&mut self, id: SessionId, surface: S) -> Option<S> {
        debug!(session_id = %id, "Surface registered");
        self.handles.insert(id, surface)
    }

    /// Removes and returns the handle for a session.
    pub fn remove(&mut self, id: SessionId) -> Option<S> {
        let removed = self.handles.remove(&id);
        if removed.is_some() {
            debug!(session_id = %id, "Surface removed");
        }
        removed
    }

    /// Returns the handle for a session, if materialized.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&S> {
        self.handles.get(&id)
    }

    /// Returns `true` if the session has a live surface.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Returns the number of live surfaces.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no surfaces are live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drops every handle not in the materialized set, returning the
    /// evicted entries for teardown.
    ///
    /// Evicted sessions resume by reloading their stored URL when
    /// refocused; in-page state is never resurrected.
    pub fn retain_materialized(&mut self, materialized: &[SessionId]) -> Vec<(SessionId, S)> {
        let evicted_ids: Vec<SessionId> = self
            .handles
            .keys()
            .filter(|id| !materialized.contains(id))
            .copied()
            .collect();

        let mut evicted = Vec::with_capacity(evicted_ids.len());
        for id in evicted_ids {
            if let Some(surface) = self.handles.remove(&id) {
                debug!(session_id = %id, "Surface evicted");
                evicted.push((id, surface));
            }
        }

        evicted
    }
}

// ============================================================================
// Tests
// ============================================================================
