//! Session set, focus tracking and render budget.
//!
//! The manager owns the ordered list of sessions, the focused session, and
//! a most-recently-focused ordering that drives the render budget: only the
//! top-N recently focused sessions (plus the focused one, always) keep a
//! live rendering surface.
//!
//! # Close semantics
//!
//! Closing the sole remaining session does not remove it; its navigation
//! state is cleared in place and the ID is kept. Closing a focused session
//! when others exist moves focus to `min(removed_index, remaining - 1)`,
//! i.e. the session that slid into the closed one's position, falling back
//! to the new last entry. Both behaviors are load-bearing for the UI and
//! covered by tests.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::identifiers::SessionId;

// ============================================================================
// Constants
// ============================================================================

/// Default number of sessions kept materialized at once.
pub const DEFAULT_RENDER_BUDGET: usize = 3;

// ============================================================================
// Session
// ============================================================================

/// One navigable browsing session ("tab").
///
/// Holds the navigation state projected from the rendering surface. The
/// `reload_token` is a monotonic counter observed by the surface to force a
/// reload without re-navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current URL (empty until first navigation).
    pub url: String,
    /// Current page title.
    pub title: String,
    /// Whether history back-navigation is possible.
    pub can_go_back: bool,
    /// Whether history forward-navigation is possible.
    pub can_go_forward: bool,
    /// Monotonic reload counter; bumping it triggers a surface reload.
    pub reload_token: u64,
}

impl Session {
    /// Creates a fresh session, optionally seeded with a URL.
    fn new(url: Option<&str>) -> Self {
        Self {
            id: SessionId::next(),
            url: url.unwrap_or_default().to_string(),
            title: String::new(),
            can_go_back: false,
            can_go_forward: false,
            reload_token: 0,
        }
    }

    /// Resets navigation state in place, keeping the ID and reload token.
    fn clear(&mut self) {
        self.url.clear();
        self.title.clear();
        self.can_go_back = false;
        self.can_go_forward = false;
    }
}

// ============================================================================
// SessionUpdate
// ============================================================================

/// Partial navigation-derived update merged into a session.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    /// New URL, if navigation changed it.
    pub url: Option<String>,
    /// New page title.
    pub title: Option<String>,
    /// New back-capability flag.
    pub can_go_back: Option<bool>,
    /// New forward-capability flag.
    pub can_go_forward: Option<bool>,
}

impl SessionUpdate {
    /// Builds an update from a full navigation state change.
    #[must_use]
    pub fn navigation(
        url: impl Into<String>,
        title: impl Into<String>,
        can_go_back: bool,
        can_go_forward: bool,
    ) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
            can_go_back: Some(can_go_back),
            can_go_forward: Some(can_go_forward),
        }
    }
}

// ============================================================================
// SessionManager
// ============================================================================

/// Ordered session set with focus and render-budget tracking.
///
/// Not internally synchronized; the shell wraps it in a lock. All mutations
/// are single-step replacements of small records.
#[derive(Debug)]
pub struct SessionManager {
    /// Sessions in creation/UI order.
    sessions: Vec<Session>,
    /// Currently focused session. Always references a live entry.
    focused: SessionId,
    /// Session IDs by recency of focus, most recent first.
    focus_order: Vec<SessionId>,
    /// Maximum materialized sessions (soft for the focused entry).
    budget: usize,
}

// ============================================================================
// SessionManager - Constructor
// ============================================================================

impl SessionManager {
    /// Creates a manager with one initial session and the default budget.
    ///
    /// # Arguments
    ///
    /// * `home_url` - Seed URL for the initial session (may be empty)
    #[must_use]
    pub fn new(home_url: &str) -> Self {
        Self::with_budget(home_url, DEFAULT_RENDER_BUDGET)
    }

    /// Creates a manager with an explicit render budget.
    ///
    /// A budget of 0 is clamped to 1.
    #[must_use]
    pub fn with_budget(home_url: &str, budget: usize) -> Self {
        let seed = (!home_url.is_empty()).then_some(home_url);
        let initial = Session::new(seed);
        let focused = initial.id;
        debug!(session_id = %focused, "Initial session created");

        Self {
            sessions: vec![initial],
            focused,
            focus_order: vec![focused],
            budget: budget.max(1),
        }
    }
}

// ============================================================================
// SessionManager - Accessors
// ============================================================================

impl SessionManager {
    /// Returns the sessions in UI order.
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Returns the focused session's ID.
    #[inline]
    #[must_use]
    pub fn focused_id(&self) -> SessionId {
        self.focused
    }

    /// Returns the focused session.
    ///
    /// # Panics
    ///
    /// Never panics: the focused ID always references a live entry.
    #[must_use]
    pub fn focused(&self) -> &Session {
        self.get(self.focused)
            .unwrap_or_else(|| unreachable!("focused id references a live session"))
    }

    /// Returns the session with the given ID, if it exists.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Returns `true` if the given session is focused.
    #[inline]
    #[must_use]
    pub fn is_focused(&self, id: SessionId) -> bool {
        self.focused == id
    }

    /// Returns the number of sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Always `false`: the set is never empty by invariant.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the render budget.
    #[inline]
    #[must_use]
    pub fn budget(&self) -> usize {
        self.budget
    }
}

// ============================================================================
// SessionManager - Lifecycle
// ============================================================================

impl SessionManager {
    /// Creates a new session, focuses it, and returns its ID.
    ///
    /// # Arguments
    ///
    /// * `seed_url` - Optional URL the session starts at
    pub fn create(&mut self, seed_url: Option<&str>) -> SessionId {
        let session = Session::new(seed_url);
        let id = session.id;
        self.sessions.push(session);
        self.set_focus(id);
        debug!(session_id = %id, url = seed_url.unwrap_or(""), "Session created");
        id
    }

    /// Closes a session.
    ///
    /// If it is the sole remaining session, its navigation state is cleared
    /// in place instead (the set is never empty). If the removed session was
    /// focused, focus moves to `min(removed_index, remaining - 1)`.
    ///
    /// Unknown IDs are ignored.
    pub fn close(&mut self, id: SessionId) {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            return;
        };

        if self.sessions.len() == 1 {
            self.sessions[index].clear();
            debug!(session_id = %id, "Last session cleared in place");
            return;
        }

        self.sessions.remove(index);
        self.focus_order.retain(|s| *s != id);

        if self.focused == id {
            let next_index = index.min(self.sessions.len() - 1);
            let next = self.sessions[next_index].id;
            self.set_focus(next);
            debug!(closed = %id, refocused = %next, "Closed focused session");
        } else {
            debug!(session_id = %id, "Session closed");
        }
    }

    /// Focuses a session.
    ///
    /// Silent no-op on unknown IDs; callers are responsible for only
    /// passing known ones.
    pub fn focus(&mut self, id: SessionId) {
        if self.get(id).is_none() {
            return;
        }
        self.set_focus(id);
    }

    /// Merges navigation-derived fields into a session.
    ///
    /// Silent no-op on unknown IDs.
    pub fn update(&mut self, id: SessionId, update: SessionUpdate) {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return;
        };

        if let Some(url) = update.url {
            session.url = url;
        }
        if let Some(title) = update.title {
            session.title = title;
        }
        if let Some(back) = update.can_go_back {
            session.can_go_back = back;
        }
        if let Some(forward) = update.can_go_forward {
            session.can_go_forward = forward;
        }
    }

    /// Bumps the focused session's reload token and returns the new value.
    ///
    /// The rendering surface observes the change and reloads without adding
    /// a history entry.
    pub fn reload_focused(&mut self) -> u64 {
        let focused = self.focused;
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == focused)
            .unwrap_or_else(|| unreachable!("focused id references a live session"));
        session.reload_token += 1;
        debug!(session_id = %focused, token = session.reload_token, "Reload requested");
        session.reload_token
    }

    /// Promotes a session to most-recently-focused and marks it focused.
    fn set_focus(&mut self, id: SessionId) {
        self.focused = id;
        self.focus_order.retain(|s| *s != id);
        self.focus_order.insert(0, id);
    }
}

// ============================================================================
// SessionManager - Render Budget
// ============================================================================

impl SessionManager {
    /// Returns the set of sessions that should be materialized.
    ///
    /// Top-N of the most-recently-focused ordering, unioned with the
    /// focused session regardless of its rank. Sessions outside this set
    /// must have their surfaces and instrumentation torn down.
    #[must_use]
    pub fn materialized(&self) -> Vec<SessionId> {
        let mut set: Vec<SessionId> = self
            .focus_order
            .iter()
            .take(self.budget)
            .copied()
            .collect();

        if !set.contains(&self.focused) {
            set.push(self.focused);
        }

        set
    }

    /// Returns `true` if the session should currently be materialized.
    #[must_use]
    pub fn is_materialized(&self, id: SessionId) -> bool {
        self.materialized().contains(&id)
    }
}

// ============================================================================
// Tests
// ============================================================================
