//! Type-safe identifiers for browser sessions and bridge messages.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time:
//!
//! - [`SessionId`] - One navigable browsing session ("tab")
//! - [`CorrelationId`] - Request/response correlation for bridge commands
//!
//! Session IDs are minted from a process-wide atomic counter and are never
//! reused. Correlation IDs are chosen by page script; their uniqueness is
//! scoped to a single page load and they are never persisted across
//! navigations.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// SessionId
// ============================================================================

/// Counter backing [`SessionId::next`]. Starts at 1; 0 is never issued.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a browsing session ("tab").
///
/// Opaque to callers; ordering of the underlying integer carries no meaning
/// beyond creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Mints the next unique session ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ============================================================================
// CorrelationId
// ============================================================================

/// Correlation identifier for bridge command messages.
///
/// Supplied by page script in the request envelope and echoed verbatim in
/// the response. The host never generates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(i64);

impl CorrelationId {
    /// Wraps a page-supplied correlation id.
    #[inline]
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
