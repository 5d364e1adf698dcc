//! Browsing session ("tab") lifecycle and materialization.
//!
//! This module contains the session core:
//!
//! - [`Session`] - One navigable browsing context and its projected state
//! - [`SessionManager`] - Ordered session set, focus, and render budget
//! - [`SurfaceRegistry`] - Ownership table of live rendering surfaces
//!
//! # Invariants
//!
//! - The session set is never empty; closing the last session clears it
//!   in place instead of removing it.
//! - Exactly one session is focused, and the focused ID always references
//!   a live entry.
//! - The materialized set is the top-N most-recently-focused sessions
//!   unioned with the focused session (the cap is soft for the focused
//!   entry only).

// ============================================================================
// Submodules
// ============================================================================

/// Session records and the session manager.
pub mod manager;

/// Ownership table for live rendering surface handles.
pub mod surface;

// ============================================================================
// Re-exports
// ============================================================================

pub use manager::{DEFAULT_RENDER_BUDGET, Session, SessionManager, SessionUpdate};
pub use surface::SurfaceRegistry;
