//! External device link and playback synchronization.
//!
//! This module contains the device side of the core:
//!
//! - [`HandyTransport`] - Opaque capability trait for the physical device
//! - [`DeviceLink`] - Process-wide connection state, surviving navigation
//! - [`SyncController`] - Two-tier drift correction for device playback
//!
//! # Error policy
//!
//! Device connectivity is best-effort. Connect failures surface as
//! human-readable state for the settings UI; everything on the playback
//! path goes through [`best_effort`], which logs and discards failures so
//! device absence can never corrupt or block page playback.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use tracing::debug;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Device connection state and transport seam.
pub mod link;

/// Scheduled playback resynchronization.
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

pub use link::{DeviceInfo, DeviceLink, HandyTransport, LinkState, ScriptSource};
pub use sync::SyncController;

// ============================================================================
// Best-Effort Calls
// ============================================================================

/// Runs a device call, logging and discarding any failure.
///
/// The fire-and-forget contract of the playback path, made explicit:
/// nothing awaited through here ever propagates an error.
pub async fn best_effort<F>(operation: &'static str, call: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = call.await {
        debug!(operation, error = %e, "Best-effort device call failed");
    }
}

// ============================================================================
// Tests
// ============================================================================
