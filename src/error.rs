//! Error types for the browser core.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use iveview::{Result, Error};
//!
//! async fn example(link: &DeviceLink) -> Result<()> {
//!     link.connect("abc123").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Session | [`Error::SessionNotFound`] |
//! | Device | [`Error::DeviceUnavailable`], [`Error::Device`], [`Error::ScriptLoad`] |
//! | Storage | [`Error::Storage`] |
//! | External | [`Error::Io`], [`Error::Json`] |
//!
//! Note the deliberate asymmetry with the bridge: errors crossing into page
//! content are *data* (the `error` field of a response envelope), never
//! values of this type. [`Error`] covers host-side failures only.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::SessionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when shell or store configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Session not found.
    ///
    /// Returned when a session ID does not reference a live session.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The missing session ID.
        session_id: SessionId,
    },

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// No device is connected.
    ///
    /// Returned by operations that require a live device link.
    #[error("No device connected")]
    DeviceUnavailable,

    /// Device transport failure.
    ///
    /// Returned when the external device rejects or fails a command.
    #[error("Device error: {message}")]
    Device {
        /// Description of the device failure.
        message: String,
    },

    /// Playback script could not be loaded.
    ///
    /// Returned when fetching or preparing a script resource fails.
    #[error("Script load failed: {message}")]
    ScriptLoad {
        /// Description of the load failure.
        message: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Persisted blob read/write failure.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a device error.
    #[inline]
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device {
            message: message.into(),
        }
    }

    /// Creates a script load error.
    #[inline]
    pub fn script_load(message: impl Into<String>) -> Self {
        Self::ScriptLoad {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a device-side error.
    ///
    /// Device errors are best-effort by policy: callers on the playback path
    /// log and discard them rather than propagating.
    #[inline]
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable | Self::Device { .. } | Self::ScriptLoad { .. }
        )
    }

    /// Returns `true` if this is a storage error.
    #[inline]
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_) | Self::Json(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
