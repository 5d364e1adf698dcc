//! Persisted host state: settings, favorites and device configuration.
//!
//! Each store is one JSON blob on disk, loaded once at startup and written
//! back whole after every mutation. Persistence is deliberately forgiving:
//! a missing, unreadable or corrupt blob loads as defaults, and a failed
//! save is logged and swallowed so disk trouble never breaks browsing.

// ============================================================================
// Submodules
// ============================================================================

/// Favorite site list.
pub mod favorites;

/// Browser and device settings.
pub mod settings;

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use favorites::{Favorite, Favorites};
pub use settings::{DeviceSettings, SearchEngine, Settings, build_search_url};

// ============================================================================
// Blob persistence
// ============================================================================

/// Loads a JSON blob.
///
/// # Errors
///
/// [`Error::Io`] when the file cannot be read, [`Error::Storage`] when it
/// does not parse as the expected shape.
pub async fn try_load_blob<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let raw = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&raw)
        .map_err(|error| Error::storage(format!("{}: {error}", path.display())))
}

/// Writes a JSON blob.
///
/// # Errors
///
/// [`Error::Json`] when the value fails to serialize, [`Error::Io`] when
/// the file cannot be written.
pub async fn try_save_blob<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let raw = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}

/// Loads a JSON blob, falling back to defaults on any failure.
pub async fn load_blob<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match try_load_blob(path).await {
        Ok(value) => value,
        Err(error @ Error::Io(_)) => {
            debug!(path = %path.display(), %error, "Store blob unreadable, using defaults");
            T::default()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "Corrupt store blob, using defaults");
            T::default()
        }
    }
}

/// Writes a JSON blob; failures are logged, never propagated.
pub async fn save_blob<T>(path: &Path, value: &T)
where
    T: Serialize,
{
    if let Err(error) = try_save_blob(path, value).await {
        warn!(path = %path.display(), %error, "Store blob failed to save");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_blob_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings: Settings = load_blob(&dir.path().join("settings.json")).await;
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ nope").await.expect("write");

        let settings: Settings = load_blob(&path).await;
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_try_load_reports_failure_kind() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Missing file surfaces as I/O.
        let missing = try_load_blob::<Settings>(&dir.path().join("none.json")).await;
        assert!(matches!(missing, Err(Error::Io(_))));

        // Corrupt content surfaces as a storage error naming the path.
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ nope").await.expect("write");
        let corrupt = try_load_blob::<Settings>(&path).await;
        match corrupt {
            Err(error @ Error::Storage { .. }) => {
                assert!(error.is_storage_error());
                assert!(error.to_string().contains("settings.json"));
            }
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("favorites.json");

        let mut favorites = Favorites::default();
        favorites.add("https://video.example/", "Video Example");
        save_blob(&path, &favorites).await;

        let loaded: Favorites = load_blob(&path).await;
        assert!(loaded.contains("https://video.example/"));
    }

    #[tokio::test]
    async fn test_save_to_bad_path_is_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing-dir").join("settings.json");
        // Must not panic or error.
        save_blob(&path, &Settings::default()).await;
    }
}
