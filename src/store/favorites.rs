//! Favorite site list.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Favorite
// ============================================================================

/// One saved site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    /// Page URL, also the identity key.
    pub url: String,
    /// Display title captured at save time.
    pub title: String,
}

// ============================================================================
// Favorites
// ============================================================================

/// Ordered favorite list, deduplicated by URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    entries: Vec<Favorite>,
}

impl Favorites {
    /// Adds a favorite; re-adding an existing URL updates its title
    /// without changing its position.
    pub fn add(&mut self, url: impl Into<String>, title: impl Into<String>) {
        let url = url.into();
        let title = title.into();

        if let Some(existing) = self.entries.iter_mut().find(|f| f.url == url) {
            existing.title = title;
        } else {
            self.entries.push(Favorite { url, title });
        }
    }

    /// Removes the favorite with this URL. Returns whether one existed.
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|f| f.url != url);
        self.entries.len() != before
    }

    /// Whether this URL is saved.
    #[inline]
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.iter().any(|f| f.url == url)
    }

    /// All favorites, oldest first.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Favorite] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
