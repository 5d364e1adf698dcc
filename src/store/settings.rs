//! Browser settings and device configuration.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// SearchEngine
// ============================================================================

/// Search engine used for address-bar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Google,
    DuckDuckGo,
    Brave,
    /// User-supplied template, see [`Settings::custom_search_url`].
    Custom,
}

// ============================================================================
// Settings
// ============================================================================

/// General browser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active search engine.
    pub search_engine: SearchEngine,
    /// Custom search template; `%s` is replaced by the escaped query.
    pub custom_search_url: String,
    /// URL loaded into fresh sessions when set.
    pub homepage: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_engine: SearchEngine::Google,
            custom_search_url: String::new(),
            homepage: None,
        }
    }
}

impl Settings {
    /// Checks the settings for internal consistency.
    ///
    /// [`build_search_url`] degrades gracefully either way; this is for the
    /// settings UI to reject a broken configuration up front.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the custom engine is selected without a
    /// usable `%s` template.
    pub fn validate(&self) -> Result<()> {
        if self.search_engine == SearchEngine::Custom && !self.custom_search_url.contains("%s") {
            return Err(Error::config("custom search template must contain %s"));
        }
        Ok(())
    }
}

// ============================================================================
// DeviceSettings
// ============================================================================

/// Persisted device pairing state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Last-used Handy connection key, empty when never paired.
    pub connection_key: String,
}

impl DeviceSettings {
    /// Returns the connection key if one was ever saved.
    #[inline]
    #[must_use]
    pub fn saved_key(&self) -> Option<&str> {
        if self.connection_key.is_empty() {
            None
        } else {
            Some(&self.connection_key)
        }
    }
}

// ============================================================================
// Search URL
// ============================================================================

/// Builds the search URL for a query under the given settings.
///
/// A custom engine without a usable template (empty or missing `%s`) falls
/// back to the default engine rather than producing a broken URL. Spaces
/// become `+` in the query component.
#[must_use]
pub fn build_search_url(settings: &Settings, query: &str) -> String {
    let escaped = urlencoding::encode(query).replace("%20", "+");

    match settings.search_engine {
        SearchEngine::Google => format!("https://www.google.com/search?q={escaped}"),
        SearchEngine::DuckDuckGo => format!("https://duckduckgo.com/?q={escaped}"),
        SearchEngine::Brave => format!("https://search.brave.com/search?q={escaped}"),
        SearchEngine::Custom => {
            if settings.custom_search_url.contains("%s") {
                settings.custom_search_url.replace("%s", &escaped)
            } else {
                format!("https://www.google.com/search?q={escaped}")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
