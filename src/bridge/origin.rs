//! Origin allow-list for bridge commands.
//!
//! Command messages cross the page/host boundary and reach host logic, so
//! they are only accepted from a small fixed set of trusted hostnames
//! (plus localhost for development). Telemetry is not gated: it carries no
//! authority and is already scoped to the focused session.
//!
//! Messages from disallowed origins are dropped before ever reaching the
//! command processor.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Trusted hostnames. Subdomains of each entry are allowed too.
const ALLOWED_HOSTS: &[&str] = &["iveplay.io"];

/// Development hosts, allowed verbatim.
const DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

// ============================================================================
// Checks
// ============================================================================

/// Returns `true` if the URL's host is on the allow-list.
#[must_use]
pub fn is_allowed_origin(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    if DEV_HOSTS.contains(&host) {
        return true;
    }

    ALLOWED_HOSTS.iter().any(|allowed| {
        host == *allowed
            || host
                .strip_suffix(allowed)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Returns `true` if the page URL string parses and is allow-listed.
///
/// Unparseable URLs (including the empty URL of a fresh session) are
/// disallowed.
#[must_use]
pub fn is_allowed_page(page_url: &str) -> bool {
    Url::parse(page_url)
        .map(|url| is_allowed_origin(&url))
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
