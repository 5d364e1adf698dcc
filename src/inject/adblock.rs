//! Declarative ad filter list and the injected scripts built from it.
//!
//! The rule set is plain data: CSS selectors for element hiding and bare
//! domains for script/iframe/popup blocking (domains match with an
//! `endsWith` check, so `doubleclick.net` also catches
//! `ad.doubleclick.net`). Edit the arrays to add or remove filters; the
//! heuristics themselves live in the generated JS and are not this core's
//! concern.
//!
//! Blocking runs in two phases:
//!
//! - [`early_script`] - injected before content loads: hiding stylesheet
//!   plus a `window.open` override against popunders
//! - [`dom_cleanup_script`] - injected after load: MutationObserver that
//!   strips ad scripts, iframes and tracking pixels as they appear

// ============================================================================
// Filter Data
// ============================================================================

/// CSS selectors hidden by the early stylesheet.
pub const CSS_SELECTORS: &[&str] = &[
    // Google Ads
    "ins.adsbygoogle",
    "[id^=\"google_ads\"]",
    "[id^=\"div-gpt-ad\"]",
    "iframe[src*=\"googlesyndication.com\"]",
    "iframe[src*=\"doubleclick.net\"]",
    "iframe[src*=\"googleadservices.com\"]",
    // Generic ad containers
    "[id*=\"ad-container\"]",
    "[id*=\"ad_container\"]",
    "[id*=\"ad-banner\"]",
    "[id*=\"ad_banner\"]",
    "[id*=\"ad-slot\"]",
    "[id*=\"ad-overlay\"]",
    "[id*=\"ad-popup\"]",
    "[class*=\"ad-container\"]",
    "[class*=\"ad_container\"]",
    "[class*=\"ad-banner\"]",
    "[class*=\"ad-slot\"]",
    "[class*=\"ad-overlay\"]",
    "[class*=\"ad-popup\"]",
    ".ad-placement",
    ".ad-interstitial",
    // Data attribute ads
    "[data-ad]",
    "[data-ad-slot]",
    "[data-ad-client]",
    "[data-adzone]",
    // Common ad network elements
    ".ads-banner",
    ".ads-container",
    ".adsbox",
    ".adbanner",
    ".advert",
    ".advertisement",
    ".advertising",
    // Popup/overlay containers
    ".popup-overlay",
    ".popunder",
    ".interstitial-ad",
    ".modal-ad",
    // Sticky ad bars
    ".sticky-ad",
    ".floating-ad",
    ".bottom-ad",
    ".top-ad",
    // Streaming/video site ads
    ".video-ad",
    ".video-ads",
    ".player-ad",
    ".pre-roll-ad",
    // Consent banners
    ".cookie-banner",
    ".consent-overlay",
    "#cookie-banner",
];

/// Ad and tracking domains blocked in both phases.
pub const AD_DOMAINS: &[&str] = &[
    "googlesyndication.com",
    "doubleclick.net",
    "googleadservices.com",
    "adservice.google.com",
    "amazon-adsystem.com",
    "ads-twitter.com",
    "ads.yahoo.com",
    "advertising.com",
    "popads.net",
    "popcash.net",
    "propellerads.com",
    "juicyads.com",
    "exoclick.com",
    "trafficjunky.com",
    "trafficstars.com",
    "adskeeper.com",
    "adsterra.com",
    "clickadu.com",
    "hilltopads.com",
];

// ============================================================================
// Script Builders
// ============================================================================

/// Builds the combined hiding rule for every selector.
#[must_use]
pub fn hide_stylesheet() -> String {
    format!(
        "{} {{ display: none !important; visibility: hidden !important; \
         height: 0 !important; overflow: hidden !important; \
         pointer-events: none !important; }}",
        CSS_SELECTORS.join(",\n")
    )
}

/// JSON array literal of the ad domains, for embedding in scripts.
fn domains_json() -> String {
    serde_json::to_string(AD_DOMAINS).unwrap_or_else(|_| "[]".to_string())
}

/// Early-phase blocker: hiding stylesheet + `window.open` override.
///
/// Runs before content loads so ad elements never render. The open
/// override allows opens the user plausibly intended (a recent click on a
/// link to the same host) and blocks script-initiated popups and anything
/// to an ad domain.
#[must_use]
pub fn early_script() -> String {
    format!(
        r#"(function() {{
  if (window.__ive_adblock_early) return;
  window.__ive_adblock_early = true;

  var style = document.createElement('style');
  style.id = '__ive-adblock-css';
  style.textContent = {stylesheet};
  (document.head || document.documentElement).appendChild(style);

  var AD_DOMAINS = {domains};
  function isAdHost(hostname) {{
    for (var i = 0; i < AD_DOMAINS.length; i++) {{
      if (hostname === AD_DOMAINS[i] || hostname.endsWith('.' + AD_DOMAINS[i])) return true;
    }}
    return false;
  }}

  var lastClickTime = 0;
  var lastClickedEl = null;
  document.addEventListener('click', function(e) {{
    lastClickedEl = e.target;
    lastClickTime = Date.now();
  }}, true);

  function isIntentionalOpen(url) {{
    if (Date.now() - lastClickTime > 1000) return false;
    var el = lastClickedEl;
    while (el && el !== document.body) {{
      if (el.tagName === 'A') {{
        var href = el.getAttribute('href') || '';
        if (href && url) {{
          try {{
            var linkHost = new URL(href, window.location.href).hostname;
            var openHost = new URL(url, window.location.href).hostname;
            if (linkHost === openHost) return true;
          }} catch (e) {{}}
        }}
        return false;
      }}
      el = el.parentElement;
    }}
    return false;
  }}

  var realOpen = window.open;
  window.open = function(url) {{
    try {{
      if (url) {{
        var host = new URL(url, window.location.href).hostname;
        if (isAdHost(host)) return null;
      }}
      if (!isIntentionalOpen(url)) return null;
    }} catch (e) {{
      return null;
    }}
    return realOpen.apply(window, arguments);
  }};
}})();"#,
        stylesheet = serde_json::to_string(&hide_stylesheet()).unwrap_or_default(),
        domains = domains_json(),
    )
}

/// Post-load blocker: strips ad scripts, iframes and tracking pixels as
/// the DOM mutates.
#[must_use]
pub fn dom_cleanup_script() -> String {
    format!(
        r#"(function() {{
  if (window.__ive_adblock) return;
  window.__ive_adblock = true;

  var AD_DOMAINS = {domains};
  function isAdDomain(url) {{
    if (!url) return false;
    try {{
      var hostname = new URL(url, window.location.href).hostname;
      for (var i = 0; i < AD_DOMAINS.length; i++) {{
        if (hostname === AD_DOMAINS[i] || hostname.endsWith('.' + AD_DOMAINS[i])) return true;
      }}
    }} catch (e) {{}}
    return false;
  }}

  function cleanNode(node) {{
    if (node.nodeType !== 1) return;
    var tag = node.tagName;
    if (tag === 'SCRIPT' && isAdDomain(node.getAttribute('src') || '')) {{
      node.type = 'javascript/blocked';
      node.remove();
      return;
    }}
    if (tag === 'IFRAME') {{
      var src = node.getAttribute('src') || '';
      if (isAdDomain(src)) {{ node.remove(); return; }}
      var w = node.offsetWidth || parseInt(node.getAttribute('width') || '0', 10);
      var h = node.offsetHeight || parseInt(node.getAttribute('height') || '0', 10);
      if (w <= 1 && h <= 1) {{ node.remove(); return; }}
    }}
  }}

  var observer = new MutationObserver(function(mutations) {{
    for (var i = 0; i < mutations.length; i++) {{
      var added = mutations[i].addedNodes;
      for (var j = 0; j < added.length; j++) cleanNode(added[j]);
    }}
  }});
  observer.observe(document.documentElement, {{ childList: true, subtree: true }});

  var existing = document.querySelectorAll('script[src], iframe');
  for (var i = 0; i < existing.length; i++) cleanNode(existing[i]);
}})();"#,
        domains = domains_json(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_lists_nonempty() {
        assert!(!CSS_SELECTORS.is_empty());
        assert!(!AD_DOMAINS.is_empty());
    }

    #[test]
    fn test_domains_are_bare() {
        for domain in AD_DOMAINS {
            assert!(!domain.contains('/'), "{domain}");
            assert!(!domain.starts_with("http"), "{domain}");
        }
    }

    #[test]
    fn test_hide_stylesheet_joins_all_selectors() {
        let sheet = hide_stylesheet();
        assert!(sheet.contains("ins.adsbygoogle"));
        assert!(sheet.contains(".video-ad"));
        assert!(sheet.contains("display: none !important"));
    }

    #[test]
    fn test_early_script_embeds_data() {
        let script = early_script();
        assert!(script.contains("__ive_adblock_early"));
        assert!(script.contains("doubleclick.net"));
        assert!(script.contains("window.open"));
    }

    #[test]
    fn test_dom_cleanup_script_guard() {
        let script = dom_cleanup_script();
        assert!(script.contains("__ive_adblock"));
        assert!(script.contains("MutationObserver"));
    }
}
