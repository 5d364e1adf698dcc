//! Instrumentation script sources and response injection.
//!
//! Plain ES5 for embedded-WebView compatibility. Scripts post to the host
//! through `window.__iveHost.postMessage(json)`, which the rendering
//! surface installs before page scripts run; the host injects command
//! responses back through `window.__ive_bridge_respond`.

// ============================================================================
// Imports
// ============================================================================

use crate::bridge::envelope::BridgeResponse;

use super::adblock;

// ============================================================================
// Video Detection
// ============================================================================

/// Video detection with manual selection.
///
/// Finds `<video>` elements above the minimum visible size (100x100 px)
/// and overlays a branded sync button on each. Tapping one makes it the
/// tracked video; its media events are forwarded with millisecond
/// timestamps. When several candidates exist the page-side `findVideos`
/// keeps them all and the user picks; the tracked element is dropped (with
/// a `video:lost`) when it leaves the DOM or shrinks below the threshold.
///
/// Re-scanning is event-driven (MutationObserver) with a 3s periodic
/// fallback for elements that appear without a detectable mutation.
pub const VIDEO_DETECTION_JS: &str = r#"
(function() {
  var selectedVideo = null;
  var listeners = [];
  var trackedVideos = [];
  var overlays = [];

  function postToHost(type, video) {
    var payload = {
      currentTimeMs: video ? Math.round(video.currentTime * 1000) : 0,
      durationMs: video ? Math.round((video.duration || 0) * 1000) : 0,
      playbackRate: video ? video.playbackRate : 1,
      volume: video ? video.volume : 1,
      muted: video ? video.muted : false,
      paused: video ? video.paused : true,
    };
    window.__iveHost.postMessage(JSON.stringify({
      from: 'ive-injected',
      type: type,
      payload: payload,
    }));
  }

  function findVideos() {
    var videos = Array.prototype.slice.call(document.getElementsByTagName('video'));
    return videos.filter(function(v) {
      return v.offsetWidth > 100 && v.offsetHeight > 100;
    });
  }

  function detachListeners() {
    listeners.forEach(function(l) { l.el.removeEventListener(l.evt, l.fn); });
    listeners = [];
  }

  function attachListeners(video) {
    detachListeners();
    var events = [
      'play', 'pause', 'seeking', 'seeked', 'ratechange',
      'timeupdate', 'durationchange', 'volumechange',
      'waiting', 'playing', 'ended'
    ];
    events.forEach(function(evt) {
      var handler = function() { postToHost('video:' + evt, video); };
      video.addEventListener(evt, handler);
      listeners.push({ el: video, evt: evt, fn: handler });
    });
  }

  function removeOverlays() {
    overlays.forEach(function(o) {
      if (o.parentNode) o.parentNode.removeChild(o);
    });
    overlays = [];
  }

  function selectVideo(video) {
    selectedVideo = video;
    removeOverlays();
    attachListeners(video);
    postToHost('video:found', video);
  }

  window.__ive_deselect_video = function() {
    detachListeners();
    selectedVideo = null;
    postToHost('video:lost', null);
    scan();
  };

  window.__ive_pause_video = function() {
    if (selectedVideo && !selectedVideo.paused) selectedVideo.pause();
  };

  window.__ive_resume_video = function() {
    if (selectedVideo && selectedVideo.paused) selectedVideo.play();
  };

  function createOverlay(video) {
    var overlay = document.createElement('div');
    overlay.className = '__ive-sync-overlay';
    overlay.setAttribute('style', 'position:absolute;z-index:2147483647;pointer-events:auto;');

    var btn = document.createElement('button');
    btn.className = '__ive-sync-btn';
    btn.textContent = 'ive';
    btn.setAttribute('style',
      'pointer-events:auto;display:flex;align-items:center;justify-content:center;' +
      'background:rgba(123,2,77,0.85);color:#fff;border:2px solid rgba(255,255,255,0.3);' +
      'border-radius:50%;width:36px;height:36px;padding:0;font-size:12px;font-weight:800;' +
      'cursor:pointer;box-shadow:0 2px 10px rgba(0,0,0,0.5);-webkit-tap-highlight-color:transparent;'
    );

    btn.addEventListener('click', function(e) {
      e.preventDefault();
      e.stopPropagation();
      selectVideo(video);
    });
    btn.addEventListener('touchend', function(e) {
      e.preventDefault();
      e.stopPropagation();
      selectVideo(video);
    });

    overlay.appendChild(btn);

    function updatePosition() {
      var rect = video.getBoundingClientRect();
      var scrollX = window.pageXOffset || document.documentElement.scrollLeft;
      var scrollY = window.pageYOffset || document.documentElement.scrollTop;
      overlay.style.top = (rect.top + scrollY + 8) + 'px';
      overlay.style.right = (document.documentElement.clientWidth - rect.right + scrollX + 8) + 'px';
    }
    updatePosition();
    window.addEventListener('scroll', updatePosition, true);
    window.addEventListener('resize', updatePosition);

    document.body.appendChild(overlay);
    overlays.push(overlay);
  }

  function scan() {
    var videos = findVideos();

    if (selectedVideo) {
      if (!document.contains(selectedVideo) || selectedVideo.offsetWidth <= 100) {
        detachListeners();
        selectedVideo = null;
        postToHost('video:lost', null);
      } else {
        return;
      }
    }

    var changed = (
      videos.length !== trackedVideos.length ||
      videos.some(function(v, i) { return v !== trackedVideos[i]; })
    );

    if (changed) {
      removeOverlays();
      trackedVideos = videos;
      if (videos.length === 0) {
        postToHost('video:lost', null);
      } else {
        postToHost('video:available', videos[0]);
        videos.forEach(createOverlay);
      }
    }
  }

  var observer = new MutationObserver(function() { scan(); });
  observer.observe(document.documentElement, { childList: true, subtree: true });

  setInterval(scan, 3000);
  scan();
})();
"#;

// ============================================================================
// Bridge Relay
// ============================================================================

/// Relay between ive-play and the host.
///
/// Intercepts `postMessage` envelopes tagged `iveplay` and forwards them,
/// subject to the page-side origin allow-list (the host re-checks). The
/// installed `__ive_bridge_respond` hook re-posts responses into the
/// page's own message space, so in-page script cannot distinguish this
/// host from the real browser extension.
pub const BRIDGE_RELAY_JS: &str = r#"
(function() {
  function isAllowedOrigin(origin) {
    try {
      var hostname = new URL(origin).hostname;
      if (hostname === 'localhost' || hostname === '127.0.0.1') return true;
      if (hostname === 'iveplay.io' || hostname.endsWith('.iveplay.io')) return true;
      return false;
    } catch (e) {
      return false;
    }
  }

  window.addEventListener('message', function(event) {
    if (event.source !== window) return;
    if (!event.data || event.data.from !== 'iveplay') return;
    if (!isAllowedOrigin(window.location.origin)) return;

    window.__iveHost.postMessage(JSON.stringify(event.data));
  });

  window.__ive_bridge_respond = function(responseJson) {
    try {
      var response = JSON.parse(responseJson);
      window.postMessage(response, '*');
    } catch (e) {}
  };
})();
"#;

// ============================================================================
// Background Media Control
// ============================================================================

/// Pauses every playing media element. Injected when a session loses focus.
pub const PAUSE_ALL_MEDIA_JS: &str = r#"
(function() {
  var media = document.querySelectorAll('video, audio');
  for (var i = 0; i < media.length; i++) {
    if (!media[i].paused) media[i].pause();
  }
  if (window.__ive_audio_contexts) {
    window.__ive_audio_contexts.forEach(function(ctx) {
      if (ctx.state === 'running') ctx.suspend();
    });
  }
  true;
})();
"#;

/// Resumes suspended audio contexts. Injected when a session regains focus.
pub const RESUME_AUDIO_CONTEXTS_JS: &str = r#"
(function() {
  if (window.__ive_audio_contexts) {
    window.__ive_audio_contexts.forEach(function(ctx) {
      if (ctx.state === 'suspended') ctx.resume();
    });
  }
  true;
})();
"#;

/// Wraps the AudioContext constructor to track instances, so background
/// sessions can be silenced even when they play through WebAudio.
pub const TRACK_AUDIO_CONTEXTS_JS: &str = r#"
(function() {
  if (window.__ive_audio_contexts) return;
  window.__ive_audio_contexts = [];
  var RealAudioContext = window.AudioContext || window.webkitAudioContext;
  if (!RealAudioContext) return;
  function TrackedAudioContext() {
    var ctx = new RealAudioContext();
    window.__ive_audio_contexts.push(ctx);
    return ctx;
  }
  TrackedAudioContext.prototype = RealAudioContext.prototype;
  window.AudioContext = TrackedAudioContext;
  if (window.webkitAudioContext) window.webkitAudioContext = TrackedAudioContext;
})();
"#;

// ============================================================================
// Bundling
// ============================================================================

/// The full on-load instrumentation bundle for a materialized session.
///
/// AudioContext tracking, video detection, bridge relay and DOM ad
/// cleanup behind a single double-injection guard, with the trailing
/// `true;` embedded WebViews require of injected scripts. The tracker
/// goes first so the background-tab pause/resume scripts always have
/// `window.__ive_audio_contexts` to work against.
#[must_use]
pub fn instrumentation_bundle() -> String {
    format!(
        "if (!window.__ive_injected) {{ window.__ive_injected = true;\n{}\n{}\n{}\n{}\n}}\ntrue;",
        TRACK_AUDIO_CONTEXTS_JS,
        VIDEO_DETECTION_JS,
        BRIDGE_RELAY_JS,
        adblock::dom_cleanup_script(),
    )
}

// ============================================================================
// Response Injection
// ============================================================================

/// Builds the one-shot script that delivers a command response.
///
/// The response JSON rides inside a single-quoted JS string literal, so
/// backslashes and single quotes are escaped. Returns `None` only if the
/// response fails to serialize, which callers treat as a dropped response.
#[must_use]
pub fn build_response_script(response: &BridgeResponse) -> Option<String> {
    let json = serde_json::to_string(response).ok()?;
    let escaped = json.replace('\\', "\\\\").replace('\'', "\\'");
    Some(format!("window.__ive_bridge_respond('{escaped}'); true;"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::CorrelationId;

    #[test]
    fn test_bundle_has_guard_and_parts() {
        let bundle = instrumentation_bundle();
        assert!(bundle.starts_with("if (!window.__ive_injected)"));
        assert!(bundle.contains("video:found"));
        assert!(bundle.contains("__ive_bridge_respond"));
        assert!(bundle.contains("__ive_adblock"));
        assert!(bundle.trim_end().ends_with("true;"));
    }

    #[test]
    fn test_bundle_installs_audio_context_tracker() {
        // The focus-switch pause/resume scripts iterate
        // window.__ive_audio_contexts; the bundle must install it.
        let bundle = instrumentation_bundle();
        assert!(bundle.contains("window.__ive_audio_contexts = []"));
        assert!(PAUSE_ALL_MEDIA_JS.contains("window.__ive_audio_contexts"));
        assert!(RESUME_AUDIO_CONTEXTS_JS.contains("window.__ive_audio_contexts"));
    }

    #[test]
    fn test_response_script_shape() {
        let response = BridgeResponse::ok(CorrelationId::new(5), json!({"available": true}));
        let script = build_response_script(&response).expect("script");

        assert!(script.starts_with("window.__ive_bridge_respond('"));
        assert!(script.ends_with("'); true;"));
        assert!(script.contains(r#"\"id\":5"#) || script.contains("\"id\":5"));
    }

    #[test]
    fn test_response_script_escapes_quotes() {
        let response = BridgeResponse::err(CorrelationId::new(1), "can't do 'that'");
        let script = build_response_script(&response).expect("script");

        // The inner JSON's quotes must not terminate the JS string literal.
        let inner = script
            .strip_prefix("window.__ive_bridge_respond('")
            .and_then(|s| s.strip_suffix("'); true;"))
            .expect("wrapped");
        assert!(!inner.replace("\\'", "").contains('\''));
    }

    #[test]
    fn test_scripts_post_through_host_hook() {
        assert!(VIDEO_DETECTION_JS.contains("window.__iveHost.postMessage"));
        assert!(BRIDGE_RELAY_JS.contains("window.__iveHost.postMessage"));
    }

    #[test]
    fn test_detection_thresholds() {
        // Minimum visible size and rescan fallback interval.
        assert!(VIDEO_DETECTION_JS.contains("offsetWidth > 100"));
        assert!(VIDEO_DETECTION_JS.contains("setInterval(scan, 3000)"));
    }

    #[test]
    fn test_media_control_scripts_guarded() {
        assert!(TRACK_AUDIO_CONTEXTS_JS.contains("if (window.__ive_audio_contexts) return;"));
        assert!(PAUSE_ALL_MEDIA_JS.contains("pause()"));
        assert!(RESUME_AUDIO_CONTEXTS_JS.contains("resume()"));
    }
}
