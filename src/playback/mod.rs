//! Derived playback state for the focused session.
//!
//! A small state machine fed by video telemetry from the instrumentation
//! layer: `idle -> tracking -> idle` (on element lost), with buffering as a
//! sub-state of tracking toggled by `waiting`/`playing` events.
//!
//! Single-writer, multi-reader: only the shell's telemetry dispatch mutates
//! it. The state is fully reset whenever the focused session begins a new
//! page load, so stale telemetry from a previous page can never leak into
//! the new page's view. That reset is an invariant, not a side effect.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::bridge::envelope::{VideoEvent, VideoPayload};

// ============================================================================
// PlaybackState
// ============================================================================

/// Projected playback state of the tracked video in the focused session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Videos were detected on the page but none is tracked yet.
    pub videos_available: bool,
    /// A video element is tracked (the "active" flag).
    pub has_video: bool,
    /// The tracked video is playing.
    pub playing: bool,
    /// Last observed position in milliseconds.
    pub position_ms: u64,
    /// Last observed duration in milliseconds.
    pub duration_ms: u64,
    /// Playback rate (1.0 = normal).
    pub rate: f64,
    /// Volume in `[0.0, 1.0]`.
    pub volume: f64,
    /// Whether the element is muted.
    pub muted: bool,
    /// The tracked video is stalled waiting for data.
    pub buffering: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            videos_available: false,
            has_video: false,
            playing: false,
            position_ms: 0,
            duration_ms: 0,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            buffering: false,
        }
    }
}

// ============================================================================
// PlaybackState - Transitions
// ============================================================================

impl PlaybackState {
    /// Creates the idle state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one telemetry event.
    ///
    /// Field updates follow the fixed event vocabulary; unknown timing
    /// quirks are absorbed here so readers only ever see a consistent
    /// snapshot.
    pub fn apply(&mut self, event: VideoEvent, payload: &VideoPayload) {
        trace!(?event, position_ms = payload.current_time_ms, "Video event");

        match event {
            VideoEvent::Available => {
                // Videos found on the page, none selected yet.
                self.videos_available = true;
            }
            VideoEvent::Found => {
                self.track(payload);
                self.videos_available = false;
                self.buffering = false;
            }
            VideoEvent::Lost => {
                *self = Self::default();
            }
            VideoEvent::Play | VideoEvent::Playing => {
                self.track(payload);
                self.buffering = false;
            }
            VideoEvent::Pause | VideoEvent::Ended => {
                self.track(payload);
                self.buffering = false;
            }
            VideoEvent::Waiting => {
                self.track(payload);
                self.buffering = true;
            }
            VideoEvent::Seeking
            | VideoEvent::Seeked
            | VideoEvent::RateChange
            | VideoEvent::TimeUpdate
            | VideoEvent::DurationChange
            | VideoEvent::VolumeChange => {
                self.track(payload);
            }
        }
    }

    /// Marks the video as not playing without dropping the selection.
    ///
    /// Used by host-side pause (background media handling); the next page
    /// event re-syncs the real element state.
    pub fn pause_local(&mut self) {
        self.playing = false;
    }

    /// Resets to idle defaults.
    ///
    /// Called on focused-session page loads and focus switches.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Copies payload fields and marks the element tracked.
    fn track(&mut self, payload: &VideoPayload) {
        self.has_video = true;
        self.playing = !payload.paused;
        self.position_ms = payload.current_time_ms;
        self.duration_ms = payload.duration_ms;
        self.rate = payload.playback_rate;
        self.volume = payload.volume;
        self.muted = payload.muted;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(position_ms: u64, paused: bool) -> VideoPayload {
        VideoPayload {
            current_time_ms: position_ms,
            duration_ms: 120_000,
            playback_rate: 1.0,
            volume: 0.8,
            muted: false,
            paused,
        }
    }

    #[test]
    fn test_idle_defaults() {
        let state = PlaybackState::new();
        assert!(!state.has_video);
        assert!(!state.playing);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.rate, 1.0);
        assert_eq!(state.volume, 1.0);
    }

    #[test]
    fn test_available_does_not_track() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Available, &payload(0, true));
        assert!(state.videos_available);
        assert!(!state.has_video);
    }

    #[test]
    fn test_found_starts_tracking() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Available, &payload(0, true));
        state.apply(VideoEvent::Found, &payload(1_000, false));

        assert!(state.has_video);
        assert!(state.playing);
        assert!(!state.videos_available);
        assert_eq!(state.position_ms, 1_000);
        assert_eq!(state.duration_ms, 120_000);
    }

    #[test]
    fn test_pause_keeps_tracking() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(1_000, false));
        state.apply(VideoEvent::Pause, &payload(2_000, true));

        assert!(state.has_video);
        assert!(!state.playing);
        assert_eq!(state.position_ms, 2_000);
    }

    #[test]
    fn test_waiting_sets_buffering() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(0, false));
        state.apply(VideoEvent::Waiting, &payload(500, false));
        assert!(state.buffering);

        state.apply(VideoEvent::Playing, &payload(600, false));
        assert!(!state.buffering);
    }

    #[test]
    fn test_timeupdate_only_updates_fields() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(0, false));
        state.apply(VideoEvent::Waiting, &payload(100, false));

        state.apply(VideoEvent::TimeUpdate, &payload(200, false));

        // Buffering sub-state is untouched by field-only events.
        assert!(state.buffering);
        assert_eq!(state.position_ms, 200);
    }

    #[test]
    fn test_lost_resets_to_idle() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(5_000, false));
        state.apply(VideoEvent::Lost, &payload(0, true));
        assert_eq!(state, PlaybackState::default());
    }

    #[test]
    fn test_reset_on_navigation() {
        // Stale telemetry must never leak into a new page's state.
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(5_000, false));
        assert!(state.has_video);
        assert!(state.playing);
        assert_eq!(state.position_ms, 5_000);

        state.reset();

        assert_eq!(state, PlaybackState::default());
        assert!(!state.has_video);
        assert_eq!(state.position_ms, 0);
    }

    #[test]
    fn test_pause_local_keeps_selection() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(3_000, false));
        state.pause_local();

        assert!(!state.playing);
        assert!(state.has_video);
        assert_eq!(state.position_ms, 3_000);
    }

    #[test]
    fn test_ratechange_updates_rate() {
        let mut state = PlaybackState::new();
        state.apply(VideoEvent::Found, &payload(0, false));

        let mut fast = payload(1_000, false);
        fast.playback_rate = 1.5;
        state.apply(VideoEvent::RateChange, &fast);

        assert_eq!(state.rate, 1.5);
        assert!(state.playing);
    }
}
