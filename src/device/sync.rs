//! Two-tier playback resynchronization.
//!
//! The device control channel is lossy and its clock drifts, so mirroring
//! play/stop alone is not enough. On every playback start the controller:
//!
//! - issues an immediate `play` with the current position and rate,
//! - schedules a *tight* resync at +2s (filter 0.9 - the device trusts the
//!   new time strongly),
//! - schedules a *loose* resync at +17s and every 15s thereafter
//!   (filter 0.5 - blended in gently to avoid visible jitter).
//!
//! Stops cancel all pending timers and issue `stop`. A rate change while
//! playing re-issues `play` at the latest position without disturbing the
//! resync schedule's phase. All device calls are fire-and-forget.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use super::best_effort;
use super::link::DeviceLink;

// ============================================================================
// Constants
// ============================================================================

/// Delay before the tight resync.
const TIGHT_SYNC_DELAY: Duration = Duration::from_secs(2);

/// Blend confidence of the tight resync.
const TIGHT_SYNC_FILTER: f64 = 0.9;

/// Delay before the first loose resync.
const LOOSE_SYNC_DELAY: Duration = Duration::from_secs(17);

/// Interval between subsequent loose resyncs.
const LOOSE_SYNC_INTERVAL: Duration = Duration::from_secs(15);

/// Blend confidence of loose resyncs.
const LOOSE_SYNC_FILTER: f64 = 0.5;

// ============================================================================
// Shared State
// ============================================================================

/// State shared between the controller and its timer tasks.
struct Shared {
    /// Device link the commands go to.
    link: Arc<DeviceLink>,
    /// Latest observed playback position in milliseconds.
    position_ms: AtomicU64,
    /// Playback epoch; bumped on every start/stop to invalidate stale timers.
    epoch: AtomicU64,
    /// Whether playback is currently considered running.
    playing: AtomicBool,
    /// Pending resync timer tasks.
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    /// Returns `true` if the given epoch is still current and playing.
    fn live(&self, epoch: u64) -> bool {
        self.playing.load(Ordering::Acquire) && self.epoch.load(Ordering::Acquire) == epoch
    }

    /// Aborts and forgets all pending timers.
    fn cancel_timers(&self) {
        let timers = {
            let mut guard = self.timers.lock();
            std::mem::take(&mut *guard)
        };
        for timer in &timers {
            timer.abort();
        }
        if !timers.is_empty() {
            debug!(count = timers.len(), "Resync timers cancelled");
        }
    }
}

// ============================================================================
// SyncController
// ============================================================================

/// Drives the external device from playback state transitions.
///
/// Owned by the shell; one controller per process (the playback pipeline is
/// scoped to the focused session, so a single schedule suffices).
pub struct SyncController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("playing", &self.shared.playing.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl SyncController {
    /// Creates a controller over the given device link.
    #[must_use]
    pub fn new(link: Arc<DeviceLink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                link,
                position_ms: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                playing: AtomicBool::new(false),
                timers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Records the latest observed playback position.
    ///
    /// Resync timers read this when they fire, so corrections always carry
    /// the freshest position rather than the one playback started at.
    #[inline]
    pub fn note_position(&self, position_ms: u64) {
        self.shared
            .position_ms
            .store(position_ms, Ordering::Release);
    }

    /// Returns `true` if the controller considers playback running.
    #[inline]
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Handles a transition to playing.
    ///
    /// Issues an immediate start command and installs the tight and loose
    /// resync schedule. Any previous schedule is cancelled first.
    pub fn on_playing(&self, position_ms: u64, rate: f64) {
        let shared = &self.shared;
        shared.position_ms.store(position_ms, Ordering::Release);
        shared.playing.store(true, Ordering::Release);
        let epoch = shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        shared.cancel_timers();

        debug!(position_ms, rate, "Device playback starting");

        // Immediate start.
        let start = Arc::clone(shared);
        tokio::spawn(async move {
            best_effort("play", start.link.play(position_ms, rate)).await;
        });

        // Tight resync at +2s.
        let tight = Arc::clone(shared);
        let tight_handle = tokio::spawn(async move {
            sleep(TIGHT_SYNC_DELAY).await;
            if tight.live(epoch) {
                let position = tight.position_ms.load(Ordering::Acquire);
                best_effort("sync_time", tight.link.sync_time(position, TIGHT_SYNC_FILTER)).await;
            }
        });

        // Loose resync at +17s, then every 15s.
        let loose = Arc::clone(shared);
        let loose_handle = tokio::spawn(async move {
            sleep(LOOSE_SYNC_DELAY).await;
            loop {
                if !loose.live(epoch) {
                    break;
                }
                let position = loose.position_ms.load(Ordering::Acquire);
                best_effort("sync_time", loose.link.sync_time(position, LOOSE_SYNC_FILTER)).await;
                sleep(LOOSE_SYNC_INTERVAL).await;
            }
        });

        let mut timers = shared.timers.lock();
        timers.push(tight_handle);
        timers.push(loose_handle);
    }

    /// Handles a transition to not-playing.
    ///
    /// Cancels all pending resync timers and issues a stop command.
    pub fn on_stopped(&self) {
        let shared = &self.shared;
        if !shared.playing.swap(false, Ordering::AcqRel) {
            return;
        }
        shared.epoch.fetch_add(1, Ordering::AcqRel);
        shared.cancel_timers();

        debug!("Device playback stopping");

        let stop = Arc::clone(shared);
        tokio::spawn(async move {
            best_effort("stop", stop.link.stop()).await;
        });
    }

    /// Handles a rate change while playing.
    ///
    /// Re-issues the start command at the latest position with the new
    /// rate, a new playback epoch for the device, without altering the
    /// resync schedule's phase.
    pub fn on_rate_changed(&self, rate: f64) {
        let shared = &self.shared;
        if !shared.playing.load(Ordering::Acquire) {
            return;
        }
        let position_ms = shared.position_ms.load(Ordering::Acquire);

        debug!(position_ms, rate, "Device playback rate changed");

        let restart = Arc::clone(shared);
        tokio::spawn(async move {
            best_effort("play", restart.link.play(position_ms, rate)).await;
        });
    }

    /// Cancels pending timers without issuing any device command.
    ///
    /// Used on teardown of the owning session's playback state.
    pub fn cancel(&self) {
        self.shared.playing.store(false, Ordering::Release);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        self.shared.cancel_timers();
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.shared.cancel_timers();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::device::link::{DeviceInfo, HandyTransport, ScriptSource};
    use crate::error::Result;

    /// Records device commands with their offset from construction.
    struct RecordingTransport {
        t0: Instant,
        commands: Mutex<Vec<(u64, String)>>,
    }

    impl RecordingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                t0: Instant::now(),
                commands: Mutex::new(Vec::new()),
            })
        }

        fn record(&self, command: String) {
            let at_ms = self.t0.elapsed().as_millis() as u64;
            self.commands.lock().push((at_ms, command));
        }

        fn commands(&self) -> Vec<(u64, String)> {
            self.commands.lock().clone()
        }
    }

    #[async_trait]
    impl HandyTransport for RecordingTransport {
        async fn connect(&self, _connection_key: &str) -> Result<DeviceInfo> {
            Ok(DeviceInfo {
                model: "Handy".into(),
                firmware: "3.2.3".into(),
            })
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn prepare_script(&self, _source: &ScriptSource) -> Result<()> {
            Ok(())
        }

        async fn play(&self, position_ms: u64, rate: f64) -> Result<()> {
            self.record(format!("play:{position_ms}:{rate}"));
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.record("stop".to_string());
            Ok(())
        }

        async fn sync_time(&self, position_ms: u64, filter: f64) -> Result<()> {
            self.record(format!("sync:{position_ms}:{filter}"));
            Ok(())
        }
    }

    async fn connected_controller() -> (SyncController, Arc<RecordingTransport>) {
        let transport = RecordingTransport::new();
        let link = Arc::new(DeviceLink::new(transport.clone() as Arc<dyn HandyTransport>));
        link.connect("abc123").await.expect("connect");
        (SyncController::new(link), transport)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_start_issues_play_and_tight_sync() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;

        sleep(Duration::from_millis(2_100)).await;

        let commands = transport.commands();
        assert_eq!(commands[0].1, "play:0:1");
        assert_eq!(commands[1].1, "sync:0:0.9");
        // Exactly one tight sync at ~2000ms.
        assert!(commands[1].0 >= 2_000 && commands[1].0 < 2_200);
        assert_eq!(commands.len(), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_loose_sync_at_17s_then_every_15s() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;

        sleep(Duration::from_millis(47_500)).await;

        let syncs: Vec<(u64, String)> = transport
            .commands()
            .into_iter()
            .filter(|(_, c)| c.contains(":0.5"))
            .collect();

        // Loose syncs at ~17s, ~32s, ~47s.
        assert_eq!(syncs.len(), 3);
        assert!(syncs[0].0 >= 17_000 && syncs[0].0 < 17_300);
        assert!(syncs[1].0 >= 32_000 && syncs[1].0 < 32_300);
        assert!(syncs[2].0 >= 47_000 && syncs[2].0 < 47_300);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_syncs_use_latest_position() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;

        sleep(Duration::from_millis(1_000)).await;
        controller.note_position(1_000);
        sleep(Duration::from_millis(1_500)).await;

        let commands = transport.commands();
        assert_eq!(commands[1].1, "sync:1000:0.9");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_stop_cancels_timers_and_stops_device() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;
        sleep(Duration::from_millis(500)).await;

        controller.on_stopped();
        sleep(Duration::from_millis(60_000)).await;

        let commands = transport.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].1, "play:0:1");
        assert_eq!(commands[1].1, "stop");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_stop_when_not_playing_is_noop() {
        let (controller, transport) = connected_controller().await;

        controller.on_stopped();
        sleep(Duration::from_millis(100)).await;

        assert!(transport.commands().is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_rate_change_restarts_without_touching_schedule() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;

        sleep(Duration::from_millis(1_000)).await;
        controller.note_position(1_000);
        controller.on_rate_changed(1.5);

        sleep(Duration::from_millis(16_500)).await;

        let commands = transport.commands();
        // play, rate-change play, tight sync (phase unchanged, still at
        // ~2s from the original start), loose sync at ~17s.
        assert_eq!(commands[0].1, "play:0:1");
        assert_eq!(commands[1].1, "play:1000:1.5");
        assert!(commands[2].1.ends_with(":0.9"));
        assert!(commands[2].0 >= 2_000 && commands[2].0 < 2_300);
        assert!(commands[3].1.ends_with(":0.5"));
        assert!(commands[3].0 >= 17_000 && commands[3].0 < 17_300);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_rate_change_while_stopped_is_noop() {
        let (controller, transport) = connected_controller().await;

        controller.on_rate_changed(2.0);
        sleep(Duration::from_millis(100)).await;

        assert!(transport.commands().is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_cancel_is_silent() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;
        sleep(Duration::from_millis(100)).await;

        controller.cancel();
        sleep(Duration::from_millis(60_000)).await;

        // Only the initial play; no stop, no syncs.
        let commands = transport.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].1, "play:0:1");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_restart_resets_schedule() {
        let (controller, transport) = connected_controller().await;

        controller.on_playing(0, 1.0);
        tokio::task::yield_now().await;
        sleep(Duration::from_millis(1_000)).await;

        controller.on_stopped();
        sleep(Duration::from_millis(1_000)).await;

        controller.on_playing(5_000, 1.0);
        tokio::task::yield_now().await;
        sleep(Duration::from_millis(2_100)).await;

        let commands = transport.commands();
        let last = commands.last().expect("commands recorded");
        // Tight sync fires 2s after the *second* start.
        assert_eq!(last.1, "sync:5000:0.9");
        assert!(last.0 >= 4_000);
    }
}
