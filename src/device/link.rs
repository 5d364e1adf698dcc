//! Device link: connection lifecycle and script loading.
//!
//! The link is process-wide singleton state, owned by the shell and shared
//! by the sync controller and the bridge command processor. It survives
//! navigation and session switches; only explicit user action (settings
//! connect/disconnect) and the sync controller touch it.
//!
//! The physical transport is an opaque capability behind [`HandyTransport`]
//! so the core never depends on the device wire protocol.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

// ============================================================================
// DeviceInfo
// ============================================================================

/// Descriptor reported by the device on a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device model name.
    pub model: String,
    /// Firmware version string.
    pub firmware: String,
}

// ============================================================================
// ScriptSource
// ============================================================================

/// Source of a playback script resource.
///
/// Only remote scripts exist on this host; local script storage is an
/// unsupported capability answered at the bridge layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Script fetched from a URL.
    Url(String),
}

impl ScriptSource {
    /// Returns the script URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
        }
    }
}

// ============================================================================
// HandyTransport
// ============================================================================

/// Opaque transport to the physical device.
///
/// Implementations own the wire protocol (HTTP, BLE, whatever the platform
/// provides). All calls are I/O-bound and may complete at an arbitrary
/// later time; the core never blocks on them inside message dispatch.
#[async_trait]
pub trait HandyTransport: Send + Sync {
    /// Connects using the given connection key.
    async fn connect(&self, connection_key: &str) -> Result<DeviceInfo>;

    /// Disconnects from the device.
    async fn disconnect(&self) -> Result<()>;

    /// Downloads and prepares a playback script on the device.
    async fn prepare_script(&self, source: &ScriptSource) -> Result<()>;

    /// Starts scripted playback at a position and rate.
    async fn play(&self, position_ms: u64, rate: f64) -> Result<()>;

    /// Stops scripted playback.
    async fn stop(&self) -> Result<()>;

    /// Corrects the device's notion of playback time.
    ///
    /// `filter` is the blend confidence in `[0.0, 1.0]`: high values make
    /// the device trust the new time strongly, low values smooth it in.
    async fn sync_time(&self, position_ms: u64, filter: f64) -> Result<()>;
}

// ============================================================================
// LinkState
// ============================================================================

/// Snapshot of the link state, as consumed by the settings UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Whether a device is connected.
    pub connected: bool,
    /// A connect attempt is in flight.
    pub connecting: bool,
    /// Last connection key used.
    pub connection_key: String,
    /// Descriptor of the connected device.
    pub info: Option<DeviceInfo>,
    /// A playback script is prepared on the device.
    pub script_loaded: bool,
    /// URL of the prepared script.
    pub script_url: String,
    /// Last human-readable error, cleared on the next attempt.
    pub error: Option<String>,
}

// ============================================================================
// DeviceLink
// ============================================================================

/// Process-wide device connection state.
pub struct DeviceLink {
    /// The opaque device transport.
    transport: Arc<dyn HandyTransport>,
    /// Mutable link state.
    state: Mutex<LinkState>,
}

impl std::fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLink")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// DeviceLink - Constructor & Accessors
// ============================================================================

impl DeviceLink {
    /// Creates a link over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn HandyTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(LinkState::default()),
        }
    }

    /// Returns a snapshot of the link state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state.lock().clone()
    }

    /// Returns `true` if a device is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Returns `true` if a device is connected with a script prepared.
    #[inline]
    #[must_use]
    pub fn script_ready(&self) -> bool {
        let state = self.state.lock();
        state.connected && state.script_loaded
    }
}

// ============================================================================
// DeviceLink - Connection Lifecycle
// ============================================================================

impl DeviceLink {
    /// Connects to the device with a connection key.
    ///
    /// On failure the error is also stored as human-readable link state for
    /// the settings UI.
    ///
    /// # Errors
    ///
    /// Returns the underlying transport error.
    pub async fn connect(&self, connection_key: &str) -> Result<DeviceInfo> {
        {
            let mut state = self.state.lock();
            state.connecting = true;
            state.error = None;
            state.connection_key = connection_key.to_string();
        }

        match self.transport.connect(connection_key).await {
            Ok(info) => {
                let mut state = self.state.lock();
                state.connecting = false;
                state.connected = true;
                state.info = Some(info.clone());
                info!(model = %info.model, "Device connected");
                Ok(info)
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.connecting = false;
                state.connected = false;
                state.error = Some(format!("Connection error: {e}"));
                warn!(error = %e, "Device connect failed");
                Err(e)
            }
        }
    }

    /// Disconnects from the device.
    ///
    /// Transport failures during disconnect are discarded; the link state
    /// is cleared regardless.
    pub async fn disconnect(&self) {
        super::best_effort("disconnect", self.transport.disconnect()).await;

        let mut state = self.state.lock();
        state.connected = false;
        state.info = None;
        state.script_loaded = false;
        state.script_url.clear();
        state.error = None;
        debug!("Device disconnected");
    }

    /// Clears the stored error.
    pub fn clear_error(&self) {
        self.state.lock().error = None;
    }
}

// ============================================================================
// DeviceLink - Scripts
// ============================================================================

impl DeviceLink {
    /// Loads a playback script onto the device.
    ///
    /// Returns `false` without error when no device is connected or the
    /// load fails: a missing device must never break page functionality.
    pub async fn load_script(&self, source: &ScriptSource) -> bool {
        if !self.is_connected() {
            debug!(url = source.url(), "Script load skipped: no device");
            return false;
        }

        match self.transport.prepare_script(source).await {
            Ok(()) => {
                let mut state = self.state.lock();
                state.script_loaded = true;
                state.script_url = source.url().to_string();
                info!(url = source.url(), "Script loaded");
                true
            }
            Err(e) => {
                self.state.lock().error = Some(format!("Script error: {e}"));
                warn!(url = source.url(), error = %e, "Script load failed");
                false
            }
        }
    }

    /// Forgets the prepared script.
    pub fn clear_script(&self) {
        let mut state = self.state.lock();
        state.script_loaded = false;
        state.script_url.clear();
    }
}

// ============================================================================
// DeviceLink - Playback Commands
// ============================================================================

impl DeviceLink {
    /// Starts device playback at a position and rate.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceUnavailable`] when disconnected, otherwise the
    /// transport error.
    pub async fn play(&self, position_ms: u64, rate: f64) -> Result<()> {
        self.ensure_connected()?;
        self.transport.play(position_ms, rate).await
    }

    /// Stops device playback.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceUnavailable`] when disconnected, otherwise the
    /// transport error.
    pub async fn stop(&self) -> Result<()> {
        self.ensure_connected()?;
        self.transport.stop().await
    }

    /// Sends a time correction to the device.
    ///
    /// # Errors
    ///
    /// [`Error::DeviceUnavailable`] when disconnected, otherwise the
    /// transport error.
    pub async fn sync_time(&self, position_ms: u64, filter: f64) -> Result<()> {
        self.ensure_connected()?;
        self.transport.sync_time(position_ms, filter).await
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::DeviceUnavailable)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex as PlMutex;

    /// Transport stub with scripted connect behavior.
    struct StubTransport {
        fail_connect: bool,
        fail_script: bool,
        calls: PlMutex<Vec<String>>,
    }

    impl StubTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail_connect: false,
                fail_script: false,
                calls: PlMutex::new(Vec::new()),
            })
        }

        fn failing_connect() -> Arc<Self> {
            Arc::new(Self {
                fail_connect: true,
                fail_script: false,
                calls: PlMutex::new(Vec::new()),
            })
        }

        fn failing_script() -> Arc<Self> {
            Arc::new(Self {
                fail_connect: false,
                fail_script: true,
                calls: PlMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HandyTransport for StubTransport {
        async fn connect(&self, _connection_key: &str) -> Result<DeviceInfo> {
            self.calls.lock().push("connect".into());
            if self.fail_connect {
                return Err(Error::device("no route to device"));
            }
            Ok(DeviceInfo {
                model: "Handy".into(),
                firmware: "3.2.3".into(),
            })
        }

        async fn disconnect(&self) -> Result<()> {
            self.calls.lock().push("disconnect".into());
            Ok(())
        }

        async fn prepare_script(&self, source: &ScriptSource) -> Result<()> {
            self.calls.lock().push(format!("script:{}", source.url()));
            if self.fail_script {
                return Err(Error::script_load("404"));
            }
            Ok(())
        }

        async fn play(&self, position_ms: u64, rate: f64) -> Result<()> {
            self.calls.lock().push(format!("play:{position_ms}:{rate}"));
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.calls.lock().push("stop".into());
            Ok(())
        }

        async fn sync_time(&self, position_ms: u64, filter: f64) -> Result<()> {
            self.calls
                .lock()
                .push(format!("sync:{position_ms}:{filter}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connect_success() {
        let link = DeviceLink::new(StubTransport::new());
        let info = link.connect("abc123").await.expect("connect");

        assert_eq!(info.model, "Handy");
        let state = link.state();
        assert!(state.connected);
        assert!(!state.connecting);
        assert_eq!(state.connection_key, "abc123");
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_stores_error() {
        let link = DeviceLink::new(StubTransport::failing_connect());
        let result = link.connect("abc123").await;

        assert!(result.is_err());
        let state = link.state();
        assert!(!state.connected);
        assert!(
            state
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Connection error:"))
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_state() {
        let link = DeviceLink::new(StubTransport::new());
        link.connect("abc123").await.expect("connect");
        link.load_script(&ScriptSource::Url("https://scripts.example/a.funscript".into()))
            .await;

        link.disconnect().await;

        let state = link.state();
        assert!(!state.connected);
        assert!(state.info.is_none());
        assert!(!state.script_loaded);
    }

    #[tokio::test]
    async fn test_load_script_without_device_is_graceful() {
        let link = DeviceLink::new(StubTransport::new());
        let loaded = link
            .load_script(&ScriptSource::Url("https://scripts.example/a.funscript".into()))
            .await;

        assert!(!loaded);
        assert!(link.state().error.is_none());
    }

    #[tokio::test]
    async fn test_load_script_failure_sets_error() {
        let link = DeviceLink::new(StubTransport::failing_script());
        link.connect("abc123").await.expect("connect");

        let loaded = link
            .load_script(&ScriptSource::Url("https://scripts.example/a.funscript".into()))
            .await;

        assert!(!loaded);
        let state = link.state();
        assert!(!state.script_loaded);
        assert!(
            state
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Script error:"))
        );
    }

    #[tokio::test]
    async fn test_playback_requires_connection() {
        let link = DeviceLink::new(StubTransport::new());
        assert!(matches!(
            link.play(0, 1.0).await,
            Err(Error::DeviceUnavailable)
        ));
        assert!(matches!(link.stop().await, Err(Error::DeviceUnavailable)));
        assert!(matches!(
            link.sync_time(0, 0.5).await,
            Err(Error::DeviceUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_script_ready() {
        let link = DeviceLink::new(StubTransport::new());
        assert!(!link.script_ready());

        link.connect("abc123").await.expect("connect");
        assert!(!link.script_ready());

        link.load_script(&ScriptSource::Url("https://scripts.example/a.funscript".into()))
            .await;
        assert!(link.script_ready());

        link.clear_script();
        assert!(!link.script_ready());
    }
}
