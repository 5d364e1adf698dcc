//! Shell walkthrough with a simulated page and device.
//!
//! Demonstrates:
//! - Session lifecycle and render-budget eviction
//! - Video telemetry driving the playback projection
//! - Device commands emitted by the sync controller
//! - A bridge command answered with an extension-shaped response
//!
//! Usage:
//!   cargo run --example shell_demo

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use iveview::{
    DeviceInfo, DeviceLink, HandyTransport, PageSink, Result, ScriptSource, SessionId, Shell,
};

// ============================================================================
// Stubs
// ============================================================================

/// Transport that prints every device command instead of sending it.
struct PrintingTransport;

#[async_trait]
impl HandyTransport for PrintingTransport {
    async fn connect(&self, connection_key: &str) -> Result<DeviceInfo> {
        println!("[device] connect key={connection_key}");
        Ok(DeviceInfo {
            model: "Handy".into(),
            firmware: "3.2.3".into(),
        })
    }

    async fn disconnect(&self) -> Result<()> {
        println!("[device] disconnect");
        Ok(())
    }

    async fn prepare_script(&self, source: &ScriptSource) -> Result<()> {
        println!("[device] prepare script {}", source.url());
        Ok(())
    }

    async fn play(&self, position_ms: u64, rate: f64) -> Result<()> {
        println!("[device] play at {position_ms}ms rate {rate}");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        println!("[device] stop");
        Ok(())
    }

    async fn sync_time(&self, position_ms: u64, filter: f64) -> Result<()> {
        println!("[device] sync to {position_ms}ms filter {filter}");
        Ok(())
    }
}

/// Sink that prints the first line of every injected script.
struct PrintingSink;

impl PageSink for PrintingSink {
    fn inject(&self, session_id: SessionId, script: String) {
        let head = script.lines().next().unwrap_or_default();
        println!("[inject] {session_id}: {head}");
    }
}

fn telemetry(event: &str, position_ms: u64, paused: bool) -> String {
    format!(
        r#"{{"from": "ive-injected", "type": "{event}", "payload": {{
            "currentTimeMs": {position_ms}, "durationMs": 120000,
            "playbackRate": 1.0, "volume": 1.0, "muted": false, "paused": {paused}
        }}}}"#
    )
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iveview=debug".into()),
        )
        .init();

    println!("=== Shell demo ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    let device = Arc::new(DeviceLink::new(Arc::new(PrintingTransport)));
    device.connect("abc123").await?;

    let shell: Shell<&str> = Shell::new("https://iveplay.io", device, Arc::new(PrintingSink));
    let home = shell.focused_id();
    shell.attach_surface(home, "home-surface");

    // ========================================================================
    // Sessions
    // ========================================================================

    println!("\n[sessions] opening tabs past the render budget...");
    for n in 0..4 {
        let (id, evicted) = shell.create_session(Some("https://video.example/watch"));
        shell.attach_surface(id, "surface");
        for (evicted_id, _) in evicted {
            println!("[sessions] evicted {evicted_id}");
        }
        println!("[sessions] opened tab {n} as {id}");
    }

    // ========================================================================
    // Playback
    // ========================================================================

    println!("\n[playback] page reports a tracked, playing video...");
    let focused = shell.focused_id();
    let page = "https://video.example/watch";

    shell.on_page_message(focused, page, &telemetry("video:found", 0, true));
    shell.on_page_message(focused, page, &telemetry("video:play", 0, false));
    sleep(Duration::from_millis(2_500)).await;

    shell.on_page_message(focused, page, &telemetry("video:timeupdate", 2_500, false));
    shell.on_page_message(focused, page, &telemetry("video:pause", 3_000, true));
    sleep(Duration::from_millis(100)).await;

    println!("[playback] projection: {:?}", shell.playback());

    // ========================================================================
    // Bridge
    // ========================================================================

    println!("\n[bridge] ive-play pings the bridge...");
    let ping = r#"{"from": "iveplay", "id": 1, "type": "ive:ivedb:ping"}"#;
    shell.on_page_message(focused, "https://iveplay.io/player", ping);
    sleep(Duration::from_millis(100)).await;

    println!("\nDone.");
    Ok(())
}
