//! Bridge command semantics.
//!
//! A fixed table of command kinds, each producing exactly one response.
//! The host emulates the ive browser extension's bridge so ive-play works
//! identically inside the embedded browser, with two differences:
//!
//! - there is no local entry database, so IVEDB queries answer with the
//!   empty shape the caller expects (empty list / `null` / `false`) rather
//!   than erroring,
//! - local script storage is unsupported and says so for mutating calls.
//!
//! Nothing thrown inside a handler ever crosses the boundary: every
//! failure becomes the `error` field of the response envelope.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::device::{DeviceLink, ScriptSource};

use super::envelope::{BridgeResponse, CommandMessage};

// ============================================================================
// Constants
// ============================================================================

/// Bridge protocol version reported by the availability ping.
pub const BRIDGE_VERSION: &str = "1.4.0";

// ============================================================================
// CommandProcessor
// ============================================================================

/// Executes bridge commands against host capabilities.
///
/// May perform device I/O; callers run it on a spawned task so command
/// processing never blocks message dispatch.
pub struct CommandProcessor {
    /// Device link for script-selection commands.
    device: Arc<DeviceLink>,
}

impl CommandProcessor {
    /// Creates a processor over the process-wide device link.
    #[must_use]
    pub fn new(device: Arc<DeviceLink>) -> Self {
        Self { device }
    }

    /// Processes one command, always producing a response.
    pub async fn process(&self, message: CommandMessage) -> BridgeResponse {
        let id = message.id;
        trace!(kind = %message.kind, correlation_id = %id, "Processing bridge command");

        match self.dispatch(&message).await {
            Ok(data) => BridgeResponse::ok(id, data),
            Err(error) => BridgeResponse::err(id, error),
        }
    }

    /// The command table. `Err` carries the page-facing error string.
    async fn dispatch(&self, message: &CommandMessage) -> Result<Value, String> {
        match message.kind.as_str() {
            // ================================================================
            // Availability ping
            // ================================================================
            "ive:ivedb:ping" => Ok(json!({
                "available": true,
                "version": BRIDGE_VERSION,
            })),

            // ================================================================
            // Script selection & playback
            // ================================================================
            "ive:select_script" => {
                // ive-play uses the script URL as its id.
                if let Some(url) = message.field_str("scriptId") {
                    self.load_script_best_effort(url).await;
                }
                Ok(json!(true))
            }

            "ive:save_and_play" => {
                let requested = message.field_str("scriptId").map(str::to_string);
                let script_url = requested
                    .clone()
                    .or_else(|| first_entry_script(message))
                    .filter(|url| !url.is_empty());

                if let Some(ref url) = script_url {
                    self.load_script_best_effort(url).await;
                }

                // Fake identifiers: this host has no entry database.
                Ok(json!({
                    "entryId": format!("mobile-{}", now_millis()),
                    "scriptId": script_url,
                }))
            }

            // ================================================================
            // IVEDB queries: no local database, answer with empty shapes
            // ================================================================
            "ive:ivedb:get_all_entries"
            | "ive:ivedb:get_entries_paginated"
            | "ive:ivedb:search_entries"
            | "ive:ivedb:get_favorites" => Ok(json!([])),

            "ive:ivedb:get_entry" | "ive:ivedb:get_entry_with_details" => Ok(Value::Null),

            "ive:ivedb:is_favorited" => Ok(json!(false)),

            "ive:ivedb:create_entry" => Ok(json!(format!("mobile-{}", now_millis()))),

            "ive:ivedb:update_entry"
            | "ive:ivedb:delete_entry"
            | "ive:ivedb:add_favorite"
            | "ive:ivedb:remove_favorite" => Ok(Value::Null),

            // ================================================================
            // Local scripts: unsupported capability
            // ================================================================
            "ive:local_script:save" => Err("Local scripts not supported on mobile".to_string()),

            "ive:local_script:get" | "ive:local_script:delete" | "ive:local_script:info" => {
                Ok(Value::Null)
            }

            "ive:local_script:list" => Ok(json!({})),

            // ================================================================
            // Unknown
            // ================================================================
            kind => Err(format!("Unknown message type: {kind}")),
        }
    }

    /// Loads a script when a device is present; failures never surface.
    async fn load_script_best_effort(&self, url: &str) {
        if !self.device.is_connected() {
            debug!(url, "Device absent, script selection ignored");
            return;
        }
        self.device
            .load_script(&ScriptSource::Url(url.to_string()))
            .await;
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the first script URL from a `save_and_play` entry.
fn first_entry_script(message: &CommandMessage) -> Option<String> {
    message
        .field("entry")?
        .get("scripts")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// Milliseconds since the Unix epoch, for fake identifiers.
fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::device::{DeviceInfo, HandyTransport};
    use crate::error::Result;
    use crate::identifiers::CorrelationId;

    struct FakeTransport {
        loaded: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                loaded: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HandyTransport for FakeTransport {
        async fn connect(&self, _connection_key: &str) -> Result<DeviceInfo> {
            Ok(DeviceInfo {
                model: "Handy".into(),
                firmware: "3.2.3".into(),
            })
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn prepare_script(&self, source: &ScriptSource) -> Result<()> {
            self.loaded.lock().push(source.url().to_string());
            Ok(())
        }

        async fn play(&self, _position_ms: u64, _rate: f64) -> Result<()> {
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }

        async fn sync_time(&self, _position_ms: u64, _filter: f64) -> Result<()> {
            Ok(())
        }
    }

    fn command(kind: &str, extra: Value) -> CommandMessage {
        let mut envelope = json!({
            "from": "iveplay",
            "id": 1,
            "type": kind,
        });
        if let (Value::Object(env), Value::Object(extra)) = (&mut envelope, extra) {
            env.extend(extra);
        }
        serde_json::from_value(envelope).expect("valid command")
    }

    fn processor() -> (CommandProcessor, Arc<FakeTransport>, Arc<DeviceLink>) {
        let transport = FakeTransport::new();
        let link = Arc::new(DeviceLink::new(
            transport.clone() as Arc<dyn HandyTransport>
        ));
        (CommandProcessor::new(link.clone()), transport, link)
    }

    #[tokio::test]
    async fn test_ping() {
        let (processor, _, _) = processor();
        let response = processor.process(command("ive:ivedb:ping", json!({}))).await;

        assert!(response.error.is_none());
        assert_eq!(response.data["available"], true);
        assert_eq!(response.data["version"], BRIDGE_VERSION);
        assert!(!BRIDGE_VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let (processor, _, _) = processor();
        let response = processor.process(command("ive:bogus", json!({}))).await;

        assert_eq!(response.data, Value::Null);
        assert_eq!(
            response.error.as_deref(),
            Some("Unknown message type: ive:bogus")
        );
    }

    #[tokio::test]
    async fn test_select_script_without_device() {
        // A missing device never breaks page functionality.
        let (processor, transport, _) = processor();
        let response = processor
            .process(command(
                "ive:select_script",
                json!({"scriptId": "https://scripts.example/a.funscript"}),
            ))
            .await;

        assert!(response.error.is_none());
        assert_eq!(response.data, json!(true));
        assert!(transport.loaded.lock().is_empty());
    }

    #[tokio::test]
    async fn test_select_script_with_device() {
        let (processor, transport, link) = processor();
        link.connect("abc123").await.expect("connect");

        let response = processor
            .process(command(
                "ive:select_script",
                json!({"scriptId": "https://scripts.example/a.funscript"}),
            ))
            .await;

        assert!(response.error.is_none());
        assert_eq!(
            transport.loaded.lock().as_slice(),
            ["https://scripts.example/a.funscript"]
        );
    }

    #[tokio::test]
    async fn test_save_and_play_resolves_first_script() {
        let (processor, transport, link) = processor();
        link.connect("abc123").await.expect("connect");

        let response = processor
            .process(command(
                "ive:save_and_play",
                json!({
                    "entry": {"scripts": [
                        {"url": "https://scripts.example/first.funscript"},
                        {"url": "https://scripts.example/second.funscript"}
                    ]},
                    "videoUrl": "https://video.example/v"
                }),
            ))
            .await;

        assert!(response.error.is_none());
        assert_eq!(
            response.data["scriptId"],
            "https://scripts.example/first.funscript"
        );
        assert!(
            response.data["entryId"]
                .as_str()
                .is_some_and(|id| id.starts_with("mobile-"))
        );
        assert_eq!(
            transport.loaded.lock().as_slice(),
            ["https://scripts.example/first.funscript"]
        );
    }

    #[tokio::test]
    async fn test_save_and_play_prefers_requested_script() {
        let (processor, _, _) = processor();
        let response = processor
            .process(command(
                "ive:save_and_play",
                json!({
                    "entry": {"scripts": [{"url": "https://scripts.example/first.funscript"}]},
                    "scriptId": "https://scripts.example/second.funscript"
                }),
            ))
            .await;

        assert_eq!(
            response.data["scriptId"],
            "https://scripts.example/second.funscript"
        );
    }

    #[tokio::test]
    async fn test_save_and_play_without_scripts() {
        let (processor, _, _) = processor();
        let response = processor
            .process(command("ive:save_and_play", json!({"entry": {"scripts": []}})))
            .await;

        assert!(response.error.is_none());
        assert_eq!(response.data["scriptId"], Value::Null);
    }

    #[tokio::test]
    async fn test_database_queries_answer_empty() {
        let (processor, _, _) = processor();

        for kind in [
            "ive:ivedb:get_all_entries",
            "ive:ivedb:get_entries_paginated",
            "ive:ivedb:search_entries",
            "ive:ivedb:get_favorites",
        ] {
            let response = processor.process(command(kind, json!({}))).await;
            assert!(response.error.is_none(), "{kind}");
            assert_eq!(response.data, json!([]), "{kind}");
        }

        for kind in ["ive:ivedb:get_entry", "ive:ivedb:get_entry_with_details"] {
            let response = processor.process(command(kind, json!({}))).await;
            assert!(response.error.is_none(), "{kind}");
            assert_eq!(response.data, Value::Null, "{kind}");
        }

        let response = processor
            .process(command("ive:ivedb:is_favorited", json!({})))
            .await;
        assert_eq!(response.data, json!(false));
    }

    #[tokio::test]
    async fn test_database_mutations_answer_null() {
        let (processor, _, _) = processor();

        for kind in [
            "ive:ivedb:update_entry",
            "ive:ivedb:delete_entry",
            "ive:ivedb:add_favorite",
            "ive:ivedb:remove_favorite",
        ] {
            let response = processor.process(command(kind, json!({}))).await;
            assert!(response.error.is_none(), "{kind}");
            assert_eq!(response.data, Value::Null, "{kind}");
        }
    }

    #[tokio::test]
    async fn test_create_entry_returns_fake_id() {
        let (processor, _, _) = processor();
        let response = processor
            .process(command("ive:ivedb:create_entry", json!({})))
            .await;
        assert!(
            response.data
                .as_str()
                .is_some_and(|id| id.starts_with("mobile-"))
        );
    }

    #[tokio::test]
    async fn test_local_scripts_unsupported() {
        let (processor, _, _) = processor();

        let save = processor
            .process(command("ive:local_script:save", json!({})))
            .await;
        assert_eq!(
            save.error.as_deref(),
            Some("Local scripts not supported on mobile")
        );
        assert_eq!(save.data, Value::Null);

        for kind in [
            "ive:local_script:get",
            "ive:local_script:delete",
            "ive:local_script:info",
        ] {
            let response = processor.process(command(kind, json!({}))).await;
            assert!(response.error.is_none(), "{kind}");
            assert_eq!(response.data, Value::Null, "{kind}");
        }

        let list = processor
            .process(command("ive:local_script:list", json!({})))
            .await;
        assert_eq!(list.data, json!({}));
    }

    #[tokio::test]
    async fn test_every_command_echoes_correlation_id() {
        let (processor, _, _) = processor();
        let mut envelope = command("ive:ivedb:ping", json!({}));
        envelope.id = CorrelationId::new(4242);

        let response = processor.process(envelope).await;
        assert_eq!(response.id, CorrelationId::new(4242));
    }
}
