//! Wire protocol for the monitor WebSocket endpoint.
//!
//! These types match the JSON frames broadcast by the stress-test monitor
//! backend. Every inbound frame is discriminated by a `type` field; frame
//! shapes the dashboard does not care about decode to [`Inbound::Unknown`]
//! and are dropped by the caller.
//!
//! The adapter metric schema is deliberately open: adapters may ship extra
//! fields (validation stats, per-message-type counters) and the dashboard
//! must accept snapshots for adapter ids it has never seen.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point-in-time summary of all adapters' metrics, keyed by adapter id.
pub type Summary = BTreeMap<String, AdapterMetrics>;

/// Metric fields reported by a single adapter.
///
/// All numeric fields default to zero and connectivity defaults to false,
/// so a partial snapshot still merges cleanly. Fields this struct does not
/// name are collected into `extra` rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterMetrics {
    /// Adapter kind reported by the server (e.g. "binance", "polymarket").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_type: Option<String>,

    #[serde(default)]
    pub is_connected: bool,

    #[serde(default)]
    pub avg_latency_ms: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,

    /// Success rate as a fraction in [0, 1]. The UI scales it by 100.
    #[serde(default)]
    pub success_rate: f64,

    #[serde(default)]
    pub messages_received: u64,

    #[serde(default)]
    pub connection_errors: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_success_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_transitions_per_minute: Option<f64>,

    /// Adapter-supplied latency classification thresholds (good/warning),
    /// in milliseconds. Fixed defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_good_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_warn_ms: Option<f64>,

    /// Anything else the adapter reports (open schema).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AdapterMetrics {
    /// Look up a numeric metric by wire key, covering both the typed
    /// fields and the open-schema extras.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        match key {
            "avg_latency_ms" => Some(self.avg_latency_ms),
            "p95_latency_ms" => self.p95_latency_ms,
            "success_rate" => Some(self.success_rate),
            "messages_received" => Some(self.messages_received as f64),
            "connection_errors" => Some(self.connection_errors as f64),
            "validation_success_rate" => self.validation_success_rate,
            "recent_transitions_per_minute" => self.recent_transitions_per_minute,
            _ => self.extra.get(key).and_then(|v| v.as_f64()),
        }
    }
}

/// Payload of a `metrics_update` frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePayload {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub test_info: Option<TestInfo>,
}

/// Run metadata attached to periodic updates.
#[derive(Debug, Clone, Deserialize)]
pub struct TestInfo {
    /// Unix seconds when the run started.
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub elapsed_hours: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Inbound frames, discriminated by the `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Establishes the elapsed-time epoch and seeds every adapter state.
    InitialData {
        start_time: f64,
        #[serde(default)]
        summary: Summary,
    },

    /// Full-replacement snapshot of all known adapters.
    MetricsUpdate {
        #[serde(default)]
        timestamp: Option<String>,
        data: UpdatePayload,
    },

    /// Snapshot without the update envelope (reply to `get_summary`).
    Summary {
        #[serde(default)]
        summary: Summary,
    },

    /// Run-state transition, optionally carrying a snapshot.
    Status {
        test_running: bool,
        #[serde(default)]
        summary: Option<Summary>,
        #[serde(default)]
        timestamp: Option<String>,
    },

    /// Terminal notification for the current run.
    TestComplete {
        #[serde(default)]
        message: String,
    },

    /// Any frame type the dashboard does not handle (pong, subscribe
    /// acks, ...). Tolerated and dropped.
    #[serde(other)]
    Unknown,
}

/// Outbound frames the dashboard sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Request the initial state, sent once after the settle delay.
    GetInitialData,
    /// Re-request the latest snapshot.
    GetSummary,
    /// Transport keepalive.
    Ping,
}

/// Parse a server timestamp.
///
/// The backend emits `datetime.isoformat()` strings, which carry no UTC
/// offset; RFC 3339 strings are accepted too for robustness.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert a unix-seconds float (the backend's `time.time()`) to a UTC instant.
pub fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_initial_data() {
        let json = r#"{
            "type": "initial_data",
            "start_time": 1700000000.5,
            "summary": {
                "binance": {
                    "avg_latency_ms": 10.0,
                    "success_rate": 1.0,
                    "is_connected": true,
                    "messages_received": 42
                }
            }
        }"#;

        let msg: Inbound = serde_json::from_str(json).unwrap();
        let Inbound::InitialData { start_time, summary } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(start_time, 1700000000.5);
        let binance = summary.get("binance").unwrap();
        assert_eq!(binance.avg_latency_ms, 10.0);
        assert_eq!(binance.success_rate, 1.0);
        assert!(binance.is_connected);
        assert_eq!(binance.messages_received, 42);
    }

    #[test]
    fn test_decode_metrics_update_envelope() {
        let json = r#"{
            "type": "metrics_update",
            "timestamp": "2024-01-01T00:00:01.500000",
            "data": {
                "summary": {
                    "polymarket": {"avg_latency_ms": 25.5, "success_rate": 0.98}
                },
                "test_info": {"start_time": 1700000000.0, "status": "running"}
            }
        }"#;

        let msg: Inbound = serde_json::from_str(json).unwrap();
        let Inbound::MetricsUpdate { timestamp, data } = msg else {
            panic!("wrong variant");
        };
        assert!(timestamp.is_some());
        assert_eq!(data.summary.get("polymarket").unwrap().avg_latency_ms, 25.5);
        assert_eq!(data.test_info.unwrap().start_time, Some(1700000000.0));
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"{"type": "summary", "summary": {"deribit": {}}}"#;
        let msg: Inbound = serde_json::from_str(json).unwrap();
        let Inbound::Summary { summary } = msg else {
            panic!("wrong variant");
        };
        let m = summary.get("deribit").unwrap();
        assert_eq!(m.avg_latency_ms, 0.0);
        assert_eq!(m.success_rate, 0.0);
        assert!(!m.is_connected);
    }

    #[test]
    fn test_open_schema_extras() {
        let json = r#"{
            "type": "summary",
            "summary": {"binance": {"orderbook_count": 17, "avg_latency_ms": 1.0}}
        }"#;
        let msg: Inbound = serde_json::from_str(json).unwrap();
        let Inbound::Summary { summary } = msg else {
            panic!("wrong variant");
        };
        let m = summary.get("binance").unwrap();
        assert_eq!(m.numeric("orderbook_count"), Some(17.0));
        assert_eq!(m.numeric("avg_latency_ms"), Some(1.0));
        assert_eq!(m.numeric("no_such_metric"), None);
    }

    #[test]
    fn test_unknown_frame_type_tolerated() {
        let msg: Inbound = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert!(matches!(msg, Inbound::Unknown));
    }

    #[test]
    fn test_status_frame() {
        let json = r#"{"type": "status", "test_running": true, "summary": {}}"#;
        let msg: Inbound = serde_json::from_str(json).unwrap();
        let Inbound::Status { test_running, summary, .. } = msg else {
            panic!("wrong variant");
        };
        assert!(test_running);
        assert!(summary.is_some());
    }

    #[test]
    fn test_outbound_tags() {
        let json = serde_json::to_string(&Outbound::GetInitialData).unwrap();
        assert_eq!(json, r#"{"type":"get_initial_data"}"#);
    }

    #[test]
    fn test_parse_timestamp_isoformat() {
        // Python isoformat has no offset
        let dt = parse_timestamp("2024-01-01T12:30:00.250000").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);

        // RFC 3339 accepted too
        assert!(parse_timestamp("2024-01-01T12:30:00+00:00").is_some());
        assert!(parse_timestamp("garbage").is_none());
    }

    #[test]
    fn test_from_unix_seconds() {
        let dt = from_unix_seconds(1700000000.5).unwrap();
        assert_eq!(dt.timestamp(), 1700000000);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }
}
