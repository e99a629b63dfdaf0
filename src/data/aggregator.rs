//! Snapshot aggregation: per-adapter state and bounded time series.
//!
//! [`MetricsAggregator`] is the single place inbound snapshots are merged.
//! It performs pure state transitions — no I/O, no clocks of its own; the
//! caller supplies the receive instant — so every property is directly
//! testable.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::data::series::{SeriesBuffer, SeriesKind};
use crate::protocol::{self, AdapterMetrics, Inbound, Summary};

/// Latest known state for one data-feed adapter.
///
/// Created lazily on first reference to an unseen adapter id and retained
/// for the life of the process. On transport loss the metric values are
/// frozen as-is; only `connected` is forced false.
#[derive(Debug, Clone)]
pub struct AdapterState {
    pub id: String,
    pub metrics: AdapterMetrics,
    /// Non-decreasing per adapter.
    pub last_update: DateTime<Utc>,
    pub connected: bool,
}

/// Outcome of applying one inbound frame.
#[derive(Debug, Default)]
pub struct Applied {
    /// Whether any adapter state or series changed.
    pub data_changed: bool,
    /// Whether the run-state flag flipped.
    pub run_state_changed: bool,
    /// Completion message from a `test_complete` frame.
    pub completed: Option<String>,
}

/// Merges inbound snapshots into adapter states and series buffers.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    adapters: BTreeMap<String, AdapterState>,
    series: BTreeMap<String, BTreeMap<SeriesKind, SeriesBuffer>>,
    /// Reference instant for elapsed-seconds x-axes. Set by the first
    /// merge, or explicitly by `initial_data.start_time`.
    epoch: Option<DateTime<Utc>>,
    /// Instant of the newest merged snapshot, for last-write-wins when
    /// the fallback poller races the socket.
    last_merge: Option<DateTime<Utc>>,
    test_running: bool,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound frame received at `now`.
    pub fn apply(&mut self, msg: &Inbound, now: DateTime<Utc>) -> Applied {
        let mut outcome = Applied::default();
        match msg {
            Inbound::InitialData { start_time, summary } => {
                let epoch = protocol::from_unix_seconds(*start_time).unwrap_or(now);
                if self.epoch != Some(epoch) {
                    // New run: stale series must not leak into its charts,
                    // and frames merged before the reply arrived must not
                    // shadow the seed summary.
                    self.epoch = Some(epoch);
                    self.series.clear();
                    self.last_merge = None;
                    outcome.data_changed = true;
                }
                outcome.data_changed |= self.merge_snapshot(summary, epoch);
            }
            Inbound::MetricsUpdate { timestamp, data } => {
                let at = timestamp
                    .as_deref()
                    .and_then(protocol::parse_timestamp)
                    .unwrap_or(now);
                if self.epoch.is_none() {
                    if let Some(start) =
                        data.test_info.as_ref().and_then(|info| info.start_time)
                    {
                        self.epoch = protocol::from_unix_seconds(start);
                    }
                }
                outcome.data_changed = self.merge_snapshot(&data.summary, at);
            }
            Inbound::Summary { summary } => {
                outcome.data_changed = self.merge_snapshot(summary, now);
            }
            Inbound::Status { test_running, summary, timestamp } => {
                if self.test_running != *test_running {
                    self.test_running = *test_running;
                    outcome.run_state_changed = true;
                }
                if let Some(summary) = summary {
                    let at = timestamp
                        .as_deref()
                        .and_then(protocol::parse_timestamp)
                        .unwrap_or(now);
                    outcome.data_changed = self.merge_snapshot(summary, at);
                }
            }
            Inbound::TestComplete { message } => {
                if self.test_running {
                    self.test_running = false;
                    outcome.run_state_changed = true;
                }
                outcome.completed = Some(message.clone());
            }
            Inbound::Unknown => {}
        }
        outcome
    }

    /// Merge a full-replacement snapshot taken at `at`.
    ///
    /// Returns whether anything changed. Snapshots older than the newest
    /// merged one are skipped (last-write-wins); a redelivered snapshot
    /// (same instant, same values) merges idempotently without appending
    /// duplicate series points.
    pub fn merge_snapshot(&mut self, summary: &Summary, at: DateTime<Utc>) -> bool {
        if summary.is_empty() {
            return false;
        }
        if let Some(last) = self.last_merge {
            if at < last {
                debug!(at = %at, last = %last, "skipping stale snapshot");
                return false;
            }
        }

        let epoch = *self.epoch.get_or_insert(at);
        let x = elapsed_seconds(epoch, at);
        let mut changed = false;

        for (id, metrics) in summary {
            let known = self.adapters.contains_key(id);
            let state = self.adapters.entry(id.clone()).or_insert_with(|| AdapterState {
                id: id.clone(),
                metrics: AdapterMetrics::default(),
                last_update: at,
                connected: false,
            });

            // Idempotent redelivery: same instant, same values, no-op.
            if known && state.last_update == at && state.metrics == *metrics {
                continue;
            }

            state.connected = metrics.is_connected;
            state.metrics = metrics.clone();
            if at > state.last_update {
                state.last_update = at;
            }

            let buffers = self.series.entry(id.clone()).or_default();
            buffers
                .entry(SeriesKind::Latency)
                .or_insert_with(SeriesBuffer::new)
                .push(x, metrics.avg_latency_ms);
            buffers
                .entry(SeriesKind::SuccessRate)
                .or_insert_with(SeriesBuffer::new)
                .push(x, metrics.success_rate);
            changed = true;
        }

        if changed {
            self.last_merge = Some(self.last_merge.map_or(at, |last| last.max(at)));
        }
        changed
    }

    /// Force every adapter's connectivity flag false. Called when the
    /// transport enters Disconnected; metric values are left frozen.
    pub fn mark_all_disconnected(&mut self) -> bool {
        let mut changed = false;
        for state in self.adapters.values_mut() {
            if state.connected {
                state.connected = false;
                changed = true;
            }
        }
        changed
    }

    pub fn adapters(&self) -> impl Iterator<Item = &AdapterState> {
        self.adapters.values()
    }

    pub fn adapter(&self, id: &str) -> Option<&AdapterState> {
        self.adapters.get(id)
    }

    pub fn adapter_ids(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn series(&self, id: &str, kind: SeriesKind) -> Option<&SeriesBuffer> {
        self.series.get(id).and_then(|kinds| kinds.get(&kind))
    }

    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        self.epoch
    }

    /// Elapsed run time since the epoch, if one is established.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.epoch.map(|epoch| (now - epoch).max(Duration::zero()))
    }

    pub fn test_running(&self) -> bool {
        self.test_running
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

fn elapsed_seconds(epoch: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    ((at - epoch).num_milliseconds() as f64 / 1000.0).max(0.0)
}
