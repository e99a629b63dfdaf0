//! REST fallback polling.
//!
//! When the websocket is down the dashboard still refreshes from the
//! monitor's HTTP endpoints (`/api/status` and `/api/metrics`). The
//! poller runs as a background task and emits the same [`Inbound`]
//! values the socket would, so the aggregator does not care where a
//! snapshot came from. Polling errors are expected while the server is
//! unreachable and are logged at debug only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{Inbound, Summary};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    test_running: bool,
    #[serde(default)]
    summary: Option<Summary>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// UI-thread handle to the background REST poller.
pub struct FallbackPoller {
    event_rx: mpsc::UnboundedReceiver<Inbound>,
    enabled: Arc<AtomicBool>,
}

impl FallbackPoller {
    /// Spawn the polling task against `base_url` (no trailing slash).
    /// The poller starts paused; it is resumed while the socket is down.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(base_url: impl Into<String>, interval: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let enabled = Arc::new(AtomicBool::new(false));
        tokio::spawn(poll_loop(
            base_url.into(),
            interval,
            Arc::clone(&enabled),
            event_tx,
        ));
        Self { event_rx, enabled }
    }

    pub fn resume(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Drain whatever the poller has produced since the last call.
    pub fn poll_events(&mut self) -> Vec<Inbound> {
        let mut drained = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            drained.push(event);
        }
        drained
    }
}

async fn poll_loop(
    base_url: String,
    interval: Duration,
    enabled: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<Inbound>,
) {
    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if event_tx.is_closed() {
            return;
        }
        if !enabled.load(Ordering::Relaxed) {
            continue;
        }

        match fetch_status(&client, &base_url).await {
            Ok(status) => {
                let event = Inbound::Status {
                    test_running: status.test_running,
                    summary: status.summary,
                    timestamp: Some(
                        status.timestamp.unwrap_or_else(|| Utc::now().to_rfc3339()),
                    ),
                };
                if event_tx.send(event).is_err() {
                    return;
                }
            }
            Err(err) => debug!(error = %err, "status poll failed"),
        }

        match fetch_metrics(&client, &base_url).await {
            Ok(summary) => {
                if event_tx.send(Inbound::Summary { summary }).is_err() {
                    return;
                }
            }
            Err(err) => debug!(error = %err, "metrics poll failed"),
        }
    }
}

async fn fetch_status(client: &reqwest::Client, base_url: &str) -> anyhow::Result<StatusResponse> {
    let response = client
        .get(format!("{base_url}/api/status"))
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

async fn fetch_metrics(client: &reqwest::Client, base_url: &str) -> anyhow::Result<Summary> {
    let response = client
        .get(format!("{base_url}/api/metrics"))
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}
