// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # feedwatch
//!
//! A terminal dashboard and library for watching live market data-feed
//! adapters during stress-test runs.
//!
//! The dashboard keeps a duplex WebSocket to the monitor server,
//! aggregates the per-adapter metric snapshots it streams, and renders
//! cards and rolling charts in the terminal. When the socket is down it
//! falls back to polling the monitor's REST endpoints, so the display
//! degrades rather than freezing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Application                           │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal│  │
//! │  │ (state) │    │(pipeline)│    │(render) │    │         │  │
//! │  └────┬────┘    └──────────┘    └─────────┘    └─────────┘  │
//! │       │                                                      │
//! │       ├──▶ connection (WebSocket transport + retry)          │
//! │       └──▶ poll       (REST fallback while socket is down)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view navigation, and the per-frame
//!   event pump that is the single mutation point for the data pipeline
//! - **[`connection`]**: Background WebSocket transport with bounded
//!   automatic reconnects, driven through a command/event channel pair
//! - **[`poll`]**: REST fallback poller producing the same wire messages
//!   the socket would
//! - **[`protocol`]**: Wire message types shared by the socket and poller
//! - **[`data`]**: Snapshot aggregation, bounded series buffers, display
//!   schemas, and the UI-ready presentation projection
//! - **[`render`]**: Fingerprint-gated chart rebuild scheduling
//! - **[`store`]**: Persistence and notification collaborator traits
//! - **[`ui`]**: Terminal rendering using ratatui
//!
//! ## Usage
//!
//! ```bash
//! # Watch a monitor server
//! feedwatch --url ws://localhost:8000/ws
//!
//! # With REST fallback and a persisted-state file
//! feedwatch --url ws://localhost:8000/ws \
//!     --poll-url http://localhost:8000 --state-file ~/.feedwatch.json
//! ```

pub mod app;
pub mod connection;
pub mod data;
pub mod events;
pub mod poll;
pub mod protocol;
pub mod render;
pub mod store;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState, RetryPolicy};
pub use data::{MetricsAggregator, PresentationState, SchemaRegistry};
pub use poll::FallbackPoller;
pub use protocol::{AdapterMetrics, Inbound, Outbound, Summary};
pub use render::RenderScheduler;
pub use store::{
    JsonFileStore, MemoryStore, NoticeLevel, NotificationSink, PersistenceStore,
    StatusLineSink,
};
