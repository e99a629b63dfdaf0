//! Data models and processing for metric snapshots.
//!
//! This module turns raw wire snapshots into aggregated adapter state,
//! bounded time series, and UI-ready presentation values.
//!
//! ## Submodules
//!
//! - [`aggregator`]: Merges inbound snapshots into per-adapter state and series
//! - [`present`]: Projects aggregator + connection state into formatted fields
//! - [`schema`]: Per-adapter display schemas and tone classification rules
//! - [`series`]: Bounded FIFO time-series buffers for charting
//!
//! ## Data Flow
//!
//! ```text
//! Inbound (wire JSON)
//!        │
//!        ▼
//! MetricsAggregator::apply()
//!        │
//!        ├──▶ AdapterState (latest metrics, connectivity)
//!        │
//!        └──▶ SeriesBuffer (elapsed-seconds points for charts)
//!                  │
//!                  ▼
//! PresentationState::project()  (via SchemaRegistry tone rules)
//! ```

pub mod aggregator;
pub mod present;
pub mod schema;
pub mod series;

pub use aggregator::{AdapterState, MetricsAggregator};
pub use present::{AdapterCard, Badges, PresentationState, RunState};
pub use schema::{AdapterSchema, SchemaRegistry, Tone, ToneSpec};
pub use series::{SeriesBuffer, SeriesKind};
