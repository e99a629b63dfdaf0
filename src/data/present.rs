//! Projection of aggregator + connection state into UI-ready fields.
//!
//! Nothing here touches ratatui: values come out formatted as strings
//! with semantic [`Tone`]s, and the theme maps tones to colors at draw
//! time. This keeps the projection testable without a terminal.

use chrono::{DateTime, Duration, Utc};

use crate::connection::ConnectionState;
use crate::data::aggregator::{AdapterState, MetricsAggregator};
use crate::data::schema::{latency_spec, SchemaRegistry, Tone};
use crate::store::PersistenceStore;

/// Whether the server-side stress test is currently producing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    TestRunning,
    #[default]
    TestStopped,
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            RunState::TestRunning => "RUNNING",
            RunState::TestStopped => "STOPPED",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            RunState::TestRunning => Tone::Good,
            RunState::TestStopped => Tone::Neutral,
        }
    }
}

/// Coarse status badges shown in the header. The two axes are
/// independent; all four combinations are valid and displayable.
#[derive(Debug, Clone, Copy)]
pub struct Badges {
    pub connection: ConnectionState,
    pub run: RunState,
}

impl Badges {
    pub fn connection_label(&self) -> &'static str {
        match self.connection {
            ConnectionState::Connected => "LIVE",
            ConnectionState::Connecting => "RECONNECTING",
            ConnectionState::Disconnected => "OFFLINE",
        }
    }

    pub fn connection_tone(&self) -> Tone {
        match self.connection {
            ConnectionState::Connected => Tone::Good,
            ConnectionState::Connecting => Tone::Warning,
            ConnectionState::Disconnected => Tone::Critical,
        }
    }
}

/// One formatted metric on an adapter card.
#[derive(Debug, Clone)]
pub struct MetricField {
    pub label: &'static str,
    pub value: String,
    pub tone: Tone,
}

/// UI-ready card for one adapter.
#[derive(Debug, Clone)]
pub struct AdapterCard {
    pub id: String,
    pub display_name: String,
    pub accent: Tone,
    pub connected: bool,
    /// Seconds since the adapter last reported, if it ever has.
    pub age_seconds: Option<i64>,
    pub fields: Vec<MetricField>,
    pub collapsed: bool,
    /// False when the card came from the generic fallback schema.
    pub declared: bool,
}

/// Complete projection of the dashboard's presentation state.
#[derive(Debug, Clone)]
pub struct PresentationState {
    pub badges: Badges,
    /// Elapsed run time as "HH:MM:SS", once an epoch exists.
    pub elapsed: Option<String>,
    pub cards: Vec<AdapterCard>,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self {
            badges: Badges {
                connection: ConnectionState::Disconnected,
                run: RunState::TestStopped,
            },
            elapsed: None,
            cards: Vec::new(),
        }
    }
}

impl PresentationState {
    /// Project the current aggregator and connection state.
    pub fn project(
        aggregator: &MetricsAggregator,
        connection: ConnectionState,
        schemas: &SchemaRegistry,
        store: &dyn PersistenceStore,
        now: DateTime<Utc>,
    ) -> Self {
        let run = if aggregator.test_running() {
            RunState::TestRunning
        } else {
            RunState::TestStopped
        };

        let cards = aggregator
            .adapters()
            .map(|state| build_card(state, schemas, store, now))
            .collect();

        Self {
            badges: Badges { connection, run },
            elapsed: aggregator.elapsed(now).map(format_elapsed),
            cards,
        }
    }

    pub fn card(&self, id: &str) -> Option<&AdapterCard> {
        self.cards.iter().find(|c| c.id == id)
    }
}

/// Key under which a panel's collapse preference is persisted.
pub fn collapse_key(adapter_id: &str) -> String {
    format!("panel.{adapter_id}.collapsed")
}

fn build_card(
    state: &AdapterState,
    schemas: &SchemaRegistry,
    store: &dyn PersistenceStore,
    now: DateTime<Utc>,
) -> AdapterCard {
    let schema = schemas.resolve(&state.id);
    let collapsed = store
        .get(&collapse_key(&state.id))
        .map(|v| v == "true")
        .unwrap_or(false);

    let mut fields = Vec::with_capacity(schema.metrics.len());
    for spec in &schema.metrics {
        let Some(raw) = state.metrics.numeric(spec.key) else {
            if spec.optional {
                continue;
            }
            fields.push(MetricField {
                label: spec.label,
                value: "-".to_string(),
                tone: Tone::Neutral,
            });
            continue;
        };

        // Adapter-supplied latency bounds override the schema defaults.
        let tone = if spec.key == "avg_latency_ms" {
            match (state.metrics.latency_good_ms, state.metrics.latency_warn_ms) {
                (Some(good), Some(warn)) => latency_spec(good, warn).classify(raw),
                _ => spec.tone.classify(raw),
            }
        } else {
            spec.tone.classify(raw)
        };

        fields.push(MetricField {
            label: spec.label,
            value: format!("{:.*}{}", spec.precision, raw * spec.scale, spec.unit),
            tone,
        });
    }

    AdapterCard {
        id: state.id.clone(),
        display_name: schema.display_name.clone(),
        accent: schema.accent,
        connected: state.connected,
        age_seconds: Some((now - state.last_update).num_seconds().max(0)),
        fields,
        collapsed,
        declared: schemas.is_declared(&state.id),
    }
}

/// Format a duration as "HH:MM:SS".
pub fn format_elapsed(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregator::MetricsAggregator;
    use crate::protocol::{AdapterMetrics, Summary};
    use crate::store::MemoryStore;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn aggregator_with(id: &str, metrics: AdapterMetrics) -> MetricsAggregator {
        let mut summary = Summary::new();
        summary.insert(id.to_string(), metrics);
        let mut agg = MetricsAggregator::new();
        agg.merge_snapshot(&summary, at(0));
        agg
    }

    #[test]
    fn test_success_rate_surfaced_times_100() {
        let agg = aggregator_with(
            "binance",
            AdapterMetrics { success_rate: 0.987, ..AdapterMetrics::default() },
        );
        let state = PresentationState::project(
            &agg,
            ConnectionState::Connected,
            &SchemaRegistry::builtin(),
            &MemoryStore::new(),
            at(1),
        );
        let card = state.card("binance").unwrap();
        let field = card.fields.iter().find(|f| f.label == "Success rate").unwrap();
        assert_eq!(field.value, "98.7%");
    }

    #[test]
    fn test_adapter_latency_bounds_override_defaults() {
        // 100 ms is Warning under the fixed defaults, but this adapter
        // declares a looser good bound.
        let agg = aggregator_with(
            "binance",
            AdapterMetrics {
                avg_latency_ms: 100.0,
                latency_good_ms: Some(150.0),
                latency_warn_ms: Some(300.0),
                ..AdapterMetrics::default()
            },
        );
        let state = PresentationState::project(
            &agg,
            ConnectionState::Connected,
            &SchemaRegistry::builtin(),
            &MemoryStore::new(),
            at(1),
        );
        let card = state.card("binance").unwrap();
        let field = card.fields.iter().find(|f| f.label == "Avg latency").unwrap();
        assert_eq!(field.tone, Tone::Good);
    }

    #[test]
    fn test_unknown_adapter_gets_generic_card() {
        let agg = aggregator_with("kraken", AdapterMetrics::default());
        let state = PresentationState::project(
            &agg,
            ConnectionState::Connected,
            &SchemaRegistry::builtin(),
            &MemoryStore::new(),
            at(1),
        );
        let card = state.card("kraken").unwrap();
        assert_eq!(card.display_name, "KRAKEN");
        assert!(card.fields.is_empty());
        assert!(!card.declared);
    }

    #[test]
    fn test_all_four_badge_combinations_valid() {
        let connections = [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ];
        for connection in connections {
            for run in [RunState::TestRunning, RunState::TestStopped] {
                let badges = Badges { connection, run };
                assert!(!badges.connection_label().is_empty());
                assert!(!run.label().is_empty());
            }
        }
    }

    #[test]
    fn test_collapse_preference_read_from_store() {
        let agg = aggregator_with("binance", AdapterMetrics::default());
        let mut store = MemoryStore::new();
        store.set(&collapse_key("binance"), "true");

        let state = PresentationState::project(
            &agg,
            ConnectionState::Connected,
            &SchemaRegistry::builtin(),
            &store,
            at(1),
        );
        assert!(state.card("binance").unwrap().collapsed);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::seconds(61)), "00:01:01");
        assert_eq!(format_elapsed(Duration::seconds(3_725)), "01:02:05");
    }

    #[test]
    fn test_optional_metric_skipped_when_absent() {
        let agg = aggregator_with("binance", AdapterMetrics::default());
        let state = PresentationState::project(
            &agg,
            ConnectionState::Connected,
            &SchemaRegistry::builtin(),
            &MemoryStore::new(),
            at(1),
        );
        let card = state.card("binance").unwrap();
        assert!(card.fields.iter().all(|f| f.label != "Validation"));
        assert!(card.fields.iter().all(|f| f.label != "Transitions/min"));
    }
}
