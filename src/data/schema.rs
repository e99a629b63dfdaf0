//! Per-adapter display schemas and tone classification rules.
//!
//! The dashboard renders every adapter through one parameterized code
//! path; what differs per adapter (display name, which metrics appear on
//! its card, how values are colored) is declared here as data. Unknown
//! adapter ids fall back to a generic schema rather than failing.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::data::series::SeriesKind;

/// Semantic color for a displayed value. The theme maps tones to actual
/// terminal colors at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    Good,
    Warning,
    Critical,
    Accent,
    #[default]
    Neutral,
}

/// Comparator for conditional tone rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparator {
    fn eval(&self, value: f64, rhs: f64) -> bool {
        match self {
            Comparator::Lt => value < rhs,
            Comparator::Le => value <= rhs,
            Comparator::Gt => value > rhs,
            Comparator::Ge => value >= rhs,
            Comparator::Eq => (value - rhs).abs() < f64::EPSILON,
        }
    }
}

/// A single comparator rule in a conditional ladder.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalRule {
    pub cmp: Comparator,
    pub value: f64,
    pub tone: Tone,
}

/// A minimum-bound rule in a threshold ladder. Ladders are evaluated in
/// descending order of `min`; the first bound the value reaches wins.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdRule {
    pub min: f64,
    pub tone: Tone,
}

/// Declarative tone specification for one metric.
///
/// Categories are consulted in strict priority order: a static tone wins
/// outright; otherwise the conditional ladder (first match); otherwise
/// the threshold ladder; otherwise the fallback. Once a higher-priority
/// category matches, lower ones are never consulted.
#[derive(Debug, Clone, Default)]
pub struct ToneSpec {
    pub static_tone: Option<Tone>,
    pub conditions: Vec<ConditionalRule>,
    pub thresholds: Vec<ThresholdRule>,
    pub fallback: Tone,
}

impl ToneSpec {
    pub fn fixed(tone: Tone) -> Self {
        Self { static_tone: Some(tone), ..Self::default() }
    }

    /// Classify a value through the rule ladder.
    pub fn classify(&self, value: f64) -> Tone {
        if let Some(tone) = self.static_tone {
            return tone;
        }
        for rule in &self.conditions {
            if rule.cmp.eval(value, rule.value) {
                return rule.tone;
            }
        }
        let mut ladder: Vec<&ThresholdRule> = self.thresholds.iter().collect();
        ladder.sort_by(|a, b| b.min.total_cmp(&a.min));
        for rule in ladder {
            if value >= rule.min {
                return rule.tone;
            }
        }
        self.fallback
    }
}

/// Default latency classification bounds (ms), used when the adapter
/// does not supply its own good/warning pair.
pub const LATENCY_GOOD_MS: f64 = 50.0;
pub const LATENCY_WARN_MS: f64 = 200.0;

/// Latency tone spec from a good/warning threshold pair.
pub fn latency_spec(good_ms: f64, warn_ms: f64) -> ToneSpec {
    ToneSpec {
        conditions: vec![
            ConditionalRule { cmp: Comparator::Le, value: good_ms, tone: Tone::Good },
            ConditionalRule { cmp: Comparator::Le, value: warn_ms, tone: Tone::Warning },
        ],
        fallback: Tone::Critical,
        ..ToneSpec::default()
    }
}

/// Success-rate tone spec over a [0, 1] fraction.
fn success_spec() -> ToneSpec {
    ToneSpec {
        thresholds: vec![
            ThresholdRule { min: 0.99, tone: Tone::Good },
            ThresholdRule { min: 0.95, tone: Tone::Warning },
        ],
        fallback: Tone::Critical,
        ..ToneSpec::default()
    }
}

/// How one metric appears on an adapter card.
#[derive(Debug, Clone)]
pub struct MetricSpec {
    /// Wire key the value is read from.
    pub key: &'static str,
    pub label: &'static str,
    /// Multiplier applied before formatting (e.g. 100 for fractions).
    pub scale: f64,
    /// Decimal places.
    pub precision: usize,
    pub unit: &'static str,
    pub tone: ToneSpec,
    /// Metrics absent from a snapshot are skipped when optional,
    /// rendered as zero otherwise.
    pub optional: bool,
}

impl MetricSpec {
    fn required(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            scale: 1.0,
            precision: 0,
            unit: "",
            tone: ToneSpec::default(),
            optional: false,
        }
    }

    fn optional(key: &'static str, label: &'static str) -> Self {
        Self { optional: true, ..Self::required(key, label) }
    }
}

/// Display configuration for one adapter id.
#[derive(Debug, Clone)]
pub struct AdapterSchema {
    pub display_name: String,
    pub accent: Tone,
    pub metrics: Vec<MetricSpec>,
    /// Which series get chart panels.
    pub chart_series: Vec<SeriesKind>,
}

impl AdapterSchema {
    /// Generic projection for an adapter id with no declared schema:
    /// uppercased id, default tone, empty metric set.
    pub fn generic(id: &str) -> Self {
        Self {
            display_name: id.to_uppercase(),
            accent: Tone::Neutral,
            metrics: Vec::new(),
            chart_series: SeriesKind::ALL.to_vec(),
        }
    }
}

fn core_metrics(latency_good_ms: f64, latency_warn_ms: f64) -> Vec<MetricSpec> {
    vec![
        MetricSpec {
            precision: 1,
            unit: " ms",
            tone: latency_spec(latency_good_ms, latency_warn_ms),
            ..MetricSpec::required("avg_latency_ms", "Avg latency")
        },
        MetricSpec {
            scale: 100.0,
            precision: 1,
            unit: "%",
            tone: success_spec(),
            ..MetricSpec::required("success_rate", "Success rate")
        },
        MetricSpec::required("messages_received", "Messages"),
        MetricSpec {
            tone: ToneSpec {
                conditions: vec![ConditionalRule {
                    cmp: Comparator::Eq,
                    value: 0.0,
                    tone: Tone::Good,
                }],
                fallback: Tone::Warning,
                ..ToneSpec::default()
            },
            ..MetricSpec::required("connection_errors", "Conn errors")
        },
        MetricSpec {
            precision: 1,
            ..MetricSpec::optional("recent_transitions_per_minute", "Transitions/min")
        },
    ]
}

/// Registry of adapter display schemas, keyed by adapter id.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, AdapterSchema>,
}

impl SchemaRegistry {
    /// The built-in schemas for the adapters the monitor ships with.
    pub fn builtin() -> Self {
        Self::builtin_with_latency(LATENCY_GOOD_MS, LATENCY_WARN_MS)
    }

    /// Built-in schemas with overridden default latency bounds (ms).
    /// Adapter-supplied bounds in a snapshot still take precedence.
    pub fn builtin_with_latency(good_ms: f64, warn_ms: f64) -> Self {
        let mut schemas = BTreeMap::new();

        let mut binance_metrics = core_metrics(good_ms, warn_ms);
        binance_metrics.push(MetricSpec {
            scale: 100.0,
            precision: 1,
            unit: "%",
            tone: success_spec(),
            ..MetricSpec::optional("validation_success_rate", "Validation")
        });
        schemas.insert(
            "binance".to_string(),
            AdapterSchema {
                display_name: "Binance".to_string(),
                accent: Tone::Accent,
                metrics: binance_metrics,
                chart_series: SeriesKind::ALL.to_vec(),
            },
        );

        let mut polymarket_metrics = core_metrics(good_ms, warn_ms);
        polymarket_metrics.push(MetricSpec::optional("orderbook_updates", "Orderbooks"));
        polymarket_metrics.push(MetricSpec::optional("trade_updates", "Trades"));
        schemas.insert(
            "polymarket".to_string(),
            AdapterSchema {
                display_name: "Polymarket".to_string(),
                accent: Tone::Accent,
                metrics: polymarket_metrics,
                chart_series: SeriesKind::ALL.to_vec(),
            },
        );

        Self { schemas }
    }

    pub fn insert(&mut self, id: impl Into<String>, schema: AdapterSchema) {
        self.schemas.insert(id.into(), schema);
    }

    /// Resolve the schema for an adapter id, falling back to the generic
    /// projection for ids nobody declared.
    pub fn resolve(&self, id: &str) -> Cow<'_, AdapterSchema> {
        match self.schemas.get(id) {
            Some(schema) => Cow::Borrowed(schema),
            None => Cow::Owned(AdapterSchema::generic(id)),
        }
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }
}
