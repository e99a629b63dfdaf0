//! Chart rebuild scheduling.
//!
//! Chart panels are expensive to rebuild relative to how often metrics
//! arrive, so each panel is guarded by a fingerprint over the tail of
//! its series. A snapshot only marks a panel for rebuild when the
//! fingerprint actually changes; the rebuild itself tears the old chart
//! down before constructing the replacement, so a failed build never
//! leaves a stale chart behind.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use thiserror::Error;
use tracing::warn;

use crate::data::series::{SeriesBuffer, SeriesKind, FINGERPRINT_TAIL};

/// Identifier for one chart panel: an adapter id plus a series kind.
pub fn panel_id(adapter_id: &str, kind: SeriesKind) -> String {
    format!("{adapter_id}:{}", kind.slug())
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    /// The series has no points yet; the panel shows a placeholder.
    #[error("no data points for panel {0}")]
    NoData(String),
}

/// Immutable snapshot of everything the chart widget needs to draw.
#[derive(Debug, Clone)]
pub struct ChartModel {
    pub title: String,
    pub kind: SeriesKind,
    pub points: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl ChartModel {
    /// Build a model from a series buffer. Success-rate values are
    /// scaled to percent here so the widget draws them as displayed.
    pub fn from_series(
        panel: &str,
        title: impl Into<String>,
        kind: SeriesKind,
        series: &SeriesBuffer,
    ) -> Result<Self, RenderError> {
        if series.is_empty() {
            return Err(RenderError::NoData(panel.to_string()));
        }
        let scale = match kind {
            SeriesKind::Latency => 1.0,
            SeriesKind::SuccessRate => 100.0,
        };
        let points: Vec<(f64, f64)> =
            series.iter().map(|(x, y)| (x, y * scale)).collect();

        let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
        let x_max = points.last().map(|p| p.0).unwrap_or(0.0);
        let y_bounds = match kind {
            SeriesKind::SuccessRate => [0.0, 100.0],
            SeriesKind::Latency => {
                let max = points.iter().map(|p| p.1).fold(0.0_f64, f64::max);
                [0.0, (max * 1.2).max(10.0)]
            }
        };

        Ok(Self {
            title: title.into(),
            kind,
            points,
            // Keep a minimum span so early charts do not degenerate.
            x_bounds: [x_min, x_max.max(x_min + 60.0)],
            y_bounds,
        })
    }
}

/// Fingerprint of the tail of a series, cheap to compare between
/// snapshots. Covers the last [`FINGERPRINT_TAIL`] points; x values are
/// rounded to whole seconds and y to three decimals so float jitter
/// below display resolution does not force a rebuild.
pub fn fingerprint(kind: SeriesKind, series: &SeriesBuffer) -> String {
    let mut out = String::from(kind.slug());
    for (x, y) in series.tail(FINGERPRINT_TAIL) {
        let _ = write!(out, ";{x:.0}:{y:.3}");
    }
    out
}

/// Decides which panels need their chart rebuilt, and owns the built
/// chart models.
#[derive(Default)]
pub struct RenderScheduler {
    fingerprints: HashMap<String, String>,
    charts: HashMap<String, ChartModel>,
    pending: HashSet<String>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest fingerprint for `panel`. Returns true and marks
    /// the panel pending when the fingerprint changed.
    pub fn should_render(&mut self, panel: &str, fingerprint: String) -> bool {
        if self.fingerprints.get(panel) == Some(&fingerprint) {
            return false;
        }
        self.fingerprints.insert(panel.to_string(), fingerprint);
        self.pending.insert(panel.to_string());
        true
    }

    /// Panels marked for rebuild, draining the pending set.
    pub fn take_pending(&mut self) -> Vec<String> {
        let mut panels: Vec<String> = self.pending.drain().collect();
        panels.sort();
        panels
    }

    /// Rebuild one panel. The existing chart is destroyed before the
    /// replacement is built; on failure the panel is left empty (the UI
    /// shows a placeholder) and the next fingerprint change retries.
    pub fn rebuild(
        &mut self,
        panel: &str,
        build: impl FnOnce() -> Result<ChartModel, RenderError>,
    ) -> Result<(), RenderError> {
        self.charts.remove(panel);
        match build() {
            Ok(model) => {
                self.charts.insert(panel.to_string(), model);
                Ok(())
            }
            Err(err) => {
                warn!(panel, error = %err, "chart rebuild failed");
                // Forget the fingerprint so the same snapshot can retry.
                self.fingerprints.remove(panel);
                Err(err)
            }
        }
    }

    pub fn chart(&self, panel: &str) -> Option<&ChartModel> {
        self.charts.get(panel)
    }

    /// Drop all state for a panel, e.g. when its adapter disappears.
    pub fn teardown(&mut self, panel: &str) {
        self.fingerprints.remove(panel);
        self.charts.remove(panel);
        self.pending.remove(panel);
    }

    /// Drop everything, e.g. when the series buffers were reset.
    pub fn clear(&mut self) {
        self.fingerprints.clear();
        self.charts.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with(points: &[(f64, f64)]) -> SeriesBuffer {
        let mut s = SeriesBuffer::new();
        for &(x, y) in points {
            s.push(x, y);
        }
        s
    }

    #[test]
    fn test_fingerprint_covers_only_the_tail() {
        let mut series = series_with(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        let before = fingerprint(SeriesKind::Latency, &series);

        // Push enough points that the original three leave the tail
        // window, then re-push identical tail values.
        for i in 3..8 {
            series.push(i as f64, 9.0);
        }
        // The head point differs but sits outside the tail window.
        let mut other = series_with(&[(1.0, 99.0)]);
        for i in 3..8 {
            other.push(i as f64, 9.0);
        }
        assert_eq!(
            fingerprint(SeriesKind::Latency, &series),
            fingerprint(SeriesKind::Latency, &other)
        );
        assert_ne!(before, fingerprint(SeriesKind::Latency, &series));
    }

    #[test]
    fn test_fingerprint_ignores_sub_resolution_jitter() {
        let a = series_with(&[(10.0, 0.98712)]);
        let b = series_with(&[(10.4, 0.98749)]);
        // Same at x %.0f / y %.3f resolution.
        assert_eq!(
            fingerprint(SeriesKind::SuccessRate, &a),
            fingerprint(SeriesKind::SuccessRate, &b)
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_kinds() {
        let series = series_with(&[(0.0, 1.0)]);
        assert_ne!(
            fingerprint(SeriesKind::Latency, &series),
            fingerprint(SeriesKind::SuccessRate, &series)
        );
    }

    #[test]
    fn test_should_render_marks_pending_only_on_change() {
        let mut scheduler = RenderScheduler::new();
        assert!(scheduler.should_render("binance:latency", "fp1".into()));
        assert!(!scheduler.should_render("binance:latency", "fp1".into()));
        assert_eq!(scheduler.take_pending(), vec!["binance:latency".to_string()]);
        assert!(scheduler.take_pending().is_empty());

        assert!(scheduler.should_render("binance:latency", "fp2".into()));
        assert_eq!(scheduler.take_pending(), vec!["binance:latency".to_string()]);
    }

    #[test]
    fn test_rebuild_destroys_before_create() {
        let mut scheduler = RenderScheduler::new();
        let series = series_with(&[(0.0, 10.0)]);
        scheduler
            .rebuild("p", || {
                ChartModel::from_series("p", "Latency", SeriesKind::Latency, &series)
            })
            .unwrap();
        assert!(scheduler.chart("p").is_some());

        // A failing rebuild leaves no stale chart behind.
        let empty = SeriesBuffer::new();
        let err = scheduler
            .rebuild("p", || {
                ChartModel::from_series("p", "Latency", SeriesKind::Latency, &empty)
            })
            .unwrap_err();
        assert_eq!(err, RenderError::NoData("p".to_string()));
        assert!(scheduler.chart("p").is_none());
    }

    #[test]
    fn test_failed_rebuild_retries_on_same_fingerprint() {
        let mut scheduler = RenderScheduler::new();
        assert!(scheduler.should_render("p", "fp1".into()));
        let empty = SeriesBuffer::new();
        let _ = scheduler.rebuild("p", || {
            ChartModel::from_series("p", "Latency", SeriesKind::Latency, &empty)
        });
        // The fingerprint was forgotten, so the same snapshot re-marks.
        assert!(scheduler.should_render("p", "fp1".into()));
    }

    #[test]
    fn test_success_rate_points_scaled_to_percent() {
        let series = series_with(&[(0.0, 0.95), (5.0, 1.0)]);
        let model =
            ChartModel::from_series("p", "Success", SeriesKind::SuccessRate, &series)
                .unwrap();
        assert_eq!(model.points, vec![(0.0, 95.0), (5.0, 100.0)]);
        assert_eq!(model.y_bounds, [0.0, 100.0]);
    }

    #[test]
    fn test_latency_bounds_track_data() {
        let series = series_with(&[(0.0, 40.0), (5.0, 100.0)]);
        let model =
            ChartModel::from_series("p", "Latency", SeriesKind::Latency, &series).unwrap();
        assert_eq!(model.x_bounds, [0.0, 60.0]);
        assert!((model.y_bounds[1] - 120.0).abs() < 1e-9);
    }
}
