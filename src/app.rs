//! Application state and navigation logic.

use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::connection::{ConnectionEvent, ConnectionManager, ConnectionState};
use crate::data::aggregator::MetricsAggregator;
use crate::data::present::PresentationState;
use crate::data::schema::SchemaRegistry;
use crate::data::series::SeriesKind;
use crate::poll::FallbackPoller;
use crate::render::{fingerprint, panel_id, ChartModel, RenderScheduler};
use crate::store::{Notice, NoticeLevel, NotificationSink, PersistenceStore, StatusLineSink};
use crate::ui::Theme;

/// The current view/tab in the TUI.
///
/// Adapter detail is shown as an overlay (controlled by
/// `App::show_detail_overlay`) rather than as a separate view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Per-adapter metric cards.
    Cards,
    /// Latency and success-rate charts.
    Charts,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Cards => View::Charts,
            View::Charts => View::Cards,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        // Two views, so prev == next.
        self.next()
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Cards => "Adapters",
            View::Charts => "Charts",
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    // Data pipeline
    connection: ConnectionManager,
    poller: Option<FallbackPoller>,
    pub aggregator: MetricsAggregator,
    pub scheduler: RenderScheduler,
    pub presentation: PresentationState,
    pub schemas: SchemaRegistry,
    store: Box<dyn PersistenceStore>,
    pub notices: StatusLineSink,
    current_notice: Option<(Notice, Instant)>,

    // Navigation state
    pub selected_index: usize,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create a new App wired to the given collaborators. The websocket
    /// link is brought up immediately.
    pub fn new(
        mut connection: ConnectionManager,
        poller: Option<FallbackPoller>,
        store: Box<dyn PersistenceStore>,
    ) -> Self {
        connection.connect();
        Self {
            running: true,
            current_view: View::Cards,
            show_help: false,
            show_detail_overlay: false,
            connection,
            poller,
            aggregator: MetricsAggregator::new(),
            scheduler: RenderScheduler::new(),
            presentation: PresentationState::default(),
            schemas: SchemaRegistry::builtin(),
            store,
            notices: StatusLineSink::new(),
            current_notice: None,
            selected_index: 0,
            theme: Theme::auto_detect(),
            status_message: None,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < std::time::Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Drain pending transport and poller events into the aggregator,
    /// then refresh the projection and chart fingerprints.
    ///
    /// This is the only place the aggregator is mutated; it runs on the
    /// UI thread once per frame.
    pub fn pump(&mut self, now: DateTime<Utc>) {
        for event in self.connection.poll_events() {
            match event {
                ConnectionEvent::Connected => {
                    if let Some(poller) = &self.poller {
                        poller.pause();
                    }
                    self.notices.notify(NoticeLevel::Info, "connected");
                }
                ConnectionEvent::Disconnected => {
                    self.aggregator.mark_all_disconnected();
                    if let Some(poller) = &self.poller {
                        poller.resume();
                        self.notices
                            .notify(NoticeLevel::Warning, "connection lost, polling REST");
                    } else {
                        self.notices.notify(NoticeLevel::Error, "connection lost");
                    }
                }
                ConnectionEvent::RetryScheduled { attempt, delay } => {
                    self.set_status_message(format!(
                        "reconnecting in {}s (attempt {attempt})",
                        delay.as_secs()
                    ));
                }
                ConnectionEvent::Error(message) => {
                    self.notices.notify(NoticeLevel::Error, &message);
                }
                ConnectionEvent::Message(inbound) => {
                    let applied = self.aggregator.apply(&inbound, now);
                    if let Some(message) = applied.completed {
                        self.notices.notify(NoticeLevel::Info, &message);
                    }
                }
            }
        }

        // REST snapshots only matter while the socket is down; the
        // aggregator's timestamp ordering makes late ones harmless.
        if let Some(poller) = &mut self.poller {
            for inbound in poller.poll_events() {
                self.aggregator.apply(&inbound, now);
            }
        }

        self.refresh(now);
        self.rotate_notices();
    }

    /// Promote the next queued notice to the status line once the
    /// current one has been shown for a few seconds.
    fn rotate_notices(&mut self) {
        let expired = self
            .current_notice
            .as_ref()
            .is_none_or(|(_, since)| since.elapsed() >= std::time::Duration::from_secs(3));
        if expired {
            self.current_notice = self.notices.pop().map(|n| (n, Instant::now()));
        }
    }

    /// The notice currently displayed in the status line, if any.
    pub fn current_notice(&self) -> Option<&Notice> {
        self.current_notice.as_ref().map(|(n, _)| n)
    }

    /// Re-project presentation state and mark changed chart panels.
    fn refresh(&mut self, now: DateTime<Utc>) {
        self.presentation = PresentationState::project(
            &self.aggregator,
            self.connection.state(),
            &self.schemas,
            self.store.as_ref(),
            now,
        );
        if self.selected_index >= self.presentation.cards.len() {
            self.selected_index = self.presentation.cards.len().saturating_sub(1);
        }

        let ids: Vec<String> =
            self.aggregator.adapter_ids().map(str::to_string).collect();
        for adapter_id in &ids {
            for kind in SeriesKind::ALL {
                if let Some(series) = self.aggregator.series(adapter_id, kind) {
                    let panel = panel_id(adapter_id, kind);
                    self.scheduler.should_render(&panel, fingerprint(kind, series));
                }
            }
        }
    }

    /// Rebuild every chart panel whose fingerprint changed. Failures are
    /// per-panel: one bad series leaves the rest of the charts intact.
    pub fn rebuild_charts(&mut self) {
        for panel in self.scheduler.take_pending() {
            let Some((adapter_id, slug)) = panel.rsplit_once(':') else { continue };
            let Some(&kind) = SeriesKind::ALL.iter().find(|k| k.slug() == slug) else {
                continue;
            };
            let Some(series) = self.aggregator.series(adapter_id, kind) else {
                self.scheduler.teardown(&panel);
                continue;
            };
            let title = format!(
                "{} {}",
                self.schemas.resolve(adapter_id).display_name,
                kind.label()
            );
            let _ = self.scheduler.rebuild(&panel, || {
                ChartModel::from_series(&panel, title, kind, series)
            });
        }
    }

    /// Switch to the next view.
    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    /// Switch to the previous view.
    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    /// Switch to a specific view.
    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Move selection down by one card.
    pub fn select_next(&mut self) {
        let max = self.presentation.cards.len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max);
    }

    /// Move selection up by one card.
    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// The currently selected adapter card, if any.
    pub fn selected_card(&self) -> Option<&crate::data::present::AdapterCard> {
        self.presentation.cards.get(self.selected_index)
    }

    /// Toggle the collapsed state of the selected card, persisting the
    /// preference.
    pub fn toggle_collapse(&mut self, now: DateTime<Utc>) {
        let Some(card) = self.selected_card() else { return };
        let key = crate::data::present::collapse_key(&card.id);
        let collapsed = !card.collapsed;
        self.store.set(&key, if collapsed { "true" } else { "false" });
        self.refresh(now);
    }

    /// Open the detail overlay for the currently selected adapter.
    pub fn enter_detail(&mut self) {
        if self.selected_card().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close overlay first, then return to the cards view.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
            return;
        }
        if self.current_view != View::Cards {
            self.current_view = View::Cards;
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Manually reconnect, e.g. after the retry budget ran out.
    pub fn reconnect(&mut self) {
        self.connection.connect();
        self.set_status_message("reconnecting...".to_string());
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Tear the link and chart panels down cleanly before exit.
    pub fn shutdown(&mut self) {
        self.connection.disconnect();
        self.scheduler.clear();
    }
}
