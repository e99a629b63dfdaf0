//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::store::NoticeLevel;

/// Render the header bar with connection and run-state badges.
///
/// Displays: connection badge, run-state badge, adapter connectivity
/// counts, elapsed run time.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let badges = &app.presentation.badges;

    let connected = app.presentation.cards.iter().filter(|c| c.connected).count();
    let total = app.presentation.cards.len();

    let mut spans = vec![
        Span::styled(" FEEDWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(
            format!(" {} ", badges.connection_label()),
            app.theme.tone_style(badges.connection_tone()).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            format!(" {} ", badges.run.label()),
            app.theme.tone_style(badges.run.tone()).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::styled(
            format!("{connected}"),
            Style::default().fg(app.theme.good),
        ),
        Span::raw(format!("/{total} feeds up")),
    ];

    if let Some(ref elapsed) = app.presentation.elapsed {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            elapsed.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" elapsed"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Adapters "), Line::from(" 2:Charts ")];

    let selected = match app.current_view {
        View::Cards => 0,
        View::Charts => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows: the latest notice or temporary status message, otherwise the
/// available controls for the current view.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Queued notices take precedence over the static control hints.
    if let Some(notice) = app.current_notice() {
        let style = match notice.level {
            NoticeLevel::Info => Style::default().fg(app.theme.highlight),
            NoticeLevel::Warning => Style::default().fg(app.theme.warning),
            NoticeLevel::Error => Style::default().fg(app.theme.critical),
        };
        let paragraph = Paragraph::new(format!(" {} ", notice.message)).style(style);
        frame.render_widget(paragraph, area);
        return;
    }

    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Cards => "↑↓:select c:collapse Enter:detail Tab:switch r:reconnect ?:help q:quit",
        View::Charts => "Tab:switch r:reconnect ?:help q:quit",
    };
    let paragraph =
        Paragraph::new(format!(" {controls}")).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Navigation",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Select adapter"),
        Line::from("  1/2         Jump to view"),
        Line::from("  Enter       View detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Adapters",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  c         Collapse/expand card"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  r         Reconnect"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);

    // Center the help overlay - responsive to terminal size
    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 22u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    // Clear the area behind the help
    frame.render_widget(ratatui::widgets::Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
