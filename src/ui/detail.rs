//! Detail overlay rendering.
//!
//! Displays a modal overlay with detailed information about a selected
//! adapter.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::schema::Tone;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 44;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 12;

/// Render the adapter detail as a modal overlay.
///
/// Shows the selected adapter's connectivity, update age, and every
/// formatted metric with its tone.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    // Skip rendering if terminal is too small for the overlay
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }

    let Some(card) = app.selected_card() else {
        return;
    };

    let overlay_width = (area.width * 70 / 100).clamp(MIN_OVERLAY_WIDTH, 80);
    let overlay_height =
        ((card.fields.len() as u16 + 9).max(MIN_OVERLAY_HEIGHT)).min(area.height);

    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    // Clear the area behind the overlay
    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(5), // Header with adapter info
        Constraint::Min(3),    // Metric table
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    // ===== HEADER SECTION =====
    let feed_span = if card.connected {
        Span::styled("● feed up", app.theme.tone_style(Tone::Good))
    } else {
        Span::styled("● feed down", app.theme.tone_style(Tone::Critical))
    };
    let age = card
        .age_seconds
        .map(|s| format!("{s}s ago"))
        .unwrap_or_else(|| "never".to_string());

    let header_lines = vec![
        Line::from(vec![Span::styled(
            format!(" {} ", card.display_name),
            app.theme.tone_style(card.accent).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            feed_span,
            Span::raw("    Updated: "),
            Span::styled(age, Style::default().add_modifier(Modifier::BOLD)),
        ]),
    ];

    let header_block = Block::default()
        .title(" Adapter Detail ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(header_lines).block(header_block), chunks[0]);

    // ===== METRIC TABLE =====
    if !card.fields.is_empty() {
        let metrics_header = Row::new(vec![Cell::from("Metric"), Cell::from("Value")])
            .height(1)
            .style(app.theme.header);

        let rows: Vec<Row> = card
            .fields
            .iter()
            .map(|field| {
                Row::new(vec![
                    Cell::from(field.label),
                    Cell::from(field.value.clone())
                        .style(app.theme.tone_style(field.tone)),
                ])
            })
            .collect();

        let widths = [Constraint::Fill(2), Constraint::Fill(1)];

        let table = Table::new(rows, widths).header(metrics_header).block(
            Block::default()
                .title(format!(" Metrics ({}) ", card.fields.len()))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );

        frame.render_widget(table, chunks[1]);
    } else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No metrics reported",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(
            Block::default()
                .title(" Metrics (0) ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );
        frame.render_widget(empty, chunks[1]);
    }

    // ===== FOOTER =====
    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " Press Esc to close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[2]);
}
