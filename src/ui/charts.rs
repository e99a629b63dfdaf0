//! Charts view rendering.
//!
//! One row of chart panels per adapter: latency on the left, success
//! rate on the right. Panels whose chart model has not been built yet
//! (no data, or a failed rebuild) show a placeholder until the next
//! snapshot brings data.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::series::SeriesKind;
use crate::render::{panel_id, ChartModel};

/// Render the Charts view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let cards = &app.presentation.cards;
    if cards.is_empty() {
        let placeholder = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Waiting for adapter data...",
                app.theme.muted_style(),
            )),
        ])
        .block(
            Block::default()
                .title(" Charts ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );
        frame.render_widget(placeholder, area);
        return;
    }

    let rows = Layout::vertical(vec![
        Constraint::Ratio(1, cards.len() as u32);
        cards.len()
    ])
    .split(area);

    for (card, row) in cards.iter().zip(rows.iter()) {
        let cols =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row);
        for (kind, col) in SeriesKind::ALL.into_iter().zip(cols.iter()) {
            let panel = panel_id(&card.id, kind);
            match app.scheduler.chart(&panel) {
                Some(model) => render_chart(frame, app, model, *col),
                None => render_placeholder(frame, app, &card.display_name, kind, *col),
            }
        }
    }
}

fn render_chart(frame: &mut Frame, app: &App, model: &ChartModel, area: Rect) {
    let color = match model.kind {
        SeriesKind::Latency => app.theme.warning,
        SeriesKind::SuccessRate => app.theme.good,
    };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&model.points);

    let x_labels = vec![
        Span::raw(format!("{:.0}s", model.x_bounds[0])),
        Span::raw(format!("{:.0}s", model.x_bounds[1])),
    ];
    let y_labels = vec![
        Span::raw(format!("{:.0}", model.y_bounds[0])),
        Span::raw(format!("{:.0}", (model.y_bounds[0] + model.y_bounds[1]) / 2.0)),
        Span::raw(format!("{:.0}", model.y_bounds[1])),
    ];

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(format!(" {} ", model.title))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .x_axis(
            Axis::default()
                .bounds(model.x_bounds)
                .labels(x_labels)
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .bounds(model.y_bounds)
                .labels(y_labels)
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(chart, area);
}

fn render_placeholder(
    frame: &mut Frame,
    app: &App,
    display_name: &str,
    kind: SeriesKind,
    area: Rect,
) {
    let placeholder = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("  Awaiting data...", app.theme.muted_style())),
    ])
    .block(
        Block::default()
            .title(format!(" {} {} ", display_name, kind.label()))
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );
    frame.render_widget(placeholder, area);
}
