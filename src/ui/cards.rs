//! Adapter cards view rendering.
//!
//! Displays one bordered card per adapter with its formatted metrics.
//! Collapsed cards shrink to a single summary line; the preference is
//! persisted per adapter.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::data::present::AdapterCard;

/// Height of a collapsed card (borders plus the title line).
const COLLAPSED_HEIGHT: u16 = 2;

/// Render the Adapters view showing one card per adapter.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    if app.presentation.cards.is_empty() {
        let placeholder = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Waiting for adapter data...",
                app.theme.muted_style(),
            )),
        ])
        .block(
            Block::default()
                .title(" Adapters ")
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );
        frame.render_widget(placeholder, area);
        return;
    }

    let constraints: Vec<Constraint> = app
        .presentation
        .cards
        .iter()
        .map(|card| {
            if card.collapsed {
                Constraint::Length(COLLAPSED_HEIGHT)
            } else {
                Constraint::Length(card.fields.len() as u16 + 2)
            }
        })
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let chunks = Layout::vertical(constraints).split(area);

    for (i, card) in app.presentation.cards.iter().enumerate() {
        render_card(frame, app, card, i == app.selected_index, chunks[i]);
    }
}

fn render_card(frame: &mut Frame, app: &App, card: &AdapterCard, selected: bool, area: Rect) {
    if area.height == 0 {
        return;
    }

    let feed = if card.connected {
        Span::styled("● up", app.theme.tone_style(crate::data::schema::Tone::Good))
    } else {
        Span::styled(
            "● down",
            app.theme.tone_style(crate::data::schema::Tone::Critical),
        )
    };
    let age = card
        .age_seconds
        .map(|s| format!("{s}s ago"))
        .unwrap_or_else(|| "never".to_string());

    let mut title_spans = vec![
        Span::styled(
            format!(" {} ", card.display_name),
            app.theme.tone_style(card.accent).add_modifier(Modifier::BOLD),
        ),
        feed,
        Span::styled(format!(" · {age} "), app.theme.muted_style()),
    ];
    if card.collapsed {
        title_spans.push(Span::styled("[+] ", app.theme.muted_style()));
    }

    let border_style = if selected {
        Style::default().fg(app.theme.highlight)
    } else {
        Style::default().fg(app.theme.border)
    };
    let block = Block::default()
        .title(Line::from(title_spans))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(border_style);

    if card.collapsed {
        frame.render_widget(block, area);
        return;
    }

    let lines: Vec<Line> = card
        .fields
        .iter()
        .map(|field| {
            Line::from(vec![
                Span::raw(format!(" {:<16}", field.label)),
                Span::styled(field.value.clone(), app.theme.tone_style(field.tone)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
