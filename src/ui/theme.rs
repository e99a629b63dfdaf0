//! Terminal color palettes.
//!
//! Tone classification is semantic; this module is the only place tones
//! meet concrete terminal colors. The two palettes share their alert
//! colors (those must read on any background) and differ in accent and
//! de-emphasis, which is where light and dark backgrounds actually
//! diverge.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;
use tracing::debug;

use crate::data::schema::Tone;

/// Backgrounds with luma above this are treated as light.
const LIGHT_LUMA_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent for selection borders, headers, and active elements.
    pub highlight: Color,
    pub good: Color,
    pub warning: Color,
    pub critical: Color,
    /// De-emphasized text: update ages, placeholders, collapse markers.
    pub muted: Color,
    pub border: Color,
    pub header: Style,
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    fn with_accent(accent: Color, muted: Color, border: Color, selected_bg: Color) -> Self {
        Self {
            highlight: accent,
            good: Color::Green,
            warning: Color::Yellow,
            critical: Color::Red,
            muted,
            border,
            header: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(selected_bg).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(accent).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(muted),
            border_type: BorderType::Rounded,
        }
    }

    pub fn dark() -> Self {
        Self::with_accent(Color::Cyan, Color::DarkGray, Color::Gray, Color::DarkGray)
    }

    pub fn light() -> Self {
        Self::with_accent(Color::Blue, Color::Gray, Color::DarkGray, Color::LightBlue)
    }

    /// Pick a palette from the terminal's background luminance. An
    /// undetectable background (no tty, unsupported terminal) falls
    /// back to dark.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > LIGHT_LUMA_THRESHOLD => Self::light(),
            Ok(_) => Self::dark(),
            Err(err) => {
                debug!(error = %err, "background luma probe failed, assuming dark");
                Self::dark()
            }
        }
    }

    /// Map a semantic tone onto this palette.
    pub fn tone_style(&self, tone: Tone) -> Style {
        match tone {
            Tone::Good => Style::default().fg(self.good),
            Tone::Warning => Style::default().fg(self.warning),
            Tone::Critical => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
            Tone::Accent => Style::default().fg(self.highlight),
            Tone::Neutral => Style::default(),
        }
    }

    /// Style for de-emphasized secondary text.
    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::DIM)
    }
}
