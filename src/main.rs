// Binary includes library modules - some public API items are only for library consumers
#![allow(unused)]

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use config::{Config, Environment};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    Terminal,
};
use serde::Deserialize;

mod app;
mod connection;
mod data;
mod events;
mod poll;
mod protocol;
mod render;
mod store;
mod ui;

use app::{App, View};
use connection::{ConnectionManager, RetryPolicy};
use poll::FallbackPoller;
use store::{JsonFileStore, MemoryStore, PersistenceStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeChoice {
    Auto,
    Dark,
    Light,
}

#[derive(Parser, Debug)]
#[command(name = "feedwatch")]
#[command(about = "Terminal dashboard for monitoring live market data-feed adapters")]
struct Args {
    /// WebSocket endpoint of the monitor server
    #[arg(short, long, default_value = "ws://localhost:8000/ws")]
    url: String,

    /// REST base URL for fallback polling while the socket is down
    #[arg(long)]
    poll_url: Option<String>,

    /// Fallback poll interval in seconds
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Base reconnect delay in seconds
    #[arg(long, default_value = "1")]
    retry_base: u64,

    /// Maximum reconnect delay in seconds
    #[arg(long, default_value = "30")]
    retry_cap: u64,

    /// Consecutive reconnect attempts before giving up
    #[arg(long, default_value = "5")]
    retry_attempts: u32,

    /// Default latency bound (ms) below which values show as good
    #[arg(long, default_value = "50")]
    latency_good_ms: f64,

    /// Default latency bound (ms) below which values show as warning
    #[arg(long, default_value = "200")]
    latency_warn_ms: f64,

    /// JSON file for persisted UI preferences (collapse state etc.)
    #[arg(short, long)]
    state_file: Option<PathBuf>,

    /// Optional config file (settings may also come from FEEDWATCH_* env vars)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs to this file (logging is off without it; the terminal
    /// is owned by the TUI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Color theme
    #[arg(long, value_enum, default_value = "auto")]
    theme: ThemeChoice,
}

/// Settings loadable from a config file or FEEDWATCH_* environment
/// variables. CLI flags win where both are given.
#[derive(Debug, Default, Deserialize)]
struct Settings {
    url: Option<String>,
    poll_url: Option<String>,
    poll_interval: Option<u64>,
    state_file: Option<PathBuf>,
}

impl Settings {
    fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        let config = builder
            .add_source(Environment::with_prefix("FEEDWATCH"))
            .build()
            .context("failed to load configuration")?;
        Ok(config.try_deserialize().unwrap_or_default())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_ref())?;

    if let Some(ref path) = args.log_file {
        init_logging(path)?;
    }

    // CLI over config file over defaults. The url flag always has a
    // value, so the config file only wins when the flag was left at its
    // default.
    let url = if args.url == "ws://localhost:8000/ws" {
        settings.url.unwrap_or(args.url)
    } else {
        args.url
    };
    let poll_url = args.poll_url.or(settings.poll_url);
    let poll_interval =
        Duration::from_secs(settings.poll_interval.unwrap_or(args.poll_interval));
    let state_file = args.state_file.or(settings.state_file);

    let policy = RetryPolicy {
        base: Duration::from_secs(args.retry_base),
        cap: Duration::from_secs(args.retry_cap),
        max_attempts: args.retry_attempts,
    };

    // The transport and poller tasks live on this runtime; the TUI loop
    // stays on the main thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let connection = ConnectionManager::spawn(url, policy);
    let poller = poll_url.map(|base| FallbackPoller::spawn(base, poll_interval));
    let store: Box<dyn PersistenceStore> = match state_file {
        Some(path) => Box::new(JsonFileStore::open(path)),
        None => Box::new(MemoryStore::new()),
    };

    let mut app = App::new(connection, poller, store);
    app.schemas =
        data::SchemaRegistry::builtin_with_latency(args.latency_good_ms, args.latency_warn_ms);
    app.theme = match args.theme {
        ThemeChoice::Auto => ui::Theme::auto_detect(),
        ThemeChoice::Dark => ui::Theme::dark(),
        ThemeChoice::Light => ui::Theme::light(),
    };

    run_tui(&mut app)
}

/// Route tracing output to a file; ANSI escapes would be garbage there.
fn init_logging(path: &PathBuf) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedwatch=debug".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Run the TUI until the user quits.
fn run_tui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, app);

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        // Drain transport/poller events and rebuild changed charts
        // before drawing.
        app.pump(Utc::now());
        app.rebuild_charts();

        terminal.draw(|frame| {
            let area = frame.area();

            // Check for minimum terminal size
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = ratatui::widgets::Paragraph::new(msg)
                    .alignment(ratatui::layout::Alignment::Center)
                    .style(ratatui::style::Style::default().fg(ratatui::style::Color::Yellow));
                let centered = ratatui::layout::Rect::new(0, area.height / 2 - 2, area.width, 5);
                frame.render_widget(paragraph, centered);
                return;
            }

            let chunks = Layout::vertical([
                Constraint::Length(1), // Header bar
                Constraint::Length(1), // Tabs
                Constraint::Min(8),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

            // Render header with connection/run badges
            ui::common::render_header(frame, app, chunks[0]);

            // Render tabs
            ui::common::render_tabs(frame, app, chunks[1]);

            // Render current view
            match app.current_view {
                View::Cards => ui::cards::render(frame, app, chunks[2]),
                View::Charts => ui::charts::render(frame, app, chunks[2]),
            }

            // Render status bar
            ui::common::render_status_bar(frame, app, chunks[3]);

            // Render detail overlay if active
            if app.show_detail_overlay {
                ui::detail::render_overlay(frame, app, area);
            }

            // Render help overlay if active
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        // Poll for events with a short timeout
        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                Event::Mouse(mouse) => {
                    // Content starts after header (1) + tabs (1)
                    events::handle_mouse_event(app, mouse, 2);
                }
                Event::Resize(_, _) => {
                    // Terminal will redraw on next iteration
                }
                _ => {}
            }
        }
    }

    Ok(())
}
