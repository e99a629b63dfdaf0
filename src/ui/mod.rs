//! Terminal rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`common`]: Header bar, tab bar, status bar, and help overlay
//! - [`cards`]: Per-adapter metric cards view
//! - [`charts`]: Latency and success-rate chart panels
//! - [`detail`]: Adapter detail modal overlay
//! - [`theme`]: Light/dark themes and tone-to-color mapping

pub mod cards;
pub mod charts;
pub mod common;
pub mod detail;
pub mod theme;

pub use theme::Theme;
