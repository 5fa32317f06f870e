pub mod grid;
pub mod help;
pub mod levels;
pub mod log;
pub mod theme;

pub use grid::{render_grid, render_transport, TransportInfo};
pub use help::{help_line_count, render_help, HelpState};
pub use levels::{render_levels, LevelsInfo};
pub use log::render_event_log;
pub use theme::Theme;
