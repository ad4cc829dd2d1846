pub use atis_tui::cli;
pub use atis_tui::commands;
pub use atis_tui::config;
pub use atis_tui::logging;
pub use atis_tui::tui;
pub use atis_tui::AppConfig;

pub use atis_core as core;
pub use atis_core::model;
