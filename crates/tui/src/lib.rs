pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod tui;

pub use atis_core as core;
pub use atis_core::model;

pub use atis_core::AppConfig;
