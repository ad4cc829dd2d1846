use std::time::Duration;

pub(crate) const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub(crate) const TICK_RATE: Duration = Duration::from_millis(200);
pub(crate) const STATUS_TTL: Duration = Duration::from_secs(5);

/// Chips shown before the strip collapses into a "+N more" tail.
pub(crate) const MAX_CHIPS: usize = 8;

pub(crate) const STATUS_SEARCH: &str =
    "Type to search • Enter/↓ back to the list • Ctrl+W delete word • Esc clear";
pub(crate) const STATUS_FILTER_PICKER: &str =
    "Category filter • ←/→ facet • ↑/↓ value • Enter apply • Esc cancel";
pub(crate) const STATUS_SELECT_PICKER: &str =
    "Select by category • ←/→ facet • ↑/↓ value • Enter select all • Esc cancel";
pub(crate) const STATUS_HELP: &str = "Keyboard reference • Enter/Esc to close";
pub(crate) const STATUS_DIAGNOSTICS: &str =
    "Recent picker events • e export to the data directory • Enter/Esc to close";
pub(crate) const STATUS_NO_CATEGORIES: &str = "No categories known yet, wait for results";
pub(crate) const STATUS_BROADER_TARGET: &str = "targeting a broader audience";
