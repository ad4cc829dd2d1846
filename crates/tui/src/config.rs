pub use atis_core::config::*;

use crate::cli::{Cli, PickArgs};

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    AppConfig::discover(cli.data_dir.clone())
}

/// Terminal defaults, then `ATIS_DEBOUNCE_MS`, then flags.
pub fn picker_settings(args: &PickArgs) -> PickerSettings {
    PickerSettings::terminal()
        .with_env_overrides()
        .with_debounce_ms(args.debounce_ms)
        .with_overscan(args.overscan)
        .with_page_size(args.page_size)
}
