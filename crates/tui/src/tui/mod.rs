use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde_json::json;

use crate::cli::PickArgs;
use crate::config::{AppConfig, PickerSettings};
use crate::core::{seed_sample_catalog, Catalog, CatalogSource};

mod app;
mod buffer;
mod constants;
mod filters;
mod helpers;

use app::{App, FormValue};
use constants::TICK_RATE;

type Backend = CrosstermBackend<Stdout>;

/// Run the interactive picker and print the resulting form value as JSON
/// once the terminal is restored.
pub fn run(config: AppConfig, settings: PickerSettings, args: PickArgs) -> Result<()> {
    let first_run = !config.db_path().exists();

    // Make sure the catalog exists before touching the terminal.
    let catalog = Catalog::initialize(&config)?;
    let seeded = if first_run {
        Some(seed_sample_catalog(&catalog)?)
    } else {
        None
    };
    drop(catalog);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("atis-fetch")
        .enable_all()
        .build()
        .context("failed to start the fetch runtime")?;
    let source = Arc::new(CatalogSource::new(config.clone(), args.kind)?);
    tracing::info!(kind = args.kind.as_str(), first_run, "starting picker");

    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let mut app = App::new(config, settings, &args, source, runtime.handle().clone());
    if let Some(summary) = seeded {
        app.set_status_info(format!(
            "New catalog seeded with {} users and {} institutions",
            summary.users, summary.institutions
        ));
    }
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    runtime.shutdown_timeout(Duration::from_millis(200));

    result?;
    print_form_value(&app.form_value(), io::stdout().lock())
}

fn run_app(terminal: &mut Terminal<Backend>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| app.draw(f))?;
        if app.should_quit() {
            break;
        }

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn print_form_value<W: Write>(value: &FormValue, mut writer: W) -> Result<()> {
    let payload = json!({
        "selected": value.selected,
        "broader_target": value.broader_target,
    });
    serde_json::to_writer(&mut writer, &payload)?;
    writeln!(writer)?;
    Ok(())
}
