use anyhow::Result;
use clap::Parser;

use atis::cli::{CliCommand, PickArgs};

fn main() -> Result<()> {
    let cli = atis::cli::Cli::parse();
    let config = atis::config::from_cli(&cli)?;
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| CliCommand::Pick(PickArgs::default()));

    match command {
        CliCommand::Pick(args) => {
            // The terminal belongs to the picker, so logs go to a file.
            atis::logging::init_file(&config.log_path(), cli.log_filter.as_deref())?;
            let settings = atis::config::picker_settings(&args);
            atis::tui::run(config, settings, args)?;
        }
        command => {
            atis::logging::init_stderr(cli.log_filter.as_deref())?;
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            atis::commands::execute(&config, command, &mut handle)?;
        }
    }

    Ok(())
}
