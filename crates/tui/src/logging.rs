use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

fn env_filter(filter: Option<&str>) -> Result<EnvFilter> {
    let directive: Directive = filter.unwrap_or(DEFAULT_DIRECTIVE).parse()?;
    Ok(EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy())
}

/// Log to stderr for one-shot commands.
pub fn init_stderr(filter: Option<&str>) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}

/// Log to a file while the terminal belongs to the picker.
pub fn init_file(path: &Path, filter: Option<&str>) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directives() {
        assert!(env_filter(Some("atis=debug")).is_ok());
        assert!(env_filter(Some("atis=loudest")).is_err());
    }
}
