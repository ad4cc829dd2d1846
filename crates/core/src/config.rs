use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

use crate::search::DEFAULT_DEBOUNCE;
use crate::source::DEFAULT_PAGE_SIZE;

static DEFAULT_DB_NAME: &str = "atis.sqlite3";
static DEFAULT_LOG_NAME: &str = "atis.log";
static ENV_DATA_DIR: &str = "ATIS_DATA_DIR";
static ENV_DEBOUNCE_MS: &str = "ATIS_DEBOUNCE_MS";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("az", "atis", "atis"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        Self::from_data_dir(data_dir)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self { data_dir, db_path })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_LOG_NAME)
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-atis");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".atis"));
    }

    Ok(env::current_dir()?.join(".atis"))
}

/// Tuning knobs for one picker instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerSettings {
    pub debounce: Duration,
    pub row_height: u32,
    pub viewport_height: u32,
    pub overscan: usize,
    pub page_size: usize,
    pub diagnostics_capacity: usize,
}

impl Default for PickerSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            row_height: 52,
            viewport_height: 320,
            overscan: 4,
            page_size: DEFAULT_PAGE_SIZE,
            diagnostics_capacity: 500,
        }
    }
}

impl PickerSettings {
    /// Defaults for a terminal: one line per row.
    pub fn terminal() -> Self {
        Self {
            row_height: 1,
            viewport_height: 20,
            overscan: 2,
            ..Self::default()
        }
    }

    /// Apply `ATIS_DEBOUNCE_MS` when it holds a valid number of milliseconds.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = env::var(ENV_DEBOUNCE_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.debounce = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = raw.as_str(), "ignoring invalid ATIS_DEBOUNCE_MS"),
            }
        }
        self
    }

    pub fn with_debounce_ms(mut self, ms: Option<u64>) -> Self {
        if let Some(ms) = ms {
            self.debounce = Duration::from_millis(ms);
        }
        self
    }

    pub fn with_overscan(mut self, overscan: Option<usize>) -> Self {
        if let Some(overscan) = overscan {
            self.overscan = overscan;
        }
        self
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        if let Some(page_size) = page_size.filter(|size| *size > 0) {
            self.page_size = page_size;
        }
        self
    }
}
