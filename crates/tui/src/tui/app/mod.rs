use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use ratatui::style::{Color, Style};
use tokio::runtime::Handle;

use super::buffer::QueryBuffer;
use super::constants::*;
use super::filters::{CategoryOverlay, OverlayPurpose};
use super::helpers::{group_rows, GroupRow};
use crate::cli::PickArgs;
use crate::config::{AppConfig, PickerSettings};
use crate::core::{
    ApplyOutcome, DiagnosticEvent, Diagnostics, EntitySource, FetchDriver, GroupKey, ListState,
    Picker, ScrollState, SearchController, SelectionOutcome,
};
use crate::model::{EntityId, Facet, FilterState};

mod input;
mod render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Category,
    Help,
    Diagnostics,
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    kind: StatusKind,
    created_at: Instant,
}

impl StatusMessage {
    fn new<T: Into<String>>(text: T, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            StatusKind::Info => Style::default().fg(Color::Cyan),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Info,
    Error,
}

/// What the enclosing form ends up holding once the picker closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FormValue {
    pub(crate) selected: Vec<EntityId>,
    pub(crate) broader_target: Option<String>,
}

pub(crate) struct App {
    config: AppConfig,
    settings: PickerSettings,
    picker: Picker,
    search: SearchController,
    driver: FetchDriver,
    diagnostics: Arc<Diagnostics>,
    scroll: ScrollState,
    cursor: usize,
    grouped: bool,
    group_cursor: usize,
    input_mode: InputMode,
    query: QueryBuffer,
    overlay: Option<CategoryOverlay>,
    status: Option<StatusMessage>,
    form_value: Arc<Mutex<Vec<EntityId>>>,
    broader_reason: String,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(
        config: AppConfig,
        settings: PickerSettings,
        args: &PickArgs,
        source: Arc<dyn EntitySource>,
        runtime: Handle,
    ) -> Self {
        let diagnostics = Arc::new(Diagnostics::new(settings.diagnostics_capacity));
        let mut picker = Picker::new(args.kind, settings.page_size, Arc::clone(&diagnostics));

        let form_value = Arc::new(Mutex::new(args.selected.clone()));
        let sink = Arc::clone(&form_value);
        picker.on_selection_change(move |ids| *sink.lock() = ids.to_vec());
        picker.sync_selected(&args.selected);

        let mut driver = FetchDriver::new(source, runtime, Arc::clone(&diagnostics));
        driver.load_universe();
        let scroll = ScrollState::new(
            settings.row_height,
            settings.viewport_height,
            settings.overscan,
        );

        let mut app = Self {
            config,
            search: SearchController::new(settings.debounce),
            settings,
            picker,
            driver,
            diagnostics,
            scroll,
            cursor: 0,
            grouped: false,
            group_cursor: 0,
            input_mode: InputMode::Normal,
            query: QueryBuffer::new(),
            overlay: None,
            status: None,
            form_value,
            broader_reason: args
                .broader_target
                .clone()
                .unwrap_or_else(|| STATUS_BROADER_TARGET.to_string()),
            should_quit: false,
        };

        if args.broader_target.is_some() {
            let reason = app.broader_reason.clone();
            app.picker.set_competing_mode(Some(reason));
        }
        let initial = app.search.filter_state();
        app.start_fetch(initial);
        app
    }

    pub(crate) fn on_tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Publish a settled query, fold in finished fetches and expire the
    /// status line.
    pub(crate) fn tick_at(&mut self, now: Instant) {
        if let Some(filter) = self.search.poll(now) {
            self.start_fetch(filter);
        }
        self.collect_universe();
        self.collect_results();

        if let Some(status) = &self.status {
            if now.saturating_duration_since(status.created_at) > STATUS_TTL {
                self.status = None;
            }
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub(crate) fn form_value(&self) -> FormValue {
        FormValue {
            selected: self.form_value.lock().clone(),
            broader_target: self.picker.competing_reason().map(str::to_string),
        }
    }

    pub(crate) fn set_status_info<T: Into<String>>(&mut self, message: T) {
        let text = message.into();
        let decorated = if text.is_empty() {
            text
        } else {
            format!("ℹ️  {}", text)
        };
        self.status = Some(StatusMessage::new(decorated, StatusKind::Info));
    }

    pub(crate) fn set_status_error<T: Into<String>>(&mut self, message: T) {
        let text = message.into();
        let decorated = if text.is_empty() {
            text
        } else {
            format!("⚠️  {}", text)
        };
        self.status = Some(StatusMessage::new(decorated, StatusKind::Error));
    }

    fn start_fetch(&mut self, filter: FilterState) {
        self.diagnostics.record(DiagnosticEvent::FilterPublished {
            query: filter.query.clone(),
            category: filter.category.as_ref().map(ToString::to_string),
        });
        let ticket = self.picker.begin_fetch(filter);
        self.driver.spawn(ticket);
        self.cursor = 0;
        self.group_cursor = 0;
        self.scroll.reset();
    }

    /// Fold in the full entity list once it arrives so category and group
    /// selection reach rows that were never paged in.
    fn collect_universe(&mut self) {
        match self.driver.take_universe() {
            Some(Ok(entities)) => self.picker.seed_universe(entities),
            Some(Err(err)) => {
                tracing::warn!(error = %err, "full catalog load failed");
                self.set_status_error(format!(
                    "Could not load all {}: {err}; bulk selection covers loaded rows only",
                    self.picker.kind().plural()
                ));
            }
            None => {}
        }
    }

    fn collect_results(&mut self) {
        let outcomes = self.driver.drain();
        if outcomes.is_empty() {
            return;
        }
        for outcome in outcomes {
            if let ApplyOutcome::Failed = self.picker.apply(outcome) {
                if let ListState::Failed(err) = self.picker.list_state() {
                    let message = format!("Fetch failed: {err} (press r to retry)");
                    self.set_status_error(message);
                }
            }
        }
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let len = self.picker.candidates().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
        self.scroll.clamp(len);
        let groups = self.group_rows().len();
        self.group_cursor = self.group_cursor.min(groups.saturating_sub(1));
    }

    fn group_rows(&self) -> Vec<GroupRow> {
        group_rows(&self.picker.groups())
    }

    fn rows_per_page(&self) -> usize {
        self.scroll.visible_rows().len().max(1)
    }

    fn move_cursor_to(&mut self, index: usize) {
        if self.grouped {
            let len = self.group_rows().len();
            self.group_cursor = index.min(len.saturating_sub(1));
            return;
        }
        let len = self.picker.candidates().len();
        if len == 0 {
            return;
        }
        self.cursor = index.min(len - 1);
        self.scroll.ensure_visible(self.cursor);
        if self.cursor + 1 == len {
            self.request_more(false);
        }
    }

    fn active_cursor(&self) -> usize {
        if self.grouped {
            self.group_cursor
        } else {
            self.cursor
        }
    }

    fn select_next(&mut self) {
        self.move_cursor_to(self.active_cursor() + 1);
    }

    fn select_prev(&mut self) {
        self.move_cursor_to(self.active_cursor().saturating_sub(1));
    }

    fn page_down(&mut self) {
        self.move_cursor_to(self.active_cursor() + self.rows_per_page());
    }

    fn page_up(&mut self) {
        self.move_cursor_to(self.active_cursor().saturating_sub(self.rows_per_page()));
    }

    fn select_first(&mut self) {
        self.move_cursor_to(0);
    }

    fn select_last(&mut self) {
        self.move_cursor_to(usize::MAX);
    }

    fn current_id(&self) -> Option<EntityId> {
        self.picker
            .candidates()
            .get(self.cursor)
            .map(|entity| entity.id.clone())
    }

    fn report(&mut self, outcome: SelectionOutcome, changed: String) {
        match outcome {
            SelectionOutcome::Changed => self.set_status_info(changed),
            SelectionOutcome::Unchanged => self.set_status_info("Selection unchanged"),
            SelectionOutcome::Locked => {
                let reason = self.picker.competing_reason().unwrap_or_default();
                let message = format!("Selection locked: {reason} (press b to unlock)");
                self.set_status_error(message);
            }
        }
    }

    fn toggle_current(&mut self) {
        if self.grouped {
            return self.select_group_row();
        }
        let Some(id) = self.current_id() else {
            self.set_status_info("Nothing to select");
            return;
        };
        let was_selected = self.picker.selection().contains(&id);
        let outcome = self.picker.toggle(&id);
        let verb = if was_selected { "Removed" } else { "Added" };
        let label = self.entity_label(&id);
        self.report(outcome, format!("{verb} {label}"));
    }

    fn select_visible(&mut self) {
        let count = self.picker.candidates().len();
        if count == 0 {
            self.set_status_info("Nothing visible to select");
            return;
        }
        let outcome = self.picker.select_all_visible();
        self.report(outcome, format!("Selected all {count} visible"));
    }

    fn select_current_group(&mut self) {
        let Some(entity) = self.picker.candidates().get(self.cursor) else {
            self.set_status_info("Nothing to group by");
            return;
        };
        let key = if let Some(sector) = entity.category_value(Facet::Sector) {
            GroupKey::Sector(sector.to_string())
        } else if let Some(region) = entity.category_value(Facet::Region) {
            GroupKey::Region(region.to_string())
        } else {
            self.set_status_info("This row belongs to no region or sector");
            return;
        };
        let outcome = self.picker.select_group(&key);
        self.report(outcome, format!("Selected everyone in {}", key.label()));
    }

    fn toggle_grouped_view(&mut self) {
        self.grouped = !self.grouped;
        self.group_cursor = 0;
        if self.grouped {
            self.set_status_info("Grouped by region and sector • Enter selects a group • G back");
        } else {
            self.status = None;
        }
    }

    fn select_group_row(&mut self) {
        let Some(row) = self.group_rows().into_iter().nth(self.group_cursor) else {
            self.set_status_info("Nothing to group by");
            return;
        };
        let outcome = self.picker.select_group(&row.key);
        self.report(outcome, format!("Selected everyone in {}", row.key.label()));
    }

    fn remove_last_chip(&mut self) {
        let Some(id) = self.picker.selection().last().cloned() else {
            self.set_status_info("Nothing selected");
            return;
        };
        let label = self.entity_label(&id);
        let outcome = self.picker.remove(&id);
        self.report(outcome, format!("Removed {label}"));
    }

    fn clear_selection(&mut self) {
        let outcome = self.picker.clear_selection();
        self.report(outcome, String::from("Selection cleared"));
    }

    fn toggle_broader_target(&mut self) {
        if self.picker.is_locked() {
            self.picker.set_competing_mode(None);
            self.set_status_info("Broader targeting off, selection unlocked");
        } else {
            let reason = self.broader_reason.clone();
            self.picker.set_competing_mode(Some(reason.clone()));
            self.set_status_info(format!("Selection locked: {reason}"));
        }
    }

    fn request_more(&mut self, explicit: bool) {
        match self.picker.load_more() {
            Some(ticket) => {
                self.driver.spawn(ticket);
                if explicit {
                    self.set_status_info("Loading more…");
                }
            }
            None if explicit => self.set_status_info("Everything matching is loaded"),
            None => {}
        }
    }

    fn retry(&mut self) {
        match self.picker.retry() {
            Some(ticket) => {
                self.driver.spawn(ticket);
                self.set_status_info("Retrying…");
            }
            None => self.set_status_info("Nothing to retry"),
        }
    }

    fn reset_filters(&mut self) {
        self.query.clear();
        match self.search.reset() {
            Some(filter) => {
                self.start_fetch(filter);
                self.set_status_info("Filters cleared");
            }
            None => self.set_status_info("No filters to clear"),
        }
    }

    fn query_changed(&mut self, now: Instant) {
        self.search.set_query(self.query.as_str(), now);
    }

    fn open_category_overlay(&mut self, purpose: OverlayPurpose) {
        let active = match purpose {
            OverlayPurpose::Filter => self.search.category().cloned(),
            OverlayPurpose::Select => None,
        };
        let overlay = CategoryOverlay::new(purpose, &self.picker.facet_summary(), active.as_ref());
        if overlay.is_empty() {
            self.set_status_info(STATUS_NO_CATEGORIES);
            return;
        }
        self.overlay = Some(overlay);
        self.input_mode = InputMode::Category;
        match purpose {
            OverlayPurpose::Filter => self.set_status_info(STATUS_FILTER_PICKER),
            OverlayPurpose::Select => self.set_status_info(STATUS_SELECT_PICKER),
        }
    }

    fn commit_overlay(&mut self) {
        self.input_mode = InputMode::Normal;
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        let highlighted = overlay.highlighted();
        match overlay.purpose {
            OverlayPurpose::Filter => match self.search.set_category(highlighted) {
                Some(filter) => {
                    let summary = filter.summary().unwrap_or_else(|| "none".into());
                    self.start_fetch(filter);
                    self.set_status_info(format!("Filter: {summary}"));
                }
                None => self.status = None,
            },
            OverlayPurpose::Select => {
                let Some(category) = highlighted else {
                    return;
                };
                let outcome = self.picker.select_by_category(&category);
                self.report(outcome, format!("Selected everyone tagged {category}"));
            }
        }
    }

    fn cancel_overlay(&mut self) {
        self.overlay = None;
        self.input_mode = InputMode::Normal;
        self.status = None;
    }

    fn export_diagnostics(&mut self) {
        match self.write_diagnostics() {
            Ok(path) => self.set_status_info(format!("Diagnostics written to {}", path.display())),
            Err(err) => self.set_status_error(format!("Export failed: {err:#}")),
        }
    }

    fn write_diagnostics(&self) -> Result<PathBuf> {
        let json = self.diagnostics.export_json()?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self
            .config
            .data_dir()
            .join(format!("diagnostics-{stamp}.json"));
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported picker diagnostics");
        Ok(path)
    }

    fn entity_label(&self, id: &EntityId) -> String {
        self.picker
            .lookup(id)
            .map(|entity| entity.label.clone())
            .unwrap_or_else(|| format!("ID #{id}"))
    }
}
