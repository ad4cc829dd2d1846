use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::constants::{STATUS_DIAGNOSTICS, STATUS_HELP, STATUS_SEARCH};
use crate::tui::filters::OverlayPurpose;

use super::{App, InputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NormalAction {
    Quit,
    EnterSearch,
    SelectNext,
    SelectPrev,
    PageDown,
    PageUp,
    SelectFirst,
    SelectLast,
    Toggle,
    SelectVisible,
    SelectCategory,
    SelectGroup,
    ToggleGroups,
    FilterCategory,
    ResetFilters,
    RemoveLast,
    ClearSelection,
    LoadMore,
    Retry,
    ToggleBroader,
    ShowHelp,
    ShowDiagnostics,
}

impl NormalAction {
    fn from_event(key: &KeyEvent) -> Option<Self> {
        if matches!(key.code, KeyCode::Char('c')) && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Self::Quit);
        }

        match key.code {
            KeyCode::Char('q') => Some(Self::Quit),
            KeyCode::Char('/') => Some(Self::EnterSearch),
            KeyCode::Char('j') | KeyCode::Down => Some(Self::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Self::SelectPrev),
            KeyCode::PageDown => Some(Self::PageDown),
            KeyCode::PageUp => Some(Self::PageUp),
            KeyCode::Home => Some(Self::SelectFirst),
            KeyCode::End => Some(Self::SelectLast),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Self::Toggle),
            KeyCode::Char('a') => Some(Self::SelectVisible),
            KeyCode::Char('c') => Some(Self::SelectCategory),
            KeyCode::Char('g') => Some(Self::SelectGroup),
            KeyCode::Char('G') => Some(Self::ToggleGroups),
            KeyCode::Char('f') => Some(Self::FilterCategory),
            KeyCode::Char('R') => Some(Self::ResetFilters),
            KeyCode::Char('d') | KeyCode::Backspace => Some(Self::RemoveLast),
            KeyCode::Char('x') => Some(Self::ClearSelection),
            KeyCode::Char('m') => Some(Self::LoadMore),
            KeyCode::Char('r') => Some(Self::Retry),
            KeyCode::Char('b') => Some(Self::ToggleBroader),
            KeyCode::Char('?') => Some(Self::ShowHelp),
            KeyCode::Char('D') => Some(Self::ShowDiagnostics),
            _ => None,
        }
    }
}

impl App {
    pub(crate) fn on_key(&mut self, key: KeyEvent) {
        self.on_key_at(key, Instant::now());
    }

    /// Key handling with an explicit clock, so debounce timing can be driven
    /// from tests.
    pub(crate) fn on_key_at(&mut self, key: KeyEvent, now: Instant) {
        match self.input_mode {
            InputMode::Normal => {
                if let Some(action) = NormalAction::from_event(&key) {
                    self.execute_normal_action(action);
                }
            }
            InputMode::Search => self.handle_search_mode(key, now),
            InputMode::Category => self.handle_category_mode(key),
            InputMode::Help => self.handle_help_mode(key),
            InputMode::Diagnostics => self.handle_diagnostics_mode(key),
        }
    }

    pub(crate) fn execute_normal_action(&mut self, action: NormalAction) {
        match action {
            NormalAction::Quit => self.should_quit = true,
            NormalAction::EnterSearch => {
                self.input_mode = InputMode::Search;
                self.set_status_info(STATUS_SEARCH);
            }
            NormalAction::SelectNext => self.select_next(),
            NormalAction::SelectPrev => self.select_prev(),
            NormalAction::PageDown => self.page_down(),
            NormalAction::PageUp => self.page_up(),
            NormalAction::SelectFirst => self.select_first(),
            NormalAction::SelectLast => self.select_last(),
            NormalAction::Toggle => self.toggle_current(),
            NormalAction::SelectVisible => self.select_visible(),
            NormalAction::SelectCategory => self.open_category_overlay(OverlayPurpose::Select),
            NormalAction::SelectGroup => self.select_current_group(),
            NormalAction::ToggleGroups => self.toggle_grouped_view(),
            NormalAction::FilterCategory => self.open_category_overlay(OverlayPurpose::Filter),
            NormalAction::ResetFilters => self.reset_filters(),
            NormalAction::RemoveLast => self.remove_last_chip(),
            NormalAction::ClearSelection => self.clear_selection(),
            NormalAction::LoadMore => self.request_more(true),
            NormalAction::Retry => self.retry(),
            NormalAction::ToggleBroader => self.toggle_broader_target(),
            NormalAction::ShowHelp => {
                self.input_mode = InputMode::Help;
                self.set_status_info(STATUS_HELP);
            }
            NormalAction::ShowDiagnostics => {
                self.input_mode = InputMode::Diagnostics;
                self.set_status_info(STATUS_DIAGNOSTICS);
            }
        }
    }

    fn handle_search_mode(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('w') if ctrl => {
                self.query.delete_word();
                self.query_changed(now);
            }
            KeyCode::Char('u') if ctrl => {
                self.query.clear();
                self.query_changed(now);
            }
            KeyCode::Char(ch) if !ctrl => {
                self.query.insert_char(ch);
                self.query_changed(now);
            }
            KeyCode::Backspace => {
                self.query.backspace();
                self.query_changed(now);
            }
            KeyCode::Delete => {
                self.query.delete_char();
                self.query_changed(now);
            }
            KeyCode::Left => self.query.move_left(),
            KeyCode::Right => self.query.move_right(),
            KeyCode::Home => self.query.move_home(),
            KeyCode::End => self.query.move_end(),
            KeyCode::Esc => {
                if self.query.is_empty() {
                    self.leave_search();
                } else {
                    self.query.clear();
                    self.query_changed(now);
                }
            }
            KeyCode::Enter | KeyCode::Down | KeyCode::Tab => self.leave_search(),
            _ => {}
        }
    }

    fn leave_search(&mut self) {
        self.input_mode = InputMode::Normal;
        self.status = None;
    }

    fn handle_category_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return self.cancel_overlay(),
            KeyCode::Enter | KeyCode::Char(' ') => return self.commit_overlay(),
            _ => {}
        }
        let Some(overlay) = self.overlay.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        match key.code {
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => overlay.prev_column(),
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => overlay.next_column(),
            KeyCode::Up | KeyCode::Char('k') => overlay.prev_row(),
            KeyCode::Down | KeyCode::Char('j') => overlay.next_row(),
            _ => {}
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            self.input_mode = InputMode::Normal;
            self.status = None;
        }
    }

    fn handle_diagnostics_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('e') => self.export_diagnostics(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('D') | KeyCode::Char('q') => {
                self.input_mode = InputMode::Normal;
                self.status = None;
            }
            _ => {}
        }
    }
}
