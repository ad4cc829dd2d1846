//! Free-text search with input debouncing plus a single category filter.
//!
//! Time is always passed in by the caller. The front end feeds `Instant::now()`
//! from its tick loop; tests feed synthetic instants.

use std::time::{Duration, Instant};

use crate::model::{Category, FilterState};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub struct SearchController {
    query: String,
    debounced_query: String,
    category: Option<Category>,
    debounce: Duration,
    deadline: Option<Instant>,
    published: FilterState,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchController {
    pub fn new(debounce: Duration) -> Self {
        Self {
            query: String::new(),
            debounced_query: String::new(),
            category: None,
            debounce,
            deadline: None,
            published: FilterState::default(),
        }
    }

    /// Raw text as typed.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn debounced_query(&self) -> &str {
        &self.debounced_query
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// When the pending keystrokes will be published, if any are pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The filter the candidate list should currently reflect.
    pub fn filter_state(&self) -> FilterState {
        FilterState::new(self.debounced_query.clone(), self.category.clone())
    }

    /// Record a keystroke. Nothing is published until [`Self::poll`] observes
    /// a quiet period of `debounce` after the latest change.
    pub fn set_query(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        if text == self.query {
            return;
        }
        self.query = text;
        self.deadline = Some(now + self.debounce);
    }

    /// Publish the debounced query once the quiet period has elapsed. Returns
    /// the new filter only when the effective filter actually changed.
    pub fn poll(&mut self, now: Instant) -> Option<FilterState> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.debounced_query = self.query.trim().to_string();
        self.publish()
    }

    /// Category changes are discrete actions and apply immediately.
    /// Re-selecting the active category switches it off.
    pub fn toggle_category(&mut self, category: Category) -> Option<FilterState> {
        if self.category.as_ref() == Some(&category) {
            self.category = None;
        } else {
            self.category = Some(category);
        }
        self.publish()
    }

    pub fn set_category(&mut self, category: Option<Category>) -> Option<FilterState> {
        self.category = category;
        self.publish()
    }

    /// Drop query and category at once, skipping the debounce.
    pub fn reset(&mut self) -> Option<FilterState> {
        self.query.clear();
        self.debounced_query.clear();
        self.category = None;
        self.deadline = None;
        self.publish()
    }

    fn publish(&mut self) -> Option<FilterState> {
        let state = self.filter_state();
        if state == self.published {
            return None;
        }
        tracing::debug!(query = state.query.as_str(), category = ?state.category, "search filter published");
        self.published = state.clone();
        Some(state)
    }
}
