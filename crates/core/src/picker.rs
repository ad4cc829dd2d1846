//! Picker composition: candidates, selection and bulk actions in one place.
//!
//! The picker never performs I/O. Callers ask it for [`FetchTicket`]s, run
//! them however they like (usually through [`crate::loader::FetchDriver`]),
//! and hand the outcomes back through [`Picker::apply`]. Whatever order those
//! outcomes arrive in, only the current generation reaches the candidate list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::FetchError;
use crate::facets::{group_by_hierarchy, FacetSummary, GroupKey, RegionGroup};
use crate::loader::{FetchOutcome, FetchTicket, FetchTracker};
use crate::model::{Category, Entity, EntityId, EntityKind, FilterState};
use crate::selection::SelectionSet;
use crate::source::FetchRequest;
use crate::window::{ScrollState, ViewportWindow};

pub type SelectionCallback = Box<dyn FnMut(&[EntityId]) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Empty,
    Ready,
    Failed(FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Changed,
    Unchanged,
    /// A competing selection mode is active; nothing was touched.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied { items: usize },
    Stale,
    Failed,
}

/// One entry of the selected-summary strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub id: EntityId,
    pub label: String,
    /// False when the id is not in the known universe and the label is a
    /// placeholder.
    pub resolved: bool,
}

pub struct Picker {
    kind: EntityKind,
    page_size: usize,
    universe: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    candidates: Vec<Entity>,
    selection: SelectionSet,
    tracker: FetchTracker,
    filter: FilterState,
    list_state: ListState,
    received: usize,
    total: usize,
    has_more: bool,
    competing: Option<String>,
    on_change: Option<SelectionCallback>,
    diagnostics: Arc<Diagnostics>,
}

impl Picker {
    pub fn new(kind: EntityKind, page_size: usize, diagnostics: Arc<Diagnostics>) -> Self {
        diagnostics.record(DiagnosticEvent::PickerOpened {
            kind: kind.plural().to_string(),
        });
        Self {
            kind,
            page_size: page_size.max(1),
            universe: Vec::new(),
            index: HashMap::new(),
            candidates: Vec::new(),
            selection: SelectionSet::new(),
            tracker: FetchTracker::new(),
            filter: FilterState::default(),
            list_state: ListState::Loading,
            received: 0,
            total: 0,
            has_more: false,
            competing: None,
            on_change: None,
            diagnostics,
        }
    }

    /// Register the parent's change callback. It receives the full id list
    /// after every committed selection change.
    pub fn on_selection_change<F>(&mut self, callback: F)
    where
        F: FnMut(&[EntityId]) + Send + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn candidates(&self) -> &[Entity] {
        &self.candidates
    }

    pub fn list_state(&self) -> &ListState {
        &self.list_state
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selected_ids(&self) -> Vec<EntityId> {
        self.selection.ids()
    }

    pub fn is_locked(&self) -> bool {
        self.competing.is_some()
    }

    pub fn competing_reason(&self) -> Option<&str> {
        self.competing.as_deref()
    }

    pub fn lookup(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).map(|pos| &self.universe[*pos])
    }

    /// Entities every fetch so far has revealed, plus any seeded ones.
    pub fn universe(&self) -> &[Entity] {
        &self.universe
    }

    /// Make entities known without showing them as candidates, e.g. the full
    /// list a parent already holds.
    pub fn seed_universe<I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = Entity>,
    {
        for entity in entities {
            self.remember(entity);
        }
    }

    // Fetching

    /// Start loading the first page for `filter`, superseding any fetch
    /// still in flight.
    pub fn begin_fetch(&mut self, filter: FilterState) -> FetchTicket {
        self.filter = filter.clone();
        self.reset_results();
        self.tracker
            .issue(FetchRequest::first_page(filter, self.page_size))
    }

    /// Next page of the current filter, when the last page said there is one.
    pub fn load_more(&mut self) -> Option<FetchTicket> {
        if !self.has_more || self.list_state != ListState::Ready {
            return None;
        }
        let request = FetchRequest::first_page(self.filter.clone(), self.page_size)
            .next_page(self.received);
        self.list_state = ListState::Loading;
        Some(self.tracker.continue_with(request))
    }

    /// Re-issue the request that failed, unchanged.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if !matches!(self.list_state, ListState::Failed(_)) {
            return None;
        }
        let ticket = self.tracker.retry()?;
        if ticket.is_first_page() {
            self.reset_results();
        } else {
            self.list_state = ListState::Loading;
        }
        Some(ticket)
    }

    pub fn apply(&mut self, outcome: FetchOutcome) -> ApplyOutcome {
        let FetchOutcome { ticket, result } = outcome;
        if !self.tracker.accepts(&ticket) {
            self.diagnostics.record(DiagnosticEvent::FetchDiscarded {
                generation: ticket.generation,
                current: self.tracker.generation(),
            });
            return ApplyOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.diagnostics.record(DiagnosticEvent::FetchFailed {
                    generation: ticket.generation,
                    error: err.to_string(),
                });
                self.list_state = ListState::Failed(err);
                return ApplyOutcome::Failed;
            }
        };

        if ticket.is_first_page() {
            self.candidates.clear();
            self.received = 0;
        }
        self.received += page.items.len();
        self.total = page.total;
        self.has_more = page.has_more;

        let mut shown: HashSet<EntityId> = self.candidates.iter().map(|e| e.id.clone()).collect();
        let mut added = 0usize;
        for entity in page.items {
            self.remember(entity.clone());
            if self.filter.matches(&entity) && shown.insert(entity.id.clone()) {
                self.candidates.push(entity);
                added += 1;
            }
        }

        self.list_state = if self.candidates.is_empty() {
            ListState::Empty
        } else {
            ListState::Ready
        };
        self.diagnostics.record(DiagnosticEvent::FetchApplied {
            generation: ticket.generation,
            items: added,
            total: self.total,
        });
        ApplyOutcome::Applied { items: added }
    }

    // Selection

    pub fn toggle(&mut self, id: &EntityId) -> SelectionOutcome {
        self.commit("toggle", |selection| {
            selection.flip(id);
            true
        })
    }

    /// Drop one id, e.g. from its chip. Absent ids are a no-op.
    pub fn remove(&mut self, id: &EntityId) -> SelectionOutcome {
        self.commit("remove", |selection| selection.discard(id))
    }

    /// Add every current candidate. Selections outside the current filter
    /// are left alone and nothing outside it is added.
    pub fn select_all_visible(&mut self) -> SelectionOutcome {
        let ids: Vec<EntityId> = self.candidates.iter().map(|e| e.id.clone()).collect();
        self.commit("select_all_visible", |selection| selection.insert_all(ids) > 0)
    }

    /// Add every known entity in `category`, whether or not the current
    /// filter shows it.
    pub fn select_by_category(&mut self, category: &Category) -> SelectionOutcome {
        let ids = self.universe_ids(|entity| entity.has_category(category));
        self.commit("select_by_category", |selection| selection.insert_all(ids) > 0)
    }

    /// Like [`Self::select_by_category`] with an arbitrary predicate.
    pub fn select_where<P>(&mut self, predicate: P) -> SelectionOutcome
    where
        P: Fn(&Entity) -> bool,
    {
        let ids = self.universe_ids(predicate);
        self.commit("select_where", |selection| selection.insert_all(ids) > 0)
    }

    pub fn select_group(&mut self, group: &GroupKey) -> SelectionOutcome {
        let ids = self.universe_ids(|entity| group.matches(entity));
        self.commit("select_group", |selection| selection.insert_all(ids) > 0)
    }

    pub fn clear_selection(&mut self) -> SelectionOutcome {
        self.commit("clear", SelectionSet::clear_in_place)
    }

    /// Activate (`Some(reason)`) or lift (`None`) a competing selection mode.
    /// Activation empties the selection and keeps it empty until lifted.
    pub fn set_competing_mode(&mut self, reason: Option<String>) -> SelectionOutcome {
        match reason {
            Some(reason) => {
                let cleared = self.selection.clear_in_place();
                if cleared {
                    self.notify("competing_mode");
                }
                self.diagnostics.record(DiagnosticEvent::SelectionLocked {
                    reason: reason.clone(),
                });
                self.competing = Some(reason);
                if cleared {
                    SelectionOutcome::Changed
                } else {
                    SelectionOutcome::Unchanged
                }
            }
            None => {
                if self.competing.take().is_some() {
                    self.diagnostics.record(DiagnosticEvent::SelectionUnlocked);
                }
                SelectionOutcome::Unchanged
            }
        }
    }

    /// Adopt the parent's value. The parent already knows it, so no callback
    /// fires. While locked a non-empty value is refused.
    pub fn sync_selected(&mut self, ids: &[EntityId]) -> SelectionOutcome {
        if self.is_locked() && !ids.is_empty() {
            return SelectionOutcome::Locked;
        }
        let next = SelectionSet::from_ids(ids.iter().cloned());
        if next == self.selection && next.ids() == self.selection.ids() {
            return SelectionOutcome::Unchanged;
        }
        self.selection = next;
        SelectionOutcome::Changed
    }

    /// Chips in selection order. Ids the picker cannot resolve keep a
    /// placeholder chip instead of disappearing.
    pub fn selected_chips(&self) -> Vec<Chip> {
        self.selection
            .ids()
            .into_iter()
            .map(|id| match self.lookup(&id) {
                Some(entity) => Chip {
                    label: entity.label.clone(),
                    id,
                    resolved: true,
                },
                None => Chip {
                    label: format!("ID #{id}"),
                    id,
                    resolved: false,
                },
            })
            .collect()
    }

    // Rendering helpers

    pub fn window(&self, scroll: &ScrollState) -> ViewportWindow {
        scroll.window(self.candidates.len())
    }

    pub fn windowed(&self, scroll: &ScrollState) -> &[Entity] {
        &self.candidates[self.window(scroll).range()]
    }

    pub fn facet_summary(&self) -> FacetSummary {
        FacetSummary::from_entities(&self.universe)
    }

    pub fn groups(&self) -> Vec<RegionGroup> {
        group_by_hierarchy(&self.candidates)
    }

    fn reset_results(&mut self) {
        self.candidates.clear();
        self.received = 0;
        self.total = 0;
        self.has_more = false;
        self.list_state = ListState::Loading;
    }

    fn remember(&mut self, entity: Entity) {
        match self.index.get(&entity.id) {
            Some(pos) => self.universe[*pos] = entity,
            None => {
                self.index.insert(entity.id.clone(), self.universe.len());
                self.universe.push(entity);
            }
        }
    }

    fn universe_ids<P>(&self, predicate: P) -> Vec<EntityId>
    where
        P: Fn(&Entity) -> bool,
    {
        self.universe
            .iter()
            .filter(|entity| predicate(entity))
            .map(|entity| entity.id.clone())
            .collect()
    }

    /// Apply `update` to the selection in place. It reports whether the set
    /// changed; only changes notify.
    fn commit<F>(&mut self, action: &str, update: F) -> SelectionOutcome
    where
        F: FnOnce(&mut SelectionSet) -> bool,
    {
        if self.is_locked() {
            return SelectionOutcome::Locked;
        }
        if !update(&mut self.selection) {
            return SelectionOutcome::Unchanged;
        }
        self.notify(action);
        SelectionOutcome::Changed
    }

    fn notify(&mut self, action: &str) {
        let ids = self.selection.ids();
        self.diagnostics.record(DiagnosticEvent::SelectionChanged {
            action: action.to_string(),
            selected: ids.len(),
        });
        if let Some(callback) = self.on_change.as_mut() {
            callback(&ids);
        }
    }
}
