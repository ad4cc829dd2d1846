pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod facets;
pub mod loader;
pub mod model;
pub mod picker;
pub mod search;
pub mod seeding;
pub mod selection;
pub mod source;
pub mod window;

pub use catalog::Catalog;
pub use config::{AppConfig, PickerSettings};
pub use diagnostics::{DiagnosticEvent, DiagnosticRecord, Diagnostics};
pub use envelope::{parse_entities, PageMeta, ResponseEnvelope};
pub use error::{CategoryParseError, EnvelopeError, FetchError};
pub use facets::{group_by_hierarchy, FacetSummary, GroupKey, RegionGroup, SectorGroup};
pub use loader::{FetchDriver, FetchOutcome, FetchTicket, FetchTracker};
pub use model::*;
pub use picker::{ApplyOutcome, Chip, ListState, Picker, SelectionOutcome};
pub use search::SearchController;
pub use seeding::{sample_entities, seed_sample_catalog, SeedSummary};
pub use selection::SelectionSet;
pub use source::{CatalogSource, EntitySource, FetchPage, FetchRequest, MemorySource};
pub use window::{compute_window, ScrollState, ViewportWindow};
