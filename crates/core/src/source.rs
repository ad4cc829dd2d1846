//! Entity sources: where picker candidates come from.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::model::{Entity, EntityKind, FilterState};

pub const DEFAULT_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchRequest {
    pub filter: FilterState,
    pub cursor: usize,
    pub limit: usize,
}

impl FetchRequest {
    pub fn first_page(filter: FilterState, limit: usize) -> Self {
        Self {
            filter,
            cursor: 0,
            limit,
        }
    }

    pub fn next_page(&self, cursor: usize) -> Self {
        Self {
            filter: self.filter.clone(),
            cursor,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchPage {
    pub items: Vec<Entity>,
    pub total: usize,
    pub has_more: bool,
}

impl FetchPage {
    /// Slice one page out of an already filtered, ordered list.
    pub fn paginate(matches: Vec<Entity>, request: &FetchRequest) -> Self {
        let total = matches.len();
        let items: Vec<Entity> = matches
            .into_iter()
            .skip(request.cursor)
            .take(request.limit)
            .collect();
        let has_more = request.cursor + items.len() < total;
        Self {
            items,
            total,
            has_more,
        }
    }
}

/// Lists candidate entities for a filter. Implementations report failures as
/// values; superseded responses are discarded by the caller, not the source.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage, FetchError>;

    /// Every entity the source can return, unfiltered. Bulk selection and
    /// chip labels resolve against this rather than the loaded pages.
    ///
    /// The default walks unfiltered pages until the source reports no more.
    async fn universe(&self) -> Result<Vec<Entity>, FetchError> {
        let mut request = FetchRequest::first_page(FilterState::default(), DEFAULT_PAGE_SIZE);
        let mut entities = Vec::new();
        loop {
            let page = self.fetch(&request).await?;
            let received = page.items.len();
            entities.extend(page.items);
            if !page.has_more || received == 0 {
                return Ok(entities);
            }
            request = request.next_page(request.cursor + received);
        }
    }
}

/// Fixed universe held in memory; also the reference filtering behaviour.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entities: Arc<Mutex<Vec<Entity>>>,
}

impl MemorySource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: Arc::new(Mutex::new(entities)),
        }
    }

    pub fn replace(&self, entities: Vec<Entity>) {
        *self.entities.lock() = entities;
    }

    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.lock().is_empty()
    }

    pub fn query(&self, request: &FetchRequest) -> FetchPage {
        let matches: Vec<Entity> = self
            .entities
            .lock()
            .iter()
            .filter(|entity| request.filter.matches(entity))
            .cloned()
            .collect();
        FetchPage::paginate(matches, request)
    }
}

#[async_trait]
impl EntitySource for MemorySource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage, FetchError> {
        Ok(self.query(request))
    }

    async fn universe(&self) -> Result<Vec<Entity>, FetchError> {
        Ok(self.entities.lock().clone())
    }
}

/// Reads candidates of one kind from the local SQLite catalog.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    config: AppConfig,
    kind: EntityKind,
}

impl CatalogSource {
    pub fn new(config: AppConfig, kind: EntityKind) -> anyhow::Result<Self> {
        Catalog::initialize(&config)?;
        Ok(Self { config, kind })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

#[async_trait]
impl EntitySource for CatalogSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage, FetchError> {
        let config = self.config.clone();
        let kind = self.kind;
        let request = request.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<FetchPage> {
            let catalog = Catalog::initialize(&config)?;
            catalog.fetch_page(kind, &request)
        })
        .await
        .map_err(|err| FetchError::Aborted(err.to_string()))
        .and_then(|result| result.map_err(|err| FetchError::Storage(format!("{err:#}"))))
    }

    async fn universe(&self) -> Result<Vec<Entity>, FetchError> {
        let config = self.config.clone();
        let kind = self.kind;
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Entity>> {
            Catalog::initialize(&config)?.all_entities(kind)
        })
        .await
        .map_err(|err| FetchError::Aborted(err.to_string()))
        .and_then(|result| result.map_err(|err| FetchError::Storage(format!("{err:#}"))))
    }
}
