use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{named_params, types::Value, Connection, Row, ToSql};

use crate::config::AppConfig;
use crate::model::{Category, Entity, EntityId, EntityKind};
use crate::source::{FetchPage, FetchRequest};

/// Local SQLite cache of the entities a picker can target.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open catalog at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to configure SQLite WAL mode")?;

        let catalog = Self { conn };
        catalog.apply_migrations()?;
        Ok(catalog)
    }

    /// Insert or replace entities keyed by `(kind, id)`. Returns rows written.
    pub fn upsert_entities(&self, entities: &[Entity]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let imported_at = Utc::now().to_rfc3339();
        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entities (kind, id, id_is_num, label, detail, path, categories, imported_at) \
                 VALUES (:kind, :id, :id_is_num, :label, :detail, :path, :categories, :imported_at) \
                 ON CONFLICT(kind, id) DO UPDATE SET \
                    id_is_num = excluded.id_is_num, label = excluded.label, detail = excluded.detail, \
                    path = excluded.path, categories = excluded.categories, imported_at = excluded.imported_at",
            )?;
            for entity in entities {
                let categories = serde_json::to_string(&encode_categories(&entity.categories))?;
                written += stmt.execute(named_params! {
                    ":kind": entity.kind.as_str(),
                    ":id": entity.id.to_string(),
                    ":id_is_num": entity.id.as_num().is_some(),
                    ":label": entity.label,
                    ":detail": entity.detail,
                    ":path": entity.path,
                    ":categories": categories,
                    ":imported_at": imported_at,
                })?;
            }
        }
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('last_import', ?1) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [&imported_at],
        )?;
        tx.commit()?;
        tracing::debug!(written, "catalog upsert committed");
        Ok(written)
    }

    /// One page of entities matching `request.filter`, ordered by label.
    ///
    /// The category constraint runs in SQL. Text matching runs in Rust because
    /// SQLite's `lower()` only folds ASCII and the labels are Azerbaijani.
    pub fn fetch_page(&self, kind: EntityKind, request: &FetchRequest) -> Result<FetchPage> {
        let mut sql = String::from(
            "SELECT id, id_is_num, kind, label, detail, path, categories FROM entities WHERE kind = ?",
        );
        let mut values: Vec<Value> = vec![Value::from(kind.as_str().to_string())];

        if let Some(category) = &request.filter.category {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM json_each(entities.categories) WHERE json_each.value = ?)",
            );
            values.push(Value::from(category.to_string()));
        }
        sql.push_str(" ORDER BY label COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        let mut rows = stmt.query(&param_refs[..])?;
        let needle = request.filter.normalized_query();
        let mut matches = Vec::new();
        while let Some(row) = rows.next()? {
            let entity = map_entity(row)?;
            if entity.matches_query(&needle) {
                matches.push(entity);
            }
        }
        Ok(FetchPage::paginate(matches, request))
    }

    /// Every entity of `kind`, ordered like [`Self::fetch_page`].
    pub fn all_entities(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, id_is_num, kind, label, detail, path, categories FROM entities \
             WHERE kind = ? ORDER BY label COLLATE NOCASE ASC, id ASC",
        )?;
        let mut rows = stmt.query([kind.as_str()])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(map_entity(row)?);
        }
        Ok(entities)
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn clear_kind(&self, kind: EntityKind) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM entities WHERE kind = ?", [kind.as_str()])?;
        Ok(removed)
    }

    pub fn last_import(&self) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM meta WHERE key = 'last_import' LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                id_is_num INTEGER NOT NULL DEFAULT 1,
                label TEXT NOT NULL,
                detail TEXT,
                path TEXT,
                categories TEXT DEFAULT '[]',
                imported_at TEXT NOT NULL,
                PRIMARY KEY (kind, id)
             );
             CREATE INDEX IF NOT EXISTS idx_entities_label ON entities(kind, label);
            ",
        )?;
        Ok(())
    }
}

fn map_entity(row: &Row<'_>) -> Result<Entity> {
    let raw_id: String = row.get(0)?;
    let id_is_num: bool = row.get(1)?;
    let id = if id_is_num {
        EntityId::Num(
            raw_id
                .parse()
                .with_context(|| format!("Catalog id '{raw_id}' is not numeric"))?,
        )
    } else {
        EntityId::Key(raw_id)
    };

    Ok(Entity {
        id,
        kind: row.get::<_, String>(2)?.parse()?,
        label: row.get(3)?,
        detail: row.get(4)?,
        path: row.get(5)?,
        categories: decode_categories(row.get::<_, Option<String>>(6)?),
    })
}

fn encode_categories(categories: &[Category]) -> Vec<String> {
    categories.iter().map(|c| c.to_string()).collect()
}

fn decode_categories(raw: Option<String>) -> Vec<Category> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
        .unwrap_or_default()
        .iter()
        .filter_map(|token| token.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Facet, FilterState};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_catalog() -> (Catalog, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (Catalog::initialize(&config).expect("catalog"), dir)
    }

    fn users() -> Vec<Entity> {
        vec![
            Entity::new(3, EntityKind::User, "Əli Həsənov")
                .with_detail("ali@atis.az")
                .with_category(Category::role("schooladmin")),
            Entity::new(1, EntityKind::User, "Aysel Quliyeva")
                .with_detail("aysel@atis.az")
                .with_category(Category::role("teacher"))
                .with_category(Category::new(Facet::Region, "Bakı")),
            Entity::new("ext-9", EntityKind::User, "Murad Rzayev")
                .with_category(Category::role("teacher")),
        ]
    }

    #[test]
    fn upsert_and_fetch_roundtrip_preserves_ids_and_categories() {
        let (catalog, _guard) = temp_catalog();
        assert_eq!(catalog.upsert_entities(&users()).unwrap(), 3);

        let request = FetchRequest::first_page(FilterState::default(), 10);
        let page = catalog.fetch_page(EntityKind::User, &request).unwrap();
        let labels: Vec<&str> = page.items.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Aysel Quliyeva", "Murad Rzayev", "Əli Həsənov"]);
        assert_eq!(page.items[1].id, EntityId::Key("ext-9".into()));
        assert!(page.items[0].has_category(&Category::new(Facet::Region, "bakı")));
        let stamp = catalog.last_import().unwrap().expect("import stamp");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn category_filter_runs_in_sql_and_text_in_rust() {
        let (catalog, _guard) = temp_catalog();
        catalog.upsert_entities(&users()).unwrap();

        let teachers = FetchRequest::first_page(
            FilterState::new("", Some(Category::role("teacher"))),
            10,
        );
        assert_eq!(catalog.fetch_page(EntityKind::User, &teachers).unwrap().total, 2);

        let unicode = FetchRequest::first_page(FilterState::new("ƏLI", None), 10);
        let page = catalog.fetch_page(EntityKind::User, &unicode).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, EntityId::Num(3));
    }

    #[test]
    fn upsert_replaces_existing_rows() {
        let (catalog, _guard) = temp_catalog();
        catalog.upsert_entities(&users()).unwrap();
        let renamed = vec![Entity::new(1, EntityKind::User, "Aysel Məmmədova")];
        catalog.upsert_entities(&renamed).unwrap();

        assert_eq!(catalog.count(EntityKind::User).unwrap(), 3);
        let all = catalog.all_entities(EntityKind::User).unwrap();
        let labels: Vec<&str> = all.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Aysel Məmmədova", "Murad Rzayev", "Əli Həsənov"]);
        assert!(catalog.all_entities(EntityKind::Institution).unwrap().is_empty());
    }

    #[test]
    fn category_values_with_quotes_and_backslashes_still_match() {
        let (catalog, _guard) = temp_catalog();
        let odd = Category::new(Facet::Sector, r#"köhnə "şəhər" \ mərkəz"#);
        catalog
            .upsert_entities(&[
                Entity::new(7, EntityKind::User, "Kamran").with_category(odd.clone()),
                Entity::new(8, EntityKind::User, "Lalə")
                    .with_category(Category::new(Facet::Sector, "köhnə")),
            ])
            .unwrap();

        let request = FetchRequest::first_page(FilterState::new("", Some(odd)), 10);
        let page = catalog.fetch_page(EntityKind::User, &request).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, EntityId::Num(7));
    }

    #[test]
    fn clear_kind_only_touches_that_kind() {
        let (catalog, _guard) = temp_catalog();
        catalog.upsert_entities(&users()).unwrap();
        catalog
            .upsert_entities(&[Entity::new(1, EntityKind::Institution, "Bakı RTİ")])
            .unwrap();

        assert_eq!(catalog.clear_kind(EntityKind::User).unwrap(), 3);
        assert_eq!(catalog.count(EntityKind::Institution).unwrap(), 1);
    }
}
