use std::fmt;
use std::fs;
use std::io::Write;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::cli::{CliCommand, ImportArgs, ListArgs};
use crate::config::AppConfig;
use crate::core::{parse_entities, seed_sample_catalog, Catalog, FetchRequest, SeedSummary};
use crate::model::{Entity, EntityKind, FilterState};

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Import(args) => handle_import(config, &args, &mut writer),
        CliCommand::List(args) => handle_list(config, &args, &mut writer),
        CliCommand::Seed => handle_seed(config, &mut writer),
        CliCommand::Pick(_) => Err(anyhow!("launch the picker directly")),
    }
}

fn handle_import<W: Write>(config: &AppConfig, args: &ImportArgs, mut writer: W) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let page = parse_entities(args.kind, &raw)
        .with_context(|| format!("{} is not a {} list", args.file.display(), args.kind))?;

    let catalog = Catalog::initialize(config)?;
    let replaced = if args.replace {
        catalog.clear_kind(args.kind)?
    } else {
        0
    };
    let imported = catalog.upsert_entities(&page.items)?;
    let summary = ImportSummary {
        kind: args.kind,
        imported,
        replaced,
        reported_total: page.total,
        catalog_total: catalog.count(args.kind)?,
    };
    tracing::info!(
        kind = args.kind.as_str(),
        imported,
        replaced,
        "import finished"
    );
    writeln!(writer, "{summary}")?;
    Ok(())
}

fn handle_list<W: Write>(config: &AppConfig, args: &ListArgs, mut writer: W) -> Result<()> {
    let catalog = Catalog::initialize(config)?;
    let filter = FilterState::new(
        args.query.clone().unwrap_or_default(),
        args.category.clone(),
    );
    let request = FetchRequest::first_page(filter, args.limit.max(1));
    let page = catalog.fetch_page(args.kind, &request)?;

    if args.json {
        let output = ListOutput {
            kind: args.kind,
            total: page.total,
            has_more: page.has_more,
            items: &page.items,
        };
        serde_json::to_writer_pretty(&mut writer, &output)?;
        writeln!(writer)?;
        return Ok(());
    }

    if page.items.is_empty() {
        writeln!(writer, "No {} match", args.kind.plural())?;
        return Ok(());
    }
    for entity in &page.items {
        writeln!(writer, "{}", ListLine(entity))?;
    }
    if page.has_more {
        writeln!(
            writer,
            "… {} more (raise --limit to see them)",
            page.total - page.items.len()
        )?;
    }
    Ok(())
}

fn handle_seed<W: Write>(config: &AppConfig, mut writer: W) -> Result<()> {
    let catalog = Catalog::initialize(config)?;
    let summary = seed_sample_catalog(&catalog)?;
    writeln!(writer, "{}", SeedLine(summary))?;
    Ok(())
}

struct ImportSummary {
    kind: EntityKind,
    imported: usize,
    replaced: usize,
    reported_total: usize,
    catalog_total: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} {}",
            self.imported,
            plural(self.kind, self.imported)
        )?;
        if self.replaced > 0 {
            write!(f, " (replaced {})", self.replaced)?;
        }
        if self.reported_total > self.imported {
            write!(
                f,
                "; the response reports {} in total, import the remaining pages too",
                self.reported_total
            )?;
        }
        write!(f, "\nCatalog now holds {}", self.catalog_total)
    }
}

#[derive(Serialize)]
struct ListOutput<'a> {
    kind: EntityKind,
    total: usize,
    has_more: bool,
    items: &'a [Entity],
}

struct ListLine<'a>(&'a Entity);

impl fmt::Display for ListLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entity = self.0;
        write!(f, "{:>8}  {}", entity.id, entity.label)?;
        if let Some(detail) = &entity.detail {
            write!(f, "  <{detail}>")?;
        }
        if !entity.categories.is_empty() {
            let tags: Vec<String> = entity.categories.iter().map(|c| c.to_string()).collect();
            write!(f, "  [{}]", tags.join(", "))?;
        }
        Ok(())
    }
}

struct SeedLine(SeedSummary);

impl fmt::Display for SeedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.skipped {
            write!(f, "Catalog already has data; nothing seeded")
        } else {
            write!(
                f,
                "Seeded {} users and {} institutions",
                self.0.users, self.0.institutions
            )
        }
    }
}

fn plural(kind: EntityKind, count: usize) -> &'static str {
    if count == 1 {
        kind.as_str()
    } else {
        kind.plural()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    fn run(config: &AppConfig, command: CliCommand) -> String {
        let mut output = Vec::new();
        execute(config, command, &mut output).expect("execute");
        String::from_utf8(output).expect("utf8")
    }

    fn write_fixture(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("users.json");
        fs::write(&path, body).expect("write fixture");
        path
    }

    #[test]
    fn import_reports_counts_and_remaining_pages() {
        let (config, dir) = temp_config();
        let file = write_fixture(
            &dir,
            r#"{"data": [
                {"id": 1, "name": "Aysel Quliyeva", "role": "schooladmin"},
                {"id": 2, "name": "Rauf Əliyev", "role": {"name": "Teacher"}}
            ], "meta": {"current_page": 1, "per_page": 2, "total": 5, "last_page": 3}}"#,
        );

        let output = run(
            &config,
            CliCommand::Import(ImportArgs {
                kind: EntityKind::User,
                file,
                replace: false,
            }),
        );

        assert!(output.contains("Imported 2 users"));
        assert!(output.contains("reports 5 in total"));
        assert!(output.contains("Catalog now holds 2"));
    }

    #[test]
    fn import_rejects_unexpected_shapes() {
        let (config, dir) = temp_config();
        let file = write_fixture(&dir, r#"{"users": []}"#);
        let args = ImportArgs {
            kind: EntityKind::User,
            file,
            replace: false,
        };

        let err = execute(&config, CliCommand::Import(args), Vec::<u8>::new()).unwrap_err();
        assert!(format!("{err:#}").contains("does not match the list envelope"));
    }

    #[test]
    fn list_filters_seeded_catalog_by_category() {
        let (config, _dir) = temp_config();
        assert!(run(&config, CliCommand::Seed).contains("Seeded"));

        let output = run(
            &config,
            CliCommand::List(ListArgs {
                kind: EntityKind::Institution,
                query: None,
                category: Some(Category::level(2)),
                limit: 50,
                json: false,
            }),
        );
        assert_eq!(output.lines().count(), 3);
        assert!(output.contains("Gəncə Regional Təhsil İdarəsi"));
    }

    #[test]
    fn list_json_includes_totals() {
        let (config, _dir) = temp_config();
        run(&config, CliCommand::Seed);

        let output = run(
            &config,
            CliCommand::List(ListArgs {
                kind: EntityKind::User,
                query: Some("XƏTAI".into()),
                category: None,
                limit: 1,
                json: true,
            }),
        );
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed["kind"], "user");
        assert_eq!(parsed["items"].as_array().map(Vec::len), Some(1));
        // sector admin, 3 school admins, 6 teachers
        assert_eq!(parsed["total"], 10);
        assert_eq!(parsed["has_more"], true);
    }

    #[test]
    fn seeding_twice_is_a_no_op() {
        let (config, _dir) = temp_config();
        run(&config, CliCommand::Seed);
        assert!(run(&config, CliCommand::Seed).contains("nothing seeded"));
    }
}
