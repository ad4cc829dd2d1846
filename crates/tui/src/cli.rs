use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

use crate::model::{Category, EntityId, EntityKind};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "atis",
    version,
    about = "Keyboard-first targeting picker for ATİS users and institutions.",
    after_help = "Examples:\n  atis                         Pick users (same as `atis pick`)\n  atis pick --kind institutions --selected 4,9\n  atis import --kind users users.json\n  atis list --kind users --category role:schooladmin --json"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive (e.g. "info", "atis_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Open the terminal picker (default command)
    Pick(PickArgs),
    /// Load a backend list response into the local catalog
    Import(ImportArgs),
    /// Print the candidates matching a filter
    List(ListArgs),
    /// Fill an empty catalog with a sample hierarchy
    Seed,
}

#[derive(Args, Debug, Clone)]
pub struct PickArgs {
    /// What to pick
    #[arg(long, value_enum, default_value_t = EntityKind::User)]
    pub kind: EntityKind,

    /// Ids already chosen by the enclosing form (comma-separated or repeated)
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub selected: Vec<EntityId>,

    /// Quiet period before a typed query is searched
    #[arg(long = "debounce-ms", value_name = "MS", value_parser = value_parser!(u64))]
    pub debounce_ms: Option<u64>,

    /// Extra rows rendered above and below the viewport
    #[arg(long, value_parser = value_parser!(usize))]
    pub overscan: Option<usize>,

    /// Entities requested per page
    #[arg(long = "page-size", value_parser = value_parser!(usize))]
    pub page_size: Option<usize>,

    /// Start with a competing target active (e.g. "all schools in Bakı")
    #[arg(long = "broader-target", value_name = "REASON")]
    pub broader_target: Option<String>,
}

impl Default for PickArgs {
    fn default() -> Self {
        Self {
            kind: EntityKind::User,
            selected: Vec::new(),
            debounce_ms: None,
            overscan: None,
            page_size: None,
            broader_target: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Kind of records in the file
    #[arg(long, value_enum)]
    pub kind: EntityKind,

    /// JSON file holding one list response
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Drop existing entities of this kind first
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = EntityKind::User)]
    pub kind: EntityKind,

    /// Case-insensitive text to match against name, detail and path
    #[arg(long, short)]
    pub query: Option<String>,

    /// Category filter as facet:value (role, level, type, region, sector)
    #[arg(long, short)]
    pub category: Option<Category>,

    /// Maximum rows to print
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("users", EntityKind::User)]
    #[case("user", EntityKind::User)]
    #[case("institutions", EntityKind::Institution)]
    #[case("institution", EntityKind::Institution)]
    fn kind_accepts_plural_and_singular(#[case] raw: &str, #[case] expected: EntityKind) {
        let cli = Cli::parse_from(["atis", "pick", "--kind", raw]);
        let Some(CliCommand::Pick(args)) = cli.command else {
            panic!("expected pick");
        };
        assert_eq!(args.kind, expected);
    }

    #[test]
    fn pick_accepts_selected_ids_and_overrides() {
        let cli = Cli::parse_from([
            "atis",
            "pick",
            "--kind",
            "institutions",
            "--selected",
            "4,9",
            "--selected",
            "ext-1",
            "--debounce-ms",
            "250",
        ]);
        let Some(CliCommand::Pick(args)) = cli.command else {
            panic!("expected pick");
        };
        assert_eq!(args.kind, EntityKind::Institution);
        assert_eq!(
            args.selected,
            vec![
                EntityId::Num(4),
                EntityId::Num(9),
                EntityId::Key("ext-1".into())
            ]
        );
        assert_eq!(args.debounce_ms, Some(250));
    }

    #[test]
    fn list_parses_category_filters() {
        let cli = Cli::parse_from(["atis", "list", "--category", "role:SchoolAdmin", "--json"]);
        let Some(CliCommand::List(args)) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.category, Some(Category::role("schooladmin")));
        assert!(args.json);
    }

    #[test]
    fn list_rejects_unknown_facets() {
        let parsed = Cli::try_parse_from(["atis", "list", "--category", "colour:red"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from(["atis", "seed", "--data-dir", "/tmp/atis", "--log", "debug"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/atis")));
        assert_eq!(cli.log_filter.as_deref(), Some("debug"));
    }
}
