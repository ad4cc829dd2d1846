use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CategoryParseError;

/// Stable identifier of a selectable entity. The backend hands out numeric
/// ids for users and institutions, but string keys are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Num(u64),
    Key(String),
}

impl EntityId {
    pub fn as_num(&self) -> Option<u64> {
        match self {
            EntityId::Num(value) => Some(*value),
            EntityId::Key(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Num(value) => write!(f, "{value}"),
            EntityId::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        EntityId::Num(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| EntityId::Key(value.to_string()))
    }
}

impl FromStr for EntityId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        if trimmed.is_empty() {
            return Err(anyhow!("Entity id cannot be empty"));
        }
        match trimmed.parse::<u64>() {
            Ok(value) => Ok(EntityId::Num(value)),
            Err(_) => Ok(EntityId::Key(trimmed.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Institution,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Institution => "institution",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Institution => "institutions",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "institution" | "institutions" => Ok(EntityKind::Institution),
            other => Err(anyhow!(
                "Unknown entity kind '{}': expected users|institutions",
                other
            )),
        }
    }
}

impl ValueEnum for EntityKind {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [EntityKind; 2] = [EntityKind::User, EntityKind::Institution];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.plural()).alias(self.as_str()))
    }
}

/// Dimension an entity can be categorized along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Role,
    Level,
    InstitutionType,
    Region,
    Sector,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::Role,
        Facet::Level,
        Facet::InstitutionType,
        Facet::Region,
        Facet::Sector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Role => "role",
            Facet::Level => "level",
            Facet::InstitutionType => "type",
            Facet::Region => "region",
            Facet::Sector => "sector",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Facet::Role => "Role",
            Facet::Level => "Level",
            Facet::InstitutionType => "Type",
            Facet::Region => "Region",
            Facet::Sector => "Sector",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Facet {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "role" => Ok(Facet::Role),
            "level" => Ok(Facet::Level),
            "type" | "institution_type" | "institution-type" => Ok(Facet::InstitutionType),
            "region" => Ok(Facet::Region),
            "sector" => Ok(Facet::Sector),
            other => Err(CategoryParseError::UnknownFacet(other.to_string())),
        }
    }
}

/// A `(facet, value)` tag used both for filtering and for bulk selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    pub facet: Facet,
    pub value: String,
}

impl Category {
    pub fn new(facet: Facet, value: impl AsRef<str>) -> Self {
        Self {
            facet,
            value: normalize_token(value.as_ref()),
        }
    }

    pub fn role(value: impl AsRef<str>) -> Self {
        Self::new(Facet::Role, value)
    }

    pub fn level(level: u8) -> Self {
        Self::new(Facet::Level, level.to_string())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.facet, self.value)
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (facet, value) = s
            .split_once(':')
            .ok_or_else(|| CategoryParseError::MissingSeparator(s.to_string()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(CategoryParseError::EmptyValue(s.to_string()));
        }
        Ok(Category::new(facet.parse()?, value))
    }
}

/// Trim and lower-case a category value so `" SchoolAdmin"` and
/// `"schooladmin"` land on the same tag.
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            detail: None,
            path: None,
            categories: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    pub fn has_category(&self, category: &Category) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn category_value(&self, facet: Facet) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.facet == facet)
            .map(|c| c.value.as_str())
    }

    /// Case-insensitive substring match against label, detail and path.
    /// `needle` must already be lower-cased; an empty needle matches.
    pub fn matches_query(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let contains = |value: &str| value.to_lowercase().contains(needle);
        contains(&self.label)
            || self.detail.as_deref().map(contains).unwrap_or(false)
            || self.path.as_deref().map(contains).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FilterState {
    pub query: String,
    pub category: Option<Category>,
}

impl FilterState {
    pub fn new(query: impl Into<String>, category: Option<Category>) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    pub fn normalized_query(&self) -> String {
        self.query.trim().to_lowercase()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty() && self.category.is_none()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(category) = &self.category {
            if !entity.has_category(category) {
                return false;
            }
        }
        entity.matches_query(&self.normalized_query())
    }

    pub fn summary(&self) -> Option<String> {
        if self.is_unfiltered() {
            return None;
        }
        let mut parts = Vec::new();
        let query = self.query.trim();
        if !query.is_empty() {
            parts.push(format!("\"{query}\""));
        }
        if let Some(category) = &self.category {
            parts.push(category.to_string());
        }
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", EntityId::Num(42))]
    #[case("#42", EntityId::Num(42))]
    #[case("inst-7", EntityId::Key("inst-7".into()))]
    fn entity_id_parses_numbers_and_keys(#[case] raw: &str, #[case] expected: EntityId) {
        assert_eq!(raw.parse::<EntityId>().unwrap(), expected);
    }

    #[test]
    fn category_parses_facet_and_normalizes_value() {
        let category: Category = "role: SchoolAdmin ".parse().unwrap();
        assert_eq!(category, Category::role("schooladmin"));
        assert_eq!(category.to_string(), "role:schooladmin");
    }

    #[rstest]
    #[case("schooladmin")]
    #[case("colour:red")]
    #[case("role:")]
    fn category_rejects_malformed_input(#[case] raw: &str) {
        assert!(raw.parse::<Category>().is_err());
    }

    #[test]
    fn empty_query_matches_everything() {
        let entity = Entity::new(1, EntityKind::User, "Aysel Mammadova");
        let filter = FilterState::new("   ", None);
        assert!(filter.is_unfiltered());
        assert!(filter.matches(&entity));
    }

    #[test]
    fn filter_matches_detail_and_category() {
        let entity = Entity::new(7, EntityKind::User, "Rauf Aliyev")
            .with_detail("rauf@atis.az")
            .with_category(Category::role("teacher"));

        assert!(FilterState::new("ATIS.AZ", None).matches(&entity));
        assert!(FilterState::new("", Some(Category::role("teacher"))).matches(&entity));
        assert!(!FilterState::new("rauf", Some(Category::role("schooladmin"))).matches(&entity));
    }

    #[test]
    fn filter_summary_lists_active_parts() {
        let filter = FilterState::new("baku", Some(Category::level(3)));
        assert_eq!(filter.summary().as_deref(), Some("\"baku\" | level:3"));
        assert!(FilterState::default().summary().is_none());
    }
}
