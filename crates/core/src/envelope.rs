//! The backend's list envelope and the records it carries.
//!
//! Exactly one shape is accepted:
//! `{ "success"?, "message"?, "data": [...], "meta"?: {...} }`.
//! Anything else is an [`EnvelopeError`]; there is no probing for the
//! payload under alternative keys.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::EnvelopeError;
use crate::model::{Category, Entity, EntityKind, Facet};
use crate::source::FetchPage;

const REGION_LEVEL: u8 = 2;
const SECTOR_LEVEL: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: usize,
    pub last_page: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|err| EnvelopeError::Json(err.to_string()))?;
        if !value.is_object() {
            return Err(EnvelopeError::Shape("top level must be an object".into()));
        }
        let envelope: Self =
            serde_json::from_value(value).map_err(|err| EnvelopeError::Shape(err.to_string()))?;
        if envelope.success == Some(false) {
            return Err(EnvelopeError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "no message supplied".to_string()),
            ));
        }
        Ok(envelope)
    }
}

impl<T> ResponseEnvelope<T> {
    /// Convert records into a page. Without `meta` the payload is taken to be
    /// the complete result.
    pub fn into_page<F>(self, convert: F) -> FetchPage
    where
        F: Fn(T) -> Entity,
    {
        let items: Vec<Entity> = self.data.into_iter().map(convert).collect();
        let (total, has_more) = match &self.meta {
            Some(meta) => (meta.total.max(items.len()), meta.current_page < meta.last_page),
            None => (items.len(), false),
        };
        FetchPage {
            items,
            total,
            has_more,
        }
    }
}

/// Parse a list envelope of `kind` straight into entities.
pub fn parse_entities(kind: EntityKind, raw: &str) -> Result<FetchPage, EnvelopeError> {
    match kind {
        EntityKind::User => {
            Ok(ResponseEnvelope::<RemoteUser>::parse(raw)?.into_page(RemoteUser::into_entity))
        }
        EntityKind::Institution => Ok(ResponseEnvelope::<RemoteInstitution>::parse(raw)?
            .into_page(RemoteInstitution::into_entity)),
    }
}

/// Roles arrive either as a bare name or as a role object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteRole {
    Name(String),
    Object { name: Option<String> },
}

impl RemoteRole {
    pub fn normalized(&self) -> Option<String> {
        let raw = match self {
            RemoteRole::Name(name) => Some(name.as_str()),
            RemoteRole::Object { name } => name.as_deref(),
        }?;
        let role = raw.trim().to_lowercase();
        (!role.is_empty()).then_some(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HierarchyNode {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub level: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUserInstitution {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub hierarchy_path: Vec<HierarchyNode>,
}

impl RemoteUserInstitution {
    /// Node at `level` from the breadcrumb, or the institution itself when it
    /// sits at that level.
    fn node_at(&self, level: u8) -> Option<&str> {
        self.hierarchy_path
            .iter()
            .find(|node| node.level == Some(level))
            .map(|node| node.name.as_str())
            .or_else(|| (self.level == Some(level)).then_some(self.name.as_str()))
    }

    fn breadcrumb(&self) -> String {
        if self.hierarchy_path.is_empty() {
            return self.name.clone();
        }
        self.hierarchy_path
            .iter()
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<RemoteRole>,
    #[serde(default)]
    pub institution: Option<RemoteUserInstitution>,
}

impl RemoteUser {
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new(self.id, EntityKind::User, self.name.trim());
        if let Some(email) = self.email.filter(|e| !e.trim().is_empty()) {
            entity = entity.with_detail(email);
        }
        if let Some(role) = self.role.as_ref().and_then(RemoteRole::normalized) {
            entity = entity.with_category(Category::role(role));
        }
        if let Some(institution) = &self.institution {
            if let Some(region) = institution.node_at(REGION_LEVEL) {
                entity = entity.with_category(Category::new(Facet::Region, region));
            }
            if let Some(sector) = institution.node_at(SECTOR_LEVEL) {
                entity = entity.with_category(Category::new(Facet::Sector, sector));
            }
            entity = entity.with_path(institution.breadcrumb());
        }
        entity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteInstitutionType {
    Key(String),
    Object {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl RemoteInstitutionType {
    fn key(&self) -> Option<&str> {
        match self {
            RemoteInstitutionType::Key(key) => Some(key.as_str()),
            RemoteInstitutionType::Object { key, name } => key.as_deref().or(name.as_deref()),
        }
        .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteParent {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteInstitution {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default, rename = "type")]
    pub institution_type: Option<RemoteInstitutionType>,
    #[serde(default, alias = "code")]
    pub institution_code: Option<String>,
    #[serde(default)]
    pub parent: Option<RemoteParent>,
}

impl RemoteInstitution {
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new(self.id, EntityKind::Institution, self.name.trim());
        if let Some(code) = self.institution_code.filter(|c| !c.trim().is_empty()) {
            entity = entity.with_detail(code);
        }
        if let Some(level) = self.level {
            entity = entity.with_category(Category::level(level));
        }
        if let Some(key) = self.institution_type.as_ref().and_then(|t| t.key()) {
            entity = entity.with_category(Category::new(Facet::InstitutionType, key));
        }
        if let Some(parent) = self.parent {
            entity = entity.with_path(parent.name);
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const USERS: &str = r#"{
        "success": true,
        "data": [
            {
                "id": 12,
                "name": " Aysel Quliyeva ",
                "email": "aysel@atis.az",
                "role": {"name": "SektorAdmin"},
                "institution": {
                    "id": 40, "name": "Xətai Sektoru", "level": 3,
                    "hierarchy_path": [
                        {"id": 1, "name": "Nazirlik", "level": 1},
                        {"id": 2, "name": "Bakı", "level": 2}
                    ]
                }
            },
            {"id": 13, "name": "Rauf Əliyev", "role": "teacher"}
        ],
        "meta": {"current_page": 1, "per_page": 2, "total": 7, "last_page": 4}
    }"#;

    #[test]
    fn users_convert_with_role_region_and_sector() {
        let page = parse_entities(EntityKind::User, USERS).unwrap();
        assert_eq!(page.total, 7);
        assert!(page.has_more);

        let aysel = &page.items[0];
        assert_eq!(aysel.id, EntityId::Num(12));
        assert_eq!(aysel.label, "Aysel Quliyeva");
        assert_eq!(aysel.category_value(Facet::Role), Some("sektoradmin"));
        assert_eq!(aysel.category_value(Facet::Region), Some("bakı"));
        assert_eq!(aysel.category_value(Facet::Sector), Some("xətai sektoru"));
        assert_eq!(aysel.path.as_deref(), Some("Nazirlik / Bakı"));

        let rauf = &page.items[1];
        assert_eq!(rauf.category_value(Facet::Role), Some("teacher"));
        assert!(rauf.path.is_none());
    }

    #[test]
    fn institutions_accept_string_or_object_types() {
        let raw = r#"{"data": [
            {"id": 5, "name": "20 nömrəli məktəb", "level": 4, "type": {"key": "school"},
             "code": "SCH-20", "parent": {"id": 40, "name": "Xətai Sektoru"}},
            {"id": 6, "name": "Bakı şəhər idarəsi", "level": 2, "type": "regional_office"}
        ]}"#;
        let page = parse_entities(EntityKind::Institution, raw).unwrap();
        assert_eq!(page.total, 2);
        assert!(!page.has_more);
        assert_eq!(page.items[0].detail.as_deref(), Some("SCH-20"));
        assert!(page.items[0].has_category(&Category::level(4)));
        assert_eq!(
            page.items[0].category_value(Facet::InstitutionType),
            Some("school")
        );
        assert_eq!(page.items[0].path.as_deref(), Some("Xətai Sektoru"));
        assert_eq!(
            page.items[1].category_value(Facet::InstitutionType),
            Some("regional_office")
        );
    }

    #[rstest]
    #[case::not_json("{data: ", "not valid JSON")]
    #[case::bare_array("[]", "does not match")]
    #[case::nested_payload(r#"{"data": {"data": []}}"#, "does not match")]
    #[case::missing_data(r#"{"users": []}"#, "does not match")]
    #[case::rejected(r#"{"success": false, "message": "forbidden", "data": []}"#, "forbidden")]
    fn unexpected_shapes_fail_fast(#[case] raw: &str, #[case] fragment: &str) {
        let err = parse_entities(EntityKind::User, raw).unwrap_err();
        assert!(
            err.to_string().contains(fragment),
            "{err} should mention {fragment}"
        );
    }

    #[test]
    fn blank_role_objects_are_ignored() {
        let role = RemoteRole::Object { name: Some("  ".into()) };
        assert_eq!(role.normalized(), None);
        assert_eq!(
            RemoteRole::Name("RegionAdmin".into()).normalized().as_deref(),
            Some("regionadmin")
        );
    }
}
