use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Category, Entity, EntityId, Facet};

/// Per-facet counts of category values across a set of entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetSummary {
    counts: BTreeMap<Facet, BTreeMap<String, usize>>,
    untagged: BTreeMap<Facet, usize>,
}

impl FacetSummary {
    pub fn from_entities<'a, I>(entities: I) -> Self
    where
        I: IntoIterator<Item = &'a Entity>,
    {
        let mut summary = Self::default();
        for entity in entities {
            for facet in Facet::ALL {
                let mut tagged = false;
                for category in entity.categories.iter().filter(|c| c.facet == facet) {
                    *summary
                        .counts
                        .entry(facet)
                        .or_default()
                        .entry(category.value.clone())
                        .or_default() += 1;
                    tagged = true;
                }
                if !tagged {
                    *summary.untagged.entry(facet).or_default() += 1;
                }
            }
        }
        summary
    }

    /// Values of `facet`, most common first, ties by value.
    pub fn counts(&self, facet: Facet) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .counts
            .get(&facet)
            .map(|values| values.iter().map(|(v, n)| (v.clone(), *n)).collect())
            .unwrap_or_default();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    pub fn count(&self, category: &Category) -> usize {
        self.counts
            .get(&category.facet)
            .and_then(|values| values.get(&category.value))
            .copied()
            .unwrap_or(0)
    }

    /// Entities carrying no value for `facet`.
    pub fn untagged(&self, facet: Facet) -> usize {
        self.untagged.get(&facet).copied().unwrap_or(0)
    }

    /// Every category present, facet by facet, for building filter menus.
    pub fn options(&self) -> Vec<Category> {
        Facet::ALL
            .iter()
            .flat_map(|facet| {
                self.counts(*facet)
                    .into_iter()
                    .map(move |(value, _)| Category::new(*facet, value))
            })
            .collect()
    }
}

/// Identifies one bucket of [`group_by_hierarchy`] for bulk selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Region(String),
    Sector(String),
    Ungrouped,
}

impl GroupKey {
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            GroupKey::Region(region) => {
                entity.category_value(Facet::Region) == Some(region.as_str())
            }
            GroupKey::Sector(sector) => {
                entity.category_value(Facet::Sector) == Some(sector.as_str())
            }
            GroupKey::Ungrouped => {
                entity.category_value(Facet::Region).is_none()
                    && entity.category_value(Facet::Sector).is_none()
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GroupKey::Region(value) | GroupKey::Sector(value) => value,
            GroupKey::Ungrouped => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorGroup {
    pub sector: String,
    pub members: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionGroup {
    /// `None` collects entities with no region.
    pub region: Option<String>,
    /// Members attached to the region but to no sector.
    pub direct: Vec<EntityId>,
    pub sectors: Vec<SectorGroup>,
}

impl RegionGroup {
    pub fn key(&self) -> GroupKey {
        match &self.region {
            Some(region) => GroupKey::Region(region.clone()),
            None => GroupKey::Ungrouped,
        }
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.sectors.iter().map(|s| s.members.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bucket entities into region, then sector. Groups are sorted by name,
/// members by label, and the region-less bucket comes last.
pub fn group_by_hierarchy(entities: &[Entity]) -> Vec<RegionGroup> {
    let mut sorted: Vec<&Entity> = entities.iter().collect();
    sorted.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));

    let mut regions: BTreeMap<Option<String>, (Vec<EntityId>, BTreeMap<String, Vec<EntityId>>)> =
        BTreeMap::new();
    for entity in sorted {
        let region = entity.category_value(Facet::Region).map(str::to_string);
        let bucket = regions.entry(region).or_default();
        match entity.category_value(Facet::Sector) {
            Some(sector) => bucket
                .1
                .entry(sector.to_string())
                .or_default()
                .push(entity.id.clone()),
            None => bucket.0.push(entity.id.clone()),
        }
    }

    let mut groups: Vec<RegionGroup> = regions
        .into_iter()
        .map(|(region, (direct, sectors))| RegionGroup {
            region,
            direct,
            sectors: sectors
                .into_iter()
                .map(|(sector, members)| SectorGroup { sector, members })
                .collect(),
        })
        .collect();
    // BTreeMap orders `None` first.
    let shift = usize::from(groups.first().is_some_and(|g| g.region.is_none()));
    groups.rotate_left(shift);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use pretty_assertions::assert_eq;

    fn user(
        id: u64,
        label: &str,
        role: &str,
        region: Option<&str>,
        sector: Option<&str>,
    ) -> Entity {
        let mut entity =
            Entity::new(id, EntityKind::User, label).with_category(Category::role(role));
        if let Some(region) = region {
            entity = entity.with_category(Category::new(Facet::Region, region));
        }
        if let Some(sector) = sector {
            entity = entity.with_category(Category::new(Facet::Sector, sector));
        }
        entity
    }

    fn staff() -> Vec<Entity> {
        vec![
            user(1, "Zaur", "regionadmin", Some("Gəncə"), None),
            user(2, "Aynur", "schooladmin", Some("Bakı"), Some("Xətai")),
            user(3, "Elvin", "schooladmin", Some("Bakı"), Some("Nəsimi")),
            user(4, "Bəxtiyar", "sektoradmin", Some("Bakı"), Some("Xətai")),
            user(5, "Nazir", "superadmin", None, None),
        ]
    }

    #[test]
    fn summary_counts_roles_and_missing_values() {
        let summary = FacetSummary::from_entities(&staff());
        assert_eq!(
            summary.counts(Facet::Role),
            vec![
                ("schooladmin".to_string(), 2),
                ("regionadmin".to_string(), 1),
                ("sektoradmin".to_string(), 1),
                ("superadmin".to_string(), 1),
            ]
        );
        assert_eq!(summary.count(&Category::new(Facet::Region, "bakı")), 3);
        assert_eq!(summary.untagged(Facet::Sector), 2);
        assert_eq!(summary.untagged(Facet::Level), 5);
    }

    #[test]
    fn options_follow_facet_order() {
        let summary = FacetSummary::from_entities(&staff());
        let options = summary.options();
        assert_eq!(options.first(), Some(&Category::role("schooladmin")));
        assert!(options.contains(&Category::new(Facet::Sector, "xətai")));
    }

    #[test]
    fn grouping_nests_sectors_under_regions() {
        let groups = group_by_hierarchy(&staff());
        let regions: Vec<Option<&str>> = groups.iter().map(|g| g.region.as_deref()).collect();
        assert_eq!(regions, vec![Some("bakı"), Some("gəncə"), None]);

        let baku = &groups[0];
        assert!(baku.direct.is_empty());
        assert_eq!(baku.sectors[0].sector, "nəsimi");
        assert_eq!(
            baku.sectors[1].members,
            vec![EntityId::Num(2), EntityId::Num(4)]
        );
        assert_eq!(baku.len(), 3);
        assert_eq!(groups[2].key(), GroupKey::Ungrouped);
    }

    #[test]
    fn region_less_bucket_moves_last_even_when_alone_or_first() {
        let only_unplaced = vec![user(1, "Nazir", "superadmin", None, None)];
        let groups = group_by_hierarchy(&only_unplaced);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key(), GroupKey::Ungrouped);

        let mixed = vec![
            user(1, "Nazir", "superadmin", None, None),
            user(2, "Aynur", "schooladmin", Some("Şəki"), None),
        ];
        let keys: Vec<GroupKey> = group_by_hierarchy(&mixed)
            .iter()
            .map(RegionGroup::key)
            .collect();
        assert_eq!(
            keys,
            vec![GroupKey::Region("şəki".into()), GroupKey::Ungrouped]
        );
        assert!(group_by_hierarchy(&[]).is_empty());
    }

    #[test]
    fn group_keys_match_their_members() {
        let people = staff();
        let xetai = GroupKey::Sector("xətai".into());
        let ids: Vec<u64> = people
            .iter()
            .filter(|e| xetai.matches(e))
            .filter_map(|e| e.id.as_num())
            .collect();
        assert_eq!(ids, vec![2, 4]);
        assert!(GroupKey::Ungrouped.matches(&people[4]));
    }
}
