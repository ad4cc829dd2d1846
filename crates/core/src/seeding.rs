//! Deterministic sample hierarchy for first runs and demos.

use anyhow::Result;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::model::{Category, Entity, EntityKind, Facet};

const REGIONS: [(&str, [&str; 2]); 3] = [
    ("Bakı", ["Xətai", "Nəsimi"]),
    ("Gəncə", ["Kəpəz", "Nizami"]),
    ("Sumqayıt", ["Mərkəz", "Corat"]),
];
const SCHOOLS_PER_SECTOR: u64 = 3;
const TEACHERS_PER_SCHOOL: u64 = 2;

const FIRST_NAMES: [&str; 8] = [
    "Aysel", "Rauf", "Nigar", "Elvin", "Günel", "Tural", "Ləman", "Orxan",
];
const LAST_NAMES: [&str; 6] = [
    "Quliyeva", "Əliyev", "Məmmədova", "Həsənov", "Babayeva", "Rzayev",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub institutions: usize,
    pub skipped: bool,
}

/// Sample institutions and users, in that order.
pub fn sample_entities() -> (Vec<Entity>, Vec<Entity>) {
    let mut institutions = vec![institution(1, "Təhsil Nazirliyi", 1, "ministry", None)];
    let mut users = vec![user(1, "superadmin", None, None, "Təhsil Nazirliyi")];
    let mut next_institution = 2u64;
    let mut next_user = 2u64;

    for (region, sectors) in REGIONS {
        let region_name = format!("{region} Regional Təhsil İdarəsi");
        institutions.push(
            institution(
                next_institution,
                &region_name,
                2,
                "regional_office",
                Some("Təhsil Nazirliyi"),
            )
            .with_category(Category::new(Facet::Region, region)),
        );
        next_institution += 1;
        users.push(user(next_user, "regionadmin", Some(region), None, &region_name));
        next_user += 1;
        users.push(user(
            next_user,
            "regionoperator",
            Some(region),
            None,
            &region_name,
        ));
        next_user += 1;

        for sector in sectors {
            let sector_name = format!("{sector} Təhsil Sektoru");
            let sector_path = format!("{region_name} / {sector_name}");
            institutions.push(
                institution(
                    next_institution,
                    &sector_name,
                    3,
                    "sector_office",
                    Some(&region_name),
                )
                .with_category(Category::new(Facet::Region, region))
                .with_category(Category::new(Facet::Sector, sector)),
            );
            next_institution += 1;
            users.push(user(
                next_user,
                "sektoradmin",
                Some(region),
                Some(sector),
                &sector_path,
            ));
            next_user += 1;

            for n in 1..=SCHOOLS_PER_SECTOR {
                let school_name = format!("{sector} {n} nömrəli məktəb");
                let school_path = format!("{sector_path} / {school_name}");
                institutions.push(
                    institution(next_institution, &school_name, 4, "school", Some(&sector_name))
                        .with_category(Category::new(Facet::Region, region))
                        .with_category(Category::new(Facet::Sector, sector)),
                );
                next_institution += 1;
                users.push(user(
                    next_user,
                    "schooladmin",
                    Some(region),
                    Some(sector),
                    &school_path,
                ));
                next_user += 1;
                for _ in 0..TEACHERS_PER_SCHOOL {
                    users.push(user(
                        next_user,
                        "teacher",
                        Some(region),
                        Some(sector),
                        &school_path,
                    ));
                    next_user += 1;
                }
            }
        }
    }

    (institutions, users)
}

/// Fill an empty catalog with [`sample_entities`]. A catalog that already
/// holds anything is left untouched.
pub fn seed_sample_catalog(catalog: &Catalog) -> Result<SeedSummary> {
    let existing = catalog.count(EntityKind::User)? + catalog.count(EntityKind::Institution)?;
    if existing > 0 {
        tracing::info!(existing, "catalog already populated; skipping sample seed");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let (institutions, users) = sample_entities();
    let summary = SeedSummary {
        institutions: catalog.upsert_entities(&institutions)?,
        users: catalog.upsert_entities(&users)?,
        skipped: false,
    };
    tracing::info!(
        users = summary.users,
        institutions = summary.institutions,
        "seeded sample catalog"
    );
    Ok(summary)
}

fn institution(id: u64, name: &str, level: u8, kind: &str, parent: Option<&str>) -> Entity {
    let mut entity = Entity::new(id, EntityKind::Institution, name)
        .with_detail(format!("INST-{id:04}"))
        .with_category(Category::level(level))
        .with_category(Category::new(Facet::InstitutionType, kind));
    if let Some(parent) = parent {
        entity = entity.with_path(parent);
    }
    entity
}

fn user(id: u64, role: &str, region: Option<&str>, sector: Option<&str>, path: &str) -> Entity {
    let index = id as usize;
    let first = FIRST_NAMES[index % FIRST_NAMES.len()];
    let last = LAST_NAMES[(index / FIRST_NAMES.len()) % LAST_NAMES.len()];
    let mut entity = Entity::new(id, EntityKind::User, format!("{first} {last}"))
        .with_detail(format!("{}.{id}@atis.az", first.to_lowercase()))
        .with_category(Category::role(role))
        .with_path(path);
    if let Some(region) = region {
        entity = entity.with_category(Category::new(Facet::Region, region));
    }
    if let Some(sector) = sector {
        entity = entity.with_category(Category::new(Facet::Sector, sector));
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::facets::FacetSummary;
    use tempfile::TempDir;

    #[test]
    fn sample_hierarchy_has_expected_shape() {
        let (institutions, users) = sample_entities();
        // ministry + 3 regions + 6 sectors + 18 schools
        assert_eq!(institutions.len(), 28);

        let roles = FacetSummary::from_entities(&users);
        assert_eq!(roles.count(&Category::role("schooladmin")), 18);
        assert_eq!(roles.count(&Category::role("teacher")), 36);
        // 2 region staff, 2 sector admins, 6 school admins, 12 teachers
        assert_eq!(roles.count(&Category::new(Facet::Region, "gəncə")), 22);
        assert_eq!(users.len(), 1 + 3 * 22);
    }

    #[test]
    fn seeding_is_skipped_once_populated() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).unwrap();
        let catalog = Catalog::initialize(&config).unwrap();

        let first = seed_sample_catalog(&catalog).unwrap();
        assert!(!first.skipped);
        assert_eq!(first.institutions, 28);
        assert_eq!(catalog.count(EntityKind::User).unwrap(), first.users);

        let second = seed_sample_catalog(&catalog).unwrap();
        assert!(second.skipped);
    }
}
