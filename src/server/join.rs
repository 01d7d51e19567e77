use crate::domain::model::{BranchView, LookupEntry, LookupKind, Workshop, WorkshopView};
use crate::domain::ports::LookupCatalog;

fn resolve(catalog: &dyn LookupCatalog, kind: LookupKind, code: &str) -> LookupEntry {
    catalog.resolve(kind, code).unwrap_or_else(|| {
        tracing::debug!(?kind, code, "lookup miss, keeping raw code");
        LookupEntry::raw(code)
    })
}

pub fn attach_lookup(workshop: Workshop, catalog: &dyn LookupCatalog) -> WorkshopView {
    let rating_average = workshop.rating_average();

    let branches = workshop
        .branches
        .iter()
        .map(|branch| BranchView {
            province: resolve(catalog, LookupKind::Province, &branch.province),
            city: resolve(catalog, LookupKind::City, &branch.city),
        })
        .collect();
    let services = workshop
        .services
        .iter()
        .map(|code| resolve(catalog, LookupKind::Service, code))
        .collect();
    let cars = workshop
        .cars
        .iter()
        .map(|code| resolve(catalog, LookupKind::Car, code))
        .collect();

    WorkshopView {
        id: workshop.id,
        workshop_name: workshop.workshop_name,
        description: workshop.description,
        phone: workshop.phone,
        branches,
        services,
        cars,
        rating_count: workshop.rating_count,
        rating_average,
        photo: workshop.photo,
        created_at: workshop.created_at,
    }
}

/// 查詢後的獨立 join 步驟：把代碼換成 `{id, label, value}`，順序不變
pub fn attach_lookups(workshops: Vec<Workshop>, catalog: &dyn LookupCatalog) -> Vec<WorkshopView> {
    workshops
        .into_iter()
        .map(|workshop| attach_lookup(workshop, catalog))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lookup_csv::LookupTable;
    use crate::domain::model::Branch;
    use chrono::Utc;

    #[test]
    fn test_codes_are_resolved_and_misses_fall_back() {
        let mut table = LookupTable::new();
        table.insert(
            LookupKind::Province,
            LookupEntry {
                id: "p1".to_string(),
                label: "Damascus".to_string(),
                value: "damascus".to_string(),
            },
        );

        let workshop = Workshop {
            id: "w1".to_string(),
            workshop_name: "Fast Fix".to_string(),
            description: None,
            phone: None,
            branches: vec![Branch {
                province: "damascus".to_string(),
                city: "mezzeh".to_string(),
            }],
            services: vec!["oil".to_string()],
            cars: vec![],
            rating_count: 2,
            rating_total: 9,
            photo: None,
            created_at: Utc::now(),
        };

        let views = attach_lookups(vec![workshop], &table);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].branches[0].province.label, "Damascus");
        assert_eq!(views[0].branches[0].city, LookupEntry::raw("mezzeh"));
        assert_eq!(views[0].services[0], LookupEntry::raw("oil"));
        assert_eq!(views[0].rating_average, Some(4.5));
    }
}
