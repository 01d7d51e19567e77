//! Translates a [`SearchFilter`] into a store predicate.
//!
//! The predicate only knows about the raw codes stored on a workshop. Turning
//! those codes into display labels is the join stage's job (see `join`).

use crate::domain::model::{non_blank, SearchFilter, Workshop};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// 任一分店的省份完全相符
    BranchProvince(String),
    /// 支援的車種包含此值
    SupportsCar(String),
    /// 提供的服務包含此值
    OffersService(String),
}

impl Clause {
    pub fn matches(&self, workshop: &Workshop) -> bool {
        match self {
            Clause::BranchProvince(province) => workshop
                .branches
                .iter()
                .any(|branch| &branch.province == province),
            Clause::SupportsCar(car) => workshop.cars.iter().any(|c| c == car),
            Clause::OffersService(service) => workshop.services.iter().any(|s| s == service),
        }
    }

    fn to_sql(&self) -> (&'static str, &str) {
        match self {
            Clause::BranchProvince(province) => (
                "EXISTS (SELECT 1 FROM workshop_branches b WHERE b.workshop_id = w.id AND b.province = ?)",
                province,
            ),
            Clause::SupportsCar(car) => (
                "EXISTS (SELECT 1 FROM json_each(w.cars) WHERE json_each.value = ?)",
                car,
            ),
            Clause::OffersService(service) => (
                "EXISTS (SELECT 1 FROM json_each(w.services) WHERE json_each.value = ?)",
                service,
            ),
        }
    }
}

/// AND 組合的條件；沒有任何子句時匹配所有維修廠
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, workshop: &Workshop) -> bool {
        self.clauses.iter().all(|clause| clause.matches(workshop))
    }

    /// 產生 SQL `WHERE` 內容與對應參數，資料表別名固定為 `w`
    pub fn to_sql(&self) -> (String, Vec<String>) {
        if self.clauses.is_empty() {
            return ("1 = 1".to_string(), Vec::new());
        }

        let mut fragments = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            let (fragment, param) = clause.to_sql();
            fragments.push(fragment);
            params.push(param.to_string());
        }
        (fragments.join(" AND "), params)
    }
}

pub struct SearchQueryBuilder;

impl SearchQueryBuilder {
    pub fn build(filter: &SearchFilter) -> Predicate {
        let mut predicate = Predicate::match_all();

        if let Some(province) = filter.province.clone().and_then(non_blank) {
            predicate = predicate.and(Clause::BranchProvince(province));
        }
        if let Some(car) = filter.car_type.clone().and_then(non_blank) {
            predicate = predicate.and(Clause::SupportsCar(car));
        }
        if let Some(service) = filter.service_type.clone().and_then(non_blank) {
            predicate = predicate.and(Clause::OffersService(service));
        }

        tracing::debug!(clauses = predicate.clauses.len(), "built search predicate");
        predicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Branch;
    use chrono::{TimeZone, Utc};

    fn workshop(id: &str, province: &str, cars: &[&str], services: &[&str]) -> Workshop {
        Workshop {
            id: id.to_string(),
            workshop_name: format!("Workshop {}", id),
            description: None,
            phone: None,
            branches: vec![Branch {
                province: province.to_string(),
                city: "center".to_string(),
            }],
            services: services.iter().map(|s| s.to_string()).collect(),
            cars: cars.iter().map(|c| c.to_string()).collect(),
            rating_count: 0,
            rating_total: 0,
            photo: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn fixtures() -> Vec<Workshop> {
        vec![
            workshop("a", "damascus", &["toyota", "kia"], &["oil"]),
            workshop("b", "aleppo", &["kia"], &["brakes", "oil"]),
            workshop("c", "damascus", &["bmw"], &["paint"]),
            workshop("d", "homs", &[], &[]),
        ]
    }

    fn matching_ids(predicate: &Predicate) -> Vec<String> {
        fixtures()
            .into_iter()
            .filter(|w| predicate.matches(w))
            .map(|w| w.id)
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let predicate = SearchQueryBuilder::build(&SearchFilter::new());
        assert!(predicate.is_match_all());
        assert_eq!(matching_ids(&predicate), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_blank_fields_are_omitted() {
        let mut filter = SearchFilter::new();
        filter.province = Some("   ".to_string());
        filter.car_type = Some(String::new());
        assert!(SearchQueryBuilder::build(&filter).is_match_all());
    }

    #[test]
    fn test_single_field_filters_exclude_only_non_matching() {
        let by_province = SearchQueryBuilder::build(&SearchFilter::new().with_province("damascus"));
        assert_eq!(matching_ids(&by_province), vec!["a", "c"]);

        let by_car = SearchQueryBuilder::build(&SearchFilter::new().with_car_type("kia"));
        assert_eq!(matching_ids(&by_car), vec!["a", "b"]);

        let by_service = SearchQueryBuilder::build(&SearchFilter::new().with_service_type("oil"));
        assert_eq!(matching_ids(&by_service), vec!["a", "b"]);
    }

    #[test]
    fn test_clauses_are_and_combined() {
        let filter = SearchFilter::new()
            .with_province("damascus")
            .with_car_type("kia")
            .with_service_type("oil");
        let predicate = SearchQueryBuilder::build(&filter);
        assert_eq!(predicate.clauses().len(), 3);
        assert_eq!(matching_ids(&predicate), vec!["a"]);
    }

    #[test]
    fn test_sql_rendering_keeps_parameter_order() {
        let predicate = SearchQueryBuilder::build(
            &SearchFilter::new()
                .with_service_type("oil")
                .with_province("homs"),
        );
        let (sql, params) = predicate.to_sql();
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM workshop_branches"));
        assert!(sql.contains(" AND "));
        assert_eq!(params, vec!["homs".to_string(), "oil".to_string()]);

        let (all_sql, all_params) = Predicate::match_all().to_sql();
        assert_eq!(all_sql, "1 = 1");
        assert!(all_params.is_empty());
    }
}
