use crate::domain::model::{SearchFilter, SearchResponse};
use crate::domain::ports::{LookupCatalog, WorkshopStore};
use crate::server::join::attach_lookups;
use crate::server::pagination::PaginationEngine;
use crate::server::query::SearchQueryBuilder;
use crate::utils::error::Result;
use serde::Deserialize;
use std::sync::Arc;

/// `GET /search/workshop` 的原始查詢參數
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub province: Option<String>,
    pub car: Option<String>,
    pub service: Option<String>,
    pub page: Option<String>,
}

impl SearchQuery {
    pub fn to_filter(&self) -> SearchFilter {
        let mut filter = SearchFilter::new().with_page(parse_page(self.page.as_deref()) as i64);
        if let Some(province) = &self.province {
            filter = filter.with_province(province.as_str());
        }
        if let Some(car) = &self.car {
            filter = filter.with_car_type(car.as_str());
        }
        if let Some(service) = &self.service {
            filter = filter.with_service_type(service.as_str());
        }
        filter
    }
}

/// 解析頁碼：取開頭的整數部分，無法解析或小於 1 時回到第 1 頁
pub fn parse_page(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };

    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || leading.is_empty() {
        return 1;
    }

    match leading.parse::<u64>() {
        Ok(0) => 1,
        Ok(page) => page.min(u32::MAX as u64) as u32,
        // 超出範圍的超大頁碼
        Err(_) => u32::MAX,
    }
}

pub struct SearchService {
    store: Arc<dyn WorkshopStore>,
    catalog: Arc<dyn LookupCatalog>,
    engine: PaginationEngine,
}

impl SearchService {
    pub fn new(store: Arc<dyn WorkshopStore>, catalog: Arc<dyn LookupCatalog>) -> Self {
        Self {
            store,
            catalog,
            engine: PaginationEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: PaginationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.search_filter(&query.to_filter()).await
    }

    pub async fn search_filter(&self, filter: &SearchFilter) -> Result<SearchResponse> {
        let predicate = SearchQueryBuilder::build(filter);
        let result = self
            .engine
            .paginate(self.store.as_ref(), &predicate, filter.page() as i64)
            .await?;

        tracing::info!(
            page = result.page,
            returned = result.items.len(),
            count = result.total_count,
            "workshop search served"
        );

        Ok(SearchResponse {
            workshops: attach_lookups(result.items, self.catalog.as_ref()),
            count: result.total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_follows_leading_integer_rule() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some(" 4 ")), 4);
        assert_eq!(parse_page(Some("2abc")), 2);
        assert_eq!(parse_page(Some("+5")), 5);
        assert_eq!(parse_page(Some("99999999999999999999999")), u32::MAX);
    }

    #[tokio::test]
    async fn test_custom_page_size() {
        use crate::adapters::{LookupTable, MemoryWorkshopStore};
        use crate::domain::model::Workshop;
        use chrono::{TimeZone, Utc};

        let workshops = (0..7)
            .map(|i| Workshop {
                id: format!("w{}", i),
                workshop_name: format!("Workshop {}", i),
                description: None,
                phone: None,
                branches: vec![],
                services: vec![],
                cars: vec![],
                rating_count: 0,
                rating_total: 0,
                photo: None,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, i, 0).unwrap(),
            })
            .collect();
        let service = SearchService::new(
            Arc::new(MemoryWorkshopStore::with_workshops(workshops)),
            Arc::new(LookupTable::new()),
        )
        .with_engine(PaginationEngine::with_page_size(5));

        let second = service
            .search(&SearchQuery {
                page: Some("2".to_string()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second.count, 7);
        let ids: Vec<_> = second.workshops.into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["w5", "w6"]);
    }

    #[test]
    fn test_query_maps_to_filter() {
        let query = SearchQuery {
            province: Some("damascus".to_string()),
            car: Some("".to_string()),
            service: Some("oil".to_string()),
            page: Some("2".to_string()),
        };
        let filter = query.to_filter();
        assert_eq!(filter.province.as_deref(), Some("damascus"));
        assert_eq!(filter.car_type, None);
        assert_eq!(filter.service_type.as_deref(), Some("oil"));
        assert_eq!(filter.page(), 2);
    }
}
