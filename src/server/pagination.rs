use crate::domain::model::{clamp_page, SearchResult};
use crate::domain::ports::WorkshopStore;
use crate::server::query::Predicate;
use crate::utils::error::Result;

/// 搜尋端點固定的每頁筆數
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
    pub skip: u64,
    pub limit: u32,
}

impl PageWindow {
    pub fn new(page: i64, page_size: u32) -> Self {
        let page = clamp_page(page);
        let page_size = page_size.max(1);
        Self {
            page,
            page_size,
            skip: (page as u64 - 1) * page_size as u64,
            limit: page_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaginationEngine {
    page_size: u32,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationEngine {
    pub fn new() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn window(&self, page: i64) -> PageWindow {
        PageWindow::new(page, self.page_size)
    }

    /// 頁面與總數透過同一次 store 呼叫取得
    pub async fn paginate(
        &self,
        store: &dyn WorkshopStore,
        predicate: &Predicate,
        page: i64,
    ) -> Result<SearchResult> {
        let window = self.window(page);
        tracing::debug!(
            page = window.page,
            skip = window.skip,
            limit = window.limit,
            "reading search page"
        );

        let rows = store.query_page(predicate, window).await?;

        if rows.items.len() > window.limit as usize {
            tracing::warn!(
                returned = rows.items.len(),
                limit = window.limit,
                "store returned more rows than requested, truncating"
            );
        }

        let mut items = rows.items;
        items.truncate(window.limit as usize);

        Ok(SearchResult {
            items,
            total_count: rows.total_count,
            page: window.page,
            page_size: window.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_for_third_page() {
        let window = PaginationEngine::new().window(3);
        assert_eq!(window.skip, 20);
        assert_eq!(window.limit, 10);
        assert_eq!(window.page, 3);
    }

    #[test]
    fn test_window_clamps_pages_below_one() {
        let engine = PaginationEngine::new();
        assert_eq!(engine.window(0), engine.window(1));
        assert_eq!(engine.window(-7).skip, 0);
    }

    #[test]
    fn test_page_size_never_zero() {
        assert_eq!(PaginationEngine::with_page_size(0).page_size(), 1);
        assert_eq!(PageWindow::new(2, 0).skip, 1);
    }
}
