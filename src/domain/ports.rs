use crate::domain::model::{LookupEntry, LookupKind, Photo, ProfileUpdate, Workshop};
use crate::server::pagination::PageWindow;
use crate::server::query::Predicate;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 單次分頁讀取：頁面內容與總筆數來自同一個條件
#[derive(Debug, Clone, PartialEq)]
pub struct PageRows {
    pub items: Vec<Workshop>,
    pub total_count: u64,
}

/// 照片替換結果：更新後的資料，以及同一次寫入中被換掉的舊照片
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSwap {
    pub workshop: Workshop,
    pub previous: Option<Photo>,
}

#[async_trait]
pub trait WorkshopStore: Send + Sync {
    /// 依條件讀取一頁並計算總數；實作需保證排序穩定（created_at, id）
    async fn query_page(&self, predicate: &Predicate, window: PageWindow) -> Result<PageRows>;
    async fn get(&self, id: &str) -> Result<Option<Workshop>>;
    async fn insert(&self, workshop: Workshop) -> Result<()>;
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Workshop>>;
    async fn set_photo(&self, id: &str, photo: Option<Photo>) -> Result<Option<PhotoSwap>>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn count(&self) -> Result<u64>;
}

/// 圖片物件儲存（外部協作者）
pub trait ObjectStorage: Send + Sync {
    fn upload(
        &self,
        file_name: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<Photo>> + Send;
    fn remove(&self, public_id: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 省份、城市、服務、車種的靜態對照表
pub trait LookupCatalog: Send + Sync {
    fn resolve(&self, kind: LookupKind, code: &str) -> Option<LookupEntry>;
}
