use crate::domain::model::{Photo, ProfileUpdate, Workshop};
use crate::domain::ports::{PageRows, PhotoSwap, WorkshopStore};
use crate::server::pagination::PageWindow;
use crate::server::query::Predicate;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryWorkshopStore {
    workshops: RwLock<HashMap<String, Workshop>>,
}

impl MemoryWorkshopStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workshops(workshops: Vec<Workshop>) -> Self {
        let map = workshops
            .into_iter()
            .map(|workshop| (workshop.id.clone(), workshop))
            .collect();
        Self {
            workshops: RwLock::new(map),
        }
    }
}

#[async_trait]
impl WorkshopStore for MemoryWorkshopStore {
    async fn query_page(&self, predicate: &Predicate, window: PageWindow) -> Result<PageRows> {
        // 同一個讀鎖內完成計數與分頁
        let workshops = self.workshops.read().await;

        let mut matching: Vec<&Workshop> = workshops
            .values()
            .filter(|workshop| predicate.matches(workshop))
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_count = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(window.skip as usize)
            .take(window.limit as usize)
            .cloned()
            .collect();

        Ok(PageRows { items, total_count })
    }

    async fn get(&self, id: &str) -> Result<Option<Workshop>> {
        Ok(self.workshops.read().await.get(id).cloned())
    }

    async fn insert(&self, workshop: Workshop) -> Result<()> {
        self.workshops
            .write()
            .await
            .insert(workshop.id.clone(), workshop);
        Ok(())
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<Workshop>> {
        let mut workshops = self.workshops.write().await;
        Ok(workshops.get_mut(id).map(|workshop| {
            workshop.apply_update(update);
            workshop.clone()
        }))
    }

    async fn set_photo(&self, id: &str, photo: Option<Photo>) -> Result<Option<PhotoSwap>> {
        let mut workshops = self.workshops.write().await;
        Ok(workshops.get_mut(id).map(|workshop| {
            let previous = std::mem::replace(&mut workshop.photo, photo);
            PhotoSwap {
                workshop: workshop.clone(),
                previous,
            }
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.workshops.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.workshops.read().await.len() as u64)
    }
}
