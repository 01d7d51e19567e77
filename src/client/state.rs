use crate::domain::model::{Conversation, Photo, Rating, UserProfile, WorkshopOwner, WorkshopView};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSlice {
    pub results: Vec<WorkshopView>,
    pub count: u64,
    pub loading: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingsSlice {
    pub ratings: Vec<Rating>,
    pub loading: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationsSlice {
    pub conversations: Vec<Conversation>,
    pub other_user: Option<UserProfile>,
    pub loading: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerSlice {
    pub owner: Option<WorkshopOwner>,
}

/// 有 loading 旗標的 slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingSlice {
    Search,
    Ratings,
    Conversations,
}

#[derive(Debug, Default)]
struct Slices {
    search: SearchSlice,
    ratings: RatingsSlice,
    conversations: ConversationsSlice,
    owner: OwnerSlice,
    // 各 slice 進行中的 action 數
    search_in_flight: usize,
    ratings_in_flight: usize,
    conversations_in_flight: usize,
}

impl Slices {
    fn in_flight(&mut self, slice: LoadingSlice) -> (&mut usize, &mut bool) {
        match slice {
            LoadingSlice::Search => (&mut self.search_in_flight, &mut self.search.loading),
            LoadingSlice::Ratings => (&mut self.ratings_in_flight, &mut self.ratings.loading),
            LoadingSlice::Conversations => (
                &mut self.conversations_in_flight,
                &mut self.conversations.loading,
            ),
        }
    }
}

/// 前端共用的狀態；只由 ActionCoordinator 在成功後寫入
#[derive(Debug, Default)]
pub struct ClientState {
    slices: Mutex<Slices>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slices> {
        self.slices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn search(&self) -> SearchSlice {
        self.lock().search.clone()
    }

    pub fn ratings(&self) -> RatingsSlice {
        self.lock().ratings.clone()
    }

    pub fn conversations(&self) -> ConversationsSlice {
        self.lock().conversations.clone()
    }

    pub fn owner(&self) -> Option<WorkshopOwner> {
        self.lock().owner.owner.clone()
    }

    // -- loading flags ------------------------------------------------------

    /// loading 在最後一個進行中的 action 結束時才清除
    pub fn begin_loading(&self, slice: LoadingSlice) {
        let mut slices = self.lock();
        let (count, loading) = slices.in_flight(slice);
        *count += 1;
        *loading = true;
    }

    pub fn finish_loading(&self, slice: LoadingSlice) {
        let mut slices = self.lock();
        let (count, loading) = slices.in_flight(slice);
        *count = count.saturating_sub(1);
        *loading = *count > 0;
    }

    // -- search -------------------------------------------------------------

    pub fn set_search_results(&self, results: Vec<WorkshopView>, count: u64) {
        let mut slices = self.lock();
        slices.search.results = results;
        slices.search.count = count;
    }

    // -- ratings ------------------------------------------------------------

    pub fn set_ratings(&self, ratings: Vec<Rating>) {
        self.lock().ratings.ratings = ratings;
    }

    /// 新評分加到目前載入的維修廠（若正是被評分的那一間）
    pub fn add_rating_to_owner(&self, rating: Rating) {
        let mut slices = self.lock();
        if let Some(owner) = slices.owner.owner.as_mut() {
            let belongs = rating
                .workshop_owner
                .as_deref()
                .map_or(true, |id| id == owner.id);
            if belongs && !owner.workshop_ratings.iter().any(|r| r.id == rating.id) {
                owner.workshop_ratings.push(rating);
            }
        }
    }

    /// 從評分列表與維修廠彙總中同時移除
    pub fn remove_rating(&self, rating_id: &str) {
        let mut slices = self.lock();
        slices.ratings.ratings.retain(|r| r.id != rating_id);
        if let Some(owner) = slices.owner.owner.as_mut() {
            owner.workshop_ratings.retain(|r| r.id != rating_id);
        }
    }

    // -- workshop owner -----------------------------------------------------

    pub fn set_owner(&self, owner: WorkshopOwner) {
        self.lock().owner.owner = Some(owner);
    }

    pub fn set_owner_photo(&self, owner_id: &str, photo: Photo) {
        let mut slices = self.lock();
        if let Some(owner) = slices.owner.owner.as_mut() {
            if owner.id == owner_id {
                owner.photo = Some(photo);
            }
        }
    }

    // -- conversations ------------------------------------------------------

    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        self.lock().conversations.conversations = conversations;
    }

    /// 同一個對話只會加入一次
    pub fn add_conversation(&self, conversation: Conversation) {
        let mut slices = self.lock();
        let list = &mut slices.conversations.conversations;
        if !list.iter().any(|c| c.id == conversation.id) {
            list.push(conversation);
        }
    }

    pub fn set_other_user(&self, profile: UserProfile) {
        self.lock().conversations.other_user = Some(profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(id: &str, owner: &str) -> Rating {
        Rating {
            id: id.to_string(),
            rating: 4,
            text: String::new(),
            user: None,
            workshop_owner: Some(owner.to_string()),
            created_at: None,
        }
    }

    fn owner(id: &str, ratings: Vec<Rating>) -> WorkshopOwner {
        WorkshopOwner {
            id: id.to_string(),
            workshop_name: "Fast Fix".to_string(),
            description: None,
            phone: None,
            photo: None,
            workshop_ratings: ratings,
        }
    }

    #[test]
    fn test_remove_rating_from_both_lists() {
        let state = ClientState::new();
        state.set_ratings(vec![rating("r1", "w1"), rating("r2", "w1")]);
        state.set_owner(owner("w1", vec![rating("r1", "w1"), rating("r2", "w1")]));

        state.remove_rating("r1");

        let ids: Vec<_> = state.ratings().ratings.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r2"]);
        let owner_ids: Vec<_> = state
            .owner()
            .unwrap()
            .workshop_ratings
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(owner_ids, vec!["r2"]);
    }

    #[test]
    fn test_add_rating_only_to_matching_owner_once() {
        let state = ClientState::new();
        state.set_owner(owner("w1", vec![]));

        state.add_rating_to_owner(rating("r1", "w2"));
        state.add_rating_to_owner(rating("r2", "w1"));
        state.add_rating_to_owner(rating("r2", "w1"));

        assert_eq!(state.owner().unwrap().workshop_ratings.len(), 1);
    }

    #[test]
    fn test_add_conversation_dedupes() {
        let state = ClientState::new();
        let conversation = Conversation {
            id: "c1".to_string(),
            members: vec!["u1".to_string(), "w1".to_string()],
            created_at: None,
        };
        state.add_conversation(conversation.clone());
        state.add_conversation(conversation);
        assert_eq!(state.conversations().conversations.len(), 1);
    }

    #[test]
    fn test_owner_photo_ignores_other_owner() {
        let state = ClientState::new();
        state.set_owner(owner("w1", vec![]));
        let photo = Photo {
            url: "http://cdn/p.png".to_string(),
            public_id: "p".to_string(),
        };
        state.set_owner_photo("w2", photo.clone());
        assert_eq!(state.owner().unwrap().photo, None);
        state.set_owner_photo("w1", photo.clone());
        assert_eq!(state.owner().unwrap().photo, Some(photo));
    }
}
