//! Typed client actions with a bounded refresh-and-retry policy.
//!
//! Every action builds one [`RequestSpec`], sends it with a snapshot of the
//! session, and on a 401 refreshes the credential and re-sends the exact same
//! request at most once. Shared state is written only after success and only
//! while the action's scope is still live.

use crate::client::dispatcher::{Failure, Payload, RequestDispatcher, RequestSpec};
use crate::client::refresher::TokenRefresher;
use crate::client::session::SessionStore;
use crate::client::state::{ClientState, LoadingSlice};
use crate::config::ClientConfig;
use crate::domain::model::{
    Conversation, DeletedRating, ImageUpload, NewConversation, NewRating, PeerKind,
    PhotoUploaded, ProfileUpdate, ProfileUpdated, Rating, SearchFilter, SearchResponse,
    UserProfile, WorkshopOwner,
};
use crate::utils::error::{HubError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 取消後的結果仍會回傳給呼叫端，但不再寫入共用狀態
#[derive(Debug, Clone, Default)]
pub struct ActionScope {
    cancelled: Arc<AtomicBool>,
}

impl ActionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryState {
    attempt_count: u8,
    max_attempts: u8,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempt_count: 0,
            max_attempts: 1,
        }
    }

    fn can_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

/// 離開 action 時（任何路徑）清除 loading
struct LoadingGuard<'a> {
    state: &'a ClientState,
    slice: LoadingSlice,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a ClientState, slice: LoadingSlice) -> Self {
        state.begin_loading(slice);
        Self { state, slice }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.finish_loading(self.slice);
    }
}

#[derive(Clone)]
pub struct ActionCoordinator {
    dispatcher: Arc<RequestDispatcher>,
    refresher: TokenRefresher,
    session: Arc<SessionStore>,
    state: Arc<ClientState>,
    scope: ActionScope,
}

impl ActionCoordinator {
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        state: Arc<ClientState>,
    ) -> Result<Self> {
        let dispatcher = Arc::new(RequestDispatcher::new(config)?);
        let refresher = TokenRefresher::new(
            Arc::clone(&dispatcher),
            Arc::clone(&session),
            config.refresh_path(),
        );
        Ok(Self {
            dispatcher,
            refresher,
            session,
            state,
            scope: ActionScope::new(),
        })
    }

    /// 共用 dispatcher、refresher 與 session，但綁定另一個取消範圍
    pub fn scoped(&self, scope: ActionScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn scope(&self) -> &ActionScope {
        &self.scope
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn state(&self) -> &Arc<ClientState> {
        &self.state
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    async fn run(&self, spec: RequestSpec) -> Result<Payload> {
        let mut retry = RetryState::new();

        loop {
            let context = self.session.context();
            match self.dispatcher.execute(&spec, &context).await {
                Ok(payload) => return Ok(payload),
                Err(Failure::AuthExpired) if retry.can_retry() => {
                    tracing::debug!(path = %spec.path, "credential rejected, refreshing");
                    self.refresher
                        .refresh_stale(context.access_token.as_deref())
                        .await?;
                    retry.attempt_count += 1;
                }
                Err(Failure::AuthExpired) => {
                    tracing::warn!(path = %spec.path, "credential rejected after refresh");
                    return Err(HubError::AuthExpired);
                }
                Err(failure) => {
                    let error = HubError::from(failure);
                    match &error {
                        HubError::ServerError { status, message } => {
                            tracing::error!(path = %spec.path, status, %message, "server error")
                        }
                        other => tracing::debug!(path = %spec.path, error = %other, "action failed"),
                    }
                    return Err(error);
                }
            }
        }
    }

    /// 只有在範圍未取消時才套用狀態變更
    fn commit(&self, apply: impl FnOnce(&ClientState)) {
        if self.scope.is_cancelled() {
            tracing::debug!("action scope cancelled, skipping state update");
            return;
        }
        apply(&self.state);
    }

    fn require_id(field: &str, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(HubError::validation(format!("{} is required", field)));
        }
        Ok(())
    }

    // -- search -------------------------------------------------------------

    pub async fn search_workshops(&self, filter: &SearchFilter) -> Result<SearchResponse> {
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Search);
        let spec = RequestSpec::get("/api/search/workshop").with_query(filter.to_query_pairs());

        let response: SearchResponse = self.run(spec).await?.decode()?;
        tracing::info!(
            count = response.count,
            page = filter.page(),
            "📡 search returned {} workshops",
            response.workshops.len()
        );
        self.commit(|state| state.set_search_results(response.workshops.clone(), response.count));
        Ok(response)
    }

    // -- conversations ------------------------------------------------------

    pub async fn create_conversation(&self, info: &NewConversation) -> Result<Conversation> {
        Self::require_id("senderId", &info.sender_id)?;
        Self::require_id("receiverId", &info.receiver_id)?;
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Conversations);
        let spec = RequestSpec::post("/api/conversations")
            .bearer()
            .with_cookie()
            .idempotent()
            .with_json(info)?;

        let conversation: Conversation = self.run(spec).await?.decode()?;
        tracing::info!(conversation_id = %conversation.id, "conversation created");
        self.commit(|state| state.add_conversation(conversation.clone()));
        Ok(conversation)
    }

    pub async fn fetch_user_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        Self::require_id("userId", user_id)?;
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Conversations);
        let spec = RequestSpec::get(format!("/api/conversations/{}", user_id))
            .bearer()
            .with_cookie();

        let conversations: Vec<Conversation> = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_conversations(conversations.clone()));
        Ok(conversations)
    }

    pub async fn fetch_other_user(&self, user_id: &str, kind: PeerKind) -> Result<UserProfile> {
        Self::require_id("userId", user_id)?;
        let spec = match kind {
            PeerKind::User => RequestSpec::get(format!("/api/user/profile/{}", user_id)).bearer(),
            PeerKind::Mechanic => RequestSpec::get(format!("/api/mechanic/{}", user_id)),
        }
        .with_cookie();

        let profile: UserProfile = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_other_user(profile.clone()));
        Ok(profile)
    }

    // -- ratings ------------------------------------------------------------

    pub async fn rate_workshop(
        &self,
        rating: u8,
        workshop_owner: &str,
        text: &str,
    ) -> Result<Rating> {
        if !(1..=5).contains(&rating) {
            return Err(HubError::validation("rating must be between 1 and 5"));
        }
        Self::require_id("workshopOwner", workshop_owner)?;
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Ratings);
        let body = NewRating {
            rating,
            workshop_owner: workshop_owner.to_string(),
            text: text.to_string(),
        };
        let spec = RequestSpec::post("/api/ratings")
            .bearer()
            .idempotent()
            .with_json(&body)?;

        let mut created: Rating = self.run(spec).await?.decode()?;
        if created.workshop_owner.is_none() {
            created.workshop_owner = Some(body.workshop_owner);
        }
        tracing::info!(rating_id = %created.id, "rating created");
        self.commit(|state| state.add_rating_to_owner(created.clone()));
        Ok(created)
    }

    pub async fn delete_rating(&self, rating_id: &str) -> Result<DeletedRating> {
        Self::require_id("ratingId", rating_id)?;
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Ratings);
        let spec = RequestSpec::delete(format!("/api/ratings/{}", rating_id)).bearer();

        let deleted: DeletedRating = self.run(spec).await?.decode()?;
        tracing::info!(rating_id = %deleted.rating_id, "rating deleted");
        self.commit(|state| state.remove_rating(&deleted.rating_id));
        Ok(deleted)
    }

    pub async fn fetch_user_ratings(&self, user_id: &str) -> Result<Vec<Rating>> {
        Self::require_id("userId", user_id)?;
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Ratings);
        let spec = RequestSpec::get(format!("/api/ratings/{}", user_id)).bearer();

        let ratings: Vec<Rating> = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_ratings(ratings.clone()));
        Ok(ratings)
    }

    pub async fn fetch_all_ratings(&self) -> Result<Vec<Rating>> {
        let _loading = LoadingGuard::start(&self.state, LoadingSlice::Ratings);
        let spec = RequestSpec::get("/api/ratings").bearer();

        let ratings: Vec<Rating> = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_ratings(ratings.clone()));
        Ok(ratings)
    }

    // -- workshop owner -----------------------------------------------------

    pub async fn fetch_workshop_owner(&self, workshop_id: &str) -> Result<WorkshopOwner> {
        Self::require_id("workshopId", workshop_id)?;
        let spec = RequestSpec::get(format!("/api/workshop-owner/{}", workshop_id));

        let owner: WorkshopOwner = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_owner(owner.clone()));
        Ok(owner)
    }

    pub async fn update_workshop_profile(
        &self,
        workshop_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdated> {
        Self::require_id("workshopId", workshop_id)?;
        let spec = RequestSpec::put(format!("/api/workshop-owner/{}", workshop_id))
            .bearer()
            .with_json(update)?;

        let updated: ProfileUpdated = self.run(spec).await?.decode()?;
        tracing::info!(workshop_id, "{}", updated.message);
        self.commit(|state| state.set_owner(updated.data.clone()));
        Ok(updated)
    }

    pub async fn upload_workshop_photo(
        &self,
        workshop_id: &str,
        image: ImageUpload,
    ) -> Result<PhotoUploaded> {
        Self::require_id("workshopId", workshop_id)?;
        if image.data.is_empty() {
            return Err(HubError::validation("No image uploaded"));
        }
        let spec = RequestSpec::post(format!("/api/workshop-owner/{}/photo", workshop_id))
            .bearer()
            .with_query(vec![("fileName".to_string(), image.file_name)])
            .with_bytes(image.content_type, image.data);

        let uploaded: PhotoUploaded = self.run(spec).await?.decode()?;
        self.commit(|state| state.set_owner_photo(workshop_id, uploaded.workshop_photo.clone()));
        Ok(uploaded)
    }
}
