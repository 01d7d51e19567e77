use crate::domain::model::Session;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
    /// 刷新失敗後的明確「未登入」狀態
    Expired,
}

/// 發送單一請求時使用的憑證快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub access_token: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Debug, Default)]
struct SessionInner {
    session: Option<Session>,
    expired: bool,
    cookie: Option<String>,
}

/// 整個行程共用的 session；同一時間只有一組有效的 access token
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<SessionInner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(cookie: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_cookie(Some(cookie.into()));
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn login(&self, session: Session) {
        tracing::info!(user_id = %session.user_id, "session started");
        let mut inner = self.write();
        inner.session = Some(session);
        inner.expired = false;
    }

    pub fn logout(&self) {
        let mut inner = self.write();
        inner.session = None;
        inner.expired = false;
        inner.cookie = None;
        tracing::info!("session cleared");
    }

    /// 刷新失敗：清掉憑證並標記為過期
    pub fn invalidate(&self) {
        let mut inner = self.write();
        if inner.session.take().is_some() {
            tracing::warn!("session invalidated after failed refresh");
        }
        inner.expired = true;
    }

    pub fn set_cookie(&self, cookie: Option<String>) {
        self.write().cookie = cookie;
    }

    pub fn current(&self) -> Option<Session> {
        self.read().session.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read()
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn state(&self) -> AuthState {
        let inner = self.read();
        match (&inner.session, inner.expired) {
            (Some(_), _) => AuthState::Authenticated,
            (None, true) => AuthState::Expired,
            (None, false) => AuthState::Anonymous,
        }
    }

    pub fn context(&self) -> RequestContext {
        let inner = self.read();
        RequestContext {
            access_token: inner
                .session
                .as_ref()
                .map(|session| session.access_token.clone()),
            cookie: inner.cookie.clone(),
        }
    }

    /// 在同一把寫鎖內替換 token；沒有 session 時回傳 false
    pub fn replace_access_token(&self, token: &str) -> bool {
        let mut inner = self.write();
        match inner.session.as_mut() {
            Some(session) => {
                session.access_token = token.to_string();
                inner.expired = false;
                true
            }
            None => false,
        }
    }
}
