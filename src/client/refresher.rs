//! Single-flight access-token refresh.
//!
//! Concurrent callers that hit a 401 share one exchange. The exchange runs on
//! its own task so a caller that gives up never leaves the in-flight slot
//! behind, and the session is updated before the slot is released.

use crate::client::dispatcher::{RequestDispatcher, RequestSpec};
use crate::client::session::SessionStore;
use crate::utils::error::{HubError, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    token: String,
}

/// `None` 代表刷新失敗
type Outcome = Option<Option<String>>;

struct RefresherInner {
    dispatcher: Arc<RequestDispatcher>,
    session: Arc<SessionStore>,
    refresh_path: String,
    inflight: Mutex<Option<watch::Receiver<Outcome>>>,
    exchanges: AtomicU64,
}

#[derive(Clone)]
pub struct TokenRefresher {
    inner: Arc<RefresherInner>,
}

impl TokenRefresher {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        session: Arc<SessionStore>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                dispatcher,
                session,
                refresh_path: refresh_path.into(),
                inflight: Mutex::new(None),
                exchanges: AtomicU64::new(0),
            }),
        }
    }

    /// 實際送出的刷新請求次數
    pub fn exchange_count(&self) -> u64 {
        self.inner.exchanges.load(Ordering::SeqCst)
    }

    /// 取得新的 access token；進行中的刷新會被共用
    pub async fn refresh(&self) -> Result<String> {
        self.refresh_inner(None).await
    }

    /// `stale` 是失敗請求所帶的 token；若它已被換掉，直接回傳目前的 token
    pub async fn refresh_stale(&self, stale: Option<&str>) -> Result<String> {
        self.refresh_inner(Some(stale)).await
    }

    async fn refresh_inner(&self, stale: Option<Option<&str>>) -> Result<String> {
        let mut receiver = {
            let mut slot = self.inner.inflight.lock().await;

            if self.inner.session.current().is_none() {
                tracing::debug!("no session to refresh");
                return Err(HubError::AuthExpired);
            }

            if let Some(stale) = stale {
                if let Some(current) = self.inner.session.access_token() {
                    if Some(current.as_str()) != stale {
                        tracing::debug!("credential already refreshed by another action");
                        return Ok(current);
                    }
                }
            }

            match slot.as_ref() {
                Some(receiver) => {
                    tracing::debug!("joining in-flight token refresh");
                    receiver.clone()
                }
                None => {
                    let (sender, receiver) = watch::channel(None);
                    *slot = Some(receiver.clone());
                    self.spawn_exchange(sender);
                    receiver
                }
            }
        };

        let outcome = match receiver.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone().flatten(),
            Err(_) => {
                tracing::error!("token refresh task ended without a result");
                None
            }
        };

        outcome.ok_or(HubError::AuthExpired)
    }

    fn spawn_exchange(&self, sender: watch::Sender<Outcome>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.exchange().await;
            // session 先更新，再釋放 slot，最後通知等待者
            *inner.inflight.lock().await = None;
            let _ = sender.send(Some(outcome));
        });
    }
}

impl RefresherInner {
    async fn exchange(&self) -> Option<String> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        tracing::info!("🔄 refreshing access token");

        let spec = RequestSpec::post(self.refresh_path.clone()).with_cookie();
        let context = self.session.context();

        let token = match self.dispatcher.execute(&spec, &context).await {
            Ok(payload) => match payload.decode::<RefreshResponse>() {
                Ok(response) => Some(response.token),
                Err(e) => {
                    tracing::error!(error = %e, "refresh response missing token");
                    None
                }
            },
            Err(failure) => {
                tracing::warn!(?failure, "token refresh rejected");
                None
            }
        };

        match token {
            Some(token) if self.session.replace_access_token(&token) => {
                tracing::info!("✅ access token refreshed");
                Some(token)
            }
            Some(_) => {
                tracing::warn!("session ended while refreshing, discarding token");
                None
            }
            None => {
                self.session.invalidate();
                None
            }
        }
    }
}
