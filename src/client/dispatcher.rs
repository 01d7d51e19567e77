use crate::client::session::RequestContext;
use crate::config::ClientConfig;
use crate::utils::error::{HubError, Result, TRANSPORT_FAILURE_MESSAGE};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Public,
    Bearer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

/// 一次請求的完整描述；重送時原封不動再送一次
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub auth: AuthMode,
    pub forward_cookie: bool,
    pub idempotency_key: Option<String>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::Public,
            forward_cookie: false,
            idempotency_key: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn bearer(mut self) -> Self {
        self.auth = AuthMode::Bearer;
        self
    }

    pub fn with_cookie(mut self) -> Self {
        self.forward_cookie = true;
        self
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn with_json<T: serde::Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn with_bytes(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// 建立型請求帶上一次呼叫內固定不變的 idempotency key
    pub fn idempotent(mut self) -> Self {
        self.idempotency_key = Some(uuid::Uuid::new_v4().to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub status: u16,
    pub body: serde_json::Value,
}

impl Payload {
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    AuthExpired,
    ClientError { status: u16, message: String },
    ServerError { status: u16, message: String },
    TransportFailure { message: String },
}

impl From<Failure> for HubError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::AuthExpired => HubError::AuthExpired,
            Failure::ClientError {
                status: 400,
                message,
            } => HubError::ValidationError { message },
            Failure::ClientError {
                status: 404,
                message,
            } => HubError::NotFound { message },
            Failure::ClientError { status, message } => HubError::ClientError { status, message },
            Failure::ServerError { status, message } => HubError::ServerError { status, message },
            Failure::TransportFailure { message } => HubError::TransportFailure { message },
        }
    }
}

/// 依狀態碼分類回應
pub fn classify(status: StatusCode, body: serde_json::Value) -> std::result::Result<Payload, Failure> {
    if status.is_success() {
        return Ok(Payload {
            status: status.as_u16(),
            body,
        });
    }

    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => Err(Failure::AuthExpired),
        s if s.is_client_error() => Err(Failure::ClientError {
            status: s.as_u16(),
            message,
        }),
        s => Err(Failure::ServerError {
            status: s.as_u16(),
            message,
        }),
    }
}

/// 只負責送出一次請求並分類結果，不重試、不修改 session
#[derive(Debug, Clone)]
pub struct RequestDispatcher {
    client: Client,
    base_url: String,
}

impl RequestDispatcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn execute(
        &self,
        spec: &RequestSpec,
        context: &RequestContext,
    ) -> std::result::Result<Payload, Failure> {
        let url = self.url_for(&spec.path);
        let mut request = self.client.request(spec.method.clone(), &url);

        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if spec.auth == AuthMode::Bearer {
            if let Some(token) = &context.access_token {
                request = request.bearer_auth(token);
            }
        }
        if spec.forward_cookie {
            if let Some(cookie) = &context.cookie {
                request = request.header(COOKIE, cookie);
            }
        }
        if let Some(key) = &spec.idempotency_key {
            request = request.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        match &spec.body {
            Some(RequestBody::Json(value)) => request = request.json(value),
            Some(RequestBody::Bytes { content_type, data }) => {
                request = request
                    .header(CONTENT_TYPE, content_type)
                    .body(data.clone());
            }
            None => {}
        }

        tracing::debug!("📡 {} {}", spec.method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    method = %spec.method,
                    url = %url,
                    timeout = e.is_timeout(),
                    error = %e,
                    "request failed without response"
                );
                return Err(Failure::TransportFailure {
                    message: TRANSPORT_FAILURE_MESSAGE.to_string(),
                });
            }
        };

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "response body could not be read");
            Failure::TransportFailure {
                message: TRANSPORT_FAILURE_MESSAGE.to_string(),
            }
        })?;
        tracing::debug!("📡 {} {} -> {}", spec.method, url, status);

        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        classify(status, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_status() {
        assert!(classify(StatusCode::CREATED, json!({"id": 1})).is_ok());
        assert_eq!(
            classify(StatusCode::UNAUTHORIZED, json!({"message": "expired"})),
            Err(Failure::AuthExpired)
        );
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, json!({"message": "rating is required"})),
            Err(Failure::ClientError {
                status: 400,
                message: "rating is required".to_string()
            })
        );
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, serde_json::Value::Null),
            Err(Failure::ServerError {
                status: 502,
                message: "Bad Gateway".to_string()
            })
        );
    }

    #[test]
    fn test_failures_map_to_error_taxonomy() {
        let validation: HubError = Failure::ClientError {
            status: 400,
            message: "bad".to_string(),
        }
        .into();
        assert!(matches!(validation, HubError::ValidationError { .. }));

        let missing: HubError = Failure::ClientError {
            status: 404,
            message: "gone".to_string(),
        }
        .into();
        assert!(matches!(missing, HubError::NotFound { .. }));

        let forbidden: HubError = Failure::ClientError {
            status: 403,
            message: "no".to_string(),
        }
        .into();
        assert_eq!(forbidden.status_code(), 403);
    }

    #[test]
    fn test_idempotent_key_survives_clone() {
        let spec = RequestSpec::post("/api/conversations").bearer().idempotent();
        let retry = spec.clone();
        assert!(spec.idempotency_key.is_some());
        assert_eq!(spec, retry);
        assert_ne!(
            RequestSpec::post("/api/conversations").idempotent().idempotency_key,
            spec.idempotency_key
        );
    }

    #[test]
    fn test_url_join_trims_trailing_slash() {
        let dispatcher = RequestDispatcher::new(&ClientConfig::new("http://localhost:8000/")).unwrap();
        assert_eq!(
            dispatcher.url_for("/api/ratings"),
            "http://localhost:8000/api/ratings"
        );
    }
}
