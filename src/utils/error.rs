use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 傳輸層失敗時給使用者的通用訊息
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Unable to reach the server, please check your connection and try again";

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Session expired, please sign in again")]
    AuthExpired,

    #[error("{message}")]
    ValidationError { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Request rejected ({status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("{message}")]
    TransportFailure { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// API 失敗時的回應格式 `{ "message": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
}

impl HubError {
    pub fn validation(message: impl Into<String>) -> Self {
        HubError::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HubError::NotFound {
            message: message.into(),
        }
    }

    /// 對應到 HTTP 狀態碼（伺服器端回應用）
    pub fn status_code(&self) -> u16 {
        match self {
            HubError::AuthExpired => 401,
            HubError::ValidationError { .. } => 400,
            HubError::NotFound { .. } => 404,
            HubError::ClientError { status, .. } => *status,
            HubError::ServerError { status, .. } => *status,
            HubError::InvalidConfigValueError { .. } => 400,
            _ => 500,
        }
    }

    /// 轉成錯誤回應；伺服器內部錯誤不外洩細節
    pub fn envelope(&self) -> ErrorEnvelope {
        let message = match self.status_code() {
            500..=599 => match self {
                HubError::ServerError { message, .. } => message.clone(),
                _ => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        };
        ErrorEnvelope { message }
    }

    /// 只有 AuthExpired 可以透過刷新憑證恢復一次
    pub fn is_recoverable(&self) -> bool {
        matches!(self, HubError::AuthExpired)
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HubError::ValidationError { .. } | HubError::NotFound { .. } => ErrorSeverity::Low,
            HubError::AuthExpired
            | HubError::ClientError { .. }
            | HubError::TransportFailure { .. }
            | HubError::ApiError(_) => ErrorSeverity::Medium,
            HubError::ServerError { .. }
            | HubError::CsvError(_)
            | HubError::SerializationError(_)
            | HubError::ConfigError { .. }
            | HubError::InvalidConfigValueError { .. }
            | HubError::MissingConfigError { .. } => ErrorSeverity::High,
            HubError::StorageError(_) | HubError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HubError::AuthExpired => "Sign in again or update client.cookie with a fresh refresh token",
            HubError::ValidationError { .. } | HubError::ClientError { .. } => {
                "Check the request parameters"
            }
            HubError::NotFound { .. } => "Check the id and try again",
            HubError::ServerError { .. } => "Retry later; the server reported an internal failure",
            HubError::TransportFailure { .. } | HubError::ApiError(_) => {
                "Check client.base_url and your network connection"
            }
            HubError::StorageError(_) | HubError::IoError(_) => {
                "Check server.database_path and file permissions"
            }
            HubError::CsvError(_) => "Check that lookup CSV files have id,label,value columns",
            HubError::SerializationError(_) => "Check the JSON input format",
            HubError::ConfigError { .. }
            | HubError::InvalidConfigValueError { .. }
            | HubError::MissingConfigError { .. } => "Fix the configuration file and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HubError::ApiError(_) | HubError::TransportFailure { .. } => {
                TRANSPORT_FAILURE_MESSAGE.to_string()
            }
            HubError::StorageError(_) | HubError::IoError(_) => {
                "The data store is unavailable, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
