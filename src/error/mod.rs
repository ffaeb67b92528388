pub mod types;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub use types::{ApiFailure, FailureKind};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid params - {0}")]
    InvalidParams(String),

    #[error("Internal error - {0}")]
    InternalServerError(String),

    #[error("API request failed - {0}")]
    Api(ApiFailure),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Crypto error - {0}")]
    CryptoError(String),

    #[error("Serialization error - {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error - {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Invalid URL - {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error - {0}")]
    IoError(#[from] std::io::Error),

    #[error("TryInitError - {0}")]
    TryInitError(#[from] tracing_subscriber::util::TryInitError),
}

impl From<ApiFailure> for AppError {
    fn from(failure: ApiFailure) -> Self {
        Self::Api(failure)
    }
}

impl From<AppError> for ApiFailure {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Api(failure) => failure,
            other => {
                let kind = other.kind().unwrap_or(FailureKind::Client);
                ApiFailure::new(kind, None, other.user_safe_message())
            }
        }
    }
}

impl AppError {
    /// HTTP status matching the failure. The gate answers with it and echoes it as `code`.
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            Some(FailureKind::Unauthorized) => StatusCode::UNAUTHORIZED,
            Some(FailureKind::Client) => match self {
                Self::Api(ApiFailure {
                    status: Some(code), ..
                }) => StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_REQUEST),
                _ => StatusCode::BAD_REQUEST,
            },
            Some(FailureKind::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Some(FailureKind::Server | FailureKind::Network | FailureKind::Parse) => {
                StatusCode::BAD_GATEWAY
            }
            None => match self {
                Self::InvalidParams(_) | Self::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> u16 {
        self.status().as_u16()
    }

    /// Classification used by callers deciding how to react to a failure.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Api(failure) => Some(failure.kind),
            Self::Unauthorized | Self::SessionExpired => Some(FailureKind::Unauthorized),
            Self::SerializationError(_) => Some(FailureKind::Parse),
            Self::HttpClientError(error) if error.is_timeout() => Some(FailureKind::Timeout),
            Self::HttpClientError(_) => Some(FailureKind::Network),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == Some(FailureKind::Unauthorized)
    }

    /// Message suitable for a toast. Internal details are logged, never shown.
    pub fn user_safe_message(&self) -> String {
        match self {
            Self::InvalidParams(msg) => msg.clone(),
            Self::Api(failure) => failure.message.clone(),
            Self::Unauthorized => FailureKind::Unauthorized.default_message().to_string(),
            Self::SessionExpired => "Session has expired. Please login again.".to_string(),
            Self::SerializationError(error) => {
                tracing::error!(error = %error, "Serialization error");
                FailureKind::Parse.default_message().to_string()
            }
            Self::HttpClientError(error) => {
                tracing::error!(error = %error, "HTTP client error");
                match self.kind() {
                    Some(kind) => kind.default_message().to_string(),
                    None => FailureKind::Network.default_message().to_string(),
                }
            }
            Self::CryptoError(error) => {
                tracing::error!(error = %error, "Crypto error");
                "Internal error".to_string()
            }
            Self::InternalServerError(error) => {
                tracing::error!(error = %error, "Internal error");
                "Internal error".to_string()
            }
            Self::IoError(error) => {
                tracing::error!(error = %error, "IO error");
                "Service temporarily unavailable. Please try again later.".to_string()
            }
            Self::TryInitError(error) => {
                tracing::error!(error = %error, "TryInitError");
                "Internal error".to_string()
            }
            Self::InvalidUrl(error) => {
                tracing::error!(error = %error, "Invalid URL");
                "Internal error".to_string()
            }
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.user_safe_message(),
            kind: self.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = serde_json::to_string(&self.to_body())
            .unwrap_or_else(|_| r#"{"code":500,"message":"Internal error"}"#.to_string());

        (status, [("content-type", "application/json")], body).into_response()
    }
}
