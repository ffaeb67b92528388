use std::fmt;

use serde::Serialize;

/// Machine-classifiable outcome of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Unauthorized,
    Client,
    Server,
    Network,
    Parse,
    Timeout,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(Self::Unauthorized),
            400..=499 => Some(Self::Client),
            500..=599 => Some(Self::Server),
            _ => None,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Please login to continue.",
            Self::Client => "The request could not be completed. Please check your input.",
            Self::Server => "Service temporarily unavailable. Please try again later.",
            Self::Network => "Network error. Please check your connection and try again.",
            Self::Parse => "Received an unexpected response. Please try again.",
            Self::Timeout => "The request timed out. Please try again.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::Client => "client_error",
            Self::Server => "server_error",
            Self::Network => "network_error",
            Self::Parse => "parse_error",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Normalized failure returned by the dispatcher. `message` is safe to show to the user as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiFailure {
    pub kind: FailureKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn new(kind: FailureKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn of_kind(kind: FailureKind) -> Self {
        Self::new(kind, None, kind.default_message())
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == FailureKind::Unauthorized
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}) - {}", self.kind, self.message),
            None => write!(f, "{} - {}", self.kind, self.message),
        }
    }
}
