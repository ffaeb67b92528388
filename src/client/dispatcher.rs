use std::time::Duration;

use reqwest::{
    Method, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::{
    config::ApiConfig,
    error::{ApiFailure, FailureKind, Result},
    utils::security::mask_uri_token,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One outgoing call, relative to the configured API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Path plus query string, as it appears in logs.
    pub fn display_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        mask_uri_token(&format!("{}?{}", self.path, query))
    }
}

/// Sends requests and classifies every outcome into a JSON payload or an [`ApiFailure`].
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(api_config: &ApiConfig) -> Result<Self> {
        Url::parse(&api_config.base_url)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("iter-bene-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: api_config.base_url.trim_end_matches('/').to_string(),
            request_timeout: api_config.request_timeout,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn url_for(&self, path: &str) -> std::result::Result<Url, ApiFailure> {
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| {
            tracing::error!(error = %e, path, "Invalid request URL");
            ApiFailure::new(FailureKind::Client, None, "Invalid request.")
        })
    }

    pub async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> std::result::Result<Value, ApiFailure> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!(
            "api_request",
            method = %request.method,
            path = %request.display_path(),
            request_id = %request_id,
            authenticated = bearer.is_some(),
        );

        self.execute(request, bearer, timeout, request_id)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        timeout: Duration,
        request_id: String,
    ) -> std::result::Result<Value, ApiFailure> {
        let url = self.url_for(&request.path)?;
        let headers = build_headers(request, bearer, &request_id)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(headers)
            .timeout(timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(classify_transport_error)?;

        let outcome = classify_response(status, &bytes);
        match &outcome {
            Ok(_) => tracing::debug!(status = status.as_u16(), "Request succeeded"),
            Err(failure) if failure.kind == FailureKind::Server => {
                tracing::warn!(status = status.as_u16(), "Server error");
            }
            Err(failure) => {
                tracing::debug!(status = status.as_u16(), kind = %failure.kind, "Request failed");
            }
        }
        outcome
    }
}

fn build_headers(
    request: &ApiRequest,
    bearer: Option<&str>,
    request_id: &str,
) -> std::result::Result<HeaderMap, ApiFailure> {
    let invalid = |what: &str| {
        tracing::error!(header = what, "Invalid header value");
        ApiFailure::new(FailureKind::Client, None, "Invalid request.")
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(request_id).map_err(|_| invalid(REQUEST_ID_HEADER))?,
    );

    if let Some(token) = bearer {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| invalid("authorization"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid(name.as_str()))?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid(name.as_str()))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

fn classify_transport_error(error: reqwest::Error) -> ApiFailure {
    if error.is_timeout() {
        tracing::warn!(error = %error, "Request timed out");
        ApiFailure::of_kind(FailureKind::Timeout)
    } else {
        tracing::warn!(error = %error, "Network error");
        ApiFailure::of_kind(FailureKind::Network)
    }
}

/// Maps a received status and body onto the success payload or a classified failure.
pub fn classify_response(status: StatusCode, body: &[u8]) -> std::result::Result<Value, ApiFailure> {
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice::<Value>(body)
    };

    if status.is_success() {
        return parsed.map_err(|e| {
            tracing::warn!(error = %e, "Response body is not JSON");
            ApiFailure::of_kind(FailureKind::Parse)
        });
    }

    let kind = FailureKind::from_status(status.as_u16()).unwrap_or(FailureKind::Server);
    let server_message = match kind {
        FailureKind::Unauthorized | FailureKind::Client => {
            parsed.ok().as_ref().and_then(server_message)
        }
        _ => None,
    };

    Err(match server_message {
        Some(message) => ApiFailure::new(kind, Some(status.as_u16()), message),
        None => ApiFailure {
            status: Some(status.as_u16()),
            ..ApiFailure::of_kind(kind)
        },
    })
}

/// Human-readable message from the common API error shapes.
fn server_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.get("error").and_then(|e| e.get("message")),
        body.get("error"),
        body.get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("detail")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
