use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Raised while loading [`crate::config::Settings`]. Always fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {key} (needed for LLM_PROVIDER={provider})")]
    MissingKey { key: &'static str, provider: String },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search is not configured: set GOOGLE_SEARCH_API_KEY and GOOGLE_SEARCH_ENGINE_ID")]
    NotConfigured,

    #[error("search API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("search API rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("search API access forbidden: {0}")]
    Forbidden(String),

    #[error("bad search request: {0}")]
    BadRequest(String),

    #[error("search request failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("search transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Per-URL scrape failure. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("content-type not html: {0}")]
    UnsupportedContent(String),

    #[error("page has no readable content")]
    EmptyContent,
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        ScrapeError::Navigation(e.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Navigation(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file in {dir}: {source}")]
    Appender {
        dir: String,
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    #[error("logging already initialised: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider rejected credentials (status {0})")]
    Auth(u16),

    #[error("LLM provider rate limit exceeded")]
    RateLimited,

    #[error("LLM provider returned status {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("LLM transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors surfaced to HTTP callers. Per-URL failures never end up here; they
/// are reported inside the response body instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Unreadable bodies (bad JSON, wrong content type, missing fields) are the
/// caller's mistake and get the same 400 envelope as any other validation
/// failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Search(SearchError::NotConfigured | SearchError::QuotaExceeded(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Search(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Search(_) => "search_provider_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
