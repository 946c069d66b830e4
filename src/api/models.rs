use serde::{Deserialize, Serialize};

use crate::config::MAX_URLS_LIMIT;
use crate::data_models::UrlFailure;
use crate::error::ApiError;
use crate::scrapper::parse_target;

pub const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_urls: Option<usize>,
    #[serde(default)]
    pub model: Option<String>,
}

impl SearchRequest {
    /// Returns the trimmed query and the effective URL cap.
    pub fn validate(&self, default_max_urls: usize) -> Result<(&str, usize), ApiError> {
        let query = self.query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(ApiError::Validation(format!(
                "query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        let max_urls = self.max_urls.unwrap_or(default_max_urls);
        if !(1..=MAX_URLS_LIMIT).contains(&max_urls) {
            return Err(ApiError::Validation(format!(
                "max_urls must be between 1 and {MAX_URLS_LIMIT}"
            )));
        }
        Ok((query, max_urls))
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ExtractRequest {
    pub fn validate(&self) -> Result<Vec<String>, ApiError> {
        if self.urls.is_empty() {
            return Err(ApiError::Validation("urls cannot be empty".to_string()));
        }
        if self.urls.len() > MAX_URLS_LIMIT {
            return Err(ApiError::Validation(format!(
                "at most {MAX_URLS_LIMIT} urls per request"
            )));
        }
        self.urls
            .iter()
            .map(|u| {
                parse_target(u)
                    .map(|_| u.trim().to_string())
                    .map_err(|e| ApiError::Validation(e.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntelligenceResponse {
    pub urls_processed: usize,
    pub urls: Vec<String>,
    pub summary: String,
    pub model_used: String,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<UrlFailure>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub search: &'static str,
    pub extract: &'static str,
}
