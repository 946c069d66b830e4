use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::Settings;
use crate::error::SearchError;
use crate::retry;

pub const GOOGLE_SEARCH_API_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// The Custom Search API never returns more than 10 items per page.
const PAGE_SIZE: usize = 10;
const MAX_TOTAL_RESULTS: usize = 10;
const PAGINATION_DELAY: Duration = Duration::from_millis(100);

/// Anything that can turn a free-text query into an ordered list of URLs.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

pub struct GoogleSearch {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    engine_id: Option<String>,
    max_retries: u32,
    retry_delay_base: Duration,
    max_wait: Duration,
}

impl GoogleSearch {
    pub fn new(settings: &Settings) -> Result<GoogleSearch, SearchError> {
        let http = Client::builder().timeout(settings.request_timeout).build()?;
        if !settings.search_configured() {
            tracing::warn!("GOOGLE_SEARCH_API_KEY / GOOGLE_SEARCH_ENGINE_ID not set, /api/search is disabled");
        }
        Ok(GoogleSearch {
            http,
            endpoint: GOOGLE_SEARCH_API_URL.to_string(),
            api_key: settings.google_api_key.clone(),
            engine_id: settings.google_engine_id.clone(),
            max_retries: settings.max_retries,
            retry_delay_base: settings.retry_delay_base,
            max_wait: settings.request_timeout,
        })
    }

    /// Points the client at another endpoint, e.g. a local stub server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> GoogleSearch {
        self.endpoint = endpoint.into();
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        retry::backoff(self.retry_delay_base, attempt).min(self.max_wait)
    }

    async fn request_page(
        &self,
        key: &str,
        cx: &str,
        query: &str,
        num: usize,
        start: usize,
    ) -> Result<SearchResponse, SearchError> {
        let num = num.min(PAGE_SIZE).to_string();
        let start = start.to_string();
        let params = [
            ("key", key),
            ("cx", cx),
            ("q", query),
            ("num", num.as_str()),
            ("start", start.as_str()),
        ];

        let mut last_error = None;
        for attempt in 0..self.max_retries {
            let is_last = attempt + 1 >= self.max_retries;
            let res = match self.http.get(&self.endpoint).query(&params).send().await {
                Ok(res) => res,
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, max = self.max_retries, error = %e, "search request failed");
                    last_error = Some(SearchError::Transport(e));
                    if !is_last {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                    continue;
                }
            };

            let status = res.status();
            match status {
                StatusCode::OK => return Ok(res.json::<SearchResponse>().await?),
                StatusCode::TOO_MANY_REQUESTS => {
                    let wait = retry::rate_limit_wait(res.headers(), self.retry_delay_base, attempt, self.max_wait);
                    tracing::warn!(attempt = attempt + 1, max = self.max_retries, wait_secs = wait.as_secs_f64(), "search rate limited");
                    last_error = Some(SearchError::RateLimited("HTTP 429".to_string()));
                    if !is_last {
                        tokio::time::sleep(wait).await;
                    }
                }
                StatusCode::FORBIDDEN => {
                    let body = res.text().await.unwrap_or_default();
                    return Err(classify_forbidden(&body));
                }
                StatusCode::BAD_REQUEST => {
                    let body = res.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                        .ok()
                        .map(|e| e.error.message)
                        .filter(|m| !m.is_empty())
                        .unwrap_or(body);
                    return Err(SearchError::BadRequest(message));
                }
                _ => {
                    let body = res.text().await.unwrap_or_default();
                    tracing::warn!(attempt = attempt + 1, max = self.max_retries, status = status.as_u16(), "search request failed");
                    last_error = Some(SearchError::Provider {
                        status: status.as_u16(),
                        body,
                    });
                    if !is_last {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(SearchError::Provider {
            status: 0,
            body: "search failed after all retries".to_string(),
        }))
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let (Some(key), Some(cx)) = (self.api_key.as_deref(), self.engine_id.as_deref()) else {
            return Err(SearchError::NotConfigured);
        };

        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            tracing::warn!("skipping empty search");
            return Ok(vec![]);
        }

        tracing::info!(query, "searching");
        let wanted = max_results.min(MAX_TOTAL_RESULTS);
        let mut urls = Vec::with_capacity(wanted);
        let mut seen = HashSet::new();

        let mut start = 1;
        while start <= wanted {
            let batch = (wanted - start + 1).min(PAGE_SIZE);
            let page = match self.request_page(key, cx, query, batch, start).await {
                Ok(page) => page,
                // a rate limit mid-pagination keeps what we already have
                Err(SearchError::RateLimited(e)) if !urls.is_empty() => {
                    tracing::warn!(error = %e, "rate limited during pagination");
                    break;
                }
                Err(e) => return Err(e),
            };

            if page.items.is_empty() {
                break;
            }
            collect_links(page, wanted, &mut seen, &mut urls);
            if urls.len() >= wanted {
                break;
            }

            start += PAGE_SIZE;
            tokio::time::sleep(PAGINATION_DELAY).await;
        }

        tracing::info!(query, found = urls.len(), "search complete");
        Ok(urls)
    }
}

/// Appends unseen, non-empty links in result order until `limit` is reached.
pub fn collect_links(
    page: SearchResponse,
    limit: usize,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    for item in page.items {
        if out.len() >= limit {
            break;
        }
        let link = item.link.trim();
        if link.is_empty() || !seen.insert(link.to_string()) {
            continue;
        }
        out.push(link.to_string());
    }
}

fn classify_forbidden(body: &str) -> SearchError {
    let reason = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.errors.into_iter().next())
        .map(|d| d.reason)
        .unwrap_or_default();

    if reason.contains("dailyLimitExceeded") || reason.contains("quotaExceeded") {
        SearchError::QuotaExceeded(reason)
    } else if reason.contains("rateLimitExceeded") {
        SearchError::RateLimited(reason)
    } else {
        SearchError::Forbidden(body.to_string())
    }
}
