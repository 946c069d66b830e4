use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Readable content pulled from one URL.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub scraped_at: DateTime<Utc>,
}

impl ScrapedPage {
    pub fn new(url: String, title: String, content: String) -> ScrapedPage {
        ScrapedPage {
            url,
            title,
            content,
            scraped_at: Utc::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Scrape,
    Extract,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UrlFailure {
    pub url: String,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Search,
    Extract,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Search => "search",
            RequestKind::Extract => "extract",
        }
    }
}

/// What lands on disk under the answers directory.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SavedResult {
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub urls: Vec<String>,
    pub urls_processed: usize,
    pub summary: String,
    pub model: String,
    pub time: f64,
    pub saved_at: DateTime<Utc>,
}
