#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use webintel::config::Settings;
use webintel::data_models::ScrapedPage;
use webintel::error::{LlmError, ScrapeError, SearchError};
use webintel::llm::LlmClient;
use webintel::pipeline::IntelligenceService;
use webintel::scrapper::PageScraper;
use webintel::search::WebSearch;

pub const DEFAULT_MODEL: &str = "groq/compound-mini";

pub fn test_settings() -> Settings {
    Settings::from_lookup(|k| match k {
        "GROQ_API_KEY" => Some("test-key".to_string()),
        "SAVE_RESULTS" => Some("false".to_string()),
        _ => None,
    })
    .unwrap()
}

pub struct MockSearch {
    pub urls: Vec<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockSearch {
    pub fn returning(urls: &[&str]) -> Arc<MockSearch> {
        Arc::new(MockSearch {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<MockSearch> {
        Arc::new(MockSearch {
            urls: vec![],
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Provider {
                status: 500,
                body: "boom".to_string(),
            });
        }
        // deliberately ignores max_results so the caller's own cap is exercised
        let _ = max_results;
        Ok(self.urls.clone())
    }
}

/// Returns canned content per URL; URLs without an entry fail.
#[derive(Default)]
pub struct MockScraper {
    pub pages: HashMap<String, String>,
    pub scraped: Mutex<Vec<String>>,
}

impl MockScraper {
    pub fn with_pages(pages: &[(&str, &str)]) -> Arc<MockScraper> {
        Arc::new(MockScraper {
            pages: pages
                .iter()
                .map(|(u, c)| (u.to_string(), c.to_string()))
                .collect(),
            scraped: Mutex::new(Vec::new()),
        })
    }

    pub fn scraped(&self) -> Vec<String> {
        self.scraped.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        self.scraped.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(content) => Ok(ScrapedPage::new(
                url.to_string(),
                format!("Title for {url}"),
                content.clone(),
            )),
            None => Err(ScrapeError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string())),
        }
    }
}

pub struct MockLlm {
    pub reply: Result<String, ()>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl MockLlm {
    pub fn replying(reply: &str) -> Arc<MockLlm> {
        Arc::new(MockLlm {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<MockLlm> {
        Arc::new(MockLlm {
            reply: Err(()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// (model, prompt) pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    async fn complete(
        &self,
        model: &str,
        _system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        self.reply.clone().map_err(|_| LlmError::RateLimited)
    }
}

pub fn service(
    search: Arc<MockSearch>,
    scraper: Arc<MockScraper>,
    llm: Arc<MockLlm>,
) -> IntelligenceService {
    IntelligenceService::new(search, scraper, llm, &test_settings())
}
