use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use std::time::Instant;

use crate::api::models::{ExtractRequest, IntelligenceResponse, SearchRequest};
use crate::config::Settings;
use crate::data_models::{FailureStage, RequestKind, SavedResult, ScrapedPage, UrlFailure};
use crate::error::{ApiError, ScrapeError};
use crate::extractor::{Extraction, extract_from_pages};
use crate::llm::LlmClient;
use crate::scrapper::PageScraper;
use crate::search::WebSearch;
use crate::store::ResultStore;

pub const NO_SEARCH_RESULTS: &str = "No search results found";

/// search -> scrape -> extract -> persist, shared by both endpoints.
pub struct IntelligenceService {
    search: Arc<dyn WebSearch>,
    scraper: Arc<dyn PageScraper>,
    llm: Arc<dyn LlmClient>,
    store: Option<ResultStore>,
    max_urls_per_query: usize,
    scrape_concurrency: usize,
}

struct Processed {
    urls_processed: usize,
    summary: String,
    failures: Vec<UrlFailure>,
}

impl IntelligenceService {
    pub fn new(
        search: Arc<dyn WebSearch>,
        scraper: Arc<dyn PageScraper>,
        llm: Arc<dyn LlmClient>,
        settings: &Settings,
    ) -> IntelligenceService {
        IntelligenceService {
            search,
            scraper,
            llm,
            store: settings
                .save_results
                .then(|| ResultStore::new(settings.answers_dir.clone())),
            max_urls_per_query: settings.max_urls_per_query,
            scrape_concurrency: settings.scrape_concurrency,
        }
    }

    pub fn with_store(mut self, store: Option<ResultStore>) -> IntelligenceService {
        self.store = store;
        self
    }

    fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.llm.default_model())
            .to_string()
    }

    pub async fn search_and_extract(
        &self,
        request: SearchRequest,
    ) -> Result<IntelligenceResponse, ApiError> {
        let start = Instant::now();
        let (query, max_urls) = request.validate(self.max_urls_per_query)?;
        let model = self.resolve_model(request.model.as_deref());
        tracing::info!(query, max_urls, "search request");

        let mut urls = self.search.search(query, max_urls).await.map_err(|e| {
            tracing::error!(query, error = %e, "search failed");
            ApiError::from(e)
        })?;
        urls.truncate(max_urls);

        if urls.is_empty() {
            return Ok(IntelligenceResponse {
                urls_processed: 0,
                urls,
                summary: NO_SEARCH_RESULTS.to_string(),
                model_used: model,
                processing_time: elapsed_secs(start),
                failures: vec![],
            });
        }

        let processed = self.process(&urls, &model).await;
        let response = IntelligenceResponse {
            urls_processed: processed.urls_processed,
            urls,
            summary: processed.summary,
            model_used: model,
            processing_time: elapsed_secs(start),
            failures: processed.failures,
        };
        self.persist(RequestKind::Search, Some(query.to_string()), &response)
            .await;
        Ok(response)
    }

    pub async fn extract(&self, request: ExtractRequest) -> Result<IntelligenceResponse, ApiError> {
        let start = Instant::now();
        let urls = request.validate()?;
        let model = self.resolve_model(request.model.as_deref());
        tracing::info!(urls = urls.len(), "extract request");

        let processed = self.process(&urls, &model).await;
        let response = IntelligenceResponse {
            urls_processed: processed.urls_processed,
            urls,
            summary: processed.summary,
            model_used: model,
            processing_time: elapsed_secs(start),
            failures: processed.failures,
        };
        self.persist(RequestKind::Extract, None, &response).await;
        Ok(response)
    }

    /// Scrapes every URL (bounded fan-out, input order kept) and runs one
    /// extraction over the pages that came back.
    async fn process(&self, urls: &[String], model: &str) -> Processed {
        let scraped: Vec<(String, Result<ScrapedPage, ScrapeError>)> = stream::iter(urls.iter().cloned())
            .map(|url| {
                let scraper = self.scraper.clone();
                async move {
                    let res = scraper.scrape(&url).await;
                    (url, res)
                }
            })
            .buffered(self.scrape_concurrency.max(1))
            .collect()
            .await;

        let mut pages = Vec::with_capacity(scraped.len());
        let mut failures = Vec::new();
        for (url, res) in scraped {
            match res {
                Ok(page) if page.content.trim().is_empty() => {
                    tracing::warn!(url = %url, "empty page");
                    failures.push(failure(url, FailureStage::Scrape, ScrapeError::EmptyContent));
                }
                Ok(page) => {
                    tracing::debug!(url = %url, chars = page.content.len(), "scraped");
                    pages.push(page);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "scrape failed");
                    failures.push(failure(url, FailureStage::Scrape, e));
                }
            }
        }
        tracing::info!(ok = pages.len(), total = urls.len(), "scraping finished");

        match extract_from_pages(self.llm.as_ref(), model, &pages).await {
            Ok(Extraction::Summary { text, sources }) => Processed {
                urls_processed: sources,
                summary: text,
                failures,
            },
            Ok(Extraction::Empty(msg)) => Processed {
                urls_processed: 0,
                summary: msg.to_string(),
                failures,
            },
            Err(e) => {
                tracing::error!(model, error = %e, "extraction failed");
                failures.extend(
                    pages
                        .into_iter()
                        .map(|p| failure(p.url, FailureStage::Extract, &e)),
                );
                Processed {
                    urls_processed: 0,
                    summary: format!("Extraction failed: {e}"),
                    failures,
                }
            }
        }
    }

    async fn persist(&self, kind: RequestKind, query: Option<String>, response: &IntelligenceResponse) {
        let Some(store) = &self.store else {
            return;
        };
        let saved = SavedResult {
            kind,
            query,
            urls: response.urls.clone(),
            urls_processed: response.urls_processed,
            summary: response.summary.clone(),
            model: response.model_used.clone(),
            time: response.processing_time,
            saved_at: Utc::now(),
        };
        if let Err(e) = store.save(kind.as_str(), &saved).await {
            tracing::error!(dir = %store.dir().display(), error = %e, "failed to save result");
        }
    }
}

fn failure(url: String, stage: FailureStage, error: impl ToString) -> UrlFailure {
    UrlFailure {
        url,
        stage,
        error: error.to_string(),
    }
}

fn elapsed_secs(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
