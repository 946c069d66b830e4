use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinHandle;

use crate::analyzer::{HtmlTextExtractor, truncate_chars};
use crate::config::{ScrapeBackend, Settings};
use crate::data_models::ScrapedPage;
use crate::error::ScrapeError;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Maximum characters kept from one page.
pub const MAX_PAGE_CHARS: usize = 10_000;

#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}

/// Process-wide gate in front of every scrape: bounded concurrency plus the
/// per-URL timeout.
#[derive(Clone)]
pub struct ScrapeLimiter {
    concurrent_scraps: Arc<Semaphore>,
    timeout: Duration,
}

impl ScrapeLimiter {
    pub fn new(max_concurrent_scraps: usize, timeout: Duration) -> ScrapeLimiter {
        ScrapeLimiter {
            concurrent_scraps: Arc::new(Semaphore::new(max_concurrent_scraps)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ScrapeError> {
        self.concurrent_scraps
            .acquire()
            .await
            .map_err(|_| ScrapeError::Navigation("scrape limiter closed".to_string()))
    }

    /// Runs `fut` under the per-URL timeout, without taking a permit.
    pub async fn bounded<F, T>(&self, fut: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = Result<T, ScrapeError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ScrapeError::Timeout(self.timeout.as_secs()))?
    }

    /// Permit, then timeout. Only for work with nothing to release once it is
    /// dropped mid-flight.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ScrapeError>
    where
        F: Future<Output = Result<T, ScrapeError>>,
    {
        let _permit = self.acquire().await?;
        self.bounded(fut).await
    }
}

pub fn parse_target(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim()).map_err(|_| ScrapeError::InvalidUrl(raw.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ScrapeError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Rendered or raw HTML in, [`ScrapedPage`] out.
pub fn page_from_html(url: &str, html: &str) -> Result<ScrapedPage, ScrapeError> {
    let extracted = HtmlTextExtractor.extract(html);
    let content = extracted.readable();
    if content.trim().is_empty() {
        return Err(ScrapeError::EmptyContent);
    }
    Ok(ScrapedPage::new(
        url.to_string(),
        extracted.title.trim().to_string(),
        truncate_chars(&content, MAX_PAGE_CHARS).to_string(),
    ))
}

/// Plain HTTP fetch. Cheap, but sees no script-rendered content.
pub struct HttpScraper {
    http: Client,
    limiter: ScrapeLimiter,
}

impl HttpScraper {
    pub fn new(limiter: ScrapeLimiter) -> Result<HttpScraper, ScrapeError> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(HttpScraper { http, limiter })
    }

    async fn fetch(&self, url: Url) -> Result<ScrapedPage, ScrapeError> {
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let ct = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !ct.is_empty() && !ct.starts_with("text/html") && !ct.starts_with("application/xhtml") {
            return Err(ScrapeError::UnsupportedContent(ct));
        }

        let body = res.bytes().await?;
        let html = String::from_utf8_lossy(&body);
        page_from_html(url.as_str(), &html)
    }
}

#[async_trait]
impl PageScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let target = parse_target(url)?;
        tracing::debug!(url, "fetching");
        self.limiter.run(self.fetch(target)).await
    }
}

/// One shared headless Chromium; each scrape gets its own tab.
pub struct BrowserScraper {
    browser: Browser,
    handler: JoinHandle<()>,
    limiter: ScrapeLimiter,
}

impl BrowserScraper {
    pub async fn launch(headless: bool, limiter: ScrapeLimiter) -> Result<BrowserScraper, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={BROWSER_USER_AGENT}"));
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| ScrapeError::Navigation(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // the CDP connection only makes progress while the handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless, "browser launched");
        Ok(BrowserScraper {
            browser,
            handler,
            limiter,
        })
    }
}

impl Drop for BrowserScraper {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageScraper for BrowserScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let target = parse_target(url)?;
        let _permit = self.limiter.acquire().await?;
        tracing::debug!(url, "rendering");
        let tab = self
            .limiter
            .bounded(async { Ok(self.browser.new_page("about:blank").await?) })
            .await?;
        render_in_tab(tab, &target, &self.limiter).await
    }
}

/// A browser tab that has to be closed explicitly or it stays open in the
/// shared Chromium.
#[async_trait]
pub trait BrowserTab: Send + Sync + Sized {
    async fn load(&self, url: &str) -> Result<String, ScrapeError>;

    async fn close(self) -> Result<(), ScrapeError>;
}

#[async_trait]
impl BrowserTab for Page {
    async fn load(&self, url: &str) -> Result<String, ScrapeError> {
        self.goto(url).await?;
        self.wait_for_navigation().await?;
        Ok(self.content().await?)
    }

    async fn close(self) -> Result<(), ScrapeError> {
        Page::close(self).await?;
        Ok(())
    }
}

/// Loads `url` in `tab` under the limiter's timeout. The tab is closed on
/// every path, including when the load times out.
pub async fn render_in_tab<T: BrowserTab>(
    tab: T,
    url: &Url,
    limiter: &ScrapeLimiter,
) -> Result<ScrapedPage, ScrapeError> {
    let loaded = limiter.bounded(tab.load(url.as_str())).await;
    if let Err(e) = tab.close().await {
        tracing::debug!(url = %url, error = %e, "failed to close tab");
    }
    page_from_html(url.as_str(), &loaded?)
}

/// Builds the configured backend. A browser that fails to launch falls back
/// to plain HTTP so the service still starts.
pub async fn build_scraper(settings: &Settings) -> Result<Arc<dyn PageScraper>, ScrapeError> {
    let limiter = ScrapeLimiter::new(settings.scrape_concurrency, settings.scrape_timeout);
    if settings.scrape_backend == ScrapeBackend::Browser {
        match BrowserScraper::launch(settings.headless, limiter.clone()).await {
            Ok(scraper) => return Ok(Arc::new(scraper)),
            Err(e) => {
                tracing::warn!(error = %e, "could not launch browser, falling back to http scraping");
            }
        }
    }
    Ok(Arc::new(HttpScraper::new(limiter)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_parse_target_rejects_non_http() {
        assert!(parse_target("https://a.example/x").is_ok());
        assert!(matches!(parse_target("ftp://a.example"), Err(ScrapeError::InvalidUrl(_))));
        assert!(matches!(parse_target("not a url"), Err(ScrapeError::InvalidUrl(_))));
    }

    #[test]
    fn test_page_from_html() {
        let html = "<html><head><title>Flood watch</title></head><body><p>River at 4.2m</p></body></html>";
        let page = page_from_html("http://a.example", html).unwrap();
        assert_eq!(page.title, "Flood watch");
        assert!(page.content.contains("River at 4.2m"));

        let empty = page_from_html("http://a.example", "<html><body><script>x()</script></body></html>");
        assert!(matches!(empty, Err(ScrapeError::EmptyContent)));
    }

    #[test]
    fn test_page_content_is_truncated() {
        let html = format!("<p>{}</p>", "é".repeat(MAX_PAGE_CHARS + 50));
        let page = page_from_html("http://a.example", &html).unwrap();
        assert_eq!(page.content.chars().count(), MAX_PAGE_CHARS);
    }

    #[tokio::test]
    async fn test_limiter_times_out() {
        let limiter = ScrapeLimiter::new(1, Duration::from_millis(10));
        let res: Result<(), _> = limiter
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(ScrapeError::Timeout(_))));
    }

    struct FakeTab {
        delay: Duration,
        html: &'static str,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BrowserTab for FakeTab {
        async fn load(&self, _url: &str) -> Result<String, ScrapeError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.html.to_string())
        }

        async fn close(self) -> Result<(), ScrapeError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn tab(delay: Duration, html: &'static str) -> (FakeTab, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let tab = FakeTab {
            delay,
            html,
            closed: closed.clone(),
        };
        (tab, closed)
    }

    #[tokio::test]
    async fn test_tab_closed_after_render() {
        let limiter = ScrapeLimiter::new(1, Duration::from_secs(5));
        let url = parse_target("http://a.example").unwrap();
        let (tab, closed) = tab(Duration::ZERO, "<p>Gauge at 2.9m</p>");
        let page = render_in_tab(tab, &url, &limiter).await.unwrap();
        assert_eq!(page.content, "Gauge at 2.9m");
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tab_closed_when_load_times_out() {
        let limiter = ScrapeLimiter::new(1, Duration::from_millis(20));
        let url = parse_target("http://slow.example").unwrap();
        let (tab, closed) = tab(Duration::from_secs(5), "<p>late</p>");
        let res = render_in_tab(tab, &url, &limiter).await;
        assert!(matches!(res, Err(ScrapeError::Timeout(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_tab_closed_when_page_is_empty() {
        let limiter = ScrapeLimiter::new(1, Duration::from_secs(5));
        let url = parse_target("http://a.example").unwrap();
        let (tab, closed) = tab(Duration::ZERO, "<script>x()</script>");
        let res = render_in_tab(tab, &url, &limiter).await;
        assert!(matches!(res, Err(ScrapeError::EmptyContent)));
        assert!(closed.load(Ordering::SeqCst));
    }
}
