use anyhow::Context;
use std::sync::Arc;

use webintel::api::create_router;
use webintel::config::Settings;
use webintel::llm::ChatCompletionsClient;
use webintel::logging;
use webintel::pipeline::IntelligenceService;
use webintel::scrapper::build_scraper;
use webintel::search::GoogleSearch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;

    let _logs = logging::init(settings.log_dir.as_deref()).context("failed to set up logging")?;

    tracing::info!(
        provider = settings.llm_provider.as_str(),
        model = %settings.default_model,
        search = settings.search_configured(),
        backend = ?settings.scrape_backend,
        headless = settings.headless,
        "starting web intelligence API"
    );

    let search = GoogleSearch::new(&settings)?;
    let llm = ChatCompletionsClient::new(&settings)?;
    let scraper = build_scraper(&settings).await?;

    let service = IntelligenceService::new(Arc::new(search), scraper, Arc::new(llm), &settings);
    let app = create_router(Arc::new(service));

    let addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
