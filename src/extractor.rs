use crate::analyzer::truncate_chars;
use crate::data_models::ScrapedPage;
use crate::error::LlmError;
use crate::llm::LlmClient;

pub const EXTRACTION_PROMPT: &str = "Extract key information from the content below.

Provide:
1. A brief summary (2-3 sentences)
2. Key facts and findings (bullet points)
3. Any relevant locations, dates, or numbers mentioned

Be concise and factual.";

/// Characters taken from each source before combining.
pub const PER_SOURCE_CHARS: usize = 4_000;
/// Ceiling on the combined prompt content.
pub const MAX_PROMPT_CHARS: usize = 12_000;

pub const NO_CONTENT: &str = "No content to analyze";
pub const NO_EXTRACTED_CONTENT: &str = "No content extracted from URLs";

/// Outcome of one extraction over a batch of pages.
#[derive(Debug)]
pub enum Extraction {
    /// The LLM answered; `sources` counts pages that went into the prompt.
    Summary { text: String, sources: usize },
    /// Nothing to send, so the LLM was not called.
    Empty(&'static str),
}

/// Concatenates page contents under numbered source headers. Pages with no
/// content are skipped but keep their number.
pub fn combine_sources(pages: &[ScrapedPage]) -> (String, usize) {
    let mut combined = String::new();
    let mut used = 0;
    for (i, page) in pages.iter().enumerate() {
        if page.content.trim().is_empty() {
            continue;
        }
        combined.push_str(&format!(
            "\n\n=== SOURCE {}: {} ===\n{}",
            i + 1,
            page.url,
            truncate_chars(&page.content, PER_SOURCE_CHARS)
        ));
        used += 1;
    }
    (combined, used)
}

pub fn build_prompt(content: &str) -> String {
    let content = if content.chars().count() > MAX_PROMPT_CHARS {
        format!("{}\n[truncated]", truncate_chars(content, MAX_PROMPT_CHARS))
    } else {
        content.to_string()
    };
    format!("Content to analyze:\n\n{content}")
}

pub async fn extract_from_pages(
    llm: &dyn LlmClient,
    model: &str,
    pages: &[ScrapedPage],
) -> Result<Extraction, LlmError> {
    if pages.is_empty() {
        return Ok(Extraction::Empty(NO_CONTENT));
    }

    let (combined, sources) = combine_sources(pages);
    if sources == 0 {
        return Ok(Extraction::Empty(NO_EXTRACTED_CONTENT));
    }

    tracing::info!(chars = combined.len(), sources, model, "extracting");
    let text = llm
        .complete(model, EXTRACTION_PROMPT, &build_prompt(&combined))
        .await?;
    tracing::info!("extraction complete");
    Ok(Extraction::Summary { text, sources })
}
