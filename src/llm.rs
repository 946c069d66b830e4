use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{LlmProvider, Settings};
use crate::error::LlmError;
use crate::retry;

const TEMPERATURE: f32 = 0.3;

/// A hosted chat-completion model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError>;
}

#[derive(Serialize, Debug)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_content(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no message content in choices".to_string()))
    }
}

/// OpenAI-compatible `/chat/completions` client. Groq and OpenRouter both
/// speak this dialect, so the provider only decides base URL and key.
pub struct ChatCompletionsClient {
    http: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: String,
    default_model: String,
    max_retries: u32,
    retry_delay_base: Duration,
    max_wait: Duration,
}

impl ChatCompletionsClient {
    pub fn new(settings: &Settings) -> Result<ChatCompletionsClient, LlmError> {
        let http = Client::builder().timeout(settings.request_timeout).build()?;
        tracing::info!(provider = settings.llm_provider.as_str(), model = %settings.default_model, "LLM client ready");
        Ok(ChatCompletionsClient {
            http,
            provider: settings.llm_provider,
            base_url: settings.llm_provider.base_url().to_string(),
            api_key: settings.llm_api_key.clone(),
            default_model: settings.default_model.clone(),
            max_retries: settings.max_retries,
            retry_delay_base: settings.retry_delay_base,
            max_wait: settings.request_timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> ChatCompletionsClient {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let body = ChatRequest {
            model,
            messages,
            temperature: TEMPERATURE,
        };

        tracing::debug!(chars = prompt.len(), model, "LLM request");
        let endpoint = self.endpoint();

        for attempt in 0..self.max_retries {
            let res = self
                .http
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = res.status();
            if status.is_success() {
                let content = res
                    .json::<ChatResponse>()
                    .await
                    .map_err(|e| LlmError::MalformedResponse(e.to_string()))?
                    .into_content()?;
                tracing::debug!(chars = content.len(), "LLM response");
                return Ok(content);
            }

            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(LlmError::Auth(status.as_u16()));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempt + 1 >= self.max_retries {
                        break;
                    }
                    let wait = retry::rate_limit_wait(res.headers(), self.retry_delay_base, attempt, self.max_wait);
                    tracing::warn!(attempt = attempt + 1, max = self.max_retries, wait_secs = wait.as_secs_f64(), "LLM rate limited");
                    tokio::time::sleep(wait).await;
                }
                _ => {
                    let body = res.text().await.unwrap_or_default();
                    return Err(LlmError::Provider {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }

        Err(LlmError::RateLimited)
    }
}
