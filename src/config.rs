use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on URLs handled by one request.
pub const MAX_URLS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    OpenRouter,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "groq",
            LlmProvider::OpenRouter => "openrouter",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeBackend {
    Browser,
    Http,
}

/// Process-wide settings. Built once in `main` and handed to each client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub default_model: String,
    pub google_api_key: Option<String>,
    pub google_engine_id: Option<String>,
    pub headless: bool,
    pub scrape_backend: ScrapeBackend,
    pub scrape_timeout: Duration,
    pub scrape_concurrency: usize,
    pub max_urls_per_query: usize,
    pub max_retries: u32,
    pub retry_delay_base: Duration,
    pub request_timeout: Duration,
    pub answers_dir: PathBuf,
    pub save_results: bool,
    /// Where the rolling log files go; `None` logs to the console only.
    pub log_dir: Option<PathBuf>,
    pub api_host: String,
    pub api_port: u16,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Settings, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let llm_provider = match get("LLM_PROVIDER").as_deref().map(str::trim) {
            None => LlmProvider::Groq,
            Some(p) if p.eq_ignore_ascii_case("groq") => LlmProvider::Groq,
            Some(p) if p.eq_ignore_ascii_case("openrouter") => LlmProvider::OpenRouter,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LLM_PROVIDER",
                    value: other.to_string(),
                });
            }
        };

        let llm_api_key = get(llm_provider.key_var()).ok_or_else(|| ConfigError::MissingKey {
            key: llm_provider.key_var(),
            provider: llm_provider.as_str().to_string(),
        })?;

        let default_model = match llm_provider {
            LlmProvider::Groq => {
                get("DEFAULT_GROQ_MODEL").unwrap_or_else(|| "groq/compound-mini".to_string())
            }
            LlmProvider::OpenRouter => get("DEFAULT_OPENROUTER_MODEL")
                .unwrap_or_else(|| "mistralai/mistral-7b-instruct:free".to_string()),
        };

        let scrape_backend = match get("SCRAPE_BACKEND").as_deref().map(str::trim) {
            None => ScrapeBackend::Browser,
            Some(b) if b.eq_ignore_ascii_case("browser") => ScrapeBackend::Browser,
            Some(b) if b.eq_ignore_ascii_case("http") => ScrapeBackend::Http,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "SCRAPE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let scrape_timeout: u64 = parse_or_default(&get, "SCRAPE_TIMEOUT", 30)?;
        let scrape_concurrency: usize = parse_or_default(&get, "SCRAPE_CONCURRENCY", 2)?;
        let max_urls_per_query: usize = parse_or_default(&get, "MAX_URLS_PER_QUERY", 3)?;
        let max_retries: u32 = parse_or_default(&get, "MAX_RETRIES", 2)?;
        let retry_delay_base: f64 = parse_or_default(&get, "RETRY_DELAY_BASE", 1.0)?;
        let request_timeout: u64 = parse_or_default(&get, "REQUEST_TIMEOUT", 30)?;
        let api_port: u16 = parse_or_default(&get, "API_PORT", 5001)?;

        ensure(scrape_timeout > 0, "SCRAPE_TIMEOUT", scrape_timeout)?;
        ensure(scrape_concurrency > 0, "SCRAPE_CONCURRENCY", scrape_concurrency)?;
        ensure(
            (1..=MAX_URLS_LIMIT).contains(&max_urls_per_query),
            "MAX_URLS_PER_QUERY",
            max_urls_per_query,
        )?;
        ensure(max_retries > 0, "MAX_RETRIES", max_retries)?;
        // rejects negative, NaN and values too large for a Duration
        let retry_delay_base =
            Duration::try_from_secs_f64(retry_delay_base).map_err(|_| ConfigError::InvalidValue {
                key: "RETRY_DELAY_BASE",
                value: retry_delay_base.to_string(),
            })?;
        ensure(request_timeout > 0, "REQUEST_TIMEOUT", request_timeout)?;

        Ok(Settings {
            llm_provider,
            llm_api_key,
            default_model,
            google_api_key: get("GOOGLE_SEARCH_API_KEY"),
            google_engine_id: get("GOOGLE_SEARCH_ENGINE_ID"),
            headless: parse_bool(&get, "HEADLESS_MODE", true)?,
            scrape_backend,
            scrape_timeout: Duration::from_secs(scrape_timeout),
            scrape_concurrency,
            max_urls_per_query,
            max_retries,
            retry_delay_base,
            request_timeout: Duration::from_secs(request_timeout),
            answers_dir: PathBuf::from(get("ANSWERS_DIR").unwrap_or_else(|| "answers".into())),
            save_results: parse_bool(&get, "SAVE_RESULTS", true)?,
            log_dir: parse_bool(&get, "LOG_TO_FILE", true)?
                .then(|| PathBuf::from(get("LOG_DIR").unwrap_or_else(|| "logs".into()))),
            api_host: get("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            api_port,
        })
    }

    pub fn search_configured(&self) -> bool {
        self.google_api_key.is_some() && self.google_engine_id.is_some()
    }
}

fn parse_or_default<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}

fn ensure<T: ToString>(ok: bool, key: &'static str, value: T) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}
