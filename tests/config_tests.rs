use std::collections::HashMap;
use std::time::Duration;

use webintel::config::{LlmProvider, ScrapeBackend, Settings};
use webintel::error::ConfigError;

fn load(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|k| map.get(k).cloned())
}

#[test]
fn test_defaults_with_groq_key() {
    let settings = load(&[("GROQ_API_KEY", "gsk")]).unwrap();
    assert_eq!(settings.llm_provider, LlmProvider::Groq);
    assert_eq!(settings.llm_api_key, "gsk");
    assert_eq!(settings.default_model, "groq/compound-mini");
    assert!(settings.headless);
    assert_eq!(settings.scrape_backend, ScrapeBackend::Browser);
    assert_eq!(settings.scrape_timeout, Duration::from_secs(30));
    assert_eq!(settings.scrape_concurrency, 2);
    assert_eq!(settings.max_urls_per_query, 3);
    assert_eq!(settings.max_retries, 2);
    assert_eq!(settings.retry_delay_base, Duration::from_secs(1));
    assert_eq!(settings.api_host, "127.0.0.1");
    assert_eq!(settings.api_port, 5001);
    assert!(settings.save_results);
    assert_eq!(settings.answers_dir.to_str(), Some("answers"));
    assert_eq!(settings.log_dir.as_deref().and_then(|d| d.to_str()), Some("logs"));
    assert!(!settings.search_configured());
}

#[test]
fn test_openrouter_without_key_fails_fast() {
    let err = load(&[("LLM_PROVIDER", "openrouter"), ("GROQ_API_KEY", "gsk")]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::MissingKey {
            key: "OPENROUTER_API_KEY",
            provider: "openrouter".to_string(),
        }
    );
    assert!(err.to_string().contains("OPENROUTER_API_KEY"));
}

#[test]
fn test_groq_without_key_fails_fast() {
    let err = load(&[]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { key: "GROQ_API_KEY", .. }));
}

#[test]
fn test_blank_key_counts_as_missing() {
    let err = load(&[("GROQ_API_KEY", "   ")]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { .. }));
}

#[test]
fn test_openrouter_selects_its_model() {
    let settings = load(&[
        ("LLM_PROVIDER", "OpenRouter"),
        ("OPENROUTER_API_KEY", "sk-or"),
        ("DEFAULT_OPENROUTER_MODEL", "meta-llama/llama-3.2-3b-instruct:free"),
    ])
    .unwrap();
    assert_eq!(settings.llm_provider, LlmProvider::OpenRouter);
    assert_eq!(settings.llm_api_key, "sk-or");
    assert_eq!(settings.default_model, "meta-llama/llama-3.2-3b-instruct:free");
}

#[test]
fn test_unknown_provider_is_rejected() {
    let err = load(&[("LLM_PROVIDER", "openai"), ("GROQ_API_KEY", "gsk")]).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidValue {
            key: "LLM_PROVIDER",
            value: "openai".to_string(),
        }
    );
}

#[test]
fn test_overrides() {
    let settings = load(&[
        ("GROQ_API_KEY", "gsk"),
        ("GOOGLE_SEARCH_API_KEY", "g"),
        ("GOOGLE_SEARCH_ENGINE_ID", "cx"),
        ("HEADLESS_MODE", "False"),
        ("SCRAPE_BACKEND", "http"),
        ("SCRAPE_TIMEOUT", "5"),
        ("SCRAPE_CONCURRENCY", "4"),
        ("MAX_URLS_PER_QUERY", "10"),
        ("RETRY_DELAY_BASE", "0.5"),
        ("ANSWERS_DIR", "/tmp/answers"),
        ("SAVE_RESULTS", "0"),
        ("API_PORT", "8080"),
        ("LOG_DIR", "/var/log/webintel"),
    ])
    .unwrap();
    assert!(settings.search_configured());
    assert!(!settings.headless);
    assert_eq!(settings.scrape_backend, ScrapeBackend::Http);
    assert_eq!(settings.scrape_timeout, Duration::from_secs(5));
    assert_eq!(settings.scrape_concurrency, 4);
    assert_eq!(settings.max_urls_per_query, 10);
    assert_eq!(settings.retry_delay_base, Duration::from_millis(500));
    assert_eq!(settings.answers_dir.to_str(), Some("/tmp/answers"));
    assert!(!settings.save_results);
    assert_eq!(settings.api_port, 8080);
    assert_eq!(settings.log_dir.as_deref().and_then(|d| d.to_str()), Some("/var/log/webintel"));
}

#[test]
fn test_file_logging_can_be_disabled() {
    let settings = load(&[("GROQ_API_KEY", "gsk"), ("LOG_TO_FILE", "false"), ("LOG_DIR", "/tmp/x")]).unwrap();
    assert!(settings.log_dir.is_none());
}

#[test]
fn test_invalid_numbers_and_bools() {
    let cases = [
        ("SCRAPE_TIMEOUT", "soon"),
        ("SCRAPE_TIMEOUT", "0"),
        ("MAX_URLS_PER_QUERY", "11"),
        ("MAX_URLS_PER_QUERY", "0"),
        ("SCRAPE_CONCURRENCY", "-1"),
        ("HEADLESS_MODE", "maybe"),
        ("SCRAPE_BACKEND", "selenium"),
        ("API_PORT", "70000"),
        ("RETRY_DELAY_BASE", "-1"),
        ("RETRY_DELAY_BASE", "1e30"),
        ("RETRY_DELAY_BASE", "inf"),
        ("LOG_TO_FILE", "sometimes"),
    ];
    for (key, value) in cases {
        let err = load(&[("GROQ_API_KEY", "gsk"), (key, value)]).unwrap_err();
        assert!(
            matches!(&err, ConfigError::InvalidValue { key: k, .. } if *k == key),
            "{key}={value} gave {err:?}"
        );
    }
}
