use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// `base * 2^attempt`, saturating instead of overflowing.
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Seconds asked for by a `Retry-After` header, clamped to `cap`.
///
/// Fractional values are accepted; negative or unparseable ones (including
/// HTTP dates) yield `None` so the caller falls back to its own backoff.
pub fn retry_after(headers: &HeaderMap, cap: Duration) -> Option<Duration> {
    let secs = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| *s >= 0.0)?;
    let wait = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
    Some(wait.min(cap))
}

/// What to sleep before the next attempt after a 429.
pub fn rate_limit_wait(headers: &HeaderMap, base: Duration, attempt: u32, cap: Duration) -> Duration {
    retry_after(headers, cap).unwrap_or_else(|| backoff(base, attempt).min(cap))
}
