//! Single-article text lookups against a language-specific encyclopedia.

use std::io::Read;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::state::NotKeyed;
use governor::{Quota, RateLimiter};
use log::info;
use serde_json::Value;

use crate::config::WikipediaConfig;

const RETRY_REASON_TIMEOUT_PREFIX: &str = "timeout:";
const RETRY_REASON_HARD_PREFIX: &str = "hard:";
const RETRY_REASON_RATE_LIMIT_PREFIX: &str = "rate_limit:";
const LIMITER_POLL_INTERVAL: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_secs(4);
const BASE_BACKOFF: Duration = Duration::from_millis(400);

/// Fetches the raw markup of one article title.
pub trait ArticleSource {
    /// `Ok(None)` means the page does not exist; `Err` carries a transient
    /// failure reason (network, status, malformed payload).
    fn fetch_article(&mut self, title: &str, language: &str) -> Result<Option<String>, String>;
}

impl<S: ArticleSource + ?Sized> ArticleSource for &mut S {
    fn fetch_article(&mut self, title: &str, language: &str) -> Result<Option<String>, String> {
        (**self).fetch_article(title, language)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HttpFailureKind {
    Timeout,
    RateLimited,
    Hard,
}

/// Blocking MediaWiki action-API client with request pacing and timeout retries.
pub struct WikipediaClient {
    http_client: ureq::Agent,
    limiter: Option<
        RateLimiter<NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>,
    >,
    request_timeout: Duration,
    timeout_retry_attempts: u32,
    user_agent: String,
}

impl WikipediaClient {
    pub fn new(config: &WikipediaConfig) -> Self {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(request_timeout)
            .timeout_write(request_timeout)
            .build();
        let limiter = Quota::with_period(Duration::from_millis(config.request_interval_ms))
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self {
            http_client,
            limiter,
            request_timeout,
            timeout_retry_attempts: config.timeout_retry_attempts.max(1),
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn api_url(language: &str, title: &str) -> String {
        format!(
            "https://{}.wikipedia.org/w/api.php?action=query&titles={}&prop=revisions&\
             rvprop=content&rvslots=main&format=json",
            language,
            urlencoding::encode(title)
        )
    }

    fn build_timeout_reason(message: impl Into<String>) -> String {
        format!("{RETRY_REASON_TIMEOUT_PREFIX}{}", message.into())
    }

    fn build_hard_reason(message: impl Into<String>) -> String {
        format!("{RETRY_REASON_HARD_PREFIX}{}", message.into())
    }

    fn build_rate_limit_reason(message: impl Into<String>) -> String {
        format!("{RETRY_REASON_RATE_LIMIT_PREFIX}{}", message.into())
    }

    /// Backoff before retry `attempt` of a failed request, or `None` when the
    /// failure is not worth retrying. Throttled requests wait twice as long.
    fn retry_delay(reason: &str, attempt: u32) -> Option<Duration> {
        if reason.starts_with(RETRY_REASON_TIMEOUT_PREFIX) {
            Some(Self::timeout_backoff_delay(attempt))
        } else if reason.starts_with(RETRY_REASON_RATE_LIMIT_PREFIX) {
            Some(Self::timeout_backoff_delay(attempt.saturating_add(1)))
        } else {
            None
        }
    }

    fn classify_ureq_failure(error: &ureq::Error) -> HttpFailureKind {
        match error {
            ureq::Error::Status(code, _) => match code {
                429 => HttpFailureKind::RateLimited,
                408 | 500 | 502 | 503 | 504 => HttpFailureKind::Timeout,
                _ => HttpFailureKind::Hard,
            },
            ureq::Error::Transport(transport) => {
                let lowered = transport.to_string().to_ascii_lowercase();
                if lowered.contains("timed out") || lowered.contains("timeout") {
                    HttpFailureKind::Timeout
                } else {
                    HttpFailureKind::Hard
                }
            }
        }
    }

    fn classify_io_timeout(error: &std::io::Error) -> bool {
        matches!(
            error.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        ) || error.to_string().to_ascii_lowercase().contains("timed out")
    }

    fn timeout_backoff_delay(attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        let multiplier = 1u32 << exponent;
        BASE_BACKOFF
            .checked_mul(multiplier)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    fn wait_for_request_slot(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        while limiter.check().is_err() {
            std::thread::sleep(LIMITER_POLL_INTERVAL);
        }
    }

    fn http_get_json_once(&self, url: &str) -> Result<Value, String> {
        self.wait_for_request_slot();
        let response = self
            .http_client
            .get(url)
            .set("User-Agent", &self.user_agent)
            .set("Accept", "application/json")
            .timeout(self.request_timeout)
            .call()
            .map_err(|error| {
                let message = format!("Request failed: {error}");
                match Self::classify_ureq_failure(&error) {
                    HttpFailureKind::Timeout => Self::build_timeout_reason(message),
                    HttpFailureKind::RateLimited => Self::build_rate_limit_reason(message),
                    HttpFailureKind::Hard => Self::build_hard_reason(message),
                }
            })?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| {
                if Self::classify_io_timeout(&error) {
                    Self::build_timeout_reason(format!("Failed to read response: {error}"))
                } else {
                    Self::build_hard_reason(format!("Failed to read response: {error}"))
                }
            })?;
        serde_json::from_str(&body)
            .map_err(|error| Self::build_hard_reason(format!("Invalid JSON response: {error}")))
    }

    fn http_get_json(&self, url: &str, label: &str) -> Result<Value, String> {
        let mut attempt = 1u32;
        loop {
            let reason = match self.http_get_json_once(url) {
                Ok(value) => return Ok(value),
                Err(reason) => reason,
            };
            let delay = match Self::retry_delay(&reason, attempt) {
                Some(delay) if attempt < self.timeout_retry_attempts => delay,
                _ => return Err(reason),
            };
            info!(
                "{} attempt {} failed ({}), retrying in {:?}",
                label, attempt, reason, delay
            );
            std::thread::sleep(delay);
            attempt = attempt.saturating_add(1);
        }
    }
}

/// Extracts the first page's revision markup from an action-API `query` payload.
///
/// A page flagged `missing`/`invalid`, or one without `revisions`, is `Ok(None)`.
pub fn parse_revision_content(payload: &Value) -> Result<Option<String>, String> {
    let pages = payload["query"]["pages"]
        .as_object()
        .ok_or_else(|| "response missing query.pages".to_string())?;
    let Some(page) = pages.values().next() else {
        return Ok(None);
    };
    if page.get("missing").is_some() || page.get("invalid").is_some() {
        return Ok(None);
    }
    let Some(revision) = page["revisions"].as_array().and_then(|revs| revs.first()) else {
        return Ok(None);
    };
    let content = revision["*"]
        .as_str()
        .or_else(|| revision["slots"]["main"]["*"].as_str())
        .or_else(|| revision["slots"]["main"]["content"].as_str())
        .ok_or_else(|| "revision has no content".to_string())?;
    Ok(Some(content.to_string()))
}

impl ArticleSource for WikipediaClient {
    fn fetch_article(&mut self, title: &str, language: &str) -> Result<Option<String>, String> {
        let url = Self::api_url(language, title);
        let payload = self.http_get_json(&url, &format!("Wikipedia[{language}] '{title}'"))?;
        parse_revision_content(&payload).map_err(Self::build_hard_reason)
    }
}
