//! HTTP client with rate limiting and retry for racingaustralia.horse

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::RateLimiter;
use crate::config::CrawlerConfig;
use crate::retry::{retry_if, RetryConfig};

/// Scraper errors
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl ScraperError {
    /// Timeouts, throttling, server errors and transport failures are worth
    /// another attempt; other client errors are permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScraperError::RequestFailed(e) => !e.is_builder() && !e.is_redirect(),
            ScraperError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
        }
    }
}

/// Anything that can turn a URL into page HTML.
pub trait PageSource {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, ScraperError>>;
}

/// Page fetcher over HTTP with a shared token bucket and bounded retries
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::from_config(config),
            retry: RetryConfig::from_crawler(config),
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, ScraperError> {
        self.limiter.acquire().await;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ScraperError> {
        let name = format!("GET {}", url);
        retry_if(&self.retry, &name, || self.fetch_once(url), ScraperError::is_retryable).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ScraperError {
        ScraperError::Status {
            url: "https://racingaustralia.horse/".to_string(),
            status: code,
        }
    }

    #[test]
    fn test_status_retryability() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(status(408).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
    }

    #[test]
    fn test_fetcher_builds_from_defaults() {
        assert!(HttpFetcher::new(&CrawlerConfig::default()).is_ok());
    }
}
