//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent
//! - Pacing every request through the shared politeness delay
//! - Retrying timeouts, connection failures and transient statuses

use super::pacer::Pacer;
use crate::config::CrawlerConfig;
use crate::TidemarkError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Statuses worth another attempt: server hiccups, timeouts and rate limits
const RETRY_STATUS_CODES: &[u16] = &[500, 502, 503, 504, 408, 429];

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the failure was a timeout or a failed connect
        retryable: bool,
    },
}

impl FetchResult {
    /// Short description of a failed fetch for log lines
    pub fn describe_failure(&self) -> String {
        match self {
            FetchResult::Success { .. } => "ok".to_string(),
            FetchResult::HttpError { status_code } => format!("HTTP {}", status_code),
            FetchResult::NetworkError { error, .. } => error.clone(),
        }
    }

    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchResult::Success { .. } => false,
            FetchResult::HttpError { status_code } => RETRY_STATUS_CODES.contains(status_code),
            FetchResult::NetworkError { retryable, .. } => *retryable,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header value
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Paced HTTP client shared by everything that touches the network
pub struct Fetcher {
    client: Client,
    pacer: Pacer,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let pacer = Pacer::new(Duration::from_millis(config.request_delay_ms));
        tracing::debug!(
            "Fetcher: {:?} between requests, up to {} retries",
            pacer.delay(),
            config.max_retries
        );

        Ok(Self {
            client: build_http_client(&config.user_agent)?,
            pacer,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// Every attempt waits for the politeness delay; retries additionally
    /// wait `retry_delay`. The last failure is returned once the retries run
    /// out, and permanent failures (404, malformed URLs) are returned at once.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut attempt = 0;
        loop {
            let result = self.fetch_once(url).await;
            if !result.is_transient() || attempt >= self.max_retries {
                if attempt > 0 && result.is_transient() {
                    tracing::warn!(
                        "Giving up on {} after {} attempts: {}",
                        url,
                        attempt + 1,
                        result.describe_failure()
                    );
                }
                return result;
            }

            attempt += 1;
            tracing::info!(
                "Retrying {} ({}/{}) after {}",
                url,
                attempt,
                self.max_retries,
                result.describe_failure()
            );
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }

    /// Fetches a URL with a single attempt, after the politeness delay
    pub async fn fetch_once(&self, url: &str) -> FetchResult {
        self.pacer.wait().await;
        tracing::debug!("GET {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return network_error(e),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("Rate limited by {}", url);
        }

        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(body) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                body,
            },
            Err(e) => network_error(e),
        }
    }

    /// Fetches a URL and returns the body, turning failures into errors
    pub async fn fetch_html(&self, url: &str) -> Result<String, TidemarkError> {
        match self.fetch(url).await {
            FetchResult::Success { body, .. } => Ok(body),
            FetchResult::HttpError { status_code } => Err(TidemarkError::HttpStatus {
                url: url.to_string(),
                status: status_code,
            }),
            FetchResult::NetworkError { error, .. } => Err(TidemarkError::Extract {
                url: url.to_string(),
                message: error,
            }),
        }
    }
}

fn network_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            retryable: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "Connection refused".to_string(),
            retryable: true,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            retryable: false,
        }
    }
}
