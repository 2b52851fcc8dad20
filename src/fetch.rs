//! Fetch capability consumed by the live ingestor.
//!
//! The ingest loop talks to the outside world only through [`Fetcher`], so
//! tests (and embedders with their own HTTP stacks) can swap the transport
//! without touching ingest logic. [`HttpFetcher`] is the stock implementation.

use std::time::Duration;

use reqwest::Client;

use crate::error::{Result, TickerError};

/// One-shot download of a timing document.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Fetch the raw bytes at `url`, giving up after `timeout`.
    ///
    /// Implementations map every failure mode (unreachable host, non-success
    /// status, deadline overrun) into the matching [`TickerError`] variant so
    /// the ingest loop can record and classify it.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// HTTP fetcher backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .no_proxy()
            .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TickerError::fetch_failed_with_source(
                    "<client construction>",
                    "failed to build HTTP client",
                    Box::new(e),
                )
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TickerError::http_status(url, status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| classify(url, timeout, e))?;
        Ok(bytes.to_vec())
    }
}

fn classify(url: &str, timeout: Duration, error: reqwest::Error) -> TickerError {
    if error.is_timeout() {
        TickerError::timeout(url, timeout)
    } else if error.is_connect() {
        TickerError::fetch_failed_with_source(url, "connection failed", Box::new(error))
    } else {
        TickerError::fetch_failed_with_source(url, "transport error", Box::new(error))
    }
}
