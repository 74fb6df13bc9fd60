//! Page fetching collaborator
//!
//! The frontier only needs "give me the HTML for this URL within this
//! timeout". That contract is the [`PageFetcher`] trait; [`FetchBackend`]
//! enumerates the concrete backends shipped with the crate.

use crate::config::CrawlConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Page body
    pub html: String,
    /// HTTP status code (always 2xx)
    pub status_code: u16,
    /// Final URL after redirects; links are resolved against it
    pub final_url: String,
}

/// Retrieves page content for the frontier
///
/// Implementations must honor `timeout` and keep transport failures,
/// timeouts and non-2xx statuses distinguishable through [`FetchError`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// Fetch backends available to the CLI
pub enum FetchBackend {
    Http(HttpFetcher),
}

#[async_trait]
impl PageFetcher for FetchBackend {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        match self {
            Self::Http(fetcher) => fetcher.fetch(url, timeout).await,
        }
    }
}

/// Plain HTTP fetcher backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher sending the configured user agent
    ///
    /// # Example
    ///
    /// ```no_run
    /// use crawl_frontier::config::CrawlConfig;
    /// use crawl_frontier::crawler::HttpFetcher;
    ///
    /// let fetcher = HttpFetcher::new(&CrawlConfig::default()).unwrap();
    /// ```
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Network(e.to_string())
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(classify)?;

        Ok(FetchedPage {
            html,
            status_code: status.as_u16(),
            final_url,
        })
    }
}
