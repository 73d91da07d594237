//! Page fetching
//!
//! [`PageFetcher`] is the seam between the pagination controller and the network: it
//! returns the raw body of one page or an error when the request could not be
//! completed. [`HttpFetcher`] is the production implementation over `reqwest`; tests
//! substitute scripted fetchers.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::types::SearchTarget;

/// Rows per page requested from the catalog
pub const PAGE_SIZE: u32 = 50;

/// One page request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest<'a> {
    /// Which endpoint to query
    pub target: SearchTarget,
    /// Search keywords, not yet URL-encoded
    pub keywords: &'a str,
    /// 1-based page number
    pub page: u32,
}

/// Source of raw page bodies
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the raw body of one page
    ///
    /// # Errors
    ///
    /// Returns an error only when the request could not be completed (connection
    /// refused, timeout, body not readable). Any body that arrives is returned as-is,
    /// whatever its HTTP status, because refusals are reported in the body.
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String>;
}

/// Build the search URL for a page
///
/// ```
/// use catalog_harvest::fetch::{PageRequest, page_url};
/// use catalog_harvest::types::SearchTarget;
///
/// let url = page_url(
///     "https://std.samr.gov.cn",
///     PageRequest { target: SearchTarget::Plans, keywords: "road vehicle", page: 3 },
/// );
/// assert_eq!(
///     url,
///     "https://std.samr.gov.cn/gb/search/gbProcessInfoPage?searchText=road%20vehicle&ics=&sortOrder=asc&pageSize=50&pageNumber=3"
/// );
/// ```
pub fn page_url(base_url: &str, request: PageRequest<'_>) -> String {
    let base = base_url.trim_end_matches('/');
    let keywords = urlencoding::encode(request.keywords);
    match request.target {
        SearchTarget::Standards => format!(
            "{base}/gb/search/gbQueryPage?searchText={keywords}&ics=&state=&ISSUE_DATE=&sortOrder=asc&pageSize={PAGE_SIZE}&pageNumber={}",
            request.page
        ),
        SearchTarget::Plans => format!(
            "{base}/gb/search/gbProcessInfoPage?searchText={keywords}&ics=&sortOrder=asc&pageSize={PAGE_SIZE}&pageNumber={}",
            request.page
        ),
    }
}

/// [`PageFetcher`] backed by a `reqwest` client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher from HTTP settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str());

        if config.danger_accept_invalid_certs {
            warn!(
                base_url = %config.base_url,
                "TLS certificate validation is DISABLED by configuration"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| Error::Config {
            message: format!("Failed to create HTTP client: {e}"),
            key: Some("http".to_string()),
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<String> {
        let url = page_url(&self.base_url, request);
        debug!(page = request.page, %url, "Requesting page");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(page = request.page, %status, "Non-success status, classifying body anyway");
        }

        Ok(response.text().await?)
    }
}
