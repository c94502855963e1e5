//! HTTP fetcher implementation
//!
//! This module handles every outbound request of a crawl:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Posting the search form for one page number
//! - Classifying transport failures and non-success responses
//!
//! There is no retry here. A failure is returned to the caller, which decides
//! whether it ends the crawl (page 1) or only that page (pages 2..N).

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult, TntError};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Immutable search parameters of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    keyword: String,
    category: u32,
}

impl CrawlRequest {
    /// Validates the search parameters
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlRequest)` - Both values present and the keyword non-blank
    /// * `Err(ConfigError::MissingKeyword)` - Keyword absent or blank
    /// * `Err(ConfigError::MissingCategory)` - Category absent
    pub fn new(keyword: Option<&str>, category: Option<u32>) -> ConfigResult<Self> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingKeyword)?;
        let category = category.ok_or(ConfigError::MissingCategory)?;

        Ok(Self {
            keyword: keyword.to_string(),
            category,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn category(&self) -> u32 {
        self.category
    }

    /// Form fields posted for `page`
    pub fn form_fields(&self, page: u32) -> [(&'static str, String); 3] {
        [
            ("srcrel", self.keyword.clone()),
            ("cat", self.category.to_string()),
            ("page", page.to_string()),
        ]
    }
}

/// Something that can produce the raw text of a listing page
///
/// [`HttpFetcher`] is the production implementation. Dropping the returned
/// future must abandon the underlying request.
pub trait PageSource: Send + Sync + 'static {
    /// Fetches page `page` (1-based) of the listing described by `request`
    fn fetch_page(
        &self,
        request: &CrawlRequest,
        page: u32,
    ) -> impl Future<Output = Result<String, TntError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `crawler` - Timeouts come from here
/// * `user_agent` - The user agent configuration
pub fn build_http_client(
    crawler: &CrawlerConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Posts the search form to the configured endpoint
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    endpoint: Url,
}

impl HttpFetcher {
    /// Creates a fetcher for the endpoint in `crawler`
    pub fn new(crawler: &CrawlerConfig, user_agent: &UserAgentConfig) -> Result<Self, TntError> {
        let endpoint = Url::parse(&crawler.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid endpoint '{}': {}", crawler.endpoint, e))
        })?;
        let client = build_http_client(crawler, user_agent).map_err(TntError::ClientBuild)?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl PageSource for HttpFetcher {
    async fn fetch_page(&self, request: &CrawlRequest, page: u32) -> Result<String, TntError> {
        tracing::debug!(page, endpoint = %self.endpoint, "Downloading page");

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&request.form_fields(page))
            .send()
            .await
            .map_err(|source| TntError::Http { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TntError::HttpStatus {
                page,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| TntError::Http { page, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_request_requires_keyword() {
        assert!(matches!(
            CrawlRequest::new(None, Some(0)),
            Err(ConfigError::MissingKeyword)
        ));
        assert!(matches!(
            CrawlRequest::new(Some("   "), Some(0)),
            Err(ConfigError::MissingKeyword)
        ));
    }

    #[test]
    fn test_request_requires_category() {
        assert!(matches!(
            CrawlRequest::new(Some("ciao"), None),
            Err(ConfigError::MissingCategory)
        ));
    }

    #[test]
    fn test_form_fields() {
        let request = CrawlRequest::new(Some(" ciao "), Some(4)).unwrap();
        assert_eq!(request.keyword(), "ciao");
        assert_eq!(
            request.form_fields(3),
            [
                ("srcrel", "ciao".to_string()),
                ("cat", "4".to_string()),
                ("page", "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_http_client() {
        let config = Config::default();
        assert!(build_http_client(&config.crawler, &config.user_agent).is_ok());
    }

    #[test]
    fn test_fetcher_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.crawler.endpoint = "::not a url::".to_string();
        let result = HttpFetcher::new(&config.crawler, &config.user_agent);
        assert!(matches!(
            result,
            Err(TntError::Config(ConfigError::InvalidUrl(_)))
        ));
    }

    // Request/response behavior is covered against a mock server in the
    // integration tests
}
