//! HTTP client for the CMR collections search endpoint.

use super::error::CmrError;
use super::types::{CmrSearchResponse, DatasetSummary};
use crate::config::CmrConfig;
use std::time::Duration;
use url::Url;

/// Stateless CMR search client
///
/// Each call issues exactly one GET; there is no retry and no caching.
#[derive(Debug, Clone)]
pub struct CmrClient {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
    timeout: Duration,
}

impl CmrClient {
    /// Build a client from configuration
    pub fn new(config: &CmrConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
            timeout: config.timeout(),
        })
    }

    /// Build the search URL for a keyword
    ///
    /// The keyword is trimmed and only sent when non-empty; `page_size` is
    /// always sent. Spaces are form-encoded as `+`.
    pub fn search_url(&self, keyword: &str) -> Result<Url, CmrError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| CmrError::InvalidUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            let keyword = keyword.trim();
            if !keyword.is_empty() {
                query.append_pair("keyword", keyword);
            }
            query.append_pair("page_size", &self.page_size.to_string());
        }
        Ok(url)
    }

    /// Search collections by keyword, in CMR relevance order
    pub async fn search(&self, keyword: &str) -> Result<Vec<DatasetSummary>, CmrError> {
        let url = self.search_url(keyword)?;
        tracing::debug!("CMR request: {}", url);

        let timeout_secs = self.timeout.as_secs();
        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!("Error searching CMR collections: {}", e);
            CmrError::from_request_error(e, timeout_secs)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error searching CMR collections: HTTP {}", status);
            tracing::error!("Response data: {}", body);
            return Err(CmrError::Status { status, body });
        }

        let body: CmrSearchResponse = response.json().await.map_err(|e| {
            tracing::error!("Error decoding CMR response: {}", e);
            CmrError::from_request_error(e, timeout_secs)
        })?;

        let summaries: Vec<DatasetSummary> = body
            .into_entries()
            .into_iter()
            .take(self.page_size)
            .map(DatasetSummary::from)
            .collect();

        tracing::info!(
            keyword = keyword.trim(),
            results = summaries.len(),
            "CMR search complete"
        );
        Ok(summaries)
    }

    /// The `get_collections` tool operation: search and JSON-encode the result
    pub async fn get_collections(&self, keyword: Option<&str>) -> Result<String, CmrError> {
        let summaries = self.search(keyword.unwrap_or_default()).await?;
        serde_json::to_string(&summaries).map_err(|e| CmrError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CmrClient {
        CmrClient::new(&CmrConfig::default()).unwrap()
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let url = client().search_url("sea surface temperature").unwrap();
        assert_eq!(
            url.query(),
            Some("keyword=sea+surface+temperature&page_size=5")
        );
        assert_eq!(url.path(), "/search/collections.json");
    }

    #[test]
    fn test_search_url_trims_keyword() {
        let url = client().search_url("  MODIS \t").unwrap();
        assert_eq!(url.query(), Some("keyword=MODIS&page_size=5"));
    }

    #[test]
    fn test_search_url_omits_blank_keyword() {
        assert_eq!(
            client().search_url("").unwrap().query(),
            Some("page_size=5")
        );
        assert_eq!(
            client().search_url("   ").unwrap().query(),
            Some("page_size=5")
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = CmrConfig {
            base_url: "not a url".to_string(),
            ..CmrConfig::default()
        };
        let client = CmrClient::new(&config).unwrap();
        assert!(matches!(
            client.search_url("x"),
            Err(CmrError::InvalidUrl(_))
        ));
    }
}
