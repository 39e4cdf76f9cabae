//! Directory service client

use crate::projection::{parse_catalog, parse_compute_endpoint};
use vre_core::{CatalogParse, HubConfig, VreError, VreResult};

/// Fetches catalog and service-endpoint documents with a context token
#[derive(Debug, Clone)]
pub struct ResourceCatalogClient {
    http: reqwest::Client,
    compute_discovery: bool,
}

impl ResourceCatalogClient {
    /// Client honouring the compute-endpoint discovery toggle of `config`
    pub fn new(config: &HubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            compute_discovery: config.discover_compute_endpoint,
        }
    }

    /// Replace the underlying HTTP client
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Fetch and parse the catalog at `url`.
    ///
    /// Transport failures and non-success statuses are
    /// [`VreError::CatalogUnavailable`]; a document that cannot be projected
    /// is an empty catalog.
    pub async fn fetch_catalog(&self, url: &str, context_token: &str) -> VreResult<CatalogParse> {
        let body = self
            .get_text(url, context_token)
            .await
            .map_err(VreError::catalog_unavailable)?;
        Ok(parse_catalog(&body))
    }

    /// Look up the compute endpoint at `url`.
    ///
    /// Best effort: returns `None` when discovery is disabled, the request
    /// fails, or the document names no endpoint.
    pub async fn discover_compute_endpoint(&self, url: &str, context_token: &str) -> Option<String> {
        if !self.compute_discovery {
            tracing::debug!("compute endpoint discovery disabled");
            return None;
        }
        match self.get_text(url, context_token).await {
            Ok(body) => {
                let endpoint = parse_compute_endpoint(&body);
                if endpoint.is_none() {
                    tracing::debug!(url, "no compute endpoint advertised");
                }
                endpoint
            }
            Err(reason) => {
                tracing::warn!(%reason, "compute endpoint lookup failed");
                None
            }
        }
    }

    async fn get_text(&self, url: &str, token: &str) -> Result<String, String> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("failed to reach {url}: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("{url} answered {}", response.status()));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read {url}: {e}"))
    }
}
