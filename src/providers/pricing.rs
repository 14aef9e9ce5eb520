use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::{PricedHotel, SearchParams, SearchTarget};
use crate::providers::catalog::read_json;
use crate::providers::traits::PricingService;
use crate::providers::types::{parse_pricing, PricingRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the pricing service, region and geo searches
pub struct PricingClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl PricingClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("hotel-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.pricing_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl PricingService for PricingClient {
    async fn search(&self, params: &SearchParams) -> Result<Vec<PricedHotel>, ProviderError> {
        let path = match params.target {
            SearchTarget::Region { .. } => "/search/region",
            SearchTarget::Geo { .. } => "/search/geo",
        };
        debug!("Fetching pricing from {} in {}", path, params.currency);

        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&PricingRequest::from(params));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;
        let body = read_json(response, self.timeout).await?;
        Ok(parse_pricing(body))
    }

    fn source_name(&self) -> &'static str {
        "pricing"
    }
}
