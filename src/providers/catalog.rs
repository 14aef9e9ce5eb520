use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::models::{Candidate, CatalogPayload, HotelId};
use crate::providers::traits::CatalogService;
use crate::providers::types::{parse_candidates, parse_catalog_info, CandidateRequest, InfoRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the hotel catalog service
pub struct CatalogClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("hotel-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.catalog_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout))?;
        read_json(response, self.timeout).await
    }
}

/// Non-2xx is an error; a 2xx body that is not JSON counts as an empty answer
pub(crate) async fn read_json(response: Response, timeout: Duration) -> Result<Value, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Service returned status: {}", status);
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;
    debug!("Downloaded {} bytes", text.len());

    Ok(serde_json::from_str(&text).unwrap_or_else(|err| {
        warn!("Response body is not JSON ({}), treating as empty", err);
        Value::Null
    }))
}

#[async_trait]
impl CatalogService for CatalogClient {
    async fn list_candidates(
        &self,
        region_id: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        debug!("Listing catalog candidates for region {}", region_id);
        let body = self
            .send(self.post("/hotels/region").json(&CandidateRequest { region_id, limit }))
            .await?;
        let mut candidates = parse_candidates(body);
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn lookup(&self, ids: &[HotelId]) -> Result<Vec<CatalogPayload>, ProviderError> {
        debug!("Looking up catalog info for {} hotels", ids.len());
        let body = self
            .send(self.post("/hotels/info").json(&InfoRequest { hotel_ids: ids }))
            .await?;
        Ok(parse_catalog_info(body))
    }

    fn source_name(&self) -> &'static str {
        "catalog"
    }
}
