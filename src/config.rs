//! Engine tuning and provider endpoints

use std::time::Duration;
use thiserror::Error;

/// Tuning for the search engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Results per page, also the size of the fast-painted first page
    pub page_size: usize,
    /// Maximum ids per catalog info request
    pub info_batch_size: usize,
    /// Ids handed to the cache per background hydration step
    pub hydration_batch_size: usize,
    /// How many candidates to ask the catalog listing for
    pub candidate_limit: usize,
    /// Coarse deadline applied to every collaborator call
    pub call_timeout: Duration,
    /// Replacement for the `{size}` placeholder in image URLs
    pub image_size: String,
    pub max_images: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            info_batch_size: 500,
            hydration_batch_size: 500,
            candidate_limit: 500,
            call_timeout: Duration::from_secs(30),
            image_size: "640x400".to_string(),
            max_images: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where the catalog and pricing services live
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub catalog_url: String,
    pub pricing_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub const CATALOG_URL_VAR: &'static str = "HOTEL_SCOUT_CATALOG_URL";
    pub const PRICING_URL_VAR: &'static str = "HOTEL_SCOUT_PRICING_URL";
    pub const API_KEY_VAR: &'static str = "HOTEL_SCOUT_API_KEY";
    pub const TIMEOUT_VAR: &'static str = "HOTEL_SCOUT_TIMEOUT_SECS";

    pub fn new(catalog_url: impl Into<String>, pricing_url: impl Into<String>) -> Self {
        Self {
            catalog_url: trim_base(catalog_url.into()),
            pricing_url: trim_base(pricing_url.into()),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Read endpoints from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let catalog_url =
            lookup(Self::CATALOG_URL_VAR).ok_or(ConfigError::Missing(Self::CATALOG_URL_VAR))?;
        let pricing_url =
            lookup(Self::PRICING_URL_VAR).ok_or(ConfigError::Missing(Self::PRICING_URL_VAR))?;

        let mut config = Self::new(catalog_url, pricing_url);
        config.api_key = lookup(Self::API_KEY_VAR).filter(|key| !key.is_empty());

        if let Some(raw) = lookup(Self::TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: Self::TIMEOUT_VAR,
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
