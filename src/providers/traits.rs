use crate::error::ProviderError;
use crate::models::{Candidate, CatalogPayload, HotelId, PricedHotel, SearchParams};
use async_trait::async_trait;

/// Hotel catalog: names, images, amenities
/// Implementations decode whatever shape the service answers with; ids and
/// images are normalised by the cache on ingestion
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Provisional hotel list for a region. An empty list is a valid answer
    async fn list_candidates(
        &self,
        region_id: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError>;

    /// Catalog data for a batch of ids. Ids the service does not know are simply absent
    async fn lookup(&self, ids: &[HotelId]) -> Result<Vec<CatalogPayload>, ProviderError>;

    fn source_name(&self) -> &'static str;
}

/// Priced availability. Defines which hotels exist for a query and in what order
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Region or geo search, depending on `params.target`
    async fn search(&self, params: &SearchParams) -> Result<Vec<PricedHotel>, ProviderError>;

    fn source_name(&self) -> &'static str;
}
