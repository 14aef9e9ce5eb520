use crate::config::EngineConfig;
use crate::engine::cache::HotelInfoCache;
use crate::engine::reconcile::compose_candidate;
use crate::models::{Candidate, HotelId, HotelRecord, PricingStatus};
use crate::providers::CatalogService;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Provisional first page shown while pricing loads
#[derive(Debug, Clone, Default)]
pub struct FastPaint {
    /// Full candidate list in listing order, deduplicated
    pub candidates: Vec<Candidate>,
    /// First page of candidates, hydrated where the catalog answered
    pub first_page: Vec<HotelRecord>,
}

impl FastPaint {
    pub fn first_page_ids(&self) -> Vec<HotelId> {
        self.first_page.iter().map(|record| record.id.clone()).collect()
    }
}

/// Fetches region candidates so the first page is not blank while pricing loads
pub struct CatalogPrefetcher {
    catalog: Arc<dyn CatalogService>,
    cache: Arc<HotelInfoCache>,
    page_size: usize,
    candidate_limit: usize,
    call_timeout: Duration,
}

impl CatalogPrefetcher {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        cache: Arc<HotelInfoCache>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog,
            cache,
            page_size: config.page_size,
            candidate_limit: config.candidate_limit,
            call_timeout: config.call_timeout,
        }
    }

    /// Best effort: any failure yields no candidates and the run goes on pricing-only
    pub async fn fetch_candidates(&self, region_id: &str) -> Vec<Candidate> {
        let listed = tokio::time::timeout(
            self.call_timeout,
            self.catalog.list_candidates(region_id, self.candidate_limit),
        )
        .await;

        let candidates = match listed {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(err)) => {
                warn!("Candidate listing for region {} failed: {}", region_id, err);
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    "Candidate listing for region {} timed out after {:?}",
                    region_id, self.call_timeout
                );
                return Vec::new();
            }
        };

        let mut seen = HashSet::with_capacity(candidates.len());
        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !candidate.id.is_empty() && seen.insert(candidate.id.clone()))
            .collect();
        info!("Region {} has {} catalog candidates", region_id, candidates.len());
        candidates
    }

    /// Candidates plus the first page, hydrated through the cache and marked loading
    pub async fn prefetch(&self, region_id: &str) -> FastPaint {
        let candidates = self.fetch_candidates(region_id).await;
        if candidates.is_empty() {
            return FastPaint::default();
        }

        let leading: Vec<HotelId> = candidates
            .iter()
            .take(self.page_size)
            .map(|candidate| candidate.id.clone())
            .collect();
        let info = self.cache.fetch_info(&leading).await;

        let first_page = candidates
            .iter()
            .take(self.page_size)
            .map(|candidate| {
                compose_candidate(candidate, info.get(&candidate.id), PricingStatus::Loading)
            })
            .collect();

        FastPaint {
            candidates,
            first_page,
        }
    }
}
