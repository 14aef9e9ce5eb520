//! Merging of priced availability with catalog candidates
//!
//! Pricing decides which hotels exist and in which order. The catalog cache
//! and the candidate list only enrich records, in that priority.

use crate::config::EngineConfig;
use crate::engine::cache::HotelInfoCache;
use crate::error::ProviderError;
use crate::models::{
    Candidate, CatalogPayload, HotelId, HotelRecord, PricedHotel, PricingStatus, SearchParams,
};
use crate::providers::PricingService;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of reconciling one pricing response
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Pricing-defined result set, deduplicated, in pricing order
    pub canonical: Vec<HotelRecord>,
    /// The fast-painted ids, now priced or sold out
    pub first_page: Vec<HotelRecord>,
    /// Priced sources by id, kept for re-composition on hydration
    pub priced: HashMap<HotelId, PricedHotel>,
    /// Highest first-rate price in the canonical set
    pub max_price: Option<f64>,
    /// Canonical ids, then sold-out first-page ids, without catalog data yet
    pub unhydrated: Vec<HotelId>,
}

fn first_text<'a>(sources: impl IntoIterator<Item = Option<&'a String>>) -> String {
    sources
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}

fn apply_catalog(record: &mut HotelRecord, catalog: &CatalogPayload) {
    record.address = catalog.address.clone().unwrap_or_default();
    record.images = catalog.images.clone();
    record.amenities = catalog.amenities.clone();
    record.description = catalog.description.clone().unwrap_or_default();
    record.check_in_time = catalog.check_in_time.clone();
    record.check_out_time = catalog.check_out_time.clone();
    for flag in &catalog.serp_filters {
        if !record.serp_filters.contains(flag) {
            record.serp_filters.push(flag.clone());
        }
    }
}

/// Overlay pricing fields, then catalog fields, then candidate fields
pub fn compose_priced(
    priced: &PricedHotel,
    catalog: Option<&CatalogPayload>,
    candidate: Option<&Candidate>,
) -> HotelRecord {
    let mut record = HotelRecord::placeholder(priced.id.clone(), PricingStatus::Loading);
    record.name = first_text([
        priced.name.as_ref(),
        catalog.and_then(|c| c.name.as_ref()),
        candidate.and_then(|c| c.name.as_ref()),
    ]);
    record.star_rating = priced
        .star_rating
        .or_else(|| catalog.and_then(|c| c.star_rating))
        .or_else(|| candidate.and_then(|c| c.star_rating))
        .unwrap_or(0);
    record.serp_filters = priced.serp_filters.clone();
    if let Some(catalog) = catalog {
        apply_catalog(&mut record, catalog);
    }
    record.set_rates(priced.rates.clone());
    record
}

/// Record for a candidate that pricing has not (or not yet) covered
pub fn compose_candidate(
    candidate: &Candidate,
    catalog: Option<&CatalogPayload>,
    status: PricingStatus,
) -> HotelRecord {
    let mut record = HotelRecord::placeholder(candidate.id.clone(), status);
    record.name = first_text([
        catalog.and_then(|c| c.name.as_ref()),
        candidate.name.as_ref(),
    ]);
    record.star_rating = catalog
        .and_then(|c| c.star_rating)
        .or(candidate.star_rating)
        .unwrap_or(0);
    if let Some(catalog) = catalog {
        apply_catalog(&mut record, catalog);
    }
    record
}

/// Build the canonical set from a pricing response and re-derive the first page
///
/// `first_page_ids` are the fast-painted candidates in display order. Each is
/// replaced by its priced record, or shown sold out when pricing omitted it.
pub fn reconcile(
    priced: Vec<PricedHotel>,
    candidates: &HashMap<HotelId, Candidate>,
    first_page_ids: &[HotelId],
    catalog: &HashMap<HotelId, CatalogPayload>,
) -> Reconciled {
    let mut seen = HashSet::with_capacity(priced.len());
    let mut sources = HashMap::with_capacity(priced.len());
    let mut canonical = Vec::with_capacity(priced.len());
    let mut unhydrated = Vec::new();

    for hotel in priced {
        if hotel.id.is_empty() {
            continue;
        }
        if !seen.insert(hotel.id.clone()) {
            debug!("Dropping duplicate priced hotel {}", hotel.id);
            continue;
        }
        let info = catalog.get(&hotel.id);
        if info.is_none() {
            unhydrated.push(hotel.id.clone());
        }
        canonical.push(compose_priced(&hotel, info, candidates.get(&hotel.id)));
        sources.insert(hotel.id.clone(), hotel);
    }

    let by_id: HashMap<&HotelId, &HotelRecord> =
        canonical.iter().map(|record| (&record.id, record)).collect();
    let first_page = first_page_ids
        .iter()
        .filter_map(|id| match by_id.get(id) {
            Some(record) => Some((*record).clone()),
            None => candidates.get(id).map(|candidate| {
                compose_candidate(candidate, catalog.get(id), PricingStatus::SoldOut)
            }),
        })
        .collect();

    // sold-out painted candidates whose fast-paint lookup failed get another try
    for id in first_page_ids {
        if !by_id.contains_key(id) && candidates.contains_key(id) && !catalog.contains_key(id) {
            unhydrated.push(id.clone());
        }
    }

    let max_price = canonical
        .iter()
        .filter(|record| record.is_priced())
        .filter_map(HotelRecord::primary_price)
        .fold(None, |max: Option<f64>, price| {
            Some(max.map_or(price, |m| m.max(price)))
        });

    Reconciled {
        canonical,
        first_page,
        priced: sources,
        max_price,
        unhydrated,
    }
}

/// Fetches authoritative pricing and merges it into the canonical set
pub struct PricingMerger {
    pricing: Arc<dyn PricingService>,
    cache: Arc<HotelInfoCache>,
    page_size: usize,
    call_timeout: Duration,
}

impl PricingMerger {
    pub fn new(
        pricing: Arc<dyn PricingService>,
        cache: Arc<HotelInfoCache>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            pricing,
            cache,
            page_size: config.page_size,
            call_timeout: config.call_timeout,
        }
    }

    /// The slow authoritative call. A failure here is fatal to the run
    pub async fn fetch_pricing(
        &self,
        params: &SearchParams,
    ) -> Result<Vec<PricedHotel>, ProviderError> {
        match tokio::time::timeout(self.call_timeout, self.pricing.search(params)).await {
            Ok(Ok(hotels)) => {
                info!(
                    "{} returned {} priced hotels",
                    self.pricing.source_name(),
                    hotels.len()
                );
                Ok(hotels)
            }
            Ok(Err(err)) => {
                warn!("Pricing failed: {}", err);
                Err(err)
            }
            Err(_) => {
                warn!("Pricing timed out after {:?}", self.call_timeout);
                Err(ProviderError::Timeout(self.call_timeout))
            }
        }
    }

    /// Hydrate the first page of priced hotels, then reconcile everything
    /// against whatever the cache holds. The rest is left for background hydration
    pub async fn merge(
        &self,
        priced: Vec<PricedHotel>,
        candidates: &HashMap<HotelId, Candidate>,
        first_page_ids: &[HotelId],
    ) -> Reconciled {
        let mut leading: Vec<HotelId> = Vec::with_capacity(self.page_size);
        for hotel in &priced {
            if leading.len() == self.page_size {
                break;
            }
            if !leading.contains(&hotel.id) {
                leading.push(hotel.id.clone());
            }
        }
        self.cache.fetch_info(&leading).await;

        let mut wanted: Vec<HotelId> = priced.iter().map(|hotel| hotel.id.clone()).collect();
        wanted.extend(first_page_ids.iter().cloned());
        let catalog = self.cache.cached(&wanted).await;

        let reconciled = reconcile(priced, candidates, first_page_ids, &catalog);
        debug!(
            "Reconciled {} priced hotels, {} on first page, {} awaiting catalog data",
            reconciled.canonical.len(),
            reconciled.first_page.len(),
            reconciled.unhydrated.len()
        );
        reconciled
    }
}
