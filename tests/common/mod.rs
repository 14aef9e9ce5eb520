#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use hotel_scout::error::ProviderError;
use hotel_scout::models::{
    Candidate, CatalogPayload, GuestRoom, HotelId, PricedHotel, Rate, SearchParams, SearchTarget,
};
use hotel_scout::providers::{CatalogService, PricingService};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// In-memory catalog: fixed candidate lists per region, generated info for any id
#[derive(Default)]
pub struct MockCatalog {
    candidates: Mutex<HashMap<String, Vec<Candidate>>>,
    amenities: Mutex<HashMap<HotelId, Vec<String>>>,
    lookups: Mutex<Vec<Vec<HotelId>>>,
    listings: AtomicUsize,
    fail_listing: Mutex<bool>,
    stall_listing: Mutex<bool>,
    stalled_lookups: AtomicUsize,
}

impl MockCatalog {
    pub fn with_candidates(self, region: &str, ids: &[String]) -> Self {
        let candidates = ids
            .iter()
            .map(|id| Candidate {
                id: HotelId::from(id.as_str()),
                name: Some(format!("Listed {}", id)),
                star_rating: Some(3),
            })
            .collect();
        self.candidates
            .lock()
            .unwrap()
            .insert(region.to_string(), candidates);
        self
    }

    pub fn with_amenities(self, id: &str, amenities: &[&str]) -> Self {
        self.amenities.lock().unwrap().insert(
            HotelId::from(id),
            amenities.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn failing_listing(self) -> Self {
        *self.fail_listing.lock().unwrap() = true;
        self
    }

    /// The listing never answers, so only the caller's deadline ends it
    pub fn stalling_listing(self) -> Self {
        *self.stall_listing.lock().unwrap() = true;
        self
    }

    /// The next `count` lookups never answer
    pub fn stalling_lookups(self, count: usize) -> Self {
        self.stalled_lookups.store(count, Ordering::SeqCst);
        self
    }

    pub fn lookups(&self) -> Vec<Vec<HotelId>> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn looked_up_ids(&self) -> usize {
        self.lookups.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn list_candidates(
        &self,
        region_id: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, ProviderError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let stall = *self.stall_listing.lock().unwrap();
        if stall {
            std::future::pending::<()>().await;
        }
        if *self.fail_listing.lock().unwrap() {
            return Err(ProviderError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        let mut candidates = self
            .candidates
            .lock()
            .unwrap()
            .get(region_id)
            .cloned()
            .unwrap_or_default();
        candidates.truncate(limit);
        Ok(candidates)
    }

    async fn lookup(&self, ids: &[HotelId]) -> Result<Vec<CatalogPayload>, ProviderError> {
        self.lookups.lock().unwrap().push(ids.to_vec());
        let stall = self
            .stalled_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stall {
            std::future::pending::<()>().await;
        }
        let amenities = self.amenities.lock().unwrap();
        Ok(ids
            .iter()
            .map(|id| CatalogPayload {
                id: id.clone(),
                name: Some(format!("Hotel {}", id)),
                address: Some(format!("{} Main Street", id)),
                star_rating: Some(4),
                images: vec![format!("https://cdn.test/{{size}}/{}.jpg", id)],
                amenities: amenities.get(id).cloned().unwrap_or_default(),
                ..Default::default()
            })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "mock-catalog"
    }
}

/// In-memory pricing keyed by currency, with optional gates that hold a response back
#[derive(Default)]
pub struct MockPricing {
    responses: Mutex<HashMap<String, Result<Vec<PricedHotel>, ProviderError>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl MockPricing {
    pub fn respond(self, currency: &str, hotels: Vec<PricedHotel>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(currency.to_string(), Ok(hotels));
        self
    }

    pub fn fail(self, currency: &str, err: ProviderError) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(currency.to_string(), Err(err));
        self
    }

    /// Responses in `currency` wait until the returned sender fires
    pub fn gate(&self, currency: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(currency.to_string(), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PricingService for MockPricing {
    async fn search(&self, params: &SearchParams) -> Result<Vec<PricedHotel>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(&params.currency);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(&params.currency)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn source_name(&self) -> &'static str {
        "mock-pricing"
    }
}

pub fn ids(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}{}", prefix, i)).collect()
}

pub fn priced(id: &str, amount: f64, currency: &str) -> PricedHotel {
    PricedHotel {
        id: HotelId::from(id),
        rates: vec![Rate {
            room_name: "Double room".to_string(),
            meal: Some("breakfast".to_string()),
            amount: Some(amount),
            currency: Some(currency.to_string()),
            daily_prices: Vec::new(),
        }],
        ..Default::default()
    }
}

pub fn sold_out(id: &str) -> PricedHotel {
    PricedHotel {
        id: HotelId::from(id),
        ..Default::default()
    }
}

pub fn region_params(region: &str, currency: &str) -> SearchParams {
    SearchParams {
        target: SearchTarget::Region {
            region_id: region.to_string(),
        },
        checkin: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        checkout: NaiveDate::from_ymd_opt(2026, 12, 4).unwrap(),
        guests: vec![GuestRoom {
            adults: 2,
            children: vec![],
        }],
        residency: "gb".to_string(),
        currency: currency.to_string(),
    }
}

pub fn geo_params(currency: &str) -> SearchParams {
    SearchParams {
        target: SearchTarget::Geo {
            latitude: 48.8566,
            longitude: 2.3522,
            radius_m: 1000,
        },
        ..region_params("unused", currency)
    }
}
