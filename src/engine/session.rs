//! Presentation-facing search session
//!
//! Owns one catalog cache, the run controller and the result state. Every
//! asynchronous step re-checks its run under the state lock right before it
//! writes, so results of a superseded run never reach the view.

use crate::config::EngineConfig;
use crate::engine::cache::HotelInfoCache;
use crate::engine::filters::{self, FilterState, SortOrder};
use crate::engine::hydrate::{BackgroundHydrator, HydrationSink};
use crate::engine::paginate::Paginator;
use crate::engine::prefetch::{CatalogPrefetcher, FastPaint};
use crate::engine::reconcile::{compose_candidate, compose_priced, PricingMerger};
use crate::engine::run::{RunId, RunPhase, SearchRunController};
use crate::error::SearchError;
use crate::models::{
    Candidate, CatalogPayload, HotelId, HotelRecord, PricedHotel, SearchParams,
};
use crate::providers::{CatalogService, PricingService};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchView {
    pub run: Option<RunId>,
    /// Records of the current page
    pub records: Vec<HotelRecord>,
    /// Pricing is in flight
    pub loading: bool,
    /// Catalog data is still being pulled
    pub meta_loading: bool,
    pub error: Option<String>,
    pub page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub filters: FilterState,
    pub sort_order: SortOrder,
    /// Highest first-rate price in the canonical set
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Canonical set published
    Settled { run: RunId, hotels: usize },
    /// A newer run started first; nothing was written
    Superseded { run: RunId },
}

#[derive(Default)]
struct SessionState {
    runs: SearchRunController,
    params: Option<SearchParams>,
    candidates: HashMap<HotelId, Candidate>,
    priced: HashMap<HotelId, PricedHotel>,
    first_page: Vec<HotelRecord>,
    canonical: Vec<HotelRecord>,
    filters: FilterState,
    sort: SortOrder,
    page: usize,
    loading: bool,
    meta_loading: bool,
    error: Option<String>,
    max_price: Option<f64>,
    hydrations: Vec<JoinHandle<()>>,
}

impl SessionState {
    /// Drop everything the previous run produced
    fn reset(&mut self, params: SearchParams) {
        self.params = Some(params);
        self.candidates.clear();
        self.priced.clear();
        self.first_page.clear();
        self.canonical.clear();
        self.filters = FilterState::default();
        self.sort = SortOrder::default();
        self.page = 1;
        self.loading = true;
        self.meta_loading = false;
        self.error = None;
        self.max_price = None;
    }

    fn rehydrate(&mut self, payloads: &HashMap<HotelId, CatalogPayload>) {
        let Self {
            canonical,
            first_page,
            priced,
            candidates,
            ..
        } = self;
        for record in canonical.iter_mut().chain(first_page.iter_mut()) {
            let Some(payload) = payloads.get(&record.id) else {
                continue;
            };
            let candidate = candidates.get(&record.id);
            *record = match priced.get(&record.id) {
                Some(source) => compose_priced(source, Some(payload), candidate),
                None => match candidate {
                    Some(candidate) => compose_candidate(candidate, Some(payload), record.pricing_status),
                    None => continue,
                },
            };
        }
    }

    /// Derive the view and store the clamped page back
    fn derive_view(&mut self, paginator: &Paginator) -> SearchView {
        let active = self.filters.is_active(self.max_price);
        let filtered = filters::apply(&self.canonical, &self.filters, self.sort, self.max_price);
        let page = paginator.paginate(filtered, &self.first_page, active, self.page);

        let view = SearchView {
            run: self.runs.current(),
            records: page.records.into_iter().cloned().collect(),
            loading: self.loading,
            meta_loading: self.meta_loading,
            error: self.error.clone(),
            page: page.page,
            total_pages: page.total_pages,
            total_results: page.total_results,
            filters: self.filters.clone(),
            sort_order: self.sort,
            max_price: self.max_price,
        };
        self.page = view.page;
        view
    }
}

struct SessionInner {
    config: EngineConfig,
    cache: Arc<HotelInfoCache>,
    prefetcher: CatalogPrefetcher,
    merger: PricingMerger,
    paginator: Paginator,
    state: Mutex<SessionState>,
    view: watch::Sender<SearchView>,
}

impl SessionInner {
    fn publish(&self, state: &mut SessionState) -> SearchView {
        let view = state.derive_view(&self.paginator);
        self.view.send_replace(view.clone());
        view
    }
}

#[async_trait]
impl HydrationSink for SessionInner {
    async fn apply(&self, run: RunId, payloads: HashMap<HotelId, CatalogPayload>) -> bool {
        let mut state = self.state.lock().await;
        if !state.runs.is_current(run) {
            return false;
        }
        if !payloads.is_empty() {
            state.rehydrate(&payloads);
            self.publish(&mut state);
        }
        true
    }

    async fn finish(&self, run: RunId) {
        let mut state = self.state.lock().await;
        if state.runs.advance(run, RunPhase::Settled) {
            state.meta_loading = false;
            self.publish(&mut state);
        }
    }
}

/// One user's search session: the engine behind a results page
///
/// Cheap to clone; clones share the cache and the result state.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        pricing: Arc<dyn PricingService>,
        config: EngineConfig,
    ) -> Self {
        let cache = Arc::new(HotelInfoCache::new(catalog.clone(), &config));
        Self::with_cache(catalog, pricing, cache, config)
    }

    /// Share an existing cache, e.g. across sessions of the same visitor
    pub fn with_cache(
        catalog: Arc<dyn CatalogService>,
        pricing: Arc<dyn PricingService>,
        cache: Arc<HotelInfoCache>,
        config: EngineConfig,
    ) -> Self {
        let prefetcher = CatalogPrefetcher::new(catalog, cache.clone(), &config);
        let merger = PricingMerger::new(pricing, cache.clone(), &config);
        let paginator = Paginator::new(config.page_size);
        let (view, _) = watch::channel(SearchView {
            page: 1,
            total_pages: 1,
            ..Default::default()
        });

        Self {
            inner: Arc::new(SessionInner {
                config,
                cache,
                prefetcher,
                merger,
                paginator,
                state: Mutex::new(SessionState {
                    page: 1,
                    ..Default::default()
                }),
                view,
            }),
        }
    }

    pub fn cache(&self) -> &Arc<HotelInfoCache> {
        &self.inner.cache
    }

    pub fn view(&self) -> SearchView {
        self.inner.view.borrow().clone()
    }

    /// Receives a new view after every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.inner.view.subscribe()
    }

    pub async fn current_run(&self) -> Option<RunId> {
        self.inner.state.lock().await.runs.current()
    }

    pub async fn run_phase(&self, run: RunId) -> RunPhase {
        self.inner.state.lock().await.runs.phase(run)
    }

    /// Start a new run and drive it until its canonical set is published.
    /// Background hydration keeps going after this returns
    pub async fn search(&self, params: SearchParams) -> Result<RunOutcome, SearchError> {
        params.validate()?;
        let run = self.begin(params.clone()).await;
        self.execute(run, params).await
    }

    /// Re-run the current search in another currency or residency. Without a
    /// selected target there is nothing to re-run
    pub async fn change_locale(
        &self,
        currency: &str,
        residency: &str,
    ) -> Result<Option<RunOutcome>, SearchError> {
        let params = {
            let state = self.inner.state.lock().await;
            state.params.clone()
        };
        let Some(mut params) = params else {
            debug!("No search selected, locale change does not start a run");
            return Ok(None);
        };
        if params.currency == currency && params.residency == residency {
            return Ok(None);
        }
        params.currency = currency.to_string();
        params.residency = residency.to_string();
        self.search(params).await.map(Some)
    }

    /// Replace the filters and go back to page 1
    pub async fn set_filter(&self, filters: FilterState) -> SearchView {
        let mut state = self.inner.state.lock().await;
        state.filters = filters;
        state.page = 1;
        self.inner.publish(&mut state)
    }

    pub async fn set_sort(&self, order: SortOrder) -> SearchView {
        let mut state = self.inner.state.lock().await;
        state.sort = order;
        state.page = 1;
        self.inner.publish(&mut state)
    }

    /// Out-of-range pages are clamped
    pub async fn set_page(&self, page: usize) -> SearchView {
        let mut state = self.inner.state.lock().await;
        state.page = page;
        self.inner.publish(&mut state)
    }

    /// Wait for background hydration spawned so far
    pub async fn settle(&self) {
        loop {
            let handles = {
                let mut state = self.inner.state.lock().await;
                std::mem::take(&mut state.hydrations)
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    warn!("Background hydration task failed: {}", err);
                }
            }
        }
    }

    async fn begin(&self, params: SearchParams) -> RunId {
        let mut state = self.inner.state.lock().await;
        let run = state.runs.start();
        state.hydrations.retain(|handle| !handle.is_finished());
        let prefetching = params.target.region_id().is_some();
        info!("Starting {} for {:?} in {}", run, params.target, params.currency);
        state.reset(params);
        state.meta_loading = prefetching;
        self.inner.publish(&mut state);
        run
    }

    async fn execute(&self, run: RunId, params: SearchParams) -> Result<RunOutcome, SearchError> {
        let inner = &self.inner;

        let fast = match params.target.region_id() {
            Some(region_id) => inner.prefetcher.prefetch(region_id).await,
            None => FastPaint::default(),
        };
        let first_page_ids = fast.first_page_ids();
        let candidates: HashMap<HotelId, Candidate> = fast
            .candidates
            .into_iter()
            .map(|candidate| (candidate.id.clone(), candidate))
            .collect();
        {
            let mut state = inner.state.lock().await;
            if !state.runs.advance(run, RunPhase::CandidatesFetched) {
                debug!("{} superseded before fast paint", run);
                return Ok(RunOutcome::Superseded { run });
            }
            state.candidates = candidates.clone();
            state.first_page = fast.first_page;
            state.meta_loading = false;
            inner.publish(&mut state);
        }

        let priced = match inner.merger.fetch_pricing(&params).await {
            Ok(priced) => priced,
            Err(err) => {
                let mut state = inner.state.lock().await;
                if !state.runs.advance(run, RunPhase::Failed) {
                    debug!("{} superseded, dropping pricing failure", run);
                    return Ok(RunOutcome::Superseded { run });
                }
                state.loading = false;
                state.error = Some(err.to_string());
                inner.publish(&mut state);
                return Err(SearchError::Pricing(err));
            }
        };

        let merged = inner.merger.merge(priced, &candidates, &first_page_ids).await;

        let mut state = inner.state.lock().await;
        if !state.runs.advance(run, RunPhase::PricingFetched) {
            debug!("{} superseded, dropping {} priced hotels", run, merged.canonical.len());
            return Ok(RunOutcome::Superseded { run });
        }

        let hotels = merged.canonical.len();
        state.canonical = merged.canonical;
        state.first_page = merged.first_page;
        state.priced = merged.priced;
        state.max_price = merged.max_price;
        let observed = state.max_price;
        state.filters.narrow_price_max(observed);
        state.loading = false;
        state.meta_loading = !merged.unhydrated.is_empty();

        if merged.unhydrated.is_empty() {
            state.runs.advance(run, RunPhase::Settled);
        } else {
            let sink: Arc<dyn HydrationSink> = inner.clone();
            let hydrator = BackgroundHydrator::new(
                inner.cache.clone(),
                sink,
                inner.config.hydration_batch_size,
            );
            state.hydrations.push(hydrator.spawn(run, merged.unhydrated));
        }
        inner.publish(&mut state);
        info!("{} published {} hotels", run, hotels);

        Ok(RunOutcome::Settled { run, hotels })
    }
}
