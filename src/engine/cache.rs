use crate::config::EngineConfig;
use crate::models::{CatalogPayload, HotelId};
use crate::providers::CatalogService;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session-scoped catalog cache with deduplicated, batched lookups
///
/// An id is fetched at most once per session once a lookup for it has
/// succeeded. Ids from failed batches stay uncached and are requested again
/// by the next call that needs them.
pub struct HotelInfoCache {
    service: Arc<dyn CatalogService>,
    entries: Mutex<HashMap<HotelId, CatalogPayload>>,
    batch_size: usize,
    call_timeout: Duration,
    image_size: String,
    max_images: usize,
}

impl HotelInfoCache {
    pub fn new(service: Arc<dyn CatalogService>, config: &EngineConfig) -> Self {
        Self {
            service,
            entries: Mutex::new(HashMap::new()),
            batch_size: config.info_batch_size.max(1),
            call_timeout: config.call_timeout,
            image_size: config.image_size.clone(),
            max_images: config.max_images,
        }
    }

    /// Catalog data for `ids`, serving cached entries without a network call.
    /// Ids that could not be resolved are absent from the result
    pub async fn fetch_info(&self, ids: &[HotelId]) -> HashMap<HotelId, CatalogPayload> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();
        {
            let entries = self.entries.lock().await;
            let mut seen = HashSet::with_capacity(ids.len());
            for id in ids {
                if id.is_empty() || !seen.insert(id) {
                    continue;
                }
                match entries.get(id) {
                    Some(payload) => {
                        found.insert(id.clone(), payload.clone());
                    }
                    None => missing.push(id.clone()),
                }
            }
        }

        debug!(
            "Catalog lookup: {} cached, {} to fetch",
            found.len(),
            missing.len()
        );
        if missing.is_empty() {
            return found;
        }

        let batches = missing.len().div_ceil(self.batch_size);
        for (index, batch) in missing.chunks(self.batch_size).enumerate() {
            debug!(
                "Fetching catalog batch {}/{} ({} ids) from {}",
                index + 1,
                batches,
                batch.len(),
                self.service.source_name()
            );

            let payloads = match tokio::time::timeout(self.call_timeout, self.service.lookup(batch)).await {
                Ok(Ok(payloads)) => payloads,
                Ok(Err(err)) => {
                    warn!("Catalog batch {}/{} failed: {}", index + 1, batches, err);
                    continue;
                }
                Err(_) => {
                    warn!(
                        "Catalog batch {}/{} timed out after {:?}",
                        index + 1,
                        batches,
                        self.call_timeout
                    );
                    continue;
                }
            };

            let requested: HashSet<&HotelId> = batch.iter().collect();
            let mut entries = self.entries.lock().await;
            for payload in payloads {
                let payload = self.normalize(payload);
                if payload.id.is_empty() {
                    continue;
                }
                if requested.contains(&payload.id) {
                    found.insert(payload.id.clone(), payload.clone());
                }
                entries.insert(payload.id.clone(), payload);
            }
        }

        info!("Catalog lookup resolved {}/{} hotels", found.len(), seen_len(ids));
        found
    }

    /// Cached entries only, never touches the network
    pub async fn cached(&self, ids: &[HotelId]) -> HashMap<HotelId, CatalogPayload> {
        let entries = self.entries.lock().await;
        ids.iter()
            .filter_map(|id| entries.get(id).map(|payload| (id.clone(), payload.clone())))
            .collect()
    }

    pub async fn contains(&self, id: &HotelId) -> bool {
        self.entries.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Re-key by trimmed id and resolve image size templates
    fn normalize(&self, mut payload: CatalogPayload) -> CatalogPayload {
        payload.id = HotelId::from(payload.id.as_str());

        let mut images: Vec<String> = Vec::new();
        for url in payload.images.drain(..) {
            let url = url.replace("{size}", &self.image_size);
            if !url.is_empty() && !images.contains(&url) {
                images.push(url);
            }
            if images.len() == self.max_images {
                break;
            }
        }
        payload.images = images;
        payload
    }
}

fn seen_len(ids: &[HotelId]) -> usize {
    ids.iter().collect::<HashSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::Candidate;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Answers every id it is asked for, except in batches listed in `fail_batches`
    #[derive(Default)]
    struct RecordingCatalog {
        batches: StdMutex<Vec<Vec<HotelId>>>,
        fail_batches: StdMutex<HashSet<usize>>,
    }

    impl RecordingCatalog {
        fn batches(&self) -> Vec<Vec<HotelId>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogService for RecordingCatalog {
        async fn list_candidates(
            &self,
            _region_id: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, ProviderError> {
            Ok(Vec::new())
        }

        async fn lookup(&self, ids: &[HotelId]) -> Result<Vec<CatalogPayload>, ProviderError> {
            let index = {
                let mut batches = self.batches.lock().unwrap();
                batches.push(ids.to_vec());
                batches.len() - 1
            };
            if self.fail_batches.lock().unwrap().contains(&index) {
                return Err(ProviderError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(ids
                .iter()
                .map(|id| CatalogPayload {
                    id: HotelId::from(format!(" {} ", id)),
                    name: Some(format!("Hotel {}", id)),
                    images: vec![
                        "https://cdn/{size}/a.jpg".to_string(),
                        "https://cdn/{size}/a.jpg".to_string(),
                        "https://cdn/{size}/b.jpg".to_string(),
                    ],
                    ..Default::default()
                })
                .collect())
        }

        fn source_name(&self) -> &'static str {
            "recording"
        }
    }

    fn ids(range: std::ops::Range<usize>) -> Vec<HotelId> {
        range.map(|i| HotelId::from(format!("h{}", i))).collect()
    }

    fn cache(service: Arc<RecordingCatalog>, batch: usize) -> HotelInfoCache {
        let config = EngineConfig {
            info_batch_size: batch,
            ..Default::default()
        };
        HotelInfoCache::new(service, &config)
    }

    #[tokio::test]
    async fn cached_ids_are_never_fetched_twice() {
        let service = Arc::new(RecordingCatalog::default());
        let cache = cache(service.clone(), 500);

        let first = cache.fetch_info(&ids(0..3)).await;
        assert_eq!(first.len(), 3);

        let second = cache.fetch_info(&ids(1..5)).await;
        assert_eq!(second.len(), 4);

        let batches = service.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], ids(3..5));
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_request_are_fetched_once() {
        let service = Arc::new(RecordingCatalog::default());
        let cache = cache(service.clone(), 500);

        let request = vec![HotelId::from("h1"), HotelId::from(" h1 "), HotelId::from("h2")];
        let found = cache.fetch_info(&request).await;

        assert_eq!(found.len(), 2);
        assert_eq!(service.batches(), vec![ids(1..3)]);
    }

    #[tokio::test]
    async fn missing_ids_are_chunked_sequentially() {
        let service = Arc::new(RecordingCatalog::default());
        let cache = cache(service.clone(), 4);

        let found = cache.fetch_info(&ids(0..10)).await;

        assert_eq!(found.len(), 10);
        let sizes: Vec<usize> = service.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn failed_batch_does_not_abort_siblings_and_is_retried() {
        let service = Arc::new(RecordingCatalog::default());
        service.fail_batches.lock().unwrap().insert(1);
        let cache = cache(service.clone(), 2);

        let found = cache.fetch_info(&ids(0..6)).await;
        assert_eq!(found.len(), 4);
        assert!(!found.contains_key(&HotelId::from("h2")));
        assert!(!cache.contains(&HotelId::from("h3")).await);
        assert!(found.contains_key(&HotelId::from("h5")));

        let retried = cache.fetch_info(&ids(0..6)).await;
        assert_eq!(retried.len(), 6);
        assert_eq!(service.batches().last().unwrap(), &ids(2..4));
    }

    #[tokio::test]
    async fn responses_are_normalized_on_ingestion() {
        let service = Arc::new(RecordingCatalog::default());
        let cache = cache(service, 500);

        let found = cache.fetch_info(&ids(0..1)).await;
        let payload = &found[&HotelId::from("h0")];
        assert_eq!(payload.id.as_str(), "h0");
        assert_eq!(
            payload.images,
            vec!["https://cdn/640x400/a.jpg", "https://cdn/640x400/b.jpg"]
        );
        assert_eq!(cache.len().await, 1);
    }
}
