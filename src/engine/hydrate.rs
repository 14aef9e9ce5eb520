use crate::engine::cache::HotelInfoCache;
use crate::engine::run::RunId;
use crate::models::{CatalogPayload, HotelId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Receiver of background hydration results
#[async_trait]
pub trait HydrationSink: Send + Sync {
    /// Merge one batch into the result set. Returns false once `run` is
    /// superseded, which stops the hydrator
    async fn apply(&self, run: RunId, payloads: HashMap<HotelId, CatalogPayload>) -> bool;

    /// Every batch has been attempted
    async fn finish(&self, run: RunId);
}

/// Pulls catalog data for the rest of the canonical set in large batches
pub struct BackgroundHydrator {
    cache: Arc<HotelInfoCache>,
    sink: Arc<dyn HydrationSink>,
    batch_size: usize,
}

impl BackgroundHydrator {
    pub fn new(cache: Arc<HotelInfoCache>, sink: Arc<dyn HydrationSink>, batch_size: usize) -> Self {
        Self {
            cache,
            sink,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(self, run: RunId, ids: Vec<HotelId>) {
        let total = ids.len();
        let mut hydrated = 0;
        for batch in ids.chunks(self.batch_size) {
            let payloads = self.cache.fetch_info(batch).await;
            hydrated += payloads.len();
            if !self.sink.apply(run, payloads).await {
                debug!("{} superseded, stopping background hydration", run);
                return;
            }
        }
        info!("{} hydrated {}/{} hotels in background", run, hydrated, total);
        self.sink.finish(run).await;
    }

    /// Fire-and-forget relative to pagination and filtering
    pub fn spawn(self, run: RunId, ids: Vec<HotelId>) -> JoinHandle<()> {
        tokio::spawn(self.run(run, ids))
    }
}
