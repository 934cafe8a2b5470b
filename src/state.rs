use std::sync::Arc;

use crate::config::Config;
use crate::engine::estimate::EstimationService;
use crate::engine::finalize::OrderFinalizationService;
use crate::engine::history::OrderQueryService;
use crate::engine::search::NearbySearchService;
use crate::observability::metrics::Metrics;
use crate::store::memory::MemoryStore;
use crate::store::{EstimateStore, MerchantCatalog, OrderStore};

pub struct AppState {
    pub config: Config,
    pub metrics: Metrics,
    pub search: NearbySearchService,
    pub estimation: EstimationService,
    pub finalization: OrderFinalizationService,
    pub history: OrderQueryService,
}

impl AppState {
    pub fn new<S>(config: Config, store: Arc<S>) -> Self
    where
        S: MerchantCatalog + EstimateStore + OrderStore + 'static,
    {
        let metrics = Metrics::new();
        let catalog: Arc<dyn MerchantCatalog> = store.clone();
        let estimates: Arc<dyn EstimateStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store;

        Self {
            search: NearbySearchService::new(
                catalog.clone(),
                config.default_search_limit,
                metrics.clone(),
            ),
            estimation: EstimationService::new(
                catalog.clone(),
                estimates.clone(),
                &config,
                metrics.clone(),
            ),
            finalization: OrderFinalizationService::new(
                catalog,
                estimates,
                orders.clone(),
                metrics.clone(),
            ),
            history: OrderQueryService::new(orders),
            metrics,
            config,
        }
    }

    /// Wires every service to a fresh [`MemoryStore`], returned for seeding.
    pub fn in_memory(config: Config) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Self::new(config, store.clone()), store)
    }
}
