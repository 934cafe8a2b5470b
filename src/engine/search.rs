use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::route::approximate_route;
use crate::models::location::GeoPoint;
use crate::models::search::{ItemView, MerchantWithItems, NearbyPage, PageMeta, SearchQuery};
use crate::observability::metrics::Metrics;
use crate::store::MerchantCatalog;

pub struct NearbySearchService {
    catalog: Arc<dyn MerchantCatalog>,
    default_limit: usize,
    metrics: Metrics,
}

impl NearbySearchService {
    pub fn new(catalog: Arc<dyn MerchantCatalog>, default_limit: usize, metrics: Metrics) -> Self {
        Self {
            catalog,
            default_limit,
            metrics,
        }
    }

    /// One page of merchants near `user_location`, each with its items.
    ///
    /// The distance-ordered match list is windowed by `offset`/`limit` first;
    /// only the window is then reordered into a greedy delivery route.
    pub async fn search(
        &self,
        user_location: &GeoPoint,
        query: &SearchQuery,
    ) -> Result<NearbyPage, AppError> {
        let start = Instant::now();
        let result = self.run(user_location, query).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        self.metrics.observe(
            &self.metrics.searches_total,
            "search",
            outcome,
            start.elapsed().as_secs_f64(),
        );
        if let Err(err) = &result {
            warn!(error = %err, "nearby search failed");
        }

        result
    }

    async fn run(
        &self,
        user_location: &GeoPoint,
        query: &SearchQuery,
    ) -> Result<NearbyPage, AppError> {
        let limit = query
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit);
        let offset = query.offset.unwrap_or(0);

        let ranked = self
            .catalog
            .query_merchants(&query.filters, user_location)
            .await?;
        let meta = PageMeta {
            limit,
            offset,
            total: ranked.len(),
        };

        if offset >= ranked.len() {
            debug!(offset, total = meta.total, "search offset past end of results");
            return Ok(NearbyPage {
                data: Vec::new(),
                meta,
            });
        }

        let end = offset.saturating_add(limit).min(ranked.len());
        let route = approximate_route(user_location, &ranked[offset..end]);
        self.metrics.route_stops.observe(route.stops.len() as f64);

        let merchant_ids: Vec<Uuid> = route.stops.iter().map(|stop| stop.merchant.id).collect();
        let mut items_by_merchant = self.catalog.items_by_merchant_ids(&merchant_ids).await?;

        let data: Vec<MerchantWithItems> = route
            .stops
            .iter()
            .map(|stop| {
                let items = items_by_merchant
                    .remove(&stop.merchant.id)
                    .unwrap_or_default();
                MerchantWithItems {
                    merchant: (&stop.merchant).into(),
                    items: items.iter().map(ItemView::from).collect(),
                }
            })
            .collect();

        info!(
            returned = data.len(),
            total = meta.total,
            route_km = route.total_distance_km,
            "nearby search served"
        );

        Ok(NearbyPage { data, meta })
    }
}
