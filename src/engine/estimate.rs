use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::pricing;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::geo::route::approximate_route;
use crate::models::catalog::Merchant;
use crate::models::estimate::{DeliveryEstimate, EstimateStatus, OrderDraft, SubOrder};
use crate::observability::metrics::Metrics;
use crate::store::{EstimateStore, MerchantCatalog};

pub struct EstimationService {
    catalog: Arc<dyn MerchantCatalog>,
    estimates: Arc<dyn EstimateStore>,
    max_starting_point_km: f64,
    average_speed_kmh: f64,
    metrics: Metrics,
}

impl EstimationService {
    pub fn new(
        catalog: Arc<dyn MerchantCatalog>,
        estimates: Arc<dyn EstimateStore>,
        config: &Config,
        metrics: Metrics,
    ) -> Self {
        Self {
            catalog,
            estimates,
            max_starting_point_km: config.max_starting_point_km,
            average_speed_kmh: config.average_speed_kmh,
            metrics,
        }
    }

    /// Prices `draft`, estimates its delivery time and persists the estimate.
    ///
    /// Nothing is written unless every check passes.
    pub async fn estimate(
        &self,
        draft: &OrderDraft,
        user_id: Uuid,
    ) -> Result<DeliveryEstimate, AppError> {
        let start = Instant::now();
        let result = self.run(draft, user_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        self.metrics.observe(
            &self.metrics.estimates_total,
            "estimate",
            outcome,
            start.elapsed().as_secs_f64(),
        );
        if let Err(err) = &result {
            warn!(user_id = %user_id, kind = err.kind(), error = %err, "estimate rejected");
        }

        result
    }

    async fn run(&self, draft: &OrderDraft, user_id: Uuid) -> Result<DeliveryEstimate, AppError> {
        let starting = validate_shape(&draft.orders)?;

        let merchant_ids = distinct_merchants(&draft.orders);
        let merchants: HashMap<Uuid, Merchant> = self
            .catalog
            .merchants_by_ids(&merchant_ids)
            .await?
            .into_iter()
            .map(|merchant| (merchant.id, merchant))
            .collect();
        let participants = merchant_ids
            .iter()
            .map(|id| {
                merchants
                    .get(id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound(format!("invalid merchant {id}")))
            })
            .collect::<Result<Vec<Merchant>, AppError>>()?;

        let origin = participants
            .iter()
            .find(|merchant| merchant.id == starting.merchant_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("invalid merchant {}", starting.merchant_id))
            })?;
        let origin_km = haversine_km(&draft.user_location, &origin.location);
        if origin_km > self.max_starting_point_km {
            return Err(AppError::ConstraintViolation(format!(
                "starting point too far: merchant {} is {origin_km:.2} km away, limit is {} km",
                origin.id, self.max_starting_point_km
            )));
        }

        let items = self
            .catalog
            .items_by_ids(&pricing::item_ids(&draft.orders))
            .await?;
        let total_price = pricing::total_price(&draft.orders, &pricing::index_items(items))?;

        let distance_km = if let [only] = participants.as_slice() {
            haversine_km(&draft.user_location, &only.location)
        } else {
            let route = approximate_route(&draft.user_location, &participants);
            self.metrics.route_stops.observe(route.stops.len() as f64);
            debug!(
                stops = route.stops.len(),
                route_km = route.total_distance_km,
                "approximated delivery route"
            );
            route.total_distance_km
        };
        let minutes = pricing::delivery_minutes(distance_km, self.average_speed_kmh);

        let estimate = DeliveryEstimate {
            id: Uuid::now_v7(),
            user_id,
            snapshot: DeliveryEstimate::encode_snapshot(&draft.orders)?,
            total_price,
            estimated_delivery_minutes: minutes,
            status: EstimateStatus::Unconsumed,
            created_at: Utc::now(),
        };
        let saved = self.estimates.save(estimate).await?;

        info!(
            estimate_id = %saved.id,
            user_id = %user_id,
            merchants = participants.len(),
            total_price = %saved.total_price,
            minutes = saved.estimated_delivery_minutes,
            "delivery estimate created"
        );

        Ok(saved)
    }
}

/// Returns the starting sub-order.
fn validate_shape(orders: &[SubOrder]) -> Result<&SubOrder, AppError> {
    if orders.is_empty() {
        return Err(AppError::InvalidInput(
            "order draft has no merchants".to_string(),
        ));
    }

    for order in orders {
        if order.items.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "merchant {} has no items",
                order.merchant_id
            )));
        }
        if let Some(line) = order.items.iter().find(|line| line.quantity == 0) {
            return Err(AppError::InvalidInput(format!(
                "item {} quantity must be at least 1",
                line.item_id
            )));
        }
    }

    let mut starting = orders.iter().filter(|order| order.is_starting_point);
    match (starting.next(), starting.next()) {
        (Some(order), None) => Ok(order),
        (None, _) => Err(AppError::InvalidInput(
            "exactly one merchant must be the starting point, found none".to_string(),
        )),
        (Some(_), Some(_)) => Err(AppError::InvalidInput(
            "exactly one merchant must be the starting point, found several".to_string(),
        )),
    }
}

/// Merchant ids in first-seen order, without repeats.
fn distinct_merchants(orders: &[SubOrder]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    orders
        .iter()
        .map(|order| order.merchant_id)
        .filter(|id| seen.insert(*id))
        .collect()
}
