use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::pricing;
use crate::error::AppError;
use crate::models::estimate::{EstimateStatus, SubOrder};
use crate::models::order::{Order, OrderItem};
use crate::observability::metrics::Metrics;
use crate::store::{EstimateStore, MerchantCatalog, OrderStore};

pub struct OrderFinalizationService {
    catalog: Arc<dyn MerchantCatalog>,
    estimates: Arc<dyn EstimateStore>,
    orders: Arc<dyn OrderStore>,
    metrics: Metrics,
}

impl OrderFinalizationService {
    pub fn new(
        catalog: Arc<dyn MerchantCatalog>,
        estimates: Arc<dyn EstimateStore>,
        orders: Arc<dyn OrderStore>,
        metrics: Metrics,
    ) -> Self {
        Self {
            catalog,
            estimates,
            orders,
            metrics,
        }
    }

    /// Turns a stored estimate into an order and returns the new order id.
    ///
    /// The total is recomputed from current catalog prices. The estimate is
    /// consumed in the same transaction that writes the order rows.
    pub async fn finalize(&self, estimate_id: Uuid, user_id: Uuid) -> Result<Uuid, AppError> {
        let start = Instant::now();
        let result = self.run(estimate_id, user_id).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        self.metrics.observe(
            &self.metrics.orders_finalized_total,
            "finalize",
            outcome,
            start.elapsed().as_secs_f64(),
        );
        if let Err(err) = &result {
            warn!(
                estimate_id = %estimate_id,
                user_id = %user_id,
                kind = err.kind(),
                error = %err,
                "order finalization failed"
            );
        }

        result
    }

    async fn run(&self, estimate_id: Uuid, user_id: Uuid) -> Result<Uuid, AppError> {
        let not_found = || AppError::NotFound(format!("estimate {estimate_id} not found"));

        let estimate = self
            .estimates
            .find_by_id(estimate_id)
            .await?
            .ok_or_else(not_found)?;
        if estimate.user_id != user_id {
            return Err(not_found());
        }
        if estimate.status == EstimateStatus::Consumed {
            return Err(AppError::ConstraintViolation(format!(
                "estimate {estimate_id} has already been ordered"
            )));
        }

        let sub_orders = estimate.sub_orders()?;
        let items = self
            .catalog
            .items_by_ids(&pricing::item_ids(&sub_orders))
            .await?;
        let total_price = pricing::total_price(&sub_orders, &pricing::index_items(items))?;

        if total_price != estimate.total_price {
            warn!(
                estimate_id = %estimate_id,
                quoted = %estimate.total_price,
                charged = %total_price,
                "catalog prices changed since estimate"
            );
        }

        let order = Order {
            id: Uuid::now_v7(),
            user_id,
            total_price,
            created_at: Utc::now(),
        };
        let lines = order_lines(order.id, &sub_orders);
        let line_count = lines.len();

        let order = self
            .orders
            .create_order_with_items(estimate.id, order, lines)
            .await?;

        info!(
            order_id = %order.id,
            estimate_id = %estimate_id,
            user_id = %user_id,
            lines = line_count,
            total_price = %order.total_price,
            "order placed"
        );

        Ok(order.id)
    }
}

/// One order item per (merchant, item, quantity) line of the snapshot.
fn order_lines(order_id: Uuid, sub_orders: &[SubOrder]) -> Vec<OrderItem> {
    sub_orders
        .iter()
        .flat_map(|sub_order| {
            sub_order.items.iter().map(move |line| OrderItem {
                id: Uuid::now_v7(),
                order_id,
                merchant_id: sub_order.merchant_id,
                item_id: line.item_id,
                quantity: line.quantity,
            })
        })
        .collect()
}
