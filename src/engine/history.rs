use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::format_timestamp;
use crate::models::order::{MerchantOrderGroup, OrderQuery, OrderRow, OrderView, OrderedItemView};
use crate::store::OrderStore;

pub struct OrderQueryService {
    orders: Arc<dyn OrderStore>,
}

impl OrderQueryService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// The user's past orders, newest first, each split into merchant groups.
    pub async fn list_orders(
        &self,
        user_id: Uuid,
        query: &OrderQuery,
    ) -> Result<Vec<OrderView>, AppError> {
        let rows = self.orders.query_orders(user_id, &query.filters).await?;
        let row_count = rows.len();
        let views = group_rows(rows);

        let offset = query.offset.unwrap_or(0);
        let window: Vec<OrderView> = match query.limit.filter(|limit| *limit > 0) {
            Some(limit) => views.into_iter().skip(offset).take(limit).collect(),
            None => views.into_iter().skip(offset).collect(),
        };

        debug!(
            user_id = %user_id,
            rows = row_count,
            orders = window.len(),
            "order history loaded"
        );

        Ok(window)
    }
}

/// Regroups flat rows by order, then by merchant, keeping first-seen order.
pub fn group_rows(rows: Vec<OrderRow>) -> Vec<OrderView> {
    let mut views: Vec<OrderView> = Vec::new();
    let mut order_slots: HashMap<Uuid, usize> = HashMap::new();
    let mut merchant_slots: HashMap<(Uuid, Uuid), usize> = HashMap::new();

    for row in rows {
        let order_idx = *order_slots.entry(row.order_id).or_insert_with(|| {
            views.push(OrderView {
                order_id: row.order_id,
                total_price: row.total_price,
                created_at: format_timestamp(&row.order_created_at),
                orders: Vec::new(),
            });
            views.len() - 1
        });
        let groups = &mut views[order_idx].orders;

        let group_idx = *merchant_slots
            .entry((row.order_id, row.merchant.id))
            .or_insert_with(|| {
                groups.push(MerchantOrderGroup {
                    merchant: (&row.merchant).into(),
                    items: Vec::new(),
                });
                groups.len() - 1
            });

        groups[group_idx].items.push(OrderedItemView {
            item_id: row.item.id,
            name: row.item.name.clone(),
            product_category: row.item.category,
            price: row.item.price,
            quantity: row.quantity,
            image_url: row.item.image_url.clone(),
            created_at: format_timestamp(&row.item.created_at),
        });
    }

    views
}
