use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::catalog::Item;
use crate::models::estimate::SubOrder;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Every item id referenced by `orders`, in line order, duplicates included.
pub fn item_ids(orders: &[SubOrder]) -> Vec<Uuid> {
    orders
        .iter()
        .flat_map(|order| order.items.iter().map(|line| line.item_id))
        .collect()
}

pub fn index_items(items: Vec<Item>) -> HashMap<Uuid, Item> {
    items.into_iter().map(|item| (item.id, item)).collect()
}

/// Sums `price * quantity` over every line.
///
/// Lines repeating an item id are priced independently. Each item must
/// exist and belong to the merchant of the sub-order that lists it.
pub fn total_price(orders: &[SubOrder], items: &HashMap<Uuid, Item>) -> Result<Decimal, AppError> {
    let mut total = Decimal::ZERO;

    for order in orders {
        for line in &order.items {
            let item = items
                .get(&line.item_id)
                .ok_or_else(|| AppError::NotFound(format!("item {} not found", line.item_id)))?;

            if item.merchant_id != order.merchant_id {
                return Err(AppError::InvalidInput(format!(
                    "item {} does not belong to merchant {}",
                    item.id, order.merchant_id
                )));
            }

            total = item
                .price
                .checked_mul(Decimal::from(line.quantity))
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| AppError::InvalidInput("total price overflows".to_string()))?;
        }
    }

    Ok(total)
}

pub fn delivery_minutes(distance_km: f64, average_speed_kmh: f64) -> f64 {
    distance_km / average_speed_kmh * MINUTES_PER_HOUR
}
