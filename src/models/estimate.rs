use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub item_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubOrder {
    pub merchant_id: Uuid,
    pub is_starting_point: bool,
    pub items: Vec<OrderLine>,
}

/// Client-supplied basket spanning one or more merchants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub user_location: GeoPoint,
    pub orders: Vec<SubOrder>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EstimateStatus {
    Unconsumed,
    Consumed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEstimate {
    pub id: Uuid,
    pub user_id: Uuid,
    /// JSON encoding of the draft's sub-orders, replayed at finalization.
    pub snapshot: String,
    pub total_price: Decimal,
    pub estimated_delivery_minutes: f64,
    pub status: EstimateStatus,
    pub created_at: DateTime<Utc>,
}

impl DeliveryEstimate {
    pub fn encode_snapshot(orders: &[SubOrder]) -> Result<String, AppError> {
        serde_json::to_string(orders).map_err(|err| {
            StoreError::Serialization(format!("failed to encode snapshot: {err}")).into()
        })
    }

    pub fn sub_orders(&self) -> Result<Vec<SubOrder>, AppError> {
        serde_json::from_str(&self.snapshot).map_err(|err| {
            StoreError::Serialization(format!(
                "estimate {} has an unreadable snapshot: {err}",
                self.id
            ))
            .into()
        })
    }
}
