//! Persistence collaborators consumed by the engine services.
//!
//! Services only see these traits; [`memory::MemoryStore`] is the in-process
//! implementation used for wiring and tests.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::catalog::{Item, Merchant};
use crate::models::estimate::DeliveryEstimate;
use crate::models::location::GeoPoint;
use crate::models::order::{Order, OrderItem, OrderRow};
use crate::models::search::{MerchantFilters, RankedMerchant};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("constraint conflict: {0}")]
    Conflict(String),

    #[error("estimate {0} already consumed")]
    EstimateConsumed(Uuid),
}

/// Read access to merchants and their items.
#[async_trait]
pub trait MerchantCatalog: Send + Sync {
    /// Merchants matching `filters`, nearest to `origin` first.
    async fn query_merchants(
        &self,
        filters: &MerchantFilters,
        origin: &GeoPoint,
    ) -> Result<Vec<RankedMerchant>, StoreError>;

    async fn items_by_merchant_ids(
        &self,
        merchant_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Item>>, StoreError>;

    /// Unknown ids are skipped; order is not significant.
    async fn items_by_ids(&self, item_ids: &[Uuid]) -> Result<Vec<Item>, StoreError>;

    /// Unknown ids are skipped; order is not significant.
    async fn merchants_by_ids(&self, merchant_ids: &[Uuid]) -> Result<Vec<Merchant>, StoreError>;
}

#[async_trait]
pub trait EstimateStore: Send + Sync {
    async fn save(&self, estimate: DeliveryEstimate) -> Result<DeliveryEstimate, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryEstimate>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically consumes `estimate_id` and persists the order with its items.
    ///
    /// Either every row is written and the estimate is marked consumed, or
    /// nothing changes.
    async fn create_order_with_items(
        &self,
        estimate_id: Uuid,
        order: Order,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError>;

    /// Flat order/merchant/item rows for `user_id`, newest order first.
    async fn query_orders(
        &self,
        user_id: Uuid,
        filters: &MerchantFilters,
    ) -> Result<Vec<OrderRow>, StoreError>;
}
