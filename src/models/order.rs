use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::catalog::{Item, ItemCategory, Merchant};
use crate::models::search::{MerchantFilters, MerchantView};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub merchant_id: Uuid,
    pub item_id: Uuid,
    pub quantity: u32,
}

/// One order line joined with its order, merchant and item.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub order_id: Uuid,
    pub total_price: Decimal,
    pub order_created_at: DateTime<Utc>,
    pub merchant: Merchant,
    pub item: Item,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    pub filters: MerchantFilters,
    /// Window over whole orders; `None` returns every matching order.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderedItemView {
    pub item_id: Uuid,
    pub name: String,
    pub product_category: ItemCategory,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantOrderGroup {
    pub merchant: MerchantView,
    pub items: Vec<OrderedItemView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub total_price: Decimal,
    pub created_at: String,
    pub orders: Vec<MerchantOrderGroup>,
}
