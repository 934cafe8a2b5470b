use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::catalog::{Item, ItemCategory, Merchant, MerchantCategory};
use crate::models::format_timestamp;
use crate::models::location::GeoPoint;

/// Recognized merchant predicates shared by nearby search and order history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantFilters {
    pub merchant_id: Option<Uuid>,
    /// Case-insensitive substring over the merchant name or any of its item names.
    pub name: Option<String>,
    pub category: Option<MerchantCategory>,
}

impl MerchantFilters {
    /// Lower-cased name needle, `None` when absent or blank.
    pub fn name_needle(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub filters: MerchantFilters,
    /// Page size; `None` or zero falls back to the configured default.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Catalog match annotated with straight-line distance from the searcher.
#[derive(Debug, Clone)]
pub struct RankedMerchant {
    pub merchant: Merchant,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantView {
    pub merchant_id: Uuid,
    pub name: String,
    pub merchant_category: MerchantCategory,
    pub image_url: String,
    pub location: GeoPoint,
    pub created_at: String,
}

impl From<&Merchant> for MerchantView {
    fn from(merchant: &Merchant) -> Self {
        Self {
            merchant_id: merchant.id,
            name: merchant.name.clone(),
            merchant_category: merchant.category,
            image_url: merchant.image_url.clone(),
            location: merchant.location,
            created_at: format_timestamp(&merchant.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub item_id: Uuid,
    pub name: String,
    pub product_category: ItemCategory,
    pub price: Decimal,
    pub image_url: String,
    pub created_at: String,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id,
            name: item.name.clone(),
            product_category: item.category,
            price: item.price,
            image_url: item.image_url.clone(),
            created_at: format_timestamp(&item.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantWithItems {
    pub merchant: MerchantView,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyPage {
    pub data: Vec<MerchantWithItems>,
    pub meta: PageMeta,
}
