use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::catalog::{Item, Merchant, NewItem, NewMerchant};
use crate::models::estimate::{DeliveryEstimate, EstimateStatus};
use crate::models::location::GeoPoint;
use crate::models::order::{Order, OrderItem, OrderRow};
use crate::models::search::{MerchantFilters, RankedMerchant};
use crate::store::{EstimateStore, MerchantCatalog, OrderStore, StoreError};

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 30;

/// Rows that must change together; guarded by a single lock.
#[derive(Default)]
struct Ledger {
    estimates: HashMap<Uuid, DeliveryEstimate>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

#[derive(Default)]
pub struct MemoryStore {
    merchants: DashMap<Uuid, Merchant>,
    items: DashMap<Uuid, Item>,
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_merchant(&self, payload: NewMerchant) -> Result<Merchant, AppError> {
        validate_name("merchant name", &payload.name)?;
        validate_image_url(&payload.image_url)?;
        validate_location(&payload.location)?;

        let merchant = Merchant {
            id: Uuid::now_v7(),
            name: payload.name,
            category: payload.category,
            image_url: payload.image_url,
            location: payload.location,
            created_at: Utc::now(),
        };

        self.merchants.insert(merchant.id, merchant.clone());
        Ok(merchant)
    }

    pub fn add_item(&self, merchant_id: Uuid, payload: NewItem) -> Result<Item, AppError> {
        if !self.merchants.contains_key(&merchant_id) {
            return Err(AppError::NotFound(format!(
                "merchant {merchant_id} not found"
            )));
        }
        validate_name("item name", &payload.name)?;
        validate_image_url(&payload.image_url)?;
        if payload.price <= Decimal::ZERO {
            return Err(AppError::InvalidInput("price must be > 0".to_string()));
        }

        let item = Item {
            id: Uuid::now_v7(),
            merchant_id,
            name: payload.name,
            category: payload.category,
            price: payload.price,
            image_url: payload.image_url,
            created_at: Utc::now(),
        };

        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    pub fn set_item_price(&self, item_id: Uuid, price: Decimal) -> Result<(), AppError> {
        if price <= Decimal::ZERO {
            return Err(AppError::InvalidInput("price must be > 0".to_string()));
        }
        let mut item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("item {item_id} not found")))?;
        item.price = price;
        Ok(())
    }

    pub fn merchant_count(&self) -> usize {
        self.merchants.len()
    }

    pub async fn estimate_count(&self) -> usize {
        self.ledger.lock().await.estimates.len()
    }

    pub async fn order_count(&self) -> usize {
        self.ledger.lock().await.orders.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.ledger.lock().await.order_items.len()
    }

    /// Merchants owning at least one item whose lower-cased name contains `needle`.
    fn merchants_with_item_named(&self, needle: &str) -> HashSet<Uuid> {
        self.items
            .iter()
            .filter(|entry| entry.value().name.to_lowercase().contains(needle))
            .map(|entry| entry.value().merchant_id)
            .collect()
    }

    fn name_hits(&self, filters: &MerchantFilters) -> Option<(String, HashSet<Uuid>)> {
        filters.name_needle().map(|needle| {
            let hits = self.merchants_with_item_named(&needle);
            (needle, hits)
        })
    }
}

fn matches_filters(
    merchant: &Merchant,
    filters: &MerchantFilters,
    name_hits: Option<&(String, HashSet<Uuid>)>,
) -> bool {
    if let Some(id) = filters.merchant_id {
        if merchant.id != id {
            return false;
        }
    }
    if let Some(category) = filters.category {
        if merchant.category != category {
            return false;
        }
    }
    if let Some((needle, item_hits)) = name_hits {
        let name_match = merchant.name.to_lowercase().contains(needle.as_str());
        if !name_match && !item_hits.contains(&merchant.id) {
            return false;
        }
    }
    true
}

fn validate_name(field: &str, name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(AppError::InvalidInput(format!(
            "{field} must be {NAME_MIN_CHARS}-{NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_image_url(url: &str) -> Result<(), AppError> {
    if url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "image url cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_location(location: &GeoPoint) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lng) {
        return Err(AppError::InvalidInput(format!(
            "location ({}, {}) is out of range",
            location.lat, location.lng
        )));
    }
    Ok(())
}

#[async_trait]
impl MerchantCatalog for MemoryStore {
    async fn query_merchants(
        &self,
        filters: &MerchantFilters,
        origin: &GeoPoint,
    ) -> Result<Vec<RankedMerchant>, StoreError> {
        let name_hits = self.name_hits(filters);

        let mut ranked: Vec<RankedMerchant> = self
            .merchants
            .iter()
            .filter(|entry| matches_filters(entry.value(), filters, name_hits.as_ref()))
            .map(|entry| {
                let merchant = entry.value().clone();
                let distance_km = haversine_km(origin, &merchant.location);
                RankedMerchant {
                    merchant,
                    distance_km,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.merchant.created_at.cmp(&b.merchant.created_at))
                .then_with(|| a.merchant.id.cmp(&b.merchant.id))
        });

        Ok(ranked)
    }

    async fn items_by_merchant_ids(
        &self,
        merchant_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Item>>, StoreError> {
        let wanted: HashSet<&Uuid> = merchant_ids.iter().collect();
        let mut grouped: HashMap<Uuid, Vec<Item>> = HashMap::new();

        for entry in self.items.iter() {
            let item = entry.value();
            if wanted.contains(&item.merchant_id) {
                grouped.entry(item.merchant_id).or_default().push(item.clone());
            }
        }

        for items in grouped.values_mut() {
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        }

        Ok(grouped)
    }

    async fn items_by_ids(&self, item_ids: &[Uuid]) -> Result<Vec<Item>, StoreError> {
        let unique: HashSet<&Uuid> = item_ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| self.items.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn merchants_by_ids(&self, merchant_ids: &[Uuid]) -> Result<Vec<Merchant>, StoreError> {
        let unique: HashSet<&Uuid> = merchant_ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| self.merchants.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

#[async_trait]
impl EstimateStore for MemoryStore {
    async fn save(&self, estimate: DeliveryEstimate) -> Result<DeliveryEstimate, StoreError> {
        let mut ledger = self.ledger.lock().await;
        if ledger.estimates.contains_key(&estimate.id) {
            return Err(StoreError::Conflict(format!(
                "estimate {} already exists",
                estimate.id
            )));
        }
        ledger.estimates.insert(estimate.id, estimate.clone());
        Ok(estimate)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryEstimate>, StoreError> {
        Ok(self.ledger.lock().await.estimates.get(&id).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order_with_items(
        &self,
        estimate_id: Uuid,
        order: Order,
        items: Vec<OrderItem>,
    ) -> Result<Order, StoreError> {
        let mut ledger = self.ledger.lock().await;

        // Every check runs before the first write.
        let status = ledger
            .estimates
            .get(&estimate_id)
            .map(|estimate| estimate.status)
            .ok_or_else(|| StoreError::Conflict(format!("estimate {estimate_id} does not exist")))?;
        if status == EstimateStatus::Consumed {
            return Err(StoreError::EstimateConsumed(estimate_id));
        }
        if items.is_empty() {
            return Err(StoreError::Conflict(format!(
                "order {} has no items",
                order.id
            )));
        }
        if ledger.orders.iter().any(|existing| existing.id == order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        for line in &items {
            if line.order_id != order.id {
                return Err(StoreError::Conflict(format!(
                    "order item {} references order {}, expected {}",
                    line.id, line.order_id, order.id
                )));
            }
            if line.quantity == 0 {
                return Err(StoreError::Conflict(format!(
                    "order item {} has zero quantity",
                    line.id
                )));
            }
            if !self.merchants.contains_key(&line.merchant_id) {
                return Err(StoreError::Conflict(format!(
                    "order item {} references unknown merchant {}",
                    line.id, line.merchant_id
                )));
            }
            if !self.items.contains_key(&line.item_id) {
                return Err(StoreError::Conflict(format!(
                    "order item {} references unknown item {}",
                    line.id, line.item_id
                )));
            }
        }

        if let Some(estimate) = ledger.estimates.get_mut(&estimate_id) {
            estimate.status = EstimateStatus::Consumed;
        }
        ledger.orders.push(order.clone());
        ledger.order_items.extend(items);

        Ok(order)
    }

    async fn query_orders(
        &self,
        user_id: Uuid,
        filters: &MerchantFilters,
    ) -> Result<Vec<OrderRow>, StoreError> {
        let name_hits = self.name_hits(filters);
        let ledger = self.ledger.lock().await;
        let mut rows = Vec::new();

        for order in ledger.orders.iter().rev().filter(|order| order.user_id == user_id) {
            for line in ledger.order_items.iter().filter(|line| line.order_id == order.id) {
                let Some(merchant) = self.merchants.get(&line.merchant_id) else {
                    continue;
                };
                let Some(item) = self.items.get(&line.item_id) else {
                    continue;
                };
                if !matches_filters(merchant.value(), filters, name_hits.as_ref()) {
                    continue;
                }

                rows.push(OrderRow {
                    order_id: order.id,
                    total_price: order.total_price,
                    order_created_at: order.created_at,
                    merchant: merchant.value().clone(),
                    item: item.value().clone(),
                    quantity: line.quantity,
                });
            }
        }

        Ok(rows)
    }
}
