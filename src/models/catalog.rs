use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MerchantCategory {
    SmallRestaurant,
    MediumRestaurant,
    LargeRestaurant,
    MerchandiseRestaurant,
    BoothKiosk,
    ConvenienceStore,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemCategory {
    Beverage,
    Food,
    Snack,
    Condiments,
    Additions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: Uuid,
    pub name: String,
    pub category: MerchantCategory,
    pub image_url: String,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub price: Decimal,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Registration payload for a merchant; id and creation time are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMerchant {
    pub name: String,
    pub category: MerchantCategory,
    pub image_url: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub category: ItemCategory,
    pub price: Decimal,
    pub image_url: String,
}
