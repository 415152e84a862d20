use chrono::{DateTime, Utc};

use crate::geo::Coordinates;
use crate::models::user::Seller;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub retail_price: f64,
    pub wholesale_price: Option<f64>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub seller_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub retail_price: f64,
    pub wholesale_price: Option<f64>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
}

/// Column updates for an existing product. `None` keeps the stored value;
/// on nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub retail_price: Option<f64>,
    pub wholesale_price: Option<Option<f64>>,
    pub image_url: Option<Option<String>>,
    pub quantity: Option<i32>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub location: Option<Option<Coordinates>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WholesaleTier {
    pub id: i64,
    pub product_id: i64,
    pub min_quantity: i32,
    pub price_per_unit: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewTier {
    pub min_quantity: i32,
    pub price_per_unit: f64,
}

/// An active product joined with its seller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub product: Product,
    pub seller: Seller,
}

impl ProductListing {
    /// The product's own coordinates, falling back to the seller's.
    pub fn effective_location(&self) -> Option<Coordinates> {
        self.product.location.or(self.seller.location)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyerAction {
    pub id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    pub saved: bool,
    pub viewed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Upsert keyed on (buyer, product). `saved: None` keeps the stored flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyerActionUpsert {
    pub buyer_id: i64,
    pub product_id: i64,
    pub saved: Option<bool>,
    pub viewed: bool,
}
