// src/dtos/product.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::dtos::{clean, clean_patch, empty_as_none, nullable, round_price};
use crate::error::{AppError, AppResult};
use crate::feed::RankedListing;
use crate::geo::Coordinates;
use crate::models::product::{NewProduct, NewTier, Product, ProductPatch, WholesaleTier};
use crate::models::user::{Role, Seller, User};
use crate::tiers::{normalize_tiers, TierPriceInput};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 0.0, max = 9999999999.99, message = "Retail price must be between 0 and 9999999999.99"))]
    pub retail_price: f64,
    #[validate(range(min = 0.0, max = 9999999999.99, message = "Wholesale price must be between 0 and 9999999999.99"))]
    pub wholesale_price: Option<f64>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 255))]
    pub state: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub tier_prices: Option<Vec<TierPriceInput>>,
}

impl CreateProductRequest {
    /// Builds the insert payload for `seller`; unset location fields fall
    /// back to the seller's profile.
    pub fn into_new_product(self, seller: &User) -> AppResult<(NewProduct, Vec<NewTier>)> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::invalid_field("name", "Name is required"));
        }
        check_finite("retailPrice", Some(self.retail_price))?;
        check_finite("wholesalePrice", self.wholesale_price)?;

        let location = Coordinates::parse_pair(self.lat, self.lng)?.or(seller.location);
        let tiers = normalize_tiers(self.tier_prices.as_deref().unwrap_or_default())?;

        let product = NewProduct {
            seller_id: seller.id,
            name,
            description: clean(self.description),
            category: clean(self.category),
            retail_price: round_price(self.retail_price),
            wholesale_price: self.wholesale_price.map(round_price),
            image_url: clean(self.image_url),
            quantity: self.quantity.unwrap_or(0),
            city: clean(self.city).or_else(|| seller.city.clone()),
            state: clean(self.state).or_else(|| seller.state.clone()),
            location,
        };
        Ok((product, tiers))
    }
}

/// PATCH body. Absent fields keep their value; `null` (or `""`) clears the
/// nullable ones.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 100))]
    pub category: Option<Option<String>>,
    #[validate(range(min = 0.0, max = 9999999999.99, message = "Retail price must be between 0 and 9999999999.99"))]
    pub retail_price: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 0.0, max = 9999999999.99, message = "Wholesale price must be between 0 and 9999999999.99"))]
    pub wholesale_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 2048))]
    pub image_url: Option<Option<String>>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 255))]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(length(max = 255))]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub lat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub lng: Option<Option<f64>>,
    pub is_active: Option<bool>,
    pub tier_prices: Option<Vec<TierPriceInput>>,
}

impl UpdateProductRequest {
    /// Column patch plus the replacement tier list, if one was supplied.
    pub fn into_patch(self) -> AppResult<(ProductPatch, Option<Vec<NewTier>>)> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::invalid_field("name", "Name is required"));
            }
            other => other.map(|n| n.trim().to_string()),
        };
        check_finite("retailPrice", self.retail_price)?;
        check_finite("wholesalePrice", self.wholesale_price.flatten())?;

        // Both halves set, both cleared, or both left out.
        let location = match (self.lat, self.lng) {
            (None, None) => None,
            (Some(None), Some(None)) => Some(None),
            (Some(lat), Some(lng)) => Some(Coordinates::parse_pair(lat, lng)?),
            _ => {
                return Err(AppError::invalid_field(
                    "lat",
                    "Latitude and longitude must be supplied together",
                ))
            }
        };

        let tiers = self
            .tier_prices
            .as_deref()
            .map(normalize_tiers)
            .transpose()?;

        let patch = ProductPatch {
            name,
            description: clean_patch(self.description),
            category: clean_patch(self.category),
            retail_price: self.retail_price.map(round_price),
            wholesale_price: self.wholesale_price.map(|p| p.map(round_price)),
            image_url: clean_patch(self.image_url),
            quantity: self.quantity,
            city: clean_patch(self.city),
            state: clean_patch(self.state),
            location,
            is_active: self.is_active,
        };
        Ok((patch, tiers))
    }
}

fn check_finite(field: &str, value: Option<f64>) -> AppResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(AppError::invalid_field(field, "Must be a number")),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub radius: Option<f64>,
}

impl FeedQuery {
    /// Query point and radius, validated.
    pub fn origin_and_radius(&self) -> AppResult<(Option<Coordinates>, Option<f64>)> {
        let origin = Coordinates::parse_pair(self.lat, self.lng)?;
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(AppError::invalid_field("radius", "Radius must be a positive number"));
            }
        }
        Ok((origin, self.radius))
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
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
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Convert from Model to Response DTO
impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            seller_id: product.seller_id,
            name: product.name,
            description: product.description,
            category: product.category,
            retail_price: product.retail_price,
            wholesale_price: product.wholesale_price,
            image_url: product.image_url,
            quantity: product.quantity,
            city: product.city,
            state: product.state,
            lat: product.location.map(|c| c.lat),
            lng: product.location.map(|c| c.lng),
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierResponse {
    pub id: i64,
    pub product_id: i64,
    pub min_quantity: i32,
    pub price_per_unit: f64,
    pub created_at: DateTime<Utc>,
}

impl From<WholesaleTier> for TierResponse {
    fn from(tier: WholesaleTier) -> Self {
        Self {
            id: tier.id,
            product_id: tier.product_id,
            min_quantity: tier.min_quantity,
            price_per_unit: tier.price_per_unit,
            created_at: tier.created_at,
        }
    }
}

pub fn tier_responses(tiers: Vec<WholesaleTier>) -> Vec<TierResponse> {
    tiers.into_iter().map(TierResponse::from).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerResponse {
    pub id: i64,
    pub username: String,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl From<Seller> for SellerResponse {
    fn from(seller: Seller) -> Self {
        Self {
            id: seller.id,
            username: seller.username,
            role: seller.role,
            city: seller.city,
            state: seller.state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductWithTiersResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub tiers: Vec<TierResponse>,
}

#[derive(Debug, Serialize)]
pub struct RetailProductResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub seller: SellerResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<RankedListing> for RetailProductResponse {
    fn from(ranked: RankedListing) -> Self {
        Self {
            product: ranked.listing.product.into(),
            seller: ranked.listing.seller.into(),
            distance: ranked.distance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WholesaleProductResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub seller: SellerResponse,
    pub tiers: Vec<TierResponse>,
}

#[derive(Debug, Serialize)]
pub struct SellerProductResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub tiers: Vec<TierResponse>,
    pub views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seller() -> User {
        User {
            id: 7,
            username: "mama-put".to_string(),
            password_hash: String::new(),
            role: Some(Role::Seller),
            city: Some("Lagos".to_string()),
            state: Some("Lagos".to_string()),
            location: Some(Coordinates::new(6.5244, 3.3792)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_request(body: serde_json::Value) -> CreateProductRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn create_defaults_location_to_seller() {
        let req = create_request(json!({ "name": "  Honey Beans ", "retailPrice": 1500.0 }));
        let (product, tiers) = req.into_new_product(&seller()).unwrap();

        assert_eq!(product.name, "Honey Beans");
        assert_eq!(product.seller_id, 7);
        assert_eq!(product.city.as_deref(), Some("Lagos"));
        assert_eq!(product.location, Some(Coordinates::new(6.5244, 3.3792)));
        assert_eq!(product.quantity, 0);
        assert!(tiers.is_empty());
    }

    #[test]
    fn create_keeps_own_location_and_orders_tiers() {
        let req = create_request(json!({
            "name": "Rice",
            "retailPrice": 12000.0,
            "lat": 9.0765,
            "lng": 7.3986,
            "tierPrices": [
                { "minQuantity": 25, "pricePerUnit": 10500 },
                { "minQuantity": 10, "pricePerUnit": 11000 }
            ]
        }));
        let (product, tiers) = req.into_new_product(&seller()).unwrap();

        assert_eq!(product.location, Some(Coordinates::new(9.0765, 7.3986)));
        let mins: Vec<i32> = tiers.iter().map(|t| t.min_quantity).collect();
        assert_eq!(mins, vec![10, 25]);
    }

    #[test]
    fn create_rejects_blank_name_and_half_coordinates() {
        let req = create_request(json!({ "name": "   ", "retailPrice": 1.0 }));
        assert!(matches!(req.into_new_product(&seller()), Err(AppError::ValidationError { .. })));

        let req = create_request(json!({ "name": "Rice", "retailPrice": 1.0, "lat": 6.5 }));
        assert!(matches!(req.into_new_product(&seller()), Err(AppError::ValidationError { .. })));
    }

    #[test]
    fn create_validation_flags_negative_price() {
        let req = create_request(json!({ "name": "Rice", "retailPrice": -5.0 }));
        let err: AppError = req.validate().unwrap_err().into();
        match err {
            AppError::ValidationError { fields, .. } => assert_eq!(fields[0].field, "retailPrice"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn update_without_tiers_leaves_them_alone() {
        let req: UpdateProductRequest = serde_json::from_value(json!({ "isActive": false })).unwrap();
        let (patch, tiers) = req.into_patch().unwrap();

        assert_eq!(patch.is_active, Some(false));
        assert!(tiers.is_none());
    }

    #[test]
    fn update_with_empty_tiers_clears_them() {
        let req: UpdateProductRequest = serde_json::from_value(json!({ "tierPrices": [] })).unwrap();
        let (_, tiers) = req.into_patch().unwrap();

        assert_eq!(tiers, Some(Vec::new()));
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let req: UpdateProductRequest = serde_json::from_value(json!({
            "wholesalePrice": null,
            "category": "",
            "lat": null,
            "lng": null
        }))
        .unwrap();
        let (patch, _) = req.into_patch().unwrap();

        assert_eq!(patch.wholesale_price, Some(None));
        assert_eq!(patch.category, Some(None));
        assert_eq!(patch.location, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.city, None);
    }

    #[test]
    fn update_rejects_mixed_coordinate_changes() {
        let req: UpdateProductRequest =
            serde_json::from_value(json!({ "lat": 6.5, "lng": null })).unwrap();
        assert!(matches!(req.into_patch(), Err(AppError::ValidationError { .. })));

        let req: UpdateProductRequest = serde_json::from_value(json!({ "lat": 6.5 })).unwrap();
        assert!(matches!(req.into_patch(), Err(AppError::ValidationError { .. })));
    }

    #[test]
    fn prices_above_column_range_are_rejected() {
        let req = create_request(json!({ "name": "Rice", "retailPrice": 1e12 }));
        assert!(req.validate().is_err());

        let req: UpdateProductRequest =
            serde_json::from_value(json!({ "wholesalePrice": 1e12 })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn prices_are_rounded_to_cents() {
        let req = create_request(json!({ "name": "Rice", "retailPrice": 10.456, "wholesalePrice": 9.994 }));
        let (product, _) = req.into_new_product(&seller()).unwrap();

        assert_eq!(product.retail_price, 10.46);
        assert_eq!(product.wholesale_price, Some(9.99));
    }

    #[test]
    fn feed_query_validates_radius() {
        let q = FeedQuery { lat: Some(6.5), lng: Some(3.3), radius: Some(0.0) };
        assert!(q.origin_and_radius().is_err());

        let q = FeedQuery { lat: None, lng: None, radius: Some(10.0) };
        assert_eq!(q.origin_and_radius().unwrap(), (None, Some(10.0)));
    }

    #[test]
    fn retail_response_omits_missing_distance() {
        let product = Product {
            id: 1,
            seller_id: 7,
            name: "Rice".to_string(),
            description: None,
            category: None,
            retail_price: 1.0,
            wholesale_price: None,
            image_url: None,
            quantity: 0,
            city: None,
            state: None,
            location: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response = RetailProductResponse {
            product: product.into(),
            seller: Seller::from(&seller()).into(),
            distance: None,
        };
        let value = serde_json::to_value(&response).unwrap();

        assert!(value.get("distance").is_none());
        assert_eq!(value["retailPrice"], json!(1.0));
        assert_eq!(value["seller"]["username"], json!("mama-put"));
    }
}
