// src/handlers/product.rs
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use crate::dtos::product::{
    tier_responses, CreateProductRequest, FeedQuery, ProductResponse, ProductWithTiersResponse,
    RetailProductResponse, SellerProductResponse, UpdateProductRequest, WholesaleProductResponse,
};
use crate::dtos::{SuccessResponse, ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::error::AppError;
use crate::feed::rank_by_distance;
use crate::handlers::current_user;
use crate::middleware::auth::AuthContext;
use crate::models::product::Product;
use crate::state::AppState;
use crate::store::MarketStore;

// GET /api/products/retail - Active products, distance-ranked when lat/lng given
#[instrument(skip(store))]
pub async fn get_retail_products(
    State(AppState { store, .. }): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<FeedQuery>,
) -> Result<Json<Vec<RetailProductResponse>>, AppError> {
    let (origin, radius) = params.origin_and_radius()?;
    let listings = store.list_active_listings().await?;

    let response = rank_by_distance(listings, origin, radius)
        .into_iter()
        .map(RetailProductResponse::from)
        .collect();
    Ok(Json(response))
}

// GET /api/products/wholesale - Wholesaler-owned active products with tiers
#[instrument(skip(store))]
pub async fn get_wholesale_products(
    State(AppState { store, .. }): State<AppState>,
) -> Result<Json<Vec<WholesaleProductResponse>>, AppError> {
    let listings = store.list_wholesale_listings().await?;
    let ids: Vec<i64> = listings.iter().map(|l| l.product.id).collect();
    let mut tiers = store.list_tiers_for(&ids).await?;

    let response = listings
        .into_iter()
        .map(|listing| {
            let product_tiers = tiers.remove(&listing.product.id).unwrap_or_default();
            WholesaleProductResponse {
                product: listing.product.into(),
                seller: listing.seller.into(),
                tiers: tier_responses(product_tiers),
            }
        })
        .collect();
    Ok(Json(response))
}

// GET /api/products/seller - The caller's own products with tiers and view counts
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn get_seller_products(
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<SellerProductResponse>>, AppError> {
    let products = store.list_products_by_seller(auth.user_id).await?;
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let mut tiers = store.list_tiers_for(&ids).await?;
    let views = store.count_views_for(&ids).await?;

    let response = products
        .into_iter()
        .map(|product| SellerProductResponse {
            tiers: tier_responses(tiers.remove(&product.id).unwrap_or_default()),
            views: views.get(&product.id).copied().unwrap_or(0),
            product: product.into(),
        })
        .collect();
    Ok(Json(response))
}

// GET /api/products/:id - Single product with tiers
#[instrument(skip(store))]
pub async fn get_product(
    ValidatedPath(id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
) -> Result<Json<ProductWithTiersResponse>, AppError> {
    let product = store
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    with_tiers(store.as_ref(), product).await.map(Json)
}

// POST /api/products - Create product (sellers and wholesalers only)
#[instrument(skip(store, auth, payload), fields(user_id = auth.user_id))]
pub async fn create_product(
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductWithTiersResponse>), AppError> {
    let user = current_user(store.as_ref(), &auth).await?;
    if !user.can_sell() {
        return Err(AppError::forbidden("Only sellers and wholesalers can create products"));
    }

    let (new_product, tiers) = payload.into_new_product(&user)?;
    let product = store.create_product(&new_product, &tiers).await?;
    info!(product_id = product.id, tiers = tiers.len(), "Product created");

    let body = with_tiers(store.as_ref(), product).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

// PATCH /api/products/:id - Update product (owner only); replaces tiers when supplied
#[instrument(skip(store, auth, payload), fields(user_id = auth.user_id))]
pub async fn update_product(
    ValidatedPath(id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<ProductWithTiersResponse>, AppError> {
    owned_product(store.as_ref(), id, &auth, "update").await?;

    let (patch, tiers) = payload.into_patch()?;
    let product = store
        .update_product(id, &patch, tiers.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    with_tiers(store.as_ref(), product).await.map(Json)
}

// DELETE /api/products/:id - Hard delete (owner only); cascades tiers and buyer actions
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn delete_product(
    ValidatedPath(id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<SuccessResponse>, AppError> {
    owned_product(store.as_ref(), id, &auth, "delete").await?;

    if !store.delete_product(id).await? {
        return Err(AppError::not_found("Product not found"));
    }

    info!(product_id = id, "Product deleted");
    Ok(Json(SuccessResponse::ok()))
}

async fn owned_product(
    store: &dyn MarketStore,
    id: i64,
    auth: &AuthContext,
    action: &str,
) -> Result<Product, AppError> {
    let product = store
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    if product.seller_id != auth.user_id {
        return Err(AppError::forbidden(format!("Not authorized to {action} this product")));
    }
    Ok(product)
}

async fn with_tiers(store: &dyn MarketStore, product: Product) -> Result<ProductWithTiersResponse, AppError> {
    let tiers = store.list_tiers(product.id).await?;
    Ok(ProductWithTiersResponse {
        product: ProductResponse::from(product),
        tiers: tier_responses(tiers),
    })
}
