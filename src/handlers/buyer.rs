use axum::{
    extract::State,
    Extension, Json,
};
use tracing::instrument;

use crate::dtos::buyer::BuyerActionResponse;
use crate::dtos::product::ProductResponse;
use crate::dtos::{SuccessResponse, ValidatedPath};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::product::{BuyerAction, BuyerActionUpsert};
use crate::state::AppState;
use crate::store::MarketStore;

// POST /api/buyer/save/:productId
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn save_product(
    ValidatedPath(product_id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BuyerActionResponse>, AppError> {
    let action = record(store.as_ref(), &auth, product_id, Some(true)).await?;
    Ok(Json(action.into()))
}

// DELETE /api/buyer/save/:productId
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn unsave_product(
    ValidatedPath(product_id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<SuccessResponse>, AppError> {
    record(store.as_ref(), &auth, product_id, Some(false)).await?;
    Ok(Json(SuccessResponse::ok()))
}

// POST /api/buyer/view/:productId - Marks viewed, leaves the saved flag as is
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn view_product(
    ValidatedPath(product_id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<SuccessResponse>, AppError> {
    record(store.as_ref(), &auth, product_id, None).await?;
    Ok(Json(SuccessResponse::ok()))
}

// GET /api/buyer/saved
#[instrument(skip(store, auth), fields(user_id = auth.user_id))]
pub async fn get_saved_products(
    State(AppState { store, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = store.list_saved_products(auth.user_id).await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

async fn record(
    store: &dyn MarketStore,
    auth: &AuthContext,
    product_id: i64,
    saved: Option<bool>,
) -> Result<BuyerAction, AppError> {
    if store.get_product(product_id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }

    store
        .upsert_buyer_action(&BuyerActionUpsert {
            buyer_id: auth.user_id,
            product_id,
            saved,
            viewed: true,
        })
        .await
}
