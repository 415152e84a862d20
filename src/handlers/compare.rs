use axum::{
    extract::State,
    Json,
};
use tracing::instrument;

use crate::dtos::product::{CompareQuery, RetailProductResponse};
use crate::dtos::{ValidatedPath, ValidatedQuery};
use crate::error::AppError;
use crate::feed::{comparable_listings, rank_by_distance};
use crate::geo::Coordinates;
use crate::state::AppState;

// GET /api/compare/:productId - Same or similar products from other sellers
#[instrument(skip(store))]
pub async fn compare_prices(
    ValidatedPath(product_id): ValidatedPath<i64>,
    State(AppState { store, .. }): State<AppState>,
    ValidatedQuery(params): ValidatedQuery<CompareQuery>,
) -> Result<Json<Vec<RetailProductResponse>>, AppError> {
    let reference = store
        .get_product(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    let origin = Coordinates::parse_pair(params.lat, params.lng)?;
    let feed = rank_by_distance(store.list_active_listings().await?, origin, None);

    let response = comparable_listings(&reference, feed)
        .into_iter()
        .map(RetailProductResponse::from)
        .collect();
    Ok(Json(response))
}
