use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use crate::handlers::buyer::{get_saved_products, save_product, unsave_product, view_product};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/buyer/save/{product_id}", post(save_product).delete(unsave_product))
        .route("/buyer/saved", get(get_saved_products))
        .route("/buyer/view/{product_id}", post(view_product))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
