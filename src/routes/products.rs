use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use crate::handlers::product::{
    create_product, delete_product, get_product, get_retail_products, get_seller_products,
    get_wholesale_products, update_product,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/products/retail", get(get_retail_products))
        .route("/products/wholesale", get(get_wholesale_products))
        .route("/products/{id}", get(get_product));

    // Same path as the open GET; axum merges the method routers.
    let protected = Router::new()
        .route("/products", post(create_product))
        .route("/products/seller", get(get_seller_products))
        .route("/products/{id}", patch(update_product).delete(delete_product))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
