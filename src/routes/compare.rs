use axum::{routing::get, Router};
use crate::handlers::compare::compare_prices;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/compare/{product_id}", get(compare_prices))
}
