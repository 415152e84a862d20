pub mod buyer;
pub mod compare;
pub mod products;
pub mod users;

use std::time::Duration;

use axum::{
    http::{header::{AUTHORIZATION, CONTENT_TYPE}, Method},
    routing::get,
    Router,
};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

use crate::state::AppState;

/// Resource routes, relative to the `/api` prefix.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(products::routes(state))
        .merge(users::routes(state))
        .merge(buyer::routes(state))
        .merge(compare::routes())
}

/// Full application: `/api` resources, health check, CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .nest("/api", create_router(&state))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
