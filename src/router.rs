use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{get_url, health_handler, list_urls, metrics_handler, submit_url, throttle};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/url", post(submit_url).get(get_url))
        .route("/urls", get(list_urls))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), throttle));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", api)
        .with_state(state)
}
