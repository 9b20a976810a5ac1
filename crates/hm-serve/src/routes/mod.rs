pub mod error;
pub mod events;
pub mod health;
pub mod media;

use crate::middleware::correlation::correlation_middleware;
use crate::middleware::identity::identity_middleware;
use crate::{AppState, openapi};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(events::router(state.clone()))
        .merge(health::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route_layer(middleware::from_fn(identity_middleware))
        .route_layer(middleware::from_fn(correlation_middleware));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}
