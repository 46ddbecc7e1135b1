//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// `/api/fetch` and `/api/delete` sit behind the bearer check; everything else
/// is public.
pub fn build(state: AppState, cors: CorsLayer) -> Router {
    let protected = Router::new()
        .route("/api/fetch", get(handlers::fetch_events))
        .route("/api/delete", delete(handlers::delete_event))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_bearer));

    Router::new()
        .route("/api", get(handlers::index))
        .route("/api/healthz", get(handlers::healthz))
        .route("/api/track", post(handlers::track_event))
        .route("/api/submission", post(handlers::submit))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
