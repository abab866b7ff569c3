//! Agora HTTP API.
//!
//! Translates requests into social commands sent through the message bus,
//! and serves reads from the query handlers.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the application router over `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::posts::router())
        .merge(routes::comments::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
