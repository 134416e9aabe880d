pub mod error;
pub mod routes;
pub mod state;
pub mod supervisor;
pub mod ws;

use axum::{Router, routing::{get, post}};
use state::AppState;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Slow-client protection for the control plane: a handler that hasn't
/// responded in this long gets a 408 instead of holding the connection open.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP control plane (C6): room lifecycle and stats, bound to
/// `app.host:app.port`.
pub fn build_control_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let room_routes = Router::new()
        .route("/create", post(routes::room::create))
        .route("/{room_id}/stop", post(routes::room::stop))
        .route("/{room_id}/stats", get(routes::room::stats));

    Router::new()
        .nest("/room", room_routes)
        .route("/stats", get(routes::room::server_stats))
        .route("/health", get(routes::room::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Signaling WebSocket server, bound to `app.host:signaling.websocket_port`
/// and kept on its own listener so control-plane load never backs up the
/// per-peer actor loops.
pub fn build_signaling_router(state: AppState) -> Router {
    Router::new()
        .route("/room/{room_id}/{role}", get(ws::handler::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
