//! The three thin HTTP façades, assembled behind one Axum router and one
//! listener: `Data` (consumed by running scripts), `Control` (the
//! operator), and `Public` (reachable from the human's browser).

mod control;
mod data;
mod public;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cors::cors_layer;
use crate::state::AppState;

/// Bits of the static `Settings` the router needs to wire up; kept as plain
/// fields (rather than reading the global `settings()` singleton directly)
/// so the router can be assembled against a throwaway configuration in
/// tests.
pub struct RouterConfig<'a> {
    pub cors_allowed_origins: &'a [String],
    pub static_dir: &'a str,
}

pub fn router(state: AppState, config: &RouterConfig<'_>) -> Router {
    let public = Router::new()
        .route("/answer/:question_id", post(public::answer))
        .layer(cors_layer(config.cors_allowed_origins));

    let control = Router::new()
        .route("/channel/open", get(control::open_channel))
        .route("/channel/:channel_id/events", get(control::channel_events))
        .route("/run/:user", post(control::run))
        .nest_service("/static", ServeDir::new(config.static_dir));

    let data = Router::new()
        .route("/data/:handle", post(data::create_token))
        .route(
            "/data/:handle/:key",
            get(data::get_value).put(data::put_value),
        );

    Router::new()
        .merge(public)
        .merge(control)
        .merge(data)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
