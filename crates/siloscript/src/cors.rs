use axum::http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Permissive-by-default CORS for the Public façade: a human's browser,
/// origin unknown ahead of time, posts the answer to a question here.
pub fn cors_layer(configured_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(allowed_origins(configured_origins))
}

fn allowed_origins(configured: &[String]) -> AllowOrigin {
    if configured.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(configured.iter().filter_map(|o| o.parse().ok()))
    }
}
