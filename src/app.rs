use axum::{
    http::{header, Method},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::{AppConfig, CorsOrigin};
use crate::routes::{system_routes, text_routes};
use crate::services::text_service::TextStore;

/// Build the complete Axum application:
/// - /api/texts   (read / save a text by key)
/// - /health      (liveness)
///
/// `texts` carries the gateway handle injected at startup.
/// `cfg` supplies the CORS origin.
pub fn build_app(texts: TextStore, cfg: &AppConfig) -> Router {
    Router::new()
        // /api/texts/*
        .nest("/api/texts", text_routes::routes(texts))

        // /health
        .merge(system_routes::routes())

        .layer(cors_layer(&cfg.cors_origin))

        // Logging middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn cors_layer(origin: &CorsOrigin) -> CorsLayer {
    let allow_origin = match origin {
        CorsOrigin::Any => AllowOrigin::any(),
        CorsOrigin::Exact(value) => AllowOrigin::exact(value.clone()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(false)
}
