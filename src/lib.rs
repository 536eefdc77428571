pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::ServiceConfig;
use crate::services::transcode_service::TranscodeService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Request, Response},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{Span, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::home,
        api::handlers::health::health_check,
        api::handlers::process::process_video,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "system", description = "Service status endpoints"),
        (name = "video", description = "Video processing endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub transcoder: Arc<TranscodeService>,
    pub config: ServiceConfig,
}

pub fn create_app(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &Request<_>, _span: &Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
            info!(
                "📤 Finished in {:?} with status {}",
                latency,
                response.status()
            );
        });

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::health::home))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/process-video",
            // Oversized bodies are refused up front by Content-Length and
            // again while streaming when the length is not declared.
            post(api::handlers::process::process_video).layer(
                ServiceBuilder::new()
                    .layer(RequestBodyLimitLayer::new(state.config.max_upload_size))
                    .layer(DefaultBodyLimit::max(state.config.max_upload_size)),
            ),
        )
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(trace_layer)
        // Outermost, so the trace span already sees the request id
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
