use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

pub const BANNER: &str = "FFmpeg API is running!";

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub ffmpeg: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = String, content_type = "text/plain")
    ),
    tag = "system"
)]
pub async fn home() -> &'static str {
    BANNER
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        ffmpeg: state.transcoder.program(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
