use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use state_ratings::ratings::{rating_router, CriterionRepository, RatingRepository, RatingService};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub(crate) fn with_rating_routes<C, R>(service: Arc<RatingService<C, R>>) -> Router
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    rating_router(service)
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
}

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn ready(Extension(state): Extension<AppState>) -> impl IntoResponse {
    match state.readiness.load(Ordering::Acquire) {
        true => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        false => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        ),
    }
}

pub(crate) async fn metrics(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}
