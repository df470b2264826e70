use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_rating_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use state_ratings::config::AppConfig;
use state_ratings::error::AppError;
use state_ratings::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let config = apply_overrides(AppConfig::load()?, args);
    telemetry::init(&config.telemetry)?;

    let readiness = Arc::new(AtomicBool::new(false));
    let app = build_app(&config, readiness.clone())?;

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(
        environment = ?config.environment,
        %addr,
        store = ?config.store.backend,
        raters = config.raters.len(),
        "state ratings service listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn apply_overrides(mut config: AppConfig, args: ServeArgs) -> AppConfig {
    let ServeArgs { host, port } = args;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
}

/// Rating routes plus operational endpoints, wrapped in request metrics.
fn build_app(config: &AppConfig, readiness: Arc<AtomicBool>) -> Result<Router, AppError> {
    let (metrics_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let state = AppState {
        readiness,
        metrics: Arc::new(metrics_handle),
    };

    let service = build_service(config)?;
    Ok(with_rating_routes(service)
        .layer(Extension(state))
        .layer(metrics_layer))
}
