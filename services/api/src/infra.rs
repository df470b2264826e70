use metrics_exporter_prometheus::PrometheusHandle;
use state_ratings::config::AppConfig;
use state_ratings::error::AppError;
use state_ratings::ratings::{ConfiguredStore, RaterDirectory, RatingService};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type AppService = RatingService<ConfiguredStore, ConfiguredStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Opens the configured store and wires the rating service over it.
pub(crate) fn build_service(config: &AppConfig) -> Result<Arc<AppService>, AppError> {
    let store = Arc::new(ConfiguredStore::open(&config.store)?);
    let service = RatingService::new(
        store.clone(),
        store,
        RaterDirectory::new(config.raters.clone()),
    );

    if config.seed_default_criteria {
        service.seed_default_criteria()?;
    }

    Ok(Arc::new(service))
}
