use crate::cli::ServeArgs;
use crate::infra::{load_engine, AppState, InMemoryPredictionRepository};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use churn_insight::config::AppConfig;
use churn_insight::error::AppError;
use churn_insight::predictions::PredictionService;
use churn_insight::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        environment: config.environment,
    };

    let engine = Arc::new(load_engine(&config.model));
    let repository = Arc::new(InMemoryPredictionRepository::default());
    let prediction_service = Arc::new(PredictionService::new(engine.clone(), repository));

    let app = with_service_routes(prediction_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        environment = config.environment.label(),
        %addr,
        scoring_mode = ?engine.mode(),
        features = engine.spec().len(),
        "churn scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
