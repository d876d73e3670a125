use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use churn_insight::error::AppError;
use churn_insight::predictions::{
    PredictionRecord, PredictionRepository, PredictionService, PredictionStatistics,
};
use churn_insight::scoring::{BatchEntry, FeatureSet, ModelInfo, RiskLevel, ScoringMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Confidence figure the prediction API has always reported alongside scores.
const REPORTED_CONFIDENCE: f64 = 0.95;

/// Company profile accepted by the prediction routes. `ingresos` and `gastos`
/// are required, the other features fall back to neutral values and unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PredictionRequest {
    pub(crate) cuit: String,
    pub(crate) ingresos: f64,
    pub(crate) gastos: f64,
    #[serde(default)]
    pub(crate) margen_operativo: f64,
    #[serde(default)]
    pub(crate) deuda_total: f64,
    #[serde(default)]
    pub(crate) activos_totales: f64,
    #[serde(default)]
    pub(crate) prestamos_solicitados: f64,
    #[serde(default)]
    pub(crate) prestamos_aprobados: f64,
    #[serde(default = "default_active_days")]
    pub(crate) trimestre_dias_actividad: f64,
    #[serde(default)]
    pub(crate) trimestre_logins_promedio: f64,
    #[serde(default)]
    pub(crate) transferencias_trimestre: f64,
    #[serde(default)]
    pub(crate) pagos_trimestre: f64,
    #[serde(default)]
    pub(crate) creditos_trimestre: f64,
}

fn default_active_days() -> f64 {
    90.0
}

impl PredictionRequest {
    pub(crate) fn features(&self) -> FeatureSet {
        FeatureSet::new()
            .with("ingresos", self.ingresos)
            .with("gastos", self.gastos)
            .with("margen_operativo", self.margen_operativo)
            .with("deuda_total", self.deuda_total)
            .with("activos_totales", self.activos_totales)
            .with("prestamos_solicitados", self.prestamos_solicitados)
            .with("prestamos_aprobados", self.prestamos_aprobados)
            .with("trimestre_dias_actividad", self.trimestre_dias_actividad)
            .with("trimestre_logins_promedio", self.trimestre_logins_promedio)
            .with("transferencias_trimestre", self.transferencias_trimestre)
            .with("pagos_trimestre", self.pagos_trimestre)
            .with("creditos_trimestre", self.creditos_trimestre)
    }
}

/// Companies stay raw JSON so one unreadable entry is skipped on its own
/// instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub(crate) struct BatchPredictionRequest {
    pub(crate) companies: Vec<Value>,
}

pub(crate) fn batch_entry(company: Value) -> BatchEntry {
    let identifier = match company.get("cuit") {
        Some(Value::String(cuit)) => cuit.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    match serde_json::from_value::<PredictionRequest>(company) {
        Ok(request) => BatchEntry::new(request.cuit.clone(), request.features()),
        Err(err) => BatchEntry::malformed(identifier, err.to_string()),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionResponse {
    pub(crate) cuit: String,
    pub(crate) probability: f64,
    pub(crate) risk_level: RiskLevel,
    pub(crate) confidence: f64,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) features_used: usize,
}

impl From<PredictionRecord> for PredictionResponse {
    fn from(record: PredictionRecord) -> Self {
        Self {
            cuit: record.cuit.to_string(),
            probability: record.probability,
            risk_level: record.risk_level,
            confidence: REPORTED_CONFIDENCE,
            timestamp: record.recorded_at,
            features_used: record.features_used,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchPredictionResponse {
    pub(crate) total_processed: usize,
    pub(crate) total_skipped: usize,
    pub(crate) total_high_risk: usize,
    pub(crate) total_medium_risk: usize,
    pub(crate) total_low_risk: usize,
    pub(crate) predictions: Vec<PredictionResponse>,
    pub(crate) timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RiskLevelResponse {
    pub(crate) risk_level: RiskLevel,
    pub(crate) count: usize,
    pub(crate) predictions: Vec<PredictionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatisticsResponse {
    #[serde(flatten)]
    pub(crate) statistics: PredictionStatistics,
    pub(crate) timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) version: &'static str,
    pub(crate) environment: &'static str,
    pub(crate) model_loaded: bool,
    pub(crate) scoring_mode: ScoringMode,
    pub(crate) timestamp: DateTime<Utc>,
}

/// Router exposing prediction and model introspection endpoints.
pub(crate) fn prediction_router<R>(service: Arc<PredictionService<R>>) -> Router
where
    R: PredictionRepository + 'static,
{
    Router::new()
        .route("/api/v1/predictions/predict", post(predict_handler::<R>))
        .route("/api/v1/predictions/batch", post(batch_handler::<R>))
        .route(
            "/api/v1/predictions/by-risk-level/:risk_level",
            get(by_risk_level_handler::<R>),
        )
        .route(
            "/api/v1/predictions/statistics",
            get(statistics_handler::<R>),
        )
        .route("/api/v1/health/check", get(health_check_handler::<R>))
        .route("/api/v1/health/model-info", get(model_info_handler::<R>))
        .with_state(service)
}

pub(crate) fn with_service_routes<R>(service: Arc<PredictionService<R>>) -> Router
where
    R: PredictionRepository + 'static,
{
    prediction_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn predict_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, AppError>
where
    R: PredictionRepository + 'static,
{
    let record = service.predict(&request.cuit, &request.features())?;
    Ok(Json(record.into()))
}

pub(crate) async fn batch_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
    Json(request): Json<BatchPredictionRequest>,
) -> Json<BatchPredictionResponse>
where
    R: PredictionRepository + 'static,
{
    let entries = request.companies.into_iter().map(batch_entry).collect();

    let (result, records) = service.predict_batch(entries);

    Json(BatchPredictionResponse {
        total_processed: result.total_processed,
        total_skipped: result.skipped,
        total_high_risk: result.counts.alto,
        total_medium_risk: result.counts.medio,
        total_low_risk: result.counts.bajo,
        predictions: records.into_iter().map(PredictionResponse::from).collect(),
        timestamp: Utc::now(),
    })
}

pub(crate) async fn by_risk_level_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
    Path(risk_level): Path<String>,
) -> Result<Json<RiskLevelResponse>, AppError>
where
    R: PredictionRepository + 'static,
{
    let risk_level: RiskLevel = risk_level.parse()?;
    let records = service.by_risk_level(risk_level)?;

    Ok(Json(RiskLevelResponse {
        risk_level,
        count: records.len(),
        predictions: records.into_iter().map(PredictionResponse::from).collect(),
    }))
}

pub(crate) async fn statistics_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
) -> Result<Json<StatisticsResponse>, AppError>
where
    R: PredictionRepository + 'static,
{
    let statistics = service.statistics()?;
    Ok(Json(StatisticsResponse {
        statistics,
        timestamp: Utc::now(),
    }))
}

pub(crate) async fn model_info_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
) -> Json<ModelInfo>
where
    R: PredictionRepository + 'static,
{
    Json(service.model_info())
}

pub(crate) async fn health_check_handler<R>(
    State(service): State<Arc<PredictionService<R>>>,
    Extension(state): Extension<AppState>,
) -> Json<HealthResponse>
where
    R: PredictionRepository + 'static,
{
    let engine = service.engine();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.label(),
        model_loaded: engine.mode() == ScoringMode::Model,
        scoring_mode: engine.mode(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryPredictionRepository;
    use axum::body::Body;
    use axum::http::Request;
    use churn_insight::config::AppEnvironment;
    use churn_insight::scoring::{ChurnScoringEngine, FeatureSpec, LoadedArtifacts};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app() -> Router {
        let engine = Arc::new(ChurnScoringEngine::new(
            FeatureSpec::default(),
            LoadedArtifacts::none(),
        ));
        let repository = Arc::new(InMemoryPredictionRepository::default());
        let service = Arc::new(PredictionService::new(engine, repository));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            environment: AppEnvironment::Test,
        };

        with_service_routes(service).layer(Extension(state))
    }

    fn reference_company(cuit: &str) -> Value {
        json!({
            "cuit": cuit,
            "ingresos": 1500000.0,
            "gastos": 1000000.0,
            "deuda_total": 500000.0,
            "activos_totales": 2000000.0,
            "trimestre_dias_actividad": 85
        })
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.expect("request handled");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body).expect("serializes")))
            .expect("request builds")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request builds")
    }

    #[tokio::test]
    async fn predict_route_scores_reference_company() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/predictions/predict",
                &reference_company("20748123114"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cuit"], "20748123114");
        assert_eq!(body["risk_level"], "bajo");
        assert_eq!(body["features_used"], 12);
        assert_eq!(body["confidence"], 0.95);
        let probability = body["probability"].as_f64().expect("probability number");
        assert!((probability - 0.316_666).abs() < 1e-3);
    }

    #[tokio::test]
    async fn predict_route_fills_optional_features_with_defaults() {
        let payload = json!({
            "cuit": "20748123114",
            "ingresos": 100,
            "gastos": 50,
            "deuda_total": 500000
        });

        let (status, body) = send(app(), post_json("/api/v1/predictions/predict", &payload)).await;

        // zero assets leave the debt ratio at zero
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["features_used"], 12);
        assert_eq!(body["risk_level"], "bajo");
        let probability = body["probability"].as_f64().expect("probability number");
        assert!((probability - 0.15).abs() < 1e-9);
    }

    #[tokio::test]
    async fn predict_route_requires_income_and_expenses() {
        let (status, _) = send(
            app(),
            post_json(
                "/api/v1/predictions/predict",
                &json!({ "cuit": "20748123114" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn predict_route_rejects_malformed_cuit() {
        let (status, body) = send(
            app(),
            post_json("/api/v1/predictions/predict", &reference_company("abc")),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().expect("error message").contains("abc"));
    }

    #[tokio::test]
    async fn batch_route_skips_malformed_company() {
        let mut named = reference_company("20748123114");
        named["razon_social"] = json!("Acme SA");
        let mut numeric_cuit = reference_company("20748123114");
        numeric_cuit["cuit"] = json!(20748123114_u64);
        let mut missing_income = reference_company("27111111119");
        missing_income
            .as_object_mut()
            .expect("company is an object")
            .remove("ingresos");

        let payload = json!({
            "companies": [
                named,
                numeric_cuit,
                reference_company("1234"),
                missing_income,
                reference_company("30-71234567-8"),
            ]
        });

        let (status, body) = send(app(), post_json("/api/v1/predictions/batch", &payload)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_processed"], 2);
        assert_eq!(body["total_skipped"], 3);
        assert_eq!(body["total_low_risk"], 2);
        let predictions = body["predictions"].as_array().expect("predictions array");
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0]["cuit"], "20748123114");
        assert_eq!(predictions[1]["cuit"], "30712345678");
    }

    #[test]
    fn unreadable_company_becomes_malformed_entry() {
        let entry = batch_entry(json!({ "cuit": 20748123114_u64, "ingresos": 1.0, "gastos": 1.0 }));
        assert!(entry.is_malformed());
        assert_eq!(entry.identifier, "20748123114");

        let entry = batch_entry(json!({ "cuit": "20748123114", "ingresos": 1.0, "gastos": 0.5 }));
        assert!(!entry.is_malformed());
        assert_eq!(entry.features.get("trimestre_dias_actividad"), Some(90.0));
        assert_eq!(entry.features.get("activos_totales"), Some(0.0));
    }

    #[tokio::test]
    async fn by_risk_level_lists_logged_predictions() {
        let router = app();
        let (status, _) = send(
            router.clone(),
            post_json(
                "/api/v1/predictions/predict",
                &reference_company("20748123114"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            router.clone(),
            get_request("/api/v1/predictions/by-risk-level/bajo"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_level"], "bajo");
        assert_eq!(body["count"], 1);

        let (status, body) = send(router, get_request("/api/v1/predictions/statistics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_predictions"], 1);
        assert_eq!(body["low_risk_count"], 1);
    }

    #[tokio::test]
    async fn by_risk_level_rejects_unknown_tier() {
        let (status, _) = send(
            app(),
            get_request("/api/v1/predictions/by-risk-level/critico"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn model_info_reports_mock_mode() {
        let (status, body) = send(app(), get_request("/api/v1/health/model-info")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], false);
        assert_eq!(body["status"], "mock");
        assert_eq!(body["feature_count"], 12);
        assert_eq!(body["feature_names"][0], "ingresos");
    }

    #[tokio::test]
    async fn health_check_reports_environment_and_mode() {
        let (status, body) = send(app(), get_request("/api/v1/health/check")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["environment"], "test");
        assert_eq!(body["scoring_mode"], "fallback");
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let (status, body) = send(app(), get_request("/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }
}
