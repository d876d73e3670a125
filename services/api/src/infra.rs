use churn_insight::config::{AppEnvironment, ModelConfig};
use churn_insight::predictions::{PredictionRecord, PredictionRepository, RepositoryError};
use churn_insight::scoring::{ChurnScoringEngine, LoadedArtifacts, ModelLoader, RiskLevel};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::error;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) environment: AppEnvironment,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPredictionRepository {
    records: Arc<Mutex<Vec<PredictionRecord>>>,
}

impl InMemoryPredictionRepository {
    fn guard(&self) -> Result<MutexGuard<'_, Vec<PredictionRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("prediction log lock poisoned".to_string()))
    }
}

impl PredictionRepository for InMemoryPredictionRepository {
    fn record(&self, record: PredictionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        guard.push(record);
        Ok(())
    }

    fn by_risk_level(&self, level: RiskLevel) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard
            .iter()
            .filter(|record| record.risk_level == level)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.clone())
    }
}

/// Builds the process-wide engine. An artifact that exists but cannot be read
/// is logged and the engine runs on the fallback heuristic instead.
pub(crate) fn load_engine(config: &ModelConfig) -> ChurnScoringEngine {
    let artifacts = match ModelLoader::from_config(config).load() {
        Ok(artifacts) => artifacts,
        Err(err) => {
            error!(error = %err, "could not load churn artifacts, using mock model");
            LoadedArtifacts::none()
        }
    };

    ChurnScoringEngine::from_config(config, artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_insight::scoring::{CompanyId, PredictionResult, ScoringMode};
    use std::path::PathBuf;

    #[test]
    fn repository_filters_by_tier() {
        let repository = InMemoryPredictionRepository::default();
        for (cuit, probability, risk_level) in [
            ("20748123114", 0.1, RiskLevel::Bajo),
            ("30712345678", 0.8, RiskLevel::Alto),
            ("27111111119", 0.2, RiskLevel::Bajo),
        ] {
            let id = CompanyId::parse(cuit).expect("valid cuit");
            let result = PredictionResult {
                probability,
                risk_level,
            };
            repository
                .record(PredictionRecord::new(id, result, 3))
                .expect("record stored");
        }

        let low = repository
            .by_risk_level(RiskLevel::Bajo)
            .expect("query runs");
        assert_eq!(low.len(), 2);
        assert_eq!(repository.all().expect("query runs").len(), 3);
    }

    #[test]
    fn unreadable_artifact_falls_back_to_heuristic() {
        let dir = std::env::temp_dir().join(format!("churn-insight-api-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("scratch dir created");
        let model_path = dir.join("model.json");
        std::fs::write(&model_path, "[1, 2").expect("model written");

        let config = ModelConfig {
            model_path,
            scaler_path: PathBuf::from("/nonexistent/scaler.json"),
            ..ModelConfig::default()
        };

        let engine = load_engine(&config);
        assert_eq!(engine.mode(), ScoringMode::Fallback);
    }
}
