use std::sync::Arc;

use tracing::{info, warn};

use super::repository::{
    PredictionRecord, PredictionRepository, PredictionStatistics, RepositoryError,
};
use crate::scoring::{
    BatchEntry, BatchResult, ChurnScoringEngine, CompanyId, FeatureSet, InvalidCompanyId,
    ModelInfo, RiskLevel,
};

/// Service composing the shared scoring engine and the prediction log.
pub struct PredictionService<R> {
    engine: Arc<ChurnScoringEngine>,
    repository: Arc<R>,
}

impl<R> PredictionService<R>
where
    R: PredictionRepository + 'static,
{
    pub fn new(engine: Arc<ChurnScoringEngine>, repository: Arc<R>) -> Self {
        Self { engine, repository }
    }

    pub fn engine(&self) -> &ChurnScoringEngine {
        &self.engine
    }

    /// Score one company. Scoring itself never fails; only the identifier can.
    pub fn predict(
        &self,
        cuit: &str,
        features: &FeatureSet,
    ) -> Result<PredictionRecord, InvalidCompanyId> {
        let cuit = CompanyId::parse(cuit)?;
        let result = self.engine.score(features);
        let record = PredictionRecord::new(cuit, result, features.len());

        self.persist(&record);
        info!(cuit = %record.cuit, risk_level = %record.risk_level, "prediction served");
        Ok(record)
    }

    /// Score many companies; the returned records follow `result.items` order.
    pub fn predict_batch(
        &self,
        entries: Vec<BatchEntry>,
    ) -> (BatchResult, Vec<PredictionRecord>) {
        let features_used: Vec<usize> = entries
            .iter()
            .map(|entry| entry.features.len())
            .collect();
        let result = self.engine.score_batch(entries);

        let records: Vec<PredictionRecord> = result
            .items
            .iter()
            .map(|item| {
                PredictionRecord::new(
                    item.identifier.clone(),
                    item.result,
                    features_used[item.position],
                )
            })
            .collect();

        for record in &records {
            self.persist(record);
        }

        (result, records)
    }

    pub fn by_risk_level(
        &self,
        level: RiskLevel,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        self.repository.by_risk_level(level)
    }

    pub fn statistics(&self) -> Result<PredictionStatistics, RepositoryError> {
        let records = self.repository.all()?;
        Ok(PredictionStatistics::from_records(
            &records,
            self.engine.threshold(),
        ))
    }

    pub fn model_info(&self) -> ModelInfo {
        self.engine.model_info()
    }

    fn persist(&self, record: &PredictionRecord) {
        if let Err(err) = self.repository.record(record.clone()) {
            warn!(cuit = %record.cuit, error = %err, "prediction not recorded");
        }
    }
}
