use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{CompanyId, PredictionResult, RiskLevel};

/// A scored company as it is kept in the prediction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub cuit: CompanyId,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub features_used: usize,
    pub recorded_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(cuit: CompanyId, result: PredictionResult, features_used: usize) -> Self {
        Self {
            cuit,
            probability: result.probability,
            risk_level: result.risk_level,
            features_used,
            recorded_at: Utc::now(),
        }
    }
}

/// Storage abstraction for scored predictions.
pub trait PredictionRepository: Send + Sync {
    fn record(&self, record: PredictionRecord) -> Result<(), RepositoryError>;
    fn by_risk_level(&self, level: RiskLevel) -> Result<Vec<PredictionRecord>, RepositoryError>;
    fn all(&self) -> Result<Vec<PredictionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("prediction store unavailable: {0}")]
    Unavailable(String),
}

/// Aggregates over the prediction log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionStatistics {
    pub total_predictions: usize,
    pub average_probability: f64,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub low_risk_count: usize,
    /// Share of predictions at or above the model threshold.
    pub churn_rate: f64,
}

impl PredictionStatistics {
    pub fn from_records(records: &[PredictionRecord], threshold: f64) -> Self {
        let total = records.len();
        let count = |level: RiskLevel| {
            records
                .iter()
                .filter(|record| record.risk_level == level)
                .count()
        };

        let (average_probability, churn_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let sum: f64 = records.iter().map(|record| record.probability).sum();
            let churned = records
                .iter()
                .filter(|record| record.probability >= threshold)
                .count();
            (sum / total as f64, churned as f64 / total as f64)
        };

        Self {
            total_predictions: total,
            average_probability,
            high_risk_count: count(RiskLevel::Alto),
            medium_risk_count: count(RiskLevel::Medio),
            low_risk_count: count(RiskLevel::Bajo),
            churn_rate,
        }
    }
}
