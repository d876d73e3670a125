use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::classifier::RiskLevel;
use super::engine::{ChurnScoringEngine, PredictionResult, ScoringError};
use super::features::FeatureSet;

/// Company identifier (CUIT): eleven digits, hyphens allowed on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid CUIT (expected 11 digits)")]
pub struct InvalidCompanyId(pub String);

impl CompanyId {
    const DIGITS: usize = 11;

    pub fn parse(raw: &str) -> Result<Self, InvalidCompanyId> {
        let digits: String = raw.trim().chars().filter(|ch| *ch != '-').collect();
        if digits.len() == Self::DIGITS && digits.chars().all(|ch| ch.is_ascii_digit()) {
            Ok(Self(digits))
        } else {
            Err(InvalidCompanyId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CompanyId {
    type Error = InvalidCompanyId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CompanyId> for String {
    fn from(value: CompanyId) -> Self {
        value.0
    }
}

/// One unvalidated record handed to [`ChurnScoringEngine::score_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub identifier: String,
    pub features: FeatureSet,
    /// Why the record could not be read, if it could not. Such entries are
    /// counted as skipped without being scored.
    pub defect: Option<String>,
}

impl BatchEntry {
    pub fn new(identifier: impl Into<String>, features: FeatureSet) -> Self {
        Self {
            identifier: identifier.into(),
            features,
            defect: None,
        }
    }

    /// Placeholder for a record that failed to parse, keeping its slot in the batch.
    pub fn malformed(identifier: impl Into<String>, defect: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            features: FeatureSet::new(),
            defect: Some(defect.into()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.defect.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub alto: usize,
    pub medio: usize,
    pub bajo: usize,
}

impl RiskCounts {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Alto => self.alto += 1,
            RiskLevel::Medio => self.medio += 1,
            RiskLevel::Bajo => self.bajo += 1,
            RiskLevel::Desconocido => {}
        }
    }

    pub fn total(&self) -> usize {
        self.alto + self.medio + self.bajo
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    /// Index of the entry in the submitted batch.
    pub position: usize,
    pub identifier: CompanyId,
    #[serde(flatten)]
    pub result: PredictionResult,
}

/// Aggregate over the entries that scored successfully.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub total_processed: usize,
    pub skipped: usize,
    pub counts: RiskCounts,
    pub items: Vec<ScoredEntry>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchEntryError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error(transparent)]
    Identifier(#[from] InvalidCompanyId),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl ChurnScoringEngine {
    /// Scores entries in input order. Malformed entries, entries with a bad
    /// identifier and failed predictions are logged and left out of both
    /// items and counts.
    pub fn score_batch<I>(&self, entries: I) -> BatchResult
    where
        I: IntoIterator<Item = BatchEntry>,
    {
        let mut batch = BatchResult::default();

        for (position, entry) in entries.into_iter().enumerate() {
            match self.score_entry(position, &entry) {
                Ok(scored) => {
                    batch.counts.record(scored.result.risk_level);
                    batch.items.push(scored);
                }
                Err(err) => {
                    error!(identifier = %entry.identifier, error = %err, "skipping batch entry");
                    batch.skipped += 1;
                }
            }
        }

        batch.total_processed = batch.items.len();
        info!(
            processed = batch.total_processed,
            skipped = batch.skipped,
            alto = batch.counts.alto,
            medio = batch.counts.medio,
            bajo = batch.counts.bajo,
            "batch scoring completed"
        );
        batch
    }

    fn score_entry(
        &self,
        position: usize,
        entry: &BatchEntry,
    ) -> Result<ScoredEntry, BatchEntryError> {
        if let Some(defect) = &entry.defect {
            return Err(BatchEntryError::Malformed(defect.clone()));
        }
        let identifier = CompanyId::parse(&entry.identifier)?;
        let result = self.try_score(&entry.features)?;
        Ok(ScoredEntry {
            position,
            identifier,
            result,
        })
    }
}
