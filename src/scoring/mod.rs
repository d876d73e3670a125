//! Churn risk scoring: feature layout, trained-model or heuristic inference,
//! tier classification and batch aggregation.

pub mod artifact;
mod batch;
mod classifier;
mod engine;
mod features;
pub mod heuristic;
mod loader;

pub use artifact::{
    ChurnModel, FeatureScaler, LogisticRegressionModel, ModelError, ScalerError, StandardScaler,
};
pub use batch::{
    BatchEntry, BatchEntryError, BatchResult, CompanyId, InvalidCompanyId, RiskCounts,
    ScoredEntry,
};
pub use classifier::{
    classify, RiskLevel, UnknownRiskLevel, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
pub use engine::{
    ChurnScoringEngine, ModelInfo, PredictionResult, ScoringError, ScoringMode,
    DEGRADED_PROBABILITY,
};
pub use features::{FeatureSet, FeatureSpec, DEFAULT_FEATURES};
pub use loader::{LoadedArtifacts, ModelLoadError, ModelLoader};
