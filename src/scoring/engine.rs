use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::artifact::{ChurnModel, FeatureScaler, ModelError, ScalerError};
use super::classifier::{classify, RiskLevel};
use super::features::{build_vector, ensure_finite, FeatureSet, FeatureSpec};
use super::heuristic::{fallback_probability, INPUT_FEATURES};
use super::loader::LoadedArtifacts;
use crate::config::ModelConfig;

/// Probability reported when a profile could not be scored.
pub const DEGRADED_PROBABILITY: f64 = 0.5;

/// Internal failure while scoring a single profile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("feature '{name}' is not a finite number ({value})")]
    NonFiniteFeature { name: String, value: f64 },
    #[error(transparent)]
    Scaler(#[from] ScalerError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("fallback heuristic produced a non-finite probability")]
    NonFiniteHeuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability: f64,
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    pub fn degraded() -> Self {
        Self {
            probability: DEGRADED_PROBABILITY,
            risk_level: RiskLevel::Desconocido,
        }
    }

    /// True for the fail-open sentinel, the only sign that scoring broke.
    pub fn is_degraded(&self) -> bool {
        self.risk_level == RiskLevel::Desconocido
    }
}

/// Which scoring path the engine takes for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Model,
    Fallback,
}

/// Introspection payload describing the loaded artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub loaded: bool,
    pub model_type: String,
    pub model_path: String,
    pub threshold: f64,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub version: String,
    pub status: &'static str,
}

/// Scores feature sets against the trained model, or the fallback heuristic
/// when none was loaded. Shared read-only between callers.
pub struct ChurnScoringEngine {
    spec: FeatureSpec,
    model: Option<Arc<dyn ChurnModel>>,
    scaler: Option<Arc<dyn FeatureScaler>>,
    threshold: f64,
    model_path: PathBuf,
}

impl ChurnScoringEngine {
    pub fn new(spec: FeatureSpec, artifacts: LoadedArtifacts) -> Self {
        let defaults = ModelConfig::default();
        Self {
            spec,
            model: artifacts.model,
            scaler: artifacts.scaler,
            threshold: defaults.threshold,
            model_path: defaults.model_path,
        }
    }

    pub fn from_config(config: &ModelConfig, artifacts: LoadedArtifacts) -> Self {
        Self {
            spec: FeatureSpec::new(config.feature_names.iter().cloned()),
            model: artifacts.model,
            scaler: artifacts.scaler,
            threshold: config.threshold,
            model_path: config.model_path.clone(),
        }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> ScoringMode {
        if self.model.is_some() {
            ScoringMode::Model
        } else {
            ScoringMode::Fallback
        }
    }

    /// Fail-open scoring: any internal failure becomes the degraded sentinel.
    pub fn score(&self, features: &FeatureSet) -> PredictionResult {
        match self.try_score(features) {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "prediction failed, returning degraded result");
                PredictionResult::degraded()
            }
        }
    }

    /// Same pipeline as [`score`](Self::score) with the failure surfaced.
    pub fn try_score(&self, features: &FeatureSet) -> Result<PredictionResult, ScoringError> {
        let vector = build_vector(&self.spec, features, self.scaler.as_deref())?;

        let raw = match &self.model {
            Some(model) => {
                let probability = model.predict_proba(&vector)?;
                debug!(probability, "model prediction");
                if !probability.is_finite() {
                    return Err(ModelError::NonFinite.into());
                }
                probability
            }
            None => {
                ensure_finite(features, INPUT_FEATURES)?;
                let probability = fallback_probability(features);
                if !probability.is_finite() {
                    return Err(ScoringError::NonFiniteHeuristic);
                }
                probability
            }
        };

        let probability = raw.clamp(0.0, 1.0);
        let risk_level = classify(probability);

        info!(probability, %risk_level, "prediction completed");
        Ok(PredictionResult {
            probability,
            risk_level,
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        let (model_type, version) = match &self.model {
            Some(model) => (model.model_type().to_string(), model.version().to_string()),
            None => ("MockModel".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        };

        ModelInfo {
            loaded: self.model.is_some(),
            model_type,
            model_path: self.model_path.display().to_string(),
            threshold: self.threshold,
            feature_count: self.spec.len(),
            feature_names: self.spec.names().to_vec(),
            version,
            status: match self.mode() {
                ScoringMode::Model => "loaded",
                ScoringMode::Fallback => "mock",
            },
        }
    }
}
