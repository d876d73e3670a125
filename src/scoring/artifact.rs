use serde::{Deserialize, Serialize};

/// Trained model producing a churn probability from an ordered feature vector.
///
/// Implementations are shared read-only across scoring calls, so inference
/// must not need `&mut self`.
pub trait ChurnModel: Send + Sync {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError>;

    fn model_type(&self) -> &str;

    fn version(&self) -> &str {
        "unversioned"
    }
}

/// Linear transform applied to the raw vector before inference.
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScalerError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("model expects {expected} features, received {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("model produced a non-finite probability")]
    NonFinite,
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("scaler expects {expected} features, received {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("scaler has {mean} means but {scale} scales")]
    Inconsistent { mean: usize, scale: usize },
}

/// Logistic regression exported by the training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn default_model_type() -> String {
    "logistic_regression".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl LogisticRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            model_type: default_model_type(),
            version: default_version(),
            coefficients,
            intercept,
        }
    }
}

impl ChurnModel for LogisticRegressionModel {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }

        let logit = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(weight, value)| weight * value)
                .sum::<f64>();

        let probability = 1.0 / (1.0 + (-logit).exp());
        if probability.is_finite() {
            Ok(probability)
        } else {
            Err(ModelError::NonFinite)
        }
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Standardization with the training set's per-feature mean and scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScalerError> {
        if self.mean.len() != self.scale.len() {
            return Err(ScalerError::Inconsistent {
                mean: self.mean.len(),
                scale: self.scale.len(),
            });
        }
        if features.len() != self.mean.len() {
            return Err(ScalerError::DimensionMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| {
                // constant columns were fitted with a zero scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_logit_is_even_odds() {
        let model = LogisticRegressionModel::new(vec![1.0, -1.0], 0.0);
        let probability = model.predict_proba(&[2.0, 2.0]).expect("inference runs");
        assert!((probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn positive_weights_push_probability_up() {
        let model = LogisticRegressionModel::new(vec![2.0], -1.0);
        let low = model.predict_proba(&[0.0]).expect("inference runs");
        let high = model.predict_proba(&[3.0]).expect("inference runs");
        assert!(low < 0.5);
        assert!(high > 0.99);
    }

    #[test]
    fn model_rejects_wrong_vector_length() {
        let model = LogisticRegressionModel::new(vec![1.0; 3], 0.0);
        assert_eq!(
            model.predict_proba(&[1.0]),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn model_json_defaults_type_and_version() {
        let model: LogisticRegressionModel =
            serde_json::from_str(r#"{"coefficients": [0.5, 0.25], "intercept": -0.1}"#)
                .expect("model parses");
        assert_eq!(ChurnModel::model_type(&model), "logistic_regression");
        assert_eq!(ChurnModel::version(&model), "1.0.0");
    }

    #[test]
    fn inconsistent_scaler_is_reported() {
        let scaler = StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0],
        };
        assert_eq!(
            scaler.transform(&[1.0, 2.0]),
            Err(ScalerError::Inconsistent { mean: 2, scale: 1 })
        );
    }
}
