use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::artifact::{ChurnModel, FeatureScaler, LogisticRegressionModel, StandardScaler};
use crate::config::ModelConfig;

/// Artifacts available to the engine. Either side may be absent.
#[derive(Clone, Default)]
pub struct LoadedArtifacts {
    pub model: Option<Arc<dyn ChurnModel>>,
    pub scaler: Option<Arc<dyn FeatureScaler>>,
}

impl LoadedArtifacts {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl ChurnModel + 'static) -> Self {
        self.model = Some(Arc::new(model));
        self
    }

    pub fn with_scaler(mut self, scaler: impl FeatureScaler + 'static) -> Self {
        self.scaler = Some(Arc::new(scaler));
        self
    }
}

impl std::fmt::Debug for LoadedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedArtifacts")
            .field("model", &self.model.as_ref().map(|model| model.model_type()))
            .field("scaler", &self.scaler.is_some())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads the JSON artifacts written by the training job.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    model_path: PathBuf,
    scaler_path: PathBuf,
}

impl ModelLoader {
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path: scaler_path.into(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.model_path.clone(), config.scaler_path.clone())
    }

    /// A missing file is not an error: the engine then runs on the fallback
    /// heuristic (no model) or on unscaled values (no scaler).
    pub fn load(&self) -> Result<LoadedArtifacts, ModelLoadError> {
        let mut artifacts = LoadedArtifacts::none();

        if self.model_path.exists() {
            let model: LogisticRegressionModel = read_json(&self.model_path)?;
            info!(
                path = %self.model_path.display(),
                model_type = %model.model_type,
                version = %model.version,
                "churn model loaded"
            );
            artifacts.model = Some(Arc::new(model));
        } else {
            warn!(
                path = %self.model_path.display(),
                "model artifact not found, using mock model"
            );
        }

        if self.scaler_path.exists() {
            let scaler: StandardScaler = read_json(&self.scaler_path)?;
            info!(path = %self.scaler_path.display(), "feature scaler loaded");
            artifacts.scaler = Some(Arc::new(scaler));
        } else {
            warn!(
                path = %self.scaler_path.display(),
                "scaler artifact not found, features stay unscaled"
            );
        }

        Ok(artifacts)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelLoadError> {
    let file = File::open(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| ModelLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}
