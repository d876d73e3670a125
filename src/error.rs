use crate::config::ConfigError;
use crate::import::BatchImportError;
use crate::predictions::RepositoryError;
use crate::scoring::{InvalidCompanyId, ModelLoadError, UnknownRiskLevel};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Model(ModelLoadError),
    Import(BatchImportError),
    Repository(RepositoryError),
    InvalidCompany(InvalidCompanyId),
    InvalidRiskLevel(UnknownRiskLevel),
    InvalidFeature(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Model(err) => write!(f, "model error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::InvalidCompany(err) => write!(f, "{}", err),
            AppError::InvalidRiskLevel(err) => write!(f, "{}", err),
            AppError::InvalidFeature(detail) => write!(f, "invalid feature: {}", detail),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Model(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::InvalidCompany(err) => Some(err),
            AppError::InvalidRiskLevel(err) => Some(err),
            AppError::InvalidFeature(_) => None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCompany(_) | AppError::InvalidFeature(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InvalidRiskLevel(_) | AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ModelLoadError> for AppError {
    fn from(value: ModelLoadError) -> Self {
        Self::Model(value)
    }
}

impl From<BatchImportError> for AppError {
    fn from(value: BatchImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<InvalidCompanyId> for AppError {
    fn from(value: InvalidCompanyId) -> Self {
        Self::InvalidCompany(value)
    }
}

impl From<UnknownRiskLevel> for AppError {
    fn from(value: UnknownRiskLevel) -> Self {
        Self::InvalidRiskLevel(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        let invalid = AppError::from(InvalidCompanyId("x".to_string()));
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let tier = AppError::from(UnknownRiskLevel("critico".to_string()));
        assert_eq!(tier.status(), StatusCode::BAD_REQUEST);
        assert!(tier.to_string().contains("critico"));
    }

    #[test]
    fn startup_errors_map_to_500() {
        let response = AppError::Config(ConfigError::InvalidPort).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
