//! Prediction log and the service that scores companies into it.

mod repository;
mod service;

pub use repository::{
    PredictionRecord, PredictionRepository, PredictionStatistics, RepositoryError,
};
pub use service::PredictionService;
