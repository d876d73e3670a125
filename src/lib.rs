pub mod config;
pub mod error;
pub mod import;
pub mod predictions;
pub mod scoring;
pub mod telemetry;
