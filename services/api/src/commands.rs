use crate::infra::InMemoryPredictionRepository;
use churn_insight::config::AppConfig;
use churn_insight::error::AppError;
use churn_insight::import::read_batch_file;
use churn_insight::predictions::PredictionService;
use churn_insight::scoring::{ChurnScoringEngine, FeatureSet, ModelLoader};
use churn_insight::telemetry;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Company CUIT (11 digits, hyphens allowed)
    #[arg(long)]
    pub(crate) cuit: String,
    /// Feature value as NAME=VALUE; repeat for each feature
    #[arg(long = "feature", value_parser = parse_feature)]
    pub(crate) features: Vec<(String, f64)>,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export with a `cuit` column and one column per feature
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

pub(crate) fn parse_feature(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in '{raw}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{value}' as a number ({err})"))?;
    Ok((name.to_string(), value))
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let service = prepare_service()?;
    let features = collect_features(args.features)?;

    let record = service.predict(&args.cuit, &features)?;
    print_json(&record)
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let service = prepare_service()?;
    let entries = read_batch_file(&args.csv)?;

    let (result, _) = service.predict_batch(entries);
    print_json(&result)
}

pub(crate) fn run_model_info() -> Result<(), AppError> {
    let service = prepare_service()?;
    print_json(&service.model_info())
}

/// Command-line scoring refuses to start on an unreadable artifact rather
/// than silently serving heuristic scores.
fn prepare_service() -> Result<PredictionService<InMemoryPredictionRepository>, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let artifacts = ModelLoader::from_config(&config.model).load()?;
    let engine = ChurnScoringEngine::from_config(&config.model, artifacts);

    Ok(PredictionService::new(
        Arc::new(engine),
        Arc::new(InMemoryPredictionRepository::default()),
    ))
}

fn collect_features(pairs: Vec<(String, f64)>) -> Result<FeatureSet, AppError> {
    let mut features = FeatureSet::new();
    for (name, value) in pairs {
        if features.get(&name).is_some() {
            return Err(AppError::InvalidFeature(format!(
                "'{name}' given more than once"
            )));
        }
        features.insert(name, value);
    }
    Ok(features)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
