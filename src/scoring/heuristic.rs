//! Rule-based churn probability used while no trained model is loaded.

use tracing::debug;

use super::features::FeatureSet;

const DEBT_WEIGHT: f64 = 0.4;
const INACTIVITY_WEIGHT: f64 = 0.3;
const UNPROFITABILITY_WEIGHT: f64 = 0.3;

/// Days in the activity window the inactivity score is measured against.
const QUARTER_DAYS: f64 = 90.0;

/// Every name [`evaluate`] reads.
pub const INPUT_FEATURES: [&str; 5] = [
    "deuda_total",
    "activos_totales",
    "trimestre_dias_actividad",
    "ingresos",
    "gastos",
];

/// Individual sub-scores, kept for logging and audits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicBreakdown {
    pub debt_ratio: f64,
    pub inactivity: f64,
    pub profitability: f64,
    pub probability: f64,
}

impl HeuristicBreakdown {
    pub fn unprofitability(&self) -> f64 {
        (1.0 - self.profitability).max(0.0)
    }
}

pub fn fallback_probability(features: &FeatureSet) -> f64 {
    let breakdown = evaluate(features);
    debug!(
        debt_ratio = breakdown.debt_ratio,
        inactivity = breakdown.inactivity,
        profitability = breakdown.profitability,
        probability = breakdown.probability,
        "fallback heuristic scored profile"
    );
    breakdown.probability
}

/// Computes every sub-score from the raw named values.
///
/// Absent names read as: `deuda_total` 0, `activos_totales` 1,
/// `trimestre_dias_actividad` 90, `ingresos` 1, `gastos` 0.
pub fn evaluate(features: &FeatureSet) -> HeuristicBreakdown {
    let debt = features.get("deuda_total").unwrap_or(0.0);
    let assets = features.get("activos_totales").unwrap_or(1.0);
    let debt_ratio = if assets > 0.0 { debt / assets } else { 0.0 };

    let active_days = features
        .get("trimestre_dias_actividad")
        .unwrap_or(QUARTER_DAYS);
    let inactivity = (1.0 - active_days / QUARTER_DAYS).max(0.0);

    let income = features.get("ingresos").unwrap_or(1.0);
    let expense = features.get("gastos").unwrap_or(0.0);
    let profitability = if income > 0.0 {
        (income - expense) / income
    } else {
        0.0
    };

    let combined = debt_ratio * DEBT_WEIGHT
        + inactivity * INACTIVITY_WEIGHT
        + (1.0 - profitability).max(0.0) * UNPROFITABILITY_WEIGHT;

    HeuristicBreakdown {
        debt_ratio,
        inactivity,
        profitability,
        probability: combined.clamp(0.0, 1.0),
    }
}
