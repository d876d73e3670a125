use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the `alto` tier.
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Lower bound (inclusive) of the `medio` tier.
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.4;

/// Churn risk tier attached to every prediction.
///
/// `Desconocido` never comes out of [`classify`]; it marks a degraded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Bajo,
    Medio,
    Alto,
    Desconocido,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Bajo => "bajo",
            RiskLevel::Medio => "medio",
            RiskLevel::Alto => "alto",
            RiskLevel::Desconocido => "desconocido",
        }
    }

    pub fn is_tier(&self) -> bool {
        !matches!(self, RiskLevel::Desconocido)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("risk level must be one of alto, medio or bajo (got '{0}')")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Parses one of the three ordered tiers; the degraded marker is not accepted.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alto" => Ok(RiskLevel::Alto),
            "medio" => Ok(RiskLevel::Medio),
            "bajo" => Ok(RiskLevel::Bajo),
            _ => Err(UnknownRiskLevel(value.to_string())),
        }
    }
}

pub fn classify(probability: f64) -> RiskLevel {
    if probability >= HIGH_RISK_THRESHOLD {
        RiskLevel::Alto
    } else if probability >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medio
    } else {
        RiskLevel::Bajo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_belong_to_the_higher_tier() {
        assert_eq!(classify(0.7), RiskLevel::Alto);
        assert_eq!(classify(0.699999), RiskLevel::Medio);
        assert_eq!(classify(0.4), RiskLevel::Medio);
        assert_eq!(classify(0.399999), RiskLevel::Bajo);
    }

    #[test]
    fn extremes_map_to_outer_tiers() {
        assert_eq!(classify(0.0), RiskLevel::Bajo);
        assert_eq!(classify(1.0), RiskLevel::Alto);
    }

    #[test]
    fn serializes_with_spanish_labels() {
        let json = serde_json::to_string(&RiskLevel::Desconocido).expect("serializes");
        assert_eq!(json, "\"desconocido\"");
        let level: RiskLevel = serde_json::from_str("\"medio\"").expect("parses");
        assert_eq!(level, RiskLevel::Medio);
    }

    #[test]
    fn degraded_marker_sits_outside_the_tiers() {
        assert!(!RiskLevel::Desconocido.is_tier());
        for probability in [0.0, 0.4, 0.7, 1.0] {
            assert!(classify(probability).is_tier());
        }
    }

    #[test]
    fn parsing_only_accepts_ordered_tiers() {
        assert_eq!("ALTO".parse::<RiskLevel>(), Ok(RiskLevel::Alto));
        assert!("desconocido".parse::<RiskLevel>().is_err());
        assert!("critico".parse::<RiskLevel>().is_err());
    }
}
