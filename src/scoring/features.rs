use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::artifact::FeatureScaler;
use super::engine::ScoringError;

/// Feature names in the order the training job lays them out.
pub const DEFAULT_FEATURES: [&str; 12] = [
    "ingresos",
    "gastos",
    "margen_operativo",
    "deuda_total",
    "activos_totales",
    "prestamos_solicitados",
    "prestamos_aprobados",
    "trimestre_dias_actividad",
    "trimestre_logins_promedio",
    "transferencias_trimestre",
    "pagos_trimestre",
    "creditos_trimestre",
];

/// Ordered feature names fixing each value's position in the model input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    names: Vec<String>,
}

impl FeatureSpec {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURES)
    }
}

/// Named feature values supplied with a scoring request.
///
/// Names outside the [`FeatureSpec`] are carried along untouched. Listed names
/// the set omits are read as `0.0` when the vector is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<String, f64>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// Fails on the first of `names` holding NaN or an infinity. Names outside
/// `names` are never read, so their values are not checked.
pub(crate) fn ensure_finite<'a, I>(features: &FeatureSet, names: I) -> Result<(), ScoringError>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if let Some(value) = features.get(name) {
            if !value.is_finite() {
                return Err(ScoringError::NonFiniteFeature {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Lays `features` out in `spec` order, substituting `0.0` for missing names,
/// then applies the scaler when one is configured.
pub(crate) fn build_vector(
    spec: &FeatureSpec,
    features: &FeatureSet,
    scaler: Option<&dyn FeatureScaler>,
) -> Result<Vec<f64>, ScoringError> {
    ensure_finite(features, spec.names().iter().map(String::as_str))?;

    let mut vector = Vec::with_capacity(spec.len());
    let mut missing = Vec::new();

    for name in spec.names() {
        match features.get(name) {
            Some(value) => vector.push(value),
            None => {
                vector.push(0.0);
                missing.push(name.as_str());
            }
        }
    }

    if !missing.is_empty() {
        warn!(missing = ?missing, "features missing from request, using 0.0");
    }

    match scaler {
        Some(scaler) => Ok(scaler.transform(&vector)?),
        None => Ok(vector),
    }
}
