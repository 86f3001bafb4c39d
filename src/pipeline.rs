//! Polynomial regression pipeline: standard scaling, polynomial expansion,
//! then a linear model over the expanded terms.
//!
//! Artifacts are JSON documents exported from the training side:
//!
//! ```json
//! {
//!   "feature_names": ["Usage_kWh", "NSM"],
//!   "unit": "tons",
//!   "scaler": { "mean": [27.4, 42750.0], "scale": [33.4, 24940.0] },
//!   "polynomial": { "degree": 2, "include_bias": true, "interaction_only": false },
//!   "coefficients": [0.0, 0.014, 0.0003, 0.0002, 0.0001, 0.00005],
//!   "intercept": 0.012
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{EstimatorError, Result};
use crate::model::Regressor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialConfig {
    pub degree: usize,
    #[serde(default = "default_true")]
    pub include_bias: bool,
    #[serde(default)]
    pub interaction_only: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PolynomialConfig {
    fn default() -> Self {
        Self {
            degree: 1,
            include_bias: false,
            interaction_only: false,
        }
    }
}

/// On-disk layout of a pipeline artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub scaler: Option<ScalerParams>,
    #[serde(default)]
    pub polynomial: Option<PolynomialConfig>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

pub struct PolynomialPipeline {
    feature_names: Vec<String>,
    unit: Option<String>,
    scaler: Option<ScalerParams>,
    /// Input indices multiplied together for each expanded term.
    terms: Vec<Vec<usize>>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl PolynomialPipeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| EstimatorError::artifact(&shown, e))?;
        let artifact: PipelineArtifact =
            serde_json::from_str(&text).map_err(|e| EstimatorError::artifact(&shown, e))?;
        Self::from_artifact(artifact).map_err(|reason| EstimatorError::artifact(shown, reason))
    }

    pub fn from_artifact(artifact: PipelineArtifact) -> std::result::Result<Self, String> {
        let n = artifact.feature_names.len();
        if n == 0 {
            return Err("artifact lists no features".into());
        }
        if let Some(scaler) = &artifact.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(format!(
                    "scaler has {} means and {} scales for {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                ));
            }
            if scaler.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err("scaler scales must be positive and finite".into());
            }
        }
        let poly = artifact.polynomial.clone().unwrap_or_default();
        if poly.degree == 0 {
            return Err("polynomial degree must be at least 1".into());
        }
        let terms = expansion_terms(n, &poly);
        if terms.len() != artifact.coefficients.len() {
            return Err(format!(
                "expected {} coefficients for degree {} over {} features, found {}",
                terms.len(),
                poly.degree,
                n,
                artifact.coefficients.len()
            ));
        }

        Ok(Self {
            feature_names: artifact.feature_names,
            unit: artifact.unit,
            scaler: artifact.scaler,
            terms,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
        })
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    fn scale(&self, x: &[f64]) -> Vec<f64> {
        match &self.scaler {
            Some(s) => x
                .iter()
                .zip(s.mean.iter().zip(&s.scale))
                .map(|(v, (m, sd))| (v - m) / sd)
                .collect(),
            None => x.to_vec(),
        }
    }
}

impl Regressor for PolynomialPipeline {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    fn predict(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.feature_names.len() {
            return Err(EstimatorError::SchemaMismatch(format!(
                "feature length mismatch: got {}, expected {}",
                x.len(),
                self.feature_names.len()
            )));
        }
        let z = self.scale(x);
        let y = self
            .terms
            .iter()
            .zip(&self.coefficients)
            .map(|(term, w)| w * term.iter().map(|&i| z[i]).product::<f64>())
            .sum::<f64>();
        Ok(y + self.intercept)
    }
}

/// Index combinations for each output column, in the order the training
/// library emits them: bias, then degree 1, 2, ... with combinations
/// (with replacement unless `interaction_only`) in lexicographic order.
pub fn expansion_terms(n_features: usize, config: &PolynomialConfig) -> Vec<Vec<usize>> {
    let start = if config.include_bias { 0 } else { 1 };
    let mut out = Vec::new();
    for degree in start..=config.degree {
        let mut combo = Vec::with_capacity(degree);
        push_combinations(n_features, degree, 0, config.interaction_only, &mut combo, &mut out);
    }
    out
}

fn push_combinations(
    n: usize,
    degree: usize,
    from: usize,
    interaction_only: bool,
    combo: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if combo.len() == degree {
        out.push(combo.clone());
        return;
    }
    for i in from..n {
        combo.push(i);
        let next = if interaction_only { i + 1 } else { i };
        push_combinations(n, degree, next, interaction_only, combo, out);
        combo.pop();
    }
}
