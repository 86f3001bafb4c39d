use crate::config::Profile;
use crate::error::Result;
use crate::features::{zero_guard, FeatureVector, Normalizer};
use crate::model::Estimator;
use crate::report::Report;
use crate::types::{Feature, RawInput};

/// Result of a submission that passed input validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Blocked { warning: String },
    Estimated(Report),
}

// ---------- Service ----------

pub struct EmissionService {
    normalizer: Normalizer,
    estimator: Estimator,
    profile: Profile,
    log_predictions: bool,
}

impl EmissionService {
    pub fn new(estimator: Estimator, profile: Profile) -> Self {
        Self {
            normalizer: Normalizer::new(estimator.shared_schema()),
            estimator,
            profile,
            log_predictions: false,
        }
    }

    pub fn with_prediction_logging(mut self, enabled: bool) -> Self {
        self.log_predictions = enabled;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn schema(&self) -> &[Feature] {
        self.normalizer.schema()
    }

    pub fn normalize(&self, raw: &RawInput) -> Result<FeatureVector> {
        self.normalizer.normalize(raw)
    }

    pub fn estimate(&self, features: &FeatureVector) -> Result<f64> {
        self.estimator.estimate(features)
    }

    /// Full submission path: zero guard, normalization, prediction, report.
    pub fn submit(&self, raw: &RawInput) -> Result<Outcome> {
        if self.profile.zero_guard {
            if let Some(warning) = zero_guard(raw) {
                tracing::debug!("zero guard blocked submission");
                return Ok(Outcome::Blocked {
                    warning: warning.to_string(),
                });
            }
        }

        let features = self.normalize(raw)?;
        if self.log_predictions {
            log_vector(&features);
        }

        let prediction = self.estimate(&features)?;
        tracing::debug!(prediction, "estimated");
        Ok(Outcome::Estimated(Report::new(prediction, &self.profile)))
    }
}

fn log_vector(features: &FeatureVector) {
    let values = features.values();
    let nz = values.iter().filter(|x| **x != 0.0).count();
    let sample = features
        .schema()
        .iter()
        .zip(values)
        .take(6)
        .map(|(f, v)| format!("{}={:.3}", f, v))
        .collect::<Vec<_>>();
    tracing::info!(
        "recv in_dim={} nonzero={} sample=[{}]",
        values.len(),
        nz,
        sample.join(", ")
    );
}
