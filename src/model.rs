use std::{path::Path, sync::Arc};

use crate::error::{EstimatorError, Result};
use crate::features::{parse_schema, FeatureVector};
use crate::pipeline::PolynomialPipeline;
use crate::types::Feature;

// ---------- Backend seam ----------

/// A loaded, immutable regression model. Implementations see only the
/// ordered numeric input; naming lives in [`Estimator`].
pub trait Regressor: Send + Sync {
    fn feature_names(&self) -> &[String];

    fn unit(&self) -> Option<&str> {
        None
    }

    fn predict(&self, x: &[f64]) -> Result<f64>;
}

// ---------- Predictor facade ----------

#[derive(Clone)]
pub struct Estimator {
    model: Arc<dyn Regressor>,
    schema: Arc<[Feature]>,
}

impl Estimator {
    pub fn new(model: Arc<dyn Regressor>) -> Result<Self> {
        let schema = parse_schema(model.feature_names())?;
        Ok(Self {
            model,
            schema: schema.into(),
        })
    }

    pub fn schema(&self) -> &[Feature] {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<[Feature]> {
        Arc::clone(&self.schema)
    }

    pub fn unit(&self) -> Option<&str> {
        self.model.unit()
    }

    // Vector must carry exactly this model's column order.
    pub fn estimate(&self, features: &FeatureVector) -> Result<f64> {
        if features.schema() != &*self.schema {
            return Err(EstimatorError::SchemaMismatch(format!(
                "vector columns [{}] do not match model columns [{}]",
                join(features.schema()),
                join(&self.schema)
            )));
        }
        let y = self.model.predict(features.values())?;
        if !y.is_finite() {
            return Err(EstimatorError::Prediction(format!("model returned {}", y)));
        }
        Ok(y)
    }
}

fn join(schema: &[Feature]) -> String {
    schema.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
}

/// Loads the artifact at `model_path`. JSON files are polynomial pipelines;
/// TorchScript files need `meta_path` and the `torch` feature.
pub fn load(model_path: &str, meta_path: Option<&str>) -> Result<Estimator> {
    let ext = Path::new(model_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let model: Arc<dyn Regressor> = match ext.as_str() {
        "json" => Arc::new(PolynomialPipeline::load(model_path)?),
        "pt" | "pts" | "ts" => load_torchscript(model_path, meta_path)?,
        other => {
            return Err(EstimatorError::artifact(
                model_path,
                format!("unsupported artifact extension '{}'", other),
            ))
        }
    };

    Estimator::new(model).map_err(|e| EstimatorError::artifact(model_path, e))
}

#[cfg(feature = "torch")]
fn load_torchscript(model_path: &str, meta_path: Option<&str>) -> Result<Arc<dyn Regressor>> {
    let meta_path = meta_path.ok_or_else(|| {
        EstimatorError::artifact(model_path, "TorchScript models need META_PATH")
    })?;
    Ok(Arc::new(torch::TorchRegressor::new(model_path, meta_path)?))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(model_path: &str, _meta_path: Option<&str>) -> Result<Arc<dyn Regressor>> {
    Err(EstimatorError::artifact(
        model_path,
        "built without the `torch` feature",
    ))
}

#[cfg(feature = "torch")]
mod torch {
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::{fs, path::Path};
    use tch::{kind::Kind, CModule, Device, Tensor};

    use super::Regressor;
    use crate::error::{EstimatorError, Result};

    #[derive(Deserialize)]
    struct MetaJson {
        feat_list: Vec<String>,
        in_dim: Option<usize>,
        unit: Option<String>,
    }

    pub struct TorchRegressor {
        model: Mutex<CModule>,
        device: Device,
        feat_list: Vec<String>,
        unit: Option<String>,
    }

    impl TorchRegressor {
        pub fn new(model_path: &str, meta_path: &str) -> Result<Self> {
            let device = Device::Cpu;

            let meta_txt = fs::read_to_string(Path::new(meta_path))
                .map_err(|e| EstimatorError::artifact(meta_path, e))?;
            let meta: MetaJson =
                serde_json::from_str(&meta_txt).map_err(|e| EstimatorError::artifact(meta_path, e))?;

            let in_dim = meta.in_dim.unwrap_or(meta.feat_list.len());
            if in_dim != meta.feat_list.len() {
                return Err(EstimatorError::artifact(
                    meta_path,
                    format!("in_dim {} != feat_list.len() {}", in_dim, meta.feat_list.len()),
                ));
            }

            let model = CModule::load_on_device(model_path, device)
                .map_err(|e| EstimatorError::artifact(model_path, e))?;

            // Probe with zeros: a regressor must yield exactly one value.
            let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
            let out = model
                .forward_ts(&[dummy])
                .map_err(|e| EstimatorError::artifact(model_path, e))?;
            if out.numel() != 1 {
                return Err(EstimatorError::artifact(
                    model_path,
                    format!("expected a scalar output, got shape {:?}", out.size()),
                ));
            }

            Ok(Self {
                model: Mutex::new(model),
                device,
                feat_list: meta.feat_list,
                unit: meta.unit,
            })
        }
    }

    impl Regressor for TorchRegressor {
        fn feature_names(&self) -> &[String] {
            &self.feat_list
        }

        fn unit(&self) -> Option<&str> {
            self.unit.as_deref()
        }

        fn predict(&self, x: &[f64]) -> Result<f64> {
            let n = self.feat_list.len();
            if x.len() != n {
                return Err(EstimatorError::SchemaMismatch(format!(
                    "feature length mismatch: got {}, expected {}",
                    x.len(),
                    n
                )));
            }
            let xs: Vec<f32> = x.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&xs)
                .reshape([1, n as i64])
                .to_device(self.device);

            let out = self
                .model
                .lock()
                .forward_ts(&[input])
                .map_err(|e| EstimatorError::Prediction(e.to_string()))?;
            Ok(out.flatten(0, -1).double_value(&[0]))
        }
    }
}
