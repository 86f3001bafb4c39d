use std::sync::Arc;

use crate::error::{EstimatorError, Result};
use crate::types::{Feature, LoadType, RawInput, WeekStatus};

pub const ZERO_GUARD_WARNING: &str =
    "Usage_kWh and NSM must both be greater than zero to estimate emissions.";

// ---------- Schema ----------

pub fn parse_schema<S: AsRef<str>>(names: &[S]) -> Result<Vec<Feature>> {
    if names.is_empty() {
        return Err(EstimatorError::SchemaMismatch("feature list is empty".into()));
    }
    let mut schema = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let feature = Feature::from_name(name)
            .ok_or_else(|| EstimatorError::SchemaMismatch(format!("unknown feature '{}'", name)))?;
        if schema.contains(&feature) {
            return Err(EstimatorError::SchemaMismatch(format!(
                "feature '{}' listed twice",
                feature
            )));
        }
        schema.push(feature);
    }
    Ok(schema)
}

// ---------- Feature vector ----------

/// Ordered model input together with the schema it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<[Feature]>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn from_parts(schema: Arc<[Feature]>, values: Vec<f64>) -> Result<Self> {
        if schema.len() != values.len() {
            return Err(EstimatorError::SchemaMismatch(format!(
                "got {} values for {} features",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &[Feature] {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.schema
            .iter()
            .position(|f| *f == feature)
            .map(|i| self.values[i])
    }

    /// Maps the vector back to named fields. Features outside the schema
    /// stay `None`.
    pub fn to_raw(&self) -> RawInput {
        let mut raw = RawInput::default();
        for (feature, &v) in self.schema.iter().zip(&self.values) {
            match feature {
                Feature::UsageKwh => raw.usage_kwh = Some(v),
                Feature::LaggingReactivePower => raw.lagging_reactive_power_kvarh = Some(v),
                Feature::LeadingReactivePower => raw.leading_reactive_power_kvarh = Some(v),
                Feature::LaggingPowerFactor => raw.lagging_power_factor = Some(v),
                Feature::LeadingPowerFactor => raw.leading_power_factor = Some(v),
                Feature::Nsm => raw.nsm = Some(v as i64),
                Feature::DaySin => raw.day_sin = Some(v),
                Feature::DayCos => raw.day_cos = Some(v),
                Feature::WeekStatus => raw.week_status = WeekStatus::from_code(v as u8),
                Feature::LoadType => raw.load_type = LoadType::from_code(v as u8),
            }
        }
        raw
    }
}

// ---------- Normalizer ----------

#[derive(Debug, Clone)]
pub struct Normalizer {
    schema: Arc<[Feature]>,
}

impl Normalizer {
    pub fn new(schema: impl Into<Arc<[Feature]>>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &[Feature] {
        &self.schema
    }

    /// Validates `raw` and lays it out in schema order. Fields the schema
    /// needs but the submission lacks become 0.
    pub fn normalize(&self, raw: &RawInput) -> Result<FeatureVector> {
        raw.validate()?;
        let values = self.schema.iter().map(|f| raw.value(*f)).collect();
        Ok(FeatureVector {
            schema: Arc::clone(&self.schema),
            values,
        })
    }
}

// Missing values count as zero here too.
pub fn zero_guard(raw: &RawInput) -> Option<&'static str> {
    if raw.value(Feature::UsageKwh) == 0.0 || raw.value(Feature::Nsm) == 0.0 {
        Some(ZERO_GUARD_WARNING)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_schema() -> Vec<Feature> {
        Feature::ALL.to_vec()
    }

    #[test]
    fn normalize_follows_schema_order() {
        let schema = vec![Feature::Nsm, Feature::UsageKwh, Feature::LoadType];
        let raw = RawInput::from_fields([
            ("Usage_kWh", "2.5"),
            ("NSM", "3600"),
            ("Load_Type", "Heavy"),
        ])
        .unwrap();
        let v = Normalizer::new(schema).normalize(&raw).unwrap();
        assert_eq!(v.values(), &[3600.0, 2.5, 2.0]);
        assert_eq!(v.get(Feature::UsageKwh), Some(2.5));
        assert_eq!(v.get(Feature::DayCos), None);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let raw = RawInput::from_fields([("Usage_kWh", "4")]).unwrap();
        let v = Normalizer::new(full_schema()).normalize(&raw).unwrap();
        assert_eq!(v.len(), 10);
        assert_eq!(v.values().iter().filter(|x| **x != 0.0).count(), 1);
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let raw = RawInput {
            usage_kwh: Some(3.17),
            lagging_reactive_power_kvarh: Some(2.95),
            leading_reactive_power_kvarh: Some(0.1),
            lagging_power_factor: Some(73.21),
            leading_power_factor: Some(100.0),
            nsm: Some(85_500),
            day_sin: Some(-0.433_883_739_117_558_1),
            day_cos: Some(0.900_968_867_902_419_1),
            week_status: Some(WeekStatus::Weekend),
            load_type: Some(LoadType::Medium),
        };
        let v = Normalizer::new(full_schema()).normalize(&raw).unwrap();
        let back = v.to_raw();
        assert_eq!(back, raw);
        assert_eq!(
            back.day_sin.unwrap().to_bits(),
            raw.day_sin.unwrap().to_bits()
        );
    }

    #[test]
    fn nsm_round_trips_up_to_a_full_day() {
        let schema = vec![Feature::Nsm];
        for nsm in ["0", "1", "86399", "86400"] {
            let raw = RawInput::from_fields([("NSM", nsm)]).unwrap();
            let back = Normalizer::new(schema.clone()).normalize(&raw).unwrap().to_raw();
            assert_eq!(back.nsm, raw.nsm);
        }

        // beyond 2^53 the f64 column could not hold the value exactly
        let raw = RawInput::from_fields([("NSM", "9007199254740993")]).unwrap();
        let err = Normalizer::new(schema).normalize(&raw).unwrap_err();
        assert!(matches!(err, EstimatorError::TypeConversion { field: "NSM", .. }));
    }

    #[test]
    fn schema_rejects_unknown_and_duplicate_names() {
        assert!(parse_schema(&["Usage_kWh", "NSM"]).is_ok());
        assert!(parse_schema(&["Usage_kWh", "Voltage"]).is_err());
        assert!(parse_schema(&[
            "Lagging_Current_Reactive_Power_kVarh",
            "Lagging_Current_Reactive.Power_kVarh"
        ])
        .is_err());
        assert!(parse_schema::<&str>(&[]).is_err());
    }

    #[test]
    fn zero_guard_trips_on_either_field() {
        let both = RawInput::from_fields([("Usage_kWh", "1"), ("NSM", "900")]).unwrap();
        assert!(zero_guard(&both).is_none());

        let no_nsm = RawInput::from_fields([("Usage_kWh", "1")]).unwrap();
        assert_eq!(zero_guard(&no_nsm), Some(ZERO_GUARD_WARNING));

        let zero_usage = RawInput::from_fields([("Usage_kWh", "0"), ("NSM", "900")]).unwrap();
        assert!(zero_guard(&zero_usage).is_some());
    }

    #[test]
    fn from_parts_checks_length() {
        let schema: Arc<[Feature]> = vec![Feature::UsageKwh, Feature::Nsm].into();
        assert!(FeatureVector::from_parts(Arc::clone(&schema), vec![1.0]).is_err());
        assert!(FeatureVector::from_parts(schema, vec![1.0, 2.0]).is_ok());
    }
}
