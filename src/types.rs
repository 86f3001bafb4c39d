use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EstimatorError, Result};

pub const SECONDS_PER_DAY: i64 = 86_400;
const MAX_INTERVAL_READING: f64 = 100_000.0;

// ---------- Feature catalogue ----------

// The artifact lists a subset of these names in training order; that list
// becomes the deployment's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "Usage_kWh")]
    UsageKwh,
    #[serde(rename = "Lagging_Current_Reactive_Power_kVarh", alias = "Lagging_Current_Reactive.Power_kVarh")]
    LaggingReactivePower,
    #[serde(rename = "Leading_Current_Reactive_Power_kVarh")]
    LeadingReactivePower,
    #[serde(rename = "Lagging_Current_Power_Factor")]
    LaggingPowerFactor,
    #[serde(rename = "Leading_Current_Power_Factor")]
    LeadingPowerFactor,
    #[serde(rename = "NSM")]
    Nsm,
    #[serde(rename = "Day_sin")]
    DaySin,
    #[serde(rename = "Day_cos")]
    DayCos,
    #[serde(rename = "WeekStatus")]
    WeekStatus,
    #[serde(rename = "Load_Type")]
    LoadType,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::UsageKwh,
        Feature::LaggingReactivePower,
        Feature::LeadingReactivePower,
        Feature::LaggingPowerFactor,
        Feature::LeadingPowerFactor,
        Feature::Nsm,
        Feature::DaySin,
        Feature::DayCos,
        Feature::WeekStatus,
        Feature::LoadType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::UsageKwh => "Usage_kWh",
            Feature::LaggingReactivePower => "Lagging_Current_Reactive_Power_kVarh",
            Feature::LeadingReactivePower => "Leading_Current_Reactive_Power_kVarh",
            Feature::LaggingPowerFactor => "Lagging_Current_Power_Factor",
            Feature::LeadingPowerFactor => "Leading_Current_Power_Factor",
            Feature::Nsm => "NSM",
            Feature::DaySin => "Day_sin",
            Feature::DayCos => "Day_cos",
            Feature::WeekStatus => "WeekStatus",
            Feature::LoadType => "Load_Type",
        }
    }

    /// Resolves a column name, accepting the dotted spelling some training
    /// exports use for the lagging reactive power column.
    pub fn from_name(name: &str) -> Option<Feature> {
        let name = name.trim();
        if name == "Lagging_Current_Reactive.Power_kVarh" {
            return Some(Feature::LaggingReactivePower);
        }
        Feature::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            Feature::UsageKwh => "Usage (kWh)",
            Feature::LaggingReactivePower => "Lagging Current Reactive Power (kVarh)",
            Feature::LeadingReactivePower => "Leading Current Reactive Power (kVarh)",
            Feature::LaggingPowerFactor => "Lagging Current Power Factor",
            Feature::LeadingPowerFactor => "Leading Current Power Factor",
            Feature::Nsm => "NSM (seconds from midnight)",
            Feature::DaySin => "Day Sin",
            Feature::DayCos => "Day Cos",
            Feature::WeekStatus => "Week Status",
            Feature::LoadType => "Load Type",
        }
    }

    pub fn min(self) -> f64 {
        match self {
            Feature::DaySin | Feature::DayCos => -1.0,
            _ => 0.0,
        }
    }

    /// Largest value accepted for a numeric field. Readings cover a
    /// 15-minute interval; power factors are percentages.
    pub fn max(self) -> f64 {
        match self {
            Feature::DaySin | Feature::DayCos => 1.0,
            Feature::LaggingPowerFactor | Feature::LeadingPowerFactor => 100.0,
            Feature::Nsm => SECONDS_PER_DAY as f64,
            Feature::WeekStatus => 1.0,
            Feature::LoadType => 2.0,
            Feature::UsageKwh | Feature::LaggingReactivePower | Feature::LeadingReactivePower => {
                MAX_INTERVAL_READING
            }
        }
    }

    fn range_hint(self) -> &'static str {
        match self {
            Feature::DaySin | Feature::DayCos => "must be between -1 and 1",
            Feature::LaggingPowerFactor | Feature::LeadingPowerFactor => {
                "must be between 0 and 100"
            }
            Feature::Nsm => "must be between 0 and 86400 seconds",
            _ => "must be between 0 and 100000",
        }
    }

    pub fn step(self) -> f64 {
        match self {
            Feature::LaggingPowerFactor | Feature::LeadingPowerFactor => 0.01,
            Feature::DaySin | Feature::DayCos => 0.1,
            _ => 1.0,
        }
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, Feature::WeekStatus | Feature::LoadType)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------- Categorical encodings ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekStatus {
    Weekday,
    Weekend,
}

impl WeekStatus {
    pub const ALL: [WeekStatus; 2] = [WeekStatus::Weekday, WeekStatus::Weekend];

    pub fn as_str(self) -> &'static str {
        match self {
            WeekStatus::Weekday => "Weekday",
            WeekStatus::Weekend => "Weekend",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            WeekStatus::Weekday => 0,
            WeekStatus::Weekend => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        WeekStatus::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn parse(value: &str) -> Result<Self> {
        WeekStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value.trim())
            .ok_or_else(|| EstimatorError::InvalidCategory {
                field: Feature::WeekStatus.name(),
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadType {
    Light,
    Medium,
    Heavy,
}

impl LoadType {
    pub const ALL: [LoadType; 3] = [LoadType::Light, LoadType::Medium, LoadType::Heavy];

    pub fn as_str(self) -> &'static str {
        match self {
            LoadType::Light => "Light",
            LoadType::Medium => "Medium",
            LoadType::Heavy => "Heavy",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LoadType::Light => 0,
            LoadType::Medium => 1,
            LoadType::Heavy => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        LoadType::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn parse(value: &str) -> Result<Self> {
        LoadType::ALL
            .into_iter()
            .find(|t| t.as_str() == value.trim())
            .ok_or_else(|| EstimatorError::InvalidCategory {
                field: Feature::LoadType.name(),
                value: value.to_string(),
            })
    }
}

// ---------- Raw submission ----------

// `None` means the field was not submitted (or submitted empty).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    pub usage_kwh: Option<f64>,
    pub lagging_reactive_power_kvarh: Option<f64>,
    pub leading_reactive_power_kvarh: Option<f64>,
    pub lagging_power_factor: Option<f64>,
    pub leading_power_factor: Option<f64>,
    pub nsm: Option<i64>,
    pub day_sin: Option<f64>,
    pub day_cos: Option<f64>,
    pub week_status: Option<WeekStatus>,
    pub load_type: Option<LoadType>,
}

impl RawInput {
    /// Parses `name -> text` pairs as submitted by the form or the JSON API.
    /// Unknown keys are ignored; blank values count as missing.
    pub fn from_fields<'a, I>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = RawInput::default();
        for (key, value) in fields {
            let Some(feature) = Feature::from_name(key) else {
                tracing::debug!(field = key, "ignoring unknown field");
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            raw.set(feature, value)?;
        }
        Ok(raw)
    }

    fn set(&mut self, feature: Feature, value: &str) -> Result<()> {
        match feature {
            Feature::UsageKwh => self.usage_kwh = Some(parse_float(feature, value)?),
            Feature::LaggingReactivePower => {
                self.lagging_reactive_power_kvarh = Some(parse_float(feature, value)?)
            }
            Feature::LeadingReactivePower => {
                self.leading_reactive_power_kvarh = Some(parse_float(feature, value)?)
            }
            Feature::LaggingPowerFactor => {
                self.lagging_power_factor = Some(parse_float(feature, value)?)
            }
            Feature::LeadingPowerFactor => {
                self.leading_power_factor = Some(parse_float(feature, value)?)
            }
            Feature::Nsm => self.nsm = Some(parse_seconds(value)?),
            Feature::DaySin => self.day_sin = Some(parse_float(feature, value)?),
            Feature::DayCos => self.day_cos = Some(parse_float(feature, value)?),
            Feature::WeekStatus => self.week_status = Some(WeekStatus::parse(value)?),
            Feature::LoadType => self.load_type = Some(LoadType::parse(value)?),
        }
        Ok(())
    }

    /// Numeric value of a field as the model sees it; missing fields are 0.
    pub fn value(&self, feature: Feature) -> f64 {
        match feature {
            Feature::UsageKwh => self.usage_kwh.unwrap_or(0.0),
            Feature::LaggingReactivePower => self.lagging_reactive_power_kvarh.unwrap_or(0.0),
            Feature::LeadingReactivePower => self.leading_reactive_power_kvarh.unwrap_or(0.0),
            Feature::LaggingPowerFactor => self.lagging_power_factor.unwrap_or(0.0),
            Feature::LeadingPowerFactor => self.leading_power_factor.unwrap_or(0.0),
            Feature::Nsm => self.nsm.unwrap_or(0) as f64,
            Feature::DaySin => self.day_sin.unwrap_or(0.0),
            Feature::DayCos => self.day_cos.unwrap_or(0.0),
            Feature::WeekStatus => self.week_status.map(WeekStatus::code).unwrap_or(0) as f64,
            Feature::LoadType => self.load_type.map(LoadType::code).unwrap_or(0) as f64,
        }
    }

    pub fn display(&self, feature: Feature) -> String {
        match feature {
            Feature::Nsm => self.nsm.map(|n| n.to_string()).unwrap_or_default(),
            Feature::WeekStatus => self.week_status.map(|s| s.as_str().to_string()).unwrap_or_default(),
            Feature::LoadType => self.load_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
            _ => self.float(feature).map(|v| v.to_string()).unwrap_or_default(),
        }
    }

    fn float(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::UsageKwh => self.usage_kwh,
            Feature::LaggingReactivePower => self.lagging_reactive_power_kvarh,
            Feature::LeadingReactivePower => self.leading_reactive_power_kvarh,
            Feature::LaggingPowerFactor => self.lagging_power_factor,
            Feature::LeadingPowerFactor => self.leading_power_factor,
            Feature::DaySin => self.day_sin,
            Feature::DayCos => self.day_cos,
            Feature::Nsm | Feature::WeekStatus | Feature::LoadType => None,
        }
    }

    /// Rejects submitted numeric values outside the range the form allows.
    pub fn validate(&self) -> Result<()> {
        for feature in Feature::ALL {
            let in_range = match feature {
                Feature::WeekStatus | Feature::LoadType => true,
                // compared as integers so large values are never rounded
                Feature::Nsm => self
                    .nsm
                    .map_or(true, |n| (0..=SECONDS_PER_DAY).contains(&n)),
                _ => self
                    .float(feature)
                    .map_or(true, |v| v >= feature.min() && v <= feature.max()),
            };
            if !in_range {
                return Err(EstimatorError::TypeConversion {
                    field: feature.name(),
                    value: self.display(feature),
                    reason: feature.range_hint(),
                });
            }
        }
        Ok(())
    }
}

fn parse_float(feature: Feature, value: &str) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|_| EstimatorError::TypeConversion {
        field: feature.name(),
        value: value.to_string(),
        reason: "expected a number",
    })?;
    if !parsed.is_finite() {
        return Err(EstimatorError::TypeConversion {
            field: feature.name(),
            value: value.to_string(),
            reason: "expected a finite number",
        });
    }
    Ok(parsed)
}

// NSM arrives as "3600" from the form but JSON clients may send "3600.0".
fn parse_seconds(value: &str) -> Result<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    let as_float = parse_float(Feature::Nsm, value)?;
    if as_float.fract() != 0.0 || as_float.abs() >= i64::MAX as f64 {
        return Err(EstimatorError::TypeConversion {
            field: Feature::Nsm.name(),
            value: value.to_string(),
            reason: "expected a whole number of seconds",
        });
    }
    Ok(as_float as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_codes_are_total() {
        assert_eq!(WeekStatus::parse("Weekday").unwrap().code(), 0);
        assert_eq!(WeekStatus::parse("Weekend").unwrap().code(), 1);
        assert_eq!(LoadType::parse("Light").unwrap().code(), 0);
        assert_eq!(LoadType::parse("Medium").unwrap().code(), 1);
        assert_eq!(LoadType::parse("Heavy").unwrap().code(), 2);
        for t in LoadType::ALL {
            assert_eq!(LoadType::from_code(t.code()), Some(t));
        }
    }

    #[test]
    fn unknown_category_names_the_field() {
        let err = LoadType::parse("Extreme").unwrap_err();
        match err {
            EstimatorError::InvalidCategory { field, value } => {
                assert_eq!(field, "Load_Type");
                assert_eq!(value, "Extreme");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // matching is case sensitive
        assert!(WeekStatus::parse("weekend").is_err());
    }

    #[test]
    fn dotted_column_alias_resolves() {
        assert_eq!(
            Feature::from_name("Lagging_Current_Reactive.Power_kVarh"),
            Some(Feature::LaggingReactivePower)
        );
        assert_eq!(Feature::from_name("CO2(tCO2)"), None);
    }

    #[test]
    fn from_fields_parses_and_skips_blanks() {
        let raw = RawInput::from_fields([
            ("Usage_kWh", "3.17"),
            ("NSM", "900"),
            ("Day_sin", ""),
            ("WeekStatus", "Weekend"),
            ("unrelated", "x"),
        ])
        .unwrap();
        assert_eq!(raw.usage_kwh, Some(3.17));
        assert_eq!(raw.nsm, Some(900));
        assert_eq!(raw.day_sin, None);
        assert_eq!(raw.week_status, Some(WeekStatus::Weekend));
        assert_eq!(raw.value(Feature::LoadType), 0.0);
    }

    #[test]
    fn non_numeric_values_are_type_errors() {
        let err = RawInput::from_fields([("Usage_kWh", "lots")]).unwrap_err();
        assert!(matches!(err, EstimatorError::TypeConversion { field: "Usage_kWh", .. }));

        let err = RawInput::from_fields([("NSM", "12.5")]).unwrap_err();
        assert!(matches!(err, EstimatorError::TypeConversion { field: "NSM", .. }));

        assert_eq!(RawInput::from_fields([("NSM", "1800.0")]).unwrap().nsm, Some(1800));
    }

    #[test]
    fn validate_enforces_form_minimums() {
        let raw = RawInput::from_fields([("Day_cos", "-0.5"), ("Usage_kWh", "1")]).unwrap();
        assert!(raw.validate().is_ok());

        let raw = RawInput::from_fields([("Day_cos", "-1.5")]).unwrap();
        assert!(raw.validate().is_err());

        let raw = RawInput::from_fields([("Lagging_Current_Power_Factor", "-0.01")]).unwrap();
        let err = raw.validate().unwrap_err();
        assert!(err.to_string().contains("Lagging_Current_Power_Factor"));
    }

    #[test]
    fn validate_enforces_form_maximums() {
        let ok = RawInput::from_fields([("NSM", "86400"), ("Leading_Current_Power_Factor", "100")]).unwrap();
        assert!(ok.validate().is_ok());

        for (field, value) in [
            ("NSM", "86401"),
            ("NSM", "9007199254740993"),
            ("Usage_kWh", "1e200"),
            ("Lagging_Current_Reactive_Power_kVarh", "100000.5"),
            ("Lagging_Current_Power_Factor", "100.01"),
            ("Day_sin", "1.2"),
        ] {
            let raw = RawInput::from_fields([(field, value)]).unwrap();
            match raw.validate() {
                Err(EstimatorError::TypeConversion { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{}={} should be out of range, got {:?}", field, value, other),
            }
        }
    }

    #[test]
    fn nsm_beyond_i64_is_a_type_error() {
        // 2^63 is one past i64::MAX
        let err = RawInput::from_fields([("NSM", "9223372036854775808.0")]).unwrap_err();
        assert!(matches!(err, EstimatorError::TypeConversion { field: "NSM", .. }));
    }
}
