use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, net::SocketAddr};

// ---------- Profile ----------

// Deployment settings that used to be baked into separate copies of the
// form: which unit the model predicts in and how results are presented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub title: String,
    pub unit: String,
    /// Refuse to estimate while Usage_kWh or NSM is zero.
    pub zero_guard: bool,
    /// Treat predictions as 15-minute values and report them per hour.
    pub hourly: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            title: "CO2 Emission Prediction".to_string(),
            unit: "units".to_string(),
            zero_guard: false,
            hourly: false,
        }
    }
}

impl Profile {
    pub const BUILTIN: [&'static str; 4] = ["basic", "guarded", "hourly", "compact"];

    pub fn builtin(name: &str) -> Option<Profile> {
        let base = Profile::default();
        let profile = match name {
            "basic" => base,
            "guarded" => Profile {
                unit: "tons".into(),
                zero_guard: true,
                ..base
            },
            "hourly" => Profile {
                title: "Hourly CO2 Emission Estimate".into(),
                unit: "tons".into(),
                zero_guard: true,
                hourly: true,
            },
            "compact" => Profile {
                unit: "tons".into(),
                ..base
            },
            _ => return None,
        };
        Some(profile)
    }

    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read profile at {}", path))?;
        let profile: Profile =
            serde_json::from_str(&data).with_context(|| format!("invalid profile JSON in {}", path))?;
        if profile.unit.trim().is_empty() {
            bail!("profile {} has an empty unit", path);
        }
        Ok(profile)
    }
}

// ---------- Environment ----------

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_path: String,
    pub meta_path: Option<String>,
    pub addr: SocketAddr,
    pub profile: Profile,
    pub log_predictions: bool,
    /// Whether `profile.unit` was set explicitly rather than defaulted.
    pub unit_pinned: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = get("MODEL_PATH").context("MODEL_PATH not set")?;
        let meta_path = get("META_PATH");

        let port: u16 = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid PORT {:?}", p))?,
            None => 8080,
        };
        let host = get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid BIND_ADDR {:?}", host))?;

        let (profile, unit_pinned) = match (get("PROFILE_PATH"), get("PROFILE")) {
            (Some(path), _) => (Profile::load(&path)?, true),
            (None, Some(name)) => {
                let profile = Profile::builtin(&name).with_context(|| {
                    format!("unknown PROFILE {:?}; expected one of {:?}", name, Profile::BUILTIN)
                })?;
                (profile, true)
            }
            (None, None) => (Profile::default(), false),
        };

        Ok(Self {
            model_path,
            meta_path,
            addr,
            profile,
            log_predictions: get("LOG_PRED").as_deref() == Some("1"),
            unit_pinned,
        })
    }

    /// Profile to serve. An explicitly chosen profile keeps its unit;
    /// otherwise the artifact's unit wins over the "units" default.
    pub fn resolve_profile(&self, artifact_unit: Option<&str>) -> Profile {
        let mut profile = self.profile.clone();
        if !self.unit_pinned {
            if let Some(unit) = artifact_unit.filter(|u| !u.trim().is_empty()) {
                profile.unit = unit.to_string();
            }
        }
        profile
    }
}
