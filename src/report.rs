use serde::Serialize;

use crate::config::Profile;

// Predictions cover a 15-minute interval.
pub const INTERVALS_PER_HOUR: f64 = 4.0;
// Yearly tree absorption in tons: 30 kg best case, 15 kg worst case.
pub const TREE_TONS_PER_YEAR_HIGH: f64 = 0.030;
pub const TREE_TONS_PER_YEAR_LOW: f64 = 0.015;
pub const DRIVING_KM_PER_TON: f64 = 888.0;
pub const FLYING_KM_PER_TON: f64 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeRange {
    pub min: u64,
    pub max: u64,
}

/// Everything shown to the user for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub prediction: f64,
    pub hourly: Option<f64>,
    pub unit: String,
    pub trees: TreeRange,
    pub driving_km: f64,
    pub flying_km: f64,
}

impl Report {
    pub fn new(prediction: f64, profile: &Profile) -> Self {
        let hourly = profile.hourly.then(|| prediction * INTERVALS_PER_HOUR);
        // Offsets only make sense for positive emissions.
        let basis = hourly.unwrap_or(prediction).max(0.0);

        Self {
            prediction,
            hourly,
            unit: profile.unit.clone(),
            trees: TreeRange {
                min: (basis / TREE_TONS_PER_YEAR_HIGH).round() as u64,
                max: (basis / TREE_TONS_PER_YEAR_LOW).round() as u64,
            },
            driving_km: basis * DRIVING_KM_PER_TON,
            flying_km: basis * FLYING_KM_PER_TON,
        }
    }

    /// Value the commentary is based on.
    pub fn reported(&self) -> f64 {
        self.hourly.unwrap_or(self.prediction)
    }

    pub fn headline(&self) -> String {
        match self.hourly {
            Some(h) => format!("Estimated hourly CO2 emission: {:.2} {}", h, self.unit),
            None => format!("Predicted CO2 Emission: {:.2} {}", self.prediction, self.unit),
        }
    }

    pub fn commentary(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        if self.hourly.is_some() {
            lines.push(format!(
                "Model output for one 15-minute interval: {:.2} {}",
                self.prediction, self.unit
            ));
        }
        lines.push(format!(
            "Offsetting this for a year takes roughly {} to {} trees.",
            self.trees.min, self.trees.max
        ));
        lines.push(format!("Comparable to driving {:.1} km by car.", self.driving_km));
        lines.push(format!("Comparable to flying {:.1} km.", self.flying_km));
        lines
    }
}
