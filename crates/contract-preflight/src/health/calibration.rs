//! Calibration of raw health scores and the band table that names them.
//!
//! Models are trained elsewhere; this module only applies stored parameters.
//! Malformed parameters never fail a run: the score passes through unchanged.

use crate::text::round_to;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CALIBRATION_VERSION: &str = "calibrated_v1";
const FALLBACK_BAND: &str = "NEEDS_DETAILED_REVIEW";

/// Scores above 1 are read as percentages; the result is clamped to `[0, 1]`.
pub fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    let scaled = if value > 1.0 { value / 100.0 } else { value };
    scaled.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Platt,
    Isotonic,
    #[default]
    #[serde(other)]
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlattParams {
    pub coef: f64,
    pub intercept: f64,
}

impl Default for PlattParams {
    fn default() -> Self {
        Self {
            coef: 1.0,
            intercept: 0.0,
        }
    }
}

impl PlattParams {
    /// Logistic transform evaluated on the side that cannot overflow.
    fn apply(&self, probability: f64) -> f64 {
        let z = self.coef * probability + self.intercept;
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let exp = z.exp();
            exp / (1.0 + exp)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsotonicParams {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl IsotonicParams {
    /// Piecewise-linear interpolation, clamped at both ends.
    fn apply(&self, probability: f64) -> f64 {
        let (Some(&first_x), Some(&last_x)) = (self.x.first(), self.x.last()) else {
            return probability;
        };
        if self.x.len() != self.y.len() {
            return probability;
        }
        if probability <= first_x {
            return self.y[0].clamp(0.0, 1.0);
        }
        if probability >= last_x {
            return self.y[self.y.len() - 1].clamp(0.0, 1.0);
        }

        for idx in 1..self.x.len() {
            let (left_x, right_x) = (self.x[idx - 1], self.x[idx]);
            if !(left_x..=right_x).contains(&probability) {
                continue;
            }
            let (left_y, right_y) = (self.y[idx - 1], self.y[idx]);
            if right_x == left_x {
                return right_y.clamp(0.0, 1.0);
            }
            let t = (probability - left_x) / (right_x - left_x);
            return (left_y + t * (right_y - left_y)).clamp(0.0, 1.0);
        }
        probability
    }
}

/// Stored calibrator parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationModel {
    pub model_type: ModelType,
    pub platt: PlattParams,
    pub isotonic: IsotonicParams,
    pub version: Option<String>,
}

impl CalibrationModel {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn calibrate(&self, raw: f64) -> f64 {
        let probability = clamp_probability(raw);
        match self.model_type {
            ModelType::Identity => probability,
            ModelType::Platt => self.platt.apply(probability),
            ModelType::Isotonic => self.isotonic.apply(probability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    #[serde(default)]
    pub min: f64,
    #[serde(default = "one")]
    pub max: f64,
}

fn one() -> f64 {
    1.0
}

impl Band {
    fn new(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
        }
    }
}

/// Ordered half-open score bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub bands: Vec<Band>,
}

impl Default for BandTable {
    fn default() -> Self {
        Self {
            version: None,
            bands: vec![
                Band::new("VERY_HIGH_CONFIDENCE_HEALTHY", 0.95, 1.01),
                Band::new("HEALTHY_REVIEW_SPOTCHECK", 0.80, 0.95),
                Band::new(FALLBACK_BAND, 0.0, 0.80),
            ],
        }
    }
}

impl BandTable {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// First band with `min <= score < max`; a score on a band's upper edge
    /// falls back to the first band whose `max` still covers it.
    pub fn classify(&self, score: f64) -> &str {
        let score = clamp_probability(score);
        self.bands
            .iter()
            .find(|band| band.min <= score && score < band.max)
            .or_else(|| self.bands.iter().find(|band| score <= band.max))
            .map_or(FALLBACK_BAND, |band| band.name.as_str())
    }
}

/// Health fields attached to a single scored contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthDecoration {
    pub raw_health_score: f64,
    pub calibrated_health_score: f64,
    pub health_band: String,
    pub calibration_version: String,
}

/// Calibrator, band table, and the version reported when neither names one.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    model: CalibrationModel,
    bands: BandTable,
    fallback_version: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(CalibrationModel::identity(), BandTable::default())
    }
}

impl Calibration {
    pub fn new(model: CalibrationModel, bands: BandTable) -> Self {
        Self {
            model,
            bands,
            fallback_version: DEFAULT_CALIBRATION_VERSION.to_string(),
        }
    }

    pub fn with_fallback_version(mut self, version: impl Into<String>) -> Self {
        self.fallback_version = version.into();
        self
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn bands(&self) -> &BandTable {
        &self.bands
    }

    pub fn calibrate(&self, raw: f64) -> f64 {
        self.model.calibrate(raw)
    }

    pub fn band(&self, calibrated: f64) -> &str {
        self.bands.classify(calibrated)
    }

    pub fn version(&self) -> &str {
        self.model
            .version
            .as_deref()
            .or(self.bands.version.as_deref())
            .filter(|version| !version.is_empty())
            .unwrap_or(&self.fallback_version)
    }

    pub fn decorate(&self, raw: f64) -> HealthDecoration {
        let raw = clamp_probability(raw);
        let calibrated = self.calibrate(raw);
        HealthDecoration {
            raw_health_score: round_to(raw, 6),
            calibrated_health_score: round_to(calibrated, 6),
            health_band: self.band(calibrated).to_string(),
            calibration_version: self.version().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_percentages_and_bounds() {
        assert_eq!(clamp_probability(85.0), 0.85);
        assert_eq!(clamp_probability(-0.2), 0.0);
        assert_eq!(clamp_probability(f64::NAN), 0.0);
        assert_eq!(clamp_probability(0.4), 0.4);
    }

    #[test]
    fn identity_passes_through() {
        assert_eq!(CalibrationModel::identity().calibrate(0.42), 0.42);
    }

    #[test]
    fn platt_is_a_stable_sigmoid() {
        let model = CalibrationModel::from_json(
            r#"{"model_type": "platt", "platt": {"coef": 0.0, "intercept": 0.0}}"#,
        )
        .expect("platt model parses");
        assert!((model.calibrate(0.9) - 0.5).abs() < 1e-12);

        let steep = CalibrationModel {
            model_type: ModelType::Platt,
            platt: PlattParams {
                coef: -2000.0,
                intercept: 0.0,
            },
            ..CalibrationModel::default()
        };
        let value = steep.calibrate(1.0);
        assert!(value.is_finite() && value >= 0.0 && value < 1e-12);
    }

    #[test]
    fn isotonic_interpolates_and_clamps() {
        let model = CalibrationModel::from_json(
            r#"{"model_type": "isotonic", "isotonic": {"x": [0.2, 0.6], "y": [0.1, 0.9]}, "version": "iso_v2"}"#,
        )
        .expect("isotonic model parses");
        assert!((model.calibrate(0.4) - 0.5).abs() < 1e-12);
        assert_eq!(model.calibrate(0.1), 0.1);
        assert_eq!(model.calibrate(0.95), 0.9);

        let malformed = CalibrationModel {
            model_type: ModelType::Isotonic,
            isotonic: IsotonicParams {
                x: vec![0.1, 0.5],
                y: vec![0.3],
            },
            ..CalibrationModel::default()
        };
        assert_eq!(malformed.calibrate(0.3), 0.3);
    }

    #[test]
    fn unknown_model_type_is_identity() {
        let model = CalibrationModel::from_json(r#"{"model_type": "beta"}"#).expect("parses");
        assert_eq!(model.model_type, ModelType::Identity);
    }

    #[test]
    fn default_bands_are_half_open() {
        let bands = BandTable::default();
        assert_eq!(bands.classify(1.0), "VERY_HIGH_CONFIDENCE_HEALTHY");
        assert_eq!(bands.classify(0.95), "VERY_HIGH_CONFIDENCE_HEALTHY");
        assert_eq!(bands.classify(0.9499), "HEALTHY_REVIEW_SPOTCHECK");
        assert_eq!(bands.classify(0.80), "HEALTHY_REVIEW_SPOTCHECK");
        assert_eq!(bands.classify(0.0), "NEEDS_DETAILED_REVIEW");
    }

    #[test]
    fn top_band_is_max_inclusive() {
        let bands = BandTable::from_json(
            r#"{"version": "bands_v3", "bands": [{"name": "TOP", "min": 0.9, "max": 1.0}, {"name": "REST", "min": 0.0, "max": 0.9}]}"#,
        )
        .expect("bands parse");
        assert_eq!(bands.classify(1.0), "TOP");
        assert_eq!(bands.classify(0.5), "REST");
    }

    #[test]
    fn version_resolution_order() {
        let bands = BandTable {
            version: Some("bands_v3".to_string()),
            ..BandTable::default()
        };
        let model = CalibrationModel {
            version: Some("model_v9".to_string()),
            ..CalibrationModel::default()
        };

        assert_eq!(Calibration::new(model, bands.clone()).version(), "model_v9");
        assert_eq!(
            Calibration::new(CalibrationModel::identity(), bands).version(),
            "bands_v3"
        );
        assert_eq!(Calibration::default().version(), "calibrated_v1");
        assert_eq!(
            Calibration::default().with_fallback_version("env_v4").version(),
            "env_v4"
        );
    }

    #[test]
    fn decorate_reports_all_fields() {
        let decoration = Calibration::default().decorate(97.0);
        assert_eq!(decoration.raw_health_score, 0.97);
        assert_eq!(decoration.calibrated_health_score, 0.97);
        assert_eq!(decoration.health_band, "VERY_HIGH_CONFIDENCE_HEALTHY");
        assert_eq!(decoration.calibration_version, "calibrated_v1");
    }
}
