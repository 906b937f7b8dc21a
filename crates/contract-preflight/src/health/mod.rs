//! Composite health score: section scores, gate penalty, calibration, band.

mod calibration;

pub use calibration::{
    clamp_probability, Band, BandTable, Calibration, CalibrationModel, HealthDecoration,
    IsotonicParams, ModelType, PlattParams, DEFAULT_CALIBRATION_VERSION,
};

use crate::entity::EntityStory;
use crate::quality::GateColor;
use crate::readiness::{CheckStatus, DomainResult};
use crate::text::round_to;
use serde::{Deserialize, Serialize};

const REVIEW_CREDIT: f64 = 0.5;
const ENTITY_FULL: f64 = 1.0;
const ENTITY_LEGAL_ONLY: f64 = 0.6;

/// Relative weight of each section in the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionWeights {
    pub opportunity_spine: f64,
    pub schedule_structure: f64,
    pub financials_readiness: f64,
    pub addons_readiness: f64,
    pub entity_resolution: f64,
}

impl Default for SectionWeights {
    fn default() -> Self {
        Self {
            opportunity_spine: 0.25,
            schedule_structure: 0.15,
            financials_readiness: 0.25,
            addons_readiness: 0.15,
            entity_resolution: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionScores {
    pub opportunity_spine: f64,
    pub schedule_structure: f64,
    pub financials_readiness: f64,
    pub addons_readiness: f64,
    pub entity_resolution: f64,
}

impl SectionScores {
    fn weighted(&self, weights: &SectionWeights) -> f64 {
        self.opportunity_spine * weights.opportunity_spine
            + self.schedule_structure * weights.schedule_structure
            + self.financials_readiness * weights.financials_readiness
            + self.addons_readiness * weights.addons_readiness
            + self.entity_resolution * weights.entity_resolution
    }

    fn rounded(self) -> Self {
        Self {
            opportunity_spine: round_to(self.opportunity_spine, 6),
            schedule_structure: round_to(self.schedule_structure, 6),
            financials_readiness: round_to(self.financials_readiness, 6),
            addons_readiness: round_to(self.addons_readiness, 6),
            entity_resolution: round_to(self.entity_resolution, 6),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScoreResult {
    pub raw_score: f64,
    pub penalized_score: f64,
    pub calibrated_score: f64,
    pub band: String,
    pub calibration_version: String,
    pub section_scores: SectionScores,
    pub gate_penalty: f64,
}

/// Everything the scorer reads; a missing domain scores 0.
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs<'a> {
    pub gate_color: GateColor,
    pub opportunity_spine: Option<&'a DomainResult>,
    pub schedule_structure: Option<&'a DomainResult>,
    pub financials_readiness: Option<&'a DomainResult>,
    pub addons_readiness: Option<&'a DomainResult>,
    pub entity_story: Option<&'a EntityStory>,
}

/// Mean check credit: a pass earns its confidence, a review half of it.
pub fn module_score(module: Option<&DomainResult>) -> f64 {
    let Some(module) = module.filter(|module| !module.checks.is_empty()) else {
        return 0.0;
    };
    let total: f64 = module
        .checks
        .iter()
        .map(|check| match check.status {
            CheckStatus::Pass => check.confidence,
            CheckStatus::Review => check.confidence * REVIEW_CREDIT,
            CheckStatus::Fail => 0.0,
        })
        .sum();
    total / module.checks.len() as f64
}

pub fn entity_score(story: Option<&EntityStory>) -> f64 {
    match story {
        Some(story) if story.legal_entity_account.is_some() => {
            if story.counterparties.is_empty() {
                ENTITY_LEGAL_ONLY
            } else {
                ENTITY_FULL
            }
        }
        _ => 0.0,
    }
}

pub const fn gate_penalty(color: GateColor) -> f64 {
    match color {
        GateColor::Red => 0.35,
        GateColor::Yellow => 0.15,
        GateColor::Green => 0.0,
    }
}

/// Weighted section scores and calibration settings.
#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    weights: SectionWeights,
    calibration: Calibration,
}

impl HealthScorer {
    pub fn new(weights: SectionWeights, calibration: Calibration) -> Self {
        Self {
            weights,
            calibration,
        }
    }

    pub fn weights(&self) -> &SectionWeights {
        &self.weights
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// `raw_score` is the pre-penalty weighted sum; calibration consumes the
    /// penalized score, floored at 0.
    pub fn score(&self, inputs: HealthInputs<'_>) -> HealthScoreResult {
        let sections = SectionScores {
            opportunity_spine: module_score(inputs.opportunity_spine),
            schedule_structure: module_score(inputs.schedule_structure),
            financials_readiness: module_score(inputs.financials_readiness),
            addons_readiness: module_score(inputs.addons_readiness),
            entity_resolution: entity_score(inputs.entity_story),
        };
        let raw = sections.weighted(&self.weights);
        let penalty = gate_penalty(inputs.gate_color);
        let penalized = (raw - penalty).max(0.0);
        let calibrated = self.calibration.calibrate(penalized);

        HealthScoreResult {
            raw_score: round_to(raw, 6),
            penalized_score: round_to(penalized, 6),
            calibrated_score: round_to(calibrated, 6),
            band: self.calibration.band(calibrated).to_string(),
            calibration_version: self.calibration.version().to_string(),
            section_scores: sections.rounded(),
            gate_penalty: penalty,
        }
    }
}

/// Scores with default weights and identity calibration.
pub fn compute_preflight_health_score(inputs: HealthInputs<'_>) -> HealthScoreResult {
    HealthScorer::default().score(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CandidateSource, EntityRef};
    use crate::readiness::{CheckCode, CheckResult};
    use crate::resolver::MatchStatus;

    fn check(code: CheckCode, status: CheckStatus, confidence: f64) -> CheckResult {
        CheckResult {
            code,
            label: code.label().to_string(),
            status,
            confidence,
            value: None,
            reason: String::new(),
            candidates: Vec::new(),
            splits: Vec::new(),
            normalized_value: None,
            evidence: None,
        }
    }

    fn domain(statuses: &[(CheckStatus, f64)]) -> DomainResult {
        let checks = statuses
            .iter()
            .map(|(status, confidence)| check(CheckCode::OppTerm, *status, *confidence))
            .collect();
        DomainResult::roll_up(checks, &[])
    }

    fn entity(name: &str) -> EntityRef {
        EntityRef {
            name: name.to_string(),
            id: None,
            confidence: 1.0,
            match_status: MatchStatus::Match,
            source_type: CandidateSource::StrictLabelValue,
        }
    }

    #[test]
    fn module_score_credits_review_half() {
        let module = domain(&[(CheckStatus::Pass, 0.8), (CheckStatus::Review, 0.6), (CheckStatus::Fail, 0.9)]);
        assert!((module_score(Some(&module)) - (0.8 + 0.3) / 3.0).abs() < 1e-12);
        assert_eq!(module_score(None), 0.0);
    }

    #[test]
    fn entity_score_tiers() {
        let mut story = EntityStory::default();
        assert_eq!(entity_score(Some(&story)), 0.0);
        story.counterparties.push(entity("Acme Records Ltd"));
        assert_eq!(entity_score(Some(&story)), 0.0);
        story.legal_entity_account = Some(entity("Harbor House Music"));
        assert_eq!(entity_score(Some(&story)), 1.0);
        story.counterparties.clear();
        assert_eq!(entity_score(Some(&story)), 0.6);
        assert_eq!(entity_score(None), 0.0);
    }

    #[test]
    fn all_fail_red_scores_zero() {
        let failing = domain(&[(CheckStatus::Fail, 0.0), (CheckStatus::Fail, 0.2)]);
        let result = compute_preflight_health_score(HealthInputs {
            gate_color: GateColor::Red,
            opportunity_spine: Some(&failing),
            schedule_structure: Some(&failing),
            financials_readiness: Some(&failing),
            addons_readiness: Some(&failing),
            entity_story: None,
        });
        assert_eq!(result.raw_score, 0.0);
        assert_eq!(result.penalized_score, 0.0);
        assert_eq!(result.gate_penalty, 0.35);
        assert_eq!(result.band, "NEEDS_DETAILED_REVIEW");
    }

    #[test]
    fn all_pass_green_scores_high() {
        let passing = domain(&[(CheckStatus::Pass, 0.9), (CheckStatus::Pass, 0.85)]);
        let story = EntityStory {
            legal_entity_account: Some(entity("Harbor House Music")),
            counterparties: vec![entity("Acme Records Ltd")],
            ..EntityStory::default()
        };
        let result = compute_preflight_health_score(HealthInputs {
            gate_color: GateColor::Green,
            opportunity_spine: Some(&passing),
            schedule_structure: Some(&passing),
            financials_readiness: Some(&passing),
            addons_readiness: Some(&passing),
            entity_story: Some(&story),
        });
        assert!(result.raw_score >= 0.7);
        assert_eq!(result.gate_penalty, 0.0);
        assert_eq!(result.raw_score, result.penalized_score);
        assert_eq!(result.section_scores.entity_resolution, 1.0);
        assert_eq!(result.calibration_version, "calibrated_v1");
    }

    #[test]
    fn yellow_penalty_floors_at_zero() {
        let weak = domain(&[(CheckStatus::Review, 0.2)]);
        let result = compute_preflight_health_score(HealthInputs {
            gate_color: GateColor::Yellow,
            opportunity_spine: Some(&weak),
            schedule_structure: None,
            financials_readiness: None,
            addons_readiness: None,
            entity_story: None,
        });
        assert!(result.raw_score > 0.0);
        assert_eq!(result.penalized_score, 0.0);
        assert_eq!(result.calibrated_score, 0.0);
    }

    #[test]
    fn raw_score_is_monotonic_in_sections() {
        let low = domain(&[(CheckStatus::Review, 0.5)]);
        let high = domain(&[(CheckStatus::Pass, 0.5)]);
        let score = |module: &DomainResult| {
            compute_preflight_health_score(HealthInputs {
                gate_color: GateColor::Green,
                opportunity_spine: Some(module),
                schedule_structure: None,
                financials_readiness: None,
                addons_readiness: None,
                entity_story: None,
            })
            .raw_score
        };
        assert!(score(&high) > score(&low));
    }
}
