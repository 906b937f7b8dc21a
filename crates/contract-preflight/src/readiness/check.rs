use crate::text::{round_to, ZoneScore};
use serde::{Deserialize, Serialize};

/// Minimum score for a ranked candidate to be listed.
pub(crate) const CANDIDATE_THRESHOLD: f64 = 0.20;
/// Lead the top candidate needs over the runner-up to pass without review.
pub(crate) const REVIEW_DELTA: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Review,
    Fail,
}

impl CheckStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Review => "review",
            CheckStatus::Fail => "fail",
        }
    }
}

/// Stable public identifiers of every readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckCode {
    OppContractType,
    OppContractSubtype,
    OppEffectiveDate,
    OppTerm,
    OppTerritory,
    OppRoleLinkage,
    SchPresence,
    SchType,
    SchOwnership,
    SchLifecycle,
    SchRoleAlignment,
    FinRevenueModel,
    FinSplitSignals,
    FinPaymentTiming,
    FinThresholds,
    FinAlignment,
    AddonOptions,
    AddonMerchPitch,
    AddonNegotiation,
    AddonWindows,
    AddonEconomics,
    AddonExpectedness,
}

impl CheckCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            CheckCode::OppContractType => "OPP_CONTRACT_TYPE",
            CheckCode::OppContractSubtype => "OPP_CONTRACT_SUBTYPE",
            CheckCode::OppEffectiveDate => "OPP_EFFECTIVE_DATE",
            CheckCode::OppTerm => "OPP_TERM",
            CheckCode::OppTerritory => "OPP_TERRITORY",
            CheckCode::OppRoleLinkage => "OPP_ROLE_LINKAGE",
            CheckCode::SchPresence => "SCH_PRESENCE",
            CheckCode::SchType => "SCH_TYPE",
            CheckCode::SchOwnership => "SCH_OWNERSHIP",
            CheckCode::SchLifecycle => "SCH_LIFECYCLE",
            CheckCode::SchRoleAlignment => "SCH_ROLE_ALIGNMENT",
            CheckCode::FinRevenueModel => "FIN_REVENUE_MODEL",
            CheckCode::FinSplitSignals => "FIN_SPLIT_SIGNALS",
            CheckCode::FinPaymentTiming => "FIN_PAYMENT_TIMING",
            CheckCode::FinThresholds => "FIN_THRESHOLDS",
            CheckCode::FinAlignment => "FIN_ALIGNMENT",
            CheckCode::AddonOptions => "ADDON_OPTIONS",
            CheckCode::AddonMerchPitch => "ADDON_MERCH_PITCH",
            CheckCode::AddonNegotiation => "ADDON_NEGOTIATION",
            CheckCode::AddonWindows => "ADDON_WINDOWS",
            CheckCode::AddonEconomics => "ADDON_ECONOMICS",
            CheckCode::AddonExpectedness => "ADDON_EXPECTEDNESS",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CheckCode::OppContractType => "Contract Type",
            CheckCode::OppContractSubtype => "Contract Subtype",
            CheckCode::OppEffectiveDate => "Effective Date",
            CheckCode::OppTerm => "Term",
            CheckCode::OppTerritory => "Territory",
            CheckCode::OppRoleLinkage => "Role Linkage",
            CheckCode::SchPresence => "Schedule Presence",
            CheckCode::SchType => "Schedule Type",
            CheckCode::SchOwnership => "Ownership Signals",
            CheckCode::SchLifecycle => "Lifecycle Signals",
            CheckCode::SchRoleAlignment => "Role Alignment",
            CheckCode::FinRevenueModel => "Revenue Model",
            CheckCode::FinSplitSignals => "Split Signals",
            CheckCode::FinPaymentTiming => "Payment Timing",
            CheckCode::FinThresholds => "Thresholds",
            CheckCode::FinAlignment => "Contract Type Alignment",
            CheckCode::AddonOptions => "Options",
            CheckCode::AddonMerchPitch => "Merchandising & Pitching",
            CheckCode::AddonNegotiation => "Negotiation Rights",
            CheckCode::AddonWindows => "Exercise Windows",
            CheckCode::AddonEconomics => "Add-on Economics",
            CheckCode::AddonExpectedness => "Add-on Expectedness",
        }
    }
}

/// A ranked alternative for checks that choose among several vocabulary entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub value: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Source passage backing a check, for analyst review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub context: String,
    pub match_term: String,
    pub char_offset: usize,
}

/// One scored readiness rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub code: CheckCode,
    pub label: String,
    pub status: CheckStatus,
    pub confidence: f64,
    pub value: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<RankedCandidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckSummary {
    pub passed: usize,
    pub review: usize,
    pub failed: usize,
}

impl CheckSummary {
    fn tally(checks: &[CheckResult]) -> Self {
        checks
            .iter()
            .fold(Self::default(), |mut summary, check| {
                match check.status {
                    CheckStatus::Pass => summary.passed += 1,
                    CheckStatus::Review => summary.review += 1,
                    CheckStatus::Fail => summary.failed += 1,
                }
                summary
            })
    }
}

/// Rolled-up outcome of one readiness domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainResult {
    pub status: CheckStatus,
    pub checks: Vec<CheckResult>,
    pub summary: CheckSummary,
}

impl DomainResult {
    /// A failing critical check fails the domain; any other non-pass check sends it to review.
    pub fn roll_up(checks: Vec<CheckResult>, critical: &[CheckCode]) -> Self {
        let summary = CheckSummary::tally(&checks);
        let critical_failure = checks
            .iter()
            .any(|check| check.status == CheckStatus::Fail && critical.contains(&check.code));

        let status = if critical_failure {
            CheckStatus::Fail
        } else if summary.review > 0 || summary.failed > 0 {
            CheckStatus::Review
        } else {
            CheckStatus::Pass
        };

        Self {
            status,
            checks,
            summary,
        }
    }

    pub fn check(&self, code: CheckCode) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.code == code)
    }

    pub fn value_of(&self, code: CheckCode) -> Option<&str> {
        self.check(code).and_then(|check| check.value.as_deref())
    }
}

/// Extractor output before it is bound to a check code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Finding {
    pub(crate) status: CheckStatus,
    pub(crate) confidence: f64,
    pub(crate) value: Option<String>,
    pub(crate) reason: String,
    /// Terms used to locate supporting evidence; never serialized.
    pub(crate) hints: Vec<String>,
    pub(crate) candidates: Vec<RankedCandidate>,
    pub(crate) splits: Vec<f64>,
    pub(crate) normalized_value: Option<String>,
}

impl Finding {
    fn new(status: CheckStatus, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            status,
            confidence,
            value: None,
            reason: reason.into(),
            hints: Vec::new(),
            candidates: Vec::new(),
            splits: Vec::new(),
            normalized_value: None,
        }
    }

    pub(crate) fn pass(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(CheckStatus::Pass, confidence, reason)
    }

    pub(crate) fn review(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(CheckStatus::Review, confidence, reason)
    }

    pub(crate) fn fail(confidence: f64, reason: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, confidence, reason)
    }

    pub(crate) fn no_text() -> Self {
        Self::fail(0.0, "No text available")
    }

    pub(crate) fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub(crate) fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(Into::into));
        self
    }

    pub(crate) fn with_candidates(mut self, candidates: Vec<RankedCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub(crate) fn with_splits(mut self, splits: Vec<f64>) -> Self {
        self.splits = splits;
        self
    }

    pub(crate) fn with_normalized(mut self, normalized: Option<String>) -> Self {
        self.normalized_value = normalized;
        self
    }

    pub(crate) fn into_result(self, code: CheckCode) -> (CheckResult, Vec<String>) {
        let result = CheckResult {
            code,
            label: code.label().to_string(),
            status: self.status,
            confidence: round_to(self.confidence, 4),
            value: self.value,
            reason: self.reason,
            candidates: self.candidates,
            splits: self.splits,
            normalized_value: self.normalized_value,
            evidence: None,
        };
        (result, self.hints)
    }
}

/// Orders scored vocabulary entries and keeps the ones worth listing.
///
/// Scores sort descending; `tie_rank` breaks ties before the name. The top entry
/// is always kept, the rest only at or above [`CANDIDATE_THRESHOLD`].
pub(crate) fn rank_candidates<F>(mut scored: Vec<(String, ZoneScore)>, tie_rank: F) -> Vec<RankedCandidate>
where
    F: Fn(&str) -> usize,
{
    scored.sort_by(|(left_name, left), (right_name, right)| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| tie_rank(left_name).cmp(&tie_rank(right_name)))
            .then_with(|| left_name.cmp(right_name))
    });

    scored
        .into_iter()
        .enumerate()
        .filter(|(idx, (_, scored))| *idx == 0 || scored.score >= CANDIDATE_THRESHOLD)
        .map(|(_, (name, scored))| RankedCandidate {
            value: name,
            confidence: round_to(scored.score, 2),
            evidence: scored.hits,
        })
        .collect()
}
