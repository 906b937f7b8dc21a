use super::{AccountCandidate, AccountResolver, Classification};
use crate::entity::{
    extract_account_candidates, extract_recital_parties, is_borne_in_verb_context, CandidateSource,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const MAX_RESOLVER_CANDIDATES: usize = 24;
const NO_SUGGESTION: &str = "\u{2014}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    Review,
    NoMatch,
    Match,
}

impl MatchStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Review => "review",
            MatchStatus::NoMatch => "no-match",
            MatchStatus::Match => "match",
        }
    }
}

impl From<Classification> for MatchStatus {
    fn from(classification: Classification) -> Self {
        match classification {
            Classification::Matched => MatchStatus::Match,
            Classification::Ambiguous => MatchStatus::Review,
            Classification::NotFound => MatchStatus::NoMatch,
        }
    }
}

/// One resolved account candidate, shaped for the review matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMatchRow {
    pub source_field: String,
    pub suggested_label: String,
    pub match_method: String,
    pub match_score: f64,
    pub confidence_pct: u32,
    pub match_status: MatchStatus,
    pub classification: Classification,
    pub candidates: Vec<AccountCandidate>,
    pub explanation: String,
    pub provider: String,
    pub source_type: CandidateSource,
}

impl AccountMatchRow {
    /// The suggested account name, or `None` when nothing was suggested.
    pub fn suggestion(&self) -> Option<&str> {
        Some(self.suggested_label.as_str()).filter(|label| *label != NO_SUGGESTION && !label.is_empty())
    }
}

/// Resolves each extracted account candidate once.
///
/// Rows sort `review` first, then `no-match`, then `match`; ties go to the
/// higher confidence, then the source field compared case-insensitively.
pub fn match_accounts(
    resolver: &dyn AccountResolver,
    text: &str,
    headers: &[String],
) -> Vec<AccountMatchRow> {
    let candidates = extract_account_candidates(text, headers, resolver.known_names());
    if candidates.is_empty() {
        return Vec::new();
    }
    let recital: HashSet<String> = extract_recital_parties(text)
        .into_iter()
        .map(|party| party.to_lowercase())
        .collect();

    let mut rows: Vec<AccountMatchRow> = candidates
        .into_iter()
        .take(MAX_RESOLVER_CANDIDATES)
        .filter(|candidate| !is_borne_in_verb_context(&candidate.value, text))
        .map(|candidate| {
            let resolution = resolver.resolve(&candidate.value);
            let source_type = if recital.contains(&candidate.value.to_lowercase()) {
                CandidateSource::RecitalParty
            } else {
                candidate.source_type
            };
            let match_method = match (resolution.classification, resolution.top()) {
                (Classification::NotFound, _) | (_, None) => "none".to_string(),
                (_, Some(top)) => top.match_tier.as_str().to_string(),
            };
            let suggested_label = resolution
                .top()
                .map(|top| top.account_name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| NO_SUGGESTION.to_string());

            AccountMatchRow {
                source_field: candidate.value,
                suggested_label,
                match_method,
                match_score: resolution.score,
                confidence_pct: (resolution.score * 100.0).round().clamp(0.0, 100.0) as u32,
                match_status: resolution.classification.into(),
                classification: resolution.classification,
                candidates: resolution.candidates,
                explanation: resolution.explanation,
                provider: resolution.provider,
                source_type,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.match_status
            .cmp(&b.match_status)
            .then_with(|| b.confidence_pct.cmp(&a.confidence_pct))
            .then_with(|| a.source_field.to_lowercase().cmp(&b.source_field.to_lowercase()))
    });
    debug!(rows = rows.len(), "account candidates resolved");
    rows
}
