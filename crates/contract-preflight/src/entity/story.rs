use super::candidates::CandidateSource;
use super::parties::{extract_recital_parties, is_plausible_party_name, COMPANY_MARKERS_RE};
use crate::readiness::guess_agreement_type;
use crate::resolver::{AccountMatchRow, MatchStatus};
use crate::text::round_to;
use serde::{Deserialize, Serialize};

const COUNTERPARTY_THRESHOLD: f64 = 0.40;
const CLOSE_SCORE_SPREAD: f64 = 0.10;
const DEFAULT_HOUSE_ACCOUNT_TYPES: &[&str] = &["division"];

/// Which names and account types belong to the house side of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStoryPolicy {
    house_aliases: Vec<String>,
    house_account_types: Vec<String>,
}

impl Default for EntityStoryPolicy {
    fn default() -> Self {
        Self {
            house_aliases: Vec::new(),
            house_account_types: DEFAULT_HOUSE_ACCOUNT_TYPES
                .iter()
                .map(|kind| kind.to_string())
                .collect(),
        }
    }
}

impl EntityStoryPolicy {
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.house_aliases = aliases
            .into_iter()
            .map(|alias| alias.as_ref().trim().to_lowercase())
            .filter(|alias| !alias.is_empty())
            .collect();
        self
    }

    pub fn with_account_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.house_account_types = types
            .into_iter()
            .map(|kind| kind.as_ref().trim().to_lowercase())
            .filter(|kind| !kind.is_empty())
            .collect();
        self
    }

    pub fn house_aliases(&self) -> &[String] {
        &self.house_aliases
    }

    fn is_alias(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        self.house_aliases.iter().any(|alias| *alias == lowered)
    }

    fn is_house_type(&self, account_type: &str) -> bool {
        let lowered = account_type.trim().to_lowercase();
        self.house_account_types.iter().any(|kind| *kind == lowered)
    }

    fn is_house_row(&self, row: &AccountMatchRow) -> bool {
        self.is_alias(&row.source_field)
            || row.candidates.first().is_some_and(|top| {
                self.is_alias(&top.account_name) || self.is_house_type(&top.account_type)
            })
    }
}

fn no_match() -> MatchStatus {
    MatchStatus::NoMatch
}

fn header_fallback() -> CandidateSource {
    CandidateSource::HeaderFallback
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default = "no_match")]
    pub match_status: MatchStatus,
    #[serde(default = "header_fallback")]
    pub source_type: CandidateSource,
}

impl EntityRef {
    fn from_row(row: &AccountMatchRow) -> Self {
        Self {
            name: row.suggestion().unwrap_or(&row.source_field).to_string(),
            id: row
                .candidates
                .first()
                .map(|top| top.account_id.clone())
                .filter(|id| !id.is_empty()),
            confidence: round_to(row.match_score, 4),
            match_status: row.match_status,
            source_type: row.source_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingRecommendation {
    pub suggested_account_name: String,
    pub suggested_account_type: String,
    pub suggested_contact_name: Option<String>,
    pub reason: String,
}

impl OnboardingRecommendation {
    fn for_party(name: &str, agreement_type: Option<&str>) -> Self {
        let has_company_marker = COMPANY_MARKERS_RE.is_match(name);
        let account_type = match (agreement_type, has_company_marker) {
            (Some("distribution"), true) => "Record Label",
            (_, true) => "Company",
            (_, false) => "Artist",
        };
        Self {
            suggested_account_name: name.to_string(),
            suggested_account_type: account_type.to_string(),
            suggested_contact_name: None,
            reason: "Extracted from contract party block but not found in the account index.".to_string(),
        }
    }
}

/// Who the contract is between, as far as account resolution can tell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStory {
    pub legal_entity_account: Option<EntityRef>,
    pub counterparties: Vec<EntityRef>,
    pub unresolved_counterparties: Vec<String>,
    pub requires_manual_confirmation: bool,
    pub agreement_type_guess: Option<String>,
    pub reasoning_steps: Vec<String>,
    pub analyst_actions: Vec<String>,
    pub recital_parties: Vec<String>,
    pub new_entry_detected: bool,
    pub onboarding_recommendation: Option<OnboardingRecommendation>,
    /// Set when no account index was available to resolve against.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub resolver_unavailable: bool,
}

impl EntityStory {
    /// Story for a run with no account index; parties are left to the analyst.
    pub fn without_resolver(text: &str) -> Self {
        Self {
            requires_manual_confirmation: true,
            agreement_type_guess: guess_agreement_type(text).map(str::to_string),
            reasoning_steps: vec!["No account index is configured; account resolution was skipped.".to_string()],
            analyst_actions: vec!["Manual lookup required; identify the legal entity and counterparties.".to_string()],
            recital_parties: extract_recital_parties(text),
            resolver_unavailable: true,
            ..Self::default()
        }
    }
}

fn status_rank(status: MatchStatus) -> u8 {
    match status {
        MatchStatus::Match => 0,
        MatchStatus::Review => 1,
        MatchStatus::NoMatch => 2,
    }
}

/// Assigns match rows to the house legal entity and counterparties, then
/// checks the recital block for parties no row accounts for.
pub fn build_entity_story(rows: &[AccountMatchRow], text: &str, policy: &EntityStoryPolicy) -> EntityStory {
    let agreement_type = guess_agreement_type(text);
    if rows.is_empty() {
        return EntityStory {
            requires_manual_confirmation: true,
            agreement_type_guess: agreement_type.map(str::to_string),
            reasoning_steps: vec!["No account candidates were extracted from this document.".to_string()],
            analyst_actions: vec!["Manual lookup required; no automatic resolution available.".to_string()],
            ..EntityStory::default()
        };
    }

    let mut reasoning = Vec::new();
    let mut actions = Vec::new();

    let (mut house, others): (Vec<&AccountMatchRow>, Vec<&AccountMatchRow>) =
        rows.iter().partition(|row| policy.is_house_row(row));
    house.sort_by(|a, b| {
        status_rank(a.match_status)
            .cmp(&status_rank(b.match_status))
            .then_with(|| b.match_score.total_cmp(&a.match_score))
    });

    let legal_entity = house.first().map(|row| EntityRef::from_row(row));
    if let Some(legal) = &legal_entity {
        reasoning.push(format!(
            "\"{}\" identified as house-side entity via {}; assigned as legal entity.",
            legal.name,
            legal.source_type.describe()
        ));
        actions.push(if legal.match_status == MatchStatus::Match {
            format!("Legal entity \"{}\" passed house-side match; no action required.", legal.name)
        } else {
            format!(
                "Legal entity \"{}\" is in \"{}\" status; confirm assignment.",
                legal.name,
                legal.match_status.as_str()
            )
        });
    }

    let mut counterparties = Vec::new();
    for row in others.iter().filter(|row| row.match_score >= COUNTERPARTY_THRESHOLD) {
        let entry = EntityRef::from_row(row);
        reasoning.push(format!(
            "\"{}\" extracted via {}; assigned as counterparty.",
            entry.name,
            entry.source_type.describe()
        ));
        actions.push(if entry.match_status == MatchStatus::Match {
            format!("Counterparty \"{}\" passed automatic match; no action required.", entry.name)
        } else {
            format!(
                "Counterparty \"{}\" is in \"{}\" status; review match.",
                entry.name,
                entry.match_status.as_str()
            )
        });
        counterparties.push(entry);
    }

    let mut requires_manual = match &legal_entity {
        None => {
            reasoning.push("No house-side candidate passed threshold; manual identification required.".to_string());
            actions.push("Manual lookup required; identify the house legal entity for this contract.".to_string());
            true
        }
        Some(legal) => legal.match_status != MatchStatus::Match,
    };

    if counterparties.is_empty() {
        reasoning.push("No counterparty candidates met the confidence threshold.".to_string());
        actions.push(
            "No counterparty detected. Verify this is a unilateral document or identify counterparty manually."
                .to_string(),
        );
    }

    let close: Vec<f64> = others
        .iter()
        .filter(|row| row.match_status == MatchStatus::Review)
        .map(|row| row.match_score)
        .collect();
    if close.len() >= 2 {
        let spread = close.iter().copied().fold(f64::MIN, f64::max) - close.iter().copied().fold(f64::MAX, f64::min);
        if spread < CLOSE_SCORE_SPREAD {
            requires_manual = true;
        }
    }

    let recital_parties = extract_recital_parties(text);
    let mut unresolved = Vec::new();
    let mut onboarding = None;

    if let Some(legal) = &legal_entity {
        let mut resolved: Vec<String> = vec![legal.name.to_lowercase()];
        resolved.extend(counterparties.iter().map(|cp| cp.name.to_lowercase()));
        for row in rows {
            resolved.push(row.source_field.to_lowercase());
            if let Some(label) = row.suggestion() {
                resolved.push(label.to_lowercase());
            }
        }
        resolved.retain(|name| !name.is_empty());

        for party in &recital_parties {
            if !is_plausible_party_name(party) || policy.is_alias(party) {
                continue;
            }
            let lowered = party.to_lowercase();
            let known = resolved
                .iter()
                .any(|name| lowered.contains(name.as_str()) || name.contains(lowered.as_str()));
            if !known {
                unresolved.push(party.clone());
            }
        }

        if counterparties.is_empty() {
            if let Some(first) = unresolved.first() {
                reasoning.push(format!(
                    "Party \"{first}\" found in contract party block but not matched in the account index; new entry detected."
                ));
                actions.push(
                    "New counterparty not found in the account index. Create Account + Contact before proceeding."
                        .to_string(),
                );
                onboarding = Some(OnboardingRecommendation::for_party(first, agreement_type));
                requires_manual = true;
            }
        }
    }

    EntityStory {
        legal_entity_account: legal_entity,
        counterparties,
        unresolved_counterparties: unresolved,
        requires_manual_confirmation: requires_manual,
        agreement_type_guess: agreement_type.map(str::to_string),
        reasoning_steps: reasoning,
        analyst_actions: actions,
        recital_parties,
        new_entry_detected: onboarding.is_some(),
        onboarding_recommendation: onboarding,
        resolver_unavailable: false,
    }
}
