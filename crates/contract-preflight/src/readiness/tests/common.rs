use crate::entity::{CandidateSource, EntityRef, EntityStory};
use crate::readiness::{
    build_opportunity_spine, CheckCode, CheckResult, CheckStatus, DomainResult,
};
use crate::resolver::MatchStatus;
use crate::rules::ContractRules;

pub(super) fn entity(name: &str) -> EntityRef {
    EntityRef {
        name: name.to_string(),
        id: Some(format!("acct-{}", name.len())),
        confidence: 1.0,
        match_status: MatchStatus::Match,
        source_type: CandidateSource::StrictLabelValue,
    }
}

/// House entity and one counterparty, both cleanly matched.
pub(super) fn resolved_story() -> EntityStory {
    EntityStory {
        legal_entity_account: Some(entity("Harbor House Music")),
        counterparties: vec![entity("Acme Records Ltd")],
        ..EntityStory::default()
    }
}

pub(super) fn legal_only_story() -> EntityStory {
    EntityStory {
        legal_entity_account: Some(entity("Harbor House Music")),
        ..EntityStory::default()
    }
}

pub(super) fn rules() -> ContractRules {
    ContractRules::bundled().expect("bundled rules parse")
}

pub(super) fn spine(text: &str) -> DomainResult {
    build_opportunity_spine(text, Some(&resolved_story()))
}

/// A spine carrying only a contract type, for domains that read nothing else from it.
pub(super) fn spine_with_type(contract_type: Option<&str>) -> DomainResult {
    let status = if contract_type.is_some() {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };
    let check = CheckResult {
        code: CheckCode::OppContractType,
        label: CheckCode::OppContractType.label().to_string(),
        status,
        confidence: 0.95,
        value: contract_type.map(str::to_string),
        reason: "fixture".to_string(),
        candidates: Vec::new(),
        splits: Vec::new(),
        normalized_value: None,
        evidence: None,
    };
    DomainResult::roll_up(vec![check], &[])
}

pub(super) fn check(domain: &DomainResult, code: CheckCode) -> &CheckResult {
    domain
        .check(code)
        .unwrap_or_else(|| panic!("{} missing from domain", code.as_str()))
}

pub(super) fn codes(domain: &DomainResult) -> Vec<&'static str> {
    domain.checks.iter().map(|check| check.code.as_str()).collect()
}
