//! Schedule Structure: whether the schedule/exhibit layer supports the contract type.

use super::check::{rank_candidates, CheckCode, DomainResult, Finding, REVIEW_DELTA};
use super::evidence::Battery;
use crate::entity::EntityStory;
use crate::rules::ContractRules;
use crate::text::{keyword_hits, score_keywords, TextZones, EXTRACTION_WEIGHTS};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

const CRITICAL: &[CheckCode] = &[CheckCode::SchPresence, CheckCode::SchRoleAlignment];
const GENERAL_SCHEDULE: &str = "general_schedule";

const SCHEDULE_TYPES: &[(&str, &[&str])] = &[
    (
        "distro_sync_existing_masters",
        &[
            "distro & sync",
            "distribution and sync",
            "distro and sync",
            "existing masters",
            "master exploitation",
            "digital exploitation",
            "for digital distribution",
            "download and streaming of records",
            "for synch licenses",
            "for sync licenses",
            "synch licenses",
            "synch license",
            "synch revenue",
            "sync revenue",
        ],
    ),
    (
        "catalog_acquisition_masters",
        &[
            "catalog acquisition",
            "acquisition schedule",
            "schedule 1",
            "schedule i",
            "masters acquisition",
        ],
    ),
    (
        "termination_schedule",
        &[
            "termination schedule",
            "termination notice",
            "offboard",
            "actual termination date",
            "termination date",
        ],
    ),
    (GENERAL_SCHEDULE, &["schedule", "exhibit", "appendix", "annex"]),
];

const OWNERSHIP_KEYWORDS: &[&str] = &[
    "master ownership",
    "composition ownership",
    "asset owner",
    "acquired",
    "ownership split",
    "split",
    "rights ownership",
];

const LIFECYCLE_KEYWORDS: &[&str] = &[
    "termination notice",
    "offboard date",
    "actual termination date",
    "effective date",
    "delivery date",
    "commencement",
];

static SCHEDULE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(schedule|exhibit|appendix|annex)\b").expect("schedule marker pattern compiles")
});

pub(crate) fn presence(text: &str, contract_type: Option<&str>) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    if let Some(marker) = SCHEDULE_MARKER_RE.find(text) {
        return Finding::pass(0.9, "Found schedule/exhibit references in document text")
            .with_value("Schedule references detected")
            .with_hints([marker.as_str()]);
    }
    if matches!(contract_type, Some("termination" | "amendment")) {
        return Finding::review(
            0.5,
            "No explicit schedule markers; may be valid for termination/amendment form",
        );
    }
    Finding::fail(0.0, "No schedule/exhibit markers detected")
}

/// Ranks schedule types by zone score, then rules priority, then name.
///
/// `general_schedule` is only reported when no specific type matched.
pub(crate) fn schedule_type(text: &str, rules: &ContractRules) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let zones = TextZones::new(text);
    let mut scores: BTreeMap<String, _> = SCHEDULE_TYPES
        .iter()
        .filter_map(|(name, keywords)| {
            score_keywords(&zones, keywords, EXTRACTION_WEIGHTS).map(|score| (name.to_string(), score))
        })
        .collect();

    if scores.keys().any(|name| name != GENERAL_SCHEDULE) {
        scores.remove(GENERAL_SCHEDULE);
    }

    let priority = rules.schedule_type_priority();
    let tie_rank = |name: &str| {
        priority
            .iter()
            .position(|kind| kind == name)
            .unwrap_or(priority.len())
    };
    let candidates = rank_candidates(scores.into_iter().collect(), tie_rank);

    let Some(top) = candidates.first().cloned() else {
        return Finding::review(0.3, "No clear schedule type markers found");
    };

    let finding = match candidates.get(1) {
        None => Finding::pass(top.confidence, format!("Schedule type '{}' detected", top.value)),
        Some(runner_up) if top.confidence - runner_up.confidence > REVIEW_DELTA => Finding::pass(
            top.confidence,
            format!("Schedule type '{}' detected (clear winner)", top.value),
        ),
        Some(_) => {
            let alternatives = candidates
                .iter()
                .take(3)
                .map(|candidate| candidate.value.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Finding::review(
                top.confidence,
                format!("Multiple schedule types detected; analyst confirmation required ({alternatives})"),
            )
        }
    };

    finding.with_value(top.value).with_candidates(candidates)
}

pub(crate) fn ownership(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let hits = keyword_hits(&text.to_lowercase(), OWNERSHIP_KEYWORDS);
    match hits.as_slice() {
        [] => Finding::fail(0.0, "No ownership markers detected"),
        [only] => Finding::review(0.55, "Limited ownership evidence; verify schedule rows manually")
            .with_value(*only)
            .with_hints([*only]),
        many => {
            let top = &many[..many.len().min(3)];
            Finding::pass(0.85, format!("Ownership markers detected ({} hits)", many.len()))
                .with_value(top.join(", "))
                .with_hints(top.iter().copied())
        }
    }
}

pub(crate) fn lifecycle(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let hits = keyword_hits(&text.to_lowercase(), LIFECYCLE_KEYWORDS);
    match hits.as_slice() {
        [] => Finding::review(0.35, "No lifecycle markers detected"),
        [only] => Finding::review(0.5, "Single lifecycle marker detected; review timing fields")
            .with_value(*only)
            .with_hints([*only]),
        many => {
            let top = &many[..many.len().min(3)];
            Finding::pass(0.8, format!("Lifecycle timing markers detected ({} hits)", many.len()))
                .with_value(top.join(", "))
                .with_hints(top.iter().copied())
        }
    }
}

/// Fails without a legal entity, except when no account index was available,
/// which is a review because resolution never ran.
pub(crate) fn role_alignment(story: Option<&EntityStory>) -> Finding {
    let Some(story) = story else {
        return Finding::fail(0.0, "No resolution story available");
    };
    let has_legal = story.legal_entity_account.is_some();
    if !has_legal && story.resolver_unavailable {
        return Finding::review(0.3, "Account resolution unavailable; schedule ownership requires review")
            .with_value("Resolution unavailable");
    }

    if has_legal && !story.counterparties.is_empty() {
        Finding::pass(0.9, "Schedule routing can be anchored to resolved parties")
            .with_value("Legal + counterparty resolved")
    } else if has_legal && !story.unresolved_counterparties.is_empty() {
        Finding::review(0.6, "Legal entity resolved but counterparty needs manual onboarding")
            .with_value("Counterparty unresolved")
    } else if has_legal {
        Finding::review(0.5, "Counterparty not resolved; schedule ownership requires review")
            .with_value("Legal entity only")
    } else {
        Finding::fail(0.2, "No legal entity resolved for schedule alignment").with_value("No legal entity")
    }
}

/// Runs the five Schedule Structure checks, reading the contract type from the spine.
pub fn build_schedule_structure(
    text: &str,
    story: Option<&EntityStory>,
    spine: &DomainResult,
    rules: &ContractRules,
) -> DomainResult {
    let contract_type = spine.value_of(CheckCode::OppContractType);

    let mut battery = Battery::new(text);
    battery.push(CheckCode::SchPresence, presence(text, contract_type));
    battery.push(CheckCode::SchType, schedule_type(text, rules));
    battery.push(CheckCode::SchOwnership, ownership(text));
    battery.push(CheckCode::SchLifecycle, lifecycle(text));
    battery.push(CheckCode::SchRoleAlignment, role_alignment(story));
    battery.finish(CRITICAL)
}
