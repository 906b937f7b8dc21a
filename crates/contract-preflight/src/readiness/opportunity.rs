//! Opportunity Spine: the commercial identity of the contract.

use super::check::{
    rank_candidates, CheckCode, DomainResult, Finding, CANDIDATE_THRESHOLD, REVIEW_DELTA,
};
use super::evidence::Battery;
use crate::entity::EntityStory;
use crate::text::{char_prefix, score_keywords, TextZones, EXTRACTION_WEIGHTS};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

const CRITICAL: &[CheckCode] = &[CheckCode::OppContractType, CheckCode::OppRoleLinkage];
const EFFECTIVE_DATE_WINDOW: usize = 5000;
const MAX_LISTED_TERRITORIES: usize = 4;

/// Contract types in scoring order; earlier entries win ties.
pub(crate) const AGREEMENT_TYPES: &[(&str, &[&str])] = &[
    (
        "distribution",
        &["distribution agreement", "distribution deal", "distribution contract", "distribution"],
    ),
    (
        "license",
        &["license agreement", "licensing agreement", "licence agreement", "license"],
    ),
    ("recording", &["recording agreement", "recording contract", "recording"]),
    (
        "publishing",
        &["publishing agreement", "publishing contract", "publishing deal", "publishing"],
    ),
    ("management", &["management agreement", "management contract", "management"]),
    ("service", &["service agreement", "services agreement", "service contract"]),
    ("amendment", &["amendment", "addendum", "modification agreement"]),
    ("termination", &["termination agreement", "termination notice", "termination"]),
];

const SUBTYPES: &[(&str, &[&str])] = &[
    (
        "Distribution",
        &[
            "distribution agreement",
            "digital distribution",
            "digital distribution agreement",
            "distribution",
            "download and streaming of records",
            "records monetisation",
            "records monetization",
            "channels monetisation",
            "channels monetization",
        ],
    ),
    (
        "Sync",
        &[
            "sync licensing",
            "sync license",
            "sync licence",
            "synch licensing",
            "synch license",
            "synch licences",
            "synch licenses",
            "synchronization",
            "synchronisation",
            "synch revenue",
            "sync revenue",
        ],
    ),
    (
        "Licensing Agreement",
        &[
            "licensing agreement",
            "license agreement",
            "licence agreement",
            "exclusive license",
            "exclusive licence",
            "exclusive right",
            "exclusive rights",
            "non-exclusive license",
            "non-exclusive licence",
        ],
    ),
    (
        "Pub Admin",
        &["admin publishing", "administration publishing", "publishing administration", "pub admin"],
    ),
    ("Co-Pub", &["co-publishing", "co publishing", "co-pub", "copub"]),
    ("CMA", &["cma", "catalog management agreement"]),
    ("CPA", &["cpa", "catalog participation agreement"]),
    ("CMA/CPA", &["cma/cpa", "cma and cpa", "cma + cpa", "combined cma cpa"]),
    (
        "Distribution w/ CMA and CPA",
        &["distribution with cma and cpa", "distribution w/ cma and cpa"],
    ),
    ("Distro CMA", &["distro cma", "distribution cma"]),
    (
        "Label Ventures",
        &[
            "label ventures",
            "label venture",
            "joint venture",
            "label services",
            "label service",
            "label services agreement",
        ],
    ),
    (
        "Profit Participation Agreement",
        &["profit participation agreement", "profit participation", "profit share"],
    ),
    ("Side Artist", &["side artist", "featured artist"]),
    ("Assignment", &["assignment agreement", "assignment of rights", "assignment"]),
    (
        "LE Revision",
        &["le revision", "legal entity revision", "legal entity change"],
    ),
    ("Other", &["other subtype", "other agreement"]),
];

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

static EFFECTIVE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        concat!(
            r"(?i)(?:effective\s+(?:date|as\s+of)|as\s+of|dated?\s+(?:as\s+of\s+)?|made\s+(?:on\s+)?(?:the\s+)?|entered\s+into\s+(?:as\s+of\s+)?(?:the\s+)?)",
            r"\s*[:;]?\s*",
            r"(\d{{1,2}}[\s/\-\.]+(?:{m})[\s/\-\.,]+\d{{2,4}}",
            r"|\d{{1,2}}[/\-\.]\d{{1,2}}[/\-\.]\d{{2,4}}",
            r"|(?:{m})\s+\d{{1,2}}[\s,]+\d{{2,4}}",
            r"|\d{{1,2}}(?:st|nd|rd|th)?\s+(?:day\s+of\s+)?(?:{m})[\s,]+\d{{2,4}})",
        ),
        m = MONTHS
    );
    Regex::new(&pattern).expect("effective date pattern compiles")
});

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal pattern compiles")
});

static DAY_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bday\s+of\b").expect("day-of pattern compiles"));

static TERM_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:(?:initial|minimum|the)?\s*term\s+(?:(?:of\s+)?(?:this\s+)?(?:agreement\s+)?(?:shall\s+be|is|commencing)\s+|of\s+)|",
        r"period\s+of\s+|duration\s+of\s+|for\s+a\s+period\s+of\s+)",
        r"(\d+)\s*(years?|months?|weeks?|days?)",
    ))
    .expect("term duration pattern compiles")
});

static TERM_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*[\-\(]?\s*(year|month|week|day)s?\s*(?:term|period|duration)")
        .expect("term phrase pattern compiles")
});

static PERPETUAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:perpetual|in\s+perpetuity|life\s+of\s+copyright)\b")
        .expect("perpetual pattern compiles")
});

static TERRITORY_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:territory|territories|licensed\s+territory|distribution\s+territory)\s*[:;]?\s*(.{1,200})",
    )
    .expect("territory context pattern compiles")
});

static TERRITORIES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:worldwide|world-wide|the\s+world)\b", "Worldwide"),
        (r"(?i)\b(?:united\s+states|USA|U\.S\.A|U\.S\.)\b", "United States"),
        (r"(?i)\b(?:united\s+kingdom|UK|U\.K\.)\b", "United Kingdom"),
        (r"(?i)\b(?:european\s+union|EU|europe)\b", "Europe"),
        (r"(?i)\bnorth\s+america\b", "North America"),
        (r"(?i)\b(?:asia[\s-]*pacific|APAC)\b", "Asia-Pacific"),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("territory pattern compiles"), label))
    .collect()
});

/// Best-scoring contract type, or `None` when no keyword appears.
///
/// A keyword in the title block weighs 3, anywhere in the text 1; the first
/// type reaching the highest weight wins.
pub fn guess_agreement_type(text: &str) -> Option<&'static str> {
    let zones = TextZones::new(text);
    let mut best: Option<&'static str> = None;
    let mut best_weight = 0u8;

    for (kind, keywords) in AGREEMENT_TYPES {
        for keyword in *keywords {
            let title = if zones.title().contains(keyword) { 3 } else { 0 };
            let body = if zones.body().contains(keyword) { 1 } else { 0 };
            if title + body > best_weight {
                best_weight = title + body;
                best = Some(*kind);
            }
        }
    }
    best
}

pub(crate) fn contract_type(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let Some(kind) = guess_agreement_type(text) else {
        return Finding::fail(0.0, "Contract type not detected in text");
    };

    let zones = TextZones::new(text);
    let keywords = AGREEMENT_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == kind)
        .map_or(&[][..], |(_, keywords)| *keywords);

    let mut body_keyword = None;
    for keyword in keywords {
        if zones.title().contains(keyword) {
            return Finding::pass(0.95, format!("'{keyword}' found in title block")).with_value(kind);
        }
        if body_keyword.is_none() && zones.body().contains(keyword) {
            body_keyword = Some(*keyword);
        }
    }

    match body_keyword {
        Some(keyword) => {
            Finding::review(0.6, format!("'{keyword}' found in body text only")).with_value(kind)
        }
        None => Finding::fail(0.0, "Contract type not detected"),
    }
}

pub(crate) fn contract_subtype(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let zones = TextZones::new(text);
    let scored = SUBTYPES
        .iter()
        .filter_map(|(name, keywords)| {
            score_keywords(&zones, keywords, EXTRACTION_WEIGHTS).map(|score| (name.to_string(), score))
        })
        .collect();
    let candidates = rank_candidates(scored, |_| 0);

    let Some(top) = candidates.first().cloned() else {
        return Finding::review(0.3, "No specific subtype phrase detected");
    };

    let finding = match candidates.get(1) {
        None => Finding::pass(top.confidence, format!("Subtype '{}' detected", top.value)),
        Some(runner_up) => {
            let above = candidates
                .iter()
                .filter(|candidate| candidate.confidence >= CANDIDATE_THRESHOLD)
                .count();
            if top.confidence - runner_up.confidence > REVIEW_DELTA && above <= 1 {
                Finding::pass(
                    top.confidence,
                    format!("Subtype '{}' detected (clear winner)", top.value),
                )
            } else {
                let alternatives = candidates
                    .iter()
                    .take(3)
                    .map(|candidate| candidate.value.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Finding::review(
                    top.confidence,
                    format!(
                        "Multiple plausible subtypes detected; analyst confirmation required ({alternatives})"
                    ),
                )
            }
        }
    };

    finding.with_value(top.value).with_candidates(candidates)
}

pub(crate) fn effective_date(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let window = char_prefix(text, EFFECTIVE_DATE_WINDOW);
    let Some(raw) = EFFECTIVE_DATE_RE
        .captures(window)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().trim().trim_end_matches([',', '.', ' ']).to_string())
    else {
        return Finding::fail(0.0, "No effective date found");
    };

    let normalized = normalize_date(&raw).map(|date| date.format("%Y-%m-%d").to_string());
    Finding::pass(0.9, "Date found near effective date marker")
        .with_value(raw)
        .with_normalized(normalized)
}

/// Parses the date shapes the effective-date pattern accepts; numeric dates read month first.
pub(crate) fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = ORDINAL_RE.replace_all(raw, "$1");
    let cleaned = DAY_OF_RE.replace_all(&cleaned, " ");
    let cleaned = cleaned
        .replace([',', '-', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    const TEXT_FORMATS: &[&str] = &["%d %B %Y", "%B %d %Y", "%d %B %y", "%B %d %y"];
    const NUMERIC_FORMATS: &[&str] = &["%m/%d/%Y", "%d/%m/%Y", "%m/%d/%y", "%d/%m/%y"];

    if let Some(date) = TEXT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
    {
        return Some(date);
    }

    let numeric = cleaned.replace(' ', "/");
    NUMERIC_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&numeric, format).ok())
}

pub(crate) fn term(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    if let Some(found) = PERPETUAL_RE.find(text) {
        return Finding::pass(0.9, "Perpetual/life-of-copyright term detected")
            .with_value("Perpetual")
            .with_hints([found.as_str()]);
    }
    if let Some(caps) = TERM_DURATION_RE.captures(text) {
        let value = format!("{} {}", &caps[1], caps[2].to_lowercase());
        return Finding::pass(0.85, format!("Term duration '{value}' detected")).with_value(value);
    }
    if let Some(caps) = TERM_PHRASE_RE.captures(text) {
        let value = format!("{} {}(s)", &caps[1], caps[2].to_lowercase());
        return Finding::review(0.6, format!("Possible term '{value}' detected from phrase pattern"))
            .with_value(value)
            .with_hints([&caps[0]]);
    }
    Finding::fail(0.0, "No term/duration found")
}

pub(crate) fn territory(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let context = TERRITORY_CONTEXT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |found| found.as_str());

    let mut found = territories_in(context);
    if found.is_empty() {
        found = territories_in(text);
    }

    match found.as_slice() {
        [] => Finding::fail(0.0, "No territory references found"),
        _ if found.contains(&"Worldwide") => {
            Finding::pass(0.9, "'Worldwide' territory detected").with_value("Worldwide")
        }
        [single] => Finding::pass(0.75, format!("Territory '{single}' detected")).with_value(*single),
        many => {
            let listed = many
                .iter()
                .take(MAX_LISTED_TERRITORIES)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            Finding::review(0.55, format!("Multiple territories detected: {listed}")).with_value(listed)
        }
    }
}

fn territories_in(zone: &str) -> Vec<&'static str> {
    TERRITORIES
        .iter()
        .filter(|(pattern, _)| pattern.is_match(zone))
        .map(|(_, label)| *label)
        .collect()
}

/// A missing legal entity fails, unless no account index was available to
/// resolve against: that is a review, since the parties were never looked up.
pub(crate) fn role_linkage(story: Option<&EntityStory>) -> Finding {
    let Some(story) = story else {
        return Finding::fail(0.0, "No resolution story available");
    };

    let has_legal = story.legal_entity_account.is_some();
    if !has_legal && story.resolver_unavailable {
        return Finding::review(0.3, "Account resolution unavailable; parties require manual confirmation")
            .with_value("Resolution unavailable");
    }
    let has_counterparty = !story.counterparties.is_empty()
        || !story.unresolved_counterparties.is_empty()
        || story.requires_manual_confirmation;

    match (has_legal, has_counterparty) {
        (true, true) if !story.counterparties.is_empty() => {
            Finding::pass(0.9, "Both legal entity and counterparty identified")
                .with_value("Legal entity + counterparty resolved")
        }
        (true, true) => Finding::review(
            0.6,
            "Legal entity found; counterparty requires manual confirmation",
        )
        .with_value("Legal entity resolved, counterparty unresolved"),
        (true, false) => Finding::review(0.4, "Legal entity found but no counterparty identified")
            .with_value("Legal entity only"),
        (false, true) => {
            Finding::fail(0.2, "No house legal entity resolved").with_value("No legal entity")
        }
        (false, false) => Finding::fail(
            0.0,
            "No role linkage; neither legal entity nor counterparty resolved",
        ),
    }
}

/// Runs the six Opportunity Spine checks in their fixed order.
pub fn build_opportunity_spine(text: &str, story: Option<&EntityStory>) -> DomainResult {
    let mut battery = Battery::new(text);
    battery.push(CheckCode::OppContractType, contract_type(text));
    battery.push(CheckCode::OppContractSubtype, contract_subtype(text));
    battery.push(CheckCode::OppEffectiveDate, effective_date(text));
    battery.push(CheckCode::OppTerm, term(text));
    battery.push(CheckCode::OppTerritory, territory(text));
    battery.push(CheckCode::OppRoleLinkage, role_linkage(story));
    battery.finish(CRITICAL)
}
