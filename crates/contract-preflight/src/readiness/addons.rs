//! Add-ons Readiness: options, merchandising and pitching, negotiation rights, windows, pricing.

use super::check::{CheckCode, CheckStatus, DomainResult, Finding};
use super::evidence::Battery;
use super::financials::AMOUNT_RE;
use crate::text::keyword_hits;
use regex::Regex;
use std::sync::LazyLock;

const CRITICAL: &[CheckCode] = &[CheckCode::AddonExpectedness];

const OPTION_TERMS: &[&str] = &[
    "option period",
    "option rights",
    "option right",
    "option to renew",
    "option to extend",
    "renewal option",
    "extension option",
    "exercise the option",
    "exercise of the option",
    "option term",
    "option notice",
];

const MERCH_PITCH_TERMS: &[&str] = &[
    "merchandising rights",
    "merchandising",
    "merchandise",
    "merch rights",
    "pitching",
    "sync pitching",
    "placement services",
    "sync placement",
    "sync representation",
    "brand partnership",
    "endorsement",
];

const NEGOTIATION_TERMS: &[&str] = &[
    "right of first negotiation",
    "first negotiation",
    "matching rights",
    "matching right",
    "right to match",
    "right of first refusal",
    "first refusal",
    "first look",
    "last look",
    "right of first offer",
    "first offer",
];

const WINDOW_TERMS: &[&str] = &["notice period", "exercise period", "option period", "window"];

const ECONOMICS_TERMS: &[&str] = &[
    "additional commission",
    "additional fee",
    "additional royalty",
    "option fee",
    "option price",
    "exercise price",
    "commission",
    "surcharge",
    "uplift",
    "premium",
    "incremental",
    "bonus",
];

static WINDOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:within|no later than|not later than|at least|not less than|upon|for)\s+",
        r"(\d{1,3})\s+(?:business\s+|calendar\s+|working\s+)?(days?|weeks?|months?)\b",
    ))
    .expect("window pattern compiles")
});

static ECONOMICS_PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:\.\d+)?\s*%").expect("economics percent pattern compiles")
});

fn listed(hits: &[&str]) -> String {
    hits.iter().take(3).copied().collect::<Vec<_>>().join(", ")
}

pub(crate) fn options(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let hits = keyword_hits(&lowered, OPTION_TERMS);
    if !hits.is_empty() {
        let confidence = (0.8 + 0.05 * (hits.len() - 1) as f64).min(0.95);
        return Finding::pass(confidence, format!("Option terms detected ({} hits)", hits.len()))
            .with_value(listed(&hits))
            .with_hints(hits);
    }
    if lowered.contains("option") {
        return Finding::review(0.45, "Bare 'option' reference without option mechanics")
            .with_hints(["option"]);
    }
    Finding::fail(0.1, "No option language detected")
}

pub(crate) fn merch_pitch(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let hits = keyword_hits(&text.to_lowercase(), MERCH_PITCH_TERMS);
    match hits.len() {
        0 => Finding::fail(0.1, "No merchandising or pitching rights detected"),
        1 => Finding::review(0.5, "Single merchandising/pitching reference; confirm scope")
            .with_value(hits[0])
            .with_hints(hits),
        count => {
            let confidence = (0.75 + 0.05 * (count - 2) as f64).min(0.95);
            Finding::pass(
                confidence,
                format!("Merchandising/pitching rights detected ({count} hits)"),
            )
            .with_value(listed(&hits))
            .with_hints(hits)
        }
    }
}

pub(crate) fn negotiation(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let hits = keyword_hits(&lowered, NEGOTIATION_TERMS);
    if !hits.is_empty() {
        let confidence = (0.8 + 0.05 * (hits.len() - 1) as f64).min(0.95);
        return Finding::pass(confidence, "Negotiation or matching rights detected")
            .with_value(listed(&hits))
            .with_hints(hits);
    }
    if lowered.contains("negotiat") {
        return Finding::review(0.45, "Negotiation referenced without a defined right")
            .with_hints(["negotiat"]);
    }
    Finding::fail(0.1, "No negotiation rights detected")
}

/// Exercise/notice windows, normalized to `N unit` with business/calendar qualifiers dropped.
pub(crate) fn windows(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let mut found: Vec<String> = Vec::new();
    let mut hints: Vec<String> = Vec::new();
    for caps in WINDOW_RE.captures_iter(text) {
        let count = &caps[1];
        let mut unit = caps[2].to_lowercase();
        if count != "1" && !unit.ends_with('s') {
            unit.push('s');
        }
        let window = format!("{count} {unit}");
        if !found.contains(&window) {
            found.push(window);
            hints.push(caps[0].to_string());
        }
    }

    if !found.is_empty() {
        return Finding::pass(0.85, format!("{} exercise/notice window(s) detected", found.len()))
            .with_value(found.join(", "))
            .with_hints(hints);
    }
    let lowered = text.to_lowercase();
    match keyword_hits(&lowered, WINDOW_TERMS).first() {
        Some(term) => Finding::review(0.45, format!("'{term}' referenced without a duration"))
            .with_hints([*term]),
        None => Finding::fail(0.1, "No exercise or notice windows detected"),
    }
}

pub(crate) fn economics(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let term = keyword_hits(&lowered, ECONOMICS_TERMS).first().copied();
    let literal = ECONOMICS_PERCENT_RE
        .find(text)
        .or_else(|| AMOUNT_RE.find(text))
        .map(|found| found.as_str().trim().to_string());

    match (term, literal) {
        (Some(term), Some(literal)) => {
            Finding::pass(0.85, format!("Add-on pricing '{term}' with a rate or amount"))
                .with_value(format!("{term}; {literal}"))
                .with_hints([term.to_string(), literal])
        }
        (Some(term), None) => Finding::review(0.45, format!("'{term}' referenced without a rate or amount"))
            .with_value(term)
            .with_hints([term]),
        (None, Some(literal)) => {
            Finding::review(0.45, "Rate or amount present without add-on pricing language")
                .with_value(literal.clone())
                .with_hints([literal])
        }
        (None, None) => Finding::fail(0.1, "No add-on pricing detected"),
    }
}

/// Whether the add-on coverage is what the contract type leads one to expect.
pub(crate) fn expectedness(spine: &DomainResult, signals: &[&Finding]) -> Finding {
    let contract_type = spine.value_of(CheckCode::OppContractType);
    if contract_type == Some("termination") {
        return Finding::review(0.5, "Add-ons are not expected for termination contracts")
            .with_value("termination");
    }

    let present = signals
        .iter()
        .filter(|signal| signal.status == CheckStatus::Pass)
        .count();
    let value = format!("{present}/{} add-on signals", signals.len());

    match (present, contract_type) {
        (3.., _) => Finding::pass(0.85, "Add-on coverage is complete enough for automation").with_value(value),
        (1..=2, _) => Finding::review(0.5, "Partial add-on coverage; confirm remaining terms").with_value(value),
        (_, Some(kind)) => Finding::review(
            0.35,
            format!("No add-on language in a {kind} contract; confirm none are expected"),
        )
        .with_value(value),
        (_, None) => Finding::fail(0.1, "No add-on language and contract type unknown"),
    }
}

/// Runs the six Add-ons Readiness checks.
pub fn build_addons_readiness(text: &str, spine: &DomainResult) -> DomainResult {
    let option_terms = options(text);
    let merch = merch_pitch(text);
    let rights = negotiation(text);
    let timing = windows(text);
    let pricing = economics(text);
    let coverage = expectedness(spine, &[&option_terms, &merch, &rights, &timing, &pricing]);

    let mut battery = Battery::new(text);
    battery.push(CheckCode::AddonOptions, option_terms);
    battery.push(CheckCode::AddonMerchPitch, merch);
    battery.push(CheckCode::AddonNegotiation, rights);
    battery.push(CheckCode::AddonWindows, timing);
    battery.push(CheckCode::AddonEconomics, pricing);
    battery.push(CheckCode::AddonExpectedness, coverage);
    battery.finish(CRITICAL)
}
