//! Financials Readiness: revenue model, splits, payment timing, thresholds, and their fit with the contract type.

use super::check::{CheckCode, CheckStatus, DomainResult, Finding};
use super::evidence::Battery;
use crate::text::keyword_hits;
use regex::Regex;
use std::sync::LazyLock;

const CRITICAL: &[CheckCode] = &[CheckCode::FinAlignment];

const REVENUE_MODELS: &[(&str, &[&str])] = &[
    (
        "revenue_share",
        &[
            "revenue share",
            "share of revenue",
            "of revenue",
            "net receipts",
            "gross receipts",
            "revenue split",
        ],
    ),
    ("royalty", &["royalty", "royalties"]),
    (
        "sync_fee",
        &[
            "sync revenue",
            "synch revenue",
            "sync fee",
            "synch fee",
            "synch licenses",
            "sync licenses",
        ],
    ),
    ("distribution_fee", &["distribution fee", "distribution commission"]),
    ("commission", &["commission"]),
    (
        "flat_fee",
        &["flat fee", "fixed fee", "one-off fee", "one-time fee", "buyout"],
    ),
    (
        "advance",
        &["recoupable advance", "advance against", "non-returnable advance"],
    ),
];

const GENERIC_REVENUE_TERMS: &[&str] = &[
    "revenue",
    "income",
    "proceeds",
    "payment",
    "fee",
    "consideration",
];

const SPLIT_TERMS: &[&str] = &["split", "share", "percentage", "percent", "royalty rate"];

const PAYMENT_CADENCE: &[&str] = &[
    "quarterly",
    "monthly",
    "semi-annually",
    "semi-annual",
    "annually",
    "bi-annual",
    "accounting period",
];

const PAYMENT_GENERIC: &[&str] = &["payable", "upon receipt", "on demand", "payment terms"];

const THRESHOLD_TERMS: &[&str] = &[
    "minimum guarantee",
    "minimum payment",
    "payment threshold",
    "threshold",
    "recoupment",
    "recoup",
    "capped at",
    "cap of",
    "floor",
    "in excess of",
    "minimum of",
];

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:\.\d+)?)\s*(?:%|percent\b|per\s+cent\b)").expect("percent pattern compiles")
});

static RATIO_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*/\s*(\d{1,2})\s+(?:split|basis)\b").expect("ratio split pattern compiles")
});

static PAYMENT_WINDOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwithin\s+(\d{1,3})\s+(?:business\s+|calendar\s+|working\s+)?days?\b")
        .expect("payment window pattern compiles")
});

static NET_TERMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnet\s*(\d{2,3})\b").expect("net terms pattern compiles"));

pub(crate) static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[\$€£¥]\s*\d[\d,]*(?:\.\d+)?|\b\d[\d,]*(?:\.\d+)?\s*(?:dollars|usd|eur|euros|gbp|pounds)\b",
    )
    .expect("amount pattern compiles")
});

pub(crate) fn revenue_model(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let models: Vec<(&str, &str)> = REVENUE_MODELS
        .iter()
        .filter_map(|(model, keywords)| {
            keyword_hits(&lowered, keywords)
                .first()
                .map(|keyword| (*model, *keyword))
        })
        .collect();

    if !models.is_empty() {
        let confidence = (0.8 + 0.05 * (models.len() - 1) as f64).min(0.95);
        let value = models.iter().map(|(model, _)| *model).collect::<Vec<_>>().join(", ");
        return Finding::pass(
            confidence,
            format!("Revenue model terms detected ({} models)", models.len()),
        )
        .with_value(value)
        .with_hints(models.iter().map(|(_, keyword)| *keyword));
    }

    match keyword_hits(&lowered, GENERIC_REVENUE_TERMS).first() {
        Some(term) => Finding::review(0.4, format!("Only generic revenue language found ('{term}')")),
        None => Finding::fail(0.1, "No revenue model language detected"),
    }
}

/// Literal percentages in first-seen order, deduplicated and limited to (0, 100].
pub(crate) fn split_percentages(text: &str) -> Vec<f64> {
    let mut splits: Vec<f64> = Vec::new();
    let mut record = |value: f64| {
        if value > 0.0 && value <= 100.0 && !splits.contains(&value) {
            splits.push(value);
        }
    };

    for caps in PERCENT_RE.captures_iter(text) {
        if let Ok(value) = caps[1].parse::<f64>() {
            record(value);
        }
    }
    for caps in RATIO_SPLIT_RE.captures_iter(text) {
        let (Ok(left), Ok(right)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
            continue;
        };
        if (left + right - 100.0).abs() < f64::EPSILON {
            record(left);
            record(right);
        }
    }
    splits
}

fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}%")
    } else {
        format!("{value}%")
    }
}

pub(crate) fn split_signals(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let splits = split_percentages(text);
    if !splits.is_empty() {
        let confidence = (0.8 + 0.03 * (splits.len() - 1) as f64).min(0.95);
        let listed: Vec<String> = splits.iter().copied().map(format_percent).collect();
        return Finding::pass(confidence, format!("{} split percentage(s) detected", splits.len()))
            .with_value(listed.join(", "))
            .with_hints(listed)
            .with_splits(splits);
    }

    let lowered = text.to_lowercase();
    match keyword_hits(&lowered, SPLIT_TERMS).first() {
        Some(term) => Finding::review(0.4, format!("'{term}' language without numeric splits"))
            .with_hints([*term]),
        None => Finding::fail(0.1, "No split or percentage signals detected"),
    }
}

pub(crate) fn payment_timing(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let cadence = keyword_hits(&lowered, PAYMENT_CADENCE);

    let mut windows: Vec<String> = Vec::new();
    let mut hints: Vec<String> = Vec::new();
    for caps in PAYMENT_WINDOW_RE.captures_iter(text) {
        let window = format!("within {} days", &caps[1]);
        if !windows.contains(&window) {
            windows.push(window);
            hints.push(caps[0].to_string());
        }
    }
    for caps in NET_TERMS_RE.captures_iter(text) {
        let window = format!("net {}", &caps[1]);
        if !windows.contains(&window) {
            windows.push(window);
            hints.push(caps[0].to_string());
        }
    }

    if !windows.is_empty() {
        let confidence = if cadence.is_empty() { 0.85 } else { 0.9 };
        let mut parts = windows;
        parts.extend(cadence.iter().map(|term| term.to_string()));
        return Finding::pass(confidence, "Explicit payment window detected")
            .with_value(parts.join("; "))
            .with_hints(hints);
    }
    if let Some(term) = cadence.first() {
        return Finding::review(0.6, "Payment cadence found without an explicit payment window")
            .with_value(*term)
            .with_hints([*term]);
    }
    match keyword_hits(&lowered, PAYMENT_GENERIC).first() {
        Some(term) => Finding::review(0.4, format!("Only generic payment language found ('{term}')")),
        None => Finding::fail(0.1, "No payment timing terms detected"),
    }
}

pub(crate) fn thresholds(text: &str) -> Finding {
    if text.is_empty() {
        return Finding::no_text();
    }
    let lowered = text.to_lowercase();
    let Some(term) = keyword_hits(&lowered, THRESHOLD_TERMS).first().copied() else {
        return Finding::review(0.35, "No threshold or minimum language; confirm none apply");
    };

    match AMOUNT_RE.find(text) {
        Some(amount) => Finding::pass(0.85, format!("Threshold '{term}' with amount detected"))
            .with_value(format!("{term}; {}", amount.as_str().trim()))
            .with_hints([term]),
        None => Finding::review(0.5, format!("Threshold language '{term}' without an amount"))
            .with_value(term)
            .with_hints([term]),
    }
}

/// Whether the financial signals found fit what the contract type implies.
///
/// Termination and amendment forms need no full economics; every other known
/// type needs at least two passing signals to pass outright.
pub(crate) fn alignment(spine: &DomainResult, schedule: &DomainResult, signals: &[&Finding]) -> Finding {
    let Some(contract_type) = spine.value_of(CheckCode::OppContractType) else {
        return Finding::fail(0.1, "Contract type unknown; financial terms cannot be aligned");
    };
    let any_signal = signals.iter().any(|signal| signal.status != CheckStatus::Fail);
    let passing = signals
        .iter()
        .filter(|signal| signal.status == CheckStatus::Pass)
        .count();

    let mut value = contract_type.to_string();
    if let Some(schedule_type) = schedule.value_of(CheckCode::SchType) {
        value.push_str(" / ");
        value.push_str(schedule_type);
    }

    match contract_type {
        "termination" | "amendment" if any_signal => Finding::pass(
            0.75,
            format!("'{contract_type}' form with settlement or payment terms present"),
        )
        .with_value(value),
        "termination" | "amendment" => Finding::review(
            0.5,
            format!("'{contract_type}' form; no financial terms expected beyond settlement"),
        )
        .with_value(value),
        _ if passing >= 2 => Finding::pass(
            0.85,
            format!("{passing}/{} financial signals support a {contract_type} contract", signals.len()),
        )
        .with_value(value),
        _ if passing == 1 || any_signal => Finding::review(
            0.5,
            format!("Partial financial terms for a {contract_type} contract; verify economics"),
        )
        .with_value(value),
        _ => Finding::fail(
            0.1,
            format!("No revenue, split or timing terms for a {contract_type} contract"),
        )
        .with_value(value),
    }
}

/// Runs the five Financials Readiness checks.
pub fn build_financials_readiness(text: &str, spine: &DomainResult, schedule: &DomainResult) -> DomainResult {
    let revenue = revenue_model(text);
    let splits = split_signals(text);
    let timing = payment_timing(text);
    let minimums = thresholds(text);
    let fit = alignment(spine, schedule, &[&revenue, &splits, &timing]);

    let mut battery = Battery::new(text);
    battery.push(CheckCode::FinRevenueModel, revenue);
    battery.push(CheckCode::FinSplitSignals, splits);
    battery.push(CheckCode::FinPaymentTiming, timing);
    battery.push(CheckCode::FinThresholds, minimums);
    battery.push(CheckCode::FinAlignment, fit);
    battery.finish(CRITICAL)
}
