use super::check::{CheckCode, CheckResult, DomainResult, Evidence, Finding};
use crate::text::{char_offset, widen};
use regex::RegexBuilder;
use std::sync::LazyLock;

const EVIDENCE_RADIUS: usize = 300;
const MIN_TERM_CHARS: usize = 3;

static QUOTED_TERM_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"'([^']{3,80})'").expect("quoted term pattern compiles"));

/// Collects checks for one domain and attaches source evidence as they are added.
pub(crate) struct Battery<'a> {
    text: &'a str,
    checks: Vec<CheckResult>,
}

impl<'a> Battery<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            checks: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, code: CheckCode, finding: Finding) {
        let (mut result, hints) = finding.into_result(code);
        result.evidence = locate_evidence(self.text, &result, &hints);
        self.checks.push(result);
    }

    pub(crate) fn finish(self, critical: &[CheckCode]) -> DomainResult {
        DomainResult::roll_up(self.checks, critical)
    }
}

/// Search order: extractor hints, the extracted value, quoted terms in the reason, the label.
fn search_terms(result: &CheckResult, hints: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = hints.to_vec();
    if let Some(value) = result.value.as_deref() {
        terms.push(value.to_string());
    }
    terms.extend(
        QUOTED_TERM_RE
            .captures_iter(&result.reason)
            .filter_map(|caps| caps.get(1))
            .map(|term| term.as_str().to_string()),
    );
    terms.push(result.label.clone());
    terms
}

fn locate_evidence(text: &str, result: &CheckResult, hints: &[String]) -> Option<Evidence> {
    if text.trim().is_empty() {
        return None;
    }

    search_terms(result, hints)
        .into_iter()
        .map(|term| term.trim().to_string())
        .filter(|term| term.chars().count() >= MIN_TERM_CHARS)
        .find_map(|term| evidence_for(text, &term))
}

fn evidence_for(text: &str, term: &str) -> Option<Evidence> {
    let pattern = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()?;
    let found = pattern.find(text)?;

    let (mut from, mut to) = widen(text, found.start(), found.end(), EVIDENCE_RADIUS);
    // Snap the window to whole lines when a line break falls inside it.
    if let Some(newline) = text[from..found.start()].rfind('\n') {
        from += newline + 1;
    }
    if let Some(newline) = text[found.end()..to].find('\n') {
        to = found.end() + newline;
    }

    Some(Evidence {
        context: text[from..to].trim().to_string(),
        match_term: term.to_string(),
        char_offset: char_offset(text, found.start()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_snaps_to_the_matching_line() {
        let text = "Preamble line\nThe Territory shall be the World.\nSignature block";
        let mut battery = Battery::new(text);
        battery.push(
            CheckCode::OppTerritory,
            Finding::pass(0.9, "found").with_hints(["territory"]),
        );
        let domain = battery.finish(&[]);

        let evidence = domain.checks[0].evidence.as_ref().expect("evidence attached");
        assert_eq!(evidence.context, "The Territory shall be the World.");
        assert_eq!(evidence.match_term, "territory");
        assert_eq!(evidence.char_offset, 18);
    }

    #[test]
    fn falls_back_to_quoted_reason_terms() {
        let text = "This Recording Agreement is made today.";
        let mut battery = Battery::new(text);
        battery.push(
            CheckCode::OppContractType,
            Finding::review(0.6, "'recording agreement' found in body only"),
        );
        let domain = battery.finish(&[]);

        let evidence = domain.checks[0].evidence.as_ref().expect("evidence attached");
        assert_eq!(evidence.match_term, "recording agreement");
        assert_eq!(evidence.char_offset, 5);
    }

    #[test]
    fn no_evidence_without_a_match() {
        let mut battery = Battery::new("nothing relevant here");
        battery.push(CheckCode::OppTerm, Finding::fail(0.0, "No term found"));
        let domain = battery.finish(&[]);
        assert!(domain.checks[0].evidence.is_none());
    }
}
