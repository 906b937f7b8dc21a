use super::parties::COMPANY_MARKERS_RE;
use super::tracks::strip_track_listing;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

const MIN_VALUE_CHARS: usize = 4;
const MAX_PROSE_TOKENS: usize = 6;
const MAX_HEADER_FALLBACK: usize = 10;
const MIN_ALNUM_SHARE: f64 = 0.5;
const MAX_ACRONYM_CHARS: usize = 6;
const MIN_PHRASE_CHARS: usize = 3;

/// How an account candidate was found in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    RecitalParty,
    StrictLabelValue,
    CsvPhraseHit,
    HeaderFallback,
}

impl CandidateSource {
    pub const fn describe(self) -> &'static str {
        match self {
            CandidateSource::RecitalParty => "contract party/recital block extraction",
            CandidateSource::StrictLabelValue => "strict label:value extraction",
            CandidateSource::CsvPhraseHit => "CSV phrase scan (known account match)",
            CandidateSource::HeaderFallback => "header fallback extraction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCandidate {
    pub value: String,
    pub source_type: CandidateSource,
}

const ENTITY_HINTS: &[&str] = &[
    "account name",
    "account",
    "client name",
    "client",
    "company name",
    "company",
    "legal name",
    "legal entity",
    "entity name",
    "entity",
    "artist",
    "artist name",
    "vendor",
    "vendor name",
    "counterparty",
    "customer",
    "customer name",
    "payee",
    "payee name",
    "licensee",
    "licensor",
    "party name",
];

/// Label words that are never account values, with or without a trailing colon.
const STOP_LABELS: &[&str] = &[
    "account name",
    "account number",
    "account",
    "client name",
    "client",
    "company name",
    "company",
    "vendor name",
    "vendor",
    "artist name",
    "artist",
    "entity name",
    "entity",
    "legal name",
    "legal entity",
    "counterparty",
    "customer name",
    "customer",
    "payee name",
    "payee",
    "licensee",
    "licensor",
    "party name",
    "payments/accounting",
    "n/a",
    "na",
    "none",
    "tbd",
    "unknown",
];

pub(crate) const GENERIC_SINGLE_TOKENS: &[&str] = &[
    "record",
    "records",
    "account",
    "accounts",
    "company",
    "companies",
    "artist",
    "artists",
    "vendor",
    "vendors",
    "name",
    "entity",
];

const HARD_DENYLIST: &[&str] = &[
    "distribution",
    "trademark",
    "delay",
    "image",
    "mean",
    "prosecute",
    "secrets",
    "master",
    "territory",
    "term",
    "schedule",
    "exhibit",
    "section",
    "clause",
    "paragraph",
    "article",
    "appendix",
    "annex",
    "recital",
    "preamble",
    "definitions",
    "notices",
    "whereas",
    "agreement",
    "contract",
    "license",
    "rights",
    "obligations",
    "representations",
    "warranties",
    "indemnification",
    "confidential",
    "termination",
    "governing",
    "jurisdiction",
    "arbitration",
    "force majeure",
    "amendment",
    "waiver",
    "assignment",
    "counterparts",
    "entire agreement",
    "severability",
    "survival",
    "headings",
    "miscellaneous",
];

const PROSE_START_WORDS: &[&str] = &[
    "record",
    "records",
    "agreement",
    "whereas",
    "means",
    "term",
    "party",
    "parties",
    "shall",
    "includes",
    "including",
];

const PROSE_FRAGMENTS: &[&str] = &[
    "means every form of",
    "this agreement",
    "hereof",
    "whereas",
    "herein",
    "hereunder",
    "pursuant to",
    "in connection with",
    "notwithstanding",
];

const DEFINITIONAL_VERBS: &[&str] = &["means", "shall", "includes", "including", "agrees", "acknowledges"];

const BORNE_PHRASES: &[&str] = &[
    "to be borne by",
    "borne by the",
    "shall be borne by",
    "costs borne by",
    "expenses borne by",
];

static STRICT_LABEL_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*(?:Account\s*Name(?:_c|__c)?|Company\s*Name(?:_c|__c)?",
        r"|Artist\s*Name(?:\s*\(pka\s+or\s+dba\))?|Legal\s*Name)",
        r"\s*[:\-]\s*(.+?)\s*$",
    ))
    .expect("strict label pattern compiles")
});

static TRAILING_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;:,]+$").expect("trailing punctuation pattern compiles"));

pub(crate) fn is_denylisted(lowered: &str) -> bool {
    HARD_DENYLIST.contains(&lowered)
}

fn is_stop_label(lowered: &str) -> bool {
    let bare = lowered.strip_suffix(':').unwrap_or(lowered);
    STOP_LABELS.contains(&bare)
}

/// Collapses whitespace and drops trailing `;:,`.
pub(crate) fn normalize_candidate(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    TRAILING_PUNCT_RE.replace(&collapsed, "").trim().to_string()
}

/// Denylisted boilerplate, generic single words, or short all-caps tokens.
pub(crate) fn is_generic_noise(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    if is_denylisted(&lowered) {
        return true;
    }
    if lowered.split_whitespace().count() == 1 {
        if GENERIC_SINGLE_TOKENS.contains(&lowered.as_str()) {
            return true;
        }
        let trimmed = value.trim();
        let is_acronym = trimmed.chars().any(char::is_alphabetic)
            && !trimmed.chars().any(char::is_lowercase)
            && trimmed.chars().count() <= MAX_ACRONYM_CHARS;
        if is_acronym {
            return true;
        }
    }
    false
}

fn is_prose(value: &str) -> bool {
    let lowered = value.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return true;
    };
    if PROSE_START_WORDS.contains(first)
        || PROSE_FRAGMENTS.iter().any(|fragment| lowered.contains(fragment))
        || tokens.len() > MAX_PROSE_TOKENS
    {
        return true;
    }
    let quoted = value.contains(['"', '\u{201c}', '\u{201d}']);
    if quoted && tokens.iter().any(|token| DEFINITIONAL_VERBS.contains(token)) {
        return true;
    }
    let total = value.chars().count();
    let alnum = value.chars().filter(|ch| ch.is_alphanumeric()).count();
    total > 0 && (alnum as f64 / total as f64) < MIN_ALNUM_SHARE
}

fn is_valid_value(value: &str) -> bool {
    if value.chars().count() < MIN_VALUE_CHARS {
        return false;
    }
    let lowered = value.to_lowercase();
    let single_token = value.split_whitespace().count() < 2;
    if single_token && !value.chars().any(char::is_alphanumeric) {
        return false;
    }
    if single_token && GENERIC_SINGLE_TOKENS.contains(&lowered.as_str()) {
        return false;
    }
    !is_stop_label(&lowered) && !is_prose(value)
}

/// `borne` read as a verb ("costs borne by") rather than a name.
pub(crate) fn is_borne_in_verb_context(candidate: &str, text: &str) -> bool {
    if !candidate.trim().eq_ignore_ascii_case("borne") {
        return false;
    }
    let lowered = text.to_lowercase();
    BORNE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn at_word_boundary(haystack: &str, start: usize, end: usize) -> bool {
    let before = haystack[..start].chars().next_back();
    let after = haystack[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Known account names that appear verbatim in the document, longest first.
///
/// Track listings are stripped first so song titles and featured artists do
/// not match. Single-word names need a company marker ("Records", "Ltd") to
/// count. A name contained in a longer hit is dropped.
fn scan_known_names(text: &str, known_names: &[String]) -> Vec<String> {
    if known_names.is_empty() || text.trim().is_empty() {
        return Vec::new();
    }
    let haystack = strip_track_listing(text).to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut hits: Vec<String> = Vec::new();

    for name in known_names.iter().map(|name| name.trim()) {
        if name.chars().count() < MIN_PHRASE_CHARS {
            continue;
        }
        let lowered = name.to_lowercase();
        if seen.contains(&lowered) || GENERIC_SINGLE_TOKENS.contains(&lowered.as_str()) {
            continue;
        }
        if lowered.split_whitespace().count() == 1 && !COMPANY_MARKERS_RE.is_match(name) {
            continue;
        }
        let Some(start) = haystack.find(&lowered) else {
            continue;
        };
        if at_word_boundary(&haystack, start, start + lowered.len()) {
            seen.insert(lowered);
            hits.push(name.to_string());
        }
    }

    hits.sort_by_cached_key(|hit| (std::cmp::Reverse(hit.chars().count()), hit.to_lowercase()));

    // "Acme Records" inside "Acme Records Ltd" is the same party.
    let mut kept: Vec<String> = Vec::with_capacity(hits.len());
    for hit in hits {
        let lowered = hit.to_lowercase();
        if !kept.iter().any(|longer| longer.to_lowercase().contains(&lowered)) {
            kept.push(hit);
        }
    }
    kept
}

/// Account-name values found in the document, in priority order.
///
/// Known account names from the index (`known_names`) that appear in the text
/// come first, then values from `Label: Value` lines; only the value after the
/// label is kept. Header fallback runs only when neither produced anything,
/// and returns at most ten entries.
pub fn extract_account_candidates(
    text: &str,
    headers: &[String],
    known_names: &[String],
) -> Vec<ExtractedCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut found = Vec::new();

    for hit in scan_known_names(text, known_names) {
        let value = normalize_candidate(&hit);
        if value.is_empty() || is_generic_noise(&value) || !seen.insert(value.to_lowercase()) {
            continue;
        }
        found.push(ExtractedCandidate {
            value,
            source_type: CandidateSource::CsvPhraseHit,
        });
    }

    for line in text.split('\n').map(str::trim).filter(|line| !line.is_empty()) {
        let Some(caps) = STRICT_LABEL_VALUE_RE.captures(line) else {
            continue;
        };
        let value = normalize_candidate(&caps[1]);
        if is_valid_value(&value) && seen.insert(value.to_lowercase()) {
            found.push(ExtractedCandidate {
                value,
                source_type: CandidateSource::StrictLabelValue,
            });
        }
    }
    if !found.is_empty() {
        return found;
    }

    headers
        .iter()
        .map(|header| normalize_candidate(header))
        .filter(|value| {
            let lowered = value.to_lowercase();
            !value.is_empty()
                && !is_stop_label(&lowered)
                && !ENTITY_HINTS.contains(&lowered.trim_end_matches(':'))
                && !is_generic_noise(value)
                && !is_prose(value)
                && seen.insert(lowered)
        })
        .take(MAX_HEADER_FALLBACK)
        .map(|value| ExtractedCandidate {
            value,
            source_type: CandidateSource::HeaderFallback,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(candidates: &[ExtractedCandidate]) -> Vec<&str> {
        candidates.iter().map(|candidate| candidate.value.as_str()).collect()
    }

    #[test]
    fn extracts_values_not_labels() {
        let text = "Account Name: Acme Records Ltd\nCompany Name - Blue Sky Music;\nLegal Name: TBD\n";
        let candidates = extract_account_candidates(text, &[], &[]);

        assert_eq!(values(&candidates), vec!["Acme Records Ltd", "Blue Sky Music"]);
        assert!(candidates
            .iter()
            .all(|candidate| candidate.source_type == CandidateSource::StrictLabelValue));
    }

    #[test]
    fn dedups_case_insensitively() {
        let text = "Account Name: Acme Records Ltd\nLegal Name: ACME RECORDS LTD\n";
        let candidates = extract_account_candidates(text, &[], &[]);
        assert_eq!(values(&candidates), vec!["Acme Records Ltd"]);
    }

    #[test]
    fn rejects_prose_values() {
        let text = "Artist Name: shall mean the recording artist engaged under this agreement\n";
        let headers = vec!["Harbor Lights Collective".to_string()];
        let candidates = extract_account_candidates(text, &headers, &[]);
        assert_eq!(values(&candidates), vec!["Harbor Lights Collective"]);
        assert_eq!(candidates[0].source_type, CandidateSource::HeaderFallback);
    }

    #[test]
    fn header_fallback_filters_labels_and_boilerplate() {
        let headers = vec![
            "Account Name:".to_string(),
            "Termination".to_string(),
            "NDA".to_string(),
            "Harbor Lights Collective".to_string(),
        ];
        let candidates = extract_account_candidates("", &headers, &[]);
        assert_eq!(values(&candidates), vec!["Harbor Lights Collective"]);
    }

    #[test]
    fn header_fallback_is_capped() {
        let headers: Vec<String> = (0..20).map(|idx| format!("Northwind Holdings {idx}")).collect();
        let candidates = extract_account_candidates("", &headers, &[]);
        assert_eq!(candidates.len(), 10);
    }

    fn known(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn known_names_in_prose_lead_the_list() {
        let text = "This licence is made between Harbor House Music Ltd and Acme Records Ltd.\nAccount Name: Blue Sky Music\n";
        let names = known(&["Acme Records Ltd", "Harbor House Music Ltd", "Northwind Holdings"]);
        let candidates = extract_account_candidates(text, &[], &names);

        assert_eq!(
            values(&candidates),
            vec!["Harbor House Music Ltd", "Acme Records Ltd", "Blue Sky Music"]
        );
        assert_eq!(candidates[0].source_type, CandidateSource::CsvPhraseHit);
        assert_eq!(candidates[2].source_type, CandidateSource::StrictLabelValue);
    }

    #[test]
    fn phrase_hits_need_word_boundaries() {
        let text = "Payments go to the Acme Recordsholder trust.";
        let candidates = extract_account_candidates(text, &[], &known(&["Acme Records"]));
        assert!(candidates.is_empty());
    }

    #[test]
    fn shorter_names_inside_longer_hits_fold() {
        let text = "Royalties are paid to Acme Records Ltd monthly.";
        let candidates = extract_account_candidates(text, &[], &known(&["Acme Records", "Acme Records Ltd"]));
        assert_eq!(values(&candidates), vec!["Acme Records Ltd"]);
    }

    #[test]
    fn single_word_names_need_a_company_marker() {
        let text = "Sanjay signs for Bluewave Records on behalf of the label.";
        let candidates = extract_account_candidates(text, &[], &known(&["Sanjay", "Bluewave Records", "Records"]));
        assert_eq!(values(&candidates), vec!["Bluewave Records"]);
    }

    #[test]
    fn track_listing_titles_do_not_match_known_names() {
        let text = "Licence between Harbor House Music Ltd and the Artist.\nSchedule of Songs\n1. Midnight Harbor\n2. Blue Sky Music\n";
        let names = known(&["Blue Sky Music", "Harbor House Music Ltd"]);
        let candidates = extract_account_candidates(text, &[], &names);
        assert_eq!(values(&candidates), vec!["Harbor House Music Ltd"]);
    }

    #[test]
    fn borne_only_as_verb() {
        assert!(is_borne_in_verb_context("Borne", "All costs shall be borne by the Label."));
        assert!(!is_borne_in_verb_context("Borne", "Artist: Borne"));
        assert!(!is_borne_in_verb_context("Acme", "costs borne by the Label"));
    }
}
