use super::candidates::{is_denylisted, GENERIC_SINGLE_TOKENS};
use crate::text::PREAMBLE_LINES;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MAX_RECITAL_PARTIES: usize = 6;

const ROLE_LABELS: &str = "Owner|Company|Label|Licensor|Licensee|Publisher|Distributor|Artist|Producer|Manager";

const GENERIC_ROLE_NOUNS: &[&str] = &[
    "owner",
    "company",
    "label",
    "licensor",
    "licensee",
    "publisher",
    "distributor",
    "artist",
    "producer",
    "manager",
    "party",
    "parties",
    "recipient",
    "sender",
    "buyer",
    "seller",
    "lender",
    "borrower",
];

static BETWEEN_AND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:by\s+and\s+between|between)\s+(.+?)\s+(?:and|&)\s+(.+?)(?:\s*[\(,\.]|$)")
        .expect("between/and pattern compiles")
});

static PARTY_ZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:BETWEEN|between|By and Between|BY AND BETWEEN|PARTIES|parties)\s*[:\-]?[ \t]*\n?((?:.*\n){1,10})")
        .expect("party zone pattern compiles")
});

static LABEL_PARTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)([A-Z][A-Za-z\s&\.,']+?)\s*\(\s*"?\s*(?:{ROLE_LABELS})\s*"?\s*\)"#
    ))
    .expect("label party pattern compiles")
});

pub(crate) static COMPANY_MARKERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:ltd|limited|inc|incorporated|llc|corp|corporation|gmbh|plc|pty|",
        r"s\.a\.|sa|bv|ag|entertainments|entertainment|records|recordings|",
        r"music|media|studios|productions|publishing|group)\b",
    ))
    .expect("company marker pattern compiles")
});

static BANNED_PARTY_MARKERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:schedule|definitions|revenue\s+shares?|bank|account\s*(?:number|no|name|#)|",
        r"sort\s*code|iban|swift|routing|wire\s*transfer|ach|beneficiary|",
        r"page|pages|channels?|means|exhibit|appendix|annex|attachment|",
        r"recital|preamble|article|section|clause|paragraph|notices)\b",
    ))
    .expect("banned party marker pattern compiles")
});

static COLON_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+:\s").expect("colon label pattern compiles"));

static PROSE_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:shall|provided that|in accordance|pursuant to|notwithstanding|",
        r"agrees? to|represents|warrants|acknowledges|except as|",
        r"without limiting|to the extent|in consideration|in witness|",
        r"hereby|hereunder|hereto|hereof|therein|thereof|whereas|",
        r"now therefore|witnesseth|effective as of|dated as of|",
        r"entered into|made and entered|for the purpose|subject to)\b",
    ))
    .expect("prose clause pattern compiles")
});

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:street|st\.|avenue|ave\.|road|rd\.|boulevard|blvd|suite|floor|",
        r"p\.?o\.?\s*box|zip|postal|state of|county of|province|country|",
        r"california|new york|texas|florida|illinois|tennessee|georgia|",
        r"nashville|los angeles|united states|united kingdom|uk|usa|",
        r"u\.s\.a|u\.k\.|canada|australia|india|germany|france|",
        r"\d{5}-?\d{0,4})\b",
    ))
    .expect("address pattern compiles")
});

static PAGINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:page|pg\.?)\s*\d+\s*(?:of\s*\d+)?").expect("pagination pattern compiles")
});

static NUMBERING_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[\.\)]\s*").expect("numbering prefix pattern compiles"));

static ROLE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)\s*\(\s*"?\s*(?:the\s+)?(?:{ROLE_LABELS})\s*"?\s*\)"#
    ))
    .expect("role suffix pattern compiles")
});

static TRAILING_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)\s*$").expect("trailing paren pattern compiles"));

static LEADING_CONJUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:and|AND|&)\s+").expect("leading conjunction pattern compiles"));

static TRAILING_CLAUSES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i),?\s*(?:of|located at|at)\s+\d.*$",
        r"(?i),?\s*(?:a|an)\s+(?:company|corporation|partnership|firm|entity)\s+.*$",
        r"(?i),?\s*(?:with|having|whose|located|organized|incorporated|formed)\s+.*$",
        r"\s*[,;]+\s*$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("trailing clause pattern compiles"))
    .collect()
});

/// Strips numbering, role labels, quotes, and trailing descriptive clauses from a party line.
pub fn normalize_party_candidate(raw: &str) -> String {
    let mut name = NUMBERING_PREFIX_RE.replace(raw.trim(), "").into_owned();
    name = ROLE_SUFFIX_RE.replace_all(&name, "").trim().to_string();
    name = name
        .trim_matches(|ch| matches!(ch, '(' | ')' | '"' | '\''))
        .trim()
        .to_string();
    name = TRAILING_PAREN_RE.replace(&name, "").trim().to_string();
    name = LEADING_CONJUNCTION_RE.replace(&name, "").trim().to_string();
    for pattern in TRAILING_CLAUSES.iter() {
        name = pattern.replace(&name, "").trim().to_string();
    }
    name.trim_matches(|ch| matches!(ch, '"' | '\''))
        .trim()
        .to_string()
}

/// Heuristic filter separating party names from prose, addresses, and boilerplate.
pub fn is_plausible_party_name(name: &str) -> bool {
    let length = name.chars().count();
    if !(3..=100).contains(&length) {
        return false;
    }
    let lowered = name.trim().to_lowercase();

    if BANNED_PARTY_MARKERS_RE.is_match(name)
        || COLON_LABEL_RE.is_match(name)
        || PROSE_CLAUSE_RE.is_match(name)
        || ADDRESS_RE.is_match(name)
        || PAGINATION_RE.is_match(name)
        || name.ends_with(':')
    {
        return false;
    }
    if name.chars().any(|ch| ch < ' ' && !matches!(ch, '\n' | '\r' | '\t')) {
        return false;
    }
    if !name.chars().any(|ch| ch.is_ascii_alphanumeric()) {
        return false;
    }
    if matches!(lowered.as_str(), "and" | "or" | "by" | "between" | "of" | "the")
        || GENERIC_ROLE_NOUNS.contains(&lowered.as_str())
    {
        return false;
    }
    if ["hereinafter", "the ", "this ", "whereas"]
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return false;
    }
    if lowered.split_whitespace().count() > 10 || !name.chars().any(|ch| ch.is_ascii_uppercase()) {
        return false;
    }
    if lowered.starts_with("...") || lowered.ends_with("...") {
        return false;
    }
    if lowered.contains(" and ") || lowered.contains(" & ") {
        return false;
    }
    if is_denylisted(&lowered) || GENERIC_SINGLE_TOKENS.contains(&lowered.as_str()) {
        return false;
    }
    if COMPANY_MARKERS_RE.is_match(name) {
        return true;
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    let capitalized = words
        .iter()
        .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
        .count();
    match words.as_slice() {
        [single] => {
            single.chars().next().is_some_and(char::is_uppercase) && single.chars().count() >= 4
        }
        _ => capitalized >= 2 || (capitalized >= 1 && words.len() <= 3),
    }
}

/// Party names from the preamble: `between X and Y`, `Name ("Role")`, then lines under a parties header.
pub fn extract_recital_parties(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let preamble = text
        .split('\n')
        .take(PREAMBLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut parties: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut admit = |raw: &str, parties: &mut Vec<String>| {
        let name = normalize_party_candidate(raw);
        if is_plausible_party_name(&name) && seen.insert(name.trim().to_lowercase()) {
            parties.push(name);
        }
    };

    for caps in BETWEEN_AND_RE.captures_iter(&preamble) {
        admit(&caps[1], &mut parties);
        admit(&caps[2], &mut parties);
    }
    for caps in LABEL_PARTY_RE.captures_iter(&preamble) {
        admit(&caps[1], &mut parties);
    }
    'zones: for caps in PARTY_ZONE_RE.captures_iter(&preamble) {
        for line in caps[1].split('\n') {
            admit(line, &mut parties);
            if parties.len() >= MAX_RECITAL_PARTIES {
                break 'zones;
            }
        }
    }

    parties.truncate(MAX_RECITAL_PARTIES);
    parties
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_role_labels_and_clauses() {
        assert_eq!(
            normalize_party_candidate(r#"1. Acme Records Ltd ("Label")"#),
            "Acme Records Ltd"
        );
        assert_eq!(
            normalize_party_candidate("Blue Sky Music, a company incorporated in England"),
            "Blue Sky Music"
        );
        assert_eq!(normalize_party_candidate("and Jane Doe,"), "Jane Doe");
    }

    #[test]
    fn plausibility_filter() {
        assert!(is_plausible_party_name("Acme Records Ltd"));
        assert!(is_plausible_party_name("Jane Doe"));
        assert!(!is_plausible_party_name("the Company"));
        assert!(!is_plausible_party_name("Schedule A"));
        assert!(!is_plausible_party_name("123 Main Street"));
        assert!(!is_plausible_party_name("lowercase words only"));
        assert!(!is_plausible_party_name("Smith and Jones"));
        assert!(!is_plausible_party_name("Licensor"));
    }

    #[test]
    fn extracts_between_and_parties() {
        let text = "DISTRIBUTION AGREEMENT\nThis agreement is made between Acme Records Ltd and Blue Sky Music.\n";
        let parties = extract_recital_parties(text);
        assert_eq!(parties, vec!["Acme Records Ltd".to_string(), "Blue Sky Music".to_string()]);
    }

    #[test]
    fn extracts_labelled_parties_once() {
        let text = "Acme Records Ltd (\"Company\") and Jane Doe (\"Artist\") agree as follows.";
        let parties = extract_recital_parties(text);
        assert!(parties.contains(&"Acme Records Ltd".to_string()));
        assert!(parties.contains(&"Jane Doe".to_string()));
        assert!(parties.len() <= MAX_RECITAL_PARTIES);
    }
}
