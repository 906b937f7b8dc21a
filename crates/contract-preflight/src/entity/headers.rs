use super::tracks::track_listing_lines;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const MAX_LINE_CHARS: usize = 80;
const MAX_HEADER_WORDS: usize = 5;
const MIN_HEADER_CHARS: usize = 3;
const MAX_PART_CHARS: usize = 60;
const MAX_HEADERS: usize = 200;
const MAX_LOW_SIGNAL: usize = 50;
const MIN_ALPHA_SHARE: f64 = 0.4;

static LOW_SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^[\d\.\(\)\-\s]+$",
        r"|^[ivxlcdm]+[\.\)]\s*$",
        r"|^§\s*\d",
        r"|^\d+\.\d+",
        r"|^https?://",
        r"|^www\.",
        r"|@[a-zA-Z0-9]",
        r"|^\W+$",
    ))
    .expect("low signal pattern compiles")
});

static TRAILING_SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:\-\s]+$").expect("trailing separator pattern compiles"));

static COLUMN_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t| {2,}|\|").expect("column split pattern compiles"));

/// Numbering, links, punctuation, or mostly non-alphabetic fragments.
pub(crate) fn is_low_signal(text: &str) -> bool {
    if LOW_SIGNAL_RE.is_match(text) {
        return true;
    }
    let total = text.chars().count();
    if total < MIN_HEADER_CHARS {
        return true;
    }
    let alpha = text.chars().filter(|ch| ch.is_alphabetic()).count();
    (alpha as f64 / total as f64) < MIN_ALPHA_SHARE
}

/// Short header-like lines and column cells, split into `(headers, low_signal_headers)`.
///
/// Track-listing lines are skipped. Both lists are sorted; headers are capped
/// at 200 and low-signal entries at 50.
pub fn extract_candidate_headers(text: &str) -> (Vec<String>, Vec<String>) {
    let mut raw: BTreeSet<String> = BTreeSet::new();
    let track = track_listing_lines(text);

    for (idx, line) in text.split('\n').map(str::trim).enumerate() {
        if track.contains(&idx) {
            continue;
        }
        let chars = line.chars().count();
        if !(MIN_HEADER_CHARS..=MAX_LINE_CHARS).contains(&chars) {
            continue;
        }
        if line.split_whitespace().count() <= MAX_HEADER_WORDS {
            let cleaned = TRAILING_SEPARATORS_RE.replace(line, "");
            let cleaned = cleaned.trim();
            if cleaned.chars().count() >= MIN_HEADER_CHARS {
                raw.insert(cleaned.to_string());
            }
        }
        for part in COLUMN_SPLIT_RE.split(line).map(str::trim) {
            let part_chars = part.chars().count();
            if (MIN_HEADER_CHARS..=MAX_PART_CHARS).contains(&part_chars)
                && part.split_whitespace().count() <= MAX_HEADER_WORDS
            {
                raw.insert(part.to_string());
            }
        }
    }

    let (low_signal, headers): (Vec<String>, Vec<String>) =
        raw.into_iter().partition(|candidate| is_low_signal(candidate));

    (
        headers.into_iter().take(MAX_HEADERS).collect(),
        low_signal.into_iter().take(MAX_LOW_SIGNAL).collect(),
    )
}
