//! Track-listing and song-schedule sections.
//!
//! Song titles and featured artists in these sections read like account names,
//! so header extraction and the account phrase scan skip them.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const MAX_TRACK_LINE_CHARS: usize = 120;
const MAX_TRACK_WORDS: usize = 8;
const MIN_SECTION_HEADER_CHARS: usize = 5;
const SETTLED_SECTION_ENTRIES: usize = 3;
const MAX_RUN_LINE_CHARS: usize = 80;
const MIN_NUMBERED_RUN: usize = 8;

static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)track\s*list|song\s*list|list\s+of\s+(?:songs|tracks|recordings|masters)",
        r"|schedule\s+of\s+(?:songs|tracks|recordings|masters)",
        r"|annexure|appendix|exhibit",
    ))
    .expect("track section pattern compiles")
});

static TABLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bs(?:r)?\.?\s*no\b|song\s*title|track\s*(?:title|name)|artist\s*name")
        .expect("track table header pattern compiles")
});

static NUMBERED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d{1,4}[.)\-]|\d{1,4}\s+[A-Z])").expect("numbered line pattern compiles")
});

static CONTRACT_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:section|article|clause|part|chapter)\s+\d")
        .expect("contract section pattern compiles")
});

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// An all-caps line that opens a new contract section rather than a track row.
fn is_caps_heading(line: &str) -> bool {
    line.chars().count() >= MIN_SECTION_HEADER_CHARS
        && line.to_uppercase() == line
        && !NUMBERED_LINE_RE.is_match(line)
}

/// Indices of lines that belong to track listings.
///
/// A section header or song-table header claims the short lines after it until
/// prose, a contract section heading, or three blank lines. A run of eight or
/// more short numbered lines counts as a listing even without a header.
pub fn track_listing_lines(text: &str) -> BTreeSet<usize> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut track = BTreeSet::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if !SECTION_HEADER_RE.is_match(line) && !TABLE_HEADER_RE.is_match(line) {
            i += 1;
            continue;
        }
        track.insert(i);

        let mut j = i + 1;
        let mut entries = 0;
        while j < lines.len() {
            let entry = lines[j].trim();
            if entry.is_empty() {
                let blank_run = lines.get(j + 1).is_some_and(|next| is_blank(next))
                    && lines.get(j + 2).is_some_and(|next| is_blank(next));
                if blank_run {
                    break;
                }
                j += 1;
                continue;
            }
            if entry.chars().count() > MAX_TRACK_LINE_CHARS
                || CONTRACT_SECTION_RE.is_match(entry)
                || is_caps_heading(entry)
            {
                break;
            }
            if entry.split_whitespace().count() <= MAX_TRACK_WORDS || NUMBERED_LINE_RE.is_match(entry) {
                track.insert(j);
                entries += 1;
            } else if entries >= SETTLED_SECTION_ENTRIES {
                break;
            }
            j += 1;
        }
        i = j;
    }

    let mut run: Vec<usize> = Vec::new();
    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        let numbered = NUMBERED_LINE_RE.is_match(line)
            && line.chars().count() <= MAX_RUN_LINE_CHARS
            && line.split_whitespace().count() <= MAX_TRACK_WORDS;
        if numbered {
            run.push(idx);
            continue;
        }
        if run.len() >= MIN_NUMBERED_RUN {
            track.extend(run.iter().copied());
        }
        run.clear();
    }
    if run.len() >= MIN_NUMBERED_RUN {
        track.extend(run);
    }

    track
}

/// `text` with every track-listing line blanked; line numbering is preserved.
pub fn strip_track_listing(text: &str) -> String {
    let track = track_listing_lines(text);
    if track.is_empty() {
        return text.to_string();
    }
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| if track.contains(&idx) { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}
