use crate::text::{char_offset, widen};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MAX_CORRUPTION_SAMPLES: usize = 20;
const SAMPLE_SNIPPET_RADIUS: usize = 40;

/// Latin-1-as-UTF-8 mis-decodes of common accented letters and punctuation.
const MOJIBAKE_SEQUENCES: &[&str] = &[
    "\u{c3}\u{a9}",
    "\u{c3}\u{a0}",
    "\u{c3}\u{a8}",
    "\u{c3}\u{b1}",
    "\u{c3}\u{bc}",
    "\u{c3}\u{b6}",
    "\u{c3}\u{a4}",
    "\u{c3}\u{ad}",
    "\u{c3}\u{b3}",
    "\u{c3}\u{ba}",
    "\u{c3}\u{89}",
    "\u{c3}\u{96}",
    "\u{c3}\u{9c}",
    "\u{c2}\u{a0}",
    "\u{c2}\u{ab}",
    "\u{c2}\u{bb}",
    "\u{c2}\u{b7}",
    "\u{e2}\u{80}\u{99}",
    "\u{e2}\u{80}\u{9c}",
    "\u{e2}\u{80}\u{9d}",
    "\u{e2}\u{80}\u{93}",
    "\u{e2}\u{80}\u{94}",
    "\u{e2}\u{80}\u{a2}",
    "\u{e2}\u{80}\u{a6}",
    "\u{ef}\u{bf}\u{bd}",
    "\u{ef}\u{ac}\u{81}",
    "\u{ef}\u{ac}\u{82}",
];

static MOJIBAKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{c0}-\x{c3}][\x{80}-\x{bf}]",
        r"|\x{e2}[\x{80}-\x{82}][\x{80}-\x{bf}]",
        r"|\x{ef}[\x{ac}\x{bf}][\x{80}-\x{bf}]",
        r"|\x{fffe}|\x{feff}",
        r"|\x{fffd}",
    ))
    .expect("mojibake pattern compiles")
});

static TOFU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{2400}-\x{243f}]|[\x{e000}-\x{f8ff}]|[\x{f0000}-\x{fffff}]")
        .expect("tofu pattern compiles")
});

static LATIN_EXT_CLUSTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0100}-\x{024f}\x{0300}-\x{036f}]{3,}")
        .expect("latin extended cluster pattern compiles")
});

static REPLACEMENT_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{fffd}").expect("replacement pattern compiles"));

static CONTROL_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f]").expect("control pattern compiles")
});

/// Corruption ratios over all page text. Every ratio is 0.0 for empty input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TextMetrics {
    pub total_chars: usize,
    /// Replacement characters plus every mojibake hit.
    pub replacement_char_ratio: f64,
    pub control_char_ratio: f64,
    pub mojibake_ratio: f64,
}

pub fn compute_text_metrics<S: AsRef<str>>(pages_text: &[S]) -> TextMetrics {
    let mut total_chars = 0usize;
    let mut replacement_chars = 0usize;
    let mut control_chars = 0usize;
    let mut mojibake_chars = 0usize;

    for text in pages_text {
        let text = text.as_ref();
        total_chars += text.chars().count();
        replacement_chars += text.matches('\u{fffd}').count();
        mojibake_chars += MOJIBAKE_RE.find_iter(text).count();
        mojibake_chars += TOFU_RE.find_iter(text).count();
        mojibake_chars += MOJIBAKE_SEQUENCES
            .iter()
            .map(|sequence| text.matches(sequence).count())
            .sum::<usize>();
        mojibake_chars += LATIN_EXT_CLUSTER_RE
            .find_iter(text)
            .map(|cluster| cluster.as_str().chars().count())
            .sum::<usize>();
        control_chars += text
            .chars()
            .filter(|ch| (*ch as u32) < 32 && !matches!(ch, '\t' | '\n' | '\r'))
            .count();
    }

    if total_chars == 0 {
        return TextMetrics::default();
    }

    let total = total_chars as f64;
    TextMetrics {
        total_chars,
        replacement_char_ratio: (replacement_chars + mojibake_chars) as f64 / total,
        control_char_ratio: control_chars as f64 / total,
        mojibake_ratio: mojibake_chars as f64 / total,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionIssue {
    ReplacementChar,
    ControlChar,
    LatinExtCluster,
    MojibakeSequence,
}

/// A located corruption artifact with surrounding context for analyst review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionSample {
    pub page: usize,
    pub issue_type: CorruptionIssue,
    pub char_start: usize,
    pub char_end: usize,
    pub snippet: String,
}

/// Collects at most twenty samples, scanning pages in order and issue kinds in fixed order.
pub fn extract_corruption_samples<S: AsRef<str>>(pages_text: &[S]) -> Vec<CorruptionSample> {
    let detectors: [(&Regex, CorruptionIssue); 4] = [
        (&*REPLACEMENT_CHAR_RE, CorruptionIssue::ReplacementChar),
        (&*CONTROL_CHAR_RE, CorruptionIssue::ControlChar),
        (&*LATIN_EXT_CLUSTER_RE, CorruptionIssue::LatinExtCluster),
        (&*MOJIBAKE_RE, CorruptionIssue::MojibakeSequence),
    ];

    let mut samples = Vec::new();
    for (page_idx, text) in pages_text.iter().enumerate() {
        let text = text.as_ref();
        for (pattern, issue_type) in &detectors {
            for found in pattern.find_iter(text) {
                if samples.len() >= MAX_CORRUPTION_SAMPLES {
                    return samples;
                }
                let (from, to) = widen(text, found.start(), found.end(), SAMPLE_SNIPPET_RADIUS);
                let char_start = char_offset(text, found.start());
                samples.push(CorruptionSample {
                    page: page_idx + 1,
                    issue_type: *issue_type,
                    char_start,
                    char_end: char_start + found.as_str().chars().count(),
                    snippet: text[from..to].to_string(),
                });
            }
        }
    }
    samples
}
