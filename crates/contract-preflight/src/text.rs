//! Text helpers shared by the quality, readiness, rules, and entity passes.

/// Lines treated as the title block.
pub(crate) const TITLE_LINES: usize = 10;
/// Lines treated as the preamble / recital block.
pub(crate) const PREAMBLE_LINES: usize = 35;

/// Region of the document a keyword was first observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Zone {
    Title,
    Preamble,
    Body,
}

impl Zone {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Zone::Title => "title",
            Zone::Preamble => "preamble",
            Zone::Body => "body",
        }
    }
}

/// Lowercased title, preamble, and full-body views of one document.
#[derive(Debug, Clone)]
pub(crate) struct TextZones {
    title: String,
    preamble: String,
    body: String,
}

impl TextZones {
    pub(crate) fn new(text: &str) -> Self {
        let body = text.to_lowercase();
        let title = leading_lines(&body, TITLE_LINES);
        let preamble = leading_lines(&body, PREAMBLE_LINES);
        Self {
            title,
            preamble,
            body,
        }
    }

    pub(crate) fn body(&self) -> &str {
        &self.body
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    /// Earliest zone containing `keyword` (already lowercase).
    pub(crate) fn locate(&self, keyword: &str) -> Option<Zone> {
        if self.title.contains(keyword) {
            Some(Zone::Title)
        } else if self.preamble.contains(keyword) {
            Some(Zone::Preamble)
        } else if self.body.contains(keyword) {
            Some(Zone::Body)
        } else {
            None
        }
    }
}

/// Per-zone weight applied to a keyword hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ZoneWeights {
    pub(crate) title: f64,
    pub(crate) preamble: f64,
    pub(crate) body: f64,
    /// Added for each corroborating keyword beyond the first, at most three times.
    pub(crate) corroboration: f64,
}

impl ZoneWeights {
    fn weight(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Title => self.title,
            Zone::Preamble => self.preamble,
            Zone::Body => self.body,
        }
    }
}

/// Zone weights used by subtype and schedule-type extraction.
pub(crate) const EXTRACTION_WEIGHTS: ZoneWeights = ZoneWeights {
    title: 0.40,
    preamble: 0.25,
    body: 0.15,
    corroboration: 0.08,
};

/// Score of one keyword family: the single best zone weight plus a saturating bonus.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ZoneScore {
    pub(crate) score: f64,
    pub(crate) hits: Vec<String>,
}

pub(crate) fn score_keywords(
    zones: &TextZones,
    keywords: &[&str],
    weights: ZoneWeights,
) -> Option<ZoneScore> {
    let mut best = 0.0_f64;
    let mut hits = Vec::new();

    for keyword in keywords {
        let Some(zone) = zones.locate(keyword) else {
            continue;
        };
        hits.push(format!("{}: {keyword}", zone.label()));
        best = best.max(weights.weight(zone));
    }

    if hits.is_empty() {
        return None;
    }

    let extra = (hits.len() - 1).min(3) as f64;
    let score = round_to((best + extra * weights.corroboration).min(1.0), 4);
    Some(ZoneScore { score, hits })
}

/// Rounds half away from zero to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Keywords from `vocabulary` present in `haystack` (already lowercase), in vocabulary order.
pub(crate) fn keyword_hits<'a>(haystack: &str, vocabulary: &[&'a str]) -> Vec<&'a str> {
    vocabulary
        .iter()
        .copied()
        .filter(|keyword| haystack.contains(keyword))
        .collect()
}

/// Prefix of `text` holding at most `max_chars` characters.
pub(crate) fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Number of characters before byte offset `byte_idx`.
pub(crate) fn char_offset(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].chars().count()
}

/// Byte range widened by `radius` characters on each side of `start..end`.
pub(crate) fn widen(text: &str, start: usize, end: usize, radius: usize) -> (usize, usize) {
    let from = if radius == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map_or(0, |(idx, _)| idx)
    };
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(idx, _)| end + idx);
    (from, to)
}

fn leading_lines(text: &str, count: usize) -> String {
    text.split('\n').take(count).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zones_prefer_the_earliest_region() {
        let mut text = String::from("Distribution Agreement\n");
        for _ in 0..40 {
            text.push_str("filler line\n");
        }
        text.push_str("exclusive licence granted");

        let zones = TextZones::new(&text);
        assert_eq!(zones.locate("distribution agreement"), Some(Zone::Title));
        assert_eq!(zones.locate("exclusive licence"), Some(Zone::Body));
        assert_eq!(zones.locate("missing"), None);
    }

    #[test]
    fn score_keeps_best_zone_and_caps_bonus() {
        let zones = TextZones::new("sync license\nsynch revenue\nsync revenue\nsynchronization\nsync licence");
        let scored = score_keywords(
            &zones,
            &["sync license", "synch revenue", "sync revenue", "synchronization", "sync licence"],
            EXTRACTION_WEIGHTS,
        )
        .expect("keywords present");

        assert_eq!(scored.hits.len(), 5);
        assert!((scored.score - 0.64).abs() < 1e-9);
    }

    #[test]
    fn widen_respects_multibyte_boundaries() {
        let text = "ééé\u{fffd}ééé";
        let start = text.find('\u{fffd}').expect("marker present");
        let (from, to) = widen(text, start, start + '\u{fffd}'.len_utf8(), 2);
        assert_eq!(&text[from..to], "éé\u{fffd}éé");
    }

    #[test]
    fn char_prefix_truncates_on_characters() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("hi", 10), "hi");
    }
}
