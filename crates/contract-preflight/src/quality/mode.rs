use serde::{Deserialize, Serialize};

// Locked so historical classifications stay reproducible.
const PAGE_CHARS_MIN_SEARCHABLE: usize = 50;
const PAGE_IMAGE_MAX_SEARCHABLE: f64 = 0.70;
const PAGE_CHARS_MAX_SCANNED: usize = 50;
const PAGE_IMAGE_MIN_SCANNED: f64 = 0.30;
const DOC_MODE_SUPERMAJORITY: f64 = 0.80;

/// Readability of a page or of the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageMode {
    Searchable,
    Scanned,
    Mixed,
}

impl PageMode {
    pub const fn label(self) -> &'static str {
        match self {
            PageMode::Searchable => "SEARCHABLE",
            PageMode::Scanned => "SCANNED",
            PageMode::Mixed => "MIXED",
        }
    }
}

pub fn classify_page(chars: usize, image_coverage_ratio: f64) -> PageMode {
    if chars >= PAGE_CHARS_MIN_SEARCHABLE && image_coverage_ratio <= PAGE_IMAGE_MAX_SEARCHABLE {
        PageMode::Searchable
    } else if chars < PAGE_CHARS_MAX_SCANNED && image_coverage_ratio >= PAGE_IMAGE_MIN_SCANNED {
        PageMode::Scanned
    } else {
        PageMode::Mixed
    }
}

/// Supermajority vote over page modes; anything short of 80% is MIXED.
pub fn classify_document(page_modes: &[PageMode]) -> PageMode {
    if page_modes.is_empty() {
        return PageMode::Mixed;
    }

    let total = page_modes.len() as f64;
    let share = |mode: PageMode| {
        page_modes.iter().filter(|candidate| **candidate == mode).count() as f64 / total
    };

    if share(PageMode::Searchable) >= DOC_MODE_SUPERMAJORITY {
        PageMode::Searchable
    } else if share(PageMode::Scanned) >= DOC_MODE_SUPERMAJORITY {
        PageMode::Scanned
    } else {
        PageMode::Mixed
    }
}
