use super::mode::PageMode;
use serde::{Deserialize, Serialize};

/// One page of extracted text as delivered by the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
    #[serde(default)]
    pub image_coverage_ratio: f64,
}

impl PageRecord {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
            char_count: None,
            image_coverage_ratio: 0.0,
        }
    }

    pub fn with_char_count(mut self, char_count: usize) -> Self {
        self.char_count = Some(char_count);
        self
    }

    pub fn with_image_coverage(mut self, ratio: f64) -> Self {
        self.image_coverage_ratio = ratio;
        self
    }

    /// Reported character count, falling back to the text length in characters.
    pub fn effective_char_count(&self) -> usize {
        self.char_count
            .unwrap_or_else(|| self.text.chars().count())
    }
}

/// Readability verdict for a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageClassification {
    pub page: u32,
    pub mode: PageMode,
    pub char_count: usize,
    pub image_coverage_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_count_defaults_to_text_length() {
        let page = PageRecord::new(1, "héllo");
        assert_eq!(page.effective_char_count(), 5);
        assert_eq!(page.with_char_count(120).effective_char_count(), 120);
    }

    #[test]
    fn deserializes_with_optional_fields_missing() {
        let page: PageRecord =
            serde_json::from_str(r#"{"page": 3, "text": "body"}"#).expect("page parses");
        assert_eq!(page.page, 3);
        assert_eq!(page.char_count, None);
        assert_eq!(page.image_coverage_ratio, 0.0);
    }
}
