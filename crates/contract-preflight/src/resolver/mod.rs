//! Account resolution: the resolver seam, a CSV-backed index, and the glue
//! that turns extracted candidates into match rows.

mod csv_index;
mod matching;

use serde::{Deserialize, Serialize};

pub use csv_index::{AccountIndexError, CsvAccountIndex};
pub use matching::{match_accounts, AccountMatchRow, MatchStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Matched,
    Ambiguous,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    TokenOverlap,
    EditDistance,
}

impl MatchTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::TokenOverlap => "token_overlap",
            MatchTier::EditDistance => "edit_distance",
        }
    }
}

/// One scored account from the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCandidate {
    pub account_name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub account_id: String,
    pub legal_entity_id: String,
    pub artist_name: String,
    pub company_name: String,
    pub legal_name: String,
    pub score: f64,
    pub match_tier: MatchTier,
}

/// Resolver output for a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub classification: Classification,
    pub score: f64,
    pub candidates: Vec<AccountCandidate>,
    pub explanation: String,
    pub provider: String,
}

impl Resolution {
    pub fn not_found(explanation: impl Into<String>, provider: &str) -> Self {
        Self {
            classification: Classification::NotFound,
            score: 0.0,
            candidates: Vec::new(),
            explanation: explanation.into(),
            provider: provider.to_string(),
        }
    }

    pub fn top(&self) -> Option<&AccountCandidate> {
        self.candidates.first()
    }
}

/// Account lookup abstraction so match glue can run against any index.
pub trait AccountResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Resolution;

    /// Raw account names to look for verbatim in document text.
    fn known_names(&self) -> &[String] {
        &[]
    }
}
